//! Structural operations: they change how the samples are addressed, never the samples.
//!
//! Every operation validates all of its arguments before changing any field, so a failed call
//! leaves the image as it was. Operations return the image again to allow chaining.
use log::debug;
use nd_texel::DataType;

use crate::error::{Error, Result};
use crate::options::CropLocation;
use crate::tensor::{Tensor, TensorShape};
use crate::view::Range;

use super::Image;

const CAST_ERROR: &str = "Image not compatible with requested cast";

impl Image {
    /// Reorder dimensions such that new dimension `i` is old dimension `order[i]`.
    ///
    /// Singleton dimensions may be left out of `order`, which removes them.
    pub fn permute_dimensions(&mut self, order: &[usize]) -> Result<&mut Self> {
        self.check_forged()?;
        let nd = self.sizes.len();
        if order.len() > nd {
            return Err(Error::wrong_length(nd, order.len()));
        }
        let mut keep = vec![false; nd];
        for &dim in order {
            self.check_dim(dim)?;
            if core::mem::replace(&mut keep[dim], true) {
                return Err(Error::InvalidParameter("cannot duplicate a dimension"));
            }
        }
        if (0..nd).any(|dim| !keep[dim] && self.sizes[dim] > 1) {
            return Err(Error::InvalidParameter(
                "cannot discard non-singleton dimension",
            ));
        }

        self.sizes = order.iter().map(|&dim| self.sizes[dim]).collect();
        self.strides = order.iter().map(|&dim| self.strides[dim]).collect();
        self.pixel_size.permute(order);
        Ok(self)
    }

    pub fn swap_dimensions(&mut self, dim1: usize, dim2: usize) -> Result<&mut Self> {
        self.check_forged()?;
        self.check_dim(dim1)?;
        self.check_dim(dim2)?;
        if dim1 != dim2 {
            self.sizes.swap(dim1, dim2);
            self.strides.swap(dim1, dim2);
            self.pixel_size.swap(dim1, dim2);
        }
        Ok(self)
    }

    /// Make the image 1D. Copies the samples when no single stride visits all pixels.
    pub fn flatten(&mut self) -> Result<&mut Self> {
        self.check_forged()?;
        let (stride, offset) = match self.simple_stride_and_offset() {
            Some(simple) => simple,
            None => {
                if self.protect {
                    return Err(Error::Protected);
                }
                debug!("flatten of {:?} copies to normal strides", self.sizes);
                let copy = self.similar_normal(self.data_type)?;
                copy.copy_samples_from(self)?;
                self.take_data_from(copy);
                self.simple_stride_and_offset()
                    .ok_or(Error::NotRepresentable("copy did not yield a simple stride"))?
            }
        };
        self.shift_origin(offset);
        self.sizes = vec![self.number_of_pixels()];
        self.strides = vec![stride];
        self.reduce_pixel_size();
        Ok(self)
    }

    /// Merge dimensions where that does not need a copy.
    ///
    /// Dimensions are un-mirrored and sorted by stride first. Broadcast dimensions stay, so the
    /// number of pixels never changes.
    pub fn flatten_as_much_as_possible(&mut self) -> Result<&mut Self> {
        self.check_forged()?;
        if let Some((stride, offset)) = self.simple_stride_and_offset() {
            self.shift_origin(offset);
            self.sizes = vec![self.number_of_pixels()];
            self.strides = vec![stride];
            self.reduce_pixel_size();
            return Ok(self);
        }

        let mut offset = 0;
        for (size, stride) in self.sizes.iter().zip(self.strides.iter_mut()) {
            if *stride < 0 {
                offset += (*size as isize - 1) * *stride;
                *stride = -*stride;
            }
        }
        let mut order: Vec<usize> = (0..self.sizes.len())
            .filter(|&dim| self.sizes[dim] > 1)
            .collect();
        order.sort_by_key(|&dim| self.strides[dim]);

        let mut sizes: Vec<usize> = Vec::with_capacity(order.len());
        let mut strides: Vec<isize> = Vec::with_capacity(order.len());
        for dim in order {
            let (size, stride) = (self.sizes[dim], self.strides[dim]);
            match (sizes.last_mut(), strides.last()) {
                (Some(last_size), Some(&last_stride))
                    if *last_size as isize * last_stride == stride =>
                {
                    *last_size *= size;
                }
                _ => {
                    sizes.push(size);
                    strides.push(stride);
                }
            }
        }

        self.shift_origin(offset);
        self.sizes = sizes;
        self.strides = strides;
        self.reduce_pixel_size();
        Ok(self)
    }

    fn reduce_pixel_size(&mut self) {
        if !self.pixel_size.is_isotropic() {
            self.pixel_size.clear();
        }
    }

    /// Split `dim` into two dimensions, the first of extent `size`.
    pub fn split_dimension(&mut self, dim: usize, size: usize) -> Result<&mut Self> {
        self.check_forged()?;
        self.check_dim(dim)?;
        if size == 0 || self.sizes[dim] % size != 0 {
            return Err(Error::NotDivisible("dimension cannot be evenly divided"));
        }
        let outer = self.sizes[dim] / size;
        self.sizes[dim] = size;
        self.sizes.insert(dim + 1, outer);
        self.strides.insert(dim + 1, self.strides[dim] * size as isize);
        self.pixel_size.duplicate(dim);
        Ok(self)
    }

    /// Remove all singleton dimensions, returning the indices they had.
    pub fn squeeze(&mut self) -> Result<Vec<usize>> {
        self.check_forged()?;
        let removed: Vec<usize> = (0..self.sizes.len())
            .filter(|&dim| self.sizes[dim] == 1)
            .collect();
        for &dim in removed.iter().rev() {
            self.sizes.remove(dim);
            self.strides.remove(dim);
            self.pixel_size.erase(dim);
        }
        Ok(removed)
    }

    pub fn squeeze_dimension(&mut self, dim: usize) -> Result<&mut Self> {
        self.check_forged()?;
        self.check_dim(dim)?;
        if self.sizes[dim] != 1 {
            return Err(Error::InvalidParameter("dimension is not a singleton"));
        }
        self.sizes.remove(dim);
        self.strides.remove(dim);
        self.pixel_size.erase(dim);
        Ok(self)
    }

    /// Insert a dimension of size 1 before `dim`, or at the end.
    ///
    /// Added singletons have a stride of zero.
    pub fn add_singleton(&mut self, dim: usize) -> Result<&mut Self> {
        self.check_forged()?;
        if dim > self.sizes.len() {
            return Err(Error::illegal_dimension(dim, self.sizes.len()));
        }
        self.sizes.insert(dim, 1);
        self.strides.insert(dim, 0);
        self.pixel_size.insert(dim);
        Ok(self)
    }

    /// Add singletons one after the other, which undoes [`Image::squeeze`] given its result.
    pub fn add_singletons(&mut self, dims: &[usize]) -> Result<&mut Self> {
        self.check_forged()?;
        let nd = self.sizes.len();
        if let Some((count, &dim)) = dims.iter().enumerate().find(|&(count, &dim)| dim > nd + count)
        {
            return Err(Error::illegal_dimension(dim, nd + count));
        }
        for &dim in dims {
            self.add_singleton(dim)?;
        }
        Ok(self)
    }

    /// Append singleton dimensions until there are `dims` dimensions.
    pub fn expand_dimensionality(&mut self, dims: usize) -> Result<&mut Self> {
        self.check_forged()?;
        if self.sizes.len() < dims {
            self.sizes.resize(dims, 1);
            self.strides.resize(dims, 0);
        }
        Ok(self)
    }

    /// Broadcast a singleton dimension to `size` pixels that all read the same samples.
    pub fn expand_singleton_dimension(&mut self, dim: usize, size: usize) -> Result<&mut Self> {
        self.check_forged()?;
        self.check_dim(dim)?;
        if self.sizes[dim] != 1 {
            return Err(Error::InvalidParameter("dimension is not a singleton"));
        }
        if size == 0 {
            return Err(Error::InvalidParameter("sizes must be positive"));
        }
        self.sizes[dim] = size;
        self.strides[dim] = 0;
        Ok(self)
    }

    /// Broadcast singleton dimensions, adding trailing ones as needed, to reach `sizes`.
    pub fn expand_singleton_dimensions(&mut self, sizes: &[usize]) -> Result<&mut Self> {
        self.check_forged()?;
        if sizes.len() < self.sizes.len() {
            return Err(Error::IncompatibleSizes("dimensionalities don't match"));
        }
        if !self.is_singleton_expansion_possible(sizes) || sizes.contains(&0) {
            return Err(Error::IncompatibleSizes("sizes don't match"));
        }
        self.expand_dimensionality(sizes.len())?;
        for (dim, &size) in sizes.iter().enumerate() {
            if self.sizes[dim] != size {
                self.sizes[dim] = size;
                self.strides[dim] = 0;
            }
        }
        Ok(self)
    }

    pub fn unexpand_singleton_dimension(&mut self, dim: usize) -> Result<&mut Self> {
        self.check_forged()?;
        self.check_dim(dim)?;
        if self.strides[dim] != 0 {
            return Err(Error::DimensionNotExpanded(dim));
        }
        self.sizes[dim] = 1;
        Ok(self)
    }

    /// Collapse every broadcast dimension, and a broadcast tensor, to a single element.
    pub fn unexpand_singleton_dimensions(&mut self) -> Result<&mut Self> {
        self.check_forged()?;
        if self.tensor_stride == 0 {
            self.tensor = Tensor::scalar();
        }
        for (size, &stride) in self.sizes.iter_mut().zip(&self.strides) {
            if stride == 0 {
                *size = 1;
            }
        }
        Ok(self)
    }

    /// Broadcast the single sample of a scalar image to a vector of `elements` samples.
    pub fn expand_singleton_tensor(&mut self, elements: usize) -> Result<&mut Self> {
        self.check_forged()?;
        if !self.is_scalar() {
            return Err(Error::NotScalar);
        }
        if elements == 0 {
            return Err(Error::InvalidParameter("tensor extents must be positive"));
        }
        self.tensor = Tensor::vector(elements);
        self.tensor_stride = 0;
        Ok(self)
    }

    pub fn unexpand_singleton_tensor(&mut self) -> Result<&mut Self> {
        self.check_forged()?;
        if self.tensor_stride != 0 {
            return Err(Error::InvalidParameter("tensor is not expanded"));
        }
        self.tensor = Tensor::scalar();
        Ok(self)
    }

    /// Reverse the direction of `dim`.
    pub fn mirror(&mut self, dim: usize) -> Result<&mut Self> {
        self.check_forged()?;
        self.check_dim(dim)?;
        self.shift_origin((self.sizes[dim] as isize - 1) * self.strides[dim]);
        self.strides[dim] = -self.strides[dim];
        Ok(self)
    }

    /// Mirror the dimensions that are flagged. A single flag applies to all dimensions.
    pub fn mirror_dimensions(&mut self, process: &[bool]) -> Result<&mut Self> {
        self.check_forged()?;
        let nd = self.sizes.len();
        let flags = match process.len() {
            1 => vec![process[0]; nd],
            len if len == nd => process.to_vec(),
            len => return Err(Error::wrong_length(nd, len)),
        };
        for (dim, mirror) in flags.into_iter().enumerate() {
            if mirror {
                self.mirror(dim)?;
            }
        }
        Ok(self)
    }

    /// Rotate by `n` times 90 degrees in the plane of `dim1` and `dim2`, clockwise when
    /// `dim1` points right and `dim2` points down.
    pub fn rotation90(&mut self, n: isize, dim1: usize, dim2: usize) -> Result<&mut Self> {
        self.check_forged()?;
        self.check_dim(dim1)?;
        self.check_dim(dim2)?;
        if dim1 == dim2 {
            return Err(Error::InvalidParameter("rotation needs two distinct dimensions"));
        }
        match n.rem_euclid(4) {
            1 => {
                self.mirror(dim2)?;
                self.swap_dimensions(dim1, dim2)?;
            }
            2 => {
                self.mirror(dim1)?;
                self.mirror(dim2)?;
            }
            3 => {
                self.mirror(dim1)?;
                self.swap_dimensions(dim1, dim2)?;
            }
            _ => {}
        }
        Ok(self)
    }

    /// Bring the layout into its canonical form.
    ///
    /// Mirrored dimensions are un-mirrored, broadcast dimensions and a broadcast tensor collapse
    /// to one element, dimensions are sorted by increasing stride and singletons are removed.
    pub fn standardize_strides(&mut self) -> Result<&mut Self> {
        self.check_forged()?;
        if self.tensor_stride == 0 {
            self.tensor = Tensor::scalar();
        }
        let mut offset = 0;
        for (size, stride) in self.sizes.iter_mut().zip(self.strides.iter_mut()) {
            if *stride < 0 {
                offset += (*size as isize - 1) * *stride;
                *stride = -*stride;
            } else if *stride == 0 {
                *size = 1;
            }
        }
        let mut order: Vec<usize> = (0..self.sizes.len()).collect();
        order.sort_by_key(|&dim| self.strides[dim]);
        order.retain(|&dim| self.sizes[dim] > 1);

        self.shift_origin(offset);
        self.permute_dimensions(&order)
    }

    /// Turn the tensor into a spatial dimension inserted before `dim`.
    pub fn tensor_to_spatial(&mut self, dim: usize) -> Result<&mut Self> {
        self.check_forged()?;
        if dim > self.sizes.len() {
            return Err(Error::illegal_dimension(dim, self.sizes.len()));
        }
        self.sizes.insert(dim, self.tensor_elements());
        self.strides.insert(dim, self.tensor_stride);
        self.pixel_size.insert(dim);
        self.tensor = Tensor::scalar();
        self.tensor_stride = 1;
        self.reset_color_space();
        Ok(self)
    }

    /// Turn dimension `dim` into a `rows` by `columns` tensor.
    ///
    /// A zero for `rows` or `columns` is computed from the other, both zero make a column
    /// vector.
    pub fn spatial_to_tensor(
        &mut self,
        dim: usize,
        rows: usize,
        columns: usize,
    ) -> Result<&mut Self> {
        self.check_forged()?;
        if !self.is_scalar() {
            return Err(Error::NotScalar);
        }
        self.check_dim(dim)?;
        let size = self.sizes[dim];
        let (rows, columns) = match (rows, columns) {
            (0, 0) => (size, 1),
            (0, columns) => (size / columns, columns),
            (rows, 0) => (rows, size / rows),
            explicit => explicit,
        };
        if rows * columns != size {
            return Err(Error::InvalidParameter(
                "tensor shape does not match the dimension size",
            ));
        }
        self.tensor = Tensor::matrix(rows, columns);
        self.tensor_stride = self.strides[dim];
        self.sizes.remove(dim);
        self.strides.remove(dim);
        self.pixel_size.erase(dim);
        self.reset_color_space();
        Ok(self)
    }

    /// View complex samples as pairs of floats along a new dimension inserted before `dim`.
    pub fn split_complex(&mut self, dim: usize) -> Result<&mut Self> {
        self.check_forged()?;
        if !self.data_type.is_complex() {
            return Err(Error::DataTypeNotSupported(self.data_type));
        }
        if dim > self.sizes.len() {
            return Err(Error::illegal_dimension(dim, self.sizes.len()));
        }
        self.data_type = self.data_type.real();
        self.double_strides();
        self.tensor_stride *= 2;
        self.sizes.insert(dim, 2);
        self.strides.insert(dim, 1);
        self.pixel_size.insert(dim);
        Ok(self)
    }

    /// Undo [`Image::split_complex`]: `dim` must have size 2 and stride 1.
    pub fn merge_complex(&mut self, dim: usize) -> Result<&mut Self> {
        self.check_forged()?;
        let complex = self.complex_of_real()?;
        self.check_dim(dim)?;
        if self.sizes[dim] != 2 || self.strides[dim] != 1 {
            return Err(Error::IncompatibleSizes(
                "complex dimension needs size 2 and stride 1",
            ));
        }
        let even = |stride: &isize| stride % 2 == 0;
        let others_even = (0..self.sizes.len())
            .filter(|&other| other != dim)
            .all(|other| even(&self.strides[other]));
        if !others_even || !(self.is_scalar() || even(&self.tensor_stride)) {
            return Err(Error::NotRepresentable("strides are not whole complex samples"));
        }
        self.sizes.remove(dim);
        self.strides.remove(dim);
        self.pixel_size.erase(dim);
        self.data_type = complex;
        self.halve_strides();
        self.tensor_stride /= 2;
        Ok(self)
    }

    /// View complex samples as a two-element tensor of floats.
    pub fn split_complex_to_tensor(&mut self) -> Result<&mut Self> {
        self.check_forged()?;
        if !self.is_scalar() {
            return Err(Error::NotScalar);
        }
        if !self.data_type.is_complex() {
            return Err(Error::DataTypeNotSupported(self.data_type));
        }
        self.data_type = self.data_type.real();
        self.double_strides();
        self.tensor = Tensor::vector(2);
        self.tensor_stride = 1;
        self.reset_color_space();
        Ok(self)
    }

    /// Undo [`Image::split_complex_to_tensor`].
    pub fn merge_tensor_to_complex(&mut self) -> Result<&mut Self> {
        self.check_forged()?;
        if self.tensor_elements() != 2 {
            return Err(Error::TensorElementsMismatch {
                expected: 2,
                got: self.tensor_elements(),
            });
        }
        if self.tensor_stride != 1 {
            return Err(Error::NotRepresentable("tensor elements are not adjacent"));
        }
        let complex = self.complex_of_real()?;
        if self.strides.iter().any(|stride| stride % 2 != 0) {
            return Err(Error::NotRepresentable("strides are not whole complex samples"));
        }
        self.data_type = complex;
        self.tensor = Tensor::scalar();
        self.halve_strides();
        self.reset_color_space();
        Ok(self)
    }

    fn complex_of_real(&self) -> Result<DataType> {
        match self.data_type {
            DataType::SFloat => Ok(DataType::SComplex),
            DataType::DFloat => Ok(DataType::DComplex),
            other => Err(Error::DataTypeNotSupported(other)),
        }
    }

    fn double_strides(&mut self) {
        self.strides.iter_mut().for_each(|stride| *stride *= 2);
    }

    fn halve_strides(&mut self) {
        self.strides.iter_mut().for_each(|stride| *stride /= 2);
    }

    /// Reinterpret the bytes as samples of another data type.
    ///
    /// When the sample size changes, the first dimension, by index, with stride 1 and more than
    /// one pixel is split or merged. Casting to a smaller type without such a dimension adds one
    /// at index 0. Casting to a larger type fails unless that dimension's size and every other
    /// stride divide by the size ratio.
    pub fn reinterpret_cast(&mut self, data_type: DataType) -> Result<&mut Self> {
        self.check_forged()?;
        if data_type == self.data_type {
            return Ok(self);
        }
        let (in_size, out_size) = (self.data_type.size_of(), data_type.size_of());
        let unit = (0..self.sizes.len()).find(|&dim| self.sizes[dim] > 1 && self.strides[dim] == 1);

        if in_size > out_size {
            let ratio = (in_size / out_size) as isize;
            let dim = match unit {
                Some(dim) => dim,
                None => {
                    self.sizes.insert(0, 1);
                    self.strides.insert(0, 1);
                    self.pixel_size.insert(0);
                    0
                }
            };
            self.sizes[dim] *= ratio as usize;
            for (other, stride) in self.strides.iter_mut().enumerate() {
                if other != dim {
                    *stride *= ratio;
                }
            }
            self.tensor_stride *= ratio;
        } else if in_size < out_size {
            let ratio = (out_size / in_size) as isize;
            let dim = unit.ok_or(Error::NotRepresentable(CAST_ERROR))?;
            let divisible = self.sizes[dim] % ratio as usize == 0
                && (0..self.sizes.len())
                    .filter(|&other| other != dim)
                    .all(|other| self.strides[other] % ratio == 0)
                && (self.is_scalar() || self.tensor_stride % ratio == 0);
            if !divisible {
                return Err(Error::NotRepresentable(CAST_ERROR));
            }
            self.sizes[dim] /= ratio as usize;
            for (other, stride) in self.strides.iter_mut().enumerate() {
                if other != dim {
                    *stride /= ratio;
                }
            }
            self.tensor_stride /= ratio;
        }
        self.data_type = data_type;
        Ok(self)
    }

    /// Reinterpret as the signed integer type of the same size.
    pub fn reinterpret_cast_to_signed_integer(&mut self) -> Result<&mut Self> {
        let target = self
            .integer_like()
            .and_then(DataType::to_signed_integer)
            .ok_or(Error::DataTypeNotSupported(self.data_type))?;
        self.reinterpret_cast(target)
    }

    /// Reinterpret as the unsigned integer type of the same size.
    pub fn reinterpret_cast_to_unsigned_integer(&mut self) -> Result<&mut Self> {
        let target = self
            .integer_like()
            .and_then(DataType::to_unsigned_integer)
            .ok_or(Error::DataTypeNotSupported(self.data_type))?;
        self.reinterpret_cast(target)
    }

    fn integer_like(&self) -> Option<DataType> {
        let data_type = self.data_type;
        (data_type.is_integer() || data_type.is_binary()).then_some(data_type)
    }

    /// Restrict the image to a window of `sizes` placed according to `location`.
    pub fn crop(&mut self, sizes: &[usize], location: CropLocation) -> Result<&mut Self> {
        self.check_forged()?;
        let offsets = Self::window_origin(&self.sizes, sizes, location)?;
        let shift = offsets
            .iter()
            .zip(&self.strides)
            .map(|(&offset, &stride)| offset as isize * stride)
            .sum();
        self.shift_origin(shift);
        self.sizes = sizes.to_vec();
        Ok(self)
    }

    /// A cropped view sharing the data.
    pub fn cropped(&self, sizes: &[usize], location: CropLocation) -> Result<Image> {
        let mut view = self.clone();
        view.crop(sizes, location)?;
        Ok(view)
    }

    /// Keep the pixels selected by one range per dimension, or by one range for all of them.
    pub(crate) fn restrict(&mut self, ranges: &[Range]) -> Result<&mut Self> {
        self.check_forged()?;
        let nd = self.sizes.len();
        let mut ranges = match ranges.len() {
            1 => vec![ranges[0]; nd],
            len if len == nd => ranges.to_vec(),
            len => return Err(Error::wrong_length(nd, len)),
        };
        for (range, &size) in ranges.iter_mut().zip(&self.sizes) {
            range.fix(size)?;
        }
        let mut shift = 0;
        for (dim, range) in ranges.iter().enumerate() {
            shift += range.start * self.strides[dim];
            self.sizes[dim] = range.size();
            self.strides[dim] *= range.signed_step();
        }
        self.shift_origin(shift);
        Ok(self)
    }

    /// The inclusive ranges that [`Image::crop`] would keep.
    pub fn crop_window(&self, sizes: &[usize], location: CropLocation) -> Result<Vec<Range>> {
        self.check_forged()?;
        let offsets = Self::window_origin(&self.sizes, sizes, location)?;
        Ok(offsets
            .into_iter()
            .zip(sizes)
            .map(|(offset, &size)| Range::new(offset as isize, (offset + size) as isize - 1))
            .collect())
    }

    fn window_origin(
        image: &[usize],
        window: &[usize],
        location: CropLocation,
    ) -> Result<Vec<usize>> {
        if window.len() != image.len() {
            return Err(Error::wrong_length(image.len(), window.len()));
        }
        if window.contains(&0) {
            return Err(Error::InvalidParameter("sizes must be positive"));
        }
        if window.iter().zip(image).any(|(window, image)| window > image) {
            return Err(Error::IndexOutOfRange("window is larger than the image"));
        }
        Ok(image
            .iter()
            .zip(window)
            .map(|(&size, &window)| location.offset(size, window))
            .collect())
    }

    /// Give the tensor a new matrix shape with the same number of elements.
    pub fn reshape_tensor(&mut self, rows: usize, columns: usize) -> Result<&mut Self> {
        self.tensor.reshape(rows, columns)?;
        Ok(self)
    }

    pub fn reshape_tensor_as_vector(&mut self) -> &mut Self {
        self.tensor = Tensor::vector(self.tensor_elements());
        self
    }

    /// Interpret the tensor elements as the diagonal of a square matrix.
    pub fn reshape_tensor_as_diagonal(&mut self) -> Result<&mut Self> {
        let n = self.tensor_elements();
        self.tensor = Tensor::with_shape(TensorShape::DiagonalMatrix, n, n)?;
        Ok(self)
    }

    pub fn transpose_tensor(&mut self) -> &mut Self {
        self.tensor.transpose();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> Image {
        Image::new(&[5, 10, 15], 3, DataType::SFloat).expect("allocation")
    }

    #[test]
    fn permute_and_swap() -> Result<()> {
        let mut img = image();
        let origin = img.origin();
        img.swap_dimensions(1, 2)?;
        assert_eq!(img.sizes(), [5, 15, 10]);
        assert_eq!(img.strides(), [3, 150, 15]);
        img.permute_dimensions(&[2, 1, 0])?;
        assert_eq!(img.sizes(), [10, 15, 5]);
        assert_eq!(img.strides(), [15, 150, 3]);
        img.standardize_strides()?;
        assert_eq!(img.sizes(), [5, 10, 15]);
        assert_eq!(img.strides(), [3, 15, 150]);
        assert_eq!(img.origin(), origin);

        assert!(img.permute_dimensions(&[0, 1]).is_err());
        assert!(img.permute_dimensions(&[0, 1, 2, 3]).is_err());
        assert!(img.permute_dimensions(&[0, 1, 1]).is_err());
        img.flatten()?;
        assert_eq!(img.sizes(), [750]);
        assert_eq!(img.strides(), [3]);
        assert_eq!(img.origin(), origin);
        Ok(())
    }

    #[test]
    fn mirror_and_rotate() -> Result<()> {
        let mut img = image();
        let origin = img.origin();
        img.mirror_dimensions(&[true, false, false])?;
        assert_eq!(img.strides(), [-3, 15, 150]);
        assert_ne!(img.origin(), origin);
        img.rotation90(1, 0, 2)?;
        assert_eq!(img.sizes(), [15, 10, 5]);
        assert_eq!(img.strides(), [-150, 15, -3]);
        img.standardize_strides()?;
        assert_eq!(img.sizes(), [5, 10, 15]);
        assert_eq!(img.strides(), [3, 15, 150]);
        assert_eq!(img.origin(), origin);
        img.flatten_as_much_as_possible()?;
        assert_eq!(img.sizes(), [750]);
        assert_eq!(img.origin(), origin);
        Ok(())
    }

    #[test]
    fn partial_flatten() -> Result<()> {
        let mut img = image();
        img.crop(&[5, 5, 5], CropLocation::BottomRight)?;
        img.flatten_as_much_as_possible()?;
        assert_eq!(img.sizes(), [25, 5]);
        assert_eq!(img.strides(), [3, 150]);
        Ok(())
    }

    #[test]
    fn flatten_copies_without_simple_stride() -> Result<()> {
        let mut img = Image::new(&[4, 3], 1, DataType::UInt8)?;
        img.set_sample(&[3, 2], 0, 9)?;
        let mut window = img.cropped(&[2, 2], CropLocation::BottomRight)?;
        window.flatten()?;
        assert_eq!(window.sizes(), [4]);
        assert!(!window.aliases(&img));
        assert_eq!(window.sample(&[3], 0)?, nd_texel::Scalar::Int(9));

        let mut protected = img.cropped(&[2, 2], CropLocation::TopLeft)?;
        protected.protect(true);
        assert_eq!(protected.flatten().err(), Some(Error::Protected));
        Ok(())
    }

    #[test]
    fn split_dimension() -> Result<()> {
        let mut img = image();
        img.split_dimension(1, 5)?;
        assert_eq!(img.sizes(), [5, 5, 2, 15]);
        assert_eq!(img.strides(), [3, 15, 75, 150]);
        assert_eq!(
            img.split_dimension(0, 2).err(),
            Some(Error::NotDivisible("dimension cannot be evenly divided"))
        );
        Ok(())
    }

    #[test]
    fn tensor_dimensions() -> Result<()> {
        let mut img = Image::new(&[5, 10, 15], 3, DataType::SComplex)?;
        img.tensor_to_spatial(1)?;
        assert_eq!(img.sizes(), [5, 3, 10, 15]);
        assert_eq!(img.strides(), [3, 1, 15, 150]);
        assert_eq!(img.tensor_elements(), 1);
        img.spatial_to_tensor(0, 0, 0)?;
        assert_eq!(img.sizes(), [3, 10, 15]);
        assert_eq!(img.strides(), [1, 15, 150]);
        assert_eq!(img.tensor_elements(), 5);
        assert_eq!(img.tensor_stride(), 3);

        img.split_complex(3)?;
        assert_eq!(img.sizes(), [3, 10, 15, 2]);
        assert_eq!(img.strides(), [2, 30, 300, 1]);
        assert_eq!(img.tensor_stride(), 6);
        img.merge_complex(3)?;
        assert_eq!(img.strides(), [1, 15, 150]);
        assert_eq!(img.tensor_stride(), 3);

        img.tensor_to_spatial(3)?;
        img.split_complex_to_tensor()?;
        assert_eq!(img.sizes(), [3, 10, 15, 5]);
        assert_eq!(img.strides(), [2, 30, 300, 6]);
        assert_eq!(img.tensor_elements(), 2);
        img.merge_tensor_to_complex()?;
        assert_eq!(img.strides(), [1, 15, 150, 3]);
        assert_eq!(img.data_type(), DataType::SComplex);
        Ok(())
    }

    #[test]
    fn singletons() -> Result<()> {
        let mut img = Image::new(&[5, 10, 15], 1, DataType::SFloat)?;
        img.add_singleton(1)?;
        assert_eq!(img.sizes(), [5, 1, 10, 15]);
        assert_eq!(img.strides(), [1, 0, 5, 50]);
        img.expand_dimensionality(5)?;
        img.expand_singleton_dimension(1, 20)?;
        img.expand_singleton_dimension(4, 25)?;
        assert_eq!(img.sizes(), [5, 20, 10, 15, 25]);
        assert_eq!(img.strides(), [1, 0, 5, 50, 0]);
        img.expand_singleton_tensor(3)?;
        assert_eq!(img.tensor_stride(), 0);
        assert!(img.is_singleton_expanded());

        img.unexpand_singleton_dimensions()?;
        assert_eq!(img.sizes(), [5, 1, 10, 15, 1]);
        assert_eq!(img.tensor_elements(), 1);
        assert_eq!(img.squeeze()?, [1, 4]);
        assert_eq!(img.sizes(), [5, 10, 15]);

        img.add_singletons(&[1, 2, 4])?;
        assert_eq!(img.sizes(), [5, 1, 1, 10, 1, 15]);
        assert_eq!(img.unexpand_singleton_dimension(0).err(), Some(Error::DimensionNotExpanded(0)));
        Ok(())
    }

    #[test]
    fn standardize_broadcast() -> Result<()> {
        let mut img = Image::new(&[5, 10, 15], 1, DataType::SFloat)?;
        img.add_singleton(1)?;
        img.expand_singleton_dimension(1, 20)?;
        img.expand_singleton_tensor(3)?;
        img.standardize_strides()?;
        assert_eq!(img.sizes(), [5, 10, 15]);
        assert_eq!(img.strides(), [1, 5, 50]);
        assert_eq!(img.tensor_elements(), 1);
        Ok(())
    }

    #[test]
    fn reinterpret() -> Result<()> {
        let src = Image::new(&[7, 8], 1, DataType::SInt32)?;
        let mut dest = src.clone();
        dest.reinterpret_cast(DataType::UInt32)?;
        assert_eq!(dest.sizes(), src.sizes());
        dest.reinterpret_cast(DataType::UInt16)?;
        assert_eq!(dest.sizes(), [14, 8]);
        dest.reinterpret_cast(DataType::SInt32)?;
        assert_eq!(dest.sizes(), [7, 8]);
        assert_eq!(
            dest.reinterpret_cast(DataType::DFloat).err(),
            Some(Error::NotRepresentable(CAST_ERROR))
        );
        assert_eq!(dest.data_type(), DataType::SInt32);

        dest.crop(&[6, 8], CropLocation::Center)?;
        assert!(dest.reinterpret_cast(DataType::DFloat).is_err());
        let mut dest = dest.similar()?;
        dest.reinterpret_cast(DataType::DFloat)?;
        assert_eq!(dest.sizes(), [3, 8]);
        Ok(())
    }

    #[test]
    fn reinterpret_tensor() -> Result<()> {
        let mut dest = Image::new(&[7, 8], 3, DataType::SInt32)?;
        dest.reinterpret_cast(DataType::UInt16)?;
        assert_eq!(dest.sizes(), [2, 7, 8]);
        dest.reinterpret_cast(DataType::SInt32)?;
        assert_eq!(dest.sizes(), [1, 7, 8]);
        assert!(dest.reinterpret_cast(DataType::DFloat).is_err());

        let mut float = Image::new(&[], 1, DataType::SFloat)?;
        assert!(float.reinterpret_cast_to_signed_integer().is_err());
        let mut int = Image::new(&[7, 8], 1, DataType::SInt8)?;
        int.reinterpret_cast_to_unsigned_integer()?;
        assert_eq!(int.data_type(), DataType::UInt8);
        Ok(())
    }

    #[test]
    fn crop_windows() -> Result<()> {
        let img = Image::new(&[7, 8], 1, DataType::UInt8)?;
        let window = img.crop_window(&[4, 3], CropLocation::Center)?;
        assert_eq!(window, [Range::new(1, 4), Range::new(3, 5)]);
        assert!(img.cropped(&[8, 8], CropLocation::Center).is_err());
        let cropped = img.cropped(&[4, 3], CropLocation::Center)?;
        assert_eq!(cropped.origin(), 1 + 3 * 7);
        Ok(())
    }

    #[test]
    fn tensor_shapes() -> Result<()> {
        let mut img = Image::new(&[2], 6, DataType::UInt8)?;
        img.reshape_tensor(2, 3)?;
        assert_eq!(img.tensor().rows(), 2);
        img.transpose_tensor();
        assert_eq!(img.tensor().shape(), TensorShape::RowMajorMatrix);
        assert!(img.reshape_tensor(4, 2).is_err());
        img.reshape_tensor_as_diagonal()?;
        assert_eq!(img.tensor().rows(), 6);
        img.reshape_tensor_as_vector();
        assert!(img.tensor().is_vector());
        Ok(())
    }
}
