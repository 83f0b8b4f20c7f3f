//! The strided nD image.
//!
//! An [`Image`] is a set of sizes and signed strides over a reference counted [`DataSegment`].
//! Cloning an image is cheap and shares the samples. Structural operations, see the `manip`
//! submodule, only change sizes, strides and origin. Operations that must change the memory
//! itself, [`Image::copy`] and [`Image::convert`] among them, reallocate whenever the memory is
//! shared in a way that would make an in-place update visible through other images.
//!
//! Sample `e` of the pixel at coordinates `c` lives at byte
//!
//! ```text
//! origin + (Σ c[i] * strides[i] + e * tensor_stride) * data_type.size_of()
//! ```
//!
//! of the data segment. A stride of zero marks a dimension broadcast from a single pixel, a
//! tensor stride of zero marks a tensor broadcast from a single sample.
use core::fmt;
use std::rc::Rc;

use nd_texel::{DataSegment, DataType, SampleRun};

use crate::error::{Error, Result};
use crate::pixel_size::PixelSize;
use crate::stride;
use crate::tensor::Tensor;

mod access;
mod copy;
mod forge;
mod manip;

pub use self::access::Pixel;
pub use self::forge::ExternalInterface;

pub struct Image {
    sizes: Vec<usize>,
    strides: Vec<isize>,
    tensor: Tensor,
    tensor_stride: isize,
    data_type: DataType,
    pixel_size: PixelSize,
    color_space: Option<String>,
    protect: bool,
    data: Option<DataSegment>,
    /// Byte position of the first sample of the pixel at the origin.
    origin: usize,
    external: Option<Rc<dyn ExternalInterface>>,
}

impl Image {
    /// An image with properties but without data.
    ///
    /// Sizes may contain zeros, which an image can only be forged without.
    pub fn raw(sizes: &[usize], tensor_elements: usize, data_type: DataType) -> Self {
        Image {
            sizes: sizes.to_vec(),
            tensor: Tensor::vector(tensor_elements.max(1)),
            data_type,
            ..Image::default()
        }
    }

    /// A forged image with all samples zero.
    pub fn new(sizes: &[usize], tensor_elements: usize, data_type: DataType) -> Result<Self> {
        let mut image = Image::raw(sizes, tensor_elements, data_type);
        image.forge()?;
        Ok(image)
    }

    /// A 0-D image holding a single value.
    pub fn from_scalar(value: impl Into<nd_texel::Scalar>, data_type: DataType) -> Result<Self> {
        let image = Image::new(&[], 1, data_type)?;
        image.run(0, 0).set(0, 0, value.into());
        Ok(image)
    }

    /// A forged scalar image holding a copy of some samples, dimension 0 varying fastest.
    pub fn from_samples<T>(sizes: &[usize], samples: &[T]) -> Result<Self>
    where
        T: nd_texel::Sample + bytemuck::Pod,
    {
        let pixels: usize = sizes.iter().product();
        if pixels != samples.len() {
            return Err(Error::IncompatibleSizes("sample count differs from the image size"));
        }
        let data = DataSegment::with_bytes(bytemuck::cast_slice(samples));
        let strides = stride::normal_strides(sizes, 1);
        Image::from_segment(data, 0, T::DATA_TYPE, sizes, &strides, Tensor::scalar(), 1)
    }

    /// View memory that was allocated elsewhere.
    ///
    /// The layout is checked against the length of the segment. `origin` is the byte position
    /// of the first sample of the pixel at the origin.
    pub fn from_segment(
        data: DataSegment,
        origin: usize,
        data_type: DataType,
        sizes: &[usize],
        strides: &[isize],
        tensor: Tensor,
        tensor_stride: isize,
    ) -> Result<Self> {
        if sizes.len() != strides.len() {
            return Err(Error::wrong_length(sizes.len(), strides.len()));
        }
        if sizes.contains(&0) {
            return Err(Error::InvalidParameter("sizes must be positive"));
        }

        let (low, high) = stride::footprint(sizes, strides, tensor.elements(), tensor_stride);
        let size = data_type.size_of() as isize;
        let first = origin as isize + low * size;
        let end = origin as isize + (high + 1) * size;
        if first < 0 || end > data.len() as isize {
            return Err(Error::IndexOutOfRange("layout exceeds the data segment"));
        }

        Ok(Image {
            sizes: sizes.to_vec(),
            strides: strides.to_vec(),
            tensor,
            tensor_stride,
            data_type,
            data: Some(data),
            origin,
            ..Image::default()
        })
    }

    /// An unforged image that allocates through `external` once forged.
    pub fn with_external_interface(external: Rc<dyn ExternalInterface>) -> Self {
        Image {
            external: Some(external),
            ..Image::default()
        }
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn size(&self, dim: usize) -> usize {
        self.sizes[dim]
    }

    pub fn dimensionality(&self) -> usize {
        self.sizes.len()
    }

    /// Strides in samples, empty for an image that was never forged.
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn stride(&self, dim: usize) -> isize {
        self.strides[dim]
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    pub fn tensor_elements(&self) -> usize {
        self.tensor.elements()
    }

    pub fn tensor_stride(&self) -> isize {
        self.tensor_stride
    }

    pub fn is_scalar(&self) -> bool {
        self.tensor.is_scalar()
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn number_of_pixels(&self) -> usize {
        self.sizes.iter().product()
    }

    pub fn number_of_samples(&self) -> usize {
        self.number_of_pixels() * self.tensor_elements()
    }

    pub fn pixel_size(&self) -> &PixelSize {
        &self.pixel_size
    }

    pub fn set_pixel_size(&mut self, pixel_size: PixelSize) {
        self.pixel_size = pixel_size;
    }

    pub fn color_space(&self) -> Option<&str> {
        self.color_space.as_deref()
    }

    pub fn set_color_space(&mut self, color_space: impl Into<String>) {
        self.color_space = Some(color_space.into());
    }

    pub fn reset_color_space(&mut self) {
        self.color_space = None;
    }

    pub fn external_interface(&self) -> Option<&Rc<dyn ExternalInterface>> {
        self.external.as_ref()
    }

    /// Set the allocator used the next time this image is forged.
    pub fn set_external_interface(
        &mut self,
        external: Option<Rc<dyn ExternalInterface>>,
    ) -> Result<()> {
        self.check_raw()?;
        self.external = external;
        Ok(())
    }

    pub fn set_sizes(&mut self, sizes: &[usize]) -> Result<()> {
        self.check_raw()?;
        self.sizes = sizes.to_vec();
        Ok(())
    }

    /// Request a layout for the next forge. Strides not describing contiguous, non-overlapping
    /// data are replaced by the normal ones at that time.
    pub fn set_strides(&mut self, strides: &[isize], tensor_stride: isize) -> Result<()> {
        self.check_raw()?;
        self.strides = strides.to_vec();
        self.tensor_stride = tensor_stride;
        Ok(())
    }

    pub fn set_tensor(&mut self, tensor: Tensor) -> Result<()> {
        self.check_raw()?;
        self.tensor = tensor;
        Ok(())
    }

    pub fn set_data_type(&mut self, data_type: DataType) -> Result<()> {
        self.check_raw()?;
        self.data_type = data_type;
        Ok(())
    }

    pub fn is_forged(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_protected(&self) -> bool {
        self.protect
    }

    /// Set the protect flag, returning its previous value.
    ///
    /// A protected image refuses to strip or reallocate its data. Operations that would need to
    /// fail with [`Error::Protected`] instead.
    pub fn protect(&mut self, protect: bool) -> bool {
        core::mem::replace(&mut self.protect, protect)
    }

    pub fn data(&self) -> Option<&DataSegment> {
        self.data.as_ref()
    }

    /// Byte position of the origin pixel within the data segment.
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Whether the strides are the ones [`Image::forge`] assigns by default.
    pub fn has_normal_strides(&self) -> bool {
        self.is_forged()
            && (self.tensor_stride == 1 || self.is_scalar())
            && self.strides == stride::normal_strides(&self.sizes, self.tensor_elements())
    }

    /// Whether the samples fill a contiguous block of memory without gaps or repetitions.
    pub fn has_contiguous_data(&self) -> bool {
        if !self.is_forged() {
            return false;
        }
        self.has_contiguous_layout()
    }

    pub(crate) fn has_contiguous_layout(&self) -> bool {
        let (telems, tstride) = (self.tensor_elements(), self.tensor_stride);
        let (low, high) = stride::footprint(&self.sizes, &self.strides, telems, tstride);
        self.strides.len() == self.sizes.len()
            && stride::is_non_overlapping(&self.sizes, &self.strides, telems, tstride)
            && (high - low + 1) as usize == self.number_of_samples()
    }

    /// Whether any dimension, or the tensor, is broadcast from a single sample.
    pub fn is_singleton_expanded(&self) -> bool {
        (self.tensor_stride == 0 && !self.is_scalar())
            || self
                .sizes
                .iter()
                .zip(&self.strides)
                .any(|(&size, &stride)| size > 1 && stride == 0)
    }

    pub fn has_simple_stride(&self) -> bool {
        self.simple_stride_and_offset().is_some()
    }

    /// The stride with which all pixels can be visited in memory order, and the byte position of
    /// the pixel with the lowest address.
    pub fn simple_stride_and_origin(&self) -> Option<(isize, usize)> {
        self.simple_stride_and_offset()
            .map(|(stride, offset)| (stride, self.byte_position(offset)))
    }

    pub(crate) fn simple_stride_and_offset(&self) -> Option<(isize, isize)> {
        if !self.is_forged() {
            return None;
        }
        stride::simple_stride(&self.sizes, &self.strides)
    }

    /// Whether both images, of equal sizes, order their dimensions the same way in memory.
    pub fn has_same_dimension_order(&self, other: &Image) -> bool {
        self.sizes == other.sizes
            && stride::same_dimension_order(&self.sizes, &self.strides, &other.strides)
    }

    /// Whether other images share the data segment of this one.
    pub fn is_shared(&self) -> bool {
        self.data.as_ref().is_some_and(|data| data.handle_count() > 1)
    }

    /// The address range of the bytes this image can touch.
    fn address_range(&self) -> Option<core::ops::Range<usize>> {
        let data = self.data.as_ref()?;
        let (telems, tstride) = (self.tensor_elements(), self.tensor_stride);
        let (low, high) = stride::footprint(&self.sizes, &self.strides, telems, tstride);
        let start = data.address() + self.byte_position(low);
        let end = data.address() + self.byte_position(high) + self.data_type.size_of();
        Some(start..end)
    }

    /// Whether the two images may touch the same bytes.
    ///
    /// This compares address ranges and so is conservative: two interleaved images that never
    /// touch the same sample, such as two tensor channels, are still reported as aliasing.
    pub fn aliases(&self, other: &Image) -> bool {
        match (self.address_range(), other.address_range()) {
            (Some(a), Some(b)) => a.start < b.end && b.start < a.end,
            _ => false,
        }
    }

    /// Whether the two images read and write exactly the same samples the same way.
    pub fn is_identical_view(&self, other: &Image) -> bool {
        match (&self.data, &other.data) {
            (Some(a), Some(b)) => {
                a.ptr_eq(b)
                    && self.origin == other.origin
                    && self.data_type == other.data_type
                    && self.sizes == other.sizes
                    && self.strides == other.strides
                    && self.tensor_elements() == other.tensor_elements()
                    && (self.tensor_stride == other.tensor_stride || self.is_scalar())
            }
            _ => false,
        }
    }

    /// Whether the images alias without being identical views.
    pub fn is_overlapping_view(&self, other: &Image) -> bool {
        self.aliases(other) && !self.is_identical_view(other)
    }

    /// Whether the image can be broadcast to `sizes` by expanding singleton dimensions.
    pub fn is_singleton_expansion_possible(&self, sizes: &[usize]) -> bool {
        sizes.len() >= self.sizes.len()
            && self
                .sizes
                .iter()
                .zip(sizes)
                .all(|(&own, &new)| own == new || own == 1)
    }

    pub(crate) fn check_forged(&self) -> Result<()> {
        if self.is_forged() {
            Ok(())
        } else {
            Err(Error::NotForged)
        }
    }

    pub(crate) fn check_raw(&self) -> Result<()> {
        if self.is_forged() {
            Err(Error::AlreadyForged)
        } else {
            Ok(())
        }
    }

    pub(crate) fn check_dim(&self, dim: usize) -> Result<()> {
        if dim < self.sizes.len() {
            Ok(())
        } else {
            Err(Error::illegal_dimension(dim, self.sizes.len()))
        }
    }

    /// Byte position of the sample `offset` samples away from the origin.
    pub(crate) fn byte_position(&self, offset: isize) -> usize {
        (self.origin as isize + offset * self.data_type.size_of() as isize) as usize
    }

    pub(crate) fn shift_origin(&mut self, offset: isize) {
        self.origin = self.byte_position(offset);
    }

    /// A run of pixels starting `offset` samples from the origin.
    ///
    /// Accessing a run of an unforged image panics.
    pub(crate) fn run(&self, offset: isize, stride: isize) -> SampleRun<'_> {
        SampleRun {
            cells: self.data.as_ref().map_or(&[][..], |data| data.as_cells()),
            offset: self.byte_position(offset),
            data_type: self.data_type,
            stride,
            tensor_stride: self.tensor_stride,
        }
    }

    /// Move the data and layout of `other` into this image, keeping all other properties.
    pub(crate) fn take_data_from(&mut self, other: Image) {
        self.data = other.data;
        self.origin = other.origin;
        self.strides = other.strides;
        self.tensor_stride = other.tensor_stride;
        self.data_type = other.data_type;
    }
}

impl Default for Image {
    fn default() -> Self {
        Image {
            sizes: Vec::new(),
            strides: Vec::new(),
            tensor: Tensor::scalar(),
            tensor_stride: 1,
            data_type: DataType::SFloat,
            pixel_size: PixelSize::default(),
            color_space: None,
            protect: false,
            data: None,
            origin: 0,
            external: None,
        }
    }
}

/// Shares the data. The clone is never protected.
impl Clone for Image {
    fn clone(&self) -> Self {
        Image {
            sizes: self.sizes.clone(),
            strides: self.strides.clone(),
            tensor: self.tensor,
            tensor_stride: self.tensor_stride,
            data_type: self.data_type,
            pixel_size: self.pixel_size.clone(),
            color_space: self.color_space.clone(),
            protect: false,
            data: self.data.clone(),
            origin: self.origin,
            external: self.external.clone(),
        }
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Image")
            .field("sizes", &self.sizes)
            .field("strides", &self.strides)
            .field("tensor", &self.tensor)
            .field("tensor_stride", &self.tensor_stride)
            .field("data_type", &self.data_type)
            .field("forged", &self.is_forged())
            .field("origin", &self.origin)
            .field("protect", &self.protect)
            .finish()
    }
}
