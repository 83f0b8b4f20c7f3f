//! Allocation, reallocation and release of image data.
use log::{debug, trace};
use nd_texel::{DataSegment, DataType};

use crate::error::{Error, Result};
use crate::options::AcceptDataTypeChange;
use crate::stride;
use crate::tensor::Tensor;

use super::Image;

/// An allocator for image data, for images whose memory must satisfy a foreign layout.
///
/// The suggested `strides` and `tensor_stride` are those the image would get by default. The
/// interface may replace them, and the image honors whatever it leaves there. The returned
/// segment must hold every sample of the resulting layout, counting from its first byte for
/// layouts without negative strides.
pub trait ExternalInterface {
    fn allocate_data(
        &self,
        sizes: &[usize],
        strides: &mut Vec<isize>,
        tensor: &Tensor,
        tensor_stride: &mut isize,
        data_type: DataType,
    ) -> Result<DataSegment>;
}

impl Image {
    /// Allocate data for the current properties. Does nothing for a forged image.
    ///
    /// Requested strides, see [`Image::set_strides`], are kept if they describe contiguous data;
    /// otherwise dimension 0 varies fastest with the tensor interleaved.
    pub fn forge(&mut self) -> Result<()> {
        if self.is_forged() {
            return Ok(());
        }
        if self.sizes.contains(&0) {
            return Err(Error::InvalidParameter("sizes must be positive"));
        }

        let samples = self
            .sizes
            .iter()
            .try_fold(self.tensor_elements(), |acc, &size| acc.checked_mul(size))
            .and_then(|samples| samples.checked_mul(self.data_type.size_of()))
            .filter(|&bytes| bytes <= isize::MAX as usize);
        if samples.is_none() {
            return Err(Error::InvalidParameter("image is too large"));
        }

        if !self.has_contiguous_layout() {
            self.strides = stride::normal_strides(&self.sizes, self.tensor_elements());
            self.tensor_stride = 1;
        }

        let size = self.data_type.size_of() as isize;
        let data = match self.external.clone() {
            Some(external) => {
                let mut strides = self.strides.clone();
                let mut tensor_stride = self.tensor_stride;
                let data = external.allocate_data(
                    &self.sizes,
                    &mut strides,
                    &self.tensor,
                    &mut tensor_stride,
                    self.data_type,
                )?;

                let telems = self.tensor_elements();
                if strides.len() != self.sizes.len()
                    || !stride::is_non_overlapping(&self.sizes, &strides, telems, tensor_stride)
                {
                    return Err(Error::InvalidParameter(
                        "external interface returned an invalid layout",
                    ));
                }
                let (low, high) = stride::footprint(&self.sizes, &strides, telems, tensor_stride);
                if ((high - low + 1) * size) as usize > data.len() {
                    return Err(Error::InvalidParameter(
                        "external interface returned too little memory",
                    ));
                }

                debug!(
                    "forged {:?} {} through external interface, strides {:?}",
                    self.sizes, self.data_type, strides
                );
                self.strides = strides;
                self.tensor_stride = tensor_stride;
                data
            }
            None => {
                let (low, high) = stride::footprint(
                    &self.sizes,
                    &self.strides,
                    self.tensor_elements(),
                    self.tensor_stride,
                );
                trace!("forged {:?} {}", self.sizes, self.data_type);
                DataSegment::new(((high - low + 1) * size) as usize)
            }
        };

        let (low, _) = stride::footprint(
            &self.sizes,
            &self.strides,
            self.tensor_elements(),
            self.tensor_stride,
        );
        self.origin = (-low * size) as usize;
        self.data = Some(data);
        Ok(())
    }

    /// Make this a forged image of the given properties, reusing its data when possible.
    ///
    /// A forged image keeps its data when it already has these properties and does not share its
    /// data. A protected image keeps its data if the sizes and tensor match and, if allowed, even
    /// with a different data type; any other request fails.
    pub fn reforge(
        &mut self,
        sizes: &[usize],
        tensor_elements: usize,
        data_type: DataType,
        accept: AcceptDataTypeChange,
    ) -> Result<()> {
        if self.is_forged() {
            let same_geometry = self.sizes == sizes && self.tensor_elements() == tensor_elements;
            let same_type = self.data_type == data_type;
            if self.protect {
                if same_geometry && (same_type || accept == AcceptDataTypeChange::DoAllow) {
                    return Ok(());
                }
                return Err(Error::Protected);
            }
            if same_geometry && same_type && !self.is_shared() {
                trace!("reforge of {:?} {} reuses data", sizes, data_type);
                return Ok(());
            }
            debug!(
                "reforge from {:?} {} to {:?} {} reallocates",
                self.sizes, self.data_type, sizes, data_type
            );
            self.strip()?;
        }

        if self.sizes != sizes || self.tensor_elements() != tensor_elements {
            self.strides.clear();
            self.sizes = sizes.to_vec();
        }
        if self.tensor_elements() != tensor_elements {
            self.tensor = Tensor::vector(tensor_elements);
        }
        self.data_type = data_type;
        self.forge()
    }

    /// Reforge with the sizes, tensor and data type of another image.
    pub fn reforge_like(&mut self, src: &Image) -> Result<()> {
        self.reforge(
            &src.sizes,
            src.tensor_elements(),
            src.data_type,
            AcceptDataTypeChange::DontAllow,
        )?;
        self.tensor = src.tensor;
        self.copy_non_data_properties(src);
        Ok(())
    }

    /// Release the data, keeping all properties. Fails on a protected image.
    pub fn strip(&mut self) -> Result<()> {
        if self.data.is_none() {
            return Ok(());
        }
        if self.protect {
            return Err(Error::Protected);
        }
        self.data = None;
        self.origin = 0;
        Ok(())
    }

    /// A new forged image with the same properties, and the same layout if it is contiguous.
    pub fn similar(&self) -> Result<Image> {
        self.similar_typed(self.data_type)
    }

    pub fn similar_typed(&self, data_type: DataType) -> Result<Image> {
        let mut image = self.unforged_like(data_type);
        image.forge()?;
        Ok(image)
    }

    /// A new forged image with the same properties and normal strides.
    pub(crate) fn similar_normal(&self, data_type: DataType) -> Result<Image> {
        let mut image = self.unforged_like(data_type);
        image.strides.clear();
        image.tensor_stride = 1;
        image.forge()?;
        Ok(image)
    }

    fn unforged_like(&self, data_type: DataType) -> Image {
        Image {
            sizes: self.sizes.clone(),
            strides: self.strides.clone(),
            tensor: self.tensor,
            tensor_stride: self.tensor_stride,
            data_type,
            pixel_size: self.pixel_size.clone(),
            color_space: self.color_space.clone(),
            external: self.external.clone(),
            ..Image::default()
        }
    }

    /// Share the data, but not the pixel size and color space.
    pub fn quick_copy(&self) -> Image {
        Image {
            pixel_size: Default::default(),
            color_space: None,
            ..self.clone()
        }
    }

    /// Take every property of `src` but its data. The image must not be forged.
    pub fn copy_properties(&mut self, src: &Image) -> Result<()> {
        self.check_raw()?;
        let protect = self.protect;
        *self = src.unforged_like(src.data_type);
        self.protect = protect;
        Ok(())
    }

    /// Copy pixel size and color space.
    pub fn copy_non_data_properties(&mut self, src: &Image) {
        self.pixel_size = src.pixel_size.clone();
        self.color_space = src.color_space.clone();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn requested_strides() -> Result<()> {
        let mut image = Image::raw(&[4, 3], 1, DataType::UInt8);
        image.set_strides(&[3, 1], 1)?;
        image.forge()?;
        assert_eq!(image.strides(), [3, 1]);

        let mut gaps = Image::raw(&[4, 3], 1, DataType::UInt8);
        gaps.set_strides(&[1, 5], 1)?;
        gaps.forge()?;
        assert_eq!(gaps.strides(), [1, 4]);

        let mut mirrored = Image::raw(&[4, 3], 1, DataType::UInt8);
        mirrored.set_strides(&[-1, 4], 1)?;
        mirrored.forge()?;
        assert_eq!(mirrored.origin(), 3);
        assert_eq!(mirrored.set_sizes(&[2]), Err(Error::AlreadyForged));
        Ok(())
    }

    #[test]
    fn reforge_reuses_and_protects() -> Result<()> {
        let mut image = Image::new(&[4, 3], 2, DataType::UInt8)?;
        let address = image.data().map(DataSegment::address);
        image.reforge(&[4, 3], 2, DataType::UInt8, AcceptDataTypeChange::DontAllow)?;
        assert_eq!(image.data().map(DataSegment::address), address);

        let alias = image.clone();
        image.reforge(&[4, 3], 2, DataType::UInt8, AcceptDataTypeChange::DontAllow)?;
        assert!(!image.aliases(&alias));

        image.protect(true);
        image.reforge(&[4, 3], 2, DataType::SFloat, AcceptDataTypeChange::DoAllow)?;
        assert_eq!(image.data_type(), DataType::UInt8);
        let failed = image.reforge(&[4, 3], 2, DataType::SFloat, AcceptDataTypeChange::DontAllow);
        assert_eq!(failed, Err(Error::Protected));
        assert_eq!(image.strip(), Err(Error::Protected));
        assert!(image.is_forged());

        image.protect(false);
        image.reforge(&[5], 1, DataType::DFloat, AcceptDataTypeChange::DontAllow)?;
        assert_eq!(image.strides(), [1]);
        assert_eq!(*image.tensor(), Tensor::scalar());
        Ok(())
    }

    #[test]
    fn similar_drops_gaps() -> Result<()> {
        let image = Image::new(&[7, 8], 1, DataType::SInt32)?;
        let mut rotated = image.clone();
        rotated.swap_dimensions(0, 1)?;
        assert_eq!(rotated.similar()?.strides(), [7, 1]);

        let mut cropped = image.clone();
        cropped.crop(&[6, 8], crate::CropLocation::TopLeft)?;
        assert_eq!(cropped.similar()?.strides(), [1, 6]);
        Ok(())
    }

    #[test]
    fn properties_without_data() -> Result<()> {
        let mut src = Image::new(&[7, 8], 3, DataType::UInt16)?;
        src.swap_dimensions(0, 1)?;
        src.set_color_space("RGB");

        let mut image = Image::default();
        image.copy_properties(&src)?;
        assert!(!image.is_forged());
        assert_eq!(image.sizes(), [8, 7]);
        assert_eq!(image.color_space(), Some("RGB"));
        image.forge()?;
        assert_eq!(image.strides(), src.strides());
        assert_eq!(image.data_type(), DataType::UInt16);
        assert_eq!(image.copy_properties(&src), Err(Error::AlreadyForged));
        Ok(())
    }

    struct Columns {
        calls: Cell<usize>,
    }

    impl ExternalInterface for Columns {
        fn allocate_data(
            &self,
            sizes: &[usize],
            strides: &mut Vec<isize>,
            _: &Tensor,
            tensor_stride: &mut isize,
            data_type: DataType,
        ) -> Result<DataSegment> {
            self.calls.set(self.calls.get() + 1);
            // Planar tensor, last dimension fastest.
            let pixels: usize = sizes.iter().product();
            let mut stride = 1;
            for (dim, &size) in sizes.iter().enumerate().rev() {
                strides[dim] = stride;
                stride *= size as isize;
            }
            *tensor_stride = pixels as isize;
            Ok(DataSegment::new(pixels * 2 * data_type.size_of()))
        }
    }

    #[test]
    fn external_layout_is_honored() -> Result<()> {
        let external = Rc::new(Columns { calls: Cell::new(0) });
        let mut image = Image::with_external_interface(external.clone());
        image.set_sizes(&[3, 4])?;
        image.set_tensor(Tensor::vector(2))?;
        image.forge()?;
        assert_eq!(image.strides(), [4, 1]);
        assert_eq!(image.tensor_stride(), 12);
        assert_eq!(external.calls.get(), 1);

        let similar = image.similar()?;
        assert_eq!(similar.strides(), [4, 1]);
        assert_eq!(external.calls.get(), 2);
        Ok(())
    }
}
