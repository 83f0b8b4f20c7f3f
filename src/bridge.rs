//! Bridge to images of a classic 2D morphology toolbox.
//!
//! Those images store `depth` planes of `width` by `height` samples, each plane row by row, with
//! one type code per image. Binary images are bytes where set pixels hold 255.
use core::cell::RefCell;
use std::rc::Rc;

use log::{debug, trace};
use nd_texel::{DataSegment, DataType};

use crate::error::{Error, Result};
use crate::image::{ExternalInterface, Image};
use crate::tensor::Tensor;

/// The type codes of the toolbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MorphType {
    Byte,
    UByte,
    Short,
    UShort,
    Int,
    Float,
    Double,
}

impl MorphType {
    pub fn size_of(self) -> usize {
        match self {
            MorphType::Byte | MorphType::UByte => 1,
            MorphType::Short | MorphType::UShort => 2,
            MorphType::Int | MorphType::Float => 4,
            MorphType::Double => 8,
        }
    }
}

/// An image of the toolbox, owning its raster.
#[derive(Clone, Debug)]
pub struct MorphImage {
    width: usize,
    height: usize,
    depth: usize,
    type_code: MorphType,
    binary: bool,
    raster: DataSegment,
}

impl MorphImage {
    /// A zeroed image. Only [`MorphType::UByte`] images can be binary.
    pub fn new(
        width: usize,
        height: usize,
        depth: usize,
        type_code: MorphType,
        binary: bool,
    ) -> Result<Self> {
        if binary && type_code != MorphType::UByte {
            return Err(Error::InvalidParameter("only unsigned byte images can be binary"));
        }
        let bytes = [width, height, depth]
            .into_iter()
            .try_fold(type_code.size_of(), usize::checked_mul)
            .filter(|&bytes| bytes <= isize::MAX as usize)
            .ok_or(Error::InvalidParameter("image is too large"))?;
        Ok(MorphImage {
            width,
            height,
            depth,
            type_code,
            binary,
            raster: DataSegment::new(bytes),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn type_code(&self) -> MorphType {
        self.type_code
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }

    /// An image without any sample.
    pub fn is_null(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }

    pub fn raster(&self) -> &DataSegment {
        &self.raster
    }

    fn data_type(&self) -> DataType {
        match self.type_code {
            MorphType::Byte => DataType::SInt8,
            MorphType::UByte if self.binary => DataType::Bin,
            MorphType::UByte => DataType::UInt8,
            MorphType::Short => DataType::SInt16,
            MorphType::UShort => DataType::UInt16,
            MorphType::Int => DataType::SInt32,
            MorphType::Float => DataType::SFloat,
            MorphType::Double => DataType::DFloat,
        }
    }
}

/// An image viewing the raster of `morph` without copying it.
///
/// A null image gives an unforged image.
pub fn morph_to_image(morph: &MorphImage) -> Result<Image> {
    if morph.is_null() {
        return Ok(Image::default());
    }
    let (width, height) = (morph.width, morph.height);
    Image::from_segment(
        morph.raster.clone(),
        0,
        morph.data_type(),
        &[width, height],
        &[1, width as isize],
        Tensor::vector(morph.depth),
        (width * height) as isize,
    )
}

/// Allocates image data as toolbox images, which can later be taken out of the images.
///
/// Only 2D images with binary, 8-bit unsigned, 16-bit unsigned or 32-bit signed samples can be
/// allocated.
#[derive(Default)]
pub struct MorphInterface {
    images: RefCell<Vec<MorphImage>>,
}

impl MorphInterface {
    pub fn new() -> Rc<Self> {
        Rc::new(MorphInterface::default())
    }

    /// An unforged image that allocates through this interface.
    pub fn new_image(self: &Rc<Self>) -> Image {
        Image::with_external_interface(self.clone())
    }

    /// Number of toolbox images held for forged images.
    pub fn len(&self) -> usize {
        self.images.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.borrow().is_empty()
    }

    /// Take the toolbox image holding the data of `image`.
    ///
    /// The whole raster is returned even for a view of part of it. Set pixels of binary images
    /// become 255.
    pub fn image_to_morph(&self, image: &Image) -> Result<MorphImage> {
        let data = image.data().ok_or(Error::NotForged)?;
        let mut images = self.images.borrow_mut();
        let index = images
            .iter()
            .position(|morph| morph.raster.ptr_eq(data))
            .ok_or(Error::InvalidParameter("image was not allocated by this interface"))?;
        let morph = images.swap_remove(index);
        if morph.binary {
            for cell in morph.raster.as_cells() {
                if cell.get() != 0 {
                    cell.set(255);
                }
            }
        }
        Ok(morph)
    }

    /// Forget toolbox images whose data no image uses anymore.
    fn release_unused(&self) {
        self.images.borrow_mut().retain(|morph| {
            let used = morph.raster.handle_count() > 1;
            if !used {
                trace!("release unused {}x{} toolbox image", morph.width, morph.height);
            }
            used
        });
    }
}

impl ExternalInterface for MorphInterface {
    fn allocate_data(
        &self,
        sizes: &[usize],
        strides: &mut Vec<isize>,
        tensor: &Tensor,
        tensor_stride: &mut isize,
        data_type: DataType,
    ) -> Result<DataSegment> {
        let &[width, height] = sizes else {
            return Err(Error::DimensionalityNotSupported(sizes.len()));
        };
        let (type_code, binary) = match data_type {
            DataType::Bin => (MorphType::UByte, true),
            DataType::UInt8 => (MorphType::UByte, false),
            DataType::UInt16 => (MorphType::UShort, false),
            DataType::SInt32 => (MorphType::Int, false),
            other => return Err(Error::DataTypeNotSupported(other)),
        };
        self.release_unused();

        *strides = vec![1, width as isize];
        *tensor_stride = (width * height) as isize;
        let morph = MorphImage::new(width, height, tensor.elements(), type_code, binary)?;
        debug!("allocated {}x{}x{} {:?} toolbox image", width, height, morph.depth, type_code);
        let raster = morph.raster.clone();
        self.images.borrow_mut().push(morph);
        Ok(raster)
    }
}

#[cfg(test)]
mod tests {
    use nd_texel::Scalar;

    use super::*;

    #[test]
    fn view_of_toolbox_image() -> Result<()> {
        let morph = MorphImage::new(4, 3, 2, MorphType::UShort, false)?;
        let image = morph_to_image(&morph)?;
        assert_eq!(image.sizes(), [4, 3]);
        assert_eq!(image.strides(), [1, 4]);
        assert_eq!(image.tensor_stride(), 12);
        assert_eq!(image.data_type(), DataType::UInt16);
        assert!(image.data().is_some_and(|data| data.ptr_eq(morph.raster())));

        let binary = MorphImage::new(2, 2, 1, MorphType::UByte, true)?;
        assert_eq!(morph_to_image(&binary)?.data_type(), DataType::Bin);
        assert!(!morph_to_image(&MorphImage::new(0, 3, 1, MorphType::Int, false)?)?.is_forged());
        assert!(MorphImage::new(2, 2, 1, MorphType::Int, true).is_err());
        Ok(())
    }

    #[test]
    fn oversized_images_are_rejected() -> Result<()> {
        let too_large = Some(Error::InvalidParameter("image is too large"));
        let overflowing = MorphImage::new(usize::MAX, 2, 1, MorphType::Int, false);
        assert_eq!(overflowing.err(), too_large);
        let wide = MorphImage::new(usize::MAX / 2 + 1, 1, 1, MorphType::UByte, false);
        assert_eq!(wide.err(), too_large);
        Ok(())
    }

    #[test]
    fn allocation_layout() -> Result<()> {
        let interface = MorphInterface::new();
        let mut image = interface.new_image();
        image.reforge(&[5, 4], 3, DataType::UInt8, Default::default())?;
        assert_eq!(image.strides(), [1, 5]);
        assert_eq!(image.tensor_stride(), 20);
        assert_eq!(interface.len(), 1);

        let mut volume = interface.new_image();
        assert_eq!(
            volume.reforge(&[5, 4, 3], 1, DataType::UInt8, Default::default()),
            Err(Error::DimensionalityNotSupported(3))
        );
        let mut floats = interface.new_image();
        assert_eq!(
            floats.reforge(&[5, 4], 1, DataType::SFloat, Default::default()),
            Err(Error::DataTypeNotSupported(DataType::SFloat))
        );
        Ok(())
    }

    #[test]
    fn take_binary_image() -> Result<()> {
        let interface = MorphInterface::new();
        let mut image = interface.new_image();
        image.reforge(&[3, 2], 1, DataType::Bin, Default::default())?;
        image.set_sample(&[1, 1], 0, 1)?;

        let morph = interface.image_to_morph(&image)?;
        assert!(interface.is_empty());
        assert_eq!(morph.raster().to_vec(), [0, 0, 0, 0, 255, 0]);
        assert!(interface.image_to_morph(&image).is_err());
        assert_eq!(image.sample(&[1, 1], 0)?, Scalar::Int(1));
        Ok(())
    }

    #[test]
    fn unused_rasters_are_released() -> Result<()> {
        let interface = MorphInterface::new();
        let mut first = interface.new_image();
        first.reforge(&[2, 2], 1, DataType::SInt32, Default::default())?;
        first.strip()?;
        let mut second = interface.new_image();
        second.reforge(&[2, 2], 1, DataType::SInt32, Default::default())?;
        assert_eq!(interface.len(), 1);
        Ok(())
    }
}
