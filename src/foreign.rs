//! Exchange of images with foreign array buffers.
//!
//! A [`BufferInfo`] describes memory the way buffer protocols of array libraries do: a format
//! code, an item size, and an extent and a byte stride per axis. Importing shares the data
//! segment, exporting describes the data of an image without copying it.
use core::ffi::{c_long, c_ulong};
use core::mem::size_of;

use log::trace;
use nd_texel::{DataSegment, DataType};

use crate::error::{Error, Result};
use crate::image::Image;
use crate::options::{ImportOptions, TensorAxis, AUTO_TENSOR_LIMIT};
use crate::tensor::Tensor;

/// A strided array in a foreign memory layout.
#[derive(Clone, Debug)]
pub struct BufferInfo {
    /// `None` only for the descriptor of an image without data.
    pub data: Option<DataSegment>,
    /// Byte position of the element with all indices zero.
    pub offset: usize,
    pub item_size: usize,
    pub format: String,
    pub shape: Vec<usize>,
    /// Distance between consecutive elements along each axis, in bytes.
    pub strides: Vec<isize>,
}

/// The format code of a data type.
pub fn format_of(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Bin => "?",
        DataType::UInt8 => "B",
        DataType::UInt16 => "H",
        DataType::UInt32 => "I",
        DataType::UInt64 => "Q",
        DataType::SInt8 => "b",
        DataType::SInt16 => "h",
        DataType::SInt32 => "i",
        DataType::SInt64 => "q",
        DataType::SFloat => "f",
        DataType::DFloat => "d",
        DataType::SComplex => "Zf",
        DataType::DComplex => "Zd",
    }
}

/// The data type of a format code.
///
/// `L` and `l` stand for the platform's `unsigned long` and `long`, whose size varies.
pub fn data_type_of_format(format: &str) -> Result<DataType> {
    let unsupported = Error::InvalidParameter("buffer format not compatible with images");
    let mut codes = format.chars();
    let data_type = match codes.next() {
        Some('?') => DataType::Bin,
        Some('B') => DataType::UInt8,
        Some('H') => DataType::UInt16,
        Some('I') => DataType::UInt32,
        Some('L') => integer_of_size(size_of::<c_ulong>(), false),
        Some('K' | 'Q') => DataType::UInt64,
        Some('b') => DataType::SInt8,
        Some('h') => DataType::SInt16,
        Some('i') => DataType::SInt32,
        Some('l') => integer_of_size(size_of::<c_long>(), true),
        Some('k' | 'q') => DataType::SInt64,
        Some('f') => DataType::SFloat,
        Some('d') => DataType::DFloat,
        Some('Z') => match codes.next() {
            Some('f') => DataType::SComplex,
            Some('d') => DataType::DComplex,
            _ => return Err(unsupported),
        },
        _ => return Err(unsupported),
    };
    Ok(data_type)
}

fn integer_of_size(size: usize, signed: bool) -> DataType {
    match (size, signed) {
        (4, false) => DataType::UInt32,
        (4, true) => DataType::SInt32,
        (_, false) => DataType::UInt64,
        (_, true) => DataType::SInt64,
    }
}

/// An image sharing the memory of a foreign buffer.
///
/// A buffer with an axis of extent zero gives a raw image of the buffer's data type.
pub fn import_buffer(info: &BufferInfo, options: &ImportOptions) -> Result<Image> {
    let data_type = data_type_of_format(&info.format)?;
    if info.item_size != data_type.size_of() {
        return Err(Error::InvalidParameter("item size does not match the format"));
    }
    if info.strides.len() != info.shape.len() {
        return Err(Error::wrong_length(info.shape.len(), info.strides.len()));
    }
    if info.shape.contains(&0) {
        let mut out = Image::default();
        out.set_data_type(data_type)?;
        return Ok(out);
    }
    let Some(data) = &info.data else {
        return Err(Error::InvalidParameter("buffer has no data"));
    };

    let item_size = info.item_size as isize;
    if info.strides.iter().any(|stride| stride % item_size != 0) {
        return Err(Error::NotRepresentable("strides are not in whole pixels"));
    }
    let mut sizes = info.shape.clone();
    let mut strides: Vec<isize> = info.strides.iter().map(|stride| stride / item_size).collect();
    if options.reverse_dimensions {
        sizes.reverse();
        strides.reverse();
    }
    trace!("import {} buffer of sizes {:?}, strides {:?}", data_type, sizes, strides);

    let mut out = Image::from_segment(
        data.clone(),
        info.offset,
        data_type,
        &sizes,
        &strides,
        Tensor::scalar(),
        1,
    )?;
    if let Some(dim) = tensor_dimension(&sizes, options)? {
        out.spatial_to_tensor(dim, 0, 0)?;
    }
    Ok(out)
}

/// The image dimension to turn into the tensor, if any.
fn tensor_dimension(sizes: &[usize], options: &ImportOptions) -> Result<Option<usize>> {
    let nd = sizes.len();
    match options.tensor_axis {
        TensorAxis::None => Ok(None),
        TensorAxis::Auto => {
            let (first, last) = match (sizes.first(), sizes.last()) {
                (Some(&first), Some(&last)) if nd > 2 => (first, last),
                _ => return Ok(None),
            };
            if first >= AUTO_TENSOR_LIMIT && last >= AUTO_TENSOR_LIMIT {
                Ok(None)
            } else if first < last {
                Ok(Some(0))
            } else {
                Ok(Some(nd - 1))
            }
        }
        TensorAxis::Axis(axis) if axis < nd => {
            Ok(Some(if options.reverse_dimensions { nd - 1 - axis } else { axis }))
        }
        TensorAxis::Axis(axis) => Err(Error::illegal_dimension(axis, nd)),
    }
}

/// Describe the data of an image for a foreign consumer.
///
/// The tensor, if the image is not scalar, becomes an additional last axis. An image without
/// data is described by a single empty axis.
pub fn export_buffer(image: &Image, reverse_dimensions: bool) -> BufferInfo {
    let data_type = image.data_type();
    let item_size = data_type.size_of();
    let format = format_of(data_type).to_owned();
    let Some(data) = image.data() else {
        return BufferInfo {
            data: None,
            offset: 0,
            item_size,
            format,
            shape: vec![0],
            strides: vec![item_size as isize],
        };
    };

    let mut shape = image.sizes().to_vec();
    let mut strides: Vec<isize> = image
        .strides()
        .iter()
        .map(|stride| stride * item_size as isize)
        .collect();
    if reverse_dimensions {
        shape.reverse();
        strides.reverse();
    }
    if !image.is_scalar() {
        shape.push(image.tensor_elements());
        strides.push(image.tensor_stride() * item_size as isize);
    }
    BufferInfo {
        data: Some(data.clone()),
        offset: image.origin(),
        item_size,
        format,
        shape,
        strides,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_codes() -> Result<()> {
        for name in ["BIN", "UINT8", "SINT64", "SCOMPLEX", "DFLOAT"] {
            let data_type: DataType = name.parse().expect("known name");
            assert_eq!(data_type_of_format(format_of(data_type))?, data_type);
        }
        assert_eq!(data_type_of_format("K")?, DataType::UInt64);
        assert_eq!(data_type_of_format("k")?, DataType::SInt64);
        assert!(matches!(data_type_of_format("l")?, DataType::SInt32 | DataType::SInt64));
        assert!(data_type_of_format("Zx").is_err());
        assert!(data_type_of_format("e").is_err());
        Ok(())
    }

    #[test]
    fn automatic_tensor_axis() -> Result<()> {
        let options = ImportOptions::default();
        assert_eq!(tensor_dimension(&[100, 80, 3], &options)?, Some(2));
        assert_eq!(tensor_dimension(&[4, 80, 3], &options)?, Some(2));
        assert_eq!(tensor_dimension(&[2, 80, 30], &options)?, Some(0));
        assert_eq!(tensor_dimension(&[100, 80, 30], &options)?, None);
        assert_eq!(tensor_dimension(&[3, 80], &options)?, None);

        let explicit = ImportOptions {
            reverse_dimensions: true,
            tensor_axis: TensorAxis::Axis(0),
        };
        assert_eq!(tensor_dimension(&[5, 6, 7], &explicit)?, Some(2));
        let explicit = ImportOptions {
            tensor_axis: TensorAxis::Axis(3),
            ..explicit
        };
        assert!(tensor_dimension(&[5, 6, 7], &explicit).is_err());
        Ok(())
    }
}
