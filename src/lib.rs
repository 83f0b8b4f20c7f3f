//! # nd-image
//!
//! Strided images of any dimensionality, with a tensor of samples per pixel.
//!
//! An [`Image`] is a view: sizes and strides along each spatial dimension, a tensor stride, a data
//! type and an offset into a shared [`DataSegment`]. Many manipulations only rewrite the view and
//! leave the samples in place, so several images can see the same data in different ways.
//!
//! ## Usage
//!
//! ```
//! use nd_image::{DataType, Image, Scalar};
//!
//! let mut image = Image::new(&[4, 3], 1, DataType::UInt8)?;
//! image.fill(7)?;
//!
//! // A transposed view of the same samples.
//! let mut view = image.clone();
//! view.swap_dimensions(0, 1)?;
//! view.set_sample(&[2, 1], 0, 300)?;
//!
//! // Values saturate to the data type.
//! assert_eq!(image.sample(&[1, 2], 0)?, Scalar::Int(255));
//! # Ok::<(), nd_image::Error>(())
//! ```
#![deny(unsafe_code)]

mod error;
mod framework;
mod image;
mod iterators;
mod options;
mod pixel_size;
mod stride;
mod tensor;
mod view;

pub mod bridge;
pub mod foreign;
pub mod morphology;
pub mod plan_cache;

pub use nd_texel::{Bin, Complex, DataSegment, DataType, Sample, SampleRun, Scalar};

pub use self::error::{Error, Result};
pub use self::framework::{
    optimal_processing_dim, optimal_processing_dim_joint, scan_lines, SMALL_IMAGE,
};
pub use self::image::{ExternalInterface, Image, Pixel};
pub use self::iterators::{GenericImageIterator, GenericJointImageIterator, ImageIterator};
pub use self::options::{
    AcceptDataTypeChange, CropLocation, ImportOptions, TensorAxis, AUTO_TENSOR_LIMIT,
};
pub use self::pixel_size::{PhysicalQuantity, PixelSize};
pub use self::tensor::{Tensor, TensorShape};
pub use self::view::{
    copy_from_mask, copy_from_offsets, copy_to_mask, copy_to_offsets, Range, View,
};
