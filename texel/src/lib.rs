// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! # Samples
//!
//! The sample level of `nd-image`: scalar types, the memory they live in, and the primitive that
//! copies them around.
//!
//! This library is strictly `no_std`. It knows nothing of image geometry. An image is, at this
//! level, a [`DataSegment`] of shared bytes plus a [`SampleRun`] describing where one line of
//! samples is found in it:
//!
//! - [`DataType`] is the closed set of sample kinds, from binary to double complex.
//! - [`Sample`] ties each kind to its Rust type and converts with saturation through [`Scalar`].
//! - [`DataSegment`] is reference counted memory, either allocated here or borrowed from a
//!   foreign [`Storage`].
//! - [`copy_buffer`] moves and converts strided runs of samples.
//!
//! ## Usage
//!
//! ```
//! use nd_texel::{copy_buffer, DataSegment, DataType, SampleRun, Scalar};
//!
//! let memory = DataSegment::new(8);
//! let wide = SampleRun {
//!     cells: &memory,
//!     offset: 0,
//!     data_type: DataType::UInt16,
//!     stride: 1,
//!     tensor_stride: 1,
//! };
//! wide.set(0, 0, Scalar::Int(1000));
//! wide.set(1, 0, Scalar::Int(20));
//!
//! // Narrow the same memory in place, the upper half receives the copy.
//! let narrow = SampleRun { offset: 4, data_type: DataType::UInt8, ..wide };
//! copy_buffer(&wide, &narrow, 2, 1, None);
//! assert_eq!(narrow.get(0, 0), Scalar::Int(255));
//! assert_eq!(narrow.get(1, 0), Scalar::Int(20));
//! ```
// Be std for doctests, avoids a weird warning about missing allocator.
#![cfg_attr(not(doctest), no_std)]
// The only module allowed to be `unsafe` is `texel`. We need it however, as we read and write
// typed values through shared byte cells.
#![deny(unsafe_code)]
extern crate alloc;

mod buf;
mod copy;
mod sample;
mod texel;

pub use num_complex::Complex;

pub use self::buf::{CellBuffer, DataSegment, Storage};
pub use self::copy::{copy_buffer, fill_buffer, fill_buffer_pixel, SampleRun, TensorLookup};
pub use self::sample::{Bin, DataType, ParseDataTypeError, Sample, Scalar};
pub use self::texel::{copy_cells, AsTexel, MaxAligned, Texel};
