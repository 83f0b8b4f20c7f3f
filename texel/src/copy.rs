//! The bulk sample copy primitive.
//!
//! Everything that moves sample values between images ends up in [`copy_buffer`]: a run of
//! `pixels` pixels, each with `tensor_elements` samples, read with one stride layout and written
//! with another, converting between data types on the way.
use core::cell::Cell;

use crate::sample::{DataType, Sample, Scalar};
use crate::texel::{copy_cells, AsTexel};
use crate::with_sample_type;

/// A strided run of samples inside some shared bytes.
#[derive(Clone, Copy, Debug)]
pub struct SampleRun<'buf> {
    pub cells: &'buf [Cell<u8>],
    /// Byte position of the first sample of the first pixel.
    pub offset: usize,
    pub data_type: DataType,
    /// Distance between pixels, in samples.
    pub stride: isize,
    /// Distance between tensor elements of one pixel, in samples.
    pub tensor_stride: isize,
}

/// Where an output tensor element takes its value from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorLookup {
    /// Copy the input element with this index.
    Sample(usize),
    /// Copy the negated input element with this index.
    Negated(usize),
    /// The element is not stored and reads as zero.
    Zero,
}

impl<'buf> SampleRun<'buf> {
    fn position(&self, pixel: usize, element: usize) -> usize {
        let samples = pixel as isize * self.stride + element as isize * self.tensor_stride;
        (self.offset as isize + samples * self.data_type.size_of() as isize) as usize
    }

    fn sample_bytes(&self, pixel: usize, element: usize) -> &'buf [Cell<u8>] {
        let start = self.position(pixel, element);
        &self.cells[start..start + self.data_type.size_of()]
    }

    /// Read one sample in its type-erased form.
    pub fn get(&self, pixel: usize, element: usize) -> Scalar {
        let bytes = self.sample_bytes(pixel, element);
        with_sample_type!(self.data_type, T => T::texel().load_cell(bytes).into_scalar())
    }

    /// Write one sample, converting with saturation.
    pub fn set(&self, pixel: usize, element: usize, value: Scalar) {
        let bytes = self.sample_bytes(pixel, element);
        with_sample_type!(self.data_type, T => T::texel().store_cell(bytes, T::from_scalar(value)))
    }

    /// Read one sample of a statically known type.
    ///
    /// # Panics
    ///
    /// When `T` is not the data type of the run.
    pub fn load<T: Sample>(&self, pixel: usize, element: usize) -> T {
        assert_eq!(T::DATA_TYPE, self.data_type);
        T::texel().load_cell(self.sample_bytes(pixel, element))
    }

    /// Write one sample of a statically known type.
    ///
    /// # Panics
    ///
    /// When `T` is not the data type of the run.
    pub fn store<T: Sample>(&self, pixel: usize, element: usize, value: T) {
        assert_eq!(T::DATA_TYPE, self.data_type);
        T::texel().store_cell(self.sample_bytes(pixel, element), value)
    }
}

/// Copy `pixels` pixels from `src` to `dst`, converting samples to the data type of `dst`.
///
/// Without a look-up table, `tensor_elements` samples are copied for each pixel. With one, the
/// output pixel has `lut.len()` elements, each taken from the input as the table describes.
///
/// The two runs may live in the same memory. Reading and writing happen sample by sample in
/// increasing pixel order, so the result is only well defined when the runs are identical or do
/// not overlap.
pub fn copy_buffer(
    src: &SampleRun,
    dst: &SampleRun,
    pixels: usize,
    tensor_elements: usize,
    lut: Option<&[TensorLookup]>,
) {
    if let Some(lut) = lut {
        return copy_with_lut(src, dst, pixels, lut);
    }

    if src.data_type == dst.data_type {
        return copy_same_type(src, dst, pixels, tensor_elements);
    }

    with_sample_type!(src.data_type, S => {
        with_sample_type!(dst.data_type, D => {
            copy_converted::<S, D>(src, dst, pixels, tensor_elements)
        })
    })
}

fn copy_same_type(src: &SampleRun, dst: &SampleRun, pixels: usize, tensor_elements: usize) {
    let size = src.data_type.size_of();
    if src.tensor_stride == 1 && dst.tensor_stride == 1 {
        // Tensor elements are contiguous, move whole pixels at once.
        let len = size * tensor_elements;
        if src.stride == tensor_elements as isize && dst.stride == tensor_elements as isize {
            let len = len * pixels;
            let from = src.position(0, 0);
            let into = dst.position(0, 0);
            return copy_cells(&src.cells[from..from + len], &dst.cells[into..into + len]);
        }

        for pixel in 0..pixels {
            let from = src.position(pixel, 0);
            let into = dst.position(pixel, 0);
            copy_cells(&src.cells[from..from + len], &dst.cells[into..into + len]);
        }
        return;
    }

    for pixel in 0..pixels {
        for element in 0..tensor_elements {
            copy_cells(
                src.sample_bytes(pixel, element),
                dst.sample_bytes(pixel, element),
            );
        }
    }
}

fn copy_converted<S: Sample, D: Sample>(
    src: &SampleRun,
    dst: &SampleRun,
    pixels: usize,
    tensor_elements: usize,
) {
    let (load, store) = (S::texel(), D::texel());
    for pixel in 0..pixels {
        for element in 0..tensor_elements {
            let value = load.load_cell(src.sample_bytes(pixel, element));
            let value = D::from_scalar(value.into_scalar());
            store.store_cell(dst.sample_bytes(pixel, element), value);
        }
    }
}

fn copy_with_lut(src: &SampleRun, dst: &SampleRun, pixels: usize, lut: &[TensorLookup]) {
    for pixel in 0..pixels {
        for (element, lookup) in lut.iter().enumerate() {
            let value = match *lookup {
                TensorLookup::Sample(index) => src.get(pixel, index),
                TensorLookup::Negated(index) => src.get(pixel, index).negate(),
                TensorLookup::Zero => Scalar::Int(0),
            };
            dst.set(pixel, element, value);
        }
    }
}

/// Write the same value, converted once, into every sample of the run.
pub fn fill_buffer(dst: &SampleRun, pixels: usize, tensor_elements: usize, value: Scalar) {
    with_sample_type!(dst.data_type, T => {
        let value = T::from_scalar(value);
        let texel = T::texel();
        for pixel in 0..pixels {
            for element in 0..tensor_elements {
                texel.store_cell(dst.sample_bytes(pixel, element), value);
            }
        }
    })
}

/// Write one value per tensor element into every pixel of the run.
pub fn fill_buffer_pixel(dst: &SampleRun, pixels: usize, values: &[Scalar]) {
    with_sample_type!(dst.data_type, T => {
        let texel = T::texel();
        for (element, &value) in values.iter().enumerate() {
            let value = T::from_scalar(value);
            for pixel in 0..pixels {
                texel.store_cell(dst.sample_bytes(pixel, element), value);
            }
        }
    })
}
