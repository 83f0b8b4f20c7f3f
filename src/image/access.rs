//! Reading and writing individual pixels.
use nd_texel::{Sample, Scalar};

use crate::error::{Error, Result};
use crate::tensor::Tensor;

use super::Image;

/// The samples of one pixel, in a type-erased form.
#[derive(Clone, Debug, PartialEq)]
pub struct Pixel {
    values: Vec<Scalar>,
    tensor: Tensor,
}

impl Pixel {
    /// A column vector pixel.
    pub fn new(values: Vec<Scalar>) -> Self {
        let tensor = Tensor::vector(values.len());
        Pixel { values, tensor }
    }

    pub fn with_tensor(values: Vec<Scalar>, tensor: Tensor) -> Result<Self> {
        if values.len() != tensor.elements() {
            return Err(Error::TensorElementsMismatch {
                expected: tensor.elements(),
                got: values.len(),
            });
        }
        Ok(Pixel { values, tensor })
    }

    /// The caller guarantees that the tensor has as many elements as there are values.
    pub(crate) fn from_parts(values: Vec<Scalar>, tensor: Tensor) -> Self {
        Pixel { values, tensor }
    }

    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    pub fn tensor_elements(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, element: usize) -> Option<Scalar> {
        self.values.get(element).copied()
    }
}

impl<T: Into<Scalar>> From<T> for Pixel {
    fn from(value: T) -> Pixel {
        Pixel::new(vec![value.into()])
    }
}

impl Image {
    /// Offset in samples of the pixel at `coords`, relative to the origin.
    pub fn offset_of(&self, coords: &[usize]) -> Result<isize> {
        if coords.len() != self.sizes.len() {
            return Err(Error::wrong_length(self.sizes.len(), coords.len()));
        }
        coords
            .iter()
            .zip(&self.sizes)
            .zip(&self.strides)
            .try_fold(0, |offset, ((&coord, &size), &stride)| {
                if coord < size {
                    Ok(offset + coord as isize * stride)
                } else {
                    Err(Error::IndexOutOfRange("coordinates outside of the image"))
                }
            })
    }

    /// Coordinates of the pixel with a linear index, dimension 0 varying fastest.
    pub fn coordinates_of(&self, mut index: usize) -> Result<Vec<usize>> {
        if index >= self.number_of_pixels() {
            return Err(Error::IndexOutOfRange("index outside of the image"));
        }
        Ok(self
            .sizes
            .iter()
            .map(|&size| {
                let coord = index % size;
                index /= size;
                coord
            })
            .collect())
    }

    /// Linear index of the pixel at `coords`, dimension 0 varying fastest.
    pub fn index_of(&self, coords: &[usize]) -> Result<usize> {
        if coords.len() != self.sizes.len() {
            return Err(Error::wrong_length(self.sizes.len(), coords.len()));
        }
        coords
            .iter()
            .zip(&self.sizes)
            .rev()
            .try_fold(0, |index, (&coord, &size)| {
                if coord < size {
                    Ok(index * size + coord)
                } else {
                    Err(Error::IndexOutOfRange("coordinates outside of the image"))
                }
            })
    }

    /// Check that all samples of the pixel at `offset` lie within the data.
    pub(crate) fn check_offset(&self, offset: isize) -> Result<()> {
        self.check_forged()?;
        let reach = (self.tensor_elements() as isize - 1) * self.tensor_stride;
        let size = self.data_type.size_of() as isize;
        let len = self.data.as_ref().map_or(0, |data| data.len()) as isize;
        let first = self.origin as isize + (offset + reach.min(0)) * size;
        let end = self.origin as isize + (offset + reach.max(0) + 1) * size;
        if first < 0 || end > len {
            return Err(Error::IndexOutOfRange("offset outside of the image data"));
        }
        Ok(())
    }

    pub fn sample(&self, coords: &[usize], element: usize) -> Result<Scalar> {
        self.check_forged()?;
        let offset = self.offset_of(coords)?;
        self.check_element(element)?;
        Ok(self.run(offset, 0).get(0, element))
    }

    /// Write a sample, converting with saturation to the data type of the image.
    pub fn set_sample(
        &mut self,
        coords: &[usize],
        element: usize,
        value: impl Into<Scalar>,
    ) -> Result<()> {
        self.check_forged()?;
        let offset = self.offset_of(coords)?;
        self.check_element(element)?;
        self.run(offset, 0).set(0, element, value.into());
        Ok(())
    }

    /// Read a sample as a statically known type, which must be the image's data type.
    pub fn sample_as<T: Sample>(&self, coords: &[usize], element: usize) -> Result<T> {
        if T::DATA_TYPE != self.data_type {
            return Err(Error::DataTypeNotSupported(T::DATA_TYPE));
        }
        self.check_forged()?;
        let offset = self.offset_of(coords)?;
        self.check_element(element)?;
        Ok(self.run(offset, 0).load(0, element))
    }

    pub fn pixel(&self, coords: &[usize]) -> Result<Pixel> {
        self.check_forged()?;
        let run = self.run(self.offset_of(coords)?, 0);
        let values = (0..self.tensor_elements()).map(|e| run.get(0, e)).collect();
        Ok(Pixel {
            values,
            tensor: self.tensor,
        })
    }

    /// Write a pixel. A single value is written to all tensor elements.
    pub fn set_pixel(&mut self, coords: &[usize], pixel: &Pixel) -> Result<()> {
        self.check_forged()?;
        let offset = self.offset_of(coords)?;
        self.write_pixel(offset, pixel)
    }

    pub fn set_pixel_at_offset(&mut self, offset: isize, pixel: &Pixel) -> Result<()> {
        self.check_offset(offset)?;
        self.write_pixel(offset, pixel)
    }

    fn write_pixel(&self, offset: isize, pixel: &Pixel) -> Result<()> {
        let telems = self.tensor_elements();
        if pixel.tensor_elements() != 1 && pixel.tensor_elements() != telems {
            return Err(Error::TensorElementsMismatch {
                expected: telems,
                got: pixel.tensor_elements(),
            });
        }
        let run = self.run(offset, 0);
        for element in 0..telems {
            let value = pixel.values[element.min(pixel.values.len() - 1)];
            run.set(0, element, value);
        }
        Ok(())
    }

    /// The pixel `offset` samples from the origin, as used by offset views.
    pub fn pixel_at_offset(&self, offset: isize) -> Result<Pixel> {
        self.check_offset(offset)?;
        let run = self.run(offset, 0);
        let values = (0..self.tensor_elements()).map(|e| run.get(0, e)).collect();
        Ok(Pixel {
            values,
            tensor: self.tensor,
        })
    }

    fn check_element(&self, element: usize) -> Result<()> {
        if element < self.tensor_elements() {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange("tensor element"))
        }
    }
}
