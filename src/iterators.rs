//! Cursors over the pixels of one or more images of equal sizes.
//!
//! The iterators walk an nD coordinate counter and keep, for each image, the sample offset of the
//! current pixel. A processing dimension can be set aside: the iterator then never advances along
//! it, and each position stands for a whole line that callers visit through a [`SampleRun`].
use nd_texel::{Sample, SampleRun, Scalar};

use crate::error::{Error, Result};
use crate::image::{Image, Pixel};

/// Jointly iterates over `N` images with the same sizes.
///
/// Images may differ in data type, tensor and strides.
pub struct GenericJointImageIterator<'a, const N: usize> {
    images: [&'a Image; N],
    sizes: Vec<usize>,
    strides: [Vec<isize>; N],
    /// Offset in samples of the current pixel, relative to each image's origin.
    offsets: [isize; N],
    coords: Vec<usize>,
    processing_dim: Option<usize>,
    done: bool,
}

/// Iterates over a single image.
pub type GenericImageIterator<'a> = GenericJointImageIterator<'a, 1>;

impl<'a, const N: usize> GenericJointImageIterator<'a, N> {
    pub fn new(images: [&'a Image; N]) -> Result<Self> {
        let Some(first) = images.first() else {
            return Err(Error::InvalidParameter("no images to iterate over"));
        };
        for image in images {
            image.check_forged()?;
            if image.sizes() != first.sizes() {
                return Err(Error::IncompatibleSizes("joint images have different sizes"));
            }
        }
        Ok(GenericJointImageIterator {
            images,
            sizes: first.sizes().to_vec(),
            strides: core::array::from_fn(|k| images[k].strides().to_vec()),
            offsets: [0; N],
            coords: vec![0; first.dimensionality()],
            processing_dim: None,
            done: false,
        })
    }

    /// Visit `dim` as a line instead of pixel by pixel.
    pub fn set_processing_dimension(&mut self, dim: usize) -> Result<()> {
        if dim >= self.sizes.len() {
            return Err(Error::illegal_dimension(dim, self.sizes.len()));
        }
        self.processing_dim = Some(dim);
        Ok(())
    }

    pub fn processing_dimension(&self) -> Option<usize> {
        self.processing_dim
    }

    /// Number of pixels in each line, 1 without a processing dimension.
    pub fn processing_dimension_size(&self) -> usize {
        self.processing_dim.map_or(1, |dim| self.sizes[dim])
    }

    pub fn processing_dimension_stride(&self, image: usize) -> isize {
        self.processing_dim.map_or(0, |dim| self.strides[image][dim])
    }

    /// Simplify the loop nest, after which coordinates no longer match the images' dimensions.
    ///
    /// Dimensions mirrored in all images are un-mirrored, dimensions are sorted by the strides
    /// of the first image, singletons are dropped, and dimensions that are contiguous in every
    /// image are merged. The processing dimension becomes the one with the smallest stride.
    /// Only valid before the first advance.
    pub fn optimize_and_flatten(&mut self) {
        let nd = self.sizes.len();
        for dim in 0..nd {
            if (0..N).all(|k| self.strides[k][dim] < 0) {
                for k in 0..N {
                    self.offsets[k] += (self.sizes[dim] as isize - 1) * self.strides[k][dim];
                    self.strides[k][dim] = -self.strides[k][dim];
                }
            }
        }

        let mut order: Vec<usize> = (0..nd).filter(|&dim| self.sizes[dim] > 1).collect();
        order.sort_by_key(|&dim| self.strides[0][dim].unsigned_abs());

        let mut sizes: Vec<usize> = Vec::with_capacity(order.len());
        let mut strides: [Vec<isize>; N] = core::array::from_fn(|_| Vec::new());
        for dim in order {
            let size = self.sizes[dim];
            let mergeable = sizes.last().is_some_and(|&last| {
                (0..N).all(|k| {
                    let previous = strides[k].last().copied().unwrap_or_default();
                    previous * last as isize == self.strides[k][dim]
                })
            });
            if mergeable {
                if let Some(last) = sizes.last_mut() {
                    *last *= size;
                }
            } else {
                sizes.push(size);
                for k in 0..N {
                    strides[k].push(self.strides[k][dim]);
                }
            }
        }

        self.coords = vec![0; sizes.len()];
        self.processing_dim = (!sizes.is_empty()).then_some(0);
        self.sizes = sizes;
        self.strides = strides;
    }

    /// Move to the next pixel, or line. Returns false once every position was visited.
    pub fn advance(&mut self) -> bool {
        if self.done {
            return false;
        }
        for dim in 0..self.sizes.len() {
            if Some(dim) == self.processing_dim {
                continue;
            }
            self.coords[dim] += 1;
            for k in 0..N {
                self.offsets[k] += self.strides[k][dim];
            }
            if self.coords[dim] < self.sizes[dim] {
                return true;
            }
            let size = self.sizes[dim] as isize;
            for k in 0..N {
                self.offsets[k] -= self.strides[k][dim] * size;
            }
            self.coords[dim] = 0;
        }
        self.done = true;
        false
    }

    pub fn is_at_end(&self) -> bool {
        self.done
    }

    pub fn coordinates(&self) -> &[usize] {
        &self.coords
    }

    /// Offset of the current pixel of image `k`, in samples from its origin.
    pub fn offset(&self, image: usize) -> isize {
        self.offsets[image]
    }

    /// The current line of image `k`, or the current pixel without a processing dimension.
    pub fn sample_run(&self, image: usize) -> SampleRun<'a> {
        self.images[image].run(self.offsets[image], self.processing_dimension_stride(image))
    }

    /// Sample `element` of the current pixel of image `k`.
    pub fn sample(&self, image: usize, element: usize) -> Scalar {
        self.sample_run(image).get(0, element)
    }

    pub fn set_sample(&self, image: usize, element: usize, value: Scalar) {
        self.sample_run(image).set(0, element, value)
    }

    pub fn pixel(&self, image: usize) -> Pixel {
        let run = self.sample_run(image);
        let values = (0..self.images[image].tensor_elements())
            .map(|element| run.get(0, element))
            .collect();
        Pixel::from_parts(values, *self.images[image].tensor())
    }
}

/// Iterates over an image with samples of a statically known type.
pub struct ImageIterator<'a, T> {
    inner: GenericImageIterator<'a>,
    sample: core::marker::PhantomData<T>,
}

impl<'a, T: Sample> ImageIterator<'a, T> {
    pub fn new(image: &'a Image) -> Result<Self> {
        if image.data_type() != T::DATA_TYPE {
            return Err(Error::DataTypeNotSupported(image.data_type()));
        }
        Ok(ImageIterator {
            inner: GenericImageIterator::new([image])?,
            sample: core::marker::PhantomData,
        })
    }

    pub fn set_processing_dimension(&mut self, dim: usize) -> Result<()> {
        self.inner.set_processing_dimension(dim)
    }

    pub fn optimize_and_flatten(&mut self) {
        self.inner.optimize_and_flatten()
    }

    pub fn advance(&mut self) -> bool {
        self.inner.advance()
    }

    pub fn coordinates(&self) -> &[usize] {
        self.inner.coordinates()
    }

    pub fn processing_dimension_size(&self) -> usize {
        self.inner.processing_dimension_size()
    }

    /// Sample `element` of pixel `index` along the current line.
    pub fn get(&self, index: usize, element: usize) -> T {
        self.inner.sample_run(0).load(index, element)
    }

    pub fn set(&self, index: usize, element: usize, value: T) {
        self.inner.sample_run(0).store(index, element, value)
    }
}
