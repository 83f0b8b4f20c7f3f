//! Line-based processing over strided images.
//!
//! Kernels in this crate are written against a line: a [`SampleRun`] per image plus a pixel
//! count. [`scan_lines`] picks the dimension those lines run along and walks all others.
use nd_texel::SampleRun;

use crate::error::Result;
use crate::image::Image;
use crate::iterators::GenericJointImageIterator;

/// Lines shorter than this are worth trading for a longer line with a larger stride.
pub const SMALL_IMAGE: usize = 63;

/// The dimension to process as a line, `None` for a 0-D image.
pub fn optimal_processing_dim(image: &Image) -> Option<usize> {
    optimal_processing_dim_joint(&[image])
}

/// The dimension to process as a line when visiting images jointly.
///
/// Prefers the smallest stride, taken as the largest absolute stride among the images, but
/// moves to a longer dimension while the current choice has at most [`SMALL_IMAGE`] pixels.
/// A zero stride counts as the worst.
pub fn optimal_processing_dim_joint(images: &[&Image]) -> Option<usize> {
    let first = images.first()?;
    let sizes = first.sizes();
    let cost = |dim: usize| {
        images
            .iter()
            .map(|image| match image.strides().get(dim) {
                Some(0) | None => usize::MAX,
                Some(stride) => stride.unsigned_abs(),
            })
            .max()
            .unwrap_or(usize::MAX)
    };

    let mut best = 0;
    for dim in 1..sizes.len() {
        if cost(dim) < cost(best) {
            if sizes[dim] > SMALL_IMAGE || sizes[dim] > sizes[best] {
                best = dim;
            }
        } else if sizes[best] <= SMALL_IMAGE && sizes[dim] > sizes[best] {
            best = dim;
        }
    }
    (!sizes.is_empty()).then_some(best)
}

/// Call `line` once for every line of the jointly visited images.
///
/// With `flatten`, dimensions are merged first where the layouts allow, which visits the pixels
/// in an order that no longer follows coordinates. Use it for operations that treat all pixels
/// alike.
pub fn scan_lines<'a, const N: usize, F>(
    images: [&'a Image; N],
    flatten: bool,
    mut line: F,
) -> Result<()>
where
    F: FnMut([SampleRun<'a>; N], usize),
{
    let mut it = GenericJointImageIterator::new(images)?;
    if let Some(dim) = optimal_processing_dim_joint(&images) {
        it.set_processing_dimension(dim)?;
    }
    if flatten {
        it.optimize_and_flatten();
    }
    let pixels = it.processing_dimension_size();
    loop {
        line(core::array::from_fn(|k| it.sample_run(k)), pixels);
        if !it.advance() {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use nd_texel::{DataType, Scalar};

    use super::*;

    #[test]
    fn prefers_small_strides() -> crate::Result<()> {
        let image = Image::new(&[100, 20], 1, DataType::UInt8)?;
        assert_eq!(optimal_processing_dim(&image), Some(0));

        let mut swapped = image.clone();
        swapped.swap_dimensions(0, 1)?;
        assert_eq!(optimal_processing_dim(&swapped), Some(1));

        let narrow = Image::new(&[4, 100], 1, DataType::UInt8)?;
        assert_eq!(optimal_processing_dim(&narrow), Some(1));

        let scalar = Image::new(&[], 1, DataType::UInt8)?;
        assert_eq!(optimal_processing_dim(&scalar), None);
        Ok(())
    }

    #[test]
    fn broadcast_is_worst() -> crate::Result<()> {
        let mut image = Image::new(&[1, 70], 1, DataType::UInt8)?;
        image.expand_singleton_dimension(0, 80)?;
        assert_eq!(optimal_processing_dim(&image), Some(1));
        Ok(())
    }

    #[test]
    fn lines_cover_all_pixels() -> crate::Result<()> {
        let image = Image::new(&[6, 5, 4], 2, DataType::SInt16)?;
        let mut pixels = 0;
        scan_lines([&image], false, |[run], len| {
            for index in 0..len {
                run.set(index, 1, Scalar::Int(1));
            }
            pixels += len;
        })?;
        assert_eq!(pixels, 120);
        assert_eq!(image.sample(&[5, 4, 3], 1)?, Scalar::Int(1));
        assert_eq!(image.sample(&[5, 4, 3], 0)?, Scalar::Int(0));
        Ok(())
    }
}
