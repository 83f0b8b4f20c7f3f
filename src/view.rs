//! Irregular access to a subset of the pixels of an image.
//!
//! A [`View`] selects pixels of a reference image by ranges, by a binary mask, or by a list of
//! offsets. Ranges select a regular grid, which is again an [`Image`] sharing the data. The other
//! selections are gathered into a new 1D image when read, and scattered back when written, in
//! the order of the mask's pixels or of the offset list.
use log::debug;
use nd_texel::{copy_buffer, DataType};

use crate::error::{Error, Result};
use crate::framework::scan_lines;
use crate::image::{Image, Pixel};
use crate::iterators::{GenericImageIterator, GenericJointImageIterator};
use crate::options::AcceptDataTypeChange;

/// An inclusive range of indices along one dimension, with a step.
///
/// Negative indices count from the end, `-1` being the last pixel. A range whose start lies
/// beyond its stop runs backward, mirroring the dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: isize,
    pub stop: isize,
    pub step: usize,
}

impl Range {
    pub const fn new(start: isize, stop: isize) -> Self {
        Range {
            start,
            stop,
            step: 1,
        }
    }

    pub const fn with_step(start: isize, stop: isize, step: usize) -> Self {
        Range { start, stop, step }
    }

    /// Every index.
    pub const fn all() -> Self {
        Range::new(0, -1)
    }

    pub const fn single(index: isize) -> Self {
        Range::new(index, index)
    }

    /// Resolve negative indices for a dimension of `size` pixels and move the stop onto the last
    /// index the step reaches.
    pub fn fix(&mut self, size: usize) -> Result<()> {
        let size = size as isize;
        let resolve = |index: isize| if index < 0 { index + size } else { index };
        let (start, stop) = (resolve(self.start), resolve(self.stop));
        if !(0..size).contains(&start) || !(0..size).contains(&stop) {
            return Err(Error::IndexOutOfRange("range exceeds the image"));
        }
        if self.step == 0 {
            return Err(Error::InvalidParameter("range step must be positive"));
        }
        let step = self.step as isize;
        self.start = start;
        self.stop = if start > stop {
            start - (start - stop) / step * step
        } else {
            start + (stop - start) / step * step
        };
        Ok(())
    }

    /// Number of indices in a fixed range.
    pub fn size(&self) -> usize {
        (self.start - self.stop).unsigned_abs() / self.step.max(1) + 1
    }

    pub fn is_mirrored(&self) -> bool {
        self.start > self.stop
    }

    /// The step with the direction of the range.
    pub fn signed_step(&self) -> isize {
        if self.is_mirrored() {
            -(self.step as isize)
        } else {
            self.step as isize
        }
    }
}

impl Default for Range {
    fn default() -> Self {
        Range::all()
    }
}

enum Selection {
    Regular,
    /// A binary mask with the sizes of the reference image, and its number of set pixels.
    Mask { mask: Image, count: usize },
    /// Sample offsets of the selected pixels, relative to the origin.
    Offsets(Vec<isize>),
}

/// A selection of pixels of an image.
pub struct View {
    reference: Image,
    selection: Selection,
}

impl Image {
    /// A regular view of the pixels selected by one range per dimension, or one for all.
    pub fn at(&self, ranges: &[Range]) -> Result<View> {
        let mut reference = self.clone();
        reference.restrict(ranges)?;
        Ok(View {
            reference,
            selection: Selection::Regular,
        })
    }

    /// A view of the pixels where `mask` is set.
    ///
    /// The mask must be binary and scalar. Singleton dimensions of the mask broadcast.
    pub fn at_mask(&self, mask: &Image) -> Result<View> {
        self.check_forged()?;
        let mask = broadcast_mask(mask, self.sizes())?;
        let count = count_set(&mask)?;
        Ok(View {
            reference: self.clone(),
            selection: Selection::Mask { mask, count },
        })
    }

    /// A view of the pixels at a list of coordinates, in the order given.
    pub fn at_coordinates(&self, coordinates: &[Vec<usize>]) -> Result<View> {
        self.check_forged()?;
        let offsets = coordinates
            .iter()
            .map(|coords| self.offset_of(coords))
            .collect::<Result<Vec<_>>>()?;
        self.at_offsets(offsets)
    }

    /// A view of the pixels at a list of sample offsets from the origin, in the order given.
    pub fn at_offsets(&self, offsets: Vec<isize>) -> Result<View> {
        self.check_forged()?;
        if offsets.is_empty() {
            return Err(Error::InvalidParameter("offset list is empty"));
        }
        for &offset in &offsets {
            self.check_offset(offset)?;
        }
        Ok(View {
            reference: self.clone(),
            selection: Selection::Offsets(offsets),
        })
    }

    /// Copy the pixels of `view` into this image.
    ///
    /// A regular view copies like [`Image::copy`]. For the other views, a forged image must
    /// already hold exactly the selected pixels; it is protected while the pixels are gathered.
    pub fn copy_from_view(&mut self, view: &View) -> Result<()> {
        if self.is_forged() && self.tensor_elements() != view.tensor_elements() {
            return Err(Error::TensorElementsMismatch {
                expected: self.tensor_elements(),
                got: view.tensor_elements(),
            });
        }
        let source = &view.reference;
        if view.is_regular() {
            return self.copy(source);
        }
        let previous = if self.is_forged() {
            self.protect(true)
        } else {
            self.is_protected()
        };
        let result = match &view.selection {
            Selection::Mask { mask, .. } => copy_from_mask(source, self, mask),
            Selection::Offsets(offsets) => copy_from_offsets(source, self, offsets),
            Selection::Regular => Ok(()),
        };
        self.protect(previous);
        result
    }
}

impl View {
    pub fn is_regular(&self) -> bool {
        matches!(self.selection, Selection::Regular)
    }

    /// The image the view selects from, restricted to the ranges for a regular view.
    pub fn reference(&self) -> &Image {
        &self.reference
    }

    pub fn tensor_elements(&self) -> usize {
        self.reference.tensor_elements()
    }

    pub fn data_type(&self) -> DataType {
        self.reference.data_type()
    }

    pub fn number_of_pixels(&self) -> usize {
        match &self.selection {
            Selection::Regular => self.reference.number_of_pixels(),
            Selection::Mask { count, .. } => *count,
            Selection::Offsets(offsets) => offsets.len(),
        }
    }

    /// The selected pixels as an image.
    ///
    /// A regular view shares the data of its reference. Other views are copied into a new 1D
    /// image with one pixel per selected pixel.
    pub fn to_image(&self) -> Result<Image> {
        if self.is_regular() {
            return Ok(self.reference.clone());
        }
        let mut out = Image::default();
        out.copy_from_view(self)?;
        Ok(out)
    }

    /// Write the pixels of `src` into the selected pixels.
    ///
    /// A regular view takes an image of its sizes, the others a 1D image with one pixel per
    /// selected pixel. Samples convert to the data type of the reference.
    pub fn assign(&self, src: &Image) -> Result<()> {
        src.check_forged()?;
        if src.tensor_elements() != self.tensor_elements() {
            return Err(Error::TensorElementsMismatch {
                expected: self.tensor_elements(),
                got: src.tensor_elements(),
            });
        }
        let temporary;
        let src = if src.aliases(&self.reference) {
            debug!("view assignment from overlapping image goes through a copy");
            temporary = src.copied()?;
            &temporary
        } else {
            src
        };

        let mut target = self.reference.clone();
        match &self.selection {
            Selection::Regular => {
                if src.sizes() != target.sizes() {
                    return Err(Error::IncompatibleSizes("view and image have different sizes"));
                }
                target.protect(true);
                target.copy(src)
            }
            Selection::Mask { mask, .. } => copy_to_mask(src, &mut target, mask),
            Selection::Offsets(offsets) => copy_to_offsets(src, &mut target, offsets),
        }
    }

    /// Write `value` into every selected pixel. A pixel with one element fills all elements.
    pub fn fill(&self, value: &Pixel) -> Result<()> {
        let telems = self.tensor_elements();
        if value.tensor_elements() != 1 && value.tensor_elements() != telems {
            return Err(Error::TensorElementsMismatch {
                expected: telems,
                got: value.tensor_elements(),
            });
        }
        let mut target = self.reference.clone();
        match &self.selection {
            Selection::Regular => target.fill_pixel(value),
            Selection::Mask { mask, .. } => {
                let mut it = GenericJointImageIterator::new([&target, mask])?;
                loop {
                    if it.sample(1, 0).is_nonzero() {
                        write_pixel(&it, value, telems);
                    }
                    if !it.advance() {
                        return Ok(());
                    }
                }
            }
            Selection::Offsets(offsets) => {
                for &offset in offsets {
                    target.set_pixel_at_offset(offset, value)?;
                }
                Ok(())
            }
        }
    }
}

fn write_pixel<const N: usize>(it: &GenericJointImageIterator<N>, value: &Pixel, telems: usize) {
    let values = value.values();
    for element in 0..telems {
        it.set_sample(0, element, values[element.min(values.len() - 1)]);
    }
}

/// Check a mask against the sizes of an image and broadcast its singleton dimensions.
fn broadcast_mask(mask: &Image, sizes: &[usize]) -> Result<Image> {
    mask.check_forged()?;
    if mask.data_type() != DataType::Bin {
        return Err(Error::MaskNotBinary);
    }
    if !mask.is_scalar() {
        return Err(Error::NotScalar);
    }
    if mask.dimensionality() != sizes.len() {
        return Err(Error::IncompatibleSizes("mask and image dimensionalities differ"));
    }
    let mut mask = mask.quick_copy();
    mask.expand_singleton_dimensions(sizes)?;
    Ok(mask)
}

fn count_set(mask: &Image) -> Result<usize> {
    let mut count = 0;
    scan_lines([mask], true, |[run], pixels| {
        count += (0..pixels).filter(|&pixel| run.get(pixel, 0).is_nonzero()).count();
    })?;
    Ok(count)
}

/// Make `dest` a 1D image of `pixels` pixels able to receive the pixels of `src`.
fn prepare_gather(src: &Image, dest: &mut Image, pixels: usize) -> Result<()> {
    let telems = src.tensor_elements();
    if dest.is_forged() && dest.number_of_pixels() == pixels && dest.tensor_elements() == telems {
        return Ok(());
    }
    dest.reforge(&[pixels], telems, src.data_type(), AcceptDataTypeChange::DoAllow)?;
    dest.copy_non_data_properties(src);
    Ok(())
}

/// Gather the pixels of `src` where `mask` is set into `dest`, in scan order.
///
/// `dest` is reforged to a 1D image when it does not hold exactly that many pixels. Without any
/// set pixel, `dest` is left raw with a single dimension of size zero.
pub fn copy_from_mask(src: &Image, dest: &mut Image, mask: &Image) -> Result<()> {
    src.check_forged()?;
    let mask = broadcast_mask(mask, src.sizes())?;
    let pixels = count_set(&mask)?;
    if pixels == 0 {
        dest.strip()?;
        dest.set_sizes(&[0])?;
        return Ok(());
    }
    prepare_gather(src, dest, pixels)?;

    let telems = src.tensor_elements();
    let mut from = GenericJointImageIterator::new([src, &mask])?;
    let mut into = GenericImageIterator::new([&*dest])?;
    loop {
        if from.sample(1, 0).is_nonzero() {
            copy_buffer(&from.sample_run(0), &into.sample_run(0), 1, telems, None);
            into.advance();
        }
        if !from.advance() {
            return Ok(());
        }
    }
}

/// Gather the pixels of `src` at `offsets` into `dest`, in the order of the list.
pub fn copy_from_offsets(src: &Image, dest: &mut Image, offsets: &[isize]) -> Result<()> {
    src.check_forged()?;
    if offsets.is_empty() {
        return Err(Error::InvalidParameter("offset list is empty"));
    }
    for &offset in offsets {
        src.check_offset(offset)?;
    }
    prepare_gather(src, dest, offsets.len())?;

    let telems = src.tensor_elements();
    let mut into = GenericImageIterator::new([&*dest])?;
    for &offset in offsets {
        copy_buffer(&src.run(offset, 0), &into.sample_run(0), 1, telems, None);
        into.advance();
    }
    Ok(())
}

/// Scatter the pixels of `src`, in scan order, into the pixels of `dest` where `mask` is set.
pub fn copy_to_mask(src: &Image, dest: &mut Image, mask: &Image) -> Result<()> {
    src.check_forged()?;
    dest.check_forged()?;
    check_scatter_elements(src, dest)?;
    let mask = broadcast_mask(mask, dest.sizes())?;
    if count_set(&mask)? != src.number_of_pixels() {
        return Err(Error::IncompatibleSizes("number of pixels does not match mask"));
    }

    let telems = src.tensor_elements();
    let mut from = GenericImageIterator::new([src])?;
    let mut into = GenericJointImageIterator::new([&*dest, &mask])?;
    loop {
        if into.sample(1, 0).is_nonzero() {
            copy_buffer(&from.sample_run(0), &into.sample_run(0), 1, telems, None);
            from.advance();
        }
        if !into.advance() {
            return Ok(());
        }
    }
}

/// Scatter the pixels of `src`, in scan order, to `offsets` of `dest`.
pub fn copy_to_offsets(src: &Image, dest: &mut Image, offsets: &[isize]) -> Result<()> {
    src.check_forged()?;
    dest.check_forged()?;
    check_scatter_elements(src, dest)?;
    if offsets.is_empty() {
        return Err(Error::InvalidParameter("offset list is empty"));
    }
    if offsets.len() != src.number_of_pixels() {
        return Err(Error::IncompatibleSizes("number of pixels does not match offset list"));
    }
    for &offset in offsets {
        dest.check_offset(offset)?;
    }

    let telems = src.tensor_elements();
    let mut from = GenericImageIterator::new([src])?;
    for &offset in offsets {
        copy_buffer(&from.sample_run(0), &dest.run(offset, 0), 1, telems, None);
        from.advance();
    }
    Ok(())
}

fn check_scatter_elements(src: &Image, dest: &Image) -> Result<()> {
    if src.tensor_elements() != dest.tensor_elements() {
        return Err(Error::TensorElementsMismatch {
            expected: dest.tensor_elements(),
            got: src.tensor_elements(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use nd_texel::Scalar;

    use super::*;

    fn ramp(sizes: &[usize]) -> Image {
        let count: usize = sizes.iter().product();
        let samples: Vec<i32> = (0..count as i32).collect();
        Image::from_samples(sizes, &samples).expect("valid sizes")
    }

    fn values(image: &Image) -> Vec<Scalar> {
        (0..image.number_of_pixels())
            .map(|index| {
                let coords = image.coordinates_of(index)?;
                image.sample(&coords, 0)
            })
            .collect::<Result<_>>()
            .expect("forged image")
    }

    fn ints(values: &[i128]) -> Vec<Scalar> {
        values.iter().copied().map(Scalar::Int).collect()
    }

    #[test]
    fn fixing_ranges() -> Result<()> {
        let mut range = Range::all();
        range.fix(10)?;
        assert_eq!((range.start, range.stop, range.size()), (0, 9, 10));

        let mut stepped = Range::with_step(1, -1, 3);
        stepped.fix(10)?;
        assert_eq!((stepped.stop, stepped.size()), (7, 3));

        let mut backward = Range::with_step(-1, 0, 2);
        backward.fix(5)?;
        assert_eq!((backward.start, backward.stop, backward.signed_step()), (4, 0, -2));

        assert!(Range::new(0, 10).fix(10).is_err());
        assert!(Range::with_step(0, 3, 0).fix(10).is_err());
        Ok(())
    }

    #[test]
    fn regular_views_share_data() -> Result<()> {
        let image = ramp(&[6, 4]);
        let view = image.at(&[Range::with_step(4, 0, 2), Range::single(1)])?;
        assert!(view.is_regular());
        let sub = view.to_image()?;
        assert_eq!(sub.sizes(), [3, 1]);
        assert_eq!(values(&sub), ints(&[10, 8, 6]));
        assert!(sub.aliases(&image));

        view.fill(&Pixel::from(-1))?;
        assert_eq!(image.sample(&[2, 1], 0)?, Scalar::Int(-1));
        assert_eq!(image.sample(&[3, 1], 0)?, Scalar::Int(9));
        Ok(())
    }

    #[test]
    fn mask_gather_and_scatter() -> Result<()> {
        let image = ramp(&[4, 2]);
        let mut mask = Image::new(&[4, 1], 1, DataType::Bin)?;
        mask.set_sample(&[1, 0], 0, 1)?;
        mask.set_sample(&[3, 0], 0, 1)?;

        let view = image.at_mask(&mask)?;
        assert_eq!(view.number_of_pixels(), 4);
        let gathered = view.to_image()?;
        assert_eq!(gathered.sizes(), [4]);
        assert_eq!(values(&gathered), ints(&[1, 3, 5, 7]));

        let replacement = Image::from_samples(&[4], &[10u8, 20, 30, 40])?;
        view.assign(&replacement)?;
        assert_eq!(values(&image), ints(&[0, 10, 2, 20, 4, 30, 6, 40]));

        let short = Image::from_samples(&[3], &[0u8; 3])?;
        assert!(matches!(view.assign(&short), Err(Error::IncompatibleSizes(_))));
        Ok(())
    }

    #[test]
    fn empty_mask_leaves_destination_raw() -> Result<()> {
        let image = ramp(&[3]);
        let mask = Image::new(&[3], 1, DataType::Bin)?;
        let mut dest = Image::new(&[2], 1, DataType::UInt8)?;
        copy_from_mask(&image, &mut dest, &mask)?;
        assert!(!dest.is_forged());
        assert_eq!(dest.sizes(), [0]);
        Ok(())
    }

    #[test]
    fn offsets_gather_and_scatter() -> Result<()> {
        let image = ramp(&[5, 3]);
        let view = image.at_coordinates(&[vec![4, 2], vec![0, 0], vec![1, 1]])?;
        assert_eq!(values(&view.to_image()?), ints(&[14, 0, 6]));

        let mut dest = Image::new(&[5, 3], 1, DataType::SFloat)?;
        let src = Image::from_samples(&[2], &[1.5f32, 2.5])?;
        copy_to_offsets(&src, &mut dest, &[3, 7])?;
        assert_eq!(dest.sample(&[3, 0], 0)?, Scalar::Real(1.5));
        assert_eq!(dest.sample(&[2, 1], 0)?, Scalar::Real(2.5));
        assert_eq!(
            copy_to_offsets(&src, &mut dest, &[3]),
            Err(Error::IncompatibleSizes("number of pixels does not match offset list"))
        );
        assert!(image.at_offsets(vec![15]).is_err());
        Ok(())
    }

    #[test]
    fn copy_from_view_keeps_destination() -> Result<()> {
        let image = ramp(&[4]);
        let view = image.at_offsets(vec![3, 2])?;
        let mut dest = Image::new(&[2], 1, DataType::UInt16)?;
        dest.copy_from_view(&view)?;
        assert_eq!(dest.data_type(), DataType::UInt16);
        assert_eq!(values(&dest), ints(&[3, 2]));
        assert!(!dest.is_protected());

        let mut wrong = Image::new(&[3], 1, DataType::UInt16)?;
        assert_eq!(wrong.copy_from_view(&view), Err(Error::Protected));
        Ok(())
    }

    #[test]
    fn overlapping_assignment() -> Result<()> {
        let image = ramp(&[5]);
        let view = image.at(&[Range::new(1, 4)])?;
        view.assign(&image.at(&[Range::new(0, 3)])?.to_image()?)?;
        assert_eq!(values(&image), ints(&[0, 0, 1, 2, 3]));
        Ok(())
    }

    // Sample `element` of pixel `index` of a 4x3 image holds `index * 10 + element`.
    fn tensor_ramp(planar: bool) -> Result<Image> {
        let mut image = Image::raw(&[4, 3], 3, DataType::UInt16);
        if planar {
            image.set_strides(&[1, 4], 12)?;
        }
        image.forge()?;
        for index in 0..12 {
            let coords = image.coordinates_of(index)?;
            for element in 0..3 {
                image.set_sample(&coords, element, (index * 10 + element) as u16)?;
            }
        }
        Ok(image)
    }

    fn tensor_pixel(index: i128) -> Vec<Scalar> {
        ints(&[index * 10, index * 10 + 1, index * 10 + 2])
    }

    #[test]
    fn tensor_views() -> Result<()> {
        for planar in [false, true] {
            let image = tensor_ramp(planar)?;
            let view = image.at(&[Range::new(1, 2), Range::single(2)])?;

            let shared = view.to_image()?;
            assert_eq!(shared.tensor_elements(), 3);
            assert_eq!(shared.pixel(&[1, 0])?.values(), tensor_pixel(10));

            let mut copy = Image::default();
            copy.copy_from_view(&view)?;
            assert!(!copy.aliases(&image));
            assert_eq!(copy.sizes(), [2, 1]);
            assert_eq!(copy.tensor_elements(), 3);
            assert_eq!(copy.pixel(&[0, 0])?.values(), tensor_pixel(9));
            assert_eq!(copy.pixel(&[1, 0])?.values(), tensor_pixel(10));

            let mut mask = Image::new(&[4, 3], 1, DataType::Bin)?;
            mask.set_sample(&[1, 0], 0, 1)?;
            mask.set_sample(&[2, 2], 0, 1)?;
            let gathered = image.at_mask(&mask)?.to_image()?;
            assert_eq!(gathered.tensor_elements(), 3);
            assert_eq!(gathered.pixel(&[0])?.values(), tensor_pixel(1));
            assert_eq!(gathered.pixel(&[1])?.values(), tensor_pixel(10));
        }
        Ok(())
    }

    #[test]
    fn overlapping_tensor_assignment() -> Result<()> {
        for planar in [false, true] {
            let image = tensor_ramp(planar)?;
            let view = image.at(&[Range::new(1, 3), Range::all()])?;
            view.assign(&image.at(&[Range::new(0, 2), Range::all()])?.to_image()?)?;

            assert_eq!(image.tensor_elements(), 3);
            for y in 0..3 {
                let row = 4 * y as i128;
                assert_eq!(image.pixel(&[0, y])?.values(), tensor_pixel(row));
                for x in 1..4 {
                    let expected = tensor_pixel(row + x as i128 - 1);
                    assert_eq!(image.pixel(&[x, y])?.values(), expected);
                }
            }
        }
        Ok(())
    }
}
