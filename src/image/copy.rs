//! Operations that read or write sample values.
use log::debug;
use nd_texel::{copy_buffer, fill_buffer, fill_buffer_pixel};
use nd_texel::{DataType, Sample, SampleRun, Scalar, TensorLookup};

use crate::error::{Error, Result};
use crate::framework::scan_lines;
use crate::options::CropLocation;
use crate::tensor::Tensor;

use super::{Image, Pixel};

impl Image {
    /// Copy the samples of `src`, which has the sizes and tensor elements of this image.
    ///
    /// The two images must not overlap unless they are identical views.
    pub(crate) fn copy_samples_from(&self, src: &Image) -> Result<()> {
        self.transfer_from(src, None)
    }

    fn transfer_from(&self, src: &Image, lut: Option<&[TensorLookup]>) -> Result<()> {
        let telems = self.tensor_elements();
        let simple = (self.simple_stride_and_offset(), src.simple_stride_and_offset());
        if let (Some((into_stride, into)), Some((from_stride, from))) = simple {
            if self.has_same_dimension_order(src) {
                debug!("copy of {:?} as a single run", self.sizes);
                let (from, into) = (src.run(from, from_stride), self.run(into, into_stride));
                copy_buffer(&from, &into, self.number_of_pixels(), telems, lut);
                return Ok(());
            }
        }
        debug!("copy of {:?} line by line", self.sizes);
        scan_lines([src, self], false, |[from, into], pixels| {
            copy_buffer(&from, &into, pixels, telems, lut)
        })
    }

    /// Copy the samples of `src` into this image.
    ///
    /// The data is reused if it has the right sizes and tensor elements, converting to the data
    /// type of this image. Otherwise, or if the data partially overlaps with `src`, new data is
    /// allocated with the properties of `src`.
    pub fn copy(&mut self, src: &Image) -> Result<()> {
        src.check_forged()?;
        if self.is_forged() {
            if self.is_identical_view(src) {
                self.copy_non_data_properties(src);
                return Ok(());
            }
            let same = self.sizes == src.sizes && self.tensor_elements() == src.tensor_elements();
            if !same || self.is_overlapping_view(src) {
                if same {
                    debug!("copy destination overlaps its source, reallocating");
                }
                self.strip()?;
            }
        }
        if !self.is_forged() {
            self.sizes = src.sizes.clone();
            self.strides = src.strides.clone();
            self.tensor = src.tensor;
            self.tensor_stride = src.tensor_stride;
            self.data_type = src.data_type;
            self.forge()?;
        }
        self.tensor = src.tensor;
        self.copy_non_data_properties(src);
        self.transfer_from(src, None)
    }

    /// A deep copy with its own data.
    pub fn copied(&self) -> Result<Image> {
        let mut out = Image::default();
        out.copy(self)?;
        Ok(out)
    }

    /// Change the data type, converting every sample with saturation.
    ///
    /// Binary images become 8-bit integer images without touching the data. Conversion happens
    /// in place when the data is not shared and the sample size stays the same.
    pub fn convert(&mut self, data_type: DataType) -> Result<()> {
        self.check_forged()?;
        if data_type == self.data_type {
            return Ok(());
        }
        if self.data_type == DataType::Bin
            && matches!(data_type, DataType::UInt8 | DataType::SInt8)
        {
            self.data_type = data_type;
            return Ok(());
        }

        let telems = self.tensor_elements();
        if !self.is_shared()
            && !self.is_singleton_expanded()
            && data_type.size_of() == self.data_type.size_of()
        {
            debug!("convert from {} to {} in place", self.data_type, data_type);
            scan_lines([&*self], true, |[run], pixels| {
                let into = SampleRun { data_type, ..run };
                copy_buffer(&run, &into, pixels, telems, None)
            })?;
            self.data_type = data_type;
            return Ok(());
        }

        if self.protect {
            return Err(Error::Protected);
        }
        debug!("convert from {} to {} reallocates", self.data_type, data_type);
        let target = self.similar_typed(data_type)?;
        target.copy_samples_from(self)?;
        self.take_data_from(target);
        Ok(())
    }

    /// Store the tensor as a full column-major matrix, if it is not already.
    pub fn expand_tensor(&mut self) -> Result<()> {
        self.check_forged()?;
        if self.tensor.has_normal_order() {
            return Ok(());
        }
        if self.protect {
            return Err(Error::Protected);
        }
        let lut = self.tensor.look_up_table();
        let tensor = Tensor::matrix(self.tensor.rows(), self.tensor.columns());
        let mut out = Image {
            sizes: self.sizes.clone(),
            tensor,
            data_type: self.data_type,
            external: self.external.clone(),
            ..Image::default()
        };
        out.forge()?;
        out.transfer_from(self, Some(&lut))?;
        self.tensor = tensor;
        self.take_data_from(out);
        Ok(())
    }

    /// Reverse the byte order of every sample, or of both components of complex samples.
    pub fn swap_bytes_in_sample(&mut self) -> Result<()> {
        self.check_forged()?;
        if self.data_type.size_of() == 1 {
            return Ok(());
        }
        let mut samples = self.quick_copy();
        // Broadcast samples would be swapped once per repetition.
        samples.unexpand_singleton_dimensions()?;
        if !samples.is_scalar() {
            samples.tensor_to_spatial(samples.dimensionality())?;
        }
        if samples.data_type.is_complex() {
            samples.split_complex(0)?;
        }
        let unsigned = samples
            .data_type
            .to_unsigned_integer()
            .ok_or(Error::DataTypeNotSupported(samples.data_type))?;
        samples.reinterpret_cast(unsigned)?;

        scan_lines([&samples], true, |[run], pixels| match run.data_type {
            DataType::UInt16 => swap_run(&run, pixels, u16::swap_bytes),
            DataType::UInt32 => swap_run(&run, pixels, u32::swap_bytes),
            DataType::UInt64 => swap_run(&run, pixels, u64::swap_bytes),
            _ => {}
        })
    }

    /// Write `value` into every sample.
    pub fn fill(&mut self, value: impl Into<Scalar>) -> Result<()> {
        self.check_forged()?;
        let (value, telems) = (value.into(), self.tensor_elements());
        scan_lines([&*self], true, |[run], pixels| {
            fill_buffer(&run, pixels, telems, value)
        })
    }

    /// Write `pixel` into every pixel. A pixel with one element fills all tensor elements.
    pub fn fill_pixel(&mut self, pixel: &Pixel) -> Result<()> {
        self.check_forged()?;
        match pixel.values() {
            [value] => self.fill(*value),
            values if values.len() == self.tensor_elements() => {
                scan_lines([&*self], true, |[run], pixels| {
                    fill_buffer_pixel(&run, pixels, values)
                })
            }
            values => Err(Error::TensorElementsMismatch {
                expected: self.tensor_elements(),
                got: values.len(),
            }),
        }
    }

    /// Set to zero all samples of pixels where the binary `mask` is not set.
    ///
    /// The mask may have singleton dimensions that expand to the sizes of this image.
    pub fn mask(&mut self, mask: &Image) -> Result<()> {
        self.check_forged()?;
        mask.check_forged()?;
        if mask.data_type != DataType::Bin {
            return Err(Error::MaskNotBinary);
        }
        if !mask.is_scalar() {
            return Err(Error::NotScalar);
        }
        let mut mask = mask.quick_copy();
        mask.expand_singleton_dimensions(&self.sizes)?;

        let telems = self.tensor_elements();
        scan_lines([&*self, &mask], false, |[data, mask], pixels| {
            for pixel in (0..pixels).filter(|&pixel| !mask.get(pixel, 0).is_nonzero()) {
                for element in 0..telems {
                    data.set(pixel, element, Scalar::Int(0));
                }
            }
        })
    }

    /// A larger image holding this one at `location`, with `value` everywhere else.
    pub fn pad(&self, sizes: &[usize], value: &Pixel, location: CropLocation) -> Result<Image> {
        self.check_forged()?;
        if sizes.len() != self.sizes.len() {
            return Err(Error::wrong_length(self.sizes.len(), sizes.len()));
        }
        if sizes.iter().zip(&self.sizes).any(|(padded, own)| padded < own) {
            return Err(Error::IndexOutOfRange("padded size is smaller than the image"));
        }

        let mut out = Image {
            sizes: sizes.to_vec(),
            tensor: self.tensor,
            data_type: self.data_type,
            pixel_size: self.pixel_size.clone(),
            color_space: self.color_space.clone(),
            external: self.external.clone(),
            ..Image::default()
        };
        out.forge()?;
        out.fill_pixel(value)?;
        let mut window = out.cropped(&self.sizes, location)?;
        window.protect(true);
        window.copy(self)?;
        Ok(out)
    }
}

fn swap_run<T: Sample>(run: &SampleRun, pixels: usize, swap: fn(T) -> T) {
    for pixel in 0..pixels {
        run.store(pixel, 0, swap(run.load::<T>(pixel, 0)));
    }
}

#[cfg(test)]
mod tests {
    use nd_texel::DataSegment;

    use super::*;
    use crate::tensor::TensorShape;

    fn ramp(sizes: &[usize]) -> Image {
        let count: usize = sizes.iter().product();
        let samples: Vec<u16> = (0..count as u16).collect();
        Image::from_samples(sizes, &samples).expect("valid sizes")
    }

    #[test]
    fn copy_allocates_and_reuses() -> Result<()> {
        let src = ramp(&[4, 3]);
        let mut dest = Image::default();
        dest.copy(&src)?;
        assert!(!dest.aliases(&src));
        assert_eq!(dest.sample(&[2, 1], 0)?, Scalar::Int(6));

        let mut floats = Image::new(&[4, 3], 1, DataType::SFloat)?;
        let address = floats.data().map(DataSegment::address);
        floats.copy(&src)?;
        assert_eq!(floats.data().map(DataSegment::address), address);
        assert_eq!(floats.data_type(), DataType::SFloat);
        assert_eq!(floats.sample(&[3, 2], 0)?, Scalar::Real(11.0));

        let mut other = Image::new(&[2, 2], 1, DataType::UInt8)?;
        other.protect(true);
        assert_eq!(other.copy(&src), Err(Error::Protected));
        Ok(())
    }

    /// A 4x3 image with three elements per pixel, interleaved or one plane per element.
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

    fn assert_same_pixels(image: &Image, expected: &Image) -> Result<()> {
        assert_eq!(image.sizes(), expected.sizes());
        assert_eq!(image.tensor_elements(), expected.tensor_elements());
        for index in 0..expected.number_of_pixels() {
            let coords = expected.coordinates_of(index)?;
            assert_eq!(image.pixel(&coords)?.values(), expected.pixel(&coords)?.values());
        }
        Ok(())
    }

    #[test]
    fn copy_tensor_images() -> Result<()> {
        for planar in [false, true] {
            let src = tensor_ramp(planar)?;
            assert_eq!(src.tensor_stride(), if planar { 12 } else { 1 });

            let copy = src.copied()?;
            assert!(!copy.aliases(&src));
            assert_eq!(copy.tensor_elements(), 3);
            assert_eq!(copy.strides(), src.strides());
            assert_eq!(copy.tensor_stride(), src.tensor_stride());
            assert_eq!(copy.sample(&[3, 2], 2)?, Scalar::Int(112));
            assert_same_pixels(&copy, &src)?;

            let mut dest = Image::new(&[2], 1, DataType::UInt8)?;
            dest.copy(&src)?;
            assert_eq!(dest.data_type(), DataType::UInt16);
            assert_same_pixels(&dest, &src)?;
        }
        Ok(())
    }

    #[test]
    fn mirrored_self_copy() -> Result<()> {
        let mut image = ramp(&[5]);
        let mut mirrored = image.clone();
        mirrored.mirror(0)?;
        assert!(image.is_overlapping_view(&mirrored));
        image.copy(&mirrored)?;
        let values: Vec<Scalar> = (0..5).map(|x| image.sample(&[x], 0)).collect::<Result<_>>()?;
        let expected: Vec<Scalar> = [4, 3, 2, 1, 0].into_iter().map(Scalar::Int).collect();
        assert_eq!(values, expected);
        assert_eq!(mirrored.sample(&[0], 0)?, Scalar::Int(4));
        Ok(())
    }

    #[test]
    fn line_wise_copy() -> Result<()> {
        let src = ramp(&[4, 3]);
        let mut transposed = src.clone();
        transposed.swap_dimensions(0, 1)?;
        let mut dest = Image::new(&[3, 4], 1, DataType::SInt32)?;
        dest.copy(&transposed)?;
        assert_eq!(dest.sample(&[2, 1], 0)?, Scalar::Int(9));
        Ok(())
    }

    #[test]
    fn convert_in_place_and_not() -> Result<()> {
        let mut image = ramp(&[4]);
        let address = image.data().map(DataSegment::address);
        image.convert(DataType::SInt16)?;
        assert_eq!(image.data().map(DataSegment::address), address);

        let mut wide = Image::new(&[2], 1, DataType::SFloat)?;
        wide.set_sample(&[0], 0, 300.7)?;
        wide.set_sample(&[1], 0, -3.0)?;
        wide.convert(DataType::UInt8)?;
        assert_eq!(wide.sample(&[0], 0)?, Scalar::Int(255));
        assert_eq!(wide.sample(&[1], 0)?, Scalar::Int(0));

        let mut shared = Image::new(&[2], 1, DataType::Bin)?;
        let alias = shared.clone();
        shared.convert(DataType::UInt8)?;
        assert!(shared.aliases(&alias));
        shared.protect(true);
        assert_eq!(shared.convert(DataType::DFloat), Err(Error::Protected));
        Ok(())
    }

    #[test]
    fn expand_symmetric_tensor() -> Result<()> {
        let mut image = Image::raw(&[2], 3, DataType::SFloat);
        image.set_tensor(Tensor::with_shape(TensorShape::SymmetricMatrix, 2, 2)?)?;
        image.forge()?;
        image.set_pixel(&[1], &Pixel::new(vec![1.0.into(), 2.0.into(), 3.0.into()]))?;
        image.expand_tensor()?;
        assert_eq!(image.tensor_elements(), 4);
        let pixel = image.pixel(&[1])?;
        let expected: Vec<Scalar> = [1.0, 3.0, 3.0, 2.0].into_iter().map(Scalar::Real).collect();
        assert_eq!(pixel.values(), expected);
        Ok(())
    }

    #[test]
    fn byte_swap_round_trip() -> Result<()> {
        let mut image = Image::new(&[5, 8], 3, DataType::SInt16)?;
        image.fill(5)?;
        image.swap_bytes_in_sample()?;
        assert_eq!(image.sample(&[4, 7], 2)?, Scalar::Int(1280));
        image.swap_bytes_in_sample()?;
        assert_eq!(image.sample(&[4, 7], 2)?, Scalar::Int(5));

        let mut complex = Image::new(&[3], 1, DataType::SComplex)?;
        complex.fill(Scalar::Complex(1.0, -2.0))?;
        complex.swap_bytes_in_sample()?;
        complex.swap_bytes_in_sample()?;
        assert_eq!(complex.sample(&[2], 0)?, Scalar::Complex(1.0, -2.0));
        Ok(())
    }

    #[test]
    fn fill_and_mask() -> Result<()> {
        let mut image = Image::new(&[3, 2], 2, DataType::UInt8)?;
        image.fill_pixel(&Pixel::new(vec![7u8.into(), 9u8.into()]))?;
        assert_eq!(image.pixel(&[2, 1])?.values(), [Scalar::Int(7), Scalar::Int(9)]);
        assert!(image.fill_pixel(&Pixel::new(vec![Scalar::Int(1); 3])).is_err());

        let mut row = Image::new(&[3, 1], 1, DataType::Bin)?;
        row.set_sample(&[1, 0], 0, 1)?;
        image.mask(&row)?;
        assert_eq!(image.pixel(&[1, 1])?.values(), [Scalar::Int(7), Scalar::Int(9)]);
        assert_eq!(image.pixel(&[0, 1])?.values(), [Scalar::Int(0), Scalar::Int(0)]);

        let grey = Image::new(&[3, 2], 1, DataType::UInt8)?;
        assert_eq!(image.mask(&grey), Err(Error::MaskNotBinary));
        Ok(())
    }

    #[test]
    fn pad_then_crop() -> Result<()> {
        let image = ramp(&[3, 2]);
        let padded = image.pad(&[6, 5], &Pixel::from(100u16), CropLocation::Center)?;
        assert_eq!(padded.sizes(), [6, 5]);
        assert_eq!(padded.sample(&[0, 0], 0)?, Scalar::Int(100));
        let back = padded.cropped(&[3, 2], CropLocation::Center)?;
        for index in 0..6 {
            let coords = image.coordinates_of(index)?;
            assert_eq!(back.sample(&coords, 0)?, image.sample(&coords, 0)?);
        }
        assert!(image.pad(&[2, 2], &Pixel::from(0u16), CropLocation::Center).is_err());
        Ok(())
    }
}
