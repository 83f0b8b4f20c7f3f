use nd_texel::{
    copy_buffer, with_sample_type, Bin, Complex, DataSegment, DataType, Sample, SampleRun, Scalar,
};

fn run(segment: &DataSegment, data_type: DataType) -> SampleRun<'_> {
    SampleRun {
        cells: segment,
        offset: 0,
        data_type,
        stride: 1,
        tensor_stride: 1,
    }
}

#[test]
fn every_pair_keeps_small_values() {
    // Seven is representable in every type, including as a nonzero binary.
    for from in DataType::ALL {
        for into in DataType::ALL {
            let src = DataSegment::new(from.size_of() * 3);
            let dst = DataSegment::new(into.size_of() * 3);
            let (src, dst) = (run(&src, from), run(&dst, into));
            for pixel in 0..3 {
                src.set(pixel, 0, Scalar::Int(7));
            }

            copy_buffer(&src, &dst, 3, 1, None);
            let expected = if from.is_binary() || into.is_binary() { 1.0 } else { 7.0 };
            for pixel in 0..3 {
                assert_eq!(dst.get(pixel, 0).as_f64(), expected, "{from} -> {into}");
            }
        }
    }
}

#[test]
fn limits_of_integers() {
    assert_eq!(Scalar::from(-1i8).to::<u64>(), 0);
    assert_eq!(Scalar::from(u32::MAX).to::<i16>(), i16::MAX);
    assert_eq!(Scalar::from(i64::MIN).to::<i32>(), i32::MIN);
    assert_eq!(Scalar::from(255.9f32).to::<u8>(), 255);
    assert_eq!(Scalar::from(256.0f32).to::<u8>(), 255);
    assert_eq!(Scalar::from(-0.9f64).to::<u8>(), 0);
    assert_eq!(Scalar::from(f64::INFINITY).to::<i64>(), i64::MAX);
}

#[test]
fn complex_to_real_is_modulus() {
    let value = Scalar::from(Complex::new(-6.0f32, 8.0));
    assert_eq!(value.to::<f64>(), 10.0);
    assert_eq!(value.to::<i8>(), 10);
    assert_eq!(value.to::<Bin>(), Bin::TRUE);
    assert_eq!(value.to::<Complex<f64>>(), Complex::new(-6.0, 8.0));
}

#[test]
fn dispatch_matches_types() {
    for dt in DataType::ALL {
        let zero = with_sample_type!(dt, T => T::from_scalar(Scalar::Int(0)).into_scalar());
        assert!(!zero.is_nonzero(), "{dt}");
    }
}
