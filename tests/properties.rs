//! Round-trip properties of view manipulations over random images.
use nd_image::{CropLocation, DataType, Image, Pixel, Scalar};
use proptest::prelude::*;

// 1-4D images with small extents, filled with arbitrary samples.
fn image_strategy() -> impl Strategy<Value = (Vec<usize>, Vec<u16>)> {
    prop::collection::vec(1usize..6, 1..=4).prop_flat_map(|sizes| {
        let count: usize = sizes.iter().product();
        (Just(sizes), prop::collection::vec(any::<u16>(), count))
    })
}

fn permuted_strategy() -> impl Strategy<Value = (Vec<usize>, Vec<u16>, Vec<usize>)> {
    image_strategy().prop_flat_map(|(sizes, samples)| {
        let order: Vec<usize> = (0..sizes.len()).collect();
        (Just(sizes), Just(samples), Just(order).prop_shuffle())
    })
}

/// All samples in linear index order.
fn samples(image: &Image) -> Vec<u16> {
    (0..image.number_of_pixels())
        .map(|index| {
            let coords = image.coordinates_of(index).unwrap();
            image.sample_as::<u16>(&coords, 0).unwrap()
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_permute_then_inverse((sizes, data, order) in permuted_strategy()) {
        let image = Image::from_samples(&sizes, &data).unwrap();
        let mut inverse = vec![0; order.len()];
        for (position, &dim) in order.iter().enumerate() {
            inverse[dim] = position;
        }

        let mut view = image.clone();
        view.permute_dimensions(&order).unwrap();
        let permuted: Vec<usize> = order.iter().map(|&dim| sizes[dim]).collect();
        prop_assert_eq!(view.sizes(), permuted.as_slice());
        view.permute_dimensions(&inverse).unwrap();

        prop_assert_eq!(view.sizes(), image.sizes());
        prop_assert_eq!(view.strides(), image.strides());
        prop_assert_eq!(samples(&view), data);
    }

    #[test]
    fn prop_mirror_twice((sizes, data) in image_strategy()) {
        let image = Image::from_samples(&sizes, &data).unwrap();
        let mut view = image.clone();
        for dim in 0..sizes.len() {
            view.mirror(dim).unwrap();
        }
        for dim in 0..sizes.len() {
            view.mirror(dim).unwrap();
        }
        prop_assert_eq!(view.strides(), image.strides());
        prop_assert_eq!(view.origin(), image.origin());
        prop_assert_eq!(samples(&view), data);
    }

    #[test]
    fn prop_swap_bytes_twice((sizes, data) in image_strategy()) {
        let mut image = Image::from_samples(&sizes, &data).unwrap();
        image.swap_bytes_in_sample().unwrap();
        let swapped: Vec<u16> = data.iter().map(|sample| sample.swap_bytes()).collect();
        prop_assert_eq!(samples(&image), swapped);
        image.swap_bytes_in_sample().unwrap();
        prop_assert_eq!(samples(&image), data);
    }

    #[test]
    fn prop_standardize_is_idempotent((sizes, data, order) in permuted_strategy()) {
        let mut view = Image::from_samples(&sizes, &data).unwrap();
        view.permute_dimensions(&order).unwrap();
        view.mirror(0).unwrap();

        view.standardize_strides().unwrap();
        let once = (view.sizes().to_vec(), view.strides().to_vec(), view.origin());
        prop_assert!(view.strides().iter().all(|&stride| stride >= 0));
        view.standardize_strides().unwrap();
        prop_assert_eq!((view.sizes().to_vec(), view.strides().to_vec(), view.origin()), once);
    }

    #[test]
    fn prop_flatten_keeps_samples((sizes, data, order) in permuted_strategy()) {
        let mut view = Image::from_samples(&sizes, &data).unwrap();
        view.permute_dimensions(&order).unwrap();
        view.mirror(0).unwrap();
        view.flatten().unwrap();

        prop_assert_eq!(view.dimensionality(), 1);
        prop_assert_eq!(view.number_of_pixels(), data.len());
        let mut flat = samples(&view);
        let mut expected = data;
        flat.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(flat, expected);
    }

    #[test]
    fn prop_pad_then_crop(
        (sizes, data) in image_strategy(),
        margins in prop::collection::vec(0usize..4, 4),
    ) {
        let image = Image::from_samples(&sizes, &data).unwrap();
        let padded_sizes: Vec<usize> =
            sizes.iter().zip(&margins).map(|(size, margin)| size + margin).collect();
        let zero = Pixel::new(vec![Scalar::Int(0)]);
        let padded = image.pad(&padded_sizes, &zero, CropLocation::Center).unwrap();
        prop_assert_eq!(padded.data_type(), DataType::UInt16);

        let cropped = padded.cropped(&sizes, CropLocation::Center).unwrap();
        prop_assert_eq!(samples(&cropped), data);
    }
}
