use core::cell::Cell;

use nd_texel::{AsTexel, Bin, Complex, DataSegment, Texel};

#[test]
fn witnesses() {
    assert_eq!(u8::texel().size(), 1);
    assert_eq!(u16::texel().align(), 2);
    assert_eq!(Complex::<f32>::texel().size(), 8);
    assert_eq!(Bin::texel().align(), 1);

    assert!(Texel::<[u8; 3]>::for_type().is_some());
    assert!(Texel::<()>::for_type().is_none());
}

#[test]
fn typed_access_through_segment() {
    let segment = DataSegment::new(24);
    let texel = f64::texel();
    texel.store_cell(&segment[8..], 0.25);
    texel.store_cell(&segment[3..], -1.0);
    assert_eq!(texel.load_cell(&segment[3..]), -1.0);

    let alias = segment.clone();
    let complex = Complex::<f32>::texel();
    complex.store_cell(&alias[16..], Complex::new(1.0, 2.0));
    assert_eq!(complex.load_cell(&segment[16..]), Complex::new(1.0, 2.0));
}

#[test]
fn segments_from_foreign_owners() {
    let owned: Box<[Cell<u8>]> = vec![Cell::new(0u8); 4].into_boxed_slice();
    let segment = DataSegment::with_storage(owned);
    u32::texel().store_cell(&segment, u32::from_ne_bytes([1, 2, 3, 4]));
    assert_eq!(segment.to_vec(), [1, 2, 3, 4]);
}
