// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
#![allow(unsafe_code)]

use core::cell::Cell;
use core::cmp::{Eq, Ord, Ordering, PartialEq, PartialOrd};
use core::marker::PhantomData;
use core::{fmt, hash, mem, ptr, slice};

use num_complex::Complex;

use crate::sample::Bin;

/// Marker struct to denote a sample type.
///
/// Can be constructed only for types that have expected alignment and no byte invariants. It
/// always implements `Copy` and `Clone`, regardless of the underlying type and is zero-sized.
///
/// This is the central encapsulation of unsafety in this crate. All reads and writes of typed
/// samples out of shared byte cells go through an instance of this witness, which certifies that
/// any byte pattern of the right length is a valid value and that values can be copied out
/// byte-by-byte.
pub struct Texel<P: ?Sized>(PhantomData<P>);

/// Describes a type which can represent a `Texel` and for which this is statically known.
pub trait AsTexel {
    /// Get the texel struct for this type.
    fn texel() -> Texel<Self>;
}

macro_rules! def_max_align {
    (
        $($($arch:literal),* = $num:literal),*
    ) => {
        $(
            /// A byte-like-type that is aligned to the required max alignment.
            ///
            /// This type does not contain padding. Generally, the alignment and size requirement
            /// is kept small to avoid overhead.
            #[derive(Clone, Copy)]
            #[cfg(
                any($(target_arch = $arch),*),
            )]
            #[repr(align($num))]
            #[repr(C)]
            pub struct MaxAligned(pub(crate) [u8; $num]);

            #[cfg(
                any($(target_arch = $arch),*),
            )]
            pub(crate) const MAX_ALIGN: usize = $num;
        )*


        #[cfg(
            not(any(
                $(any($(target_arch = $arch),*)),*
            )),
        )]
        #[derive(Clone, Copy)]
        #[repr(align(8))]
        pub struct MaxAligned(pub(crate) [u8; 8]);

        #[cfg(
            not(any(
                $(any($(target_arch = $arch),*)),*
            )),
        )]
        pub(crate) const MAX_ALIGN: usize = 8;
    }
}

def_max_align! {
    "x86", "x86_64" = 32,
    "arm" = 16,
    "aarch64" = 16,
    "wasm32" = 16
}

impl MaxAligned {
    pub(crate) const ZERO: Self = MaxAligned([0; MAX_ALIGN]);
}

pub(crate) type MaxCell = Cell<MaxAligned>;

pub(crate) mod constants {
    use super::{AsTexel, Bin, Complex, Texel};

    macro_rules! constant_texel {
        ($(($name:ident, $type:ty)),*) => {
            $(pub const $name: Texel<$type> = Texel(core::marker::PhantomData) ;
              impl AsTexel for $type {
                  fn texel() -> Texel<Self> {
                      const _: () = {
                          assert!(Texel::<$type>::check_invariants());
                      };

                      $name
                  }
              }
              )*
        }
    }

    constant_texel!(
        (BIN, Bin),
        (I8, i8),
        (U8, u8),
        (I16, i16),
        (U16, u16),
        (I32, i32),
        (U32, u32),
        (I64, i64),
        (U64, u64),
        (F32, f32),
        (F64, f64),
        (C32, Complex<f32>),
        (C64, Complex<f64>)
    );
}

impl<P: bytemuck::Pod> Texel<P> {
    /// Try to construct an instance of the marker.
    ///
    /// This requires an alignment of at most `MAX_ALIGN`, a non-zero size and no drop glue.
    pub fn for_type() -> Option<Self> {
        if Texel::<P>::check_invariants() {
            Some(Texel(PhantomData))
        } else {
            None
        }
    }
}

impl<P> Texel<P> {
    /// Note this isn't exhaustive. Indeed, we have no way to check for padding.
    pub(crate) const fn check_invariants() -> bool {
        mem::align_of::<P>() <= MAX_ALIGN && mem::size_of::<P>() > 0 && !mem::needs_drop::<P>()
    }

    /// Proxy of `core::mem::align_of`.
    pub const fn align(self) -> usize {
        mem::align_of::<P>()
    }

    /// Proxy of `core::mem::size_of`.
    pub const fn size(self) -> usize {
        mem::size_of::<P>()
    }

    /// Read one value from the start of some shared bytes.
    ///
    /// The bytes need not be aligned.
    ///
    /// # Panics
    ///
    /// When fewer than `self.size()` bytes are passed.
    pub fn load_cell(self, bytes: &[Cell<u8>]) -> P {
        let bytes = &bytes[..self.size()];
        // SAFETY:
        // - the range of `size` bytes is in bounds, checked by the slice index above.
        // - any byte pattern is a valid `P`, certified by `self`.
        // - no reference into the cells can exist while we read, `Cell` is not `Sync` and never
        //   hands out references to its content.
        unsafe { ptr::read_unaligned(bytes.as_ptr() as *const P) }
    }

    /// Write one value to the start of some shared bytes.
    ///
    /// # Panics
    ///
    /// When fewer than `self.size()` bytes are passed.
    pub fn store_cell(self, bytes: &[Cell<u8>], value: P) {
        let bytes = &bytes[..self.size()];
        // SAFETY:
        // - the range is in bounds, see above.
        // - `Cell<u8>` has the layout of `UnsafeCell<u8>`, writing through a shared reference is
        //   permitted.
        // - the value is `Copy`-like by the witness, no drop of the previous content needed.
        unsafe { ptr::write_unaligned(bytes.as_ptr() as *mut P, value) }
    }
}

/// View the backing memory of a buffer as individual byte cells.
pub(crate) fn cell_bytes(buffer: &[MaxCell]) -> &[Cell<u8>] {
    // SAFETY:
    // * `MaxAligned` is a byte array without padding, every byte is initialized.
    // * `Cell<T>` has the same memory layout as `T`.
    // * lifetime is not changed and the byte length covers exactly the same memory.
    unsafe { slice::from_raw_parts(buffer.as_ptr() as *const Cell<u8>, mem::size_of_val(buffer)) }
}

/// Copy bytes between shared cells, which may overlap.
///
/// # Panics
///
/// When the two slices differ in length.
pub fn copy_cells(src: &[Cell<u8>], dst: &[Cell<u8>]) {
    assert_eq!(src.len(), dst.len(), "copying between byte ranges of different length");
    // SAFETY:
    // * both ranges are valid for their length, which is the same.
    // * `ptr::copy` has memmove semantics so overlapping ranges are fine.
    // * writing through the shared `Cell` reference is permitted by its interior mutability.
    unsafe { ptr::copy(src.as_ptr() as *const u8, dst.as_ptr() as *mut u8, src.len()) }
}

/// This is a pure marker type.
impl<P> Clone for Texel<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> PartialEq for Texel<P> {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl<P> Eq for Texel<P> {}

impl<P> PartialOrd for Texel<P> {
    fn partial_cmp(&self, _: &Self) -> Option<Ordering> {
        Some(Ordering::Equal)
    }
}

impl<P> Ord for Texel<P> {
    fn cmp(&self, _: &Self) -> Ordering {
        Ordering::Equal
    }
}

impl<P> Copy for Texel<P> {}

impl<P> fmt::Debug for Texel<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Texel")
            .field("size", &self.size())
            .field("align", &self.align())
            .finish()
    }
}

impl<P> hash::Hash for Texel<P> {
    fn hash<H: hash::Hasher>(&self, _: &mut H) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_store_unaligned() {
        let cells: [Cell<u8>; 9] = Default::default();
        let texel = u32::texel();
        texel.store_cell(&cells[1..], 0x1234_5678);
        assert_eq!(texel.load_cell(&cells[1..]), 0x1234_5678);
        assert_eq!(cells[0].get(), 0);
        assert_eq!(u8::texel().load_cell(&cells[1..]), 0x1234_5678u32.to_ne_bytes()[0]);
    }

    #[test]
    fn overlapping_copy() {
        let cells: [Cell<u8>; 6] = [1, 2, 3, 4, 5, 6].map(Cell::new);
        copy_cells(&cells[0..4], &cells[2..6]);
        let bytes: [u8; 6] = core::array::from_fn(|i| cells[i].get());
        assert_eq!(bytes, [1, 2, 1, 2, 3, 4]);
    }

    #[test]
    fn complex_is_texel() {
        assert_eq!(Complex::<f64>::texel().size(), 16);
        assert_eq!(Bin::texel().size(), 1);
        assert!(Texel::<[u64; 2]>::for_type().is_some());
    }
}
