// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019 The `image-rs` developers
use core::cell::Cell;
use core::{fmt, mem, ops};

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::texel::{cell_bytes, MaxAligned, MaxCell, MAX_ALIGN};

/// Memory that can back the samples of an image.
///
/// The bytes are handed out as cells: several images may view, and write to, the same memory at
/// the same time. Implement this for a foreign owner to let images borrow its memory without
/// copying; the owner is dropped together with the last [`DataSegment`] referring to it.
pub trait Storage {
    fn as_cells(&self) -> &[Cell<u8>];
}

/// Allocates and manages unsynchronized shared bytes.
///
/// Provides a utility to allocate a slice of bytes aligned to the maximally required alignment.
/// Since the elements are much larger than single bytes the inner storage will **not** have exact
/// sizes. The logical length is tracked next to it and only that many bytes are ever exposed.
pub struct CellBuffer {
    /// The backing memory, aligned by allocating it with the proper type.
    inner: Box<[MaxCell]>,
    len: usize,
}

/// A reference counted handle to the memory of one or more images.
///
/// Cloning the handle shares the memory. It is released when the last handle is dropped.
#[derive(Clone)]
pub struct DataSegment {
    inner: Rc<dyn Storage>,
}

impl CellBuffer {
    const ELEMENT: MaxCell = Cell::new(MaxAligned::ZERO);

    /// Allocate a new zeroed [`CellBuffer`] with a number of bytes.
    pub fn new(length: usize) -> Self {
        let alloc_len = Self::alloc_len(length);
        let inner: Vec<_> = (0..alloc_len).map(|_| Self::ELEMENT).collect();

        CellBuffer {
            inner: inner.into_boxed_slice(),
            len: length,
        }
    }

    /// Allocate a buffer holding a copy of some bytes.
    pub fn with_bytes(bytes: &[u8]) -> Self {
        let buffer = CellBuffer::new(bytes.len());
        for (cell, &byte) in buffer.as_cells().iter().zip(bytes) {
            cell.set(byte);
        }
        buffer
    }

    /// The logical length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Retrieve the byte capacity of the allocated storage.
    pub fn capacity(&self) -> usize {
        mem::size_of_val(&*self.inner)
    }

    /// Calculates the number of elements to have a byte buffer of requested length.
    fn alloc_len(length: usize) -> usize {
        const CHUNK_SIZE: usize = mem::size_of::<MaxAligned>();
        assert!(CHUNK_SIZE > 1);

        // We allocated enough chunks for at least the length. This can never overflow.
        length / CHUNK_SIZE + usize::from(length % CHUNK_SIZE != 0)
    }
}

impl Storage for CellBuffer {
    fn as_cells(&self) -> &[Cell<u8>] {
        &cell_bytes(&self.inner)[..self.len]
    }
}

impl Storage for Box<[Cell<u8>]> {
    fn as_cells(&self) -> &[Cell<u8>] {
        self
    }
}

impl Storage for Vec<Cell<u8>> {
    fn as_cells(&self) -> &[Cell<u8>] {
        self
    }
}

impl DataSegment {
    /// The alignment of segments allocated by this crate.
    pub const ALIGNMENT: usize = MAX_ALIGN;

    /// Allocate a new zeroed segment.
    pub fn new(length: usize) -> Self {
        DataSegment::with_storage(CellBuffer::new(length))
    }

    /// Allocate a segment holding a copy of some bytes.
    pub fn with_bytes(bytes: &[u8]) -> Self {
        DataSegment::with_storage(CellBuffer::with_bytes(bytes))
    }

    /// Share the memory of some other owner.
    pub fn with_storage<S: Storage + 'static>(storage: S) -> Self {
        DataSegment {
            inner: Rc::new(storage),
        }
    }

    pub fn as_cells(&self) -> &[Cell<u8>] {
        self.inner.as_cells()
    }

    pub fn len(&self) -> usize {
        self.as_cells().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The address of the first byte, used to compare memory ranges of segments.
    pub fn address(&self) -> usize {
        self.as_cells().as_ptr() as usize
    }

    /// Query if two handles share the same memory region.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
            || (self.address() == other.address() && self.len() == other.len())
    }

    /// The number of handles sharing this memory.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Copy out all bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_cells().iter().map(Cell::get).collect()
    }
}

impl ops::Deref for DataSegment {
    type Target = [Cell<u8>];

    fn deref(&self) -> &[Cell<u8>] {
        self.as_cells()
    }
}

impl fmt::Debug for DataSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DataSegment")
            .field("address", &self.address())
            .field("len", &self.len())
            .field("handles", &self.handle_count())
            .finish()
    }
}
