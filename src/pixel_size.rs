//! Physical extent of a pixel along each dimension.
use core::fmt;

/// A magnitude with its units, such as `0.5 µm`.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicalQuantity {
    pub magnitude: f64,
    pub units: String,
}

/// The pixel size of an image.
///
/// Holds one quantity per dimension, though it may hold fewer: the last entry repeats for all
/// higher dimensions. An empty pixel size is not defined and reads as one pixel in every
/// dimension.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PixelSize {
    size: Vec<PhysicalQuantity>,
}

impl PhysicalQuantity {
    pub fn new(magnitude: f64, units: impl Into<String>) -> Self {
        PhysicalQuantity {
            magnitude,
            units: units.into(),
        }
    }

    /// The dimensionless unit of one pixel.
    pub fn pixel() -> Self {
        PhysicalQuantity::new(1.0, "px")
    }
}

impl fmt::Display for PhysicalQuantity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.units)
    }
}

impl PixelSize {
    pub fn new(size: Vec<PhysicalQuantity>) -> Self {
        PixelSize { size }
    }

    pub fn isotropic(size: PhysicalQuantity) -> Self {
        PixelSize { size: vec![size] }
    }

    pub fn is_defined(&self) -> bool {
        !self.size.is_empty()
    }

    pub fn clear(&mut self) {
        self.size.clear();
    }

    pub fn get(&self, dim: usize) -> PhysicalQuantity {
        match self.size.get(dim).or(self.size.last()) {
            Some(size) => size.clone(),
            None => PhysicalQuantity::pixel(),
        }
    }

    pub fn is_isotropic(&self) -> bool {
        self.size.windows(2).all(|pair| pair[0] == pair[1])
    }

    /// Make the repetition of the last entry explicit up to `dims` entries.
    fn expand(&mut self, dims: usize) {
        if let Some(last) = self.size.last().cloned() {
            if self.size.len() < dims {
                self.size.resize(dims, last);
            }
        }
    }

    /// Drop trailing entries that equal their predecessor.
    fn compact(&mut self) {
        while self.size.len() > 1 && self.size[self.size.len() - 1] == self.size[self.size.len() - 2]
        {
            self.size.pop();
        }
    }

    /// Reorder entries such that new dimension `i` takes the size of old dimension `order[i]`.
    pub fn permute(&mut self, order: &[usize]) {
        if self.is_isotropic() {
            return;
        }
        let dims = order.iter().copied().max().map_or(0, |max| max + 1);
        self.expand(dims.max(order.len()));
        self.size = order.iter().map(|&dim| self.get(dim)).collect();
        self.compact();
    }

    pub fn swap(&mut self, dim1: usize, dim2: usize) {
        if self.is_isotropic() {
            return;
        }
        self.expand(dim1.max(dim2) + 1);
        self.size.swap(dim1, dim2);
        self.compact();
    }

    /// Insert a dimension, with a size of one pixel.
    pub fn insert(&mut self, dim: usize) {
        if !self.is_defined() || self.is_isotropic() {
            return;
        }
        self.expand(dim + 1);
        self.size.insert(dim, PhysicalQuantity::pixel());
        self.compact();
    }

    /// Insert a copy of the size of `dim` right after it, as when splitting that dimension.
    pub fn duplicate(&mut self, dim: usize) {
        if self.is_isotropic() {
            return;
        }
        self.expand(dim + 1);
        let size = self.get(dim);
        self.size.insert(dim + 1, size);
        self.compact();
    }

    pub fn erase(&mut self, dim: usize) {
        if self.is_isotropic() {
            return;
        }
        self.expand(dim + 2);
        self.size.remove(dim);
        self.compact();
    }
}
