//! Flat morphology, the simplest client of the line framework.
//!
//! The structuring element becomes a table of neighbor offsets once. Every output pixel then takes
//! the maximum (dilation) or minimum (erosion) of the input over the neighbors that fall inside
//! the image.
use log::trace;
use nd_texel::{with_real_sample_type, Sample};

use crate::error::{Error, Result};
use crate::image::Image;
use crate::iterators::GenericJointImageIterator;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Rectangular,
    Elliptic,
    Diamond,
}

/// A flat structuring element: a shape with an extent per dimension.
///
/// A single extent applies to all dimensions. Along an extent `n` the neighbors lie at offsets
/// `-(n/2)` through `n - 1 - n/2`, negated for a mirrored element.
#[derive(Clone, Debug, PartialEq)]
pub struct StructuringElement {
    shape: Shape,
    sizes: Vec<usize>,
    mirror: bool,
}

impl StructuringElement {
    pub fn new(shape: Shape, sizes: &[usize]) -> Self {
        StructuringElement {
            shape,
            sizes: sizes.to_vec(),
            mirror: false,
        }
    }

    pub fn rectangular(sizes: &[usize]) -> Self {
        StructuringElement::new(Shape::Rectangular, sizes)
    }

    pub fn elliptic(sizes: &[usize]) -> Self {
        StructuringElement::new(Shape::Elliptic, sizes)
    }

    pub fn diamond(sizes: &[usize]) -> Self {
        StructuringElement::new(Shape::Diamond, sizes)
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirror
    }

    /// The element reflected through its origin.
    pub fn mirrored(&self) -> Self {
        StructuringElement {
            mirror: !self.mirror,
            ..self.clone()
        }
    }

    /// The coordinate offsets of all neighbors for an image of `dims` dimensions.
    pub fn neighborhood(&self, dims: usize) -> Result<Vec<Vec<isize>>> {
        let sizes = match self.sizes.len() {
            1 => vec![self.sizes[0]; dims],
            len if len == dims => self.sizes.clone(),
            len => return Err(Error::wrong_length(dims, len)),
        };
        if sizes.contains(&0) {
            return Err(Error::InvalidParameter("structuring element sizes must be positive"));
        }

        let mut neighbors = vec![Vec::with_capacity(dims)];
        for &size in &sizes {
            let low = -((size / 2) as isize);
            neighbors = neighbors
                .into_iter()
                .flat_map(|prefix| {
                    (low..low + size as isize).map(move |offset| {
                        let mut neighbor = prefix.clone();
                        neighbor.push(offset);
                        neighbor
                    })
                })
                .collect();
        }

        let radii: Vec<f64> = sizes.iter().map(|&size| size as f64 / 2.0).collect();
        neighbors.retain(|neighbor| {
            let scaled = neighbor.iter().zip(&radii).map(|(&offset, radius)| offset as f64 / radius);
            match self.shape {
                Shape::Rectangular => true,
                Shape::Elliptic => scaled.map(|x| x * x).sum::<f64>() <= 1.0,
                Shape::Diamond => scaled.map(f64::abs).sum::<f64>() <= 1.0,
            }
        });
        if self.mirror {
            neighbors.iter_mut().flatten().for_each(|offset| *offset = -*offset);
        }
        Ok(neighbors)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Dilation,
    Erosion,
}

pub fn dilation(input: &Image, se: &StructuringElement) -> Result<Image> {
    flat_filter(input, se, Polarity::Dilation)
}

pub fn erosion(input: &Image, se: &StructuringElement) -> Result<Image> {
    flat_filter(input, se, Polarity::Erosion)
}

/// A dilation followed by an erosion with the mirrored element.
pub fn closing(input: &Image, se: &StructuringElement) -> Result<Image> {
    erosion(&dilation(input, se)?, &se.mirrored())
}

/// An erosion followed by a dilation with the mirrored element.
pub fn opening(input: &Image, se: &StructuringElement) -> Result<Image> {
    dilation(&erosion(input, se)?, &se.mirrored())
}

fn flat_filter(input: &Image, se: &StructuringElement, polarity: Polarity) -> Result<Image> {
    input.check_forged()?;
    if !input.is_scalar() {
        return Err(Error::NotScalar);
    }
    let dims = input.dimensionality();
    if dims == 0 {
        return Err(Error::DimensionalityNotSupported(dims));
    }
    let data_type = input.data_type();
    if data_type.is_complex() {
        return Err(Error::DataTypeNotSupported(data_type));
    }

    let neighbors = se.neighborhood(dims)?;
    trace!("flat {:?} over {} neighbors", se.shape, neighbors.len());
    let output = input.similar()?;
    with_real_sample_type!(data_type, T => {
        filter_typed::<T>(input, &output, &neighbors, polarity)?
    }, complex => return Err(Error::DataTypeNotSupported(data_type)));
    Ok(output)
}

fn filter_typed<T: Sample + PartialOrd>(
    input: &Image,
    output: &Image,
    neighbors: &[Vec<isize>],
    polarity: Polarity,
) -> Result<()> {
    let sizes = input.sizes();
    let offsets: Vec<isize> = neighbors
        .iter()
        .map(|neighbor| neighbor.iter().zip(input.strides()).map(|(d, s)| d * s).sum())
        .collect();
    let better = |candidate: T, best: T| match polarity {
        Polarity::Dilation => candidate > best,
        Polarity::Erosion => candidate < best,
    };

    let mut it = GenericJointImageIterator::new([input, output])?;
    loop {
        let coords = it.coordinates();
        let mut best: Option<T> = None;
        for (neighbor, &offset) in neighbors.iter().zip(&offsets) {
            let inside = coords.iter().zip(neighbor).zip(sizes).all(|((&c, &d), &n)| {
                let position = c as isize + d;
                position >= 0 && position < n as isize
            });
            if !inside {
                continue;
            }
            let value = input.run(it.offset(0) + offset, 0).load::<T>(0, 0);
            if best.map_or(true, |best| better(value, best)) {
                best = Some(value);
            }
        }
        if let Some(best) = best {
            output.run(it.offset(1), 0).store(0, 0, best);
        }
        if !it.advance() {
            return Ok(());
        }
    }
}
