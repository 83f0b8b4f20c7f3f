//! The error type shared by all image operations.
//!
//! Every variant is one kind of failure that callers can match on. The display text is meant for
//! humans. An operation that returns an error leaves the images it was handed in their prior
//! state, unless its documentation says otherwise.
use nd_texel::DataType;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The operation needs pixel data but the image has none.
    #[error("Image is not forged")]
    NotForged,

    /// The operation changes properties that are fixed once data is allocated.
    #[error("Image is forged")]
    AlreadyForged,

    /// The image refuses to release or reallocate its data.
    #[error("Image is protected")]
    Protected,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("Illegal dimension {dim} for an image with {dimensionality} dimensions")]
    IllegalDimension { dim: usize, dimensionality: usize },

    #[error("Array parameter has the wrong number of elements: expected {expected}, got {got}")]
    ArrayParameterWrongLength { expected: usize, got: usize },

    #[error("Index out of range: {0}")]
    IndexOutOfRange(&'static str),

    /// Extents of two images, of an image and a mask, or of a pixel list disagree.
    #[error("Sizes don't match: {0}")]
    IncompatibleSizes(&'static str),

    #[error("Number of tensor elements doesn't match: expected {expected}, got {got}")]
    TensorElementsMismatch { expected: usize, got: usize },

    #[error("Data type {0} not supported")]
    DataTypeNotSupported(DataType),

    /// A structural change that no integer stride and size adjustment can express.
    #[error("Not representable: {0}")]
    NotRepresentable(&'static str),

    #[error("Not divisible: {0}")]
    NotDivisible(&'static str),

    #[error("Image is not scalar")]
    NotScalar,

    #[error("Dimensionality {0} not supported")]
    DimensionalityNotSupported(usize),

    #[error("Dimension {0} is not expanded")]
    DimensionNotExpanded(usize),

    #[error("Mask image is not binary")]
    MaskNotBinary,
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

impl Error {
    pub(crate) fn illegal_dimension(dim: usize, dimensionality: usize) -> Self {
        Error::IllegalDimension {
            dim,
            dimensionality,
        }
    }

    pub(crate) fn wrong_length(expected: usize, got: usize) -> Self {
        Error::ArrayParameterWrongLength { expected, got }
    }
}

#[test]
fn messages() {
    assert_eq!(Error::Protected.to_string(), "Image is protected");
    assert_eq!(
        Error::DataTypeNotSupported(DataType::SComplex).to_string(),
        "Data type SCOMPLEX not supported"
    );
    assert_eq!(
        Error::illegal_dimension(3, 2).to_string(),
        "Illegal dimension 3 for an image with 2 dimensions"
    );
}
