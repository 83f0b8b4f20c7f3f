//! Options that tune the behavior of individual operations.
use core::str::FromStr;

use crate::error::Error;

/// Where a window is placed inside a larger image when cropping or padding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CropLocation {
    /// The origin of the image maps to the center of the window, the pixel right of the middle
    /// for even sizes.
    #[default]
    Center,
    /// Like `Center`, but choosing the pixel left of the middle for even sizes, so that
    /// mirroring the image mirrors the window.
    MirrorCenter,
    TopLeft,
    BottomRight,
}

/// Whether [`crate::Image::reforge`] may keep a protected image with a different data type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AcceptDataTypeChange {
    #[default]
    DontAllow,
    DoAllow,
}

/// Which dimension of an imported buffer holds the tensor elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TensorAxis {
    /// With more than two dimensions, the first or last one if it has fewer than
    /// [`AUTO_TENSOR_LIMIT`] elements, the smaller of the two if both qualify.
    #[default]
    Auto,
    /// All dimensions are spatial.
    None,
    /// This axis, counted in the order of the buffer's shape.
    Axis(usize),
}

/// Dimensions shorter than this may be taken for a tensor by [`TensorAxis::Auto`].
pub const AUTO_TENSOR_LIMIT: usize = 10;

/// How a foreign buffer becomes an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImportOptions {
    /// Reverse the order of the buffer's axes, so that the last, fastest varying axis of a
    /// row-major array becomes dimension 0.
    pub reverse_dimensions: bool,
    pub tensor_axis: TensorAxis,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            reverse_dimensions: true,
            tensor_axis: TensorAxis::Auto,
        }
    }
}

impl CropLocation {
    /// Offset of a window of size `window` inside an extent `size`, with `window <= size`.
    pub(crate) fn offset(self, size: usize, window: usize) -> usize {
        let diff = size - window;
        let (size_odd, window_odd) = (size % 2 == 1, window % 2 == 1);
        match self {
            CropLocation::Center => diff / 2 + usize::from(!size_odd && window_odd),
            CropLocation::MirrorCenter => diff / 2 + usize::from(size_odd && !window_odd),
            CropLocation::TopLeft => 0,
            CropLocation::BottomRight => diff,
        }
    }
}

impl FromStr for CropLocation {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Error> {
        Ok(match name {
            "center" => CropLocation::Center,
            "mirror center" => CropLocation::MirrorCenter,
            "top left" => CropLocation::TopLeft,
            "bottom right" => CropLocation::BottomRight,
            _ => return Err(Error::InvalidParameter("unknown crop location")),
        })
    }
}

#[test]
fn window_offsets() {
    assert_eq!(CropLocation::Center.offset(10, 4), 3);
    assert_eq!(CropLocation::Center.offset(10, 5), 3);
    assert_eq!(CropLocation::Center.offset(9, 4), 2);
    assert_eq!(CropLocation::MirrorCenter.offset(9, 4), 3);
    assert_eq!(CropLocation::MirrorCenter.offset(10, 5), 2);
    assert_eq!(CropLocation::BottomRight.offset(10, 4), 6);
    assert_eq!("top left".parse::<CropLocation>(), Ok(CropLocation::TopLeft));
    assert!("middle".parse::<CropLocation>().is_err());
}
