//! The closed set of sample types and the saturating conversion between them.
use core::{fmt, str};

use num_complex::Complex;

use crate::texel::AsTexel;

/// The scalar kind of every sample in an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    Bin,
    UInt8,
    SInt8,
    UInt16,
    SInt16,
    UInt32,
    SInt32,
    UInt64,
    SInt64,
    SFloat,
    DFloat,
    SComplex,
    DComplex,
}

/// A binary sample, stored in one byte. Any nonzero byte is `true`.
#[derive(Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub struct Bin(pub u8);

/// A type-erased sample value, wide enough to carry any sample losslessly.
///
/// This is the intermediate representation through which [`Sample::from_scalar`] performs the
/// saturating conversion between any two sample types.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    Int(i128),
    Real(f64),
    Complex(f64, f64),
}

/// A statically typed sample, one per [`DataType`].
pub trait Sample: AsTexel + Copy + fmt::Debug + PartialEq + 'static {
    const DATA_TYPE: DataType;

    fn into_scalar(self) -> Scalar;

    /// Convert with saturation, truncating floating point values toward zero.
    fn from_scalar(value: Scalar) -> Self;
}

/// Error returned when parsing a [`DataType`] from an unknown name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseDataTypeError {
    _inner: (),
}

impl DataType {
    pub const ALL: [DataType; 13] = [
        DataType::Bin,
        DataType::UInt8,
        DataType::SInt8,
        DataType::UInt16,
        DataType::SInt16,
        DataType::UInt32,
        DataType::SInt32,
        DataType::UInt64,
        DataType::SInt64,
        DataType::SFloat,
        DataType::DFloat,
        DataType::SComplex,
        DataType::DComplex,
    ];

    /// The data type of a statically known sample.
    pub fn of<T: Sample>() -> Self {
        T::DATA_TYPE
    }

    /// Size of one sample in bytes.
    pub const fn size_of(self) -> usize {
        match self {
            DataType::Bin | DataType::UInt8 | DataType::SInt8 => 1,
            DataType::UInt16 | DataType::SInt16 => 2,
            DataType::UInt32 | DataType::SInt32 | DataType::SFloat => 4,
            DataType::UInt64 | DataType::SInt64 | DataType::DFloat | DataType::SComplex => 8,
            DataType::DComplex => 16,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            DataType::Bin => "BIN",
            DataType::UInt8 => "UINT8",
            DataType::SInt8 => "SINT8",
            DataType::UInt16 => "UINT16",
            DataType::SInt16 => "SINT16",
            DataType::UInt32 => "UINT32",
            DataType::SInt32 => "SINT32",
            DataType::UInt64 => "UINT64",
            DataType::SInt64 => "SINT64",
            DataType::SFloat => "SFLOAT",
            DataType::DFloat => "DFLOAT",
            DataType::SComplex => "SCOMPLEX",
            DataType::DComplex => "DCOMPLEX",
        }
    }

    pub const fn is_binary(self) -> bool {
        matches!(self, DataType::Bin)
    }

    pub const fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64
        )
    }

    pub const fn is_signed_integer(self) -> bool {
        matches!(
            self,
            DataType::SInt8 | DataType::SInt16 | DataType::SInt32 | DataType::SInt64
        )
    }

    pub const fn is_integer(self) -> bool {
        self.is_unsigned_integer() || self.is_signed_integer()
    }

    pub const fn is_float(self) -> bool {
        matches!(self, DataType::SFloat | DataType::DFloat)
    }

    pub const fn is_complex(self) -> bool {
        matches!(self, DataType::SComplex | DataType::DComplex)
    }

    /// Binary, integer and float types.
    pub const fn is_real(self) -> bool {
        !self.is_complex()
    }

    /// Float and complex types, the ones that algorithms produce by default.
    pub const fn is_flex(self) -> bool {
        self.is_float() || self.is_complex()
    }

    pub const fn is_flex_bin(self) -> bool {
        self.is_flex() || self.is_binary()
    }

    /// Binary and unsigned integer types.
    pub const fn is_unsigned(self) -> bool {
        self.is_binary() || self.is_unsigned_integer()
    }

    /// Signed integer, float and complex types.
    pub const fn is_signed(self) -> bool {
        !self.is_unsigned()
    }

    /// The type of one component, the float type for a complex type.
    pub const fn real(self) -> DataType {
        match self {
            DataType::SComplex => DataType::SFloat,
            DataType::DComplex => DataType::DFloat,
            other => other,
        }
    }

    /// The signed integer type of the same size, if there is one.
    pub const fn to_signed_integer(self) -> Option<DataType> {
        Some(match self.size_of() {
            1 => DataType::SInt8,
            2 => DataType::SInt16,
            4 => DataType::SInt32,
            8 => DataType::SInt64,
            _ => return None,
        })
    }

    /// The unsigned integer type of the same size, if there is one.
    pub const fn to_unsigned_integer(self) -> Option<DataType> {
        Some(match self.size_of() {
            1 => DataType::UInt8,
            2 => DataType::UInt16,
            4 => DataType::UInt32,
            8 => DataType::UInt64,
            _ => return None,
        })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl str::FromStr for DataType {
    type Err = ParseDataTypeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|dt| dt.name().eq_ignore_ascii_case(name))
            .ok_or(ParseDataTypeError { _inner: () })
    }
}

impl fmt::Display for ParseDataTypeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("unknown data type name")
    }
}

impl Bin {
    pub const FALSE: Bin = Bin(0);
    pub const TRUE: Bin = Bin(1);

    pub const fn is_set(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for Bin {
    fn from(val: bool) -> Bin {
        Bin(val as u8)
    }
}

impl From<Bin> for bool {
    fn from(val: Bin) -> bool {
        val.is_set()
    }
}

impl PartialEq for Bin {
    fn eq(&self, other: &Bin) -> bool {
        self.is_set() == other.is_set()
    }
}

impl Eq for Bin {}

impl PartialOrd for Bin {
    fn partial_cmp(&self, other: &Bin) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bin {
    fn cmp(&self, other: &Bin) -> core::cmp::Ordering {
        self.is_set().cmp(&other.is_set())
    }
}

impl Scalar {
    /// Convert into a concrete sample type, saturating.
    pub fn to<T: Sample>(self) -> T {
        T::from_scalar(self)
    }

    pub fn is_nonzero(self) -> bool {
        match self {
            Scalar::Int(i) => i != 0,
            Scalar::Real(f) => f != 0.0,
            Scalar::Complex(re, im) => re != 0.0 || im != 0.0,
        }
    }

    /// The real value, or the modulus of a complex value.
    pub fn as_f64(self) -> f64 {
        match self {
            Scalar::Int(i) => i as f64,
            Scalar::Real(f) => f,
            Scalar::Complex(re, im) => libm::hypot(re, im),
        }
    }

    pub fn negate(self) -> Scalar {
        match self {
            Scalar::Int(i) => Scalar::Int(-i),
            Scalar::Real(f) => Scalar::Real(-f),
            Scalar::Complex(re, im) => Scalar::Complex(-re, -im),
        }
    }

    fn to_integer(self, min: i128, max: i128) -> i128 {
        match self {
            Scalar::Int(i) => i.clamp(min, max),
            // Float to int casts truncate and saturate, mapping NaN to zero.
            Scalar::Real(_) | Scalar::Complex(..) => (self.as_f64() as i128).clamp(min, max),
        }
    }

    fn to_f32(self) -> f32 {
        clamp_f32(self.as_f64())
    }
}

fn clamp_f32(val: f64) -> f32 {
    if val.is_finite() {
        val.clamp(-(f32::MAX as f64), f32::MAX as f64) as f32
    } else {
        val as f32
    }
}

macro_rules! integer_sample {
    ($(($type:ty, $dt:ident)),*) => {
        $(
            impl Sample for $type {
                const DATA_TYPE: DataType = DataType::$dt;

                fn into_scalar(self) -> Scalar {
                    Scalar::Int(self as i128)
                }

                fn from_scalar(value: Scalar) -> Self {
                    value.to_integer(<$type>::MIN as i128, <$type>::MAX as i128) as $type
                }
            }

            impl From<$type> for Scalar {
                fn from(val: $type) -> Scalar {
                    val.into_scalar()
                }
            }
        )*
    };
}

integer_sample!(
    (u8, UInt8),
    (i8, SInt8),
    (u16, UInt16),
    (i16, SInt16),
    (u32, UInt32),
    (i32, SInt32),
    (u64, UInt64),
    (i64, SInt64)
);

impl Sample for Bin {
    const DATA_TYPE: DataType = DataType::Bin;

    fn into_scalar(self) -> Scalar {
        Scalar::Int(self.is_set() as i128)
    }

    fn from_scalar(value: Scalar) -> Self {
        Bin::from(value.is_nonzero())
    }
}

impl Sample for f32 {
    const DATA_TYPE: DataType = DataType::SFloat;

    fn into_scalar(self) -> Scalar {
        Scalar::Real(self as f64)
    }

    fn from_scalar(value: Scalar) -> Self {
        value.to_f32()
    }
}

impl Sample for f64 {
    const DATA_TYPE: DataType = DataType::DFloat;

    fn into_scalar(self) -> Scalar {
        Scalar::Real(self)
    }

    fn from_scalar(value: Scalar) -> Self {
        value.as_f64()
    }
}

impl Sample for Complex<f32> {
    const DATA_TYPE: DataType = DataType::SComplex;

    fn into_scalar(self) -> Scalar {
        Scalar::Complex(self.re as f64, self.im as f64)
    }

    fn from_scalar(value: Scalar) -> Self {
        match value {
            Scalar::Complex(re, im) => Complex::new(clamp_f32(re), clamp_f32(im)),
            other => Complex::new(other.to_f32(), 0.0),
        }
    }
}

impl Sample for Complex<f64> {
    const DATA_TYPE: DataType = DataType::DComplex;

    fn into_scalar(self) -> Scalar {
        Scalar::Complex(self.re, self.im)
    }

    fn from_scalar(value: Scalar) -> Self {
        match value {
            Scalar::Complex(re, im) => Complex::new(re, im),
            other => Complex::new(other.as_f64(), 0.0),
        }
    }
}

macro_rules! scalar_from {
    ($($type:ty),*) => {
        $(
            impl From<$type> for Scalar {
                fn from(val: $type) -> Scalar {
                    val.into_scalar()
                }
            }
        )*
    };
}

scalar_from!(Bin, f32, f64, Complex<f32>, Complex<f64>);

impl From<bool> for Scalar {
    fn from(val: bool) -> Scalar {
        Scalar::Int(val as i128)
    }
}

/// Run an expression with a type alias bound to the sample type of a [`DataType`].
///
/// ```
/// use nd_texel::{with_sample_type, DataType};
/// let size = with_sample_type!(DataType::SInt16, T => core::mem::size_of::<T>());
/// assert_eq!(size, 2);
/// ```
#[macro_export]
macro_rules! with_sample_type {
    ($dt:expr, $t:ident => $body:expr) => {
        match $dt {
            $crate::DataType::Bin => { type $t = $crate::Bin; $body }
            $crate::DataType::UInt8 => { type $t = u8; $body }
            $crate::DataType::SInt8 => { type $t = i8; $body }
            $crate::DataType::UInt16 => { type $t = u16; $body }
            $crate::DataType::SInt16 => { type $t = i16; $body }
            $crate::DataType::UInt32 => { type $t = u32; $body }
            $crate::DataType::SInt32 => { type $t = i32; $body }
            $crate::DataType::UInt64 => { type $t = u64; $body }
            $crate::DataType::SInt64 => { type $t = i64; $body }
            $crate::DataType::SFloat => { type $t = f32; $body }
            $crate::DataType::DFloat => { type $t = f64; $body }
            $crate::DataType::SComplex => { type $t = $crate::Complex<f32>; $body }
            $crate::DataType::DComplex => { type $t = $crate::Complex<f64>; $body }
        }
    };
}

/// Like [`with_sample_type`] but only for ordered, non-complex types.
///
/// Complex types evaluate the `complex` fallback expression instead.
#[macro_export]
macro_rules! with_real_sample_type {
    ($dt:expr, $t:ident => $body:expr, complex => $fallback:expr) => {
        match $dt {
            $crate::DataType::SComplex | $crate::DataType::DComplex => $fallback,
            $crate::DataType::Bin => { type $t = $crate::Bin; $body }
            $crate::DataType::UInt8 => { type $t = u8; $body }
            $crate::DataType::SInt8 => { type $t = i8; $body }
            $crate::DataType::UInt16 => { type $t = u16; $body }
            $crate::DataType::SInt16 => { type $t = i16; $body }
            $crate::DataType::UInt32 => { type $t = u32; $body }
            $crate::DataType::SInt32 => { type $t = i32; $body }
            $crate::DataType::UInt64 => { type $t = u64; $body }
            $crate::DataType::SInt64 => { type $t = i64; $body }
            $crate::DataType::SFloat => { type $t = f32; $body }
            $crate::DataType::DFloat => { type $t = f64; $body }
        }
    };
}

#[test]
fn saturation() {
    assert_eq!(Scalar::from(300u16).to::<u8>(), 255);
    assert_eq!(Scalar::from(-4i32).to::<u32>(), 0);
    assert_eq!(Scalar::from(-3.7f64).to::<i8>(), -3);
    assert_eq!(Scalar::from(1e10f64).to::<i16>(), i16::MAX);
    assert_eq!(Scalar::from(f64::NAN).to::<u8>(), 0);
    assert_eq!(Scalar::from(u64::MAX).to::<i64>(), i64::MAX);
    assert_eq!(Scalar::from(1e300f64).to::<f32>(), f32::MAX);
}

#[test]
fn binary_and_complex() {
    assert_eq!(Scalar::from(7u8).to::<Bin>(), Bin::TRUE);
    assert_eq!(Scalar::from(0.0f32).to::<Bin>(), Bin::FALSE);
    assert_eq!(Scalar::from(Bin(255)).to::<u8>(), 1);
    assert_eq!(Scalar::from(Complex::new(3.0f64, 4.0)).to::<u8>(), 5);
    assert_eq!(
        Scalar::from(2u8).to::<Complex<f32>>(),
        Complex::new(2.0f32, 0.0)
    );
}

#[test]
fn names_and_classes() {
    for dt in DataType::ALL {
        assert_eq!(dt.name().parse::<DataType>(), Ok(dt));
        assert_eq!(with_sample_type!(dt, T => T::DATA_TYPE), dt);
        assert_eq!(with_sample_type!(dt, T => core::mem::size_of::<T>()), dt.size_of());
    }
    assert_eq!("sfloat".parse::<DataType>(), Ok(DataType::SFloat));
    assert!("float".parse::<DataType>().is_err());
    assert!(DataType::Bin.is_unsigned() && DataType::Bin.is_flex_bin());
    assert!(DataType::SComplex.is_signed() && DataType::SComplex.is_flex());
    assert_eq!(DataType::DComplex.real(), DataType::DFloat);
    assert_eq!(DataType::SFloat.to_unsigned_integer(), Some(DataType::UInt32));
    assert_eq!(DataType::DComplex.to_signed_integer(), None);
}
