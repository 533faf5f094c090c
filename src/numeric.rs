//! Typed numeric arrays carried by octet-stream tokens.
//!
//! A numeric array token stores the raw element bytes of the array (native
//! byte order) and names the element type in its `type` parameter. The
//! byte sequence alone cannot tell a `Float32Array` from an `Int32Array` of
//! the same length, so the tag travels with the data and is required when
//! decoding.
//!
//! ## Examples
//!
//! ```rust
//! use serde_dataref::{NumericArray, NumericKind};
//!
//! let array = NumericArray::Int16(vec![-1, 0, i16::MAX]);
//! assert_eq!(array.kind(), NumericKind::Int16);
//! assert_eq!(array.kind().tag(), "Int16Array");
//!
//! let bytes = array.to_bytes();
//! assert_eq!(bytes.len(), 6);
//!
//! let back = NumericArray::from_bytes(NumericKind::Int16, &bytes).unwrap();
//! assert_eq!(back, array);
//! ```

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// The closed set of numeric array element types.
///
/// Tags follow the names of the JavaScript typed arrays so tokens stay
/// interchangeable with browser producers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumericKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    BigInt64,
    BigUint64,
    Float32,
    Float64,
}

impl NumericKind {
    /// Every supported kind, in declaration order.
    pub const ALL: [NumericKind; 11] = [
        NumericKind::Int8,
        NumericKind::Uint8,
        NumericKind::Uint8Clamped,
        NumericKind::Int16,
        NumericKind::Uint16,
        NumericKind::Int32,
        NumericKind::Uint32,
        NumericKind::BigInt64,
        NumericKind::BigUint64,
        NumericKind::Float32,
        NumericKind::Float64,
    ];

    /// Returns the `type` parameter value for this kind.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            NumericKind::Int8 => "Int8Array",
            NumericKind::Uint8 => "Uint8Array",
            NumericKind::Uint8Clamped => "Uint8ClampedArray",
            NumericKind::Int16 => "Int16Array",
            NumericKind::Uint16 => "Uint16Array",
            NumericKind::Int32 => "Int32Array",
            NumericKind::Uint32 => "Uint32Array",
            NumericKind::BigInt64 => "BigInt64Array",
            NumericKind::BigUint64 => "BigUint64Array",
            NumericKind::Float32 => "Float32Array",
            NumericKind::Float64 => "Float64Array",
        }
    }

    /// Looks up a kind by its tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        NumericKind::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Returns the width of one element in bytes.
    #[must_use]
    pub const fn element_size(self) -> usize {
        match self {
            NumericKind::Int8 | NumericKind::Uint8 | NumericKind::Uint8Clamped => 1,
            NumericKind::Int16 | NumericKind::Uint16 => 2,
            NumericKind::Int32 | NumericKind::Uint32 | NumericKind::Float32 => 4,
            NumericKind::BigInt64 | NumericKind::BigUint64 | NumericKind::Float64 => 8,
        }
    }

    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, NumericKind::Float32 | NumericKind::Float64)
    }

    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            NumericKind::Int8
                | NumericKind::Int16
                | NumericKind::Int32
                | NumericKind::BigInt64
                | NumericKind::Float32
                | NumericKind::Float64
        )
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for NumericKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        NumericKind::from_tag(s).ok_or_else(|| Error::unsupported_variant(s))
    }
}

/// A typed array of numbers.
#[derive(Clone, Debug, PartialEq)]
pub enum NumericArray {
    Int8(Vec<i8>),
    Uint8(Vec<u8>),
    Uint8Clamped(Vec<u8>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
    BigInt64(Vec<i64>),
    BigUint64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

macro_rules! to_ne_bytes {
    ($values:expr) => {
        $values.iter().flat_map(|v| v.to_ne_bytes()).collect()
    };
}

macro_rules! from_ne_bytes {
    ($bytes:expr, $ty:ty) => {
        $bytes
            .chunks_exact(std::mem::size_of::<$ty>())
            .map(|chunk| {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(chunk);
                <$ty>::from_ne_bytes(raw)
            })
            .collect()
    };
}

impl NumericArray {
    /// Builds a `Uint8ClampedArray` from floating-point samples.
    ///
    /// Values saturate to `0..=255` and round half to even; NaN becomes 0.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_dataref::NumericArray;
    ///
    /// let clamped = NumericArray::clamped_from_f64(&[-5.0, 0.5, 1.5, 254.7, 300.0, f64::NAN]);
    /// assert_eq!(clamped, NumericArray::Uint8Clamped(vec![0, 0, 2, 255, 255, 0]));
    /// ```
    #[must_use]
    pub fn clamped_from_f64(values: &[f64]) -> Self {
        NumericArray::Uint8Clamped(values.iter().map(|v| clamp_u8(*v)).collect())
    }

    /// Returns the element kind of this array.
    #[must_use]
    pub const fn kind(&self) -> NumericKind {
        match self {
            NumericArray::Int8(_) => NumericKind::Int8,
            NumericArray::Uint8(_) => NumericKind::Uint8,
            NumericArray::Uint8Clamped(_) => NumericKind::Uint8Clamped,
            NumericArray::Int16(_) => NumericKind::Int16,
            NumericArray::Uint16(_) => NumericKind::Uint16,
            NumericArray::Int32(_) => NumericKind::Int32,
            NumericArray::Uint32(_) => NumericKind::Uint32,
            NumericArray::BigInt64(_) => NumericKind::BigInt64,
            NumericArray::BigUint64(_) => NumericKind::BigUint64,
            NumericArray::Float32(_) => NumericKind::Float32,
            NumericArray::Float64(_) => NumericKind::Float64,
        }
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            NumericArray::Int8(v) => v.len(),
            NumericArray::Uint8(v) | NumericArray::Uint8Clamped(v) => v.len(),
            NumericArray::Int16(v) => v.len(),
            NumericArray::Uint16(v) => v.len(),
            NumericArray::Int32(v) => v.len(),
            NumericArray::Uint32(v) => v.len(),
            NumericArray::BigInt64(v) => v.len(),
            NumericArray::BigUint64(v) => v.len(),
            NumericArray::Float32(v) => v.len(),
            NumericArray::Float64(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element bytes in native byte order.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            NumericArray::Int8(v) => to_ne_bytes!(v),
            NumericArray::Uint8(v) | NumericArray::Uint8Clamped(v) => v.clone(),
            NumericArray::Int16(v) => to_ne_bytes!(v),
            NumericArray::Uint16(v) => to_ne_bytes!(v),
            NumericArray::Int32(v) => to_ne_bytes!(v),
            NumericArray::Uint32(v) => to_ne_bytes!(v),
            NumericArray::BigInt64(v) => to_ne_bytes!(v),
            NumericArray::BigUint64(v) => to_ne_bytes!(v),
            NumericArray::Float32(v) => to_ne_bytes!(v),
            NumericArray::Float64(v) => to_ne_bytes!(v),
        }
    }

    /// Reinterprets `bytes` as an array of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadMismatch`] when the byte length is not a
    /// multiple of the element width.
    pub fn from_bytes(kind: NumericKind, bytes: &[u8]) -> Result<Self> {
        let width = kind.element_size();
        if bytes.len() % width != 0 {
            return Err(Error::payload_mismatch(
                kind.tag(),
                format!(
                    "{} bytes is not a multiple of the {}-byte element width",
                    bytes.len(),
                    width
                ),
            ));
        }

        Ok(match kind {
            NumericKind::Int8 => NumericArray::Int8(from_ne_bytes!(bytes, i8)),
            NumericKind::Uint8 => NumericArray::Uint8(bytes.to_vec()),
            NumericKind::Uint8Clamped => NumericArray::Uint8Clamped(bytes.to_vec()),
            NumericKind::Int16 => NumericArray::Int16(from_ne_bytes!(bytes, i16)),
            NumericKind::Uint16 => NumericArray::Uint16(from_ne_bytes!(bytes, u16)),
            NumericKind::Int32 => NumericArray::Int32(from_ne_bytes!(bytes, i32)),
            NumericKind::Uint32 => NumericArray::Uint32(from_ne_bytes!(bytes, u32)),
            NumericKind::BigInt64 => NumericArray::BigInt64(from_ne_bytes!(bytes, i64)),
            NumericKind::BigUint64 => NumericArray::BigUint64(from_ne_bytes!(bytes, u64)),
            NumericKind::Float32 => NumericArray::Float32(from_ne_bytes!(bytes, f32)),
            NumericKind::Float64 => NumericArray::Float64(from_ne_bytes!(bytes, f64)),
        })
    }
}

fn clamp_u8(value: f64) -> u8 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= 255.0 {
        255
    } else {
        value.round_ties_even() as u8
    }
}

impl From<Vec<i8>> for NumericArray {
    fn from(value: Vec<i8>) -> Self {
        NumericArray::Int8(value)
    }
}

impl From<Vec<u8>> for NumericArray {
    fn from(value: Vec<u8>) -> Self {
        NumericArray::Uint8(value)
    }
}

impl From<Vec<i16>> for NumericArray {
    fn from(value: Vec<i16>) -> Self {
        NumericArray::Int16(value)
    }
}

impl From<Vec<u16>> for NumericArray {
    fn from(value: Vec<u16>) -> Self {
        NumericArray::Uint16(value)
    }
}

impl From<Vec<i32>> for NumericArray {
    fn from(value: Vec<i32>) -> Self {
        NumericArray::Int32(value)
    }
}

impl From<Vec<u32>> for NumericArray {
    fn from(value: Vec<u32>) -> Self {
        NumericArray::Uint32(value)
    }
}

impl From<Vec<i64>> for NumericArray {
    fn from(value: Vec<i64>) -> Self {
        NumericArray::BigInt64(value)
    }
}

impl From<Vec<u64>> for NumericArray {
    fn from(value: Vec<u64>) -> Self {
        NumericArray::BigUint64(value)
    }
}

impl From<Vec<f32>> for NumericArray {
    fn from(value: Vec<f32>) -> Self {
        NumericArray::Float32(value)
    }
}

impl From<Vec<f64>> for NumericArray {
    fn from(value: Vec<f64>) -> Self {
        NumericArray::Float64(value)
    }
}
