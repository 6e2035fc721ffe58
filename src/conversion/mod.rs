//! Decoding row values into Rust types.
//!
//! Row values are stored as [`SqlValue`] trait objects exactly as the test
//! supplied them. Decoding downcasts to the requested type, with a few lossless
//! widenings (`i16` -> `i32` -> `i64`, `f32` -> `f64`, `&'static str` ->
//! `String`) so fixtures don't have to spell out exact types. Types from the
//! optional crates additionally parse from text, as a text-format column would.

mod bytes;
mod primitives;
mod row;
mod string;

#[cfg(feature = "with-chrono")]
mod chrono;
#[cfg(feature = "with-rust-decimal")]
mod decimal;
#[cfg(feature = "with-time")]
mod time;
#[cfg(feature = "with-uuid")]
mod uuid;

use crate::error::{Error, Result};
use crate::types::{Null, SqlValue};
pub use row::FromRow;

/// Trait for decoding a row value into a Rust type.
pub trait FromValue: Sized {
    /// Decode from NULL.
    ///
    /// Default implementation returns an error. Override for types that can
    /// represent NULL (like `Option<T>`).
    fn from_null() -> Result<Self> {
        Err(Error::Decode("unexpected NULL value".into()))
    }

    /// Decode from a non-NULL value.
    fn from_value(value: &dyn SqlValue) -> Result<Self>;
}

/// Decode one value, routing [`Null`] to [`FromValue::from_null`].
pub fn decode<T: FromValue>(value: &dyn SqlValue) -> Result<T> {
    if value.as_any().is::<Null>() {
        T::from_null()
    } else {
        T::from_value(value)
    }
}

/// Clone the value out if it has type `T`.
pub(crate) fn downcast<T: Clone + 'static>(value: &dyn SqlValue) -> Option<T> {
    value.as_any().downcast_ref::<T>().cloned()
}

/// Borrow the value as text if it is a `String` or `&'static str`.
pub(crate) fn as_text(value: &dyn SqlValue) -> Option<&str> {
    let any = value.as_any();
    if let Some(s) = any.downcast_ref::<String>() {
        return Some(s.as_str());
    }
    any.downcast_ref::<&'static str>().copied()
}

/// Error for a value whose type cannot be decoded as `T`.
pub(crate) fn mismatch<T>(value: &dyn SqlValue) -> Error {
    Error::Decode(format!(
        "cannot decode {} as {}",
        value.type_name(),
        std::any::type_name::<T>()
    ))
}

// === Option<T> - NULL handling ===

impl<T: FromValue + Clone + 'static> FromValue for Option<T> {
    fn from_null() -> Result<Self> {
        Ok(None)
    }

    fn from_value(value: &dyn SqlValue) -> Result<Self> {
        if let Some(v) = value.as_any().downcast_ref::<Option<T>>() {
            return Ok(v.clone());
        }
        T::from_value(value).map(Some)
    }
}

impl FromValue for Null {
    fn from_null() -> Result<Self> {
        Ok(Null)
    }

    fn from_value(value: &dyn SqlValue) -> Result<Self> {
        Err(mismatch::<Null>(value))
    }
}
