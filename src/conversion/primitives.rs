//! Primitive type implementations (bool, integers, floats).

use crate::error::Result;
use crate::types::SqlValue;

use super::{FromValue, downcast, mismatch};

/// Implement `FromValue` for `$T`, accepting `$T` itself and each listed
/// narrower type.
macro_rules! impl_from_value_widening {
    ($T:ty $(, $narrow:ty)*) => {
        impl FromValue for $T {
            fn from_value(value: &dyn SqlValue) -> Result<Self> {
                if let Some(v) = downcast::<$T>(value) {
                    return Ok(v);
                }
                $(
                    if let Some(v) = downcast::<$narrow>(value) {
                        return Ok(<$T>::from(v));
                    }
                )*
                Err(mismatch::<$T>(value))
            }
        }
    };
}

impl_from_value_widening!(bool);
impl_from_value_widening!(i8);
impl_from_value_widening!(i16, i8, u8);
impl_from_value_widening!(i32, i16, i8, u16, u8);
impl_from_value_widening!(i64, i32, i16, i8, u32, u16, u8);
impl_from_value_widening!(u8);
impl_from_value_widening!(u16, u8);
impl_from_value_widening!(u32, u16, u8);
impl_from_value_widening!(u64, u32, u16, u8);
impl_from_value_widening!(f32, i16, i8, u16, u8);
impl_from_value_widening!(f64, f32, i32, i16, i8, u32, u16, u8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact() {
        assert!(bool::from_value(&true).unwrap());
        assert_eq!(i32::from_value(&42_i32).unwrap(), 42);
        assert_eq!(f64::from_value(&1.5_f64).unwrap(), 1.5);
    }

    #[test]
    fn test_widening() {
        assert_eq!(i64::from_value(&7_i32).unwrap(), 7);
        assert_eq!(i64::from_value(&-3_i16).unwrap(), -3);
        assert_eq!(f64::from_value(&0.5_f32).unwrap(), 0.5);
    }

    #[test]
    fn test_narrowing_rejected() {
        assert!(i32::from_value(&7_i64).is_err());
        assert!(i16::from_value(&7_i32).is_err());
        assert!(bool::from_value(&1_i32).is_err());
    }

    #[test]
    fn test_error_message() {
        let err = i32::from_value(&"x").unwrap_err();
        assert!(err.to_string().starts_with("Decode error: cannot decode &str as i32"));
    }
}
