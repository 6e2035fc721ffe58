//! String type implementations.

use crate::error::Result;
use crate::types::SqlValue;

use super::{FromValue, as_text, mismatch};

impl FromValue for String {
    fn from_value(value: &dyn SqlValue) -> Result<Self> {
        if let Some(s) = as_text(value) {
            return Ok(s.to_owned());
        }
        if let Some(c) = value.as_any().downcast_ref::<char>() {
            return Ok(c.to_string());
        }
        Err(mismatch::<String>(value))
    }
}

impl FromValue for &'static str {
    fn from_value(value: &dyn SqlValue) -> Result<Self> {
        value
            .as_any()
            .downcast_ref::<&'static str>()
            .copied()
            .ok_or_else(|| mismatch::<&'static str>(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_from_str_and_string() {
        assert_eq!(String::from_value(&"hello").unwrap(), "hello");
        assert_eq!(String::from_value(&"world".to_string()).unwrap(), "world");
    }

    #[test]
    fn test_static_str() {
        assert_eq!(<&str>::from_value(&"abc").unwrap(), "abc");
        assert!(<&str>::from_value(&"abc".to_string()).is_err());
    }

    #[test]
    fn test_string_rejects_numbers() {
        assert!(String::from_value(&1_i32).is_err());
    }
}
