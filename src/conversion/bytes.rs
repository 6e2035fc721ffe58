//! Byte type implementations (`Vec<u8>`).

use crate::error::Result;
use crate::types::SqlValue;

use super::{FromValue, mismatch};

impl FromValue for Vec<u8> {
    fn from_value(value: &dyn SqlValue) -> Result<Self> {
        let any = value.as_any();
        if let Some(v) = any.downcast_ref::<Vec<u8>>() {
            return Ok(v.clone());
        }
        if let Some(v) = any.downcast_ref::<&'static [u8]>() {
            return Ok(v.to_vec());
        }
        Err(mismatch::<Vec<u8>>(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes() {
        assert_eq!(Vec::<u8>::from_value(&vec![1_u8, 2, 3]).unwrap(), vec![1, 2, 3]);
        let slice: &'static [u8] = b"\x00\xff";
        assert_eq!(Vec::<u8>::from_value(&slice).unwrap(), vec![0, 255]);
    }

    #[test]
    fn test_bytes_rejects_text() {
        assert!(Vec::<u8>::from_value(&"abc").is_err());
    }
}
