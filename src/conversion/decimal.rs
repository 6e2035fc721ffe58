//! Decimal type implementation (rust_decimal crate).
//!
//! Accepts a `Decimal`, any integer up to 64 bits, or NUMERIC text.

use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::types::SqlValue;

use super::{FromValue, as_text, downcast, mismatch};

impl FromValue for Decimal {
    fn from_value(value: &dyn SqlValue) -> Result<Self> {
        if let Some(v) = downcast::<Decimal>(value) {
            return Ok(v);
        }
        if let Ok(v) = i64::from_value(value) {
            return Ok(Decimal::from(v));
        }
        if let Some(s) = as_text(value) {
            if s == "NaN" {
                return Err(Error::Decode("NaN cannot be represented as Decimal".into()));
            }
            return Decimal::from_str_exact(s)
                .map_err(|e| Error::Decode(format!("invalid decimal: {}", e)));
        }
        Err(mismatch::<Decimal>(value))
    }
}
