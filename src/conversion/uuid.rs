//! UUID type implementation (uuid crate).

use crate::error::{Error, Result};
use crate::types::SqlValue;

use super::{FromValue, as_text, downcast, mismatch};

impl FromValue for uuid::Uuid {
    fn from_value(value: &dyn SqlValue) -> Result<Self> {
        if let Some(v) = downcast::<uuid::Uuid>(value) {
            return Ok(v);
        }
        if let Some(s) = as_text(value) {
            return uuid::Uuid::parse_str(s)
                .map_err(|e| Error::Decode(format!("invalid UUID: {}", e)));
        }
        Err(mismatch::<uuid::Uuid>(value))
    }
}
