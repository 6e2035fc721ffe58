//! Row decoding traits and implementations.

use crate::conversion::{FromValue, decode};
use crate::error::{Error, Result};
use crate::types::Value;

/// Trait for decoding a whole row into a Rust type.
pub trait FromRow: Sized {
    /// Decode a row from its column values.
    fn from_row(row: &[Value]) -> Result<Self>;
}

// === Tuple implementations ===

/// Implementation for empty tuple - used for statements that don't return rows
impl FromRow for () {
    fn from_row(_row: &[Value]) -> Result<Self> {
        Ok(())
    }
}

macro_rules! impl_from_row_tuple {
    ($count:literal: $($idx:tt => $T:ident),+) => {
        impl<$($T: FromValue),+> FromRow for ($($T,)+) {
            fn from_row(row: &[Value]) -> Result<Self> {
                if row.len() < $count {
                    return Err(Error::Decode(format!(
                        "not enough columns for tuple: row has {}, tuple needs {}",
                        row.len(),
                        $count
                    )));
                }
                Ok(($(
                    decode::<$T>(row[$idx].as_ref())?,
                )+))
            }
        }
    };
}

impl_from_row_tuple!(1: 0 => T1);
impl_from_row_tuple!(2: 0 => T1, 1 => T2);
impl_from_row_tuple!(3: 0 => T1, 1 => T2, 2 => T3);
impl_from_row_tuple!(4: 0 => T1, 1 => T2, 2 => T3, 3 => T4);
impl_from_row_tuple!(5: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5);
impl_from_row_tuple!(6: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6);
impl_from_row_tuple!(7: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6, 6 => T7);
impl_from_row_tuple!(8: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6, 6 => T7, 7 => T8);
impl_from_row_tuple!(9: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6, 6 => T7, 7 => T8, 8 => T9);
impl_from_row_tuple!(10: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6, 6 => T7, 7 => T8, 8 => T9, 9 => T10);
impl_from_row_tuple!(11: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6, 6 => T7, 7 => T8, 8 => T9, 9 => T10, 10 => T11);
impl_from_row_tuple!(12: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6, 6 => T7, 7 => T8, 8 => T9, 9 => T10, 10 => T11, 11 => T12);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Null, ToValues};

    #[test]
    fn test_tuple_row() {
        let row = (1_i32, "john", Null).to_values();
        let (id, name, email): (i64, String, Option<String>) = FromRow::from_row(&row).unwrap();
        assert_eq!(id, 1);
        assert_eq!(name, "john");
        assert_eq!(email, None);
    }

    #[test]
    fn test_too_few_columns() {
        let row = (1_i32,).to_values();
        let err = <(i32, i32)>::from_row(&row).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
