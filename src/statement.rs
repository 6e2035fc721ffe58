//! Statement reference types for polymorphic exec/query methods.

use crate::result::StatementDescription;

/// Sealed trait for types that can be used as statement references in
/// `exec`, `query`, `query_row` and `Batch::queue`.
///
/// This trait is sealed and cannot be implemented outside this crate.
pub trait IntoStatement: private::Sealed {
    /// The text matched against expectations.
    ///
    /// Raw SQL is matched as is; a prepared statement is matched by its name,
    /// which is what the driver sends when executing it.
    fn statement_text(&self) -> &str;

    /// Get the prepared statement if this is a prepared statement reference.
    fn as_prepared(&self) -> Option<&StatementDescription>;
}

mod private {
    use crate::result::StatementDescription;

    pub trait Sealed {}

    impl Sealed for &StatementDescription {}
    impl Sealed for &str {}
    impl Sealed for &&str {}
    impl Sealed for &String {}
}

impl IntoStatement for &StatementDescription {
    fn statement_text(&self) -> &str {
        &self.name
    }

    fn as_prepared(&self) -> Option<&StatementDescription> {
        Some(self)
    }
}

impl IntoStatement for &str {
    fn statement_text(&self) -> &str {
        self
    }

    fn as_prepared(&self) -> Option<&StatementDescription> {
        None
    }
}

impl IntoStatement for &&str {
    fn statement_text(&self) -> &str {
        self
    }

    fn as_prepared(&self) -> Option<&StatementDescription> {
        None
    }
}

impl IntoStatement for &String {
    fn statement_text(&self) -> &str {
        self.as_str()
    }

    fn as_prepared(&self) -> Option<&StatementDescription> {
        None
    }
}
