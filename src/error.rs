//! Error types for zero-postgres-mock.

use std::convert::Infallible;

use thiserror::Error;

/// Result type for zero-postgres-mock operations.
pub type Result<T> = core::result::Result<T, Error>;

/// PostgreSQL error/notice fields.
///
/// Used to program server-shaped failures on an expectation, so code under
/// test can branch on SQLSTATE the same way it would against a live server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorFields {
    /// Severity: ERROR, FATAL, PANIC, WARNING, NOTICE, DEBUG, INFO, LOG
    pub severity: Option<String>,
    /// SQLSTATE error code (5 characters)
    pub code: Option<String>,
    /// Primary error message
    pub message: Option<String>,
    /// Detailed error explanation
    pub detail: Option<String>,
    /// Suggestion for fixing the error
    pub hint: Option<String>,
    /// Schema name
    pub schema: Option<String>,
    /// Table name
    pub table: Option<String>,
    /// Column name
    pub column: Option<String>,
    /// Constraint name
    pub constraint: Option<String>,
}

impl ErrorFields {
    /// Build an `ERROR` severity field set with a SQLSTATE code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Some("ERROR".into()),
            code: Some(code.into()),
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

impl std::fmt::Display for ErrorFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(severity) = &self.severity {
            write!(f, "{}: ", severity)?;
        }
        if let Some(message) = &self.message {
            write!(f, "{}", message)?;
        }
        if let Some(code) = &self.code {
            write!(f, " (SQLSTATE {})", code)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, "\nDETAIL: {}", detail)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nHINT: {}", hint)?;
        }
        Ok(())
    }
}

/// Error type for zero-postgres-mock.
///
/// Cloneable: a single programmed error is handed out on every repeat of an
/// expectation and may be parked inside a deferred row or batch cursor.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Programmed server error response
    #[error("PostgreSQL error: {0}")]
    Server(ErrorFields),

    /// A call arrived that no queued expectation can satisfy
    #[error("{0}")]
    UnexpectedCall(String),

    /// Ordered mode found the next expectation, but its arguments differ
    #[error("{detail}, next expectation is: {expected}")]
    Mismatch {
        /// What did not match
        detail: String,
        /// Rendering of the expectation that was next in line
        expected: String,
    },

    /// Reported by `expectations_were_met`
    #[error("{0}")]
    Unfulfilled(String),

    /// The caller's context was canceled before the programmed delay elapsed
    #[error("canceling query due to user request")]
    Canceled,

    /// The caller's context deadline passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// A custom argument matcher panicked while being evaluated
    #[error("argument matcher failed: {0}")]
    ArgumentMatcher(String),

    /// `query_row` found no row to scan
    #[error("no rows in result set")]
    NoRows,

    /// A row value could not be converted to the requested type
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid usage (e.g., nested transactions, bad DSN)
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),

    /// Free-form programmed error
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Get the SQLSTATE code if this is a server error.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Server(fields) => fields.code.as_deref(),
            _ => None,
        }
    }

    /// Returns true if the call lost the race against its context.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled | Error::DeadlineExceeded)
    }

    /// Returns true if the call was rejected by the dispatcher.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Error::UnexpectedCall(_) | Error::Mismatch { .. })
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::Custom(message.to_string())
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Custom(message)
    }
}

impl From<ErrorFields> for Error {
    fn from(fields: ErrorFields) -> Self {
        Error::Server(fields)
    }
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = Error::Server(ErrorFields::new("23505", "duplicate key value"));
        assert_eq!(
            err.to_string(),
            "PostgreSQL error: ERROR: duplicate key value (SQLSTATE 23505)"
        );
        assert_eq!(err.sqlstate(), Some("23505"));
    }

    #[test]
    fn test_mismatch_display() {
        let err = Error::Mismatch {
            detail: "Begin: bad options".into(),
            expected: "ExpectedBegin".into(),
        };
        assert_eq!(
            err.to_string(),
            "Begin: bad options, next expectation is: ExpectedBegin"
        );
        assert!(err.is_unexpected());
    }

    #[test]
    fn test_custom_from_str() {
        let err: Error = "boom".into();
        assert_eq!(err.to_string(), "boom");
        assert!(!err.is_canceled());
        assert!(Error::Canceled.is_canceled());
    }
}
