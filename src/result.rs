//! Results of non-row operations.

use std::fmt;

/// Command completion tag (e.g., "SELECT 5", "INSERT 0 1", "UPDATE 10").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CommandTag(String);

impl CommandTag {
    /// Build a tag from an operation name and a row count.
    ///
    /// ```
    /// use zero_postgres_mock::CommandTag;
    ///
    /// let tag = CommandTag::new("UPDATE", 15);
    /// assert_eq!(tag.to_string(), "UPDATE 15");
    /// assert_eq!(tag.rows_affected(), 15);
    /// ```
    pub fn new(op: &str, rows_affected: i64) -> Self {
        Self(format!("{} {}", op, rows_affected))
    }

    /// Wrap a raw tag string.
    pub fn from_raw(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of rows affected, taken from the trailing count.
    ///
    /// Returns 0 for tags without a count.
    pub fn rows_affected(&self) -> i64 {
        match self.0.rsplit_once(' ') {
            Some((_, count)) => count.parse().unwrap_or(0),
            None => 0,
        }
    }

    /// Get the command name from the tag.
    pub fn command(&self) -> Option<&str> {
        self.0.split_whitespace().next()
    }

    pub fn is_insert(&self) -> bool {
        self.command() == Some("INSERT")
    }

    pub fn is_update(&self) -> bool {
        self.command() == Some("UPDATE")
    }

    pub fn is_delete(&self) -> bool {
        self.command() == Some("DELETE")
    }

    pub fn is_select(&self) -> bool {
        self.command() == Some("SELECT")
    }
}

impl fmt::Display for CommandTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A statement returned by `prepare`.
///
/// Pass it to `exec`/`query` to execute the statement by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementDescription {
    /// Statement name
    pub name: String,
    /// SQL text the statement was prepared from
    pub sql: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_affected() {
        assert_eq!(CommandTag::new("DELETE", 3).rows_affected(), 3);
        assert_eq!(CommandTag::from_raw("INSERT 0 1").rows_affected(), 1);
        assert_eq!(CommandTag::from_raw("BEGIN").rows_affected(), 0);
        assert_eq!(CommandTag::default().rows_affected(), 0);
    }

    #[test]
    fn test_command() {
        let tag = CommandTag::new("INSERT", 2);
        assert!(tag.is_insert());
        assert!(!tag.is_select());
        assert_eq!(tag.command(), Some("INSERT"));
        assert!(CommandTag::default().is_empty());
    }
}
