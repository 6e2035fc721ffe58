//! COPY FROM target identifiers.

use std::fmt;

/// A possibly schema-qualified table name, e.g. `["public", "users"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Identifier(pub Vec<String>);

impl Identifier {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Quote each part for use in SQL: `"schema"."table"`.
    ///
    /// Embedded double quotes are doubled and NUL bytes are removed.
    pub fn sanitize(&self) -> String {
        self.0
            .iter()
            .map(|part| {
                let cleaned = part.replace('"', "\"\"").replace('\0', "");
                format!("\"{}\"", cleaned)
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sanitize())
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl<const N: usize> From<[&str; N]> for Identifier {
    fn from(parts: [&str; N]) -> Self {
        Self::new(parts)
    }
}
