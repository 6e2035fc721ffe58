//! Named arguments (`@name` placeholders).

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Arg, IntoArg, Null};

/// Arguments keyed by name, bound to `@name` placeholders in the SQL text.
///
/// ```
/// use zero_postgres_mock::NamedArgs;
///
/// let args = NamedArgs::new().arg("id", 1_i32).arg("name", "john");
/// let (sql, params) = args.rewrite("SELECT * FROM users WHERE id = @id AND name = @name");
/// assert_eq!(sql, "SELECT * FROM users WHERE id = $1 AND name = $2");
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NamedArgs {
    args: BTreeMap<String, Arg>,
}

impl NamedArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value or matcher to `name`.
    pub fn arg(mut self, name: impl Into<String>, value: impl IntoArg) -> Self {
        self.args.insert(name.into(), value.into_arg());
        self
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Replace every `@name` with `$n` and return the positional arguments.
    ///
    /// Placeholders are numbered in order of first appearance. A name used
    /// twice gets the same number. Names with no bound value become `Null`.
    /// Placeholders inside string literals, quoted identifiers and comments
    /// are left alone.
    pub fn rewrite(&self, sql: &str) -> (String, Vec<Arg>) {
        let mut out = String::with_capacity(sql.len());
        let mut order: Vec<&str> = Vec::new();
        let bytes = sql.as_bytes();
        let mut i = 0;
        let mut copied = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\'' | b'"' => {
                    i = skip_quoted(bytes, i);
                }
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    i = match memchr::memchr(b'\n', &bytes[i..]) {
                        Some(pos) => i + pos + 1,
                        None => bytes.len(),
                    };
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = skip_block_comment(bytes, i);
                }
                b'@' if bytes.get(i + 1).is_some_and(|&b| is_name_start(b)) => {
                    let start = i + 1;
                    let mut end = start + 1;
                    while end < bytes.len() && is_name_continue(bytes[end]) {
                        end += 1;
                    }
                    let name = &sql[start..end];
                    let position = match order.iter().position(|n| *n == name) {
                        Some(pos) => pos,
                        None => {
                            order.push(name);
                            order.len() - 1
                        }
                    };
                    out.push_str(&sql[copied..i]);
                    out.push('$');
                    out.push_str(&(position + 1).to_string());
                    copied = end;
                    i = end;
                }
                _ => i += 1,
            }
        }
        out.push_str(&sql[copied..]);

        let params = order
            .iter()
            .map(|name| {
                self.args
                    .get(*name)
                    .cloned()
                    .unwrap_or_else(|| Arg::Value(Arc::new(Null)))
            })
            .collect();
        (out, params)
    }
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Skip a quoted literal starting at `start`. Doubled quotes are escapes.
fn skip_quoted(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Skip a (possibly nested) block comment starting at `start`.
fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_first_appearance_order() {
        let args = NamedArgs::new().arg("a", 1_i32).arg("b", 2_i32);
        let (sql, params) = args.rewrite("SELECT @b, @a, @b");
        assert_eq!(sql, "SELECT $1, $2, $1");
        assert_eq!(format!("{:?}", params), "[2, 1]");
    }

    #[test]
    fn test_rewrite_missing_name_is_null() {
        let args = NamedArgs::new();
        let (sql, params) = args.rewrite("UPDATE t SET x = @x");
        assert_eq!(sql, "UPDATE t SET x = $1");
        assert_eq!(format!("{:?}", params), "[Null]");
    }

    #[test]
    fn test_rewrite_skips_quotes_and_comments() {
        let args = NamedArgs::new().arg("id", 7_i64);
        let sql = "SELECT '@id', \"@id\" -- @id\n FROM t /* @id /* @id */ */ WHERE id = @id";
        let (rewritten, params) = args.rewrite(sql);
        assert_eq!(
            rewritten,
            "SELECT '@id', \"@id\" -- @id\n FROM t /* @id /* @id */ */ WHERE id = $1"
        );
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_rewrite_ignores_bare_at() {
        let args = NamedArgs::new();
        let (sql, params) = args.rewrite("SELECT 1 @ 2, @1");
        assert_eq!(sql, "SELECT 1 @ 2, @1");
        assert!(params.is_empty());
    }

    #[test]
    fn test_escaped_quote() {
        let args = NamedArgs::new().arg("v", 1_i32);
        let (sql, _) = args.rewrite("SELECT 'it''s @v', @v");
        assert_eq!(sql, "SELECT 'it''s @v', $1");
    }
}
