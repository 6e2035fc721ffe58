//! SQL text matching strategies.
//!
//! The expected string of an expectation is compared with the SQL text of the
//! actual call through a [`QueryMatcher`]. Exactly one matcher is active per
//! mock, chosen through [`Opts::query_matcher`](crate::Opts::query_matcher).

use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::Mutex;
use regex::Regex;

static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Collapse whitespace runs into a single space and trim both ends.
fn strip_query(sql: &str) -> String {
    match WHITESPACE.as_ref() {
        Some(re) => re.replace_all(sql, " ").trim().to_string(),
        None => sql.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Strategy comparing an expected SQL pattern against actual SQL text.
///
/// Returns `Err` with a human readable reason when the texts do not match.
pub trait QueryMatcher: Send + Sync {
    /// Match `actual` against `expected`.
    fn matches(&self, expected: &str, actual: &str) -> Result<(), String>;
}

impl<F> QueryMatcher for F
where
    F: Fn(&str, &str) -> Result<(), String> + Send + Sync,
{
    fn matches(&self, expected: &str, actual: &str) -> Result<(), String> {
        self(expected, actual)
    }
}

/// Treats the expected string as a regular expression searched in the actual SQL.
///
/// This is the default matcher. Compiled patterns are cached.
#[derive(Default)]
pub struct QueryMatcherRegexp {
    cache: Mutex<HashMap<String, Regex>>,
}

impl QueryMatcherRegexp {
    /// Create a new regexp matcher.
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueryMatcher for QueryMatcherRegexp {
    fn matches(&self, expected: &str, actual: &str) -> Result<(), String> {
        let expect = strip_query(expected);
        let actual = strip_query(actual);

        let mut cache = self.cache.lock();
        let re = match cache.get(&expect) {
            Some(re) => re.clone(),
            None => {
                let re = Regex::new(&expect).map_err(|e| e.to_string())?;
                cache.insert(expect.clone(), re.clone());
                re
            }
        };
        drop(cache);

        if re.is_match(&actual) {
            Ok(())
        } else {
            Err(format!(
                "could not match actual sql: \"{}\" with expected regexp \"{}\"",
                actual, expect
            ))
        }
    }
}

/// Requires the whitespace-normalized texts to be equal.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryMatcherEqual;

impl QueryMatcher for QueryMatcherEqual {
    fn matches(&self, expected: &str, actual: &str) -> Result<(), String> {
        let expect = strip_query(expected);
        let actual = strip_query(actual);
        if actual == expect {
            Ok(())
        } else {
            Err(format!(
                "actual sql: \"{}\" does not equal to expected \"{}\"",
                actual, expect
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regexp_searches_actual() {
        let m = QueryMatcherRegexp::new();
        assert!(m.matches("SELECT (.+) FROM articles", "SELECT id, title FROM articles WHERE id = $1").is_ok());
        assert!(m.matches("^INSERT", "UPDATE t SET x = 1").is_err());
    }

    #[test]
    fn test_regexp_normalizes_whitespace() {
        let m = QueryMatcherRegexp::new();
        let query = "
            SELECT name,
                   email
            FROM user
        ";
        assert!(m.matches(query, query).is_ok());
    }

    #[test]
    fn test_regexp_invalid_pattern() {
        let m = QueryMatcherRegexp::new();
        assert!(m.matches("SELECT (", "SELECT (").is_err());
    }

    #[test]
    fn test_equal_is_exact() {
        let m = QueryMatcherEqual;
        assert!(m.matches("SELECT  1", " SELECT 1 ").is_ok());
        let err = m.matches("SELECT 1", "SELECT 2").unwrap_err();
        assert_eq!(err, "actual sql: \"SELECT 2\" does not equal to expected \"SELECT 1\"");
    }

    #[test]
    fn test_closure_matcher() {
        let m = |expected: &str, actual: &str| {
            if actual.starts_with(expected) {
                Ok(())
            } else {
                Err("prefix".to_string())
            }
        };
        assert!(m.matches("SELECT", "SELECT 1").is_ok());
        assert!(QueryMatcher::matches(&m, "DELETE", "SELECT 1").is_err());
    }
}
