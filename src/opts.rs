//! Mock options.

use std::sync::Arc;

use url::Url;

use crate::error::Error;
use crate::query_matcher::{QueryMatcher, QueryMatcherEqual, QueryMatcherRegexp};

/// Options for a mock connection.
#[derive(Clone)]
pub struct Opts {
    /// Strategy comparing expected SQL with actual SQL.
    ///
    /// Default: [`QueryMatcherRegexp`]
    pub query_matcher: Arc<dyn QueryMatcher>,

    /// Whether calls must arrive in the order expectations were registered.
    ///
    /// Default: `true`
    pub match_in_order: bool,

    /// The DSN this mock was created from, if any. Never connected to.
    ///
    /// Default: `None`
    pub dsn: Option<String>,

    /// Query parameters of the DSN that the mock does not interpret.
    ///
    /// Default: `[]`
    pub params: Vec<(String, String)>,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            query_matcher: Arc::new(QueryMatcherRegexp::new()),
            match_in_order: true,
            dsn: None,
            params: Vec::new(),
        }
    }
}

impl std::fmt::Debug for Opts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opts")
            .field("match_in_order", &self.match_in_order)
            .field("dsn", &self.dsn)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Opts {
    /// Use `matcher` to compare SQL text.
    pub fn query_matcher(mut self, matcher: impl QueryMatcher + 'static) -> Self {
        self.query_matcher = Arc::new(matcher);
        self
    }

    /// Set whether expectations must be met in registration order.
    pub fn match_in_order(mut self, ordered: bool) -> Self {
        self.match_in_order = ordered;
        self
    }
}

impl TryFrom<&Url> for Opts {
    type Error = Error;

    /// Parse a mock DSN.
    ///
    /// Format: `pgmock://[anything][?param1=value1&param2=value2&..]`.
    /// `postgres://`, `postgresql://` and `pg://` are accepted too so a real
    /// connection string from the code under test can be reused.
    ///
    /// Supported query parameters:
    /// - `query_matcher`: regexp, equal
    /// - `match_in_order`: true/True/1/yes/on or false/False/0/no/off
    fn try_from(url: &Url) -> Result<Self, Self::Error> {
        if !["pgmock", "postgres", "postgresql", "pg"].contains(&url.scheme()) {
            return Err(Error::InvalidUsage(format!(
                "Invalid scheme: expected 'pgmock://', 'postgres://' or 'pg://', got '{}://'",
                url.scheme()
            )));
        }

        let mut opts = Opts {
            dsn: Some(url.to_string()),
            ..Opts::default()
        };

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "query_matcher" => {
                    opts.query_matcher = match value.as_ref() {
                        "regexp" => Arc::new(QueryMatcherRegexp::new()),
                        "equal" => Arc::new(QueryMatcherEqual),
                        _ => {
                            return Err(Error::InvalidUsage(format!(
                                "Invalid query_matcher: expected one of ['regexp', 'equal'], got {}",
                                value
                            )));
                        }
                    };
                }
                "match_in_order" => {
                    opts.match_in_order = match value.as_ref() {
                        "true" | "True" | "1" | "yes" | "on" => true,
                        "false" | "False" | "0" | "no" | "off" => false,
                        _ => {
                            return Err(Error::InvalidUsage(format!(
                                "Invalid match_in_order: {}",
                                value
                            )));
                        }
                    };
                }
                _ => {
                    opts.params.push((key.to_string(), value.to_string()));
                }
            }
        }

        Ok(opts)
    }
}

impl TryFrom<&str> for Opts {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let url = Url::parse(s).map_err(|e| Error::InvalidUsage(format!("Invalid URL: {}", e)))?;
        Self::try_from(&url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let opts = Opts::default();
        assert!(opts.match_in_order);
        assert!(opts.dsn.is_none());
        assert!(opts.query_matcher.matches("SELECT .+", "SELECT 1").is_ok());
    }

    #[test]
    fn test_parse_dsn() {
        let opts = Opts::try_from("pgmock://test?query_matcher=equal&match_in_order=false").unwrap();
        assert!(!opts.match_in_order);
        assert!(opts.query_matcher.matches("SELECT .+", "SELECT 1").is_err());
        assert!(opts.query_matcher.matches("SELECT 1", "SELECT  1").is_ok());
        assert_eq!(
            opts.dsn.as_deref(),
            Some("pgmock://test?query_matcher=equal&match_in_order=false")
        );
    }

    #[test]
    fn test_unknown_params_kept() {
        let opts = Opts::try_from("postgres://user:pw@localhost/db?sslmode=disable").unwrap();
        assert_eq!(opts.params, vec![("sslmode".to_string(), "disable".to_string())]);
    }

    #[test]
    fn test_invalid() {
        assert!(Opts::try_from("mysql://localhost").is_err());
        assert!(Opts::try_from("pgmock://x?query_matcher=glob").is_err());
        assert!(Opts::try_from("pgmock://x?match_in_order=maybe").is_err());
        assert!(Opts::try_from("not a url").is_err());
    }
}
