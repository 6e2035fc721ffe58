//! Descriptions of incoming driver calls.

use std::fmt;

use crate::copy::Identifier;
use crate::tx::TxOptions;
use crate::types::{Arg, ToParams};

/// Operation kind of a call or an expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum OpKind {
    Close,
    Begin,
    Commit,
    Rollback,
    Query,
    Exec,
    Prepare,
    Deallocate,
    CopyFrom,
    Ping,
    Reset,
    Batch,
}

/// SQL text and arguments of one statement as sent by the code under test.
///
/// If the only argument is `NamedArgs`, the statement is rewritten to
/// positional form: `rewritten_sql` holds the `$n` text and `args` the
/// positional values, while `sql` keeps the original text.
#[derive(Debug, Clone)]
pub(crate) struct StatementCall {
    pub sql: String,
    pub rewritten_sql: Option<String>,
    pub args: Vec<Arg>,
}

impl StatementCall {
    pub fn new(sql: &str, args: Vec<Arg>) -> Self {
        if let [Arg::Named(named)] = args.as_slice() {
            let (rewritten, positional) = named.rewrite(sql);
            return Self {
                sql: sql.to_string(),
                rewritten_sql: Some(rewritten),
                args: positional,
            };
        }
        Self {
            sql: sql.to_string(),
            rewritten_sql: None,
            args,
        }
    }

    pub fn from_params<P: ToParams>(sql: &str, params: P) -> Self {
        Self::new(sql, params.to_params())
    }
}

/// One incoming call and its discriminators.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Call<'a> {
    Close,
    Begin(&'a TxOptions),
    Commit,
    Rollback,
    Query(&'a StatementCall),
    Exec(&'a StatementCall),
    Prepare { name: &'a str, sql: &'a str },
    Deallocate { name: Option<&'a str> },
    CopyFrom {
        table: &'a Identifier,
        columns: &'a [String],
    },
    Ping,
    Reset,
    Batch(&'a [StatementCall]),
}

impl Call<'_> {
    pub fn kind(&self) -> OpKind {
        match self {
            Call::Close => OpKind::Close,
            Call::Begin(_) => OpKind::Begin,
            Call::Commit => OpKind::Commit,
            Call::Rollback => OpKind::Rollback,
            Call::Query(_) => OpKind::Query,
            Call::Exec(_) => OpKind::Exec,
            Call::Prepare { .. } => OpKind::Prepare,
            Call::Deallocate { .. } => OpKind::Deallocate,
            Call::CopyFrom { .. } => OpKind::CopyFrom,
            Call::Ping => OpKind::Ping,
            Call::Reset => OpKind::Reset,
            Call::Batch(_) => OpKind::Batch,
        }
    }
}

impl fmt::Display for Call<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Call::Close => f.write_str("database Close"),
            Call::Begin(_) => f.write_str("database transaction Begin"),
            Call::Commit => f.write_str("Commit transaction"),
            Call::Rollback => f.write_str("Rollback transaction"),
            Call::Query(s) => write!(f, "Query '{}' with args {:?}", s.sql, s.args),
            Call::Exec(s) => write!(f, "ExecQuery '{}' with args {:?}", s.sql, s.args),
            Call::Prepare { sql, .. } => write!(f, "Prepare statement with query '{}'", sql),
            Call::Deallocate { name: Some(name) } => write!(f, "Deallocate statement '{}'", name),
            Call::Deallocate { name: None } => f.write_str("Deallocate all statements"),
            Call::CopyFrom { table, .. } => {
                write!(f, "CopyFrom statement with table name '{}'", table)
            }
            Call::Ping => f.write_str("database Ping"),
            Call::Reset => f.write_str("database Reset"),
            Call::Batch(statements) => {
                write!(f, "SendBatch with {} queued statements", statements.len())
            }
        }
    }
}
