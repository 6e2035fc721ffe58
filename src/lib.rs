//! An expectation-driven mock of a PostgreSQL client, for unit tests.
//!
//! Tests register the calls they expect on a mock connection, run the code
//! under test against it, and finally check that every expectation was met.
//! Nothing talks to a server: each call is resolved against the queued
//! expectations and answered with the programmed rows, command tag or error.
//!
//! # Features
//!
//! - **Ordered or unordered matching**: calls must follow registration order
//!   unless `match_in_order=false`
//! - **Call behavior**: delays racing a cancellation [`Context`], programmed
//!   errors and panics, repeat counts and optional expectations
//! - **Sync and async APIs**: a blocking [`sync::Conn`] and a Tokio-based
//!   [`tokio::Conn`] sharing the same dispatcher
//! - **Full surface**: transactions, prepared statements, COPY FROM, batches
//!
//! # Example
//!
//! ```
//! use zero_postgres_mock::sync::Conn;
//! use zero_postgres_mock::{CallModifier, Context, Opts, Rows};
//!
//! fn main() -> zero_postgres_mock::Result<()> {
//!     let conn = Conn::new(Opts::default())?;
//!     conn.expect_query("SELECT id, title FROM articles")
//!         .with_args((5_i32,))
//!         .will_return_rows(Rows::new(["id", "title"]).add_row((5_i32, "hello")));
//!
//!     let ctx = Context::background();
//!     let rows: Vec<(i32, String)> =
//!         conn.query_collect(&ctx, "SELECT id, title FROM articles WHERE id = $1", (5_i32,))?;
//!     assert_eq!(rows, vec![(5, "hello".to_string())]);
//!
//!     conn.expectations_were_met()
//! }
//! ```

mod argument;
mod batch;
mod behavior;
mod call;
mod context;
pub mod conversion;
mod copy;
pub mod error;
mod expectation;
mod mock;
pub mod opts;
mod query_matcher;
mod result;
mod rows;
mod statement;
mod tx;
pub mod types;

#[cfg(feature = "sync")]
pub mod sync;

#[cfg(feature = "tokio")]
pub mod tokio;

pub use argument::{AnyArg, ArgFn, Argument, TypeOf, any_arg, arg_fn, type_of};
pub use batch::Batch;
pub use context::Context;
pub use conversion::{FromRow, FromValue};
pub use copy::Identifier;
pub use error::{Error, ErrorFields, Result};
pub use expectation::{
    CallModifier, ExpectedBatch, ExpectedBegin, ExpectedClose, ExpectedCommit, ExpectedCopyFrom,
    ExpectedDeallocate, ExpectedExec, ExpectedPing, ExpectedPrepare, ExpectedQuery,
    ExpectedReset, ExpectedRollback,
};
pub use mock::Mock;
pub use opts::Opts;
pub use query_matcher::{QueryMatcher, QueryMatcherEqual, QueryMatcherRegexp};
pub use result::{CommandTag, StatementDescription};
pub use rows::{Row, RowCursor, Rows};
pub use statement::IntoStatement;
pub use tx::{AccessMode, IsolationLevel, TransactionStatus, TxOptions};
pub use types::{Arg, IntoArg, NamedArgs, Null, SqlValue, ToParams, ToValues, Value, value};
