//! Synchronous mock connection.

use std::ops::Deref;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::Arc;

use crate::batch::Batch;
use crate::behavior::{apply, rows_of, tag_of};
use crate::call::{Call, StatementCall};
use crate::context::Context;
use crate::conversion::FromRow;
use crate::copy::Identifier;
use crate::error::{Error, Result};
use crate::expectation::Resolved;
use crate::mock::Mock;
use crate::opts::Opts;
use crate::result::{CommandTag, StatementDescription};
use crate::rows::{Row, RowCursor};
use crate::statement::IntoStatement;
use crate::tx::{TransactionStatus, TxOptions};
use crate::types::ToParams;

use super::batch::BatchResults;
use super::transaction::Transaction;

/// Synchronous mock connection.
///
/// Clones share the same expectations, so a connection can be handed to
/// several threads and verified afterwards.
#[derive(Debug, Clone)]
pub struct Conn {
    mock: Arc<Mock>,
}

impl Deref for Conn {
    type Target = Mock;

    fn deref(&self) -> &Mock {
        &self.mock
    }
}

impl Conn {
    /// Create a mock connection. Nothing is connected to.
    pub fn new<O: TryInto<Opts>>(opts: O) -> Result<Self>
    where
        Error: From<O::Error>,
    {
        let opts = opts.try_into()?;
        Ok(Self {
            mock: Arc::new(Mock::new(opts)),
        })
    }

    fn dispatch(&self, ctx: &Context, call: &Call<'_>) -> Result<Resolved> {
        let resolved = self.mock.resolve(call)?;
        apply(&resolved, ctx)?;
        Ok(resolved)
    }

    /// Start a transaction with default options.
    pub fn begin(&self, ctx: &Context) -> Result<Transaction> {
        self.begin_tx(ctx, TxOptions::default())
    }

    /// Start a transaction.
    pub fn begin_tx(&self, ctx: &Context, opts: TxOptions) -> Result<Transaction> {
        self.dispatch(ctx, &Call::Begin(&opts))?;
        self.mock.set_transaction_status(TransactionStatus::InTransaction);
        Ok(Transaction::new(self.clone()))
    }

    pub fn commit(&self, ctx: &Context) -> Result<()> {
        let result = self.dispatch(ctx, &Call::Commit).map(drop);
        self.finish_transaction(&result);
        result
    }

    pub fn rollback(&self, ctx: &Context) -> Result<()> {
        let result = self.dispatch(ctx, &Call::Rollback).map(drop);
        self.finish_transaction(&result);
        result
    }

    fn finish_transaction(&self, result: &Result<()>) {
        // An unmatched commit leaves the transaction open.
        if !matches!(result, Err(e) if e.is_unexpected()) {
            self.mock.set_transaction_status(TransactionStatus::Idle);
        }
    }

    /// Execute a closure within a transaction.
    ///
    /// If the closure leaves the transaction open (it neither committed nor
    /// rolled back), the transaction is rolled back. This also happens when
    /// the closure panics; the panic then resumes after the rollback.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUsage` if called while already in a transaction.
    pub fn run_transaction<F, R>(&self, ctx: &Context, f: F) -> Result<R>
    where
        F: FnOnce(&Conn, Transaction) -> Result<R>,
    {
        if self.in_transaction() {
            return Err(Error::InvalidUsage(
                "nested transactions are not supported".into(),
            ));
        }

        let tx = self.begin(ctx)?;
        let result = match catch_unwind(AssertUnwindSafe(|| f(self, tx))) {
            Ok(result) => result,
            Err(payload) => {
                if self.in_transaction() {
                    // the closure's panic wins over anything the rollback does
                    let _ = catch_unwind(AssertUnwindSafe(|| self.rollback(ctx)));
                }
                resume_unwind(payload)
            }
        };

        if self.in_transaction() {
            let rollback_result = self.rollback(ctx);

            // Return the first error (either from closure or rollback)
            if let Err(e) = result {
                return Err(e);
            }
            rollback_result?;
        }

        result
    }

    /// Run a statement and return its command tag.
    pub fn exec<S: IntoStatement, P: ToParams>(
        &self,
        ctx: &Context,
        statement: S,
        params: P,
    ) -> Result<CommandTag> {
        let call = StatementCall::from_params(statement.statement_text(), params);
        let result = self
            .dispatch(ctx, &Call::Exec(&call))
            .and_then(|resolved| tag_of(&resolved, &call));
        self.mock.statement_finished(&result);
        result
    }

    /// Run a query and return a cursor over its rows.
    pub fn query<S: IntoStatement, P: ToParams>(
        &self,
        ctx: &Context,
        statement: S,
        params: P,
    ) -> Result<RowCursor> {
        let call = StatementCall::from_params(statement.statement_text(), params);
        let result = self
            .dispatch(ctx, &Call::Query(&call))
            .and_then(|resolved| rows_of(&resolved, &call));
        self.mock.statement_finished(&result);
        result
    }

    /// Run a query for a single row. Errors surface on `Row::scan`.
    pub fn query_row<S: IntoStatement, P: ToParams>(
        &self,
        ctx: &Context,
        statement: S,
        params: P,
    ) -> Row {
        Row::new(self.query(ctx, statement, params))
    }

    /// Run a query and decode every row.
    pub fn query_collect<T: FromRow, S: IntoStatement, P: ToParams>(
        &self,
        ctx: &Context,
        statement: S,
        params: P,
    ) -> Result<Vec<T>> {
        self.query(ctx, statement, params)?.collect()
    }

    /// Run a query and decode the first row, if any.
    pub fn query_first<T: FromRow, S: IntoStatement, P: ToParams>(
        &self,
        ctx: &Context,
        statement: S,
        params: P,
    ) -> Result<Option<T>> {
        let mut cursor = self.query(ctx, statement, params)?;
        let first = if cursor.next() {
            Some(cursor.scan()?)
        } else {
            cursor.err()?;
            None
        };
        cursor.close()?;
        Ok(first)
    }

    /// Prepare a named statement.
    pub fn prepare(&self, ctx: &Context, name: &str, sql: &str) -> Result<StatementDescription> {
        self.dispatch(ctx, &Call::Prepare { name, sql })?;
        Ok(StatementDescription {
            name: name.to_string(),
            sql: sql.to_string(),
        })
    }

    /// Release a prepared statement.
    pub fn deallocate(&self, ctx: &Context, name: &str) -> Result<()> {
        self.dispatch(ctx, &Call::Deallocate { name: Some(name) })?;
        self.mock.mark_deallocated(Some(name))
    }

    /// Release every prepared statement.
    pub fn deallocate_all(&self, ctx: &Context) -> Result<()> {
        self.dispatch(ctx, &Call::Deallocate { name: None })?;
        self.mock.mark_deallocated(None)
    }

    /// Bulk copy into `table`. Returns the number of copied rows.
    pub fn copy_from(
        &self,
        ctx: &Context,
        table: impl Into<Identifier>,
        columns: &[&str],
    ) -> Result<i64> {
        let table = table.into();
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let resolved = self.dispatch(
            ctx,
            &Call::CopyFrom {
                table: &table,
                columns: &columns,
            },
        )?;
        Ok(resolved.expectation.rows_affected())
    }

    pub fn ping(&self, ctx: &Context) -> Result<()> {
        self.dispatch(ctx, &Call::Ping).map(drop)
    }

    pub fn reset(&self, ctx: &Context) -> Result<()> {
        self.dispatch(ctx, &Call::Reset)?;
        self.mock.set_transaction_status(TransactionStatus::Idle);
        Ok(())
    }

    /// Send a batch. Failures surface on the first read of the results.
    pub fn send_batch(&self, ctx: &Context, batch: &Batch) -> BatchResults {
        let statements = batch.statements();
        match self.dispatch(ctx, &Call::Batch(statements)) {
            Ok(resolved) => BatchResults::new(resolved.expectation, statements.to_vec()),
            Err(err) => BatchResults::failed(err),
        }
    }

    /// Close the connection.
    pub fn close(self, ctx: &Context) -> Result<()> {
        self.dispatch(ctx, &Call::Close).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::CallModifier;
    use crate::rows::Rows;

    fn conn() -> Conn {
        Conn::new(Opts::default()).unwrap()
    }

    #[test]
    fn test_new_from_dsn() {
        let conn = Conn::new("pgmock://localhost/db?match_in_order=false").unwrap();
        assert_eq!(conn.dsn(), Some("pgmock://localhost/db?match_in_order=false"));
        assert!(Conn::new("mysql://localhost").is_err());
    }

    #[test]
    fn test_transaction_status() {
        let conn = conn();
        let ctx = Context::background();
        conn.expect_begin();
        conn.expect_exec("INSERT").will_return_error("duplicate");
        conn.expect_rollback();

        let tx = conn.begin(&ctx).unwrap();
        assert_eq!(conn.transaction_status(), TransactionStatus::InTransaction);
        assert!(tx.exec(&ctx, "INSERT INTO t VALUES (1)", ()).is_err());
        assert_eq!(conn.transaction_status(), TransactionStatus::Failed);
        tx.rollback(&ctx).unwrap();
        assert_eq!(conn.transaction_status(), TransactionStatus::Idle);
        assert!(conn.expectations_were_met().is_ok());
    }

    #[test]
    fn test_query_without_rows_fails() {
        let conn = conn();
        let ctx = Context::background();
        conn.expect_query("SELECT");
        let err = conn.query(&ctx, "SELECT 1", ()).unwrap_err();
        assert!(matches!(err, Error::InvalidUsage(_)));
    }

    #[test]
    fn test_query_first() {
        let conn = conn();
        let ctx = Context::background();
        conn.expect_query("SELECT name")
            .will_return_rows(Rows::new(["name"]).add_row(("john",)).add_row(("jane",)));
        conn.expect_query("SELECT name").will_return_rows(Rows::new(["name"]));
        let first: Option<(String,)> = conn.query_first(&ctx, "SELECT name FROM users", ()).unwrap();
        assert_eq!(first, Some(("john".to_string(),)));
        let none: Option<(String,)> = conn.query_first(&ctx, "SELECT name FROM users", ()).unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_run_transaction_rolls_back_open_transaction() {
        let conn = conn();
        let ctx = Context::background();
        conn.expect_begin();
        conn.expect_exec("UPDATE")
            .will_return_result(CommandTag::new("UPDATE", 1));
        conn.expect_rollback();

        let tag = conn
            .run_transaction(&ctx, |conn, _tx| conn.exec(&ctx, "UPDATE t SET x = 1", ()))
            .unwrap();
        assert_eq!(tag.rows_affected(), 1);
        assert!(!conn.in_transaction());
        assert!(conn.expectations_were_met().is_ok());
    }

    #[test]
    fn test_copy_from() {
        let conn = conn();
        let ctx = Context::background();
        conn.expect_copy_from(["public", "users"], ["id", "name"])
            .will_return_result(2);
        let n = conn
            .copy_from(&ctx, ["public", "users"], &["id", "name"])
            .unwrap();
        assert_eq!(n, 2);
    }
}
