//! Asynchronous mock connection.

use std::ops::Deref;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::sync::Arc;

use futures::FutureExt;

use crate::batch::Batch;
use crate::behavior::{apply_async, rows_of, tag_of};
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

/// Asynchronous mock connection.
///
/// Clones share the same expectations, so a connection can be moved into
/// several tasks and verified afterwards.
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
    pub async fn new<O: TryInto<Opts>>(opts: O) -> Result<Self>
    where
        Error: From<O::Error>,
    {
        let opts = opts.try_into()?;
        Ok(Self {
            mock: Arc::new(Mock::new(opts)),
        })
    }

    async fn dispatch(&self, ctx: &Context, call: &Call<'_>) -> Result<Resolved> {
        let resolved = self.mock.resolve(call)?;
        apply_async(&resolved, ctx).await?;
        Ok(resolved)
    }

    /// Start a transaction with default options.
    pub async fn begin(&self, ctx: &Context) -> Result<Transaction> {
        self.begin_tx(ctx, TxOptions::default()).await
    }

    /// Start a transaction.
    pub async fn begin_tx(&self, ctx: &Context, opts: TxOptions) -> Result<Transaction> {
        self.dispatch(ctx, &Call::Begin(&opts)).await?;
        self.mock.set_transaction_status(TransactionStatus::InTransaction);
        Ok(Transaction::new(self.clone()))
    }

    pub async fn commit(&self, ctx: &Context) -> Result<()> {
        let result = self.dispatch(ctx, &Call::Commit).await.map(drop);
        self.finish_transaction(&result);
        result
    }

    pub async fn rollback(&self, ctx: &Context) -> Result<()> {
        let result = self.dispatch(ctx, &Call::Rollback).await.map(drop);
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
    /// The closure gets its own handle to the connection. If it leaves the
    /// transaction open (it neither committed nor rolled back), the
    /// transaction is rolled back. This also happens when the closure's
    /// future panics; the panic then resumes after the rollback.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUsage` if called while already in a transaction.
    pub async fn run_transaction<F, R, Fut>(&self, ctx: &Context, f: F) -> Result<R>
    where
        F: FnOnce(Conn, Transaction) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        if self.in_transaction() {
            return Err(Error::InvalidUsage(
                "nested transactions are not supported".into(),
            ));
        }

        let tx = self.begin(ctx).await?;
        let result = match AssertUnwindSafe(f(self.clone(), tx)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                if self.in_transaction() {
                    // the closure's panic wins over anything the rollback does
                    let _ = AssertUnwindSafe(self.rollback(ctx)).catch_unwind().await;
                }
                resume_unwind(payload)
            }
        };

        if self.in_transaction() {
            let rollback_result = self.rollback(ctx).await;

            // Return the first error (either from closure or rollback)
            if let Err(e) = result {
                return Err(e);
            }
            rollback_result?;
        }

        result
    }

    /// Run a statement and return its command tag.
    pub async fn exec<S: IntoStatement, P: ToParams>(
        &self,
        ctx: &Context,
        statement: S,
        params: P,
    ) -> Result<CommandTag> {
        let call = StatementCall::from_params(statement.statement_text(), params);
        let result = match self.dispatch(ctx, &Call::Exec(&call)).await {
            Ok(resolved) => tag_of(&resolved, &call),
            Err(err) => Err(err),
        };
        self.mock.statement_finished(&result);
        result
    }

    /// Run a query and return a cursor over its rows.
    pub async fn query<S: IntoStatement, P: ToParams>(
        &self,
        ctx: &Context,
        statement: S,
        params: P,
    ) -> Result<RowCursor> {
        let call = StatementCall::from_params(statement.statement_text(), params);
        let result = match self.dispatch(ctx, &Call::Query(&call)).await {
            Ok(resolved) => rows_of(&resolved, &call),
            Err(err) => Err(err),
        };
        self.mock.statement_finished(&result);
        result
    }

    /// Run a query for a single row. Errors surface on `Row::scan`.
    pub async fn query_row<S: IntoStatement, P: ToParams>(
        &self,
        ctx: &Context,
        statement: S,
        params: P,
    ) -> Row {
        Row::new(self.query(ctx, statement, params).await)
    }

    /// Run a query and decode every row.
    pub async fn query_collect<T: FromRow, S: IntoStatement, P: ToParams>(
        &self,
        ctx: &Context,
        statement: S,
        params: P,
    ) -> Result<Vec<T>> {
        self.query(ctx, statement, params).await?.collect()
    }

    /// Run a query and decode the first row, if any.
    pub async fn query_first<T: FromRow, S: IntoStatement, P: ToParams>(
        &self,
        ctx: &Context,
        statement: S,
        params: P,
    ) -> Result<Option<T>> {
        let mut cursor = self.query(ctx, statement, params).await?;
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
    pub async fn prepare(
        &self,
        ctx: &Context,
        name: &str,
        sql: &str,
    ) -> Result<StatementDescription> {
        self.dispatch(ctx, &Call::Prepare { name, sql }).await?;
        Ok(StatementDescription {
            name: name.to_string(),
            sql: sql.to_string(),
        })
    }

    /// Release a prepared statement.
    pub async fn deallocate(&self, ctx: &Context, name: &str) -> Result<()> {
        self.dispatch(ctx, &Call::Deallocate { name: Some(name) }).await?;
        self.mock.mark_deallocated(Some(name))
    }

    /// Release every prepared statement.
    pub async fn deallocate_all(&self, ctx: &Context) -> Result<()> {
        self.dispatch(ctx, &Call::Deallocate { name: None }).await?;
        self.mock.mark_deallocated(None)
    }

    /// Bulk copy into `table`. Returns the number of copied rows.
    pub async fn copy_from(
        &self,
        ctx: &Context,
        table: impl Into<Identifier>,
        columns: &[&str],
    ) -> Result<i64> {
        let table = table.into();
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let resolved = self
            .dispatch(
                ctx,
                &Call::CopyFrom {
                    table: &table,
                    columns: &columns,
                },
            )
            .await?;
        Ok(resolved.expectation.rows_affected())
    }

    pub async fn ping(&self, ctx: &Context) -> Result<()> {
        self.dispatch(ctx, &Call::Ping).await.map(drop)
    }

    pub async fn reset(&self, ctx: &Context) -> Result<()> {
        self.dispatch(ctx, &Call::Reset).await?;
        self.mock.set_transaction_status(TransactionStatus::Idle);
        Ok(())
    }

    /// Send a batch. Failures surface on the first read of the results.
    pub async fn send_batch(&self, ctx: &Context, batch: &Batch) -> BatchResults {
        let statements = batch.statements();
        match self.dispatch(ctx, &Call::Batch(statements)).await {
            Ok(resolved) => BatchResults::new(resolved.expectation, statements.to_vec()),
            Err(err) => BatchResults::failed(err),
        }
    }

    /// Close the connection.
    pub async fn close(self, ctx: &Context) -> Result<()> {
        self.dispatch(ctx, &Call::Close).await.map(drop)
    }
}
