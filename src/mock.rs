//! The expectation queue and the dispatcher resolving calls against it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::call::Call;
use crate::copy::Identifier;
use crate::error::{Error, Result};
use crate::expectation::{
    BatchExpectation, ExpectationQueue, ExpectedBatch, ExpectedBegin, ExpectedClose,
    ExpectedCommit, ExpectedCopyFrom, ExpectedDeallocate, ExpectedExec, ExpectedPing,
    ExpectedPrepare, ExpectedQuery, ExpectedReset, ExpectedRollback, Kind, Resolved,
    check_guarded,
};
use crate::opts::Opts;
use crate::query_matcher::QueryMatcher;
use crate::tx::{TransactionStatus, TxOptions};

/// Shared state of a mock connection: the expectation queue, the active
/// query matcher and the simulated transaction status.
///
/// Both facades deref to this type, so expectations are registered on the
/// connection itself:
///
/// ```
/// use zero_postgres_mock::{CallModifier, Mock, Opts, Rows};
///
/// let mock = Mock::new(Opts::default());
/// mock.expect_query("SELECT id FROM articles")
///     .with_args((5_i32,))
///     .will_return_rows(Rows::new(["id"]).add_row((5_i32,)));
/// assert!(mock.expectations_were_met().is_err());
/// ```
///
/// Registration is meant for single-threaded test setup; resolution and
/// `expectations_were_met` may run concurrently from many threads.
pub struct Mock {
    queue: Arc<ExpectationQueue>,
    matcher: Arc<dyn QueryMatcher>,
    ordered: AtomicBool,
    status: Mutex<TransactionStatus>,
    dsn: Option<String>,
}

impl std::fmt::Debug for Mock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mock")
            .field("ordered", &self.ordered.load(Ordering::Relaxed))
            .field("status", &*self.status.lock())
            .field("dsn", &self.dsn)
            .finish_non_exhaustive()
    }
}

impl Mock {
    pub fn new(opts: Opts) -> Self {
        Self {
            queue: Arc::new(ExpectationQueue::default()),
            matcher: opts.query_matcher,
            ordered: AtomicBool::new(opts.match_in_order),
            status: Mutex::new(TransactionStatus::Idle),
            dsn: opts.dsn,
        }
    }

    /// DSN the mock was created from, if any.
    pub fn dsn(&self) -> Option<&str> {
        self.dsn.as_deref()
    }

    // === Registration ===

    pub fn expect_close(&self) -> ExpectedClose {
        ExpectedClose::new(self.queue.push(Kind::Close))
    }

    pub fn expect_begin(&self) -> ExpectedBegin {
        self.expect_begin_tx(TxOptions::default())
    }

    pub fn expect_begin_tx(&self, opts: TxOptions) -> ExpectedBegin {
        ExpectedBegin::new(self.queue.push(Kind::Begin { opts }))
    }

    pub fn expect_commit(&self) -> ExpectedCommit {
        ExpectedCommit::new(self.queue.push(Kind::Commit))
    }

    pub fn expect_rollback(&self) -> ExpectedRollback {
        ExpectedRollback::new(self.queue.push(Kind::Rollback))
    }

    /// Expect a query whose SQL matches `sql` under the active query matcher.
    pub fn expect_query(&self, sql: &str) -> ExpectedQuery {
        let expectation = self.queue.push(ExpectedQuery::query_kind(sql));
        ExpectedQuery::new(expectation, Arc::clone(&self.matcher))
    }

    /// Expect an exec whose SQL matches `sql` under the active query matcher.
    pub fn expect_exec(&self, sql: &str) -> ExpectedExec {
        let expectation = self.queue.push(ExpectedExec::exec_kind(sql));
        ExpectedExec::new(expectation, Arc::clone(&self.matcher))
    }

    /// Expect `prepare(name, sql)`. The name must be equal; `sql` is matched
    /// by the active query matcher.
    pub fn expect_prepare(&self, name: &str, sql: &str) -> ExpectedPrepare {
        let expectation = self.queue.push(ExpectedPrepare::prepare_kind(name, sql));
        ExpectedPrepare::new(expectation, Arc::clone(&self.queue), Arc::clone(&self.matcher))
    }

    pub fn expect_deallocate(&self, name: &str) -> ExpectedDeallocate {
        ExpectedDeallocate::new(self.queue.push(Kind::Deallocate {
            name: Some(name.to_string()),
        }))
    }

    pub fn expect_deallocate_all(&self) -> ExpectedDeallocate {
        ExpectedDeallocate::new(self.queue.push(Kind::Deallocate { name: None }))
    }

    pub fn expect_copy_from<I, S>(&self, table: impl Into<Identifier>, columns: I) -> ExpectedCopyFrom
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExpectedCopyFrom::new(self.queue.push(Kind::CopyFrom {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows_affected: 0,
        }))
    }

    pub fn expect_ping(&self) -> ExpectedPing {
        ExpectedPing::new(self.queue.push(Kind::Ping))
    }

    pub fn expect_reset(&self) -> ExpectedReset {
        ExpectedReset::new(self.queue.push(Kind::Reset))
    }

    pub fn expect_batch(&self) -> ExpectedBatch {
        let expectation = self.queue.push(Kind::Batch(BatchExpectation::default()));
        ExpectedBatch::new(expectation, Arc::clone(&self.matcher))
    }

    // === Configuration and verification ===

    /// Whether calls must arrive in registration order. Takes effect on the
    /// next call.
    pub fn match_expectations_in_order(&self, ordered: bool) {
        self.ordered.store(ordered, Ordering::Relaxed);
    }

    /// Check that every required expectation was met and that everything
    /// flagged to be closed was closed.
    ///
    /// Returns the first failure in registration order.
    pub fn expectations_were_met(&self) -> Result<()> {
        for expectation in self.queue.snapshot() {
            expectation.verify()?;
        }
        Ok(())
    }

    /// Simulated transaction status.
    pub fn transaction_status(&self) -> TransactionStatus {
        *self.status.lock()
    }

    /// Returns true if in a transaction (active or failed).
    pub fn in_transaction(&self) -> bool {
        self.transaction_status().in_transaction()
    }

    pub(crate) fn set_transaction_status(&self, status: TransactionStatus) {
        *self.status.lock() = status;
    }

    /// Record the result of a statement: an error inside a transaction
    /// aborts it.
    pub(crate) fn statement_finished<T>(&self, result: &Result<T>) {
        if result.is_err() {
            let mut status = self.status.lock();
            if *status == TransactionStatus::InTransaction {
                *status = TransactionStatus::Failed;
            }
        }
    }

    // === Dispatch ===

    /// Find the expectation answering `call` and trigger it.
    ///
    /// Every candidate is locked on its own while it is inspected; no lock
    /// is held once this returns. A panic raised by an argument matcher
    /// while checking the selected expectation in ordered mode propagates.
    pub(crate) fn resolve(&self, call: &Call<'_>) -> Result<Resolved> {
        let queue = self.queue.snapshot();
        let ordered = self.ordered.load(Ordering::Relaxed);
        let kind = call.kind();
        let mut fulfilled = 0;

        for expectation in &queue {
            let mut state = expectation.lock();
            if state.common.fulfilled() {
                fulfilled += 1;
                continue;
            }

            if ordered {
                if state.kind.op_kind() != kind {
                    if state.common.required() {
                        debug!(call = %call, "next expectation is of a different kind");
                        return Err(Error::UnexpectedCall(format!(
                            "call to {}, was not expected, next expectation is: {}",
                            call, *state
                        )));
                    }
                    trace!(call = %call, "skipping optional expectation");
                    continue;
                }
                if let Err(detail) = state.check(call, self.matcher.as_ref()) {
                    debug!(call = %call, %detail, "next expectation does not match");
                    return Err(Error::Mismatch {
                        detail,
                        expected: state.to_string(),
                    });
                }
                debug!(call = %call, "matched expectation");
                return Ok(expectation.trigger(&mut state));
            }

            if state.kind.op_kind() != kind {
                continue;
            }
            match check_guarded(&state, call, self.matcher.as_ref()) {
                Ok(Ok(())) => {
                    debug!(call = %call, "matched expectation");
                    return Ok(expectation.trigger(&mut state));
                }
                Ok(Err(detail)) => trace!(call = %call, %detail, "expectation does not match"),
                Err(err) => trace!(call = %call, %err, "argument matcher panicked"),
            }
        }

        debug!(call = %call, "call was not expected");
        let msg = format!("call to {} was not expected", call);
        if !queue.is_empty() && fulfilled == queue.len() {
            Err(Error::UnexpectedCall(format!(
                "all expectations were already fulfilled, {}",
                msg
            )))
        } else {
            Err(Error::UnexpectedCall(msg))
        }
    }

    /// Flag statements named `name` (all of them for `None`) that were
    /// prepared and not yet deallocated. Returns the first programmed close
    /// error among them.
    pub(crate) fn mark_deallocated(&self, name: Option<&str>) -> Result<()> {
        let mut first_error = None;
        for expectation in self.queue.snapshot() {
            let mut state = expectation.lock();
            let prepared = state.common.triggered > 0;
            if let Kind::Prepare(p) = &mut state.kind
                && prepared
                && !p.was_closed
                && name.is_none_or(|name| name == p.name)
            {
                p.was_closed = true;
                if first_error.is_none() {
                    first_error = p.close_error.clone();
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
