//! Handles returned by the `expect_*` registration calls.
//!
//! A handle shares its expectation with the queue, so configuration applied
//! through it is visible to the dispatcher immediately.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::{
    Expectation, ExpectationQueue, ExecExpectation, Kind, Outcome, PrepareExpectation,
    QueryCriteria, QueryExpectation, check_guarded,
};
use crate::call::{Call, StatementCall};
use crate::error::{Error, Result};
use crate::query_matcher::QueryMatcher;
use crate::result::CommandTag;
use crate::rows::Rows;
use crate::types::ToParams;

/// Call behavior shared by every expectation handle.
///
/// ```
/// use std::time::Duration;
/// use zero_postgres_mock::{CallModifier, Mock, Opts};
///
/// let mock = Mock::new(Opts::default());
/// mock.expect_ping()
///     .times(2)
///     .will_delay_for(Duration::from_millis(5))
///     .will_return_error("connection reset");
/// ```
pub trait CallModifier: Sized {
    /// Do not fail `expectations_were_met` if this is never called.
    fn maybe(self) -> Self;

    /// Expect `n` calls instead of one.
    fn times(self, n: u32) -> Self;

    /// Hold the call for `delay` before answering. The caller's context can
    /// interrupt the delay.
    fn will_delay_for(self, delay: Duration) -> Self;

    /// Answer the call with `err`.
    fn will_return_error(self, err: impl Into<Error>) -> Self;

    /// Panic with `payload` instead of answering.
    fn will_panic(self, payload: impl Into<String>) -> Self;
}

macro_rules! impl_call_modifier {
    ($($handle:ident),+ $(,)?) => {
        $(
            impl CallModifier for $handle {
                fn maybe(self) -> Self {
                    self.expectation.lock().common.optional = true;
                    self
                }

                fn times(self, n: u32) -> Self {
                    self.expectation.lock().common.planned_calls = n;
                    self
                }

                fn will_delay_for(self, delay: Duration) -> Self {
                    self.expectation.lock().common.delay = delay;
                    self
                }

                fn will_return_error(self, err: impl Into<Error>) -> Self {
                    self.expectation.lock().common.outcome = Outcome::Error(err.into());
                    self
                }

                fn will_panic(self, payload: impl Into<String>) -> Self {
                    self.expectation.lock().common.outcome = Outcome::Panic(payload.into());
                    self
                }
            }

            impl fmt::Display for $handle {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", *self.expectation.lock())
                }
            }

            impl fmt::Debug for $handle {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($handle))
                        .field("state", &*self.expectation.lock())
                        .finish()
                }
            }
        )+
    };
}

macro_rules! simple_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub struct $name {
            expectation: Arc<Expectation>,
        }

        impl $name {
            pub(crate) fn new(expectation: Arc<Expectation>) -> Self {
                Self { expectation }
            }
        }
    };
}

simple_handle!(
    /// Expects `close`.
    ExpectedClose
);
simple_handle!(
    /// Expects `begin` or `begin_tx`.
    ExpectedBegin
);
simple_handle!(
    /// Expects a transaction commit.
    ExpectedCommit
);
simple_handle!(
    /// Expects a transaction rollback.
    ExpectedRollback
);
simple_handle!(
    /// Expects `deallocate` or `deallocate_all`.
    ExpectedDeallocate
);
simple_handle!(
    /// Expects `ping`.
    ExpectedPing
);
simple_handle!(
    /// Expects `reset`.
    ExpectedReset
);

/// Expects `query` or `query_row`.
pub struct ExpectedQuery {
    expectation: Arc<Expectation>,
    matcher: Arc<dyn QueryMatcher>,
}

impl ExpectedQuery {
    pub(crate) fn new(expectation: Arc<Expectation>, matcher: Arc<dyn QueryMatcher>) -> Self {
        Self {
            expectation,
            matcher,
        }
    }

    pub(crate) fn query_kind(sql: &str) -> Kind {
        Kind::Query(QueryExpectation {
            criteria: QueryCriteria::new(sql),
            ..QueryExpectation::default()
        })
    }

    fn update(self, f: impl FnOnce(&mut QueryExpectation)) -> Self {
        if let Kind::Query(q) = &mut self.expectation.lock().kind {
            f(q);
        }
        self
    }

    /// Arguments the query must be called with.
    pub fn with_args(self, params: impl ToParams) -> Self {
        let args = params.to_params();
        self.update(|q| q.criteria.args = args)
    }

    /// Pattern for the SQL after named arguments were rewritten to `$n`.
    pub fn with_rewritten_sql(self, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        self.update(|q| q.criteria.rewritten_sql = Some(sql))
    }

    /// Answer with a single result set.
    pub fn will_return_rows(self, rows: Rows) -> Self {
        self.update(|q| q.rows = Some(vec![rows]))
    }

    /// Answer with several result sets, read with `next_result_set`.
    pub fn will_return_row_sets(self, sets: Vec<Rows>) -> Self {
        self.update(|q| q.rows = Some(sets))
    }

    /// Require the returned cursor to be closed.
    pub fn rows_will_be_closed(self) -> Self {
        self.update(|q| q.rows_must_be_closed = true)
    }

    /// Check a call against this expectation without triggering it.
    ///
    /// A panicking argument matcher is reported as `Error::ArgumentMatcher`.
    pub fn try_match(&self, sql: &str, params: impl ToParams) -> Result<()> {
        let call = StatementCall::from_params(sql, params);
        try_match(&self.expectation, &Call::Query(&call), self.matcher.as_ref())
    }
}

/// Expects `exec`.
pub struct ExpectedExec {
    expectation: Arc<Expectation>,
    matcher: Arc<dyn QueryMatcher>,
}

impl ExpectedExec {
    pub(crate) fn new(expectation: Arc<Expectation>, matcher: Arc<dyn QueryMatcher>) -> Self {
        Self {
            expectation,
            matcher,
        }
    }

    pub(crate) fn exec_kind(sql: &str) -> Kind {
        Kind::Exec(ExecExpectation {
            criteria: QueryCriteria::new(sql),
            result: None,
        })
    }

    fn update(self, f: impl FnOnce(&mut ExecExpectation)) -> Self {
        if let Kind::Exec(e) = &mut self.expectation.lock().kind {
            f(e);
        }
        self
    }

    /// Arguments the statement must be called with.
    pub fn with_args(self, params: impl ToParams) -> Self {
        let args = params.to_params();
        self.update(|e| e.criteria.args = args)
    }

    /// Pattern for the SQL after named arguments were rewritten to `$n`.
    pub fn with_rewritten_sql(self, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        self.update(|e| e.criteria.rewritten_sql = Some(sql))
    }

    /// Command tag returned on success.
    pub fn will_return_result(self, tag: CommandTag) -> Self {
        self.update(|e| e.result = Some(tag))
    }

    /// Check a call against this expectation without triggering it.
    ///
    /// A panicking argument matcher is reported as `Error::ArgumentMatcher`.
    pub fn try_match(&self, sql: &str, params: impl ToParams) -> Result<()> {
        let call = StatementCall::from_params(sql, params);
        try_match(&self.expectation, &Call::Exec(&call), self.matcher.as_ref())
    }
}

fn try_match(expectation: &Expectation, call: &Call<'_>, matcher: &dyn QueryMatcher) -> Result<()> {
    let state = expectation.lock();
    match check_guarded(&state, call, matcher)? {
        Ok(()) => Ok(()),
        Err(detail) => Err(Error::Mismatch {
            detail,
            expected: state.to_string(),
        }),
    }
}

/// Expects `prepare`.
pub struct ExpectedPrepare {
    expectation: Arc<Expectation>,
    queue: Arc<ExpectationQueue>,
    matcher: Arc<dyn QueryMatcher>,
}

impl ExpectedPrepare {
    pub(crate) fn new(
        expectation: Arc<Expectation>,
        queue: Arc<ExpectationQueue>,
        matcher: Arc<dyn QueryMatcher>,
    ) -> Self {
        Self {
            expectation,
            queue,
            matcher,
        }
    }

    pub(crate) fn prepare_kind(name: &str, sql: &str) -> Kind {
        Kind::Prepare(PrepareExpectation {
            name: name.to_string(),
            sql: sql.to_string(),
            ..PrepareExpectation::default()
        })
    }

    fn update(self, f: impl FnOnce(&mut PrepareExpectation)) -> Self {
        if let Kind::Prepare(p) = &mut self.expectation.lock().kind {
            f(p);
        }
        self
    }

    fn name(&self) -> String {
        match &self.expectation.lock().kind {
            Kind::Prepare(p) => p.name.clone(),
            _ => String::new(),
        }
    }

    /// Require the statement to be deallocated.
    pub fn will_be_closed(self) -> Self {
        self.update(|p| p.must_be_closed = true)
    }

    /// Error returned when the statement is deallocated.
    pub fn will_return_close_error(self, err: impl Into<Error>) -> Self {
        let err = err.into();
        self.update(|p| p.close_error = Some(err))
    }

    /// Queue a query executing this statement by name.
    pub fn expect_query(&self) -> ExpectedQuery {
        let expectation = self.queue.push(ExpectedQuery::query_kind(&self.name()));
        ExpectedQuery::new(expectation, Arc::clone(&self.matcher))
    }

    /// Queue an exec running this statement by name.
    pub fn expect_exec(&self) -> ExpectedExec {
        let expectation = self.queue.push(ExpectedExec::exec_kind(&self.name()));
        ExpectedExec::new(expectation, Arc::clone(&self.matcher))
    }
}

/// Expects `copy_from`.
pub struct ExpectedCopyFrom {
    expectation: Arc<Expectation>,
}

impl ExpectedCopyFrom {
    pub(crate) fn new(expectation: Arc<Expectation>) -> Self {
        Self { expectation }
    }

    /// Number of copied rows reported on success.
    pub fn will_return_result(self, rows: i64) -> Self {
        if let Kind::CopyFrom { rows_affected, .. } = &mut self.expectation.lock().kind {
            *rows_affected = rows;
        }
        self
    }
}

/// Expects `send_batch`.
///
/// Statements queued on the handle are checked when the batch is sent and
/// answered one by one, in order, as the batch results are read.
pub struct ExpectedBatch {
    expectation: Arc<Expectation>,
    matcher: Arc<dyn QueryMatcher>,
}

impl ExpectedBatch {
    pub(crate) fn new(expectation: Arc<Expectation>, matcher: Arc<dyn QueryMatcher>) -> Self {
        Self {
            expectation,
            matcher,
        }
    }

    fn push(&self, kind: Kind) -> Arc<Expectation> {
        let element = Arc::new(Expectation::new(kind));
        if let Kind::Batch(b) = &mut self.expectation.lock().kind {
            b.elements.push(Arc::clone(&element));
        }
        element
    }

    /// Queue a query inside the batch.
    pub fn expect_query(&self, sql: &str) -> ExpectedQuery {
        let element = self.push(ExpectedQuery::query_kind(sql));
        ExpectedQuery::new(element, Arc::clone(&self.matcher))
    }

    /// Queue an exec inside the batch.
    pub fn expect_exec(&self, sql: &str) -> ExpectedExec {
        let element = self.push(ExpectedExec::exec_kind(sql));
        ExpectedExec::new(element, Arc::clone(&self.matcher))
    }

    /// Require the batch results to be closed.
    pub fn will_be_closed(self) -> Self {
        if let Kind::Batch(b) = &mut self.expectation.lock().kind {
            b.must_be_closed = true;
        }
        self
    }
}

impl_call_modifier!(
    ExpectedClose,
    ExpectedBegin,
    ExpectedCommit,
    ExpectedRollback,
    ExpectedQuery,
    ExpectedExec,
    ExpectedPrepare,
    ExpectedDeallocate,
    ExpectedCopyFrom,
    ExpectedPing,
    ExpectedReset,
    ExpectedBatch,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::arg_fn;
    use crate::query_matcher::QueryMatcherRegexp;
    use crate::types::SqlValue;

    fn matcher() -> Arc<dyn QueryMatcher> {
        Arc::new(QueryMatcherRegexp::new())
    }

    #[test]
    fn test_modifiers_update_state() {
        let queue = ExpectationQueue::default();
        let handle = ExpectedPing::new(queue.push(Kind::Ping))
            .times(3)
            .maybe()
            .will_delay_for(Duration::from_millis(2))
            .will_return_error("down");
        let state = handle.expectation.lock();
        assert_eq!(state.common.planned_calls, 3);
        assert!(state.common.optional);
        assert_eq!(state.common.delay, Duration::from_millis(2));
        assert!(matches!(state.common.outcome, Outcome::Error(_)));
    }

    #[test]
    fn test_panic_replaces_error() {
        let queue = ExpectationQueue::default();
        let handle = ExpectedCommit::new(queue.push(Kind::Commit))
            .will_return_error("x")
            .will_panic("boom");
        assert!(matches!(
            handle.expectation.lock().common.outcome,
            Outcome::Panic(ref p) if p == "boom"
        ));
    }

    #[test]
    fn test_try_match() {
        let queue = ExpectationQueue::default();
        let handle = ExpectedExec::new(
            queue.push(ExpectedExec::exec_kind("INSERT INTO users")),
            matcher(),
        )
        .with_args((1_i32, "john"));
        assert!(handle.try_match("INSERT INTO users(id, name) VALUES ($1, $2)", (1_i32, "john")).is_ok());
        let err = handle.try_match("INSERT INTO users", (2_i32, "john")).unwrap_err();
        assert!(matches!(err, Error::Mismatch { .. }));
        // not triggered by try_match
        assert_eq!(handle.expectation.lock().common.triggered, 0);
    }

    #[test]
    fn test_try_match_catches_matcher_panic() {
        let queue = ExpectationQueue::default();
        let exploding = arg_fn("exploding", |_: &dyn SqlValue| panic!("matcher blew up"));
        let handle = ExpectedQuery::new(queue.push(ExpectedQuery::query_kind("SELECT")), matcher())
            .with_args(vec![exploding]);
        let err = handle.try_match("SELECT 1", (1_i32,)).unwrap_err();
        assert_eq!(err.to_string(), "argument matcher failed: matcher blew up");
    }

    #[test]
    fn test_prepare_registers_by_name() {
        let queue = Arc::new(ExpectationQueue::default());
        let prepare = ExpectedPrepare::new(
            queue.push(ExpectedPrepare::prepare_kind("get_user", "SELECT")),
            Arc::clone(&queue),
            matcher(),
        );
        let _ = prepare.expect_query();
        let items = queue.snapshot();
        assert_eq!(items.len(), 2);
        match &items[1].lock().kind {
            Kind::Query(q) => assert_eq!(q.criteria.sql, "get_user"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_batch_elements_stay_out_of_queue() {
        let queue = ExpectationQueue::default();
        let batch = ExpectedBatch::new(
            queue.push(Kind::Batch(super::super::BatchExpectation::default())),
            matcher(),
        );
        let _ = batch.expect_query("SELECT 1");
        let _ = batch.expect_exec("UPDATE t");
        assert_eq!(queue.snapshot().len(), 1);
        assert_eq!(batch.expectation.batch_elements().len(), 2);
    }
}
