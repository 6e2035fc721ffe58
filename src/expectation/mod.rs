//! Expectations: what a test declares it will be called with, and how the
//! mock should answer.
//!
//! Every expectation carries its own lock. The queue only hands out shared
//! references, so resolving a call locks one candidate at a time.

mod display;
mod handles;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::call::{Call, OpKind, StatementCall};
use crate::copy::Identifier;
use crate::error::Error;
use crate::query_matcher::QueryMatcher;
use crate::result::CommandTag;
use crate::rows::Rows;
use crate::tx::TxOptions;
use crate::types::{Arg, SqlValue};

pub use handles::{
    CallModifier, ExpectedBatch, ExpectedBegin, ExpectedClose, ExpectedCommit, ExpectedCopyFrom,
    ExpectedDeallocate, ExpectedExec, ExpectedPing, ExpectedPrepare, ExpectedQuery,
    ExpectedReset, ExpectedRollback,
};

/// What a matched call delivers once its delay has elapsed.
#[derive(Debug, Clone, Default)]
pub(crate) enum Outcome {
    #[default]
    Return,
    Error(Error),
    Panic(String),
}

/// Call behavior shared by every expectation kind.
#[derive(Debug, Default)]
pub(crate) struct Common {
    pub triggered: u32,
    /// 0 means "not set", which counts as 1
    pub planned_calls: u32,
    pub optional: bool,
    pub delay: Duration,
    pub outcome: Outcome,
}

impl Common {
    pub fn fulfilled(&self) -> bool {
        self.triggered >= self.planned_calls.max(1)
    }

    pub fn required(&self) -> bool {
        !self.optional
    }
}

/// SQL pattern, rewritten SQL pattern and arguments of a Query/Exec.
#[derive(Debug, Clone, Default)]
pub(crate) struct QueryCriteria {
    pub sql: String,
    pub rewritten_sql: Option<String>,
    pub args: Vec<Arg>,
}

impl QueryCriteria {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Self::default()
        }
    }

    /// Compare against an actual statement. `label` prefixes the messages
    /// ("Query" or "ExecQuery").
    ///
    /// Argument matchers run unguarded: a panicking matcher unwinds through
    /// this call.
    pub fn check(
        &self,
        label: &str,
        matcher: &dyn QueryMatcher,
        call: &StatementCall,
    ) -> Result<(), String> {
        matcher
            .matches(&self.sql, &call.sql)
            .map_err(|e| format!("{}: {}", label, e))?;
        if let (Some(expected), Some(actual)) = (&self.rewritten_sql, &call.rewritten_sql) {
            matcher.matches(expected, actual).map_err(|e| {
                format!("{} '{}', rewritten sql does not match: {}", label, call.sql, e)
            })?;
        }
        args_match(&self.args, &call.sql, &call.args)
            .map_err(|e| format!("{} '{}', arguments do not match: {}", label, call.sql, e))
    }
}

/// Positional comparison of expected arguments against actual ones.
///
/// An expectation whose only argument is `NamedArgs` is rewritten against the
/// actual SQL first.
pub(crate) fn args_match(expected: &[Arg], sql: &str, actual: &[Arg]) -> Result<(), String> {
    let rewritten;
    let expected = match expected {
        [Arg::Named(named)] => {
            rewritten = named.rewrite(sql).1;
            rewritten.as_slice()
        }
        _ => expected,
    };

    if expected.len() != actual.len() {
        return Err(format!(
            "expected {}, but got {} arguments",
            expected.len(),
            actual.len()
        ));
    }

    for (k, (want, got)) in expected.iter().zip(actual).enumerate() {
        let Some(got_value) = got.as_value() else {
            return Err(format!("argument {} is not a concrete value: {:?}", k, got));
        };
        match want {
            Arg::Matcher(m) => {
                if !m.matches(got_value) {
                    return Err(format!(
                        "matcher {:?} could not match {} argument {} - {:?}",
                        m,
                        k,
                        got_value.type_name(),
                        got_value
                    ));
                }
            }
            Arg::Value(v) => {
                if !v.eq_value(got_value) {
                    return Err(value_mismatch(k, v.as_ref(), got_value));
                }
            }
            Arg::Named(n) => {
                return Err(format!(
                    "argument {} expected [NamedArgs - {:?}] does not match actual [{} - {:?}]",
                    k,
                    n,
                    got_value.type_name(),
                    got_value
                ));
            }
        }
    }
    Ok(())
}

fn value_mismatch(k: usize, want: &dyn SqlValue, got: &dyn SqlValue) -> String {
    format!(
        "argument {} expected [{} - {:?}] does not match actual [{} - {:?}]",
        k,
        want.type_name(),
        want,
        got.type_name(),
        got
    )
}

#[derive(Debug, Default)]
pub(crate) struct QueryExpectation {
    pub criteria: QueryCriteria,
    pub rows: Option<Vec<Rows>>,
    pub rows_must_be_closed: bool,
    pub rows_were_closed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ExecExpectation {
    pub criteria: QueryCriteria,
    pub result: Option<CommandTag>,
}

#[derive(Debug, Default)]
pub(crate) struct PrepareExpectation {
    pub name: String,
    pub sql: String,
    pub must_be_closed: bool,
    pub was_closed: bool,
    pub close_error: Option<Error>,
}

#[derive(Debug, Default)]
pub(crate) struct BatchExpectation {
    pub elements: Vec<Arc<Expectation>>,
    pub must_be_closed: bool,
    pub closed: bool,
}

/// Variant-specific part of an expectation.
#[derive(Debug)]
pub(crate) enum Kind {
    Close,
    Begin { opts: TxOptions },
    Commit,
    Rollback,
    Query(QueryExpectation),
    Exec(ExecExpectation),
    Prepare(PrepareExpectation),
    /// `None` expects `deallocate_all`
    Deallocate { name: Option<String> },
    CopyFrom {
        table: Identifier,
        columns: Vec<String>,
        rows_affected: i64,
    },
    Ping,
    Reset,
    Batch(BatchExpectation),
}

impl Kind {
    pub fn op_kind(&self) -> OpKind {
        match self {
            Kind::Close => OpKind::Close,
            Kind::Begin { .. } => OpKind::Begin,
            Kind::Commit => OpKind::Commit,
            Kind::Rollback => OpKind::Rollback,
            Kind::Query(_) => OpKind::Query,
            Kind::Exec(_) => OpKind::Exec,
            Kind::Prepare(_) => OpKind::Prepare,
            Kind::Deallocate { .. } => OpKind::Deallocate,
            Kind::CopyFrom { .. } => OpKind::CopyFrom,
            Kind::Ping => OpKind::Ping,
            Kind::Reset => OpKind::Reset,
            Kind::Batch(_) => OpKind::Batch,
        }
    }
}

#[derive(Debug)]
pub(crate) struct ExpectationState {
    pub common: Common,
    pub kind: Kind,
}

impl ExpectationState {
    /// Compare the discriminators of `call` with this expectation.
    ///
    /// The caller has already checked that the operation kinds agree.
    pub fn check(&self, call: &Call<'_>, matcher: &dyn QueryMatcher) -> Result<(), String> {
        match (&self.kind, call) {
            (Kind::Begin { opts }, Call::Begin(actual)) => {
                if opts == *actual {
                    Ok(())
                } else {
                    Err(format!(
                        "Begin: call with transaction options '{:?}' was not expected, expected options are '{:?}'",
                        actual, opts
                    ))
                }
            }
            (Kind::Query(q), Call::Query(actual)) => q.criteria.check("Query", matcher, actual),
            (Kind::Exec(e), Call::Exec(actual)) => e.criteria.check("ExecQuery", matcher, actual),
            (Kind::Prepare(p), Call::Prepare { name, sql }) => {
                if p.name != *name {
                    return Err(format!(
                        "Prepare: prepared statement name '{}' was not expected, expected name is '{}'",
                        name, p.name
                    ));
                }
                matcher
                    .matches(&p.sql, sql)
                    .map_err(|e| format!("Prepare: {}", e))
            }
            (Kind::Deallocate { name: expected }, Call::Deallocate { name: actual }) => {
                match (expected.as_deref(), actual) {
                    (None, None) => Ok(()),
                    (Some(e), Some(a)) if e == *a => Ok(()),
                    (Some(e), Some(a)) => Err(format!(
                        "Deallocate: statement name '{}' was not expected, expected name is '{}'",
                        a, e
                    )),
                    (Some(e), None) => Err(format!(
                        "Deallocate: call to deallocate all statements was not expected, expected name is '{}'",
                        e
                    )),
                    (None, Some(a)) => Err(format!(
                        "Deallocate: statement name '{}' was not expected, expected all statements",
                        a
                    )),
                }
            }
            (
                Kind::CopyFrom { table, columns, .. },
                Call::CopyFrom {
                    table: actual_table,
                    columns: actual_columns,
                },
            ) => {
                if table != *actual_table {
                    return Err(format!(
                        "CopyFrom: table name '{}' was not expected, expected table name is '{}'",
                        actual_table, table
                    ));
                }
                if columns.as_slice() != *actual_columns {
                    return Err(format!(
                        "CopyFrom: column names '{:?}' were not expected, expected column names are '{:?}'",
                        actual_columns, columns
                    ));
                }
                Ok(())
            }
            (Kind::Batch(b), Call::Batch(statements)) => {
                if b.elements.len() != statements.len() {
                    return Err(format!(
                        "SendBatch: expected {} queued statements, but got {}",
                        b.elements.len(),
                        statements.len()
                    ));
                }
                for (i, (element, statement)) in b.elements.iter().zip(statements.iter()).enumerate() {
                    let state = element.lock();
                    let result = match &state.kind {
                        Kind::Query(q) => q.criteria.check("Query", matcher, statement),
                        Kind::Exec(e) => e.criteria.check("ExecQuery", matcher, statement),
                        _ => Ok(()),
                    };
                    result.map_err(|e| format!("SendBatch: statement {}: {}", i, e))?;
                }
                Ok(())
            }
            (Kind::Close, Call::Close)
            | (Kind::Commit, Call::Commit)
            | (Kind::Rollback, Call::Rollback)
            | (Kind::Ping, Call::Ping)
            | (Kind::Reset, Call::Reset) => Ok(()),
            _ => Err(format!(
                "call to {} does not fit expectation kind {:?}",
                call,
                self.kind.op_kind()
            )),
        }
    }
}

/// Panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// [`ExpectationState::check`] with matcher panics caught and reported as
/// [`Error::ArgumentMatcher`].
pub(crate) fn check_guarded(
    state: &ExpectationState,
    call: &Call<'_>,
    matcher: &dyn QueryMatcher,
) -> Result<Result<(), String>, Error> {
    catch_unwind(AssertUnwindSafe(|| state.check(call, matcher)))
        .map_err(|payload| Error::ArgumentMatcher(panic_message(payload.as_ref())))
}

/// A single queued expectation.
#[derive(Debug)]
pub(crate) struct Expectation {
    state: Mutex<ExpectationState>,
}

impl Expectation {
    pub fn new(kind: Kind) -> Self {
        Self {
            state: Mutex::new(ExpectationState {
                common: Common::default(),
                kind,
            }),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, ExpectationState> {
        self.state.lock()
    }

    pub fn mark_rows_closed(&self) {
        if let Kind::Query(q) = &mut self.lock().kind {
            q.rows_were_closed = true;
        }
    }

    pub fn mark_batch_closed(&self) {
        if let Kind::Batch(b) = &mut self.lock().kind {
            b.closed = true;
        }
    }

    /// Rows programmed on a Query expectation.
    pub fn rows(&self) -> Option<Vec<Rows>> {
        match &self.lock().kind {
            Kind::Query(q) => q.rows.clone(),
            _ => None,
        }
    }

    /// Command tag programmed on an Exec expectation.
    pub fn command_tag(&self) -> Option<CommandTag> {
        match &self.lock().kind {
            Kind::Exec(e) => e.result.clone(),
            _ => None,
        }
    }

    pub fn rows_affected(&self) -> i64 {
        match &self.lock().kind {
            Kind::CopyFrom { rows_affected, .. } => *rows_affected,
            _ => 0,
        }
    }

    pub fn batch_elements(&self) -> Vec<Arc<Expectation>> {
        match &self.lock().kind {
            Kind::Batch(b) => b.elements.clone(),
            _ => Vec::new(),
        }
    }

    /// Record one call and return what it should deliver.
    pub fn trigger(self: &Arc<Self>, state: &mut ExpectationState) -> Resolved {
        state.common.triggered += 1;
        Resolved {
            expectation: Arc::clone(self),
            delay: state.common.delay,
            outcome: state.common.outcome.clone(),
        }
    }

    /// Lock and trigger.
    pub fn trigger_now(self: &Arc<Self>) -> Resolved {
        let mut state = self.lock();
        self.trigger(&mut state)
    }

    /// Whether this expectation passes the completeness check.
    pub fn verify(&self) -> Result<(), Error> {
        let state = self.lock();
        if !state.common.fulfilled() {
            if state.common.required() {
                return Err(Error::Unfulfilled(format!(
                    "there is a remaining expectation which was not matched: {}",
                    state
                )));
            }
            if state.common.triggered == 0 {
                return Ok(());
            }
        }
        match &state.kind {
            Kind::Prepare(p) if p.must_be_closed && !p.was_closed => {
                Err(Error::Unfulfilled(format!(
                    "expected prepared statement to be closed, but it was not: {}",
                    state
                )))
            }
            Kind::Query(q) if q.rows_must_be_closed && !q.rows_were_closed => {
                Err(Error::Unfulfilled(format!(
                    "expected query rows to be closed, but it was not: {}",
                    state
                )))
            }
            Kind::Batch(b) => {
                if b.must_be_closed && !b.closed {
                    return Err(Error::Unfulfilled(format!(
                        "expected batch to be closed, but it was not: {}",
                        state
                    )));
                }
                let elements = b.elements.clone();
                drop(state);
                elements.iter().try_for_each(|e| e.verify())
            }
            _ => Ok(()),
        }
    }
}

/// A matched call: which expectation answered it and how.
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub expectation: Arc<Expectation>,
    pub delay: Duration,
    pub outcome: Outcome,
}

/// Registration-ordered list of expectations.
///
/// Appends take a short write lock; resolution works on a snapshot so that no
/// queue-wide lock is held while individual expectations are inspected.
#[derive(Debug, Default)]
pub(crate) struct ExpectationQueue {
    items: RwLock<Vec<Arc<Expectation>>>,
}

impl ExpectationQueue {
    pub fn push(&self, kind: Kind) -> Arc<Expectation> {
        let expectation = Arc::new(Expectation::new(kind));
        self.items.write().push(Arc::clone(&expectation));
        expectation
    }

    pub fn snapshot(&self) -> Vec<Arc<Expectation>> {
        self.items.read().clone()
    }
}
