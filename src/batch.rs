//! Statements sent together with `send_batch`, and the cursor handing out
//! their answers.

use std::sync::Arc;

use tracing::debug;

use crate::call::{OpKind, StatementCall};
use crate::error::{Error, Result};
use crate::expectation::{Expectation, Kind, Resolved};
use crate::statement::IntoStatement;
use crate::types::ToParams;

/// A list of statements sent in one round trip.
///
/// ```
/// use zero_postgres_mock::Batch;
///
/// let mut batch = Batch::new();
/// batch.queue("SELECT id FROM users WHERE name = $1", ("john",));
/// batch.queue("UPDATE users SET seen = now()", ());
/// assert_eq!(batch.len(), 2);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Batch {
    statements: Vec<StatementCall>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a statement.
    pub fn queue<S: IntoStatement, P: ToParams>(&mut self, statement: S, params: P) -> &mut Self {
        self.statements
            .push(StatementCall::from_params(statement.statement_text(), params));
        self
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub(crate) fn statements(&self) -> &[StatementCall] {
        &self.statements
    }
}

/// Position within the answers of a sent batch. Shared by both facades,
/// which apply the call behavior of each element themselves.
#[derive(Debug)]
pub(crate) struct BatchCursor {
    batch: Option<Arc<Expectation>>,
    statements: Vec<StatementCall>,
    elements: Vec<Arc<Expectation>>,
    next: usize,
    error: Option<Error>,
    closed: bool,
}

impl BatchCursor {
    pub fn new(batch: Arc<Expectation>, statements: Vec<StatementCall>) -> Self {
        let elements = batch.batch_elements();
        Self {
            batch: Some(batch),
            statements,
            elements,
            next: 0,
            error: None,
            closed: false,
        }
    }

    /// A cursor for a send that failed; every read returns `err`.
    pub fn failed(err: Error) -> Self {
        Self {
            batch: None,
            statements: Vec::new(),
            elements: Vec::new(),
            next: 0,
            error: Some(err),
            closed: false,
        }
    }

    /// Trigger the next element, which must be of kind `kind`.
    pub fn advance(&mut self, kind: OpKind) -> Result<(Resolved, &StatementCall)> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if self.closed {
            return Err(Error::InvalidUsage("batch results are closed".into()));
        }
        let index = self.next;
        let (Some(element), Some(statement)) =
            (self.elements.get(index), self.statements.get(index))
        else {
            return Err(Error::InvalidUsage(format!(
                "no more results in batch of {} statements",
                self.statements.len()
            )));
        };

        let mut state = element.lock();
        if state.kind.op_kind() != kind {
            let label = match state.kind {
                Kind::Exec(_) => "exec",
                _ => "query",
            };
            return Err(Error::UnexpectedCall(format!(
                "batch result {} was read as {:?}, but statement is expected as {}: {}",
                index, kind, label, *state
            )));
        }
        let resolved = element.trigger(&mut state);
        drop(state);
        debug!(index, "batch element answered");
        self.next += 1;
        Ok((resolved, statement))
    }

    /// Trigger every element not read yet and flag the batch closed.
    ///
    /// Returns the stored send error, if any, instead.
    pub fn close(&mut self) -> Result<Vec<Resolved>> {
        if self.closed {
            return Ok(Vec::new());
        }
        self.closed = true;
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let remaining = self
            .elements
            .iter()
            .skip(self.next)
            .map(Expectation::trigger_now)
            .collect();
        self.next = self.elements.len();
        if let Some(batch) = &self.batch {
            batch.mark_batch_closed();
        }
        Ok(remaining)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
