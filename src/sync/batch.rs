//! Results of a batch sent on a synchronous connection.

use std::sync::Arc;

use crate::batch::BatchCursor;
use crate::behavior::{apply, rows_of, tag_of};
use crate::call::{OpKind, StatementCall};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::expectation::Expectation;
use crate::result::CommandTag;
use crate::rows::{Row, RowCursor};

/// Answers of a sent batch, read in the order the statements were queued.
#[derive(Debug)]
pub struct BatchResults {
    cursor: BatchCursor,
}

impl BatchResults {
    pub(crate) fn new(batch: Arc<Expectation>, statements: Vec<StatementCall>) -> Self {
        Self {
            cursor: BatchCursor::new(batch, statements),
        }
    }

    pub(crate) fn failed(err: Error) -> Self {
        Self {
            cursor: BatchCursor::failed(err),
        }
    }

    /// Read the result of the next statement, which must be an exec.
    pub fn exec(&mut self, ctx: &Context) -> Result<CommandTag> {
        let (resolved, call) = self.cursor.advance(OpKind::Exec)?;
        apply(&resolved, ctx)?;
        tag_of(&resolved, call)
    }

    /// Read the result of the next statement, which must be a query.
    pub fn query(&mut self, ctx: &Context) -> Result<RowCursor> {
        let (resolved, call) = self.cursor.advance(OpKind::Query)?;
        apply(&resolved, ctx)?;
        rows_of(&resolved, call)
    }

    /// Like [`BatchResults::query`], with errors deferred to `Row::scan`.
    pub fn query_row(&mut self, ctx: &Context) -> Row {
        Row::new(self.query(ctx))
    }

    /// Answer every statement not read yet and close the results.
    ///
    /// Returns the send error if the batch failed, otherwise the first error
    /// among the remaining statements.
    pub fn close(&mut self, ctx: &Context) -> Result<()> {
        let mut first_error = None;
        for resolved in self.cursor.close()? {
            if let Err(err) = apply(&resolved, ctx)
                && first_error.is_none()
            {
                first_error = Some(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cursor.is_closed()
    }
}
