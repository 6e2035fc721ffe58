//! Programmed result sets and the cursors that read them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::conversion::{FromRow, FromValue, decode};
use crate::error::{Error, Result};
use crate::expectation::Expectation;
use crate::types::{ToValues, Value};

/// One result set returned by a query expectation.
///
/// ```
/// use zero_postgres_mock::Rows;
///
/// let rows = Rows::new(["id", "title"])
///     .add_row((1_i32, "one"))
///     .add_row((2_i32, "two"));
/// assert_eq!(rows.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct Rows {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    row_errors: BTreeMap<usize, Error>,
    close_error: Option<Error>,
    invalid: Option<Error>,
}

impl Rows {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Append a row.
    ///
    /// A row whose width differs from the column count poisons the set: the
    /// cursor reading it reports `Error::InvalidUsage` instead of any rows.
    pub fn add_row(mut self, values: impl ToValues) -> Self {
        let values = values.to_values();
        if values.len() != self.columns.len() && self.invalid.is_none() {
            self.invalid = Some(Error::InvalidUsage(format!(
                "row {} has {} values, expected {} columns",
                self.rows.len(),
                values.len(),
                self.columns.len()
            )));
        }
        self.rows.push(values);
        self
    }

    /// Fail iteration when the cursor reaches row `row` (0-based).
    pub fn row_error(mut self, row: usize, err: impl Into<Error>) -> Self {
        self.row_errors.insert(row, err.into());
        self
    }

    /// Error returned when the cursor is closed.
    pub fn close_error(mut self, err: impl Into<Error>) -> Self {
        self.close_error = Some(err.into());
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Debug for Rows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rows")
            .field("columns", &self.columns)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

/// Render row sets the way expectation listings show them.
pub(crate) fn describe_row_sets(sets: &[Rows]) -> String {
    if sets.iter().all(Rows::is_empty) {
        return "with empty rows".to_string();
    }
    let mut msg = String::from("should return rows:\n");
    if let [set] = sets {
        for (n, row) in set.rows.iter().enumerate() {
            msg.push_str(&format!("    row {} - {:?}\n", n, row));
        }
    } else {
        for (i, set) in sets.iter().enumerate() {
            msg.push_str(&format!("    result set: {}\n", i));
            for (n, row) in set.rows.iter().enumerate() {
                msg.push_str(&format!("      row {} - {:?}\n", n, row));
            }
        }
    }
    msg.trim().to_string()
}

/// Cursor over the result sets of a matched query.
///
/// Call [`RowCursor::close`] when done; a query expectation registered with
/// `rows_will_be_closed` is only met once its cursor was closed. Dropping the
/// cursor does not close it.
pub struct RowCursor {
    sets: Vec<Rows>,
    set: usize,
    /// 1-based position within the current set, 0 before the first row
    pos: usize,
    error: Option<Error>,
    closed: bool,
    expectation: Option<Arc<Expectation>>,
}

impl RowCursor {
    pub(crate) fn new(sets: Vec<Rows>, expectation: Option<Arc<Expectation>>) -> Self {
        Self {
            sets,
            set: 0,
            pos: 0,
            error: None,
            closed: false,
            expectation,
        }
    }

    fn current(&self) -> Option<&Rows> {
        self.sets.get(self.set)
    }

    /// Column names of the current result set.
    pub fn columns(&self) -> &[String] {
        self.current().map(Rows::columns).unwrap_or(&[])
    }

    /// Advance to the next row. Returns false when the set is exhausted, the
    /// cursor is closed, or the next row carries a programmed error (see
    /// [`RowCursor::err`]).
    pub fn next(&mut self) -> bool {
        if self.closed || self.error.is_some() {
            return false;
        }
        let Some(rows) = self.sets.get(self.set) else {
            return false;
        };
        if let Some(err) = &rows.invalid {
            self.error = Some(err.clone());
            return false;
        }
        if self.pos >= rows.rows.len() {
            return false;
        }
        if let Some(err) = rows.row_errors.get(&self.pos) {
            self.error = Some(err.clone());
            return false;
        }
        self.pos += 1;
        true
    }

    /// Values of the current row.
    pub fn values(&self) -> Result<&[Value]> {
        if self.pos == 0 {
            return Err(Error::InvalidUsage("values called before next".into()));
        }
        self.current()
            .and_then(|rows| rows.rows.get(self.pos - 1))
            .map(Vec::as_slice)
            .ok_or_else(|| Error::InvalidUsage("no current row".into()))
    }

    /// Decode column `idx` of the current row.
    pub fn get<T: FromValue>(&self, idx: usize) -> Result<T> {
        let values = self.values()?;
        let value = values.get(idx).ok_or_else(|| {
            Error::InvalidUsage(format!(
                "column index {} out of range for {} columns",
                idx,
                values.len()
            ))
        })?;
        decode(value.as_ref())
    }

    /// Decode the current row.
    pub fn scan<T: FromRow>(&self) -> Result<T> {
        T::from_row(self.values()?)
    }

    /// Move to the next result set. Returns false if there is none.
    pub fn next_result_set(&mut self) -> bool {
        if self.closed || self.set + 1 >= self.sets.len() {
            return false;
        }
        self.set += 1;
        self.pos = 0;
        self.error = None;
        true
    }

    /// Error that stopped iteration, or the close error once the current set
    /// is exhausted.
    pub fn err(&self) -> Result<()> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let exhausted = self
            .current()
            .is_none_or(|rows| self.pos >= rows.rows.len());
        if (exhausted || self.closed)
            && let Some(err) = self.current().and_then(|rows| rows.close_error.clone())
        {
            return Err(err);
        }
        Ok(())
    }

    /// Close the cursor and return the programmed close error, if any.
    pub fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            if let Some(expectation) = &self.expectation {
                expectation.mark_rows_closed();
            }
        }
        match self.current().and_then(|rows| rows.close_error.clone()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Decode every remaining row of the current set, then close.
    pub fn collect<T: FromRow>(mut self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        while self.next() {
            out.push(self.scan()?);
        }
        self.err()?;
        self.close()?;
        Ok(out)
    }
}

impl fmt::Debug for RowCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowCursor")
            .field("set", &self.set)
            .field("pos", &self.pos)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// Result of `query_row`: a single row, or the error that prevents it.
#[derive(Debug)]
pub struct Row {
    inner: Result<RowCursor>,
}

impl Row {
    pub(crate) fn new(inner: Result<RowCursor>) -> Self {
        Self { inner }
    }

    /// Decode the first row and close the cursor.
    ///
    /// Returns the query's error if it failed, the first row's programmed
    /// error if one is set, or `Error::NoRows` if the result set is empty.
    pub fn scan<T: FromRow>(self) -> Result<T> {
        let mut cursor = self.inner?;
        if !cursor.next() {
            let err = cursor.err().err().unwrap_or(Error::NoRows);
            let _ = cursor.close();
            return Err(err);
        }
        let row = cursor.scan::<T>();
        cursor.close()?;
        row
    }
}
