//! Transaction support for asynchronous mock connections.

use std::ops::Deref;

use super::Conn;
use crate::context::Context;
use crate::error::Result;

/// A transaction started with `begin` or `begin_tx`.
///
/// Statements run through the transaction go to the same connection; the
/// handle derefs to it. Dropping the handle does not end the transaction.
#[derive(Debug)]
pub struct Transaction {
    conn: Conn,
}

impl Transaction {
    /// Create a new transaction (internal use only).
    pub(crate) fn new(conn: Conn) -> Self {
        Self { conn }
    }

    /// Commit the transaction.
    ///
    /// This consumes the transaction and resolves a commit expectation.
    pub async fn commit(self, ctx: &Context) -> Result<()> {
        self.conn.commit(ctx).await
    }

    /// Rollback the transaction.
    ///
    /// This consumes the transaction and resolves a rollback expectation.
    pub async fn rollback(self, ctx: &Context) -> Result<()> {
        self.conn.rollback(ctx).await
    }
}

impl Deref for Transaction {
    type Target = Conn;

    fn deref(&self) -> &Conn {
        &self.conn
    }
}
