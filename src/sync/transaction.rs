//! Transaction support for synchronous mock connections.

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
    pub fn commit(self, ctx: &Context) -> Result<()> {
        self.conn.commit(ctx)
    }

    /// Rollback the transaction.
    ///
    /// This consumes the transaction and resolves a rollback expectation.
    pub fn rollback(self, ctx: &Context) -> Result<()> {
        self.conn.rollback(ctx)
    }
}

impl Deref for Transaction {
    type Target = Conn;

    fn deref(&self) -> &Conn {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opts::Opts;

    #[test]
    fn test_commit_through_handle() {
        let conn = Conn::new(Opts::default()).unwrap();
        let ctx = Context::background();
        conn.expect_begin();
        conn.expect_commit();
        let tx = conn.begin(&ctx).unwrap();
        assert!(tx.in_transaction());
        tx.commit(&ctx).unwrap();
        assert!(!conn.in_transaction());
        assert!(conn.expectations_were_met().is_ok());
    }
}
