//! Transaction options and status.

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    Serializable,
    RepeatableRead,
    ReadCommitted,
    ReadUncommitted,
}

impl IsolationLevel {
    fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::Serializable => "SERIALIZABLE",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
        }
    }
}

/// Transaction access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    ReadWrite,
    ReadOnly,
}

/// Options passed to `begin_tx`.
///
/// `TxOptions::default()` is what a plain `begin` uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TxOptions {
    pub isolation: Option<IsolationLevel>,
    pub access: Option<AccessMode>,
    pub deferrable: Option<bool>,
}

impl TxOptions {
    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = Some(level);
        self
    }

    pub fn access(mut self, mode: AccessMode) -> Self {
        self.access = Some(mode);
        self
    }

    pub fn deferrable(mut self, deferrable: bool) -> Self {
        self.deferrable = Some(deferrable);
        self
    }

    /// The `BEGIN` statement a real client would send for these options.
    pub fn begin_sql(&self) -> String {
        let mut sql = String::from("BEGIN");
        if let Some(level) = self.isolation {
            sql.push_str(" ISOLATION LEVEL ");
            sql.push_str(level.as_sql());
        }
        match self.access {
            Some(AccessMode::ReadWrite) => sql.push_str(" READ WRITE"),
            Some(AccessMode::ReadOnly) => sql.push_str(" READ ONLY"),
            None => {}
        }
        match self.deferrable {
            Some(true) => sql.push_str(" DEFERRABLE"),
            Some(false) => sql.push_str(" NOT DEFERRABLE"),
            None => {}
        }
        sql
    }
}

/// Transaction status of a mock connection, as a server would report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TransactionStatus {
    /// Idle (not in transaction block)
    #[default]
    Idle = b'I',
    /// In transaction block
    InTransaction = b'T',
    /// In failed transaction block (a statement returned an error)
    Failed = b'E',
}

impl TransactionStatus {
    /// Returns true if currently in a transaction (either active or failed).
    pub fn in_transaction(self) -> bool {
        matches!(self, TransactionStatus::InTransaction | TransactionStatus::Failed)
    }

    /// Returns true if the transaction has failed.
    pub fn is_failed(self) -> bool {
        matches!(self, TransactionStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_sql() {
        assert_eq!(TxOptions::default().begin_sql(), "BEGIN");
        let opts = TxOptions::default()
            .isolation(IsolationLevel::Serializable)
            .access(AccessMode::ReadOnly)
            .deferrable(true);
        assert_eq!(
            opts.begin_sql(),
            "BEGIN ISOLATION LEVEL SERIALIZABLE READ ONLY DEFERRABLE"
        );
    }

    #[test]
    fn test_status() {
        assert!(!TransactionStatus::Idle.in_transaction());
        assert!(TransactionStatus::Failed.in_transaction());
        assert!(TransactionStatus::Failed.is_failed());
    }
}
