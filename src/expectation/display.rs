//! Human readable rendering of expectations, used in failure messages.

use std::fmt::{self, Write};

use super::{Common, ExpectationState, Kind, Outcome, QueryCriteria};
use crate::rows::describe_row_sets;
use crate::tx::TxOptions;

impl fmt::Display for Common {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Return => {}
            Outcome::Error(e) => writeln!(f, "\t- returns error: {}", e)?,
            Outcome::Panic(p) => writeln!(f, "\t- panics with: {}", p)?,
        }
        if !self.delay.is_zero() {
            writeln!(f, "\t- delayed execution for: {:?}", self.delay)?;
        }
        if self.optional {
            f.write_str("\t- execution is optional\n")?;
        }
        if self.planned_calls > 0 {
            writeln!(f, "\t- execution calls awaited: {}", self.planned_calls)?;
        }
        Ok(())
    }
}

fn write_criteria(f: &mut impl Write, criteria: &QueryCriteria) -> fmt::Result {
    writeln!(f, "\t- matches sql: '{}'", criteria.sql)?;
    if let Some(rewritten) = &criteria.rewritten_sql {
        writeln!(f, "\t- matches rewritten sql: '{}'", rewritten)?;
    }
    if criteria.args.is_empty() {
        f.write_str("\t- is without arguments\n")
    } else {
        f.write_str("\t- is with arguments:\n")?;
        for (i, arg) in criteria.args.iter().enumerate() {
            writeln!(f, "\t\t{} - {:?}", i, arg)?;
        }
        Ok(())
    }
}

impl fmt::Display for ExpectationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let common = &self.common;
        match &self.kind {
            Kind::Close => write!(f, "ExpectedClose => expecting call to Close()\n{}", common),
            Kind::Begin { opts } => {
                f.write_str("ExpectedBegin => expecting call to Begin() or to BeginTx()\n")?;
                if *opts != TxOptions::default() {
                    writeln!(f, "\t- transaction options awaited: {:?}", opts)?;
                }
                write!(f, "{}", common)
            }
            Kind::Commit => write!(
                f,
                "ExpectedCommit => expecting call to Tx.Commit()\n{}",
                common
            ),
            Kind::Rollback => {
                f.write_str("ExpectedRollback => expecting transaction Rollback")?;
                if let Outcome::Error(e) = &common.outcome {
                    write!(f, ", which should return error: {}", e)?;
                }
                Ok(())
            }
            Kind::Query(q) => {
                f.write_str("ExpectedQuery => expecting call to Query() or to QueryRow():\n")?;
                write_criteria(f, &q.criteria)?;
                if let Some(rows) = &q.rows {
                    writeln!(f, "{}", describe_row_sets(rows))?;
                }
                write!(f, "{}", common)
            }
            Kind::Exec(e) => {
                f.write_str("ExpectedExec => expecting call to Exec():\n")?;
                write_criteria(f, &e.criteria)?;
                if let Some(result) = &e.result {
                    writeln!(f, "\t- returns result: {}", result)?;
                }
                write!(f, "{}", common)
            }
            Kind::Prepare(p) => {
                f.write_str("ExpectedPrepare => expecting call to Prepare():\n")?;
                writeln!(f, "\t- matches statement name: '{}'", p.name)?;
                writeln!(f, "\t- matches sql: '{}'", p.sql)?;
                write!(f, "{}", common)
            }
            Kind::Deallocate { name } => {
                f.write_str("ExpectedDeallocate => expecting call to Deallocate():\n")?;
                match name {
                    Some(name) => writeln!(f, "\t- matches statement name: '{}'", name)?,
                    None => f.write_str("\t- matches all statements\n")?,
                }
                write!(f, "{}", common)
            }
            Kind::CopyFrom { table, columns, .. } => {
                f.write_str("ExpectedCopyFrom => expecting CopyFrom which:")?;
                write!(f, "\n  - matches table name: '{}'", table.sanitize())?;
                write!(f, "\n  - matches column names: '{:?}'", columns)?;
                if let Outcome::Error(e) = &common.outcome {
                    write!(f, "\n  - should returns error: {}", e)?;
                }
                Ok(())
            }
            Kind::Ping => write!(f, "ExpectedPing => expecting call to Ping()\n{}", common),
            Kind::Reset => f.write_str("ExpectedReset => expecting database Reset"),
            Kind::Batch(b) => {
                f.write_str("ExpectedBatch => expecting call to SendBatch()\n")?;
                if b.must_be_closed {
                    f.write_str("\t- batch must be closed\n")?;
                }
                write!(f, "{}", common)
            }
        }
    }
}
