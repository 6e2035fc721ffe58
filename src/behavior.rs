//! Delivery of a matched expectation's programmed outcome.
//!
//! The programmed delay races the caller's context. If the context finishes
//! first the call fails with the context error and nothing else is
//! delivered. Otherwise the programmed error is returned or the programmed
//! panic raised. No lock is held at this point, so a panic unwinds cleanly.

use crate::call::StatementCall;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::expectation::{Outcome, Resolved};
use crate::result::CommandTag;
use crate::rows::RowCursor;

fn deliver(outcome: &Outcome) -> Result<()> {
    match outcome {
        Outcome::Return => Ok(()),
        Outcome::Error(err) => Err(err.clone()),
        Outcome::Panic(payload) => std::panic::panic_any(payload.clone()),
    }
}

/// Block for the programmed delay, then deliver the outcome.
pub(crate) fn apply(resolved: &Resolved, ctx: &Context) -> Result<()> {
    ctx.sleep(resolved.delay)?;
    deliver(&resolved.outcome)
}

/// Await the programmed delay, then deliver the outcome.
#[cfg(feature = "tokio")]
pub(crate) async fn apply_async(resolved: &Resolved, ctx: &Context) -> Result<()> {
    ctx.sleep_async(resolved.delay).await?;
    deliver(&resolved.outcome)
}

/// Row cursor for a query that succeeded.
pub(crate) fn rows_of(resolved: &Resolved, call: &StatementCall) -> Result<RowCursor> {
    match resolved.expectation.rows() {
        Some(sets) => Ok(RowCursor::new(
            sets,
            Some(std::sync::Arc::clone(&resolved.expectation)),
        )),
        None => Err(Error::InvalidUsage(format!(
            "query '{}' with args {:?} must return rows, but none are set for the expectation",
            call.sql, call.args
        ))),
    }
}

/// Command tag for an exec that succeeded.
pub(crate) fn tag_of(resolved: &Resolved, call: &StatementCall) -> Result<CommandTag> {
    resolved.expectation.command_tag().ok_or_else(|| {
        Error::InvalidUsage(format!(
            "exec '{}' with args {:?} must return a result, but none is set for the expectation",
            call.sql, call.args
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::expectation::{Expectation, Kind, panic_message};

    fn resolved(delay: Duration, outcome: Outcome) -> Resolved {
        Resolved {
            expectation: Arc::new(Expectation::new(Kind::Ping)),
            delay,
            outcome,
        }
    }

    #[test]
    fn test_delay_then_error() {
        let r = resolved(
            Duration::from_millis(20),
            Outcome::Error(Error::Custom("late failure".into())),
        );
        let start = Instant::now();
        let err = apply(&r, &Context::background()).unwrap_err();
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(err.to_string(), "late failure");
    }

    #[test]
    fn test_cancel_wins_over_programmed_error() {
        let r = resolved(
            Duration::from_secs(5),
            Outcome::Error(Error::Custom("never delivered".into())),
        );
        let ctx = Context::background().with_timeout(Duration::from_millis(10));
        assert!(matches!(apply(&r, &ctx), Err(Error::DeadlineExceeded)));
    }

    #[test]
    fn test_panic_payload() {
        let r = resolved(Duration::ZERO, Outcome::Panic("programmed".into()));
        let payload = catch_unwind(AssertUnwindSafe(|| apply(&r, &Context::background()))).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "programmed");
    }

    #[test]
    fn test_cancelled_context_skips_panic() {
        let r = resolved(Duration::ZERO, Outcome::Panic("programmed".into()));
        let ctx = Context::background();
        ctx.cancel();
        assert!(matches!(apply(&r, &ctx), Err(Error::Canceled)));
    }

    #[cfg(feature = "tokio")]
    #[tokio::test]
    async fn test_async_delay_elapses_first() {
        let r = resolved(Duration::from_millis(5), Outcome::Return);
        let ctx = Context::background().with_timeout(Duration::from_secs(5));
        assert!(apply_async(&r, &ctx).await.is_ok());
    }
}
