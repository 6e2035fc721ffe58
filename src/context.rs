//! Cancellation context passed to every driver call.
//!
//! A [`Context`] carries a cancellation flag shared by all of its clones and
//! an optional deadline. The mock only consults it while a programmed delay
//! is pending: whichever comes first, the delay or the context finishing,
//! decides the outcome of the call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Inner {
    /// When `cancel` was first called
    cancelled: Mutex<Option<Instant>>,
    cond: Condvar,
    #[cfg(feature = "tokio")]
    notify: tokio::sync::Notify,
}

/// Cancellation signal with an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct Context {
    inner: Arc<Inner>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never done unless canceled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context that also finishes after `timeout`.
    ///
    /// The derived context shares cancellation with `self` and keeps the
    /// earlier of the two deadlines.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context that also finishes at `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            inner: Arc::clone(&self.inner),
            deadline: Some(deadline),
        }
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        if cancelled.is_none() {
            *cancelled = Some(Instant::now());
        }
        self.inner.cond.notify_all();
        drop(cancelled);
        #[cfg(feature = "tokio")]
        self.inner.notify.notify_waiters();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn is_cancelled(&self) -> bool {
        self.inner.cancelled.lock().is_some()
    }

    /// Returns true once the context is canceled or past its deadline.
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<Error> {
        if self.is_cancelled() {
            return Some(Error::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Error::DeadlineExceeded),
            _ => None,
        }
    }

    /// Decide a delay ending at `wake_at` against this context.
    ///
    /// Whichever happened first wins; a delay ending exactly at the deadline
    /// wins. `None` while neither has happened yet.
    fn race(&self, cancelled_at: Option<Instant>, wake_at: Instant) -> Option<Result<()>> {
        if cancelled_at.is_some_and(|at| at < wake_at) {
            return Some(Err(Error::Canceled));
        }
        let now = Instant::now();
        if let Some(deadline) = self.deadline
            && deadline < wake_at
            && now >= deadline
        {
            return Some(Err(Error::DeadlineExceeded));
        }
        (now >= wake_at).then_some(Ok(()))
    }

    /// Block for `delay` unless the context finishes first.
    ///
    /// Returns the context error if it finished before the delay elapsed.
    /// A context that is already done wins even against a zero delay.
    pub fn sleep(&self, delay: Duration) -> Result<()> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        let wake_at = Instant::now() + delay;
        let mut cancelled = self.inner.cancelled.lock();
        loop {
            if let Some(result) = self.race(*cancelled, wake_at) {
                return result;
            }
            let until = match self.deadline {
                Some(deadline) if deadline < wake_at => deadline,
                _ => wake_at,
            };
            // Spurious wakeups and timeouts both loop back to the race.
            let _ = self.inner.cond.wait_until(&mut cancelled, until);
        }
    }

    /// Resolves once the context is canceled or past its deadline.
    #[cfg(feature = "tokio")]
    pub async fn done(&self) -> Error {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel is not lost.
            notified.as_mut().enable();
            if let Some(err) = self.err() {
                return err;
            }
            match self.deadline {
                Some(deadline) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = tokio::time::sleep_until(deadline.into()) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Async counterpart of [`Context::sleep`].
    #[cfg(feature = "tokio")]
    pub async fn sleep_async(&self, delay: Duration) -> Result<()> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        let wake_at = Instant::now() + delay;
        loop {
            let cancelled_at = *self.inner.cancelled.lock();
            if let Some(result) = self.race(cancelled_at, wake_at) {
                return result;
            }
            tokio::select! {
                _ = tokio::time::sleep_until(wake_at.into()) => {}
                _ = self.done() => {}
            }
        }
    }
}
