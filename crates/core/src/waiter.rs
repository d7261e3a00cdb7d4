// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composite "wait for any" primitive (C6), bridging whiteboard/messageboard
//! observers, signals, timers, and cancellation. Grounded on
//! `Headers/Client/Signal.hpp` for `Signal`; the rest is a direct mapping
//! onto `tokio::select!` as described in spec §9's re-architecture notes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// A trivial waiter item: an atomic bool plus a one-shot wake. `signal()`
/// only wakes on the 0→1 transition, so redundant signals coalesce into a
/// single wakeup — used by modules to coalesce asynchronous commands.
#[derive(Default)]
pub struct Signal {
    signaled: AtomicBool,
    notify: Notify,
}

impl Signal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn signal(&self) {
        if !self.signaled.swap(true, Ordering::AcqRel) {
            self.notify.notify_one();
        }
    }

    pub fn is_woken(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }

    pub fn test_and_clear(&self) -> bool {
        self.signaled.swap(false, Ordering::AcqRel)
    }

    pub async fn wait(&self) {
        loop {
            if self.test_and_clear() {
                return;
            }
            self.notify.notified().await;
        }
    }
}

/// Result of a timed wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Woken,
    TimedOut,
}

/// Waits on a future until it resolves, a deadline elapses, or the given
/// cancellation token fires — the Rust-idiomatic stand-in for the
/// composite C++ `Waiter`, since `tokio::select!` already gives "wait for
/// any" without an explicit item registry.
pub async fn wait_for<F>(fut: F, cancel: &CancellationToken) -> Result<F::Output, crate::error::ClientError>
where
    F: std::future::Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(crate::error::ClientError::Cancelled),
        out = fut => Ok(out),
    }
}

/// As [`wait_for`], but also returns `TimedOut` if `duration` elapses first.
pub async fn wait_for_timeout<F>(
    fut: F,
    duration: Duration,
    cancel: &CancellationToken,
) -> Result<Option<F::Output>, crate::error::ClientError>
where
    F: std::future::Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(crate::error::ClientError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(None),
        out = fut => Ok(Some(out)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_wakes_waiter() {
        let sig = Signal::new();
        sig.signal();
        assert!(sig.is_woken());
        sig.wait().await;
        assert!(!sig.is_woken());
    }

    #[tokio::test]
    async fn redundant_signals_coalesce() {
        let sig = Signal::new();
        sig.signal();
        sig.signal();
        assert!(sig.test_and_clear());
        assert!(!sig.test_and_clear());
    }

    #[tokio::test]
    async fn wait_for_timeout_reports_timeout() {
        let cancel = CancellationToken::new();
        let result =
            wait_for_timeout(std::future::pending::<()>(), Duration::from_millis(10), &cancel)
                .await
                .expect("not cancelled");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn wait_for_reports_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = wait_for(std::future::pending::<()>(), &cancel).await;
        assert!(matches!(result, Err(crate::error::ClientError::Cancelled)));
    }
}
