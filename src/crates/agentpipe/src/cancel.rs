//! A minimal cooperative cancellation signal shared by every suspension
//! point in the crate (stream decode, subprocess wait, rate-limit wait,
//! the between-phase check in the orchestrator).
//!
//! Built on [`tokio::sync::watch`] rather than a dedicated
//! cancellation-token crate: `watch` already ships with `tokio`'s `sync`
//! feature (a workspace dependency for every other reason already), it
//! retains state so a signal fired before anyone calls
//! [`CancelToken::cancelled`] is still observed, and it is cheaply clonable
//! for fan-out to concurrent drains.

use tokio::sync::watch;

/// The writable half; dropping every clone leaves outstanding
/// [`CancelToken`]s waiting forever, same as a plain `watch` channel.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// The readable half, passed down to suspension points.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Create a linked `(CancelHandle, CancelToken)` pair, initially
/// not-cancelled.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancelToken {
    /// A token that never cancels, for callers with no cancellation needs.
    pub fn never() -> Self {
        cancel_pair().1
    }

    /// True if [`CancelHandle::cancel`] has already been called.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation fires. Resolves immediately if it has
    /// already fired.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            // `changed` errors once every sender has dropped without ever
            // sending `true`; that means cancellation will never fire, so
            // wait forever rather than resolving spuriously.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn never_cancels() {
        let token = CancelToken::never();
        assert!(!token.is_cancelled());
        tokio::select! {
            _ = token.cancelled() => panic!("should not have resolved"),
            _ = tokio::time::sleep(Duration::from_millis(20)) => {}
        }
    }

    #[tokio::test]
    async fn cancel_resolves_waiting_future() {
        let (handle, token) = cancel_pair();
        let waiter = tokio::spawn(async move {
            token.cancelled().await;
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        handle.cancel();
        tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("cancellation should have resolved the waiter")
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_before_wait_is_observed_immediately() {
        let (handle, token) = cancel_pair();
        handle.cancel();
        assert!(token.is_cancelled());
        tokio::time::timeout(Duration::from_millis(50), token.cancelled())
            .await
            .expect("already-cancelled token should resolve immediately");
    }
}
