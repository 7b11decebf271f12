// Call Deadlines
// A timer, an early-cancel token, or both

use std::future::pending;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// Cancellation token observed by a [`Deadline`]
#[derive(Clone, Debug)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for cancellation.
    ///
    /// Never resolves if the handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            pending::<()>().await;
        }
    }
}

/// Sender side of a cancel channel
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Expire every deadline holding this handle's token
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a cancel channel
pub fn cancel_channel() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Single-shot expiry for one supervised call.
///
/// Expires when its instant passes or its token is cancelled, whichever
/// comes first. A deadline with neither never expires.
#[derive(Clone, Debug, Default)]
pub struct Deadline {
    at: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl Deadline {
    /// Expire `timeout` from now.
    ///
    /// A timeout too large to represent as an instant leaves no timer.
    pub fn after(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(at) => Self::at(at),
            None => Self::never(),
        }
    }

    /// Expire at an absolute instant
    pub fn at(instant: impl Into<Instant>) -> Self {
        Self {
            at: Some(instant.into()),
            cancel: None,
        }
    }

    /// Expire only when `token` is cancelled
    pub fn cancellable(token: CancelToken) -> Self {
        Self {
            at: None,
            cancel: Some(token),
        }
    }

    /// No expiry at all
    pub fn never() -> Self {
        Self::default()
    }

    /// Also expire when `token` is cancelled
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Time left on the timer; `None` when there is no timer
    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        let timer_fired = self.at.is_some_and(|at| at <= Instant::now());
        let cancelled = self.cancel.as_ref().is_some_and(CancelToken::is_cancelled);
        timer_fired || cancelled
    }

    /// Resolve once the deadline has expired
    pub async fn expired(&self) {
        let timer = async {
            match self.at {
                Some(at) => sleep_until(at).await,
                None => pending::<()>().await,
            }
        };
        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            _ = timer => {}
            _ = cancelled => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_timer_expires() {
        let deadline = Deadline::after(Duration::from_millis(20));
        assert!(!deadline.is_expired());

        deadline.expired().await;

        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_cancel_expires_before_timer() {
        let (handle, token) = cancel_channel();
        let deadline = Deadline::after(Duration::from_secs(60)).with_cancel(token);

        let waiter = {
            let deadline = deadline.clone();
            tokio::spawn(async move { deadline.expired().await })
        };
        handle.cancel();

        let joined = tokio_test::assert_ok!(timeout(Duration::from_secs(1), waiter).await);
        assert!(joined.is_ok());
        assert!(deadline.is_expired());
    }

    #[tokio::test]
    async fn test_dropped_handle_does_not_expire() {
        let (handle, token) = cancel_channel();
        let deadline = Deadline::cancellable(token);
        drop(handle);

        let result = timeout(Duration::from_millis(50), deadline.expired()).await;

        tokio_test::assert_err!(result);
        assert!(!deadline.is_expired());
        assert_eq!(deadline.remaining(), None);
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_has_no_timer() {
        let deadline = Deadline::after(Duration::MAX);

        assert!(!deadline.is_expired());
        assert_eq!(deadline.remaining(), None);
        let result = timeout(Duration::from_millis(30), deadline.expired()).await;
        tokio_test::assert_err!(result);
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_still_cancels() {
        let (handle, token) = cancel_channel();
        let deadline = Deadline::after(Duration::MAX).with_cancel(token);
        handle.cancel();

        tokio_test::assert_ok!(timeout(Duration::from_secs(1), deadline.expired()).await);
        assert!(deadline.is_expired());
    }

    #[tokio::test]
    async fn test_never_does_not_expire() {
        let result = timeout(Duration::from_millis(30), Deadline::never().expired()).await;
        assert!(result.is_err());
    }
}
