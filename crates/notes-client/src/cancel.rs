//! Cancellation for view-scoped requests.
//!
//! A view holds a `CancelToken` for as long as it is mounted. Unmounting
//! cancels (or drops) the matching `CancelHandle`, and any request still
//! awaited through `CancelToken::run` resolves to `Cancelled` so its
//! response is never applied to defunct state.

use std::future::Future;

use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("Operation cancelled")]
pub struct Cancelled;

/// Owning side. Dropping it cancels every token it handed out.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observing side, cloned into whatever runs on behalf of a view.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Option<watch::Receiver<bool>>,
}

/// Create a linked handle/token pair.
pub fn pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx: Some(rx) })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: Some(self.tx.subscribe()),
        }
    }
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        match &self.rx {
            None => false,
            Some(rx) => *rx.borrow() || rx.has_changed().is_err(),
        }
    }

    /// Resolves once the token is cancelled or its handle is dropped.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Drive `fut` unless the token is cancelled first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        if self.is_cancelled() {
            return Err(Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Cancelled),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_completes_when_not_cancelled() {
        let (_handle, token) = pair();
        assert_eq!(token.run(async { 42 }).await, Ok(42));
    }

    #[tokio::test]
    async fn test_cancel_before_run() {
        let (handle, token) = pair();
        handle.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.run(async { 42 }).await, Err(Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_during_run() {
        let (handle, token) = pair();
        let slow = tokio::time::sleep(Duration::from_secs(60));

        let canceller = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        };
        let (result, ()) = tokio::join!(token.run(slow), canceller);
        assert_eq!(result, Err(Cancelled));
    }

    #[tokio::test]
    async fn test_dropping_handle_cancels() {
        let (handle, token) = pair();
        let clone = handle.token();
        drop(handle);
        assert!(token.is_cancelled());
        assert!(clone.is_cancelled());
        assert_eq!(token.run(async { 1 }).await, Err(Cancelled));
    }

    #[tokio::test]
    async fn test_never_token() {
        let token = CancelToken::never();
        assert!(!token.is_cancelled());
        assert_eq!(token.run(async { "done" }).await, Ok("done"));
    }
}
