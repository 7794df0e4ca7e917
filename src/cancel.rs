//! Per-call cancellation.
//!
//! A [`CancellationToken`] is a cheap clonable handle over a `watch` channel.
//! Any clone may fire it; every clone observes it. Calls race the token at each
//! suspension point through [`with_cancellation`].
//!
//! # Example
//!
//! ```
//! use httpwire_client::cancel::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let observer = token.clone();
//! assert!(!observer.is_cancelled());
//! token.cancel();
//! assert!(observer.is_cancelled());
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{Result, RpcError};

/// Externally triggered abort signal for one or more calls.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Fire the token. Idempotent.
    pub fn cancel(&self) {
        if !self.tx.send_replace(true) {
            tracing::debug!("cancellation token fired");
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the token has fired.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow_and_update() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
        // Unreachable while `self` holds the sender.
        std::future::pending::<()>().await
    }
}

/// Run `fut` unless `token` fires first.
///
/// A token that has already fired short-circuits without polling `fut`. When
/// the token wins the race, `fut` is dropped.
pub async fn with_cancellation<T, F>(token: Option<&CancellationToken>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(token) = token else {
        return fut.await;
    };
    if token.is_cancelled() {
        return Err(RpcError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(RpcError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancelled_resolves_after_fire() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_already_fired_resolves_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("fired token resolves at once");
    }

    #[tokio::test]
    async fn test_with_cancellation_skips_future_when_fired() {
        let token = CancellationToken::new();
        token.cancel();

        let polled = AtomicBool::new(false);
        let result = with_cancellation(Some(&token), async {
            polled.store(true, Ordering::SeqCst);
            Ok(1)
        })
        .await;

        assert!(matches!(result, Err(RpcError::Cancelled)));
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_with_cancellation_interrupts_pending() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result: Result<()> =
            with_cancellation(Some(&token), std::future::pending::<Result<()>>()).await;
        assert!(matches!(result, Err(RpcError::Cancelled)));
    }

    #[tokio::test]
    async fn test_without_token_runs_future() {
        let result = with_cancellation(None, async { Ok::<_, RpcError>(5) }).await;
        assert_eq!(result.unwrap(), 5);
    }
}
