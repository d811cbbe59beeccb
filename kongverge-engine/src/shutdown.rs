//! Host-driven cancellation.

use tokio::sync::watch;

/// Shutdown signal observed by retry loops.
///
/// Wraps the receiving side of a `watch::channel(false)`; sending `true`
/// cancels every loop holding a clone.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    rx: Option<watch::Receiver<bool>>,
}

impl Shutdown {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self::default()
    }

    pub fn from_watch(rx: watch::Receiver<bool>) -> Self {
        Self { rx: Some(rx) }
    }

    pub fn is_triggered(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once shutdown is signalled. Pends forever if the sender is
    /// dropped without signalling.
    pub async fn triggered(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_never_does_not_fire() {
        let shutdown = Shutdown::never();
        assert!(!shutdown.is_triggered());
        let fired = tokio::time::timeout(Duration::from_millis(10), shutdown.triggered()).await;
        assert!(fired.is_err());
    }

    #[tokio::test]
    async fn test_fires_on_send() {
        let (tx, rx) = watch::channel(false);
        let shutdown = Shutdown::from_watch(rx);
        assert!(!shutdown.is_triggered());

        tx.send(true).unwrap();
        assert!(shutdown.is_triggered());
        shutdown.triggered().await;
    }
}
