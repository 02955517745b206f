use std::sync::Arc;

use tokio::sync::watch;

/// One-time readiness signal raised when a token store has finished loading.
///
/// Clones share the same signal. Once completed it stays completed.
#[derive(Clone, Debug)]
pub struct Hydration {
    tx: Arc<watch::Sender<bool>>,
}

impl Hydration {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// A signal that has already fired.
    pub fn completed() -> Self {
        let hydration = Self::new();
        hydration.complete();
        hydration
    }

    pub fn complete(&self) {
        self.tx.send_if_modified(|done| !std::mem::replace(done, true));
    }

    pub fn is_complete(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the store is hydrated. Returns immediately if it already is.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(|done| *done).await;
    }
}

impl Default for Hydration {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_resolves_after_complete() {
        let hydration = Hydration::new();
        assert!(!hydration.is_complete());

        let waiter = {
            let hydration = hydration.clone();
            tokio::spawn(async move { hydration.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        hydration.complete();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
    }

    #[tokio::test]
    async fn test_completed_resolves_immediately() {
        let hydration = Hydration::completed();
        assert!(hydration.is_complete());
        tokio::time::timeout(Duration::from_millis(100), hydration.wait())
            .await
            .expect("already complete");
    }

    #[test]
    fn test_complete_is_idempotent() {
        let hydration = Hydration::new();
        let rx = hydration.tx.subscribe();
        hydration.complete();
        hydration.complete();
        assert!(hydration.is_complete());
        assert!(rx.has_changed().unwrap());
    }
}
