//! Policy change notification

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use tokio::sync::broadcast;
use tracing::debug;

/// Called with a short message when another party changed the policy
pub type UpdateCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Tells other enforcers that the stored policy changed
#[async_trait]
pub trait Watcher: Send + Sync {
    /// Install the callback run when a change notification arrives
    fn set_update_callback(&mut self, callback: UpdateCallback);

    /// Announce a local policy change
    async fn update(&self) -> Result<()>;
}

/// Watcher fanning notifications out over a tokio broadcast channel
///
/// Enforcers in the same process subscribe with [`BroadcastWatcher::subscribe`]
/// and reload on each message.
pub struct BroadcastWatcher {
    sender: broadcast::Sender<String>,
    callback: Option<UpdateCallback>,
}

impl BroadcastWatcher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            callback: None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastWatcher {
    fn default() -> Self {
        Self::new(16)
    }
}

impl fmt::Debug for BroadcastWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastWatcher")
            .field("receivers", &self.sender.receiver_count())
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

#[async_trait]
impl Watcher for BroadcastWatcher {
    fn set_update_callback(&mut self, callback: UpdateCallback) {
        self.callback = Some(callback);
    }

    async fn update(&self) -> Result<()> {
        const MESSAGE: &str = "policy updated";
        // No subscribers is not an error
        let receivers = self.sender.send(MESSAGE.to_string()).unwrap_or(0);
        debug!(receivers, "Policy update broadcast");
        if let Some(callback) = &self.callback {
            callback(MESSAGE);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_update_reaches_subscribers_and_callback() {
        let mut watcher = BroadcastWatcher::default();
        let mut rx = watcher.subscribe();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        watcher.set_update_callback(Box::new(move |_: &str| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        watcher.update().await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), "policy updated");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_update_without_subscribers() {
        let watcher = BroadcastWatcher::new(0);
        assert!(watcher.update().await.is_ok());
    }
}
