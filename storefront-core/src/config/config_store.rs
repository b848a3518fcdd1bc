//! Reloadable configuration values.
//!
//! A [`ConfigStore`] publishes each value as an `Arc<T>` on a `watch`
//! channel. Readers take the current `Arc` and never hold a lock across an
//! `.await`; a reload hands the new value to every [`ConfigWatcher`].

use std::sync::Arc;
use tokio::sync::watch;

pub struct ConfigStore<T> {
    tx: Arc<watch::Sender<Arc<T>>>,
}

/// Follows the reloads of one [`ConfigStore`].
pub struct ConfigWatcher<T> {
    rx: watch::Receiver<Arc<T>>,
}

impl<T> ConfigStore<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    /// Publish a reloaded value.
    pub fn replace(&self, value: T) {
        self.tx.send_replace(Arc::new(value));
    }

    pub fn current(&self) -> Arc<T> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> ConfigWatcher<T> {
        ConfigWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T> Clone for ConfigStore<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> ConfigWatcher<T> {
    /// Wait for the next reload and return the new value.
    ///
    /// Returns `None` once every handle to the store has been dropped.
    pub async fn next(&mut self) -> Option<Arc<T>> {
        self.rx.changed().await.ok()?;
        Some(Arc::clone(&self.rx.borrow_and_update()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_watcher_sees_reloaded_value() {
        let store = ConfigStore::new(Duration::from_secs(60));
        let mut watcher = store.subscribe();

        store.replace(Duration::from_secs(5));
        assert_eq!(watcher.next().await.as_deref(), Some(&Duration::from_secs(5)));
        assert_eq!(*store.current(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_watcher_only_sees_latest_of_several_reloads() {
        let store = ConfigStore::new(1u32);
        let mut watcher = store.subscribe();
        store.replace(2);
        store.replace(3);
        assert_eq!(watcher.next().await.as_deref(), Some(&3));

        let pending = tokio::time::timeout(Duration::from_millis(20), watcher.next()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_snapshot_survives_reload() {
        let store = ConfigStore::new(String::from("before"));
        let snapshot = store.current();
        store.clone().replace(String::from("after"));
        assert_eq!(&*snapshot, "before");
        assert_eq!(&*store.current(), "after");
    }

    #[tokio::test]
    async fn test_watcher_ends_with_store() {
        let store = ConfigStore::new(0u8);
        let mut watcher = store.subscribe();
        drop(store);
        assert_eq!(watcher.next().await, None);
    }
}
