//! Keyed in-process locks guarding order submission.
//!
//! A lock is held by a [`SubmitLockGuard`] and released when the guard is
//! dropped. A lock older than its TTL is considered abandoned and may be
//! taken again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use storefront_sdk::objects::SubmitOrder;
use tokio::time::Instant;

#[derive(Clone, Default)]
pub struct SubmitLocks {
    held: Arc<Mutex<HashMap<String, Instant>>>,
}

/// Releases its lock on drop.
#[must_use]
pub struct SubmitLockGuard {
    held: Arc<Mutex<HashMap<String, Instant>>>,
    key: String,
    acquired_at: Instant,
}

impl SubmitLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock key of a submission: the user and a digest of the request body.
    pub fn submit_key(user_id: i64, submit: &SubmitOrder) -> String {
        let body = serde_json::to_vec(submit).unwrap_or_default();
        let digest = ring::digest::digest(&ring::digest::SHA256, &body);
        format!("order_submit_{user_id}_{}", hex::encode(digest))
    }

    /// Take the lock for `key`, or `None` if someone else holds it.
    pub fn try_acquire(&self, key: impl Into<String>, ttl: Duration) -> Option<SubmitLockGuard> {
        let key = key.into();
        let now = Instant::now();
        let mut held = lock_map(&self.held);
        held.retain(|_, acquired_at| now.duration_since(*acquired_at) < ttl);
        if held.contains_key(&key) {
            return None;
        }
        held.insert(key.clone(), now);
        Some(SubmitLockGuard {
            held: Arc::clone(&self.held),
            key,
            acquired_at: now,
        })
    }
}

impl Drop for SubmitLockGuard {
    fn drop(&mut self) {
        let mut held = lock_map(&self.held);
        // The lock may have expired and been taken by another request.
        if held.get(&self.key) == Some(&self.acquired_at) {
            held.remove(&self.key);
        }
    }
}

fn lock_map(
    map: &Mutex<HashMap<String, Instant>>,
) -> MutexGuard<'_, HashMap<String, Instant>> {
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn test_second_acquire_is_rejected() {
        let locks = SubmitLocks::new();
        let guard = locks.try_acquire("k", TTL);
        assert!(guard.is_some());
        assert!(locks.try_acquire("k", TTL).is_none());
        assert!(locks.try_acquire("other", TTL).is_some());
    }

    #[tokio::test]
    async fn test_drop_releases() {
        let locks = SubmitLocks::new();
        {
            let _guard = locks.try_acquire("k", TTL).unwrap();
            assert!(locks.try_acquire("k", TTL).is_none());
        }
        assert!(locks.try_acquire("k", TTL).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lock_can_be_taken_again() {
        let locks = SubmitLocks::new();
        let stale = locks.try_acquire("k", TTL).unwrap();
        tokio::time::advance(TTL + Duration::from_millis(1)).await;

        let fresh = locks.try_acquire("k", TTL);
        assert!(fresh.is_some());

        // Dropping the stale guard must not release the fresh lock.
        drop(stale);
        assert!(locks.try_acquire("k", TTL).is_none());
        drop(fresh);
        assert!(locks.try_acquire("k", TTL).is_some());
    }

    #[test]
    fn test_submit_key_depends_on_user_and_body() {
        let submit = SubmitOrder {
            address_id: 1,
            ..Default::default()
        };
        let key = SubmitLocks::submit_key(42, &submit);
        assert!(key.starts_with("order_submit_42_"));
        let digest = &key["order_submit_42_".len()..];
        assert_eq!(digest.len(), 64);
        assert!(digest.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
        assert_eq!(key, SubmitLocks::submit_key(42, &submit.clone()));
        assert_ne!(key, SubmitLocks::submit_key(43, &submit));

        let other = SubmitOrder {
            address_id: 2,
            ..Default::default()
        };
        assert_ne!(key, SubmitLocks::submit_key(42, &other));
    }
}
