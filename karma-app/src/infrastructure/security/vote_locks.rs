use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};

const CLEANUP_INTERVAL_SECS: u64 = 300;

/// Per-nickname mutual exclusion for vote read-modify-write cycles.
///
/// Entries are created on demand and dropped during periodic cleanup once no
/// task holds or waits on them.
#[derive(Clone)]
pub struct VoteLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    last_cleanup: Arc<std::sync::Mutex<Instant>>,
}

/// Guards held for the duration of one vote.
pub struct VoteLockGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl VoteLocks {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
            last_cleanup: Arc::new(std::sync::Mutex::new(Instant::now())),
        }
    }

    /// Locks every distinct nickname in sorted order so two votes touching the
    /// same pair of users cannot deadlock.
    pub async fn acquire(&self, nicknames: &[&str]) -> VoteLockGuard {
        self.maybe_cleanup();

        let mut keys: Vec<&str> = nicknames.to_vec();
        keys.sort_unstable();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            let lock = self
                .locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();
            guards.push(lock.lock_owned().await);
        }

        VoteLockGuard { _guards: guards }
    }

    pub fn tracked(&self) -> usize {
        self.locks.len()
    }

    fn maybe_cleanup(&self) {
        let Ok(mut last_cleanup) = self.last_cleanup.try_lock() else {
            return;
        };
        if last_cleanup.elapsed() > Duration::from_secs(CLEANUP_INTERVAL_SECS) {
            self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            *last_cleanup = Instant::now();
        }
    }
}

impl Default for VoteLocks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_same_nickname_is_serialized() {
        let locks = VoteLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let peak = peak.clone();
            let voter = format!("voter{i}");
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(&[voter.as_str(), "dave"]).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_duplicate_keys_do_not_self_deadlock() {
        let locks = VoteLocks::new();
        let _guard = locks.acquire(&["alice", "alice"]).await;
        assert_eq!(locks.tracked(), 1);
    }

    #[tokio::test]
    async fn test_disjoint_pairs_proceed_together() {
        let locks = VoteLocks::new();
        let _first = locks.acquire(&["alice", "bob"]).await;
        let second = tokio::time::timeout(
            Duration::from_millis(200),
            locks.acquire(&["carol", "dave"]),
        )
        .await;
        assert!(second.is_ok());
    }
}
