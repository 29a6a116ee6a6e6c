use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-pool exclusive lock, per spec.md §5 and §9 Open Question (a): the
/// Autoscaler tick and both migration worker kinds acquire the same lock
/// for `(cluster, pool)` before touching a pool's target capacity, so they
/// never race each other. Held via an RAII guard so a panicking task still
/// releases it.
#[derive(Debug, Clone, Default)]
pub struct PoolLockRegistry {
    locks: Arc<std::sync::Mutex<HashMap<(String, String), Arc<Mutex<()>>>>>,
}

impl PoolLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, cluster: &str, pool: &str) -> Arc<Mutex<()>> {
        let key = (cluster.to_string(), pool.to_string());
        let mut locks = self.locks.lock().expect("pool lock registry poisoned");
        locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Acquire the exclusive lock for `(cluster, pool)`, waiting if another
    /// task already holds it. The returned guard releases the lock on drop.
    pub async fn acquire(&self, cluster: &str, pool: &str) -> OwnedMutexGuard<()> {
        self.lock_for(cluster, pool).lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_waits_for_the_first_to_drop() {
        let registry = PoolLockRegistry::new();
        let guard = registry.acquire("prod", "default").await;

        let registry2 = registry.clone();
        let acquired = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let acquired2 = acquired.clone();
        let handle = tokio::spawn(async move {
            let _guard = registry2.acquire("prod", "default").await;
            acquired2.store(true, std::sync::atomic::Ordering::SeqCst);
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!acquired.load(std::sync::atomic::Ordering::SeqCst));

        drop(guard);
        handle.await.unwrap();
        assert!(acquired.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn distinct_pools_do_not_contend() {
        let registry = PoolLockRegistry::new();
        let _a = registry.acquire("prod", "default").await;
        let b = tokio::time::timeout(std::time::Duration::from_millis(50), registry.acquire("prod", "gpu")).await;
        assert!(b.is_ok());
    }
}
