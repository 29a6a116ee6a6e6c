//! Three-queue cooperative termination client, ported from
//! `draining/queue.py`/`batch/drainer.py`: warning notifies and moves a
//! host straight to drain; drain cordons/evicts and waits out a timeout
//! before moving to terminate; terminate calls back out to the owning
//! resource group and clears the host on success.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::action::DrainAction;
use crate::error::DrainError;
use crate::queue::{DrainQueueKind, DrainQueueStore, DrainReason, HostKey, HostRecord};

/// The resource-group half of termination — deliberately outside this
/// crate's scheduler abstractions, since it's the cloud provider's API
/// that actually deletes the instance.
#[async_trait]
pub trait InstanceTerminator: Send + Sync {
    async fn terminate_instances_by_hostname(&self, hostname: &str) -> Result<(), DrainError>;
}

#[derive(Debug, Clone)]
pub struct DrainingConfig {
    pub run_interval: Duration,
    pub drain_timeout: Duration,
    pub max_drain_attempts: u32,
    pub max_terminate_attempts: u32,
}

impl Default for DrainingConfig {
    fn default() -> Self {
        Self {
            run_interval: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(90),
            max_drain_attempts: 3,
            max_terminate_attempts: 3,
        }
    }
}

pub struct DrainingClient<S, A, T> {
    cluster: String,
    store: S,
    action: A,
    terminator: T,
    config: DrainingConfig,
    /// Per-process dedup: a host already in this set was enqueued into its
    /// current queue during this process's lifetime and won't be
    /// re-enqueued by a redundant caller, independent of what the
    /// persisted store says survives a restart.
    processing: Mutex<HashSet<HostKey>>,
}

impl<S, A, T> DrainingClient<S, A, T>
where
    S: DrainQueueStore,
    A: DrainAction,
    T: InstanceTerminator,
{
    pub fn new(cluster: impl Into<String>, store: S, action: A, terminator: T, config: DrainingConfig) -> Self {
        Self { cluster: cluster.into(), store, action, terminator, config, processing: Mutex::new(HashSet::new()) }
    }

    /// Submit a host for cooperative removal. A host already tracked by
    /// this process for the same key is ignored — the persisted record
    /// (if any) is left alone.
    pub fn enqueue(&self, pool: &str, hostname: &str, reason: DrainReason) {
        let key = (self.cluster.clone(), pool.to_string(), hostname.to_string());
        if !self.processing.lock().insert(key) {
            return;
        }
        self.store.upsert(HostRecord::new(self.cluster.clone(), pool, hostname, reason, Utc::now()));
    }

    /// Drop the per-process dedup set, e.g. once a host has fully left all
    /// three queues and could legitimately be re-enqueued later.
    pub fn clean_processing_hosts_cache(&self) {
        let mut processing = self.processing.lock();
        processing.retain(|key| {
            self.store.get(key).map(|record| record.queue != DrainQueueKind::Terminate).unwrap_or(false)
        });
    }

    pub fn process_warning_queue(&self, pool: &str) -> bool {
        let hosts = self.store.in_queue(&self.cluster, pool, DrainQueueKind::Warning);
        let any = !hosts.is_empty();
        for mut record in hosts {
            tracing::info!(hostname = %record.hostname, "warning fired, moving to drain queue");
            record.queue = DrainQueueKind::Drain;
            self.store.upsert(record);
        }
        any
    }

    pub async fn process_drain_queue(&self, pool: &str) -> bool {
        let hosts = self.store.in_queue(&self.cluster, pool, DrainQueueKind::Drain);
        let any = !hosts.is_empty();
        for mut record in hosts {
            if record.drain_started_at.is_none() {
                match self.action.drain(&record.hostname).await {
                    Ok(()) => record.drain_started_at = Some(Utc::now()),
                    Err(err) => {
                        record.drain_attempts += 1;
                        tracing::warn!(hostname = %record.hostname, %err, attempts = record.drain_attempts, "drain attempt failed");
                        if record.drain_attempts >= self.config.max_drain_attempts {
                            tracing::warn!(hostname = %record.hostname, "exceeded max drain attempts, forcing to terminate queue");
                            record.queue = DrainQueueKind::Terminate;
                        }
                        self.store.upsert(record);
                        continue;
                    }
                }
            }

            let elapsed = Utc::now().signed_duration_since(record.drain_started_at.expect("just set above"));
            if elapsed.to_std().unwrap_or_default() >= self.config.drain_timeout {
                record.queue = DrainQueueKind::Terminate;
            }
            self.store.upsert(record);
        }
        any
    }

    pub async fn process_termination_queue(&self, pool: &str) -> bool {
        let hosts = self.store.in_queue(&self.cluster, pool, DrainQueueKind::Terminate);
        let any = !hosts.is_empty();
        for mut record in hosts {
            let key = (record.cluster.clone(), record.pool.clone(), record.hostname.clone());
            match self.terminator.terminate_instances_by_hostname(&record.hostname).await {
                Ok(()) => {
                    self.store.remove(&key);
                }
                Err(err) => {
                    record.terminate_attempts += 1;
                    tracing::warn!(hostname = %record.hostname, %err, attempts = record.terminate_attempts, "terminate attempt failed, requeuing with back-off");
                    self.store.upsert(record);
                }
            }
        }
        any
    }

    /// Poll all three queues for `pool` once.
    pub async fn process_all_queues(&self, pool: &str) -> bool {
        let warning = self.process_warning_queue(pool);
        let drain = self.process_drain_queue(pool).await;
        let terminate = self.process_termination_queue(pool).await;
        warning || drain || terminate
    }

    /// Poll forever at `self.config.run_interval`, per
    /// `NodeDrainerBatch.run` — never exits except by the caller aborting
    /// the surrounding task.
    pub async fn run_forever(self: Arc<Self>, pools: Vec<String>) -> ! {
        loop {
            let mut any_processed = false;
            for pool in &pools {
                self.clean_processing_hosts_cache();
                if self.process_all_queues(pool).await {
                    any_processed = true;
                }
            }
            if !any_processed {
                tokio::time::sleep(self.config.run_interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::InMemoryDrainQueueStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AlwaysSucceedsAction;
    #[async_trait]
    impl DrainAction for AlwaysSucceedsAction {
        async fn drain(&self, _hostname: &str) -> Result<(), DrainError> {
            Ok(())
        }
    }

    struct CountingTerminator {
        calls: AtomicUsize,
    }
    #[async_trait]
    impl InstanceTerminator for CountingTerminator {
        async fn terminate_instances_by_hostname(&self, _hostname: &str) -> Result<(), DrainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn client() -> DrainingClient<InMemoryDrainQueueStore, AlwaysSucceedsAction, CountingTerminator> {
        DrainingClient::new(
            "cluster-a",
            InMemoryDrainQueueStore::new(),
            AlwaysSucceedsAction,
            CountingTerminator { calls: AtomicUsize::new(0) },
            DrainingConfig { drain_timeout: Duration::from_secs(0), ..Default::default() },
        )
    }

    #[test]
    fn enqueue_is_deduped_within_a_process() {
        let client = client();
        client.enqueue("pool-a", "host-1", DrainReason::PoolManagerPrune);
        client.enqueue("pool-a", "host-1", DrainReason::PoolManagerPrune);
        // PoolManagerPrune enters the drain queue directly, not warning.
        assert_eq!(client.store.in_queue("cluster-a", "pool-a", DrainQueueKind::Drain).len(), 1);
    }

    #[test]
    fn warning_queue_moves_hosts_straight_to_drain() {
        let client = client();
        client.enqueue("pool-a", "host-1", DrainReason::SpotInterruption);
        assert!(client.process_warning_queue("pool-a"));
        assert_eq!(client.store.in_queue("cluster-a", "pool-a", DrainQueueKind::Drain).len(), 1);
    }

    #[tokio::test]
    async fn drain_then_terminate_clears_the_host() {
        let client = client();
        client.enqueue("pool-a", "host-1", DrainReason::PoolManagerPrune);
        client.process_warning_queue("pool-a");
        client.process_drain_queue("pool-a").await;
        // zero-second timeout means this immediately moves to terminate.
        assert_eq!(client.store.in_queue("cluster-a", "pool-a", DrainQueueKind::Terminate).len(), 1);
        client.process_termination_queue("pool-a").await;
        let key = ("cluster-a".to_string(), "pool-a".to_string(), "host-1".to_string());
        assert!(client.store.get(&key).is_none());
    }
}
