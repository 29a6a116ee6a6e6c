//! The three persisted queues a host moves through on its way out of a
//! pool, keyed by `(cluster, pool, hostname)` exactly as `draining/queue.py`
//! keys its SQS-backed state.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrainQueueKind {
    Warning,
    Drain,
    Terminate,
}

/// Why a host was enqueued in the first place — carried through so the
/// terminate step can attribute the removal correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainReason {
    SpotInterruption,
    MarkedStale,
    PoolManagerPrune,
    NodeMigration,
}

#[derive(Debug, Clone)]
pub struct HostRecord {
    pub cluster: String,
    pub pool: String,
    pub hostname: String,
    pub queue: DrainQueueKind,
    pub reason: DrainReason,
    pub enqueued_at: DateTime<Utc>,
    pub drain_started_at: Option<DateTime<Utc>>,
    pub drain_attempts: u32,
    pub terminate_attempts: u32,
}

impl HostRecord {
    pub fn new(cluster: impl Into<String>, pool: impl Into<String>, hostname: impl Into<String>, reason: DrainReason, now: DateTime<Utc>) -> Self {
        // Spot interruption/mark-stale go through the warning notify hop;
        // pool-manager prune and node migration are already drain-queue
        // triggers and skip straight to drain.
        let queue = match reason {
            DrainReason::SpotInterruption | DrainReason::MarkedStale => DrainQueueKind::Warning,
            DrainReason::PoolManagerPrune | DrainReason::NodeMigration => DrainQueueKind::Drain,
        };
        Self {
            cluster: cluster.into(),
            pool: pool.into(),
            hostname: hostname.into(),
            queue,
            reason,
            enqueued_at: now,
            drain_started_at: None,
            drain_attempts: 0,
            terminate_attempts: 0,
        }
    }
}

pub type HostKey = (String, String, String);

fn key(record: &HostRecord) -> HostKey {
    (record.cluster.clone(), record.pool.clone(), record.hostname.clone())
}

/// Persisted queue state, separate from clusterman-kv's numeric records —
/// a drain record carries queue/reason/attempt state no `KvRecord` shape
/// fits.
pub trait DrainQueueStore: Send + Sync {
    fn upsert(&self, record: HostRecord);
    fn remove(&self, key: &HostKey);
    fn get(&self, key: &HostKey) -> Option<HostRecord>;
    fn in_queue(&self, cluster: &str, pool: &str, queue: DrainQueueKind) -> Vec<HostRecord>;
}

#[derive(Debug, Default)]
pub struct InMemoryDrainQueueStore {
    records: DashMap<HostKey, HostRecord>,
}

impl InMemoryDrainQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DrainQueueStore for InMemoryDrainQueueStore {
    fn upsert(&self, record: HostRecord) {
        self.records.insert(key(&record), record);
    }

    fn remove(&self, key: &HostKey) {
        self.records.remove(key);
    }

    fn get(&self, key: &HostKey) -> Option<HostRecord> {
        self.records.get(key).map(|r| r.value().clone())
    }

    fn in_queue(&self, cluster: &str, pool: &str, queue: DrainQueueKind) -> Vec<HostRecord> {
        self.records
            .iter()
            .filter(|entry| entry.value().cluster == cluster && entry.value().pool == pool && entry.value().queue == queue)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_get_round_trips() {
        let store = InMemoryDrainQueueStore::new();
        let record = HostRecord::new("cluster-a", "pool-a", "host-1", DrainReason::PoolManagerPrune, Utc::now());
        let k = ("cluster-a".to_string(), "pool-a".to_string(), "host-1".to_string());
        store.upsert(record);
        assert!(store.get(&k).is_some());
    }

    #[test]
    fn in_queue_filters_by_cluster_pool_and_kind() {
        let store = InMemoryDrainQueueStore::new();
        let mut record = HostRecord::new("cluster-a", "pool-a", "host-1", DrainReason::PoolManagerPrune, Utc::now());
        record.queue = DrainQueueKind::Drain;
        store.upsert(record);
        let mut other = HostRecord::new("cluster-a", "pool-a", "host-2", DrainReason::PoolManagerPrune, Utc::now());
        other.queue = DrainQueueKind::Warning;
        store.upsert(other);

        let draining = store.in_queue("cluster-a", "pool-a", DrainQueueKind::Drain);
        assert_eq!(draining.len(), 1);
        assert_eq!(draining[0].hostname, "host-1");
    }
}
