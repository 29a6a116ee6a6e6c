use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::KvError;

/// The three state kinds Clusterman writes into the `clusterman_cluster_state`
/// table, keyed alongside a `(cluster, pool, scheduler)` entity string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    AutoscalerPaused,
    AutoscalerCapacityOffset,
    AutoscalerSetpointOverride,
}

impl StateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StateKind::AutoscalerPaused => "autoscaler_paused",
            StateKind::AutoscalerCapacityOffset => "autoscaler_capacity_offset",
            StateKind::AutoscalerSetpointOverride => "autoscaler_setpoint_override",
        }
    }
}

/// One row of the external KV store: a numeric value plus an optional
/// expiration. Records past their `expiration_timestamp` are treated as
/// absent by every accessor in this crate — never filtered out by the
/// store itself, since `get_record` is also used by callers (e.g. the CLI's
/// `status` subcommand) that want to see an expired-but-present record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KvRecord {
    pub value: f64,
    pub expiration_timestamp: Option<DateTime<Utc>>,
}

impl KvRecord {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expiration_timestamp.map(|exp| now <= exp).unwrap_or(true)
    }
}

/// The external KV store Clusterman leans on for pause/offset/override
/// flags — specified here only as the narrow interface the control plane
/// consumes (spec.md §1 scopes the persisted store itself out as an
/// external collaborator).
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get_record(&self, state: StateKind, entity: &str) -> Result<Option<KvRecord>, KvError>;
    async fn put_record(&self, state: StateKind, entity: &str, record: KvRecord) -> Result<(), KvError>;
    async fn delete_record(&self, state: StateKind, entity: &str) -> Result<(), KvError>;
}

/// In-process `KvStore`, grounded on the teacher's `aerolithdb-cache`
/// adaptive-store idiom: a flat concurrent map keyed by the composite
/// DynamoDB-style key, with no background eviction — expiry is checked by
/// readers, matching the real DynamoDB table's lazy-expiry semantics.
#[derive(Default)]
pub struct InMemoryKvStore {
    entries: DashMap<(&'static str, String), KvRecord>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get_record(&self, state: StateKind, entity: &str) -> Result<Option<KvRecord>, KvError> {
        Ok(self.entries.get(&(state.as_str(), entity.to_string())).map(|r| *r))
    }

    async fn put_record(&self, state: StateKind, entity: &str, record: KvRecord) -> Result<(), KvError> {
        self.entries.insert((state.as_str(), entity.to_string()), record);
        Ok(())
    }

    async fn delete_record(&self, state: StateKind, entity: &str) -> Result<(), KvError> {
        self.entries.remove(&(state.as_str(), entity.to_string()));
        Ok(())
    }
}

/// `"<cluster>.<pool>.<scheduler>"`, the entity key every accessor uses.
pub fn entity_key(cluster: &str, pool: &str, scheduler: &str) -> String {
    format!("{cluster}.{pool}.{scheduler}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_record() {
        let store = InMemoryKvStore::new();
        let key = entity_key("prod", "default", "mesos");
        let record = KvRecord { value: 1.0, expiration_timestamp: None };
        store.put_record(StateKind::AutoscalerPaused, &key, record).await.unwrap();
        let fetched = store.get_record(StateKind::AutoscalerPaused, &key).await.unwrap();
        assert_eq!(fetched, Some(record));
    }

    #[tokio::test]
    async fn delete_clears_the_record() {
        let store = InMemoryKvStore::new();
        let key = entity_key("prod", "default", "mesos");
        store.put_record(StateKind::AutoscalerPaused, &key, KvRecord { value: 1.0, expiration_timestamp: None }).await.unwrap();
        store.delete_record(StateKind::AutoscalerPaused, &key).await.unwrap();
        assert_eq!(store.get_record(StateKind::AutoscalerPaused, &key).await.unwrap(), None);
    }
}
