//! Temporary capacity offset, ported from `autoscaler/offset.py`. A
//! migration worker's `prescaling` bump (spec.md §9 Open Question b) is the
//! main writer; the autoscaler's target computation is the only reader.

use chrono::{DateTime, Utc};

use crate::error::KvError;
use crate::store::{entity_key, KvRecord, KvStore, StateKind};

pub async fn set_capacity_offset(
    store: &dyn KvStore,
    cluster: &str,
    pool: &str,
    scheduler: &str,
    value: f64,
    expires_at: DateTime<Utc>,
) -> Result<(), KvError> {
    let key = entity_key(cluster, pool, scheduler);
    store
        .put_record(
            StateKind::AutoscalerCapacityOffset,
            &key,
            KvRecord { value, expiration_timestamp: Some(expires_at) },
        )
        .await
}

pub async fn remove_capacity_offset(store: &dyn KvStore, cluster: &str, pool: &str, scheduler: &str) -> Result<(), KvError> {
    let key = entity_key(cluster, pool, scheduler);
    store.delete_record(StateKind::AutoscalerCapacityOffset, &key).await
}

/// Returns the stored offset only if unexpired, `0` otherwise — invariant 7
/// from spec.md §8.
pub async fn get_capacity_offset(
    store: &dyn KvStore,
    cluster: &str,
    pool: &str,
    scheduler: &str,
    now: DateTime<Utc>,
) -> Result<f64, KvError> {
    let key = entity_key(cluster, pool, scheduler);
    let record = store.get_record(StateKind::AutoscalerCapacityOffset, &key).await?;
    Ok(record.filter(|r| r.is_live(now)).map(|r| r.value).unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryKvStore;
    use chrono::Duration;

    #[tokio::test]
    async fn expired_offset_reads_as_zero() {
        let store = InMemoryKvStore::new();
        let now = Utc::now();
        set_capacity_offset(&store, "prod", "default", "mesos", 5.0, now - Duration::seconds(1)).await.unwrap();
        assert_eq!(get_capacity_offset(&store, "prod", "default", "mesos", now).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn live_offset_reads_its_value() {
        let store = InMemoryKvStore::new();
        let now = Utc::now();
        set_capacity_offset(&store, "prod", "default", "mesos", 5.0, now + Duration::seconds(60)).await.unwrap();
        assert_eq!(get_capacity_offset(&store, "prod", "default", "mesos", now).await.unwrap(), 5.0);
    }

    #[tokio::test]
    async fn missing_offset_reads_as_zero() {
        let store = InMemoryKvStore::new();
        assert_eq!(get_capacity_offset(&store, "prod", "default", "mesos", Utc::now()).await.unwrap(), 0.0);
    }
}
