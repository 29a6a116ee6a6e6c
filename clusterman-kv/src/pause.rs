//! Autoscaler pause/resume flag, ported from `autoscaler/toggle.py`. The
//! CLI's `disable`/`enable` subcommands write this record; the autoscaler
//! tick reads it first, before touching the signal or any resource group.

use chrono::{DateTime, Utc};

use crate::error::KvError;
use crate::store::{entity_key, KvRecord, KvStore, StateKind};

pub async fn disable_autoscaling(
    store: &dyn KvStore,
    cluster: &str,
    pool: &str,
    scheduler: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), KvError> {
    let key = entity_key(cluster, pool, scheduler);
    store
        .put_record(
            StateKind::AutoscalerPaused,
            &key,
            KvRecord { value: 1.0, expiration_timestamp: Some(expires_at) },
        )
        .await
}

pub async fn enable_autoscaling(store: &dyn KvStore, cluster: &str, pool: &str, scheduler: &str) -> Result<(), KvError> {
    let key = entity_key(cluster, pool, scheduler);
    store.delete_record(StateKind::AutoscalerPaused, &key).await
}

/// `true` iff a pause record exists and hasn't expired.
pub async fn is_paused(
    store: &dyn KvStore,
    cluster: &str,
    pool: &str,
    scheduler: &str,
    now: DateTime<Utc>,
) -> Result<bool, KvError> {
    let key = entity_key(cluster, pool, scheduler);
    let record = store.get_record(StateKind::AutoscalerPaused, &key).await?;
    Ok(record.map(|r| r.is_live(now)).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryKvStore;
    use chrono::Duration;

    #[tokio::test]
    async fn pause_then_expiry_then_resume() {
        let store = InMemoryKvStore::new();
        let now = Utc::now();
        disable_autoscaling(&store, "prod", "default", "mesos", now + Duration::hours(1)).await.unwrap();
        assert!(is_paused(&store, "prod", "default", "mesos", now).await.unwrap());
        assert!(!is_paused(&store, "prod", "default", "mesos", now + Duration::hours(2)).await.unwrap());
    }

    #[tokio::test]
    async fn enable_clears_pause_immediately() {
        let store = InMemoryKvStore::new();
        let now = Utc::now();
        disable_autoscaling(&store, "prod", "default", "mesos", now + Duration::hours(1)).await.unwrap();
        enable_autoscaling(&store, "prod", "default", "mesos").await.unwrap();
        assert!(!is_paused(&store, "prod", "default", "mesos", now).await.unwrap());
    }
}
