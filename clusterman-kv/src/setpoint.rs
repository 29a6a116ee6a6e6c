//! Temporary setpoint override, ported from `autoscaler/setpoint.py`.
//! Unlike the capacity offset, absence means "no override" rather than a
//! numeric zero, so the accessor returns `Option<f64>`.

use chrono::{DateTime, Utc};

use crate::error::KvError;
use crate::store::{entity_key, KvRecord, KvStore, StateKind};

pub async fn set_setpoint_override(
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
            StateKind::AutoscalerSetpointOverride,
            &key,
            KvRecord { value, expiration_timestamp: Some(expires_at) },
        )
        .await
}

pub async fn remove_setpoint_override(store: &dyn KvStore, cluster: &str, pool: &str, scheduler: &str) -> Result<(), KvError> {
    let key = entity_key(cluster, pool, scheduler);
    store.delete_record(StateKind::AutoscalerSetpointOverride, &key).await
}

pub async fn get_setpoint_override(
    store: &dyn KvStore,
    cluster: &str,
    pool: &str,
    scheduler: &str,
    now: DateTime<Utc>,
) -> Result<Option<f64>, KvError> {
    let key = entity_key(cluster, pool, scheduler);
    let record = store.get_record(StateKind::AutoscalerSetpointOverride, &key).await?;
    Ok(record.filter(|r| r.is_live(now)).map(|r| r.value))
}
