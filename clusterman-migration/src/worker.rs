//! Per-pool migration worker: evaluates a [`MigrationEvent`]'s condition
//! against the pool's current nodes, drains the matching ones in
//! `rate`-sized batches, and — as a separate permanent loop — drains nodes
//! that simply got too old. Ported from `migration/worker.py` and
//! `batch/node_migration.py`. Event-triggered migration is a full
//! implementation here even though the source this was ported from leaves
//! it unimplemented; the uptime-triggered path was already complete there.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use clusterman_connector::connector::ClusterConnector;
use clusterman_core::lock::PoolLockRegistry;
use clusterman_core::migration::{MigrationEvent, MigrationStatus};
use clusterman_draining::{DrainAction, DrainQueueStore, DrainReason, DrainingClient, InstanceTerminator};
use clusterman_kv::offset::{remove_capacity_offset, set_capacity_offset};
use clusterman_kv::pause::{disable_autoscaling, enable_autoscaling};
use clusterman_kv::store::KvStore;
use clusterman_pool::error::PoolError;
use clusterman_pool::instance_catalog::InstanceCatalog;
use clusterman_pool::manager::PoolManager;
use clusterman_pool::metadata::InstanceMetadata;

use crate::condition::{self, NodeTraits};
use crate::error::MigrationError;
use crate::portion::PoolPortion;
use crate::precedence::{sort_candidates, PrecedenceRule};
use crate::settings::{WorkerSetup, MIN_PORTION};

/// Permanent per-pool uptime worker cadence.
pub const UPTIME_CHECK_INTERVAL: StdDuration = StdDuration::from_secs(3600);

/// A pool younger than this never triggers uptime-based churn, however
/// old its oldest node already is — avoids draining nodes right after a
/// pool's own bootstrap.
pub const MIN_UPTIME_CHURNING_SECONDS: i64 = 86400;

fn node_traits(metadata: &InstanceMetadata, connector: &dyn ClusterConnector) -> NodeTraits {
    let agent = metadata.instance_ip.as_deref().and_then(|ip| connector.snapshot().agents_by_ip.get(ip));
    NodeTraits {
        kernel_version: agent.and_then(|a| a.kernel_version.clone()),
        lsb_release: agent.and_then(|a| a.lsb_release.clone()),
        instance_type: metadata.market.instance_type.clone(),
        uptime_seconds: metadata.uptime.num_seconds(),
    }
}

fn to_chrono(duration: StdDuration) -> Duration {
    Duration::from_std(duration).unwrap_or_else(|_| Duration::seconds(0))
}

pub struct MigrationWorker<C, K, S, A, T> {
    pub cluster: String,
    pub pool: String,
    pub scheduler: String,
    pub setup: WorkerSetup,
    pub precedence: Vec<PrecedenceRule>,
    pub disable_autoscaling_during_migration: bool,
    pub connector: C,
    pub pool_manager: PoolManager,
    pub catalog: Box<dyn InstanceCatalog>,
    pub kv: K,
    pub draining: Arc<DrainingClient<S, A, T>>,
    pub locks: PoolLockRegistry,
}

impl<C, K, S, A, T> MigrationWorker<C, K, S, A, T>
where
    C: ClusterConnector,
    K: KvStore,
    S: DrainQueueStore,
    A: DrainAction,
    T: InstanceTerminator,
{
    async fn candidates_matching(&mut self, event: &MigrationEvent, now: DateTime<Utc>) -> Result<Vec<InstanceMetadata>, MigrationError> {
        self.connector.reload_state().await?;
        let metadatas = self.pool_manager.get_instance_metadatas(&*self.catalog, &self.connector, now)?;
        let mut matched = Vec::new();
        for metadata in metadatas {
            let traits = node_traits(&metadata, &self.connector);
            if condition::evaluate(&event.condition, &traits)? {
                matched.push(metadata);
            }
        }
        sort_candidates(&mut matched, &self.precedence);
        Ok(matched)
    }

    /// Three simultaneous conditions, per `_monitor_pool_health`: the
    /// drained instances' agents are gone from the connector snapshot,
    /// fulfilled capacity is within tolerance of target, and no
    /// unschedulable pods remain for this pool.
    async fn monitor_pool_health(&mut self, drained_ips: &[String]) -> Result<bool, MigrationError> {
        self.connector.reload_state().await?;

        let still_present = drained_ips.iter().any(|ip| self.connector.snapshot().agents_by_ip.contains_key(ip));
        if still_present {
            return Ok(false);
        }

        let target = match self.pool_manager.target_capacity() {
            Ok(t) => t,
            Err(PoolError::AllResourceGroupsAreStale) => 0.0,
            Err(e) => return Err(e.into()),
        };
        let fulfilled = self.pool_manager.fulfilled_capacity();
        let tolerance = self.setup.max_orphan_capacity_tolerance * target.max(1.0);
        let capacity_ok = fulfilled >= target - tolerance;

        let no_unschedulable = self.connector.get_unschedulable_pods().is_empty();

        Ok(capacity_ok && no_unschedulable)
    }

    /// Enqueue one batch for cooperative draining, then poll
    /// `health_check_interval`-apart until `monitor_pool_health` passes or
    /// `worker_timeout` elapses. Returns `false` on timeout, never errors
    /// just because a batch was slow.
    async fn drain_batch(&mut self, batch: &[InstanceMetadata]) -> Result<bool, MigrationError> {
        let ips: Vec<String> = batch.iter().filter_map(|m| m.instance_ip.clone()).collect();
        for metadata in batch {
            let hostname = metadata.instance_ip.clone().unwrap_or_else(|| metadata.instance_id.clone());
            self.draining.enqueue(&self.pool, &hostname, DrainReason::NodeMigration);
        }

        let deadline = Utc::now() + to_chrono(self.setup.worker_timeout);
        loop {
            tokio::time::sleep(self.setup.health_check_interval).await;
            if self.monitor_pool_health(&ips).await? {
                return Ok(true);
            }
            if Utc::now() >= deadline {
                return Ok(false);
            }
        }
    }

    async fn drain_in_batches(&mut self, mut candidates: Vec<InstanceMetadata>) -> Result<MigrationStatus, MigrationError> {
        let mut failed = 0u32;
        while !candidates.is_empty() {
            let pool_size = self.pool_manager.fulfilled_capacity().round().max(1.0) as u32;
            let batch_size = (self.setup.rate.resolve(pool_size, MIN_PORTION) as usize).max(1).min(candidates.len());
            let batch: Vec<InstanceMetadata> = candidates.drain(..batch_size).collect();

            match self.drain_batch(&batch).await {
                Ok(true) => continue,
                Ok(false) => {
                    failed += 1;
                    tracing::warn!(cluster = %self.cluster, pool = %self.pool, failed, "batch failed to drain within worker_timeout");
                    if failed > self.setup.allowed_failed_drains {
                        return Ok(MigrationStatus::Stop);
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(MigrationStatus::Completed)
    }

    /// Full event-triggered migration: optional autoscaler pause, optional
    /// prescaling bump and boot wait, condition evaluation against the
    /// pool's current nodes, then batch draining in precedence order.
    pub async fn run_event_migration(&mut self, event: &MigrationEvent, now: DateTime<Utc>) -> Result<MigrationStatus, MigrationError> {
        let _guard = self.locks.acquire(&self.cluster, &self.pool).await;

        if self.disable_autoscaling_during_migration {
            let expires_at = now + to_chrono(self.setup.worker_timeout);
            disable_autoscaling(&self.kv, &self.cluster, &self.pool, &self.scheduler, expires_at).await?;
        }

        if !matches!(self.setup.prescaling, PoolPortion::Count(0)) {
            let pool_size = self.pool_manager.fulfilled_capacity().round().max(1.0) as u32;
            let bump = self.setup.prescaling.resolve(pool_size, MIN_PORTION) as f64;
            let expires_at = now + to_chrono(self.setup.node_boot_timeout);
            set_capacity_offset(&self.kv, &self.cluster, &self.pool, &self.scheduler, bump, expires_at).await?;
            tokio::time::sleep(self.setup.node_boot_wait).await;
        }

        let candidates = self.candidates_matching(event, now).await?;
        let result = self.drain_in_batches(candidates).await;

        remove_capacity_offset(&self.kv, &self.cluster, &self.pool, &self.scheduler).await?;
        if self.disable_autoscaling_during_migration {
            enable_autoscaling(&self.kv, &self.cluster, &self.pool, &self.scheduler).await?;
        }

        result
    }

    /// Permanent per-pool worker, run once per [`UPTIME_CHECK_INTERVAL`]
    /// tick by the caller: drains nodes older than `max_uptime`, skipping
    /// entirely if the pool hasn't existed for [`MIN_UPTIME_CHURNING_SECONDS`].
    pub async fn run_uptime_migration(&mut self, max_uptime: StdDuration, now: DateTime<Utc>) -> Result<MigrationStatus, MigrationError> {
        let _guard = self.locks.acquire(&self.cluster, &self.pool).await;

        self.connector.reload_state().await?;
        let metadatas = self.pool_manager.get_instance_metadatas(&*self.catalog, &self.connector, now)?;

        let oldest = metadatas.iter().map(|m| m.uptime).max().unwrap_or_default();
        if oldest < Duration::seconds(MIN_UPTIME_CHURNING_SECONDS) {
            tracing::info!(cluster = %self.cluster, pool = %self.pool, "pool too young for uptime-triggered migration, skipping");
            return Ok(MigrationStatus::Skipped);
        }

        let max_uptime_chrono = to_chrono(max_uptime);
        let mut candidates: Vec<InstanceMetadata> = metadatas.into_iter().filter(|m| m.uptime >= max_uptime_chrono).collect();
        sort_candidates(&mut candidates, &self.precedence);

        self.drain_in_batches(candidates).await
    }
}
