//! Top-level control loop, ported from `autoscaler.py::Autoscaler.run`.
//! One `Autoscaler` per (cluster, pool, app); `tick` performs the sequence
//! in spec.md §4.4: pause check, state reload, signal evaluation with
//! default-signal fallback, target computation, capacity application, and
//! status-check emission.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use clusterman_connector::connector::ClusterConnector;
use clusterman_core::request::ResourceRequest;
use clusterman_core::resources::ClustermanResources;
use clusterman_core::RESOURCE_DIMENSIONS;
use clusterman_draining::{DrainAction, DrainQueueStore, DrainReason, DrainingClient, InstanceTerminator};
use clusterman_kv::offset::get_capacity_offset;
use clusterman_kv::pause::is_paused;
use clusterman_kv::setpoint::get_setpoint_override;
use clusterman_kv::store::{entity_key, KvStore};
use clusterman_pool::instance_catalog::InstanceCatalog;
use clusterman_pool::manager::PoolManager;
use clusterman_signal::context::EvaluationContext;
use clusterman_signal::pending_pods::PendingPodsSignal;
use clusterman_signal::registry::SignalOutcome;

use crate::error::AutoscalerError;
use crate::signal_adapter::TickSignal;
use crate::status::{MonitoringSink, Severity, StatusCheck};
use crate::target::{apply_delta, compute_new_target_capacity};

#[derive(Debug, Clone)]
pub struct AutoscalerConfig {
    pub cluster: String,
    pub pool: String,
    pub scheduler: String,
    pub app: String,
    pub setpoint: f64,
    pub setpoint_margin: f64,
    pub target_capacity_margin: f64,
}

/// Outcome of one tick: either skipped (paused) or applied, carrying the
/// status check that was emitted either way.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    Paused,
    Applied { new_target_capacity: f64 },
}

pub struct Autoscaler<C, K, S, A, T> {
    pub config: AutoscalerConfig,
    pub connector: C,
    pub pool_manager: PoolManager,
    pub signal: Box<dyn TickSignal>,
    pub default_signal: PendingPodsSignal,
    pub kv: K,
    pub catalog: Box<dyn InstanceCatalog>,
    pub monitoring: Box<dyn MonitoringSink>,
    /// Destination for instances `modify_target_capacity` marks for pruning
    /// but that still host a live agent, per spec.md §2/§4.5 step 3: these
    /// are handed to cooperative draining rather than terminated outright.
    pub draining: Arc<DrainingClient<S, A, T>>,
}

impl<C, K, S, A, T> Autoscaler<C, K, S, A, T>
where
    C: ClusterConnector,
    K: KvStore,
    S: DrainQueueStore,
    A: DrainAction,
    T: InstanceTerminator,
{
    fn entity(&self) -> String {
        entity_key(&self.config.cluster, &self.config.pool, &self.config.scheduler)
    }

    fn resource_totals(&self) -> ClustermanResources {
        ClustermanResources::new(
            self.connector.get_resource_total("cpus"),
            self.connector.get_resource_total("mem"),
            self.connector.get_resource_total("disk"),
            self.connector.get_resource_total("gpus"),
        )
    }

    fn resource_allocation(&self) -> ClustermanResources {
        ClustermanResources::new(
            self.connector.get_resource_allocation("cpus"),
            self.connector.get_resource_allocation("mem"),
            self.connector.get_resource_allocation("disk"),
            self.connector.get_resource_allocation("gpus"),
        )
    }

    fn pending_pod_requests(&self) -> Vec<ClustermanResources> {
        self.connector
            .get_unschedulable_pods()
            .into_iter()
            .map(|pod| pod.requested)
            .collect()
    }

    /// Run one tick. Returns `Ok(TickOutcome::Paused)` without touching the
    /// signal or any resource group if the pool's pause record is live.
    /// On a signal failure, the default signal's result is still applied
    /// before the original error is surfaced as
    /// [`AutoscalerError::SignalFallback`].
    pub async fn tick(&mut self, now: DateTime<Utc>, dry_run: bool, force: bool) -> Result<TickOutcome, AutoscalerError> {
        let entity = self.entity();

        if is_paused(&self.kv, &self.config.cluster, &self.config.pool, &self.config.scheduler, now).await? {
            self.monitoring.emit(&StatusCheck::new(
                Severity::Ok,
                &self.config.cluster,
                &self.config.pool,
                &self.config.app,
                "autoscaler paused, skipping tick",
            ));
            return Ok(TickOutcome::Paused);
        }

        self.connector.reload_state().await?;

        let total = self.resource_totals();
        let ctx = EvaluationContext {
            timestamp: now,
            current_allocation: self.resource_allocation(),
            total_resources: total,
            pending_pod_requests: self.pending_pod_requests(),
            current_target_capacity: self.pool_manager.target_capacity().unwrap_or(0.0),
            average_cpu_utilization: None,
        };

        let mut signal_error = None;
        let outcome = match self.signal.evaluate(&ctx, self.config.target_capacity_margin).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(%entity, error = %err, "signal evaluation failed, falling back to default signal");
                let default_request = self.default_signal.evaluate(&ctx, self.config.target_capacity_margin);
                signal_error = Some(err);
                SignalOutcome::Request(default_request)
            }
        };

        let current_target = match self.pool_manager.target_capacity() {
            Ok(t) => t,
            // AllResourceGroupsAreStale: tick treats target as 0 and
            // proceeds to drain (spec.md §7).
            Err(clusterman_pool::error::PoolError::AllResourceGroupsAreStale) => 0.0,
            Err(e) => return Err(e.into()),
        };

        let metadatas = self.pool_manager.get_instance_metadatas(&*self.catalog, &self.connector, now)?;
        let non_orphan_fulfilled = self.pool_manager.non_orphan_fulfilled_capacity(&metadatas);

        let setpoint = get_setpoint_override(&self.kv, &self.config.cluster, &self.config.pool, &self.config.scheduler, now)
            .await?
            .unwrap_or(self.config.setpoint);
        let capacity_offset =
            get_capacity_offset(&self.kv, &self.config.cluster, &self.config.pool, &self.config.scheduler, now).await?;

        let raw_new_target = match &outcome {
            SignalOutcome::Request(request) => compute_new_target_capacity(
                request,
                &total,
                non_orphan_fulfilled,
                current_target,
                setpoint,
                self.config.setpoint_margin,
                capacity_offset,
            ),
            SignalOutcome::Delta(delta) => apply_delta(current_target, *delta),
        };

        log_request_gauges(&entity, &outcome, dry_run);

        let applied = self
            .pool_manager
            .modify_target_capacity(raw_new_target, dry_run, force, &*self.catalog, &self.connector, now)
            .await;

        match applied {
            Ok((new_target_capacity, decision)) => {
                let metadata_by_id: std::collections::HashMap<&str, &clusterman_pool::metadata::InstanceMetadata> =
                    metadatas.iter().map(|m| (m.instance_id.as_str(), m)).collect();
                for instance_ids in decision.enqueue_for_draining.values() {
                    for instance_id in instance_ids {
                        let hostname = metadata_by_id
                            .get(instance_id.as_str())
                            .and_then(|m| m.instance_ip.clone())
                            .unwrap_or_else(|| instance_id.clone());
                        self.draining.enqueue(&self.config.pool, &hostname, DrainReason::PoolManagerPrune);
                    }
                }

                let severity = if signal_error.is_some() { Severity::Warning } else { Severity::Ok };
                let output = if signal_error.is_some() {
                    format!("target capacity set to {new_target_capacity} via fallback signal after an error")
                } else {
                    format!("target capacity set to {new_target_capacity}")
                };
                self.monitoring.emit(&StatusCheck::new(severity, &self.config.cluster, &self.config.pool, &self.config.app, output));

                if let Some(source) = signal_error {
                    return Err(AutoscalerError::SignalFallback { applied_target: new_target_capacity, source });
                }
                Ok(TickOutcome::Applied { new_target_capacity })
            }
            Err(err) => {
                self.monitoring.emit(&StatusCheck::new(
                    Severity::Critical,
                    &self.config.cluster,
                    &self.config.pool,
                    &self.config.app,
                    format!("failed to apply capacity change: {err}"),
                ));
                Err(err.into())
            }
        }
    }
}

fn log_request_gauges(entity: &str, outcome: &SignalOutcome, dry_run: bool) {
    if let SignalOutcome::Request(request) = outcome {
        for dim in RESOURCE_DIMENSIONS {
            if let Some(value) = resource_request_dimension(request, dim) {
                tracing::info!(entity, dimension = dim, value, dry_run, "signal request gauge");
            }
        }
    }
}

fn resource_request_dimension(request: &ResourceRequest, dim: &str) -> Option<f64> {
    request.dimension(dim)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration;

    use clusterman_connector::connector::{ConnectorSnapshot, PendingPod};
    use clusterman_connector::error::ConnectorError;
    use clusterman_core::instance::Instance;
    use clusterman_draining::{DrainError, DrainingConfig, InMemoryDrainQueueStore};
    use clusterman_kv::pause::disable_autoscaling;
    use clusterman_kv::store::InMemoryKvStore;
    use clusterman_signal::error::SignalError;
    use clusterman_pool::error::PoolError as PmError;
    use clusterman_resourcegroup::error::ResourceGroupError;
    use clusterman_resourcegroup::group::{ResourceGroup, ResourceGroupStatus};
    use clusterman_signal::registry::BuiltinSignal;

    use super::*;
    use crate::signal_adapter::BuiltinTickSignal;

    struct NoopDrainAction;
    #[async_trait]
    impl DrainAction for NoopDrainAction {
        async fn drain(&self, _hostname: &str) -> Result<(), DrainError> {
            Ok(())
        }
    }

    struct NoopTerminator;
    #[async_trait]
    impl InstanceTerminator for NoopTerminator {
        async fn terminate_instances_by_hostname(&self, _hostname: &str) -> Result<(), DrainError> {
            Ok(())
        }
    }

    struct FakeConnector {
        total: ClustermanResources,
        allocation: ClustermanResources,
        pending: Vec<PendingPod>,
        snapshot: ConnectorSnapshot,
    }

    #[async_trait]
    impl ClusterConnector for FakeConnector {
        async fn reload_state(&mut self) -> Result<(), ConnectorError> {
            Ok(())
        }

        fn snapshot(&self) -> &ConnectorSnapshot {
            &self.snapshot
        }

        fn get_resource_allocation(&self, dimension: &str) -> f64 {
            self.allocation.dimension(dimension).unwrap_or(0.0)
        }

        fn get_resource_total(&self, dimension: &str) -> f64 {
            self.total.dimension(dimension).unwrap_or(0.0)
        }

        fn get_unschedulable_pods(&self) -> Vec<&PendingPod> {
            self.pending.iter().collect()
        }
    }

    struct FakeCatalog;

    impl InstanceCatalog for FakeCatalog {
        fn describe_instances(&self, _instance_ids: &[String]) -> Result<Vec<Instance>, PmError> {
            Ok(vec![])
        }
    }

    struct FakeGroup {
        target: f64,
    }

    #[async_trait]
    impl ResourceGroup for FakeGroup {
        fn group_id(&self) -> &str {
            "asg1"
        }

        fn target_capacity(&self) -> f64 {
            self.target
        }

        fn fulfilled_capacity(&self) -> f64 {
            self.target
        }

        fn instance_ids(&self) -> &[String] {
            &[]
        }

        fn is_stale(&self) -> bool {
            false
        }

        fn status(&self) -> ResourceGroupStatus {
            ResourceGroupStatus::Active
        }

        async fn modify_target_capacity(&mut self, target_capacity: f64, _terminate_excess_capacity: bool, _dry_run: bool) -> Result<(), ResourceGroupError> {
            self.target = target_capacity;
            Ok(())
        }

        async fn terminate_instances_by_id(&mut self, _instance_ids: Vec<String>) -> Result<Vec<String>, ResourceGroupError> {
            Ok(vec![])
        }

        async fn mark_stale(&mut self, _dry_run: bool) -> Result<(), ResourceGroupError> {
            Ok(())
        }

        fn scale_up_options(&self) -> Vec<ClustermanResources> {
            vec![]
        }

        fn scale_down_options(&self) -> Vec<ClustermanResources> {
            vec![]
        }
    }

    struct FailingSignal;

    #[async_trait]
    impl TickSignal for FailingSignal {
        async fn evaluate(&mut self, _ctx: &EvaluationContext, _target_capacity_margin: f64) -> Result<SignalOutcome, SignalError> {
            Err(SignalError::Evaluation("subprocess crashed".to_string()))
        }
    }

    fn scaling_limits() -> clusterman_pool::manager::ScalingLimits {
        clusterman_pool::manager::ScalingLimits {
            min_capacity: 0.0,
            max_capacity: 1000.0,
            max_weight_to_add: 1000.0,
            max_weight_to_remove: 1000.0,
            max_tasks_to_kill: 1000,
        }
    }

    fn make_autoscaler(
        signal: Box<dyn TickSignal>,
    ) -> Autoscaler<FakeConnector, InMemoryKvStore, InMemoryDrainQueueStore, NoopDrainAction, NoopTerminator> {
        let mut pool_manager = PoolManager::new("prod", "default", scaling_limits());
        pool_manager.resource_groups.insert("asg1".to_string(), Box::new(FakeGroup { target: 20.0 }));

        Autoscaler {
            config: AutoscalerConfig {
                cluster: "prod".to_string(),
                pool: "default".to_string(),
                scheduler: "mesos".to_string(),
                app: "default".to_string(),
                setpoint: 0.7,
                setpoint_margin: 0.1,
                target_capacity_margin: 0.1,
            },
            connector: FakeConnector {
                total: ClustermanResources::new(80.0, 0.0, 0.0, 0.0),
                allocation: ClustermanResources::new(56.0, 0.0, 0.0, 0.0),
                pending: vec![],
                snapshot: ConnectorSnapshot::default(),
            },
            pool_manager,
            signal,
            default_signal: PendingPodsSignal::default(),
            kv: InMemoryKvStore::new(),
            catalog: Box::new(FakeCatalog),
            monitoring: Box::new(TracingMonitoringSink),
            draining: Arc::new(DrainingClient::new(
                "prod",
                InMemoryDrainQueueStore::new(),
                NoopDrainAction,
                NoopTerminator,
                DrainingConfig::default(),
            )),
        }
    }

    #[tokio::test]
    async fn paused_tick_is_skipped_and_leaves_capacity_untouched() {
        let mut autoscaler = make_autoscaler(Box::new(BuiltinTickSignal(BuiltinSignal::PendingPods(PendingPodsSignal::default()))));
        let now = Utc::now();
        disable_autoscaling(&autoscaler.kv, "prod", "default", "mesos", now + Duration::hours(1)).await.unwrap();

        let outcome = autoscaler.tick(now, false, false).await.unwrap();
        assert!(matches!(outcome, TickOutcome::Paused));
        assert_eq!(autoscaler.pool_manager.target_capacity().unwrap(), 20.0);
    }

    #[tokio::test]
    async fn signal_failure_falls_back_to_default_signal_then_reraises() {
        let mut autoscaler = make_autoscaler(Box::new(FailingSignal));
        let now = Utc::now();

        let err = autoscaler.tick(now, false, false).await.unwrap_err();
        match err {
            AutoscalerError::SignalFallback { applied_target, .. } => {
                // No pending pods and no instance metadata: the default
                // pending-pods signal holds steady at the current target.
                assert_eq!(applied_target, 20.0);
            }
            other => panic!("expected SignalFallback, got {other:?}"),
        }
        assert_eq!(autoscaler.pool_manager.target_capacity().unwrap(), 20.0);
    }
}
