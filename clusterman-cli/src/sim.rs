//! An entirely in-memory cluster, used by the `simulate`/`generate-data`
//! subcommands and as the default backend for the `run-*` daemon
//! entrypoints when no production cloud client is wired in. Grounded on
//! the same fake-connector shape the autoscaler and migration worker test
//! suites already build by hand, promoted here into a small reusable type
//! rather than a real cloud API client.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;

use clusterman_connector::connector::{ClusterConnector, ConnectorSnapshot, PendingPod};
use clusterman_connector::migration_crd::{MigrationCrd, MigrationCrdStore, NodeMigrationSpec};
use clusterman_connector::ConnectorError;
use clusterman_core::agent::{Agent, AgentState};
use clusterman_core::instance::Instance;
use clusterman_core::market::{InstanceMarket, InstanceResources};
use clusterman_core::migration::MigrationStatus;
use clusterman_core::resources::ClustermanResources;
use clusterman_draining::action::DrainAction;
use clusterman_draining::client::InstanceTerminator;
use clusterman_draining::error::DrainError;
use clusterman_pool::error::PoolError;
use clusterman_pool::instance_catalog::InstanceCatalog;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct SimulatedClusterConnector {
    snapshot: ConnectorSnapshot,
}

impl SimulatedClusterConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `count` synthetic agents of `instance_type`, evenly spread
    /// across `availability_zones`, each carrying `tasks_per_agent`
    /// same-sized tasks. Used by `generate-data` to produce a pool that
    /// looks like a real one without any cloud credentials.
    pub fn seed_agents(&mut self, count: u32, instance_type: &str, availability_zones: &[&str], tasks_per_agent: u32) {
        let resources = InstanceResources::catalogue_lookup(instance_type).as_clusterman_resources();
        let per_task = ClustermanResources::new(resources.cpus / (tasks_per_agent.max(1) as f64), 0.0, 0.0, 0.0);
        for i in 0..count {
            let az = availability_zones[(i as usize) % availability_zones.len().max(1)];
            let ip = format!("10.0.{}.{}", i / 254, i % 254 + 1);
            let allocated = per_task * (tasks_per_agent as f64);
            self.snapshot.agents_by_ip.insert(
                ip,
                Agent {
                    agent_id: format!("sim-{instance_type}-{az}-{i}"),
                    allocated_resources: allocated,
                    total_resources: resources,
                    task_count: tasks_per_agent,
                    batch_task_count: 0,
                    state: AgentState::Running,
                    is_safe_to_kill: true,
                    kernel_version: Some("5.15.0-1234-aws".to_string()),
                    lsb_release: Some("20.04".to_string()),
                    taints: Vec::new(),
                    annotations: BTreeMap::new(),
                },
            );
        }
    }

    pub fn push_pending_pod(&mut self, name: impl Into<String>, requested: ClustermanResources) {
        self.snapshot.pending_pods.push(PendingPod { name: name.into(), requested, matches_pool: true });
    }

    pub fn remove_agent(&mut self, ip: &str) {
        self.snapshot.agents_by_ip.remove(ip);
    }
}

/// Seeds a synthetic fleet across a connector, an instance catalog, and a
/// group's `instance_ids` list all at once, so the three stay consistent:
/// every [`Instance`] this returns has a matching agent in `connector` at
/// the same IP. Used by the `simulate` and `generate-data` subcommands and
/// by the `run-*` daemon entrypoints' startup seeding.
pub fn seed_pool(
    connector: &mut SimulatedClusterConnector,
    catalog: &SimulatedInstanceCatalog,
    group_id: &str,
    count: u32,
    instance_type: &str,
    availability_zones: &[&str],
    tasks_per_agent: u32,
    now: chrono::DateTime<Utc>,
) -> Vec<String> {
    connector.seed_agents(count, instance_type, availability_zones, tasks_per_agent);
    let mut instance_ids = Vec::new();
    for (i, ip) in connector.snapshot.agents_by_ip.keys().cloned().enumerate().take(count as usize) {
        let az = availability_zones[i % availability_zones.len().max(1)];
        let instance_id = format!("i-sim-{group_id}-{i}");
        catalog.insert(Instance {
            instance_id: instance_id.clone(),
            market: InstanceMarket::new(instance_type, az),
            ip_address: Some(ip),
            launch_time: now,
            weight: 1.0,
            is_stale: false,
        });
        instance_ids.push(instance_id);
    }
    instance_ids
}

/// In-memory [`InstanceCatalog`], grounded on the same reasoning as
/// [`InMemoryMigrationCrdStore`] below: no cloud `DescribeInstances` call
/// is available in this build, so a resource group's instance ids resolve
/// against a flat map populated by [`seed_pool`] instead.
#[derive(Default)]
pub struct SimulatedInstanceCatalog {
    instances: DashMap<String, Instance>,
}

impl SimulatedInstanceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, instance: Instance) {
        self.instances.insert(instance.instance_id.clone(), instance);
    }

    pub fn remove(&self, instance_id: &str) {
        self.instances.remove(instance_id);
    }
}

impl InstanceCatalog for SimulatedInstanceCatalog {
    fn describe_instances(&self, instance_ids: &[String]) -> Result<Vec<Instance>, PoolError> {
        Ok(instance_ids.iter().filter_map(|id| self.instances.get(id).map(|e| e.value().clone())).collect())
    }
}

#[async_trait]
impl ClusterConnector for SimulatedClusterConnector {
    async fn reload_state(&mut self) -> Result<(), ConnectorError> {
        // Already fully in memory; nothing to reconcile against.
        Ok(())
    }

    fn snapshot(&self) -> &ConnectorSnapshot {
        &self.snapshot
    }
}

/// No-op drain mechanics for the simulator: cordoning/evicting happens
/// instantaneously since there's no real scheduler to ask.
#[derive(Debug, Default)]
pub struct SimulatedDrainAction;

#[async_trait]
impl DrainAction for SimulatedDrainAction {
    async fn drain(&self, hostname: &str) -> Result<(), DrainError> {
        tracing::info!(%hostname, at = %Utc::now(), "simulated drain");
        Ok(())
    }
}

/// No-op instance termination for the simulator.
#[derive(Debug, Default)]
pub struct SimulatedTerminator;

#[async_trait]
impl InstanceTerminator for SimulatedTerminator {
    async fn terminate_instances_by_hostname(&self, hostname: &str) -> Result<(), DrainError> {
        tracing::info!(%hostname, "simulated termination");
        Ok(())
    }
}

/// In-memory `MigrationCrdStore`, for the same reason `InMemoryKvStore` and
/// `InMemoryDrainQueueStore` exist: no Kubernetes client is available in
/// this build, and the CLI's `migrate` subcommand and migration worker
/// still need something to exercise locally.
#[derive(Default)]
pub struct InMemoryMigrationCrdStore {
    crds: DashMap<String, MigrationCrd>,
    next_id: std::sync::atomic::AtomicU64,
}

impl InMemoryMigrationCrdStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MigrationCrdStore for InMemoryMigrationCrdStore {
    async fn list_node_migration_resources(
        &self,
        statuses: &[MigrationStatus],
        max_attempts: u32,
    ) -> Result<Vec<MigrationCrd>, ConnectorError> {
        Ok(self
            .crds
            .iter()
            .map(|e| e.value().clone())
            .filter(|crd| crd.status().map(|s| statuses.contains(&s)).unwrap_or(false) && crd.attempts() <= max_attempts)
            .collect())
    }

    async fn mark_node_migration_resource(&self, name: &str, status: MigrationStatus) -> Result<(), ConnectorError> {
        if let Some(mut entry) = self.crds.get_mut(name) {
            let attempts = entry.attempts();
            *entry = MigrationCrd::new(name, entry.spec.clone(), status, attempts);
        }
        Ok(())
    }

    async fn create_node_migration_resource(
        &self,
        spec: NodeMigrationSpec,
        status: MigrationStatus,
    ) -> Result<MigrationCrd, ConnectorError> {
        let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let name = format!("migration-{id}");
        let crd = MigrationCrd::new(&name, spec, status, 0);
        self.crds.insert(name, crd.clone());
        Ok(crd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_agents_show_up_in_the_snapshot() {
        let mut connector = SimulatedClusterConnector::new();
        connector.seed_agents(4, "m5.large", &["us-west-2a", "us-west-2b"], 2);
        connector.reload_state().await.unwrap();
        assert_eq!(connector.snapshot().agents_by_ip.len(), 4);
        assert_eq!(connector.get_resource_total("cpus"), 8.0);
    }

    #[test]
    fn removing_an_agent_shrinks_the_snapshot() {
        let mut connector = SimulatedClusterConnector::new();
        connector.seed_agents(2, "m5.large", &["us-west-2a"], 0);
        let ip = connector.snapshot().agents_by_ip.keys().next().unwrap().clone();
        connector.remove_agent(&ip);
        assert_eq!(connector.snapshot().agents_by_ip.len(), 1);
    }

    #[test]
    fn seed_pool_keeps_catalog_and_connector_consistent() {
        let mut connector = SimulatedClusterConnector::new();
        let catalog = SimulatedInstanceCatalog::new();
        let ids = seed_pool(&mut connector, &catalog, "asg-1", 3, "m5.large", &["us-west-2a"], 1, Utc::now());
        assert_eq!(ids.len(), 3);
        let described = catalog.describe_instances(&ids).unwrap();
        assert_eq!(described.len(), 3);
        for instance in &described {
            let ip = instance.ip_address.as_deref().unwrap();
            assert!(connector.snapshot().agents_by_ip.contains_key(ip));
        }
    }
}
