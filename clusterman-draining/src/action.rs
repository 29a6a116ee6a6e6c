//! Scheduler-specific drain mechanics, ported from `draining/kubernetes.py`
//! (cordon + evict) and the Mesos maintenance-window equivalent described
//! alongside it. Selected per pool the same way `ClusterConnector`
//! implementations are: one variant per `SchedulerKind`.

use async_trait::async_trait;

use crate::error::DrainError;

/// Narrow interface onto the scheduler-specific half of draining a host —
/// everything after "this host has been chosen to leave" and before
/// "terminate the underlying instance", which stays the resource group's
/// job.
#[async_trait]
pub trait DrainAction: Send + Sync {
    /// Cordon the node and evict its eviction-respecting tasks (Kubernetes),
    /// or place it into maintenance mode (Mesos). Idempotent: calling it
    /// again on an already-draining host is a no-op success.
    async fn drain(&self, hostname: &str) -> Result<(), DrainError>;
}

/// Narrow interface onto the API client used to cordon/evict a node.
#[async_trait]
pub trait KubernetesDrainApi: Send + Sync {
    async fn cordon_node(&self, hostname: &str) -> Result<(), DrainError>;
    async fn evict_pods(&self, hostname: &str) -> Result<(), DrainError>;
}

pub struct KubernetesDrainAction {
    client: Box<dyn KubernetesDrainApi>,
}

impl KubernetesDrainAction {
    pub fn new(client: Box<dyn KubernetesDrainApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DrainAction for KubernetesDrainAction {
    async fn drain(&self, hostname: &str) -> Result<(), DrainError> {
        tracing::info!(%hostname, "preparing to drain");
        self.client.cordon_node(hostname).await?;
        self.client.evict_pods(hostname).await?;
        tracing::info!(%hostname, "drained");
        Ok(())
    }
}

/// Narrow interface onto the Mesos operator API used to enter maintenance.
#[async_trait]
pub trait MesosDrainApi: Send + Sync {
    async fn schedule_maintenance(&self, hostname: &str) -> Result<(), DrainError>;
}

pub struct MesosDrainAction {
    client: Box<dyn MesosDrainApi>,
}

impl MesosDrainAction {
    pub fn new(client: Box<dyn MesosDrainApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DrainAction for MesosDrainAction {
    async fn drain(&self, hostname: &str) -> Result<(), DrainError> {
        tracing::info!(%hostname, "preparing to drain");
        self.client.schedule_maintenance(hostname).await?;
        tracing::info!(%hostname, "drained");
        Ok(())
    }
}
