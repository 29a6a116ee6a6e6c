use async_trait::async_trait;
use clusterman_core::agent::{Agent, AgentState};
use clusterman_core::resources::ClustermanResources;

use crate::error::ConnectorError;

/// A pod/task awaiting placement, scoped to the pool it requested.
#[derive(Debug, Clone)]
pub struct PendingPod {
    pub name: String,
    pub requested: ClustermanResources,
    pub matches_pool: bool,
}

/// The single consistency point for one autoscaler tick: every query
/// issued after a `reload_state` call reads from this snapshot, never
/// live from the scheduler API.
#[derive(Debug, Clone, Default)]
pub struct ConnectorSnapshot {
    pub agents_by_ip: std::collections::BTreeMap<String, Agent>,
    pub pending_pods: Vec<PendingPod>,
}

/// Reconciles cloud instances with scheduler-side agent state. Implemented
/// by [`crate::MesosClusterConnector`] and
/// [`crate::KubernetesClusterConnector`]; the five methods below are the
/// narrow vocabulary the pool manager and autoscaler consume.
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    /// Rebuild the agent/pod snapshot, pool-filtered via a label selector.
    /// All reads within one autoscaler tick happen after exactly one call
    /// to this method.
    async fn reload_state(&mut self) -> Result<(), ConnectorError>;

    fn snapshot(&self) -> &ConnectorSnapshot;

    /// `Unknown` if `ip` is `None`; `Orphaned` if not present in the
    /// snapshot; `Idle` if present with no tasks; `Running` otherwise.
    fn get_agent_metadata(&self, ip: Option<&str>) -> AgentState {
        let ip = match ip {
            None => return AgentState::Unknown,
            Some(ip) => ip,
        };
        match self.snapshot().agents_by_ip.get(ip) {
            None => AgentState::Orphaned,
            Some(agent) if agent.is_idle() => AgentState::Idle,
            Some(_) => AgentState::Running,
        }
    }

    /// Sum of allocated (if `allocated`) or total resources across the
    /// snapshot for one dimension.
    fn get_resource_value(&self, dimension: &str, allocated: bool) -> f64 {
        self.snapshot()
            .agents_by_ip
            .values()
            .filter_map(|agent| {
                let resources = if allocated { &agent.allocated_resources } else { &agent.total_resources };
                resources.dimension(dimension)
            })
            .sum()
    }

    fn get_resource_allocation(&self, dimension: &str) -> f64 {
        self.get_resource_value(dimension, true)
    }

    fn get_resource_total(&self, dimension: &str) -> f64 {
        self.get_resource_value(dimension, false)
    }

    fn get_percent_resource_allocation(&self, dimension: &str) -> f64 {
        let total = self.get_resource_total(dimension);
        if total == 0.0 {
            0.0
        } else {
            self.get_resource_allocation(dimension) / total
        }
    }

    /// Pods whose scheduling failed (`PodScheduled=False`,
    /// `Unschedulable`), already filtered to this pool's selector.
    fn get_unschedulable_pods(&self) -> Vec<&PendingPod> {
        self.snapshot().pending_pods.iter().filter(|p| p.matches_pool).collect()
    }

    fn has_enough_capacity_for_pods(&self) -> bool {
        self.get_unschedulable_pods().is_empty()
    }
}
