use chrono::Duration;
use clusterman_connector::connector::ClusterConnector;
use clusterman_core::agent::AgentState;
use clusterman_core::instance::Instance;
use clusterman_core::market::InstanceMarket;
use clusterman_core::resources::ClustermanResources;
use clusterman_resourcegroup::group::ResourceGroup;

/// Everything the prune/kill-selection algorithm needs about one cloud
/// instance, joined from its owning resource group, the cloud catalog and
/// the scheduler-side connector snapshot. Mirrors `InstanceMetadata` from
/// `mesos_pool_manager.py`, minus the raw AWS lifecycle-state string —
/// a resource group's `instance_ids()` already only ever lists instances
/// it considers live.
#[derive(Debug, Clone)]
pub struct InstanceMetadata {
    pub instance_id: String,
    pub group_id: String,
    pub market: InstanceMarket,
    pub instance_ip: Option<String>,
    pub is_stale: bool,
    pub agent_state: AgentState,
    pub task_count: u32,
    pub total_resources: ClustermanResources,
    pub allocated_resources: ClustermanResources,
    pub uptime: Duration,
    pub weight: f64,
}

impl InstanceMetadata {
    pub fn has_live_agent(&self) -> bool {
        matches!(self.agent_state, AgentState::Running | AgentState::Idle)
    }

    pub fn from_instance(instance: &Instance, group: &dyn ResourceGroup, connector: &dyn ClusterConnector, now: chrono::DateTime<chrono::Utc>) -> Self {
        let agent = instance.ip_address.as_deref().and_then(|ip| connector.snapshot().agents_by_ip.get(ip));
        Self {
            instance_id: instance.instance_id.clone(),
            group_id: group.group_id().to_string(),
            market: instance.market.clone(),
            instance_ip: instance.ip_address.clone(),
            is_stale: instance.is_stale,
            agent_state: connector.get_agent_metadata(instance.ip_address.as_deref()),
            task_count: agent.map(|a| a.task_count).unwrap_or(0),
            total_resources: agent.map(|a| a.total_resources).unwrap_or_default(),
            allocated_resources: agent.map(|a| a.allocated_resources).unwrap_or_default(),
            uptime: instance.uptime(now),
            weight: group.market_weight(&instance.market),
        }
    }

    /// Ascending kill priority: orphaned first, then idle, then stale,
    /// then fewest tasks — exactly `_prioritize_killable_instances`'s sort
    /// key.
    pub fn kill_sort_key(&self) -> (u8, u8, u8, u32) {
        (
            if self.agent_state == AgentState::Orphaned { 0 } else { 1 },
            if self.agent_state == AgentState::Idle { 0 } else { 1 },
            if self.is_stale { 0 } else { 1 },
            self.task_count,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(agent_state: AgentState, is_stale: bool, task_count: u32) -> InstanceMetadata {
        InstanceMetadata {
            instance_id: "i-1".into(),
            group_id: "g-1".into(),
            market: InstanceMarket::new("m5.large", "us-west-2a"),
            instance_ip: None,
            is_stale,
            agent_state,
            task_count,
            total_resources: ClustermanResources::default(),
            allocated_resources: ClustermanResources::default(),
            uptime: Duration::seconds(0),
            weight: 1.0,
        }
    }

    #[test]
    fn orphaned_sorts_before_idle_before_stale_before_busy() {
        let mut instances = vec![
            metadata(AgentState::Running, false, 5),
            metadata(AgentState::Orphaned, false, 0),
            metadata(AgentState::Running, true, 0),
            metadata(AgentState::Idle, false, 0),
        ];
        instances.sort_by_key(|m| m.kill_sort_key());
        assert_eq!(instances[0].agent_state, AgentState::Orphaned);
        assert_eq!(instances[1].agent_state, AgentState::Idle);
        assert!(instances[2].is_stale);
    }

    #[test]
    fn has_live_agent_is_true_only_for_running_or_idle() {
        assert!(metadata(AgentState::Running, false, 0).has_live_agent());
        assert!(metadata(AgentState::Idle, false, 0).has_live_agent());
        assert!(!metadata(AgentState::Orphaned, false, 0).has_live_agent());
        assert!(!metadata(AgentState::Unknown, false, 0).has_live_agent());
    }
}
