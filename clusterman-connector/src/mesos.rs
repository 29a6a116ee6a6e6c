use async_trait::async_trait;
use clusterman_core::agent::{Agent, AgentState};
use clusterman_core::resources::ClustermanResources;

use crate::connector::{ClusterConnector, ConnectorSnapshot, PendingPod};
use crate::error::ConnectorError;

/// A raw Mesos task as reported by the master's `/tasks` endpoint, reduced
/// to what the connector needs.
#[derive(Debug, Clone)]
pub struct MesosTask {
    pub slave_id: String,
    pub framework_name: String,
    pub state: String,
}

/// A raw Mesos agent (slave) as reported by `/slaves`.
#[derive(Debug, Clone)]
pub struct MesosAgentRecord {
    pub agent_id: String,
    pub ip: String,
    pub allocated: ClustermanResources,
    pub total: ClustermanResources,
}

/// Narrow interface onto the Mesos master HTTP API — described only
/// through the methods the connector consumes, per the component design's
/// framing of cloud/scheduler SDK clients as external collaborators.
#[async_trait]
pub trait MesosApiClient: Send + Sync {
    async fn list_agents(&self) -> Result<Vec<MesosAgentRecord>, ConnectorError>;
    async fn list_tasks(&self) -> Result<Vec<MesosTask>, ConnectorError>;
}

pub struct MesosClusterConnector {
    client: Box<dyn MesosApiClient>,
    pool: String,
    /// Framework name prefixes treated as batch workloads; an agent hosting
    /// any task from one of these frameworks is unsafe to kill.
    non_batch_framework_prefixes: Vec<String>,
    snapshot: ConnectorSnapshot,
}

impl MesosClusterConnector {
    pub fn new(client: Box<dyn MesosApiClient>, pool: impl Into<String>) -> Self {
        Self {
            client,
            pool: pool.into(),
            non_batch_framework_prefixes: vec!["marathon".to_string()],
            snapshot: ConnectorSnapshot::default(),
        }
    }

    pub fn with_batch_framework_allowlist(mut self, non_batch_prefixes: Vec<String>) -> Self {
        self.non_batch_framework_prefixes = non_batch_prefixes;
        self
    }

    fn is_batch_framework(&self, framework_name: &str) -> bool {
        !self.non_batch_framework_prefixes.iter().any(|prefix| framework_name.starts_with(prefix.as_str()))
    }
}

#[async_trait]
impl ClusterConnector for MesosClusterConnector {
    async fn reload_state(&mut self) -> Result<(), ConnectorError> {
        let agents = self.client.list_agents().await?;
        let tasks = self.client.list_tasks().await?;

        let mut task_counts: std::collections::HashMap<String, (u32, bool)> = std::collections::HashMap::new();
        for task in tasks.iter().filter(|t| t.state == "TASK_RUNNING") {
            let entry = task_counts.entry(task.slave_id.clone()).or_insert((0, false));
            entry.0 += 1;
            if self.is_batch_framework(&task.framework_name) {
                entry.1 = true;
            }
        }

        let mut agents_by_ip = std::collections::BTreeMap::new();
        for record in agents {
            let (task_count, has_batch_task) = task_counts.get(&record.agent_id).copied().unwrap_or((0, false));
            let state = if task_count == 0 { AgentState::Idle } else { AgentState::Running };
            agents_by_ip.insert(
                record.ip.clone(),
                Agent {
                    agent_id: record.agent_id,
                    allocated_resources: record.allocated,
                    total_resources: record.total,
                    task_count,
                    batch_task_count: if has_batch_task { task_count } else { 0 },
                    state,
                    is_safe_to_kill: !has_batch_task,
                    kernel_version: None,
                    lsb_release: None,
                    taints: Vec::new(),
                    annotations: Default::default(),
                },
            );
        }

        self.snapshot = ConnectorSnapshot { agents_by_ip, pending_pods: Vec::new() };
        let _ = &self.pool;
        Ok(())
    }

    fn snapshot(&self) -> &ConnectorSnapshot {
        &self.snapshot
    }

    fn get_unschedulable_pods(&self) -> Vec<&PendingPod> {
        // Mesos has no pending-pod concept; unschedulable tasks surface
        // through the signal's pending-work estimate instead.
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeClient {
        agents: Vec<MesosAgentRecord>,
        tasks: Vec<MesosTask>,
    }

    #[async_trait]
    impl MesosApiClient for FakeClient {
        async fn list_agents(&self) -> Result<Vec<MesosAgentRecord>, ConnectorError> {
            Ok(self.agents.clone())
        }
        async fn list_tasks(&self) -> Result<Vec<MesosTask>, ConnectorError> {
            Ok(self.tasks.clone())
        }
    }

    #[tokio::test]
    async fn batch_task_marks_agent_unsafe_to_kill() {
        let client = FakeClient {
            agents: vec![MesosAgentRecord {
                agent_id: "a1".into(),
                ip: "10.0.0.1".into(),
                allocated: ClustermanResources::default(),
                total: ClustermanResources::default(),
            }],
            tasks: vec![MesosTask { slave_id: "a1".into(), framework_name: "batch-etl".into(), state: "TASK_RUNNING".into() }],
        };
        let mut connector = MesosClusterConnector::new(Box::new(client), "default");
        connector.reload_state().await.unwrap();
        let agent = connector.snapshot().agents_by_ip.get("10.0.0.1").unwrap();
        assert!(!agent.is_safe_to_kill);
    }

    #[tokio::test]
    async fn marathon_task_is_safe_to_kill() {
        let client = FakeClient {
            agents: vec![MesosAgentRecord {
                agent_id: "a1".into(),
                ip: "10.0.0.1".into(),
                allocated: ClustermanResources::default(),
                total: ClustermanResources::default(),
            }],
            tasks: vec![MesosTask { slave_id: "a1".into(), framework_name: "marathon-prod".into(), state: "TASK_RUNNING".into() }],
        };
        let mut connector = MesosClusterConnector::new(Box::new(client), "default");
        connector.reload_state().await.unwrap();
        let agent = connector.snapshot().agents_by_ip.get("10.0.0.1").unwrap();
        assert!(agent.is_safe_to_kill);
    }

    #[tokio::test]
    async fn orphaned_ip_not_in_snapshot_reports_orphaned() {
        let client = FakeClient { agents: vec![], tasks: vec![] };
        let mut connector = MesosClusterConnector::new(Box::new(client), "default");
        connector.reload_state().await.unwrap();
        assert_eq!(connector.get_agent_metadata(Some("10.0.0.9")), AgentState::Orphaned);
        assert_eq!(connector.get_agent_metadata(None), AgentState::Unknown);
    }
}
