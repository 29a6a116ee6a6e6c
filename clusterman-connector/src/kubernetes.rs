use async_trait::async_trait;
use clusterman_core::agent::{Agent, AgentState};

use crate::connector::{ClusterConnector, ConnectorSnapshot, PendingPod};
use crate::error::ConnectorError;
use crate::resource_parsing::{parse_cpu_quantity, parse_memory_quantity};

pub const SAFE_TO_EVICT_ANNOTATION: &str = "safe-to-evict";

#[derive(Debug, Clone)]
pub struct K8sPodRecord {
    pub name: String,
    pub node_ip: Option<String>,
    pub phase: String,
    pub requested_cpu: String,
    pub requested_memory: String,
    pub annotations: std::collections::BTreeMap<String, String>,
    pub scheduled: bool,
    pub unschedulable_reason: Option<String>,
    pub matches_pool_selector: bool,
}

#[derive(Debug, Clone)]
pub struct K8sNodeRecord {
    pub ip: String,
    pub allocatable_cpu: String,
    pub allocatable_memory: String,
    pub kernel_version: String,
    pub lsb_release: String,
    pub taints: Vec<String>,
}

/// Narrow interface onto the Kubernetes API server — described only
/// through the methods the connector consumes.
#[async_trait]
pub trait KubernetesApiClient: Send + Sync {
    async fn list_nodes(&self, pool: &str) -> Result<Vec<K8sNodeRecord>, ConnectorError>;
    async fn list_pods(&self, pool: &str) -> Result<Vec<K8sPodRecord>, ConnectorError>;
}

pub struct KubernetesClusterConnector {
    client: Box<dyn KubernetesApiClient>,
    pool: String,
    snapshot: ConnectorSnapshot,
}

impl KubernetesClusterConnector {
    pub fn new(client: Box<dyn KubernetesApiClient>, pool: impl Into<String>) -> Self {
        Self { client, pool: pool.into(), snapshot: ConnectorSnapshot::default() }
    }

    fn is_safe_to_evict(pod: &K8sPodRecord) -> bool {
        pod.annotations.get(SAFE_TO_EVICT_ANNOTATION).map(|v| v != "false").unwrap_or(true)
    }
}

#[async_trait]
impl ClusterConnector for KubernetesClusterConnector {
    async fn reload_state(&mut self) -> Result<(), ConnectorError> {
        let nodes = self.client.list_nodes(&self.pool).await?;
        let pods = self.client.list_pods(&self.pool).await?;

        let mut running_pods_by_ip: std::collections::HashMap<String, Vec<&K8sPodRecord>> = std::collections::HashMap::new();
        for pod in &pods {
            if pod.phase == "Running" {
                if let Some(ip) = &pod.node_ip {
                    running_pods_by_ip.entry(ip.clone()).or_default().push(pod);
                }
            }
        }

        let mut agents_by_ip = std::collections::BTreeMap::new();
        for node in nodes {
            let pods_here = running_pods_by_ip.get(&node.ip).cloned().unwrap_or_default();
            let task_count = pods_here.len() as u32;
            let batch_task_count = pods_here
                .iter()
                .filter(|p| !p.annotations.get(SAFE_TO_EVICT_ANNOTATION).map(|v| v == "true").unwrap_or(false))
                .count() as u32;
            let is_safe_to_kill = pods_here.iter().all(|p| Self::is_safe_to_evict(p));

            let cpu_total = parse_cpu_quantity(&node.allocatable_cpu)?;
            let mem_total = parse_memory_quantity(&node.allocatable_memory)?;
            let cpu_allocated: f64 = pods_here.iter().filter_map(|p| parse_cpu_quantity(&p.requested_cpu).ok()).sum();
            let mem_allocated: f64 = pods_here.iter().filter_map(|p| parse_memory_quantity(&p.requested_memory).ok()).sum();

            agents_by_ip.insert(
                node.ip.clone(),
                Agent {
                    agent_id: node.ip.clone(),
                    allocated_resources: clusterman_core::resources::ClustermanResources::new(cpu_allocated, mem_allocated, 0.0, 0.0),
                    total_resources: clusterman_core::resources::ClustermanResources::new(cpu_total, mem_total, 0.0, 0.0),
                    task_count,
                    batch_task_count,
                    state: if task_count == 0 { AgentState::Idle } else { AgentState::Running },
                    is_safe_to_kill,
                    kernel_version: Some(node.kernel_version),
                    lsb_release: Some(node.lsb_release),
                    taints: node.taints,
                    annotations: Default::default(),
                },
            );
        }

        let pending_pods = pods
            .iter()
            .filter(|p| !p.scheduled && p.unschedulable_reason.as_deref() == Some("Unschedulable"))
            .map(|p| PendingPod {
                name: p.name.clone(),
                requested: clusterman_core::resources::ClustermanResources::new(
                    parse_cpu_quantity(&p.requested_cpu).unwrap_or(0.0),
                    parse_memory_quantity(&p.requested_memory).unwrap_or(0.0),
                    0.0,
                    0.0,
                ),
                matches_pool: p.matches_pool_selector,
            })
            .collect();

        self.snapshot = ConnectorSnapshot { agents_by_ip, pending_pods };
        Ok(())
    }

    fn snapshot(&self) -> &ConnectorSnapshot {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct FakeClient {
        nodes: Vec<K8sNodeRecord>,
        pods: Vec<K8sPodRecord>,
    }

    #[async_trait]
    impl KubernetesApiClient for FakeClient {
        async fn list_nodes(&self, _pool: &str) -> Result<Vec<K8sNodeRecord>, ConnectorError> {
            Ok(self.nodes.clone())
        }
        async fn list_pods(&self, _pool: &str) -> Result<Vec<K8sPodRecord>, ConnectorError> {
            Ok(self.pods.clone())
        }
    }

    #[tokio::test]
    async fn unschedulable_pod_surfaces_as_pending() {
        let client = FakeClient {
            nodes: vec![],
            pods: vec![K8sPodRecord {
                name: "p1".into(),
                node_ip: None,
                phase: "Pending".into(),
                requested_cpu: "500m".into(),
                requested_memory: "1Gi".into(),
                annotations: BTreeMap::new(),
                scheduled: false,
                unschedulable_reason: Some("Unschedulable".into()),
                matches_pool_selector: true,
            }],
        };
        let mut connector = KubernetesClusterConnector::new(Box::new(client), "default");
        connector.reload_state().await.unwrap();
        assert!(!connector.has_enough_capacity_for_pods());
        assert_eq!(connector.get_unschedulable_pods().len(), 1);
    }

    #[tokio::test]
    async fn pod_without_safe_to_evict_annotation_blocks_kill() {
        let mut annotations = BTreeMap::new();
        annotations.insert(SAFE_TO_EVICT_ANNOTATION.to_string(), "false".to_string());
        let client = FakeClient {
            nodes: vec![K8sNodeRecord {
                ip: "10.0.0.2".into(),
                allocatable_cpu: "4".into(),
                allocatable_memory: "8Gi".into(),
                kernel_version: "5.10.0".into(),
                lsb_release: "20.04".into(),
                taints: vec![],
            }],
            pods: vec![K8sPodRecord {
                name: "p1".into(),
                node_ip: Some("10.0.0.2".into()),
                phase: "Running".into(),
                requested_cpu: "100m".into(),
                requested_memory: "256Mi".into(),
                annotations,
                scheduled: true,
                unschedulable_reason: None,
                matches_pool_selector: true,
            }],
        };
        let mut connector = KubernetesClusterConnector::new(Box::new(client), "default");
        connector.reload_state().await.unwrap();
        let agent = connector.snapshot().agents_by_ip.get("10.0.0.2").unwrap();
        assert!(!agent.is_safe_to_kill);
    }
}
