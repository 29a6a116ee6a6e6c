use serde::{Deserialize, Serialize};

use crate::resources::ClustermanResources;

/// Scheduler-side view of an [`Instance`](crate::instance::Instance).
///
/// An agent is `Orphaned` when the instance exists but no scheduler agent
/// is registered at its IP, `Unknown` when the instance lacks an IP at all,
/// `Idle` when registered but holding no tasks, and `Running` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentState {
    Running,
    Idle,
    Orphaned,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub allocated_resources: ClustermanResources,
    pub total_resources: ClustermanResources,
    pub task_count: u32,
    pub batch_task_count: u32,
    pub state: AgentState,
    pub is_safe_to_kill: bool,
    /// Kubernetes-specific fields; `None` for Mesos agents.
    pub kernel_version: Option<String>,
    pub lsb_release: Option<String>,
    pub taints: Vec<String>,
    pub annotations: std::collections::BTreeMap<String, String>,
}

impl Agent {
    pub fn is_idle(&self) -> bool {
        self.task_count == 0
    }
}
