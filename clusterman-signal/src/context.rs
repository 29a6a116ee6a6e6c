use chrono::{DateTime, Utc};
use clusterman_core::resources::ClustermanResources;

/// Everything a built-in (non-subprocess) signal needs to compute its
/// result without going back out to the cluster connector itself — the
/// autoscaler assembles this once per tick from its own reloaded state.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub timestamp: DateTime<Utc>,
    pub current_allocation: ClustermanResources,
    pub total_resources: ClustermanResources,
    pub pending_pod_requests: Vec<ClustermanResources>,
    pub current_target_capacity: f64,
    /// Average CPU utilization over the signal's configured query window,
    /// `None` if no metrics backend is wired up (out of scope per spec.md
    /// §1) — `ClusterUnderutilizedSignal`/`ClusterOverutilizedSignal` treat
    /// a missing value as "do nothing".
    pub average_cpu_utilization: Option<f64>,
}
