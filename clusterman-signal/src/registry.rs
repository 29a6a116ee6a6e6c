//! Built-in signal registry. A pool's config selects one of these by name
//! when it has no subprocess signal configured, or as the fallback when the
//! subprocess signal fails to load (spec.md §4.3).

use serde_json::Value;

use clusterman_core::request::ResourceRequest;

use crate::context::EvaluationContext;
use crate::pending_pods::PendingPodsSignal;
use crate::utilization::{ClusterOverutilizedSignal, ClusterUnderutilizedSignal};

/// Subprocess and `PendingPodsSignal` both hand back an absolute resource
/// request; the two cluster-utilization heuristics hand back a capacity
/// delta the autoscaler adds to (or subtracts from) the current target.
/// Keeping both shapes behind one enum lets the autoscaler tick loop treat
/// "what did the signal say" uniformly regardless of which kind fired.
#[derive(Debug, Clone)]
pub enum SignalOutcome {
    Request(ResourceRequest),
    Delta(f64),
}

#[derive(Debug, Clone)]
pub enum BuiltinSignal {
    PendingPods(PendingPodsSignal),
    ClusterUnderutilized(ClusterUnderutilizedSignal),
    ClusterOverutilized(ClusterOverutilizedSignal),
}

impl BuiltinSignal {
    pub fn by_name(name: &str, parameters: &Value) -> Option<Self> {
        match name {
            "PendingPodsSignal" => Some(Self::PendingPods(PendingPodsSignal::from_parameters(parameters))),
            "ClusterUnderutilizedSignal" => {
                Some(Self::ClusterUnderutilized(ClusterUnderutilizedSignal::from_parameters(parameters)))
            }
            "ClusterOverutilizedSignal" => {
                Some(Self::ClusterOverutilized(ClusterOverutilizedSignal::from_parameters(parameters)))
            }
            _ => None,
        }
    }

    pub fn evaluate(&self, ctx: &EvaluationContext, target_capacity_margin: f64) -> SignalOutcome {
        match self {
            Self::PendingPods(signal) => SignalOutcome::Request(signal.evaluate(ctx, target_capacity_margin)),
            Self::ClusterUnderutilized(signal) => SignalOutcome::Delta(signal.delta(ctx)),
            Self::ClusterOverutilized(signal) => SignalOutcome::Delta(signal.delta(ctx)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clusterman_core::resources::ClustermanResources;

    #[test]
    fn unknown_name_is_not_a_builtin() {
        assert!(BuiltinSignal::by_name("SomeExternalSignal", &serde_json::json!({})).is_none());
    }

    #[test]
    fn pending_pods_resolves_to_a_request_outcome() {
        let signal = BuiltinSignal::by_name("PendingPodsSignal", &serde_json::json!({})).unwrap();
        let ctx = EvaluationContext {
            timestamp: Utc::now(),
            current_allocation: ClustermanResources::new(5.0, 0.0, 0.0, 0.0),
            total_resources: ClustermanResources::default(),
            pending_pod_requests: vec![],
            current_target_capacity: 5.0,
            average_cpu_utilization: None,
        };
        match signal.evaluate(&ctx, 0.1) {
            SignalOutcome::Request(_) => {}
            SignalOutcome::Delta(_) => panic!("expected a Request outcome"),
        }
    }

    #[test]
    fn underutilized_resolves_to_a_delta_outcome() {
        let signal = BuiltinSignal::by_name("ClusterUnderutilizedSignal", &serde_json::json!({})).unwrap();
        let ctx = EvaluationContext {
            timestamp: Utc::now(),
            current_allocation: ClustermanResources::default(),
            total_resources: ClustermanResources::default(),
            pending_pod_requests: vec![],
            current_target_capacity: 5.0,
            average_cpu_utilization: Some(0.05),
        };
        match signal.evaluate(&ctx, 0.1) {
            SignalOutcome::Delta(d) => assert!(d < 0.0),
            SignalOutcome::Request(_) => panic!("expected a Delta outcome"),
        }
    }
}
