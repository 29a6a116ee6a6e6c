//! The default, always-available in-process signal, ported from
//! `signals/pending_pods_signal.py`. Used as the fallback whenever a pool's
//! configured subprocess signal fails to load or evaluate.

use clusterman_core::request::ResourceRequest;
use clusterman_core::resources::ClustermanResources;
use serde_json::Value;

use crate::context::EvaluationContext;

#[derive(Debug, Clone)]
pub struct PendingPodsSignal {
    pub pending_pods_multiplier: f64,
    pub v2: bool,
    pub per_pod_resource_requests: bool,
}

impl Default for PendingPodsSignal {
    fn default() -> Self {
        Self { pending_pods_multiplier: 2.0, v2: true, per_pod_resource_requests: false }
    }
}

impl PendingPodsSignal {
    pub fn from_parameters(parameters: &Value) -> Self {
        let mut signal = Self::default();
        if let Some(m) = parameters.get("pending_pods_multiplier").and_then(Value::as_f64) {
            signal.pending_pods_multiplier = m;
        }
        if let Some(v2) = parameters.get("v2").and_then(Value::as_bool) {
            signal.v2 = v2;
        }
        if let Some(per_pod) = parameters.get("per_pod_resource_requests").and_then(Value::as_bool) {
            signal.per_pod_resource_requests = per_pod;
        }
        signal
    }

    pub fn evaluate(&self, ctx: &EvaluationContext, target_capacity_margin: f64) -> ResourceRequest {
        if self.per_pod_resource_requests {
            return ResourceRequest::PendingPods(ctx.pending_pod_requests.clone());
        }

        let scaled_pending: ClustermanResources =
            ctx.pending_pod_requests.iter().copied().sum::<ClustermanResources>() * self.pending_pods_multiplier;

        let aggregated = if self.v2 {
            if ctx.pending_pod_requests.is_empty() {
                ctx.current_allocation
            } else {
                let min_bump = ctx.total_resources * target_capacity_margin;
                scaled_pending.component_max(min_bump) + ctx.total_resources
            }
        } else {
            scaled_pending + ctx.current_allocation
        };

        ResourceRequest::Aggregated {
            cpus: Some(aggregated.cpus),
            mem: Some(aggregated.mem),
            disk: Some(aggregated.disk),
            gpus: Some(aggregated.gpus),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ctx(pending: Vec<ClustermanResources>) -> EvaluationContext {
        EvaluationContext {
            timestamp: Utc::now(),
            current_allocation: ClustermanResources::new(10.0, 1000.0, 0.0, 0.0),
            total_resources: ClustermanResources::new(100.0, 10_000.0, 0.0, 0.0),
            pending_pod_requests: pending,
            current_target_capacity: 10.0,
            average_cpu_utilization: None,
        }
    }

    #[test]
    fn no_pending_pods_v2_returns_current_allocation() {
        let signal = PendingPodsSignal::default();
        let req = signal.evaluate(&ctx(vec![]), 0.1);
        assert_eq!(req.dimension("cpus"), Some(10.0));
    }

    #[test]
    fn pending_pods_v2_bumps_by_at_least_margin() {
        let signal = PendingPodsSignal::default();
        // A tiny pending pod request shouldn't out-scale the margin floor.
        let tiny = vec![ClustermanResources::new(0.01, 1.0, 0.0, 0.0)];
        let req = signal.evaluate(&ctx(tiny), 0.1);
        // min_bump.cpus = 100 * 0.1 = 10, total = 100 -> expect >= 110
        assert!(req.dimension("cpus").unwrap() >= 110.0);
    }

    #[test]
    fn per_pod_resource_requests_bypasses_aggregation() {
        let mut signal = PendingPodsSignal::default();
        signal.per_pod_resource_requests = true;
        let pending = vec![ClustermanResources::new(1.0, 1.0, 0.0, 0.0)];
        let req = signal.evaluate(&ctx(pending.clone()), 0.1);
        match req {
            ResourceRequest::PendingPods(pods) => assert_eq!(pods.len(), 1),
            _ => panic!("expected PendingPods variant"),
        }
    }
}
