//! Two simple built-in heuristics ported from
//! `signals/downscale/cluster_underutilized.py` and
//! `signals/upscale/cluster_overutilized.py`. Unlike the pending-pods
//! signal these return a capacity *delta*, not an absolute request — the
//! autoscaler applies [`constrain_cluster_delta`] before adding it to the
//! current target.

use serde_json::Value;

use crate::context::EvaluationContext;

#[derive(Debug, Clone)]
pub struct ClusterUnderutilizedSignal {
    pub scale_down_threshold: f64,
    pub units_to_remove: f64,
}

impl ClusterUnderutilizedSignal {
    pub fn from_parameters(parameters: &Value) -> Self {
        Self {
            scale_down_threshold: parameters.get("scale_down_threshold").and_then(Value::as_f64).unwrap_or(0.3),
            units_to_remove: parameters.get("units_to_remove").and_then(Value::as_f64).unwrap_or(1.0),
        }
    }

    pub fn delta(&self, ctx: &EvaluationContext) -> f64 {
        match ctx.average_cpu_utilization {
            Some(util) if util <= self.scale_down_threshold => -self.units_to_remove,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClusterOverutilizedSignal {
    pub scale_up_threshold: f64,
    pub units_to_add: f64,
}

impl ClusterOverutilizedSignal {
    pub fn from_parameters(parameters: &Value) -> Self {
        Self {
            scale_up_threshold: parameters.get("scale_up_threshold").and_then(Value::as_f64).unwrap_or(0.9),
            units_to_add: parameters.get("units_to_add").and_then(Value::as_f64).unwrap_or(1.0),
        }
    }

    pub fn delta(&self, ctx: &EvaluationContext) -> f64 {
        match ctx.average_cpu_utilization {
            Some(util) if util >= self.scale_up_threshold => self.units_to_add,
            _ => 0.0,
        }
    }
}

/// Clamp an arbitrarily-large signal-level delta to the pool's scaling
/// limits before it ever reaches the autoscaler's own
/// `_constrain_target_capacity` step, ported from `signals/load_signals.py`.
pub fn constrain_cluster_delta(
    delta: f64,
    target_capacity: f64,
    min_capacity: f64,
    max_capacity: f64,
    max_units_to_add: f64,
    max_units_to_remove: f64,
) -> f64 {
    if delta > 0.0 {
        (max_capacity - target_capacity).min(max_units_to_add).min(delta)
    } else if delta < 0.0 {
        (min_capacity - target_capacity).max(-max_units_to_remove).max(delta)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clusterman_core::resources::ClustermanResources;

    fn ctx(util: Option<f64>) -> EvaluationContext {
        EvaluationContext {
            timestamp: Utc::now(),
            current_allocation: ClustermanResources::default(),
            total_resources: ClustermanResources::default(),
            pending_pod_requests: vec![],
            current_target_capacity: 10.0,
            average_cpu_utilization: util,
        }
    }

    #[test]
    fn underutilized_fires_below_threshold() {
        let signal = ClusterUnderutilizedSignal { scale_down_threshold: 0.3, units_to_remove: 2.0 };
        assert_eq!(signal.delta(&ctx(Some(0.1))), -2.0);
        assert_eq!(signal.delta(&ctx(Some(0.5))), 0.0);
    }

    #[test]
    fn overutilized_fires_above_threshold() {
        let signal = ClusterOverutilizedSignal { scale_up_threshold: 0.9, units_to_add: 3.0 };
        assert_eq!(signal.delta(&ctx(Some(0.95))), 3.0);
        assert_eq!(signal.delta(&ctx(Some(0.5))), 0.0);
    }

    #[test]
    fn constrain_upscale_respects_max_capacity() {
        let constrained = constrain_cluster_delta(100.0, 90.0, 0.0, 100.0, 50.0, 20.0);
        assert_eq!(constrained, 10.0);
    }

    #[test]
    fn constrain_downscale_respects_min_capacity() {
        let constrained = constrain_cluster_delta(-100.0, 10.0, 5.0, 100.0, 50.0, 3.0);
        assert_eq!(constrained, -3.0);
    }
}
