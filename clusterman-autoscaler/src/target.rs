//! The core target-capacity computation, ported from
//! `autoscaler.py::Autoscaler._compute_target_capacity`. Kept as a pure
//! function of its inputs so the branches in spec.md §4.4 step 4 are each
//! independently testable without a live connector or signal.

use clusterman_core::request::ResourceRequest;
use clusterman_core::resources::ClustermanResources;
use clusterman_core::RESOURCE_DIMENSIONS;

/// Compute the new target capacity for one tick, given an absolute
/// resource request from the signal.
///
/// `capacity_offset` is the pending migration-worker prescaling bump
/// (spec.md §9 Open Question b); it's folded into the usage-based branch
/// exactly where the original adds it, and left out of the "no change" /
/// "seed" / "zero" short-circuit branches since those already bypass the
/// usage computation entirely.
pub fn compute_new_target_capacity(
    request: &ResourceRequest,
    total: &ClustermanResources,
    non_orphan_fulfilled_capacity: f64,
    current_target_capacity: f64,
    setpoint: f64,
    setpoint_margin: f64,
    capacity_offset: f64,
) -> f64 {
    if request.all_none() {
        return current_target_capacity;
    }
    if request.all_zero() {
        return 0.0;
    }
    if current_target_capacity == 0.0 {
        return 1.0;
    }
    if non_orphan_fulfilled_capacity == 0.0 {
        return current_target_capacity;
    }

    let most_constrained_usage_pct = RESOURCE_DIMENSIONS
        .iter()
        .filter_map(|dim| {
            let requested = request.dimension(dim)?;
            let total_for_dim = total.dimension(dim)?;
            if total_for_dim > 0.0 {
                Some(requested / total_for_dim)
            } else {
                None
            }
        })
        .fold(None, |acc: Option<f64>, pct| Some(acc.map_or(pct, |best: f64| best.max(pct))));

    let usage_pct = match most_constrained_usage_pct {
        Some(pct) => pct,
        // No dimension carries both a request and a known total: nothing
        // informative to scale on, hold steady.
        None => return current_target_capacity,
    };

    let scale_factor = usage_pct / setpoint;
    let raw_new_target = non_orphan_fulfilled_capacity * scale_factor + capacity_offset;

    let relative_change = (raw_new_target - current_target_capacity).abs() / current_target_capacity;
    if relative_change < setpoint_margin {
        return current_target_capacity;
    }

    raw_new_target
}

/// Apply a cluster-utilization signal's capacity delta directly to the
/// current target, per the `ClusterUnderutilizedSignal`/
/// `ClusterOverutilizedSignal` path (spec.md §9 Design Notes) — these
/// signals already return a delta pre-shaped by `constrain_cluster_delta`,
/// so no setpoint/usage computation applies.
pub fn apply_delta(current_target_capacity: f64, delta: f64) -> f64 {
    current_target_capacity + delta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(cpus: Option<f64>) -> ResourceRequest {
        ResourceRequest::Aggregated { cpus, mem: None, disk: None, gpus: None }
    }

    #[test]
    fn all_none_request_holds_steady() {
        let total = ClustermanResources::new(80.0, 0.0, 0.0, 0.0);
        let new_target = compute_new_target_capacity(&request(None), &total, 20.0, 20.0, 0.7, 0.1, 0.0);
        assert_eq!(new_target, 20.0);
    }

    #[test]
    fn all_zero_request_drops_to_zero() {
        let total = ClustermanResources::new(80.0, 0.0, 0.0, 0.0);
        let zero = ResourceRequest::Aggregated { cpus: Some(0.0), mem: Some(0.0), disk: Some(0.0), gpus: Some(0.0) };
        let new_target = compute_new_target_capacity(&zero, &total, 20.0, 20.0, 0.7, 0.1, 0.0);
        assert_eq!(new_target, 0.0);
    }

    #[test]
    fn seed_scaling_from_zero_target() {
        let total = ClustermanResources::new(80.0, 0.0, 0.0, 0.0);
        let new_target = compute_new_target_capacity(&request(Some(5.0)), &total, 0.0, 0.0, 0.7, 0.1, 0.0);
        assert_eq!(new_target, 1.0);
    }

    #[test]
    fn no_non_orphan_capacity_holds_steady_for_new_instances_to_join() {
        let total = ClustermanResources::new(80.0, 0.0, 0.0, 0.0);
        let new_target = compute_new_target_capacity(&request(Some(50.0)), &total, 0.0, 12.0, 0.7, 0.1, 0.0);
        assert_eq!(new_target, 12.0);
    }

    /// S1 — scale-up from setpoint breach: two groups at target 10 each
    /// (current total 20), setpoint 0.7, signal requests 70 cpus out of 80
    /// total, all 20 units of fulfilled capacity non-orphaned. Expected
    /// new target 25.
    #[test]
    fn s1_scale_up_from_setpoint_breach() {
        let total = ClustermanResources::new(80.0, 0.0, 0.0, 0.0);
        let new_target = compute_new_target_capacity(&request(Some(70.0)), &total, 20.0, 20.0, 0.7, 0.1, 0.0);
        assert_eq!(new_target, 25.0);
    }

    /// S2 — setpoint margin suppression: usage lands exactly at setpoint,
    /// so the computed target equals the current one and the change is
    /// suppressed by the margin check.
    #[test]
    fn s2_setpoint_margin_suppresses_a_no_op_change() {
        let total = ClustermanResources::new(80.0, 0.0, 0.0, 0.0);
        let new_target = compute_new_target_capacity(&request(Some(56.0)), &total, 20.0, 20.0, 0.7, 0.1, 0.0);
        assert_eq!(new_target, 20.0);
    }

    #[test]
    fn small_relative_change_is_suppressed_by_margin() {
        let total = ClustermanResources::new(100.0, 0.0, 0.0, 0.0);
        // usage_pct = 71/100 = 0.71, scale_factor = 0.71/0.7 ≈ 1.0143,
        // raw_new_target ≈ 20.286 -> relative change ≈ 0.0143 < margin 0.1.
        let new_target = compute_new_target_capacity(&request(Some(71.0)), &total, 20.0, 20.0, 0.7, 0.1, 0.0);
        assert_eq!(new_target, 20.0);
    }

    #[test]
    fn scale_down_below_margin_threshold_is_applied() {
        let total = ClustermanResources::new(10.0, 0.0, 0.0, 0.0);
        // usage_pct = 2/10 = 0.2, scale_factor = 0.2/0.7 ≈ 0.2857,
        // raw_new_target ≈ 20 * 0.2857 ≈ 5.71 -> well outside the margin.
        let new_target = compute_new_target_capacity(&request(Some(2.0)), &total, 20.0, 20.0, 0.7, 0.1, 0.0);
        assert!((new_target - 5.714).abs() < 0.01);
    }

    #[test]
    fn capacity_offset_is_added_to_the_usage_based_target() {
        let total = ClustermanResources::new(80.0, 0.0, 0.0, 0.0);
        let without_offset = compute_new_target_capacity(&request(Some(70.0)), &total, 20.0, 20.0, 0.7, 0.1, 0.0);
        let with_offset = compute_new_target_capacity(&request(Some(70.0)), &total, 20.0, 20.0, 0.7, 0.1, 3.0);
        assert_eq!(with_offset, without_offset + 3.0);
    }

    #[test]
    fn apply_delta_adds_directly_to_current_target() {
        assert_eq!(apply_delta(10.0, -2.0), 8.0);
        assert_eq!(apply_delta(10.0, 3.0), 13.0);
    }
}
