/// Clamp a signal's requested target capacity to the pool's configured
/// scaling limits, ported from `_constrain_target_capacity`. `force`
/// bypasses the limits entirely rather than clamping to them, logging
/// instead of refusing (the caller decides whether force is appropriate).
pub fn constrain_target_capacity(
    current_target_capacity: f64,
    requested_target_capacity: f64,
    min_capacity: f64,
    max_capacity: f64,
    max_weight_to_add: f64,
    max_weight_to_remove: f64,
    force: bool,
) -> f64 {
    let requested_delta = requested_target_capacity - current_target_capacity;
    let delta = if requested_delta > 0.0 {
        (max_capacity - current_target_capacity).min(max_weight_to_add).min(requested_delta)
    } else if requested_delta < 0.0 {
        (min_capacity - current_target_capacity).max(-max_weight_to_remove).max(requested_delta)
    } else {
        0.0
    };

    if requested_delta != delta {
        if force {
            tracing::warn!(
                current_target_capacity,
                requested_target_capacity,
                "forcing target capacity past scaling limits"
            );
            return current_target_capacity + requested_delta;
        }
        tracing::warn!(
            requested_target_capacity,
            constrained = current_target_capacity + delta,
            "restricting requested target capacity due to scaling limits"
        );
    }
    current_target_capacity + delta
}
