//! Pure capacity-distribution math, ported from
//! `_compute_new_resource_group_targets` in `mesos_pool_manager.py`. Kept
//! free of the `ResourceGroup` trait so it's testable as ordinary data in,
//! data out.

use std::collections::HashMap;

/// One non-stale resource group's current target, as seen by the
/// distribution algorithm.
#[derive(Debug, Clone)]
pub struct GroupTarget {
    pub group_id: String,
    pub current_target: f64,
}

/// Spread `new_target_capacity` across `groups`, never decreasing a
/// group's target on scale-up nor increasing it on scale-down, otherwise
/// equalizing as evenly as integer division allows. Stale groups are the
/// caller's responsibility to zero out separately — this function only
/// ever sees the non-stale set.
pub fn compute_new_resource_group_targets(groups: &[GroupTarget], new_target_capacity: f64) -> HashMap<String, f64> {
    if groups.is_empty() {
        return HashMap::new();
    }

    let current_total: f64 = groups.iter().map(|g| g.current_target).sum();
    let coeff = if new_target_capacity >= current_total { 1.0 } else { -1.0 };

    let mut ordered: Vec<&GroupTarget> = groups.iter().collect();
    ordered.sort_by(|a, b| (coeff * a.current_target).partial_cmp(&(coeff * b.current_target)).unwrap());

    let mut targets_to_change: Vec<f64> = ordered.iter().map(|g| coeff * g.current_target).collect();
    let mut num_groups_to_change = ordered.len();
    let mut remaining_target = new_target_capacity;

    loop {
        let n = num_groups_to_change as f64;
        let capacity_per_group = (remaining_target / n).floor();
        let remainder = (remaining_target - capacity_per_group * n).round() as usize;

        let threshold = coeff * capacity_per_group;
        let pos = targets_to_change[..num_groups_to_change].partition_point(|&t| t <= threshold);
        let residual: f64 = targets_to_change[pos..num_groups_to_change].iter().sum();

        if residual == 0.0 {
            for (i, slot) in targets_to_change.iter_mut().enumerate().take(num_groups_to_change) {
                *slot = coeff * (capacity_per_group + if i < remainder { 1.0 } else { 0.0 });
            }
            break;
        }

        remaining_target -= coeff * residual;
        num_groups_to_change = pos;
        if num_groups_to_change == 0 {
            break;
        }
    }

    ordered.iter().zip(targets_to_change.iter()).map(|(group, target)| (group.group_id.clone(), target / coeff)).collect()
}
