//! Kill-list construction and greedy selection, ported from
//! `_get_prioritized_killable_instances`/`_is_instance_killable`/
//! `_choose_instances_to_prune`.

use std::collections::HashMap;

use clusterman_core::agent::AgentState;

use crate::metadata::InstanceMetadata;

pub fn is_instance_killable(metadata: &InstanceMetadata, max_tasks_to_kill: u32) -> bool {
    if metadata.agent_state == AgentState::Unknown {
        false
    } else if max_tasks_to_kill > 0 {
        true
    } else {
        metadata.task_count == 0
    }
}

/// Filter to killable instances and sort by ascending kill priority.
pub fn prioritized_killable_instances(metadatas: &[InstanceMetadata], max_tasks_to_kill: u32) -> Vec<InstanceMetadata> {
    let mut killable: Vec<InstanceMetadata> =
        metadatas.iter().filter(|m| is_instance_killable(m, max_tasks_to_kill)).cloned().collect();
    killable.sort_by_key(|m| m.kill_sort_key());
    killable
}

/// Greedily mark instances for termination until `new_target_capacity` is
/// reached, respecting the three guards from spec.md §4.5: never take a
/// group below its new target, never exceed `max_tasks_to_kill` summed
/// across marked instances, and never bring non-orphan fulfilled capacity
/// below the new target.
pub fn choose_instances_to_prune(
    new_target_capacity: f64,
    group_targets: &HashMap<String, f64>,
    group_fulfilled_capacities: &HashMap<String, f64>,
    prioritized_killable: &[InstanceMetadata],
    current_fulfilled_capacity: f64,
    non_orphan_fulfilled_capacity: f64,
    max_tasks_to_kill: u32,
) -> HashMap<String, Vec<String>> {
    if current_fulfilled_capacity <= new_target_capacity {
        return HashMap::new();
    }

    let mut rem_group_capacities = group_fulfilled_capacities.clone();
    let mut remaining_non_orphan_capacity = non_orphan_fulfilled_capacity;
    let mut curr_capacity = current_fulfilled_capacity;
    let mut killed_task_count: u32 = 0;
    let mut marked: HashMap<String, Vec<String>> = HashMap::new();

    for instance in prioritized_killable {
        let group_capacity = rem_group_capacities.get(&instance.group_id).copied().unwrap_or(0.0);
        let group_target = group_targets.get(&instance.group_id).copied().unwrap_or(0.0);

        if group_capacity - instance.weight < group_target {
            tracing::info!(instance_id = %instance.instance_id, group_id = %instance.group_id, "resource group is at target capacity, skipping");
            continue;
        }

        if killed_task_count + instance.task_count > max_tasks_to_kill {
            tracing::info!(instance_id = %instance.instance_id, "would exceed max_tasks_to_kill, skipping");
            continue;
        }

        if instance.agent_state != AgentState::Orphaned && remaining_non_orphan_capacity - instance.weight < new_target_capacity {
            tracing::info!(instance_id = %instance.instance_id, "would bring non-orphan capacity below target, skipping");
            continue;
        }

        tracing::info!(instance_id = %instance.instance_id, "marking for termination");
        marked.entry(instance.group_id.clone()).or_default().push(instance.instance_id.clone());
        *rem_group_capacities.entry(instance.group_id.clone()).or_insert(0.0) -= instance.weight;
        curr_capacity -= instance.weight;
        killed_task_count += instance.task_count;
        if instance.agent_state != AgentState::Orphaned {
            remaining_non_orphan_capacity -= instance.weight;
        }

        if curr_capacity <= new_target_capacity {
            break;
        }
    }

    marked
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterman_core::market::InstanceMarket;
    use clusterman_core::resources::ClustermanResources;

    fn metadata(id: &str, group: &str, agent_state: AgentState, task_count: u32) -> InstanceMetadata {
        InstanceMetadata {
            instance_id: id.to_string(),
            group_id: group.to_string(),
            market: InstanceMarket::new("m5.large", "us-west-2a"),
            instance_ip: None,
            is_stale: false,
            agent_state,
            task_count,
            total_resources: ClustermanResources::default(),
            allocated_resources: ClustermanResources::default(),
            uptime: chrono::Duration::seconds(0),
            weight: 1.0,
        }
    }

    #[test]
    fn max_tasks_zero_only_allows_idle_instances() {
        assert!(is_instance_killable(&metadata("i-1", "g", AgentState::Idle, 0), 0));
        assert!(!is_instance_killable(&metadata("i-1", "g", AgentState::Running, 2), 0));
    }

    #[test]
    fn stops_once_target_is_reached() {
        let killable = vec![
            metadata("i-1", "g", AgentState::Orphaned, 0),
            metadata("i-2", "g", AgentState::Idle, 0),
            metadata("i-3", "g", AgentState::Running, 0),
        ];
        let group_targets = HashMap::from([("g".to_string(), 1.0)]);
        let group_fulfilled = HashMap::from([("g".to_string(), 3.0)]);
        let marked = choose_instances_to_prune(1.0, &group_targets, &group_fulfilled, &killable, 3.0, 3.0, 100);
        assert_eq!(marked["g"].len(), 2);
    }

    #[test]
    fn never_takes_a_group_below_its_new_target() {
        let killable = vec![metadata("i-1", "g", AgentState::Idle, 0)];
        let group_targets = HashMap::from([("g".to_string(), 1.0)]);
        let group_fulfilled = HashMap::from([("g".to_string(), 1.0)]);
        let marked = choose_instances_to_prune(0.0, &group_targets, &group_fulfilled, &killable, 1.0, 1.0, 100);
        assert!(marked.is_empty());
    }

    #[test]
    fn never_brings_non_orphan_capacity_below_target() {
        let killable = vec![metadata("i-1", "g", AgentState::Idle, 0)];
        let group_targets = HashMap::from([("g".to_string(), 0.0)]);
        let group_fulfilled = HashMap::from([("g".to_string(), 1.0)]);
        // non-orphan capacity is already exactly at the new target; taking
        // this non-orphan instance would go below it.
        let marked = choose_instances_to_prune(1.0, &group_targets, &group_fulfilled, &killable, 1.0, 1.0, 100);
        assert!(marked.is_empty());
    }

    #[test]
    fn orphaned_instances_bypass_the_non_orphan_guard() {
        let killable = vec![metadata("i-1", "g", AgentState::Orphaned, 0)];
        let group_targets = HashMap::from([("g".to_string(), 0.0)]);
        let group_fulfilled = HashMap::from([("g".to_string(), 1.0)]);
        let marked = choose_instances_to_prune(0.0, &group_targets, &group_fulfilled, &killable, 1.0, 1.0, 100);
        assert_eq!(marked["g"], vec!["i-1".to_string()]);
    }
}
