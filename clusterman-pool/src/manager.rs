use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use clusterman_connector::connector::ClusterConnector;
use clusterman_resourcegroup::group::ResourceGroup;

use crate::constrain::constrain_target_capacity;
use crate::error::PoolError;
use crate::instance_catalog::InstanceCatalog;
use crate::metadata::InstanceMetadata;
use crate::prune::{choose_instances_to_prune, prioritized_killable_instances};
use crate::targets::{compute_new_resource_group_targets, GroupTarget};

#[derive(Debug, Clone)]
pub struct ScalingLimits {
    pub min_capacity: f64,
    pub max_capacity: f64,
    pub max_weight_to_add: f64,
    pub max_weight_to_remove: f64,
    pub max_tasks_to_kill: u32,
}

/// Which marked instances terminate outright versus get handed to the
/// draining queue, per spec.md §4.5 step 3: instances with no live agent
/// are terminated directly; instances still hosting a live agent go
/// through cooperative draining instead.
#[derive(Debug, Clone, Default)]
pub struct PruneDecision {
    pub terminate_directly: HashMap<String, Vec<String>>,
    pub enqueue_for_draining: HashMap<String, Vec<String>>,
}

/// Owns the set of resource groups backing one (cluster, pool) and
/// distributes/prunes capacity across them, per `MesosPoolManager`.
pub struct PoolManager {
    pub cluster: String,
    pub pool: String,
    pub resource_groups: BTreeMap<String, Box<dyn ResourceGroup>>,
    pub scaling_limits: ScalingLimits,
}

impl PoolManager {
    pub fn new(cluster: impl Into<String>, pool: impl Into<String>, scaling_limits: ScalingLimits) -> Self {
        Self { cluster: cluster.into(), pool: pool.into(), resource_groups: BTreeMap::new(), scaling_limits }
    }

    /// Sum of non-stale groups' target capacities. Errors if every group
    /// is stale — there is then no meaningful target to report.
    pub fn target_capacity(&self) -> Result<f64, PoolError> {
        let non_stale: Vec<&Box<dyn ResourceGroup>> = self.resource_groups.values().filter(|g| !g.is_stale()).collect();
        if non_stale.is_empty() {
            return Err(PoolError::AllResourceGroupsAreStale);
        }
        Ok(non_stale.iter().map(|g| g.target_capacity()).sum())
    }

    pub fn fulfilled_capacity(&self) -> f64 {
        self.resource_groups.values().map(|g| g.fulfilled_capacity()).sum()
    }

    pub fn non_orphan_fulfilled_capacity(&self, metadatas: &[InstanceMetadata]) -> f64 {
        metadatas
            .iter()
            .filter(|m| m.agent_state != clusterman_core::agent::AgentState::Orphaned)
            .map(|m| m.weight)
            .sum()
    }

    pub fn constrain_target_capacity(&self, requested_target_capacity: f64, force: bool) -> Result<f64, PoolError> {
        // A pool where every group has gone stale has no meaningful
        // "current" capacity to clamp from; treat it as 0 and let the
        // request through so the caller can drain down to nothing rather
        // than erroring out mid-rollout.
        let current = match self.target_capacity() {
            Ok(t) => t,
            Err(PoolError::AllResourceGroupsAreStale) => 0.0,
            Err(err) => return Err(err),
        };
        Ok(constrain_target_capacity(
            current,
            requested_target_capacity,
            self.scaling_limits.min_capacity,
            self.scaling_limits.max_capacity,
            self.scaling_limits.max_weight_to_add,
            self.scaling_limits.max_weight_to_remove,
            force,
        ))
    }

    pub fn compute_new_resource_group_targets(&self, new_target_capacity: f64) -> HashMap<String, f64> {
        let non_stale: Vec<GroupTarget> = self
            .resource_groups
            .values()
            .filter(|g| !g.is_stale())
            .map(|g| GroupTarget { group_id: g.group_id().to_string(), current_target: g.target_capacity() })
            .collect();

        let mut targets = compute_new_resource_group_targets(&non_stale, new_target_capacity);
        for (group_id, group) in &self.resource_groups {
            if group.is_stale() {
                targets.insert(group_id.clone(), 0.0);
            }
        }
        targets
    }

    /// Join resource-group instance ids against the cloud catalog and the
    /// scheduler connector snapshot, per `get_instance_metadatas`.
    pub fn get_instance_metadatas(
        &self,
        catalog: &dyn InstanceCatalog,
        connector: &dyn ClusterConnector,
        now: DateTime<Utc>,
    ) -> Result<Vec<InstanceMetadata>, PoolError> {
        let mut metadatas = Vec::new();
        for group in self.resource_groups.values() {
            let instances = catalog.describe_instances(group.instance_ids())?;
            for instance in &instances {
                metadatas.push(InstanceMetadata::from_instance(instance, group.as_ref(), connector, now));
            }
        }
        Ok(metadatas)
    }

    /// Change the pool's desired capacity, distribute it across resource
    /// groups, then prune any resulting excess. Mirrors
    /// `modify_target_capacity`. Returns the resulting target alongside the
    /// `PruneDecision` so the caller can hand `enqueue_for_draining`
    /// instances to `DrainingClient`. This function only decides and
    /// terminates the agent-less ones; it never enqueues anything itself.
    pub async fn modify_target_capacity(
        &mut self,
        requested_target_capacity: f64,
        dry_run: bool,
        force: bool,
        catalog: &dyn InstanceCatalog,
        connector: &dyn ClusterConnector,
        now: DateTime<Utc>,
    ) -> Result<(f64, PruneDecision), PoolError> {
        if self.resource_groups.is_empty() {
            return Err(PoolError::NoResourceGroups);
        }

        let new_target_capacity = self.constrain_target_capacity(requested_target_capacity, force)?;
        let group_targets = self.compute_new_resource_group_targets(new_target_capacity);

        for (group_id, target) in &group_targets {
            if let Some(group) = self.resource_groups.get_mut(group_id) {
                group.modify_target_capacity(*target, false, dry_run).await?;
            }
        }

        let decision = self
            .prune_excess_fulfilled_capacity(new_target_capacity, &group_targets, dry_run, catalog, connector, now)
            .await?;

        Ok((new_target_capacity, decision))
    }

    /// Decide which instances to remove to bring fulfilled capacity down
    /// to `new_target_capacity`, then actually terminate the ones with no
    /// live agent. Instances with a live agent are returned for the caller
    /// to hand to `DrainingClient` instead of terminating outright.
    pub async fn prune_excess_fulfilled_capacity(
        &mut self,
        new_target_capacity: f64,
        group_targets: &HashMap<String, f64>,
        dry_run: bool,
        catalog: &dyn InstanceCatalog,
        connector: &dyn ClusterConnector,
        now: DateTime<Utc>,
    ) -> Result<PruneDecision, PoolError> {
        let metadatas = self.get_instance_metadatas(catalog, connector, now)?;
        let max_tasks_to_kill = self.scaling_limits.max_tasks_to_kill;
        let prioritized = prioritized_killable_instances(&metadatas, max_tasks_to_kill);

        let group_fulfilled_capacities: HashMap<String, f64> =
            self.resource_groups.iter().map(|(id, g)| (id.clone(), g.fulfilled_capacity())).collect();
        let non_orphan_fulfilled_capacity = self.non_orphan_fulfilled_capacity(&metadatas);

        let marked = choose_instances_to_prune(
            new_target_capacity,
            group_targets,
            &group_fulfilled_capacities,
            &prioritized,
            self.fulfilled_capacity(),
            non_orphan_fulfilled_capacity,
            max_tasks_to_kill,
        );

        let metadata_by_id: HashMap<&str, &InstanceMetadata> =
            metadatas.iter().map(|m| (m.instance_id.as_str(), m)).collect();

        let mut decision = PruneDecision::default();
        for (group_id, instance_ids) in &marked {
            let (with_agent, without_agent): (Vec<String>, Vec<String>) = instance_ids.iter().cloned().partition(
                |id| metadata_by_id.get(id.as_str()).map(|m| m.has_live_agent()).unwrap_or(false),
            );

            if !without_agent.is_empty() && !dry_run {
                if let Some(group) = self.resource_groups.get_mut(group_id) {
                    let terminated = group.terminate_instances_by_id(without_agent.clone()).await?;
                    decision.terminate_directly.insert(group_id.clone(), terminated);
                }
            } else if !without_agent.is_empty() {
                decision.terminate_directly.insert(group_id.clone(), without_agent);
            }

            if !with_agent.is_empty() {
                decision.enqueue_for_draining.insert(group_id.clone(), with_agent);
            }
        }

        Ok(decision)
    }
}
