use async_trait::async_trait;
use clusterman_core::resources::ClustermanResources;

use crate::error::ResourceGroupError;
use crate::group::{protect_unowned_instances, ResourceGroup, ResourceGroupStatus};

/// An EC2 Fleet, similar to a Spot Fleet Request but driven by a
/// `TargetCapacitySpecification` with separate on-demand/spot targets.
/// Clusterman only manages the combined total target.
pub struct Ec2FleetGroup {
    pub group_id: String,
    pub instance_type: String,
    pub total_target_capacity: f64,
    pub instance_ids: Vec<String>,
    pub state: String,
}

impl Ec2FleetGroup {
    pub fn new(group_id: impl Into<String>, instance_type: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            instance_type: instance_type.into(),
            total_target_capacity: 0.0,
            instance_ids: Vec::new(),
            state: "active".to_string(),
        }
    }
}

#[async_trait]
impl ResourceGroup for Ec2FleetGroup {
    fn group_id(&self) -> &str {
        &self.group_id
    }

    fn target_capacity(&self) -> f64 {
        if self.is_stale() {
            0.0
        } else {
            self.total_target_capacity
        }
    }

    fn fulfilled_capacity(&self) -> f64 {
        self.instance_ids.len() as f64
    }

    fn instance_ids(&self) -> &[String] {
        &self.instance_ids
    }

    fn is_stale(&self) -> bool {
        self.state.starts_with("deleted")
    }

    fn status(&self) -> ResourceGroupStatus {
        if self.is_stale() {
            ResourceGroupStatus::Cancelled
        } else {
            ResourceGroupStatus::Active
        }
    }

    async fn modify_target_capacity(
        &mut self,
        target_capacity: f64,
        _terminate_excess_capacity: bool,
        dry_run: bool,
    ) -> Result<(), ResourceGroupError> {
        if self.is_stale() {
            return Ok(());
        }
        tracing::info!(group_id = %self.group_id, target_capacity, dry_run, "modifying EC2 fleet TargetCapacitySpecification");
        if !dry_run {
            self.total_target_capacity = target_capacity;
        }
        Ok(())
    }

    async fn terminate_instances_by_id(&mut self, instance_ids: Vec<String>) -> Result<Vec<String>, ResourceGroupError> {
        let kept = protect_unowned_instances(&self.group_id, &self.instance_ids, instance_ids);
        self.instance_ids.retain(|id| !kept.contains(id));
        Ok(kept)
    }

    async fn mark_stale(&mut self, dry_run: bool) -> Result<(), ResourceGroupError> {
        if !dry_run {
            self.state = "deleted_running".to_string();
        }
        Ok(())
    }

    fn scale_up_options(&self) -> Vec<ClustermanResources> {
        vec![clusterman_core::market::InstanceResources::catalogue_lookup(&self.instance_type).as_clusterman_resources()]
    }

    fn scale_down_options(&self) -> Vec<ClustermanResources> {
        self.scale_up_options()
    }
}
