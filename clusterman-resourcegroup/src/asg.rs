use async_trait::async_trait;
use clusterman_core::market::InstanceMarket;
use clusterman_core::resources::ClustermanResources;

use crate::error::ResourceGroupError;
use crate::group::{protect_unowned_instances, ResourceGroup, ResourceGroupStatus};

/// An AWS Auto Scaling Group, homogeneous or mixed-instance-policy with
/// launch-template overrides. Status rolls `Active` -> `Rolling` while any
/// instance is tagged stale, back to `Active` once the stale instances are
/// drained and replacements have joined.
pub struct AutoScalingGroup {
    pub group_id: String,
    pub instance_type: String,
    pub min_size: f64,
    pub max_size: f64,
    pub desired_capacity: f64,
    pub instance_ids: Vec<String>,
    pub stale_instance_ids: Vec<String>,
    pub launch_template_overrides: Vec<String>,
}

impl AutoScalingGroup {
    pub fn new(group_id: impl Into<String>, instance_type: impl Into<String>, min_size: f64, max_size: f64) -> Self {
        Self {
            group_id: group_id.into(),
            instance_type: instance_type.into(),
            min_size,
            max_size,
            desired_capacity: 0.0,
            instance_ids: Vec::new(),
            stale_instance_ids: Vec::new(),
            launch_template_overrides: Vec::new(),
        }
    }
}

#[async_trait]
impl ResourceGroup for AutoScalingGroup {
    fn group_id(&self) -> &str {
        &self.group_id
    }

    fn target_capacity(&self) -> f64 {
        if self.is_stale() {
            return 0.0;
        }
        // DesiredCapacity counts stale instances too; Clusterman treats
        // them as already gone, so subtract them back out.
        self.desired_capacity - self.stale_instance_ids.len() as f64
    }

    fn fulfilled_capacity(&self) -> f64 {
        self.instance_ids.len() as f64
    }

    fn instance_ids(&self) -> &[String] {
        &self.instance_ids
    }

    fn is_stale(&self) -> bool {
        // ASG groups themselves are never stale by contract; individual
        // instances within the group can be.
        false
    }

    fn status(&self) -> ResourceGroupStatus {
        if self.stale_instance_ids.is_empty() {
            ResourceGroupStatus::Active
        } else {
            ResourceGroupStatus::Rolling
        }
    }

    fn market_weight(&self, market: &InstanceMarket) -> f64 {
        if market.instance_type == self.instance_type {
            1.0
        } else {
            0.0
        }
    }

    async fn modify_target_capacity(
        &mut self,
        target_capacity: f64,
        _terminate_excess_capacity: bool,
        dry_run: bool,
    ) -> Result<(), ResourceGroupError> {
        if self.is_stale() {
            tracing::info!(group_id = %self.group_id, "not modifying stale resource group");
            return Ok(());
        }
        // Stale instances are still counted by AWS, so add them back in
        // before clamping to [MinSize, MaxSize].
        let adjusted = target_capacity + self.stale_instance_ids.len() as f64;
        let clamped = adjusted.clamp(self.min_size, self.max_size);
        tracing::info!(group_id = %self.group_id, requested = target_capacity, clamped, dry_run, "setting ASG desired capacity");
        if !dry_run {
            self.desired_capacity = clamped;
        }
        Ok(())
    }

    async fn terminate_instances_by_id(&mut self, instance_ids: Vec<String>) -> Result<Vec<String>, ResourceGroupError> {
        let kept = protect_unowned_instances(&self.group_id, &self.instance_ids, instance_ids);
        if kept.is_empty() {
            tracing::warn!(group_id = %self.group_id, "no instances to terminate");
            return Ok(Vec::new());
        }
        self.instance_ids.retain(|id| !kept.contains(id));
        self.stale_instance_ids.retain(|id| !kept.contains(id));
        Ok(kept)
    }

    async fn mark_stale(&mut self, dry_run: bool) -> Result<(), ResourceGroupError> {
        if !dry_run {
            self.stale_instance_ids = self.instance_ids.clone();
        }
        Ok(())
    }

    fn scale_up_options(&self) -> Vec<ClustermanResources> {
        let resources = clusterman_core::market::InstanceResources::catalogue_lookup(&self.instance_type);
        vec![resources.as_clusterman_resources()]
    }

    fn scale_down_options(&self) -> Vec<ClustermanResources> {
        self.scale_up_options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn modify_target_capacity_adds_back_stale_count_before_clamping() {
        let mut asg = AutoScalingGroup::new("asg-1", "m5.large", 0.0, 100.0);
        asg.stale_instance_ids = vec!["i-1".into(), "i-2".into()];
        asg.modify_target_capacity(10.0, false, false).await.unwrap();
        assert_eq!(asg.desired_capacity, 12.0);
    }

    #[tokio::test]
    async fn modify_target_capacity_clamps_to_max_size() {
        let mut asg = AutoScalingGroup::new("asg-1", "m5.large", 0.0, 5.0);
        asg.modify_target_capacity(10.0, false, false).await.unwrap();
        assert_eq!(asg.desired_capacity, 5.0);
    }

    #[tokio::test]
    async fn terminate_drops_unowned_ids() {
        let mut asg = AutoScalingGroup::new("asg-1", "m5.large", 0.0, 100.0);
        asg.instance_ids = vec!["i-1".into(), "i-2".into()];
        let terminated = asg.terminate_instances_by_id(vec!["i-1".into(), "i-unowned".into()]).await.unwrap();
        assert_eq!(terminated, vec!["i-1".to_string()]);
        assert_eq!(asg.instance_ids, vec!["i-2".to_string()]);
    }
}
