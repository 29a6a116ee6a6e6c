use std::collections::HashSet;

use async_trait::async_trait;
use clusterman_core::market::InstanceMarket;
use clusterman_core::resources::ClustermanResources;

use crate::error::ResourceGroupError;
use crate::{AutoScalingGroup, Ec2FleetGroup, ElastigroupGroup, SpotFleetRequestGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceGroupStatus {
    Active,
    Rolling,
    Cancelled,
}

/// The narrow vocabulary every resource-group backend implements, per the
/// component design's six-method trait: modify target capacity, terminate
/// by id, mark stale, enumerate scale-up/scale-down options, plus the
/// accessor properties below.
#[async_trait]
pub trait ResourceGroup: Send + Sync {
    fn group_id(&self) -> &str;

    /// Desired weighted capacity. `0` if the group is stale (being drained
    /// down entirely), the backend's own tracked target otherwise.
    fn target_capacity(&self) -> f64;

    fn fulfilled_capacity(&self) -> f64;

    fn instance_ids(&self) -> &[String];

    fn is_stale(&self) -> bool;

    fn status(&self) -> ResourceGroupStatus;

    fn market_weight(&self, market: &InstanceMarket) -> f64 {
        let _ = market;
        1.0
    }

    async fn modify_target_capacity(
        &mut self,
        target_capacity: f64,
        terminate_excess_capacity: bool,
        dry_run: bool,
    ) -> Result<(), ResourceGroupError>;

    async fn terminate_instances_by_id(
        &mut self,
        instance_ids: Vec<String>,
    ) -> Result<Vec<String>, ResourceGroupError>;

    async fn mark_stale(&mut self, dry_run: bool) -> Result<(), ResourceGroupError>;

    fn scale_up_options(&self) -> Vec<ClustermanResources>;

    fn scale_down_options(&self) -> Vec<ClustermanResources>;
}

/// Strip instance ids that don't belong to this group before acting on
/// them, logging a warning for each one dropped. Every backend's
/// `terminate_instances_by_id` calls this first — the Rust analogue of the
/// original's `protect_unowned_instances` decorator.
pub fn protect_unowned_instances(group_id: &str, owned: &[String], requested: Vec<String>) -> Vec<String> {
    let owned_set: HashSet<&String> = owned.iter().collect();
    let mut kept = Vec::with_capacity(requested.len());
    let mut dropped = Vec::new();
    for id in requested {
        if owned_set.contains(&id) {
            kept.push(id);
        } else {
            dropped.push(id);
        }
    }
    if !dropped.is_empty() {
        tracing::warn!(group_id, ?dropped, "instances are not part of this resource group");
    }
    kept
}

/// Tagged-variant dispatch over the four resource-group backends, per the
/// design note preferring enums plus a narrow trait over class hierarchies.
pub enum ResourceGroupKind {
    Asg(AutoScalingGroup),
    SpotFleet(SpotFleetRequestGroup),
    Ec2Fleet(Ec2FleetGroup),
    Elastigroup(ElastigroupGroup),
}

#[async_trait]
impl ResourceGroup for ResourceGroupKind {
    fn group_id(&self) -> &str {
        match self {
            Self::Asg(g) => g.group_id(),
            Self::SpotFleet(g) => g.group_id(),
            Self::Ec2Fleet(g) => g.group_id(),
            Self::Elastigroup(g) => g.group_id(),
        }
    }

    fn target_capacity(&self) -> f64 {
        match self {
            Self::Asg(g) => g.target_capacity(),
            Self::SpotFleet(g) => g.target_capacity(),
            Self::Ec2Fleet(g) => g.target_capacity(),
            Self::Elastigroup(g) => g.target_capacity(),
        }
    }

    fn fulfilled_capacity(&self) -> f64 {
        match self {
            Self::Asg(g) => g.fulfilled_capacity(),
            Self::SpotFleet(g) => g.fulfilled_capacity(),
            Self::Ec2Fleet(g) => g.fulfilled_capacity(),
            Self::Elastigroup(g) => g.fulfilled_capacity(),
        }
    }

    fn instance_ids(&self) -> &[String] {
        match self {
            Self::Asg(g) => g.instance_ids(),
            Self::SpotFleet(g) => g.instance_ids(),
            Self::Ec2Fleet(g) => g.instance_ids(),
            Self::Elastigroup(g) => g.instance_ids(),
        }
    }

    fn is_stale(&self) -> bool {
        match self {
            Self::Asg(g) => g.is_stale(),
            Self::SpotFleet(g) => g.is_stale(),
            Self::Ec2Fleet(g) => g.is_stale(),
            Self::Elastigroup(g) => g.is_stale(),
        }
    }

    fn status(&self) -> ResourceGroupStatus {
        match self {
            Self::Asg(g) => g.status(),
            Self::SpotFleet(g) => g.status(),
            Self::Ec2Fleet(g) => g.status(),
            Self::Elastigroup(g) => g.status(),
        }
    }

    fn market_weight(&self, market: &InstanceMarket) -> f64 {
        match self {
            Self::Asg(g) => g.market_weight(market),
            Self::SpotFleet(g) => g.market_weight(market),
            Self::Ec2Fleet(g) => g.market_weight(market),
            Self::Elastigroup(g) => g.market_weight(market),
        }
    }

    async fn modify_target_capacity(
        &mut self,
        target_capacity: f64,
        terminate_excess_capacity: bool,
        dry_run: bool,
    ) -> Result<(), ResourceGroupError> {
        match self {
            Self::Asg(g) => g.modify_target_capacity(target_capacity, terminate_excess_capacity, dry_run).await,
            Self::SpotFleet(g) => g.modify_target_capacity(target_capacity, terminate_excess_capacity, dry_run).await,
            Self::Ec2Fleet(g) => g.modify_target_capacity(target_capacity, terminate_excess_capacity, dry_run).await,
            Self::Elastigroup(g) => g.modify_target_capacity(target_capacity, terminate_excess_capacity, dry_run).await,
        }
    }

    async fn terminate_instances_by_id(&mut self, instance_ids: Vec<String>) -> Result<Vec<String>, ResourceGroupError> {
        match self {
            Self::Asg(g) => g.terminate_instances_by_id(instance_ids).await,
            Self::SpotFleet(g) => g.terminate_instances_by_id(instance_ids).await,
            Self::Ec2Fleet(g) => g.terminate_instances_by_id(instance_ids).await,
            Self::Elastigroup(g) => g.terminate_instances_by_id(instance_ids).await,
        }
    }

    async fn mark_stale(&mut self, dry_run: bool) -> Result<(), ResourceGroupError> {
        match self {
            Self::Asg(g) => g.mark_stale(dry_run).await,
            Self::SpotFleet(g) => g.mark_stale(dry_run).await,
            Self::Ec2Fleet(g) => g.mark_stale(dry_run).await,
            Self::Elastigroup(g) => g.mark_stale(dry_run).await,
        }
    }

    fn scale_up_options(&self) -> Vec<ClustermanResources> {
        match self {
            Self::Asg(g) => g.scale_up_options(),
            Self::SpotFleet(g) => g.scale_up_options(),
            Self::Ec2Fleet(g) => g.scale_up_options(),
            Self::Elastigroup(g) => g.scale_up_options(),
        }
    }

    fn scale_down_options(&self) -> Vec<ClustermanResources> {
        match self {
            Self::Asg(g) => g.scale_down_options(),
            Self::SpotFleet(g) => g.scale_down_options(),
            Self::Ec2Fleet(g) => g.scale_down_options(),
            Self::Elastigroup(g) => g.scale_down_options(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protect_unowned_instances_drops_foreign_ids() {
        let owned = vec!["i-1".to_string(), "i-2".to_string()];
        let kept = protect_unowned_instances("grp", &owned, vec!["i-1".into(), "i-9".into()]);
        assert_eq!(kept, vec!["i-1".to_string()]);
    }
}
