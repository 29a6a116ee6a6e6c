use async_trait::async_trait;
use clusterman_core::market::InstanceMarket;
use clusterman_core::resources::ClustermanResources;

use crate::error::ResourceGroupError;
use crate::group::{protect_unowned_instances, ResourceGroup, ResourceGroupStatus};

#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub market: InstanceMarket,
    pub weighted_capacity: f64,
    pub resources: ClustermanResources,
}

/// An AWS Spot Fleet Request: diversified allocation across weighted
/// launch specs. Weighted capacity can't be read back directly from the
/// instance count, so `_target_capacity` estimates it from the fleet's
/// declared `TargetCapacity` weight and the per-weight average resource
/// shape of its launch specs, exactly as the original does.
pub struct SpotFleetRequestGroup {
    pub group_id: String,
    pub launch_specs: Vec<LaunchSpec>,
    pub target_capacity_weight: f64,
    pub fulfilled_capacity_weight: f64,
    pub instance_ids: Vec<String>,
    pub status: String,
}

const CANCELLED_STATES: [&str; 2] = ["cancelled", "cancelled_terminating"];

impl SpotFleetRequestGroup {
    pub fn new(group_id: impl Into<String>, launch_specs: Vec<LaunchSpec>) -> Self {
        Self {
            group_id: group_id.into(),
            launch_specs,
            target_capacity_weight: 0.0,
            fulfilled_capacity_weight: 0.0,
            instance_ids: Vec::new(),
            status: "active".to_string(),
        }
    }

    /// The resources that would be added if `target_capacity_weight` were
    /// increased by one unit of weight — the weighted average across all
    /// launch specs' (capacity, weight) pairs.
    fn estimate_capacity_per_weight(&self) -> ClustermanResources {
        let mut sum_weight = 0.0;
        let mut sum_capacity = ClustermanResources::default();
        for spec in &self.launch_specs {
            sum_weight += spec.weighted_capacity;
            sum_capacity += spec.resources;
        }
        if sum_weight == 0.0 {
            return ClustermanResources::default();
        }
        sum_capacity / sum_weight
    }
}

#[async_trait]
impl ResourceGroup for SpotFleetRequestGroup {
    fn group_id(&self) -> &str {
        &self.group_id
    }

    fn target_capacity(&self) -> f64 {
        if self.is_stale() {
            return 0.0;
        }
        let unfulfilled_weight = self.target_capacity_weight - self.fulfilled_capacity_weight;
        let estimate = self.estimate_capacity_per_weight();
        // Use CPU as the representative scalar dimension of the estimate —
        // the pool manager only ever consumes target_capacity as a scalar.
        self.fulfilled_capacity() + estimate.cpus * unfulfilled_weight
    }

    fn fulfilled_capacity(&self) -> f64 {
        self.instance_ids.len() as f64
    }

    fn instance_ids(&self) -> &[String] {
        &self.instance_ids
    }

    fn is_stale(&self) -> bool {
        self.status.starts_with("cancelled")
    }

    fn status(&self) -> ResourceGroupStatus {
        if self.is_stale() {
            ResourceGroupStatus::Cancelled
        } else {
            ResourceGroupStatus::Active
        }
    }

    fn market_weight(&self, market: &InstanceMarket) -> f64 {
        self.launch_specs
            .iter()
            .find(|spec| &spec.market == market)
            .map(|spec| spec.weighted_capacity)
            .unwrap_or(0.0)
    }

    async fn modify_target_capacity(
        &mut self,
        target_capacity: f64,
        _terminate_excess_capacity: bool,
        dry_run: bool,
    ) -> Result<(), ResourceGroupError> {
        if self.is_stale() {
            tracing::info!(group_id = %self.group_id, status = %self.status, "not modifying spot fleet request in cancelled state");
            return Ok(());
        }
        tracing::info!(group_id = %self.group_id, target_capacity, dry_run, "modifying spot fleet request target capacity");
        if !dry_run {
            self.target_capacity_weight = target_capacity;
        }
        Ok(())
    }

    async fn terminate_instances_by_id(&mut self, instance_ids: Vec<String>) -> Result<Vec<String>, ResourceGroupError> {
        let kept = protect_unowned_instances(&self.group_id, &self.instance_ids, instance_ids);
        self.instance_ids.retain(|id| !kept.contains(id));
        Ok(kept)
    }

    async fn mark_stale(&mut self, dry_run: bool) -> Result<(), ResourceGroupError> {
        // SFR staleness is expressed through the request's cancelled state,
        // not a per-instance tag.
        if !dry_run {
            self.status = "cancelled".to_string();
        }
        Ok(())
    }

    fn scale_up_options(&self) -> Vec<ClustermanResources> {
        self.launch_specs.iter().map(|s| s.resources).collect()
    }

    fn scale_down_options(&self) -> Vec<ClustermanResources> {
        self.scale_up_options()
    }
}

pub fn is_cancelled_state(status: &str) -> bool {
    CANCELLED_STATES.contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(weight: f64, cpus: f64) -> LaunchSpec {
        LaunchSpec {
            market: InstanceMarket::new("m5.large", "us-west-2a"),
            weighted_capacity: weight,
            resources: ClustermanResources::new(cpus, 0.0, 0.0, 0.0),
        }
    }

    #[test]
    fn estimate_capacity_per_weight_averages_across_specs() {
        let group = SpotFleetRequestGroup::new("sfr-1", vec![spec(1.0, 2.0), spec(1.0, 4.0)]);
        let estimate = group.estimate_capacity_per_weight();
        assert_eq!(estimate.cpus, 3.0);
    }

    #[test]
    fn is_stale_matches_cancelled_prefix() {
        let mut group = SpotFleetRequestGroup::new("sfr-1", vec![]);
        group.status = "cancelled_running".to_string();
        assert!(group.is_stale());
    }
}
