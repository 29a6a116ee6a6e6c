use std::collections::HashMap;

use async_trait::async_trait;
use clusterman_core::market::InstanceMarket;
use clusterman_core::resources::ClustermanResources;

use crate::error::ResourceGroupError;
use crate::group::{protect_unowned_instances, ResourceGroup, ResourceGroupStatus};

/// A SpotInst (now Spot by NetApp) Elastigroup: weight table per instance
/// type, never stale by contract — SpotInst handles replacement internally.
pub struct ElastigroupGroup {
    pub group_id: String,
    pub weight_table: HashMap<String, f64>,
    pub target: f64,
    pub instance_ids: Vec<String>,
}

impl ElastigroupGroup {
    pub fn new(group_id: impl Into<String>, weight_table: HashMap<String, f64>) -> Self {
        Self {
            group_id: group_id.into(),
            weight_table,
            target: 0.0,
            instance_ids: Vec::new(),
        }
    }
}

#[async_trait]
impl ResourceGroup for ElastigroupGroup {
    fn group_id(&self) -> &str {
        &self.group_id
    }

    fn target_capacity(&self) -> f64 {
        self.target
    }

    fn fulfilled_capacity(&self) -> f64 {
        self.instance_ids.len() as f64
    }

    fn instance_ids(&self) -> &[String] {
        &self.instance_ids
    }

    fn is_stale(&self) -> bool {
        false
    }

    fn status(&self) -> ResourceGroupStatus {
        ResourceGroupStatus::Active
    }

    fn market_weight(&self, market: &InstanceMarket) -> f64 {
        self.weight_table.get(&market.instance_type).copied().unwrap_or(1.0)
    }

    async fn modify_target_capacity(
        &mut self,
        target_capacity: f64,
        _terminate_excess_capacity: bool,
        dry_run: bool,
    ) -> Result<(), ResourceGroupError> {
        tracing::info!(group_id = %self.group_id, target_capacity, dry_run, "modifying elastigroup target");
        if !dry_run {
            self.target = target_capacity;
        }
        Ok(())
    }

    async fn terminate_instances_by_id(&mut self, instance_ids: Vec<String>) -> Result<Vec<String>, ResourceGroupError> {
        let kept = protect_unowned_instances(&self.group_id, &self.instance_ids, instance_ids);
        self.instance_ids.retain(|id| !kept.contains(id));
        Ok(kept)
    }

    async fn mark_stale(&mut self, _dry_run: bool) -> Result<(), ResourceGroupError> {
        // Elastigroups are never stale by contract; mark_stale is a no-op.
        Ok(())
    }

    fn scale_up_options(&self) -> Vec<ClustermanResources> {
        self.weight_table
            .keys()
            .map(|t| clusterman_core::market::InstanceResources::catalogue_lookup(t).as_clusterman_resources())
            .collect()
    }

    fn scale_down_options(&self) -> Vec<ClustermanResources> {
        self.scale_up_options()
    }
}
