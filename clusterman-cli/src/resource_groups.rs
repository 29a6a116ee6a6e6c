//! Builds the `Box<dyn ResourceGroup>` set a pool manager owns from its
//! YAML config. Real tag-based cloud discovery (enumerating the fleets
//! whose tags match `resource_groups[].tag`) is an external API call this
//! crate has no cloud client to make; each config entry instead seeds
//! exactly one resource group named after its discovery tag, which is
//! enough to drive the rest of the control loop against a real or
//! simulated backend alike.

use std::collections::BTreeMap;

use clusterman_resourcegroup::{AutoScalingGroup, Ec2FleetGroup, ElastigroupGroup, ResourceGroup, SpotFleetRequestGroup};

use crate::config::{PoolConfig, ResourceGroupConfig, ScalingLimitsConfig};

const DEFAULT_INSTANCE_TYPE: &str = "m5.large";

pub fn build_resource_groups(config: &PoolConfig) -> BTreeMap<String, Box<dyn ResourceGroup>> {
    let limits = &config.scaling_limits;
    config
        .resource_groups
        .iter()
        .map(|entry| (entry.entry().tag.clone(), build_one(entry, limits, Vec::new())))
        .collect()
}

/// Like [`build_resource_groups`], but seeds each group's `instance_ids`
/// from `seed_ids_by_tag` before boxing it. Used by the `simulate` and
/// `run-*` daemon entrypoints, which have no cloud launcher to populate a
/// fresh group's fleet over time, so the synthetic fleet is seeded upfront
/// instead.
pub fn build_resource_groups_seeded(
    config: &PoolConfig,
    mut seed_ids_by_tag: BTreeMap<String, Vec<String>>,
) -> BTreeMap<String, Box<dyn ResourceGroup>> {
    let limits = &config.scaling_limits;
    config
        .resource_groups
        .iter()
        .map(|entry| {
            let tag = entry.entry().tag.clone();
            let seed = seed_ids_by_tag.remove(&tag).unwrap_or_default();
            (tag, build_one(entry, limits, seed))
        })
        .collect()
}

fn build_one(entry: &ResourceGroupConfig, limits: &ScalingLimitsConfig, seed_ids: Vec<String>) -> Box<dyn ResourceGroup> {
    let tag = entry.entry().tag.clone();
    match entry {
        ResourceGroupConfig::Sfr(_) => {
            let mut group = SpotFleetRequestGroup::new(tag, Vec::new());
            group.instance_ids = seed_ids;
            Box::new(group)
        }
        ResourceGroupConfig::Asg(_) => {
            let mut group = AutoScalingGroup::new(tag, DEFAULT_INSTANCE_TYPE, limits.min_capacity, limits.max_capacity);
            group.desired_capacity = seed_ids.len() as f64;
            group.instance_ids = seed_ids;
            Box::new(group)
        }
        ResourceGroupConfig::Ec2fleet(_) => {
            let mut group = Ec2FleetGroup::new(tag, DEFAULT_INSTANCE_TYPE);
            group.instance_ids = seed_ids;
            Box::new(group)
        }
        ResourceGroupConfig::Spotinst(_) => {
            let mut group = ElastigroupGroup::new(tag, std::collections::HashMap::new());
            group.instance_ids = seed_ids;
            Box::new(group)
        }
    }
}
