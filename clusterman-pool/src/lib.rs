//! Distributes one pool's desired capacity across its resource groups and
//! prunes the excess when it shrinks, ported from `MesosPoolManager`.

pub mod constrain;
pub mod error;
pub mod instance_catalog;
pub mod manager;
pub mod metadata;
pub mod prune;
pub mod targets;

pub use constrain::constrain_target_capacity;
pub use error::PoolError;
pub use instance_catalog::InstanceCatalog;
pub use manager::{PoolManager, PruneDecision, ScalingLimits};
pub use metadata::InstanceMetadata;
pub use prune::{choose_instances_to_prune, is_instance_killable, prioritized_killable_instances};
pub use targets::{compute_new_resource_group_targets, GroupTarget};
