//! Cloud fleet backends for Clusterman.
//!
//! A [`ResourceGroup`] abstracts one cloud fleet primitive: an AWS Auto
//! Scaling Group, a Spot Fleet Request, an EC2 Fleet, or a SpotInst
//! Elastigroup. The pool manager only ever talks to the trait; the four
//! backends in this crate handle the provider-specific quirks (clamping,
//! staleness, weighted launch specs) behind it.

pub mod asg;
pub mod ec2_fleet;
pub mod elastigroup;
pub mod error;
pub mod group;
pub mod spot_fleet;

pub use asg::AutoScalingGroup;
pub use ec2_fleet::Ec2FleetGroup;
pub use elastigroup::ElastigroupGroup;
pub use error::ResourceGroupError;
pub use group::{protect_unowned_instances, ResourceGroup, ResourceGroupKind, ResourceGroupStatus};
pub use spot_fleet::SpotFleetRequestGroup;
