//! Narrow interface onto the cloud instance-description API, ported from
//! `aws/client.py`'s `ec2_describe_instances` — the pool manager needs
//! launch time, market and IP for each instance a resource group owns, but
//! has no business knowing how those are fetched.

use clusterman_core::instance::Instance;

use crate::error::PoolError;

pub trait InstanceCatalog: Send + Sync {
    fn describe_instances(&self, instance_ids: &[String]) -> Result<Vec<Instance>, PoolError>;
}
