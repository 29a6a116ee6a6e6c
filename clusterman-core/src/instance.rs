use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::market::InstanceMarket;

/// A single cloud VM, owned by exactly one resource group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub instance_id: String,
    pub market: InstanceMarket,
    pub ip_address: Option<String>,
    pub launch_time: DateTime<Utc>,
    pub weight: f64,
    pub is_stale: bool,
}

impl Instance {
    pub fn uptime(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.launch_time
    }
}
