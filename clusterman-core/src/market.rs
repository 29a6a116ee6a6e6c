use serde::{Deserialize, Serialize};

use crate::resources::ClustermanResources;

/// `(instance_type, availability_zone)`. Markets are values, not entities —
/// two instances in the same type and AZ share a market.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceMarket {
    pub instance_type: String,
    pub availability_zone: String,
}

impl InstanceMarket {
    pub fn new(instance_type: impl Into<String>, availability_zone: impl Into<String>) -> Self {
        Self {
            instance_type: instance_type.into(),
            availability_zone: availability_zone.into(),
        }
    }
}

/// Per-instance-type resource shape, CPU/memory/disk/GPU count of a single
/// instance of that type. Resolved from the static catalogue in
/// [`InstanceResources::catalogue_lookup`]; unknown types resolve to a
/// zeroed entry with a logged warning rather than a panic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstanceResources {
    pub cpus: f64,
    pub mem: f64,
    pub disk: f64,
    pub gpus: f64,
}

impl InstanceResources {
    pub fn as_clusterman_resources(&self) -> ClustermanResources {
        ClustermanResources::new(self.cpus, self.mem, self.disk, self.gpus)
    }

    /// A small built-in catalogue covering common EC2 families, used when
    /// no launch-spec metadata is available to derive per-type resources
    /// directly (e.g. ASG groups backed by a launch template rather than a
    /// spot fleet's weighted launch specs).
    pub fn catalogue_lookup(instance_type: &str) -> Self {
        match instance_type {
            "m5.large" => Self { cpus: 2.0, mem: 8192.0, disk: 0.0, gpus: 0.0 },
            "m5.xlarge" => Self { cpus: 4.0, mem: 16384.0, disk: 0.0, gpus: 0.0 },
            "m5.2xlarge" => Self { cpus: 8.0, mem: 32768.0, disk: 0.0, gpus: 0.0 },
            "c5.large" => Self { cpus: 2.0, mem: 4096.0, disk: 0.0, gpus: 0.0 },
            "c5.xlarge" => Self { cpus: 4.0, mem: 8192.0, disk: 0.0, gpus: 0.0 },
            "r5.large" => Self { cpus: 2.0, mem: 16384.0, disk: 0.0, gpus: 0.0 },
            "p3.2xlarge" => Self { cpus: 8.0, mem: 61440.0, disk: 0.0, gpus: 1.0 },
            unknown => {
                tracing::warn!(instance_type = unknown, "unrecognized instance type, defaulting resources to zero");
                Self { cpus: 0.0, mem: 0.0, disk: 0.0, gpus: 0.0 }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_type_resolves_nonzero() {
        let r = InstanceResources::catalogue_lookup("m5.xlarge");
        assert_eq!(r.cpus, 4.0);
        assert_eq!(r.mem, 16384.0);
    }

    #[test]
    fn unknown_type_resolves_zero_not_panic() {
        let r = InstanceResources::catalogue_lookup("made.up.type");
        assert_eq!(r.as_clusterman_resources(), ClustermanResources::default());
    }
}
