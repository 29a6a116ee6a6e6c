use serde::{Deserialize, Serialize};

use crate::resources::ClustermanResources;

/// What a [`Signal`](../clusterman_signal/index.html) hands back to the
/// autoscaler. Any dimension may be `None`, meaning "no information" for
/// that resource; the `PendingPods` variant lets a signal defer the
/// resource-to-group matching to the pool manager instead of pre-aggregating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceRequest {
    Aggregated {
        cpus: Option<f64>,
        mem: Option<f64>,
        disk: Option<f64>,
        gpus: Option<f64>,
    },
    PendingPods(Vec<ClustermanResources>),
}

impl ResourceRequest {
    pub fn all_none(&self) -> bool {
        match self {
            ResourceRequest::Aggregated { cpus, mem, disk, gpus } => {
                cpus.is_none() && mem.is_none() && disk.is_none() && gpus.is_none()
            }
            ResourceRequest::PendingPods(pods) => pods.is_empty(),
        }
    }

    pub fn all_zero(&self) -> bool {
        match self {
            ResourceRequest::Aggregated { cpus, mem, disk, gpus } => {
                [cpus, mem, disk, gpus].iter().all(|d| matches!(d, Some(v) if *v == 0.0))
                    && [cpus, mem, disk, gpus].iter().any(|d| d.is_some())
            }
            ResourceRequest::PendingPods(pods) => pods.is_empty(),
        }
    }

    /// Named-dimension accessor matching `clusterman-core`'s resource
    /// dimension vocabulary, used by the most-constrained-resource search.
    pub fn dimension(&self, name: &str) -> Option<f64> {
        match self {
            ResourceRequest::Aggregated { cpus, mem, disk, gpus } => match name {
                "cpus" => *cpus,
                "mem" => *mem,
                "disk" => *disk,
                "gpus" => *gpus,
                _ => None,
            },
            ResourceRequest::PendingPods(pods) => {
                let total: ClustermanResources = pods.iter().copied().sum();
                total.dimension(name)
            }
        }
    }
}
