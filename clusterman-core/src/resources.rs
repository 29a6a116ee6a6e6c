use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A four-tuple of non-negative resource quantities: CPUs, memory (MB),
/// disk (MB), and GPUs. Every capacity computation in the control plane
/// flows through this type; pools that lack a dimension (no GPU instances,
/// say) simply carry zero in that slot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClustermanResources {
    pub cpus: f64,
    pub mem: f64,
    pub disk: f64,
    pub gpus: f64,
}

impl ClustermanResources {
    pub fn new(cpus: f64, mem: f64, disk: f64, gpus: f64) -> Self {
        Self { cpus, mem, disk, gpus }
    }

    /// Component-wise maximum, used when enumerating scale-up options.
    pub fn component_max(self, other: Self) -> Self {
        Self {
            cpus: self.cpus.max(other.cpus),
            mem: self.mem.max(other.mem),
            disk: self.disk.max(other.disk),
            gpus: self.gpus.max(other.gpus),
        }
    }

    /// Fetch a single dimension by the name used in config and signal payloads.
    pub fn dimension(&self, name: &str) -> Option<f64> {
        match name {
            "cpus" => Some(self.cpus),
            "mem" => Some(self.mem),
            "disk" => Some(self.disk),
            "gpus" => Some(self.gpus),
            _ => None,
        }
    }
}

impl Add for ClustermanResources {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            cpus: self.cpus + rhs.cpus,
            mem: self.mem + rhs.mem,
            disk: self.disk + rhs.disk,
            gpus: self.gpus + rhs.gpus,
        }
    }
}

impl AddAssign for ClustermanResources {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for ClustermanResources {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            cpus: self.cpus - rhs.cpus,
            mem: self.mem - rhs.mem,
            disk: self.disk - rhs.disk,
            gpus: self.gpus - rhs.gpus,
        }
    }
}

impl SubAssign for ClustermanResources {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<f64> for ClustermanResources {
    type Output = Self;
    fn mul(self, scale: f64) -> Self {
        Self {
            cpus: self.cpus * scale,
            mem: self.mem * scale,
            disk: self.disk * scale,
            gpus: self.gpus * scale,
        }
    }
}

impl Div<f64> for ClustermanResources {
    type Output = Self;
    fn div(self, divisor: f64) -> Self {
        Self {
            cpus: self.cpus / divisor,
            mem: self.mem / divisor,
            disk: self.disk / divisor,
            gpus: self.gpus / divisor,
        }
    }
}

impl std::iter::Sum for ClustermanResources {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}
