//! Per-pool migration worker configuration, ported from
//! `migration/settings.py`'s `WorkerSetup`. Every field is independently
//! overridable in a pool's YAML config; fields left unset fall back to the
//! defaults below.

use std::time::Duration;

use crate::error::MigrationError;
use crate::portion::PoolPortion;

pub const MIN_PORTION: u32 = 1;

/// Raw, string-typed overrides as they arrive from YAML (durations as
/// `humantime` strings, rate/prescaling as [`PoolPortion`] source text).
#[derive(Debug, Clone, Default)]
pub struct WorkerSetupOverrides {
    pub rate: Option<String>,
    pub prescaling: Option<String>,
    pub node_boot_wait: Option<String>,
    pub node_boot_timeout: Option<String>,
    pub worker_timeout: Option<String>,
    pub health_check_interval: Option<String>,
    pub allowed_failed_drains: Option<u32>,
    pub max_orphan_capacity_tolerance: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct WorkerSetup {
    pub rate: PoolPortion,
    pub prescaling: PoolPortion,
    pub node_boot_wait: Duration,
    pub node_boot_timeout: Duration,
    pub worker_timeout: Duration,
    pub health_check_interval: Duration,
    pub allowed_failed_drains: u32,
    pub max_orphan_capacity_tolerance: f64,
}

impl WorkerSetup {
    pub fn from_config(overrides: &WorkerSetupOverrides) -> Result<Self, MigrationError> {
        let rate = match &overrides.rate {
            Some(raw) => PoolPortion::parse(raw)?,
            None => PoolPortion::Count(1),
        };
        let prescaling = match &overrides.prescaling {
            Some(raw) => PoolPortion::parse(raw)?,
            None => PoolPortion::Count(0),
        };

        Ok(Self {
            rate,
            prescaling,
            node_boot_wait: parse_duration(overrides.node_boot_wait.as_deref(), "3m")?,
            node_boot_timeout: parse_duration(overrides.node_boot_timeout.as_deref(), "10m")?,
            worker_timeout: parse_duration(overrides.worker_timeout.as_deref(), "2h")?,
            health_check_interval: parse_duration(overrides.health_check_interval.as_deref(), "2m")?,
            allowed_failed_drains: overrides.allowed_failed_drains.unwrap_or(3),
            max_orphan_capacity_tolerance: overrides.max_orphan_capacity_tolerance.unwrap_or(0.2),
        })
    }
}

fn parse_duration(raw: Option<&str>, default: &str) -> Result<Duration, MigrationError> {
    let text = raw.unwrap_or(default);
    humantime::parse_duration(text)
        .map_err(|e| MigrationError::InvalidPortion(text.to_string(), format!("not a valid duration: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_shape() {
        let setup = WorkerSetup::from_config(&WorkerSetupOverrides::default()).unwrap();
        assert_eq!(setup.prescaling, PoolPortion::Count(0));
        assert_eq!(setup.node_boot_wait, Duration::from_secs(180));
        assert_eq!(setup.node_boot_timeout, Duration::from_secs(600));
        assert_eq!(setup.worker_timeout, Duration::from_secs(2 * 3600));
        assert_eq!(setup.health_check_interval, Duration::from_secs(120));
        assert_eq!(setup.allowed_failed_drains, 3);
        assert_eq!(setup.max_orphan_capacity_tolerance, 0.2);
    }

    #[test]
    fn overrides_are_applied() {
        let overrides = WorkerSetupOverrides {
            rate: Some("10%".to_string()),
            worker_timeout: Some("30m".to_string()),
            allowed_failed_drains: Some(5),
            ..Default::default()
        };
        let setup = WorkerSetup::from_config(&overrides).unwrap();
        assert_eq!(setup.rate, PoolPortion::Percent(10.0));
        assert_eq!(setup.worker_timeout, Duration::from_secs(30 * 60));
        assert_eq!(setup.allowed_failed_drains, 5);
    }
}
