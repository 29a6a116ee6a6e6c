//! Typed pool configuration, loaded from YAML the way `aerolithdb-core`
//! composes `AerolithsConfig` out of per-subsystem sub-configs: each section
//! below is its own struct, deserialized independently and assembled under
//! [`PoolConfig`].

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use clusterman_migration::{WorkerSetup, WorkerSetupOverrides};

use crate::error::ConfigError;

/// `rate`/`prescaling` accept either a bare integer or a `"NN%"` string in
/// YAML; normalize both to the string form `PoolPortion::parse` expects.
fn de_opt_portion<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }
    let opt = Option::<IntOrString>::deserialize(deserializer)?;
    Ok(opt.map(|v| match v {
        IntOrString::Int(n) => n.to_string(),
        IntOrString::Str(s) => s,
    }))
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3SeedConfig {
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourceGroupEntry {
    pub tag: String,
    #[serde(default)]
    pub s3: Option<S3SeedConfig>,
    #[serde(default)]
    pub aws_api_cache_bucket: Option<String>,
}

/// One `<type>:` entry under `resource_groups`. Serde's default external
/// tagging maps the YAML shape (a single-key mapping keyed by backend
/// name) directly onto this enum with no custom visitor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceGroupConfig {
    Sfr(ResourceGroupEntry),
    Asg(ResourceGroupEntry),
    Ec2fleet(ResourceGroupEntry),
    Spotinst(ResourceGroupEntry),
}

impl ResourceGroupConfig {
    pub fn entry(&self) -> &ResourceGroupEntry {
        match self {
            ResourceGroupConfig::Sfr(e)
            | ResourceGroupConfig::Asg(e)
            | ResourceGroupConfig::Ec2fleet(e)
            | ResourceGroupConfig::Spotinst(e) => e,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScalingLimitsConfig {
    pub min_capacity: f64,
    pub max_capacity: f64,
    pub max_weight_to_add: f64,
    pub max_weight_to_remove: f64,
    pub max_tasks_to_kill: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequiredMetricConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub minute_range: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AutoscaleSignalConfig {
    pub name: String,
    #[serde(default)]
    pub branch_or_tag: Option<String>,
    #[serde(default = "default_period_minutes")]
    pub period_minutes: u32,
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub required_metrics: Vec<RequiredMetricConfig>,
}

fn default_period_minutes() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AutoscalingConfig {
    pub setpoint: f64,
    pub setpoint_margin: f64,
    pub target_capacity_margin: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MigrationTriggerConfig {
    #[serde(default)]
    pub event: Option<bool>,
    #[serde(default)]
    pub max_uptime: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MigrationStrategyConfig {
    #[serde(default, deserialize_with = "de_opt_portion")]
    pub rate: Option<String>,
    #[serde(default, deserialize_with = "de_opt_portion")]
    pub prescaling: Option<String>,
    #[serde(default)]
    pub precedence: Vec<String>,
    #[serde(default)]
    pub bootstrap_wait: Option<String>,
    #[serde(default)]
    pub bootstrap_timeout: Option<String>,
    #[serde(default)]
    pub allowed_failed_drains: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeMigrationConfig {
    #[serde(default)]
    pub trigger: MigrationTriggerConfig,
    #[serde(default)]
    pub strategy: MigrationStrategyConfig,
    #[serde(default)]
    pub expected_duration: Option<String>,
    #[serde(default)]
    pub health_check_interval: Option<String>,
    #[serde(default)]
    pub ignore_pod_health: bool,
    #[serde(default = "default_orphan_tolerance")]
    pub orphan_capacity_tollerance: f64,
}

fn default_orphan_tolerance() -> f64 {
    0.2
}

impl NodeMigrationConfig {
    /// Precedence rule names, parsed and filtered to the ones this build
    /// recognizes; an unrecognized name is dropped rather than failing
    /// config load, matching the tolerant posture the rest of this loader
    /// takes toward optional fields.
    pub fn precedence_rules(&self) -> Vec<clusterman_migration::PrecedenceRule> {
        self.strategy.precedence.iter().filter_map(|name| clusterman_migration::PrecedenceRule::parse(name)).collect()
    }

    pub fn worker_setup(&self) -> Result<WorkerSetup, ConfigError> {
        let overrides = WorkerSetupOverrides {
            rate: self.strategy.rate.clone(),
            prescaling: self.strategy.prescaling.clone(),
            node_boot_wait: self.strategy.bootstrap_wait.clone(),
            node_boot_timeout: self.strategy.bootstrap_timeout.clone(),
            worker_timeout: self.expected_duration.clone(),
            health_check_interval: self.health_check_interval.clone(),
            allowed_failed_drains: self.strategy.allowed_failed_drains,
            max_orphan_capacity_tolerance: Some(self.orphan_capacity_tollerance),
        };
        WorkerSetup::from_config(&overrides).map_err(|e| ConfigError::MissingKey(e.to_string()))
    }

    pub fn max_uptime(&self) -> Result<Option<std::time::Duration>, ConfigError> {
        match &self.trigger.max_uptime {
            None => Ok(None),
            Some(raw) => humantime::parse_duration(raw)
                .map(Some)
                .map_err(|source| ConfigError::Duration { field: "node_migration.trigger.max_uptime".to_string(), raw: raw.clone(), source }),
        }
    }
}

/// Root of one pool's YAML configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    pub resource_groups: Vec<ResourceGroupConfig>,
    pub scaling_limits: ScalingLimitsConfig,
    pub autoscale_signal: AutoscaleSignalConfig,
    pub autoscaling: AutoscalingConfig,
    #[serde(default)]
    pub node_migration: Option<NodeMigrationConfig>,
}

impl PoolConfig {
    /// Load and validate a pool config file. Environment variables
    /// prefixed `CLUSTERMAN_<POOL>_` override individual keys, composed
    /// the same way `aerolithdb-core::config` layers file + environment
    /// sources before a final `try_deserialize`.
    pub fn load(path: &Path, pool: &str) -> Result<Self, ConfigError> {
        let env_prefix = format!("CLUSTERMAN_{}", pool.to_uppercase());
        let raw = config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()))
            .add_source(config::Environment::with_prefix(&env_prefix).separator("__"))
            .build()?;
        let parsed: PoolConfig = raw.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.resource_groups.is_empty() {
            return Err(ConfigError::MissingKey("resource_groups".to_string()));
        }
        if let Some(migration) = &self.node_migration {
            migration.worker_setup()?;
            migration.max_uptime()?;
        }
        Ok(())
    }
}
