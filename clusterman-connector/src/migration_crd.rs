//! `NodeMigration` custom resource support: group `clusterman.yelp.com/v1`,
//! kind `NodeMigration`, plural `nodemigrations`. Modeled as a plain
//! serde-serializable type rather than a real `kube`-rs resource, since a
//! full CRD client pulls in a dependency graph (openapi schema generation,
//! a Kubernetes client) far beyond what this connector's CRD operations need.

use std::collections::BTreeMap;

use async_trait::async_trait;
use clusterman_core::migration::{MigrationCondition, MigrationStatus};
use serde::{Deserialize, Serialize};

use crate::error::ConnectorError;

pub const CRD_GROUP: &str = "clusterman.yelp.com/v1";
pub const CRD_KIND: &str = "NodeMigration";
pub const CRD_PLURAL: &str = "nodemigrations";

pub const LABEL_MIGRATION_STATUS: &str = "clusterman.yelp.com/migration_status";
pub const LABEL_ATTEMPTS: &str = "clusterman.yelp.com/attempts";
pub const LABEL_POOL: &str = "clusterman.com/pool";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMigrationSpec {
    pub cluster: String,
    pub pool: String,
    pub label_selectors: Vec<String>,
    pub condition: MigrationCondition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationCrd {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub spec: NodeMigrationSpec,
}

impl MigrationCrd {
    pub fn new(name: impl Into<String>, spec: NodeMigrationSpec, status: MigrationStatus, attempts: u32) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_MIGRATION_STATUS.to_string(), status_label(status).to_string());
        labels.insert(LABEL_ATTEMPTS.to_string(), attempts.to_string());
        labels.insert(LABEL_POOL.to_string(), spec.pool.clone());
        Self { name: name.into(), labels, spec }
    }

    pub fn status(&self) -> Option<MigrationStatus> {
        self.labels.get(LABEL_MIGRATION_STATUS).and_then(|v| parse_status_label(v))
    }

    pub fn attempts(&self) -> u32 {
        self.labels.get(LABEL_ATTEMPTS).and_then(|v| v.parse().ok()).unwrap_or(0)
    }
}

fn status_label(status: MigrationStatus) -> &'static str {
    match status {
        MigrationStatus::Pending => "pending",
        MigrationStatus::Inprogress => "inprogress",
        MigrationStatus::Completed => "completed",
        MigrationStatus::Skipped => "skipped",
        MigrationStatus::Stop => "stop",
        MigrationStatus::Failed => "failed",
    }
}

fn parse_status_label(raw: &str) -> Option<MigrationStatus> {
    Some(match raw {
        "pending" => MigrationStatus::Pending,
        "inprogress" => MigrationStatus::Inprogress,
        "completed" => MigrationStatus::Completed,
        "skipped" => MigrationStatus::Skipped,
        "stop" => MigrationStatus::Stop,
        "failed" => MigrationStatus::Failed,
        _ => return None,
    })
}

/// The subset of the Kubernetes CRD API the migration worker needs. Only
/// `KubernetesClusterConnector` implements this; Mesos clusters have no CRD
/// store and migration there is driven purely by the uptime worker.
#[async_trait]
pub trait MigrationCrdStore: Send + Sync {
    async fn list_node_migration_resources(
        &self,
        statuses: &[MigrationStatus],
        max_attempts: u32,
    ) -> Result<Vec<MigrationCrd>, ConnectorError>;

    async fn mark_node_migration_resource(&self, name: &str, status: MigrationStatus) -> Result<(), ConnectorError>;

    async fn create_node_migration_resource(
        &self,
        spec: NodeMigrationSpec,
        status: MigrationStatus,
    ) -> Result<MigrationCrd, ConnectorError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterman_core::migration::{ConditionOperator, ConditionTrait};

    fn sample_spec() -> NodeMigrationSpec {
        NodeMigrationSpec {
            cluster: "mesos-prod".into(),
            pool: "default".into(),
            label_selectors: vec!["pool=default".into()],
            condition: MigrationCondition { trait_: ConditionTrait::Kernel, operator: ConditionOperator::Lt, target: "5.10.0".into() },
        }
    }

    #[test]
    fn new_crd_carries_status_and_attempts_labels() {
        let crd = MigrationCrd::new("mig-1", sample_spec(), MigrationStatus::Pending, 0);
        assert_eq!(crd.status(), Some(MigrationStatus::Pending));
        assert_eq!(crd.attempts(), 0);
        assert_eq!(crd.labels.get(LABEL_POOL).unwrap(), "default");
    }

    #[test]
    fn attempts_label_round_trips_through_reparse() {
        let crd = MigrationCrd::new("mig-2", sample_spec(), MigrationStatus::Inprogress, 3);
        assert_eq!(crd.attempts(), 3);
        assert_eq!(crd.status(), Some(MigrationStatus::Inprogress));
    }
}
