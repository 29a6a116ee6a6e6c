//! Scheduler-side reconciliation. A [`ClusterConnector`] reconciles cloud
//! instance data against live Mesos agent or Kubernetes node state, so the
//! pool manager can tell orphaned instances from idle ones from busy ones.

pub mod connector;
pub mod error;
pub mod kubernetes;
pub mod mesos;
pub mod migration_crd;
pub mod resource_parsing;

pub use connector::{ClusterConnector, ConnectorSnapshot};
pub use error::ConnectorError;
pub use kubernetes::KubernetesClusterConnector;
pub use mesos::MesosClusterConnector;
pub use migration_crd::{MigrationCrd, MigrationCrdStore};
