//! Node migration: draining nodes out of a pool because an external event
//! says to (new AMI, kernel CVE, decommission) or because they've simply
//! been running too long. Ported from `migration/worker.py`,
//! `migration/settings.py`, `migration/event.py`, `migration/event_enums.py`,
//! and `batch/node_migration.py`.

pub mod condition;
pub mod error;
pub mod portion;
pub mod precedence;
pub mod restart;
pub mod settings;
pub mod worker;

pub use condition::NodeTraits;
pub use error::MigrationError;
pub use portion::PoolPortion;
pub use precedence::PrecedenceRule;
pub use restart::{run_supervised, RestartPolicy};
pub use settings::{WorkerSetup, WorkerSetupOverrides, MIN_PORTION};
pub use worker::{MigrationWorker, MIN_UPTIME_CHURNING_SECONDS, UPTIME_CHECK_INTERVAL};
