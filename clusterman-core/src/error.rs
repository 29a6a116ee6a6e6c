use thiserror::Error;

/// Error kinds shared across the control plane, each distinguishable at the
/// API boundary per the component design's error-handling section.
#[derive(Debug, Error)]
pub enum ClustermanError {
    #[error("config error: {0}")]
    Config(String),

    #[error("no signal configured for pool {pool}")]
    NoSignalConfigured { pool: String },

    #[error("signal connection failed: {0}")]
    SignalConnection(String),

    #[error("signal evaluation failed: {0}")]
    SignalEvaluation(String),

    #[error("pool manager error: {0}")]
    PoolManager(String),

    #[error("all resource groups for pool {pool} are stale")]
    AllResourceGroupsAreStale { pool: String },

    #[error("resource group {group_id} error: {source}")]
    ResourceGroup { group_id: String, source: String },

    #[error("account number mismatch: expected {expected}, got {actual}")]
    AccountNumberMismatch { expected: String, actual: String },
}
