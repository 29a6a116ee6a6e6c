use thiserror::Error;

/// Top-level CLI error. Every subcommand maps one of these down to an exit
/// code: 0 on success, 1 when no subcommand was given, 2 for everything
/// else a human needs to go fix before retrying.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("the caller's cloud account does not match the target cluster's account")]
    AccountNumberMismatch,

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Connector(#[from] clusterman_connector::ConnectorError),

    #[error(transparent)]
    Kv(#[from] clusterman_kv::KvError),

    #[error(transparent)]
    Pool(#[from] clusterman_pool::PoolError),

    #[error(transparent)]
    Autoscaler(#[from] clusterman_autoscaler::AutoscalerError),

    #[error(transparent)]
    Migration(#[from] clusterman_migration::MigrationError),
}

impl CliError {
    /// Exit code per the CLI's contract: 2 for anything the operator needs
    /// to fix (bad config, validation failures, an account mismatch); 1 is
    /// reserved for "no subcommand given", decided in `main` before a
    /// `CliError` even exists.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Validation(_) | CliError::AccountNumberMismatch => 2,
            _ => 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("unknown resource group type: {0}")]
    UnknownResourceGroupType(String),

    #[error("invalid duration {raw:?} for {field}: {source}")]
    Duration { field: String, raw: String, source: humantime::DurationError },

    #[error("missing required key: {0}")]
    MissingKey(String),

    #[error("operator {operator:?} is not valid for condition trait {trait_:?}")]
    InvalidConditionOperator { trait_: clusterman_core::migration::ConditionTrait, operator: clusterman_core::migration::ConditionOperator },
}
