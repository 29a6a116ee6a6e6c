use thiserror::Error;

use clusterman_connector::error::ConnectorError;
use clusterman_draining::DrainError;
use clusterman_kv::error::KvError;
use clusterman_pool::error::PoolError;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("pool manager error: {0}")]
    Pool(#[from] PoolError),

    #[error("drain error: {0}")]
    Drain(#[from] DrainError),

    #[error("kv store error: {0}")]
    Kv(#[from] KvError),

    #[error("malformed portion value {0:?}: {1}")]
    InvalidPortion(String, String),

    #[error("condition target {target:?} is not valid for trait {trait_:?}: {reason}")]
    InvalidCondition { trait_: clusterman_core::migration::ConditionTrait, target: String, reason: String },

    #[error("operator {operator:?} is not supported for trait {trait_:?}")]
    UnsupportedOperator { trait_: clusterman_core::migration::ConditionTrait, operator: clusterman_core::migration::ConditionOperator },

    #[error("exceeded allowed failed drains ({0}) for this migration")]
    TooManyFailedDrains(u32),
}
