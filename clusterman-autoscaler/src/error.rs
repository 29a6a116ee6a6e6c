use thiserror::Error;

use clusterman_connector::error::ConnectorError;
use clusterman_kv::error::KvError;
use clusterman_pool::error::PoolError;
use clusterman_signal::error::SignalError;

/// Errors an autoscaler tick can surface, per spec.md §7. A tick that fails
/// with [`AutoscalerError::PoolManager`] or [`AutoscalerError::Connector`]
/// aborts before any capacity change; [`AutoscalerError::SignalFallback`]
/// means the default signal already ran and capacity was already applied
/// with its result, and the wrapped error is only re-raised for visibility.
#[derive(Debug, Error)]
pub enum AutoscalerError {
    #[error("connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("pool manager error: {0}")]
    PoolManager(#[from] PoolError),

    #[error("kv store error: {0}")]
    Kv(#[from] KvError),

    #[error("signal failed for this tick, default signal applied target {applied_target}: {source}")]
    SignalFallback { applied_target: f64, source: SignalError },
}
