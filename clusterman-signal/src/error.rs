use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("signal connection failed: {0}")]
    Connection(String),

    #[error("signal evaluation failed: {0}")]
    Evaluation(String),

    #[error("no signal configured for pool {pool}")]
    NotConfigured { pool: String },
}
