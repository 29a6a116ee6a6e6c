use thiserror::Error;

#[derive(Debug, Error)]
pub enum DrainError {
    #[error("drain action failed for {hostname}: {reason}")]
    ActionFailed { hostname: String, reason: String },

    #[error("queue store unavailable: {0}")]
    StoreUnavailable(String),
}
