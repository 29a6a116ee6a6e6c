use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("scheduler unreachable: {0}")]
    Unreachable(String),

    #[error("failed to parse resource quantity {raw:?}: {reason}")]
    ResourceParse { raw: String, reason: String },
}
