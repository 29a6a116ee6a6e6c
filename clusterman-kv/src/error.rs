use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("kv backend unavailable: {0}")]
    Unavailable(String),
}
