use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceGroupError {
    #[error("cloud API refused modification of {group_id}: {reason}")]
    ModificationRefused { group_id: String, reason: String },

    #[error("no launch template configured for {group_id}")]
    NoLaunchTemplateConfigured { group_id: String },

    #[error("transient cloud error on {group_id}: {reason}")]
    Transient { group_id: String, reason: String },
}
