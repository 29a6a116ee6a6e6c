use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("no resource groups available for this pool")]
    NoResourceGroups,

    #[error("all resource groups for this pool are stale")]
    AllResourceGroupsAreStale,

    #[error("resource group error: {0}")]
    ResourceGroup(#[from] clusterman_resourcegroup::error::ResourceGroupError),

    #[error("connector error: {0}")]
    Connector(#[from] clusterman_connector::error::ConnectorError),

    #[error("instance catalog unavailable: {0}")]
    CatalogUnavailable(String),
}
