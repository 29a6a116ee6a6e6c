/// Process-wide capabilities injected into the Autoscaler rather than read
/// from hidden module-level state, per the "global caches & sessions"
/// design note: one `Capabilities` value is constructed at process start
/// and threaded through every component that needs to know which account,
/// region, or run mode it's operating under.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub cluster: String,
    pub aws_region: String,
    pub aws_account_id: String,
    pub dry_run: bool,
}

impl Capabilities {
    pub fn new(cluster: impl Into<String>, aws_region: impl Into<String>, aws_account_id: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            aws_region: aws_region.into(),
            aws_account_id: aws_account_id.into(),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// CLI safety check: fatal if the caller's configured account doesn't
    /// match the account actually reachable through the cloud credentials.
    pub fn check_account(&self, observed_account_id: &str) -> Result<(), crate::error::ClustermanError> {
        if self.aws_account_id != observed_account_id {
            return Err(crate::error::ClustermanError::AccountNumberMismatch {
                expected: self.aws_account_id.clone(),
                actual: observed_account_id.to_string(),
            });
        }
        Ok(())
    }
}
