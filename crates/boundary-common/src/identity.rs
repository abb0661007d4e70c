//! Tenant/environment/application identity and the target account

use serde::{Deserialize, Serialize};

use crate::{Error, Qualifier, Result};

/// Who a pipeline belongs to.
///
/// Read once at startup and never mutated. Values are accepted as-is: an
/// empty tenant produces meaningless names rather than an error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Owning tenant (e.g. "acme")
    pub tenant: String,
    /// Deployment environment (e.g. "staging")
    pub environment: String,
    /// Application name (e.g. "widgets")
    pub application: String,
}

impl Identity {
    /// Create a new identity
    pub fn new(
        tenant: impl Into<String>,
        environment: impl Into<String>,
        application: impl Into<String>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            environment: environment.into(),
            application: application.into(),
        }
    }

    /// Derive the qualifier for this identity.
    ///
    /// The environment is intentionally ignored.
    pub fn qualifier(&self) -> Qualifier {
        Qualifier::derive(&self.tenant, &self.application)
    }

    /// `<Tenant><Environment>` prefix shared by stack ids and application roles
    pub fn title_prefix(&self) -> String {
        format!(
            "{}{}",
            crate::naming::title_case(&self.tenant),
            crate::naming::title_case(&self.environment)
        )
    }
}

/// Account and region the bootstrap template targets
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEnv {
    /// 12-digit AWS account id
    pub account: String,
    /// AWS region (e.g. "eu-west-1")
    pub region: String,
}

impl AccountEnv {
    /// Create a validated account/region pair.
    ///
    /// # Errors
    /// Returns a configuration error if the account is not 12 digits or the
    /// region is empty.
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Result<Self> {
        let account = account.into();
        let region = region.into();

        validate_account(&account)?;
        if region.trim().is_empty() {
            return Err(Error::configuration_for_field(
                "CDK_DEFAULT_REGION",
                "region must not be empty",
            ));
        }

        Ok(Self { account, region })
    }
}

/// Check that `account` is a 12-digit AWS account id.
///
/// # Errors
/// Returns a configuration error naming `CDK_DEFAULT_ACCOUNT`.
pub fn validate_account(account: &str) -> Result<()> {
    if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::configuration_for_field(
            "CDK_DEFAULT_ACCOUNT",
            format!("account id must be 12 digits, got '{}'", account),
        ));
    }
    Ok(())
}
