//! Command-line and environment configuration.
//!
//! Every setting can come from a flag or its environment variable; flags win.
//! Identity falls back to the defaults the pipeline has always used. Account,
//! region and the pipeline role have no defaults: a missing value is reported
//! as a configuration error naming the variable.

use std::path::PathBuf;

use clap::Args;

use boundary_common::identity::validate_account;

use crate::pipeline::SourceRepository;
use boundary_common::{
    AccountEnv, Error, Identity, Qualifier, Result, DEFAULT_APPLICATION, DEFAULT_ENVIRONMENT,
    DEFAULT_TENANT,
};

const ACCOUNT_ENV: &str = "CDK_DEFAULT_ACCOUNT";
const REGION_ENV: &str = "CDK_DEFAULT_REGION";
const PIPELINE_ROLE_ENV: &str = "PIPELINE_ROLE_ARN";

/// Repository the pipeline has always been built from
pub const DEFAULT_GITHUB_ORG: &str = "NixM0nk3y";
/// Default source repository name
pub const DEFAULT_GITHUB_REPO: &str = "permission-boundary-pipeline-cdk";
/// Default tracked branch
pub const DEFAULT_GITHUB_BRANCH: &str = "main";

/// Who the pipeline belongs to
#[derive(Args, Debug, Clone)]
pub struct IdentityArgs {
    /// Owning tenant
    #[arg(long, env = "TENANT", default_value = DEFAULT_TENANT)]
    pub tenant: String,

    /// Deployment environment
    #[arg(long, env = "ENVIRONMENT", default_value = DEFAULT_ENVIRONMENT)]
    pub environment: String,

    /// Application name
    #[arg(long, env = "APPLICATION", default_value = DEFAULT_APPLICATION)]
    pub application: String,
}

impl IdentityArgs {
    pub fn identity(&self) -> Identity {
        Identity::new(&self.tenant, &self.environment, &self.application)
    }
}

/// Target account and region
#[derive(Args, Debug, Clone)]
pub struct AccountArgs {
    /// 12-digit AWS account id
    #[arg(long, env = ACCOUNT_ENV)]
    pub account: Option<String>,

    /// AWS region
    #[arg(long, env = REGION_ENV)]
    pub region: Option<String>,
}

impl AccountArgs {
    /// Validated account/region pair
    pub fn account_env(&self) -> Result<AccountEnv> {
        let account = self
            .account
            .as_deref()
            .ok_or_else(|| Error::configuration_for_field(ACCOUNT_ENV, "account is not set"))?;
        let region = self
            .region
            .as_deref()
            .ok_or_else(|| Error::configuration_for_field(REGION_ENV, "region is not set"))?;
        AccountEnv::new(account, region)
    }

    /// Validated account id, for commands that do not need a region
    pub fn account_id(&self) -> Result<&str> {
        let account = self
            .account
            .as_deref()
            .ok_or_else(|| Error::configuration_for_field(ACCOUNT_ENV, "account is not set"))?;
        validate_account(account)?;
        Ok(account)
    }
}

/// Where the bootstrap template comes from
#[derive(Args, Debug, Clone)]
pub struct GeneratorArgs {
    /// Toolkit command, optionally with leading arguments (e.g. "npx cdk")
    #[arg(long, env = "CDK_BIN", default_value = "cdk")]
    pub cdk_bin: String,

    /// Read the bootstrap template from a file instead of running the toolkit
    #[arg(long, conflicts_with = "offline")]
    pub bootstrap_template: Option<PathBuf>,

    /// Use the bundled bootstrap template instead of running the toolkit
    #[arg(long)]
    pub offline: bool,
}

/// Pipeline principal settings
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// ARN of the role the pipeline runs as
    #[arg(long, env = PIPELINE_ROLE_ENV)]
    pub pipeline_role_arn: Option<String>,
}

impl PipelineArgs {
    /// The pipeline role ARN; its shape is checked when the stack is built
    pub fn pipeline_role_arn(&self) -> Result<&str> {
        self.pipeline_role_arn.as_deref().ok_or_else(|| {
            Error::configuration_for_field(PIPELINE_ROLE_ENV, "pipeline role ARN is not set")
        })
    }
}

/// Source repository the pipeline builds from
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// GitHub organization or user owning the repository
    #[arg(long, env = "GITHUB_ORG", default_value = DEFAULT_GITHUB_ORG)]
    pub github_org: String,

    /// GitHub repository name
    #[arg(long, env = "GITHUB_REPO", default_value = DEFAULT_GITHUB_REPO)]
    pub github_repo: String,

    /// Branch the pipeline tracks
    #[arg(long, env = "GITHUB_BRANCH", default_value = DEFAULT_GITHUB_BRANCH)]
    pub github_branch: String,
}

impl SourceArgs {
    pub fn source(&self) -> SourceRepository {
        SourceRepository {
            org: self.github_org.clone(),
            repo: self.github_repo.clone(),
            branch: self.github_branch.clone(),
        }
    }
}

/// Qualifier to use, or derive from the identity when unset
pub fn resolve_qualifier(explicit: Option<&str>, identity: &Identity) -> Qualifier {
    match explicit {
        Some(raw) if !raw.trim().is_empty() => Qualifier::from_raw(raw.trim()),
        _ => identity.qualifier(),
    }
}
