//! Resource naming conventions
//!
//! Every name and ARN the pipeline emits is built here so that the boundary
//! policy, the rewritten bootstrap template and the application stack all
//! agree on them.

use crate::{AccountEnv, Identity, Qualifier, AWS_PARTITION};

/// Uppercase the first letter of every word.
///
/// A word starts after any character that is not alphanumeric or `_`, so
/// `"open-enterprise"` becomes `"Open-Enterprise"` and `"superapp4000"`
/// becomes `"Superapp4000"`.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut at_word_start = true;
    for c in input.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}

/// Name of the boundary managed policy: `<Q>-permissions-boundary-<account>`
pub fn boundary_policy_name(qualifier: &Qualifier, account: &str) -> String {
    format!("{}-permissions-boundary-{}", qualifier, account)
}

/// ARN of the boundary managed policy
pub fn boundary_policy_arn(qualifier: &Qualifier, account: &str) -> String {
    format!(
        "arn:{}:iam::{}:policy/{}",
        AWS_PARTITION,
        account,
        boundary_policy_name(qualifier, account)
    )
}

/// Wildcard matching every application role: `.../role/<Tenant><Environment>*`
pub fn application_role_pattern(identity: &Identity, account: &str) -> String {
    format!(
        "arn:{}:iam::{}:role/{}*",
        AWS_PARTITION,
        account,
        identity.title_prefix()
    )
}

/// Name of the toolkit stack the bootstrap template is generated for
pub fn toolkit_stack_name(qualifier: &Qualifier) -> String {
    format!("{}-CDKToolkit", qualifier)
}

/// Stack id of the pipeline stack: `<Tenant><Environment>PipelineStack`
pub fn pipeline_stack_id(identity: &Identity) -> String {
    format!("{}PipelineStack", identity.title_prefix())
}

/// Stack id of the application stack: `<Tenant><Environment>ApplicationStack`
pub fn application_stack_id(identity: &Identity) -> String {
    format!("{}ApplicationStack", identity.title_prefix())
}

/// ARN prefix of the application's SSM parameters
pub fn application_parameters_arn(identity: &Identity, env: &AccountEnv) -> String {
    format!(
        "arn:{}:ssm:{}:{}:parameter/{}/{}/{}/*",
        AWS_PARTITION,
        env.region,
        env.account,
        identity.tenant,
        identity.environment,
        identity.application
    )
}

/// Roles created by the bootstrap template
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BootstrapRole {
    /// Role CloudFormation runs deployments as
    CfnExec,
    /// Role the pipeline assumes to start deployments
    Deploy,
    /// Role used to publish file assets
    FilePublishing,
    /// Role used to publish container image assets
    ImagePublishing,
    /// Role used for context lookups
    Lookup,
}

impl BootstrapRole {
    /// Every role the pipeline assumes directly (all but the execution role)
    pub const ASSUMABLE: [BootstrapRole; 4] = [
        BootstrapRole::Deploy,
        BootstrapRole::FilePublishing,
        BootstrapRole::ImagePublishing,
        BootstrapRole::Lookup,
    ];

    fn slug(self) -> &'static str {
        match self {
            BootstrapRole::CfnExec => "cfn-exec",
            BootstrapRole::Deploy => "deploy",
            BootstrapRole::FilePublishing => "file-publishing",
            BootstrapRole::ImagePublishing => "image-publishing",
            BootstrapRole::Lookup => "lookup",
        }
    }

    /// Physical role ARN: `.../role/cdk-<Q>-<kind>-role-<account>-<region>`
    pub fn arn(self, qualifier: &Qualifier, env: &AccountEnv) -> String {
        format!(
            "arn:{}:iam::{}:role/cdk-{}-{}-role-{}-{}",
            AWS_PARTITION,
            env.account,
            qualifier,
            self.slug(),
            env.account,
            env.region
        )
    }
}

/// Extract the role name (last path segment) from a role ARN.
///
/// Returns `None` if the ARN is not an IAM role ARN.
pub fn role_name_from_arn(arn: &str) -> Option<&str> {
    let (_, path) = arn.split_once(":role/")?;
    let name = path.rsplit('/').next()?;
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
