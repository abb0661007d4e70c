//! Application command: bound every role in an application template

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use boundary_bootstrap::{attach_boundary, grant_parameter_access, TemplateDocument};
use boundary_common::naming::{application_stack_id, boundary_policy_arn};
use boundary_common::Error as PipelineError;

use super::write_output;
use crate::config::{resolve_qualifier, AccountArgs, IdentityArgs};
use crate::Result;

#[derive(Args, Debug)]
pub struct ApplicationArgs {
    #[command(flatten)]
    pub identity: IdentityArgs,

    #[command(flatten)]
    pub account: AccountArgs,

    /// Qualifier of the pipeline stack (derived from the identity if unset)
    #[arg(long, env = "QUALIFIER")]
    pub qualifier: Option<String>,

    /// Application template to rewrite (JSON or YAML)
    #[arg(short = 'f', long = "template")]
    pub template: PathBuf,

    /// Skip the SSM parameter read grant
    #[arg(long)]
    pub no_parameter_grant: bool,

    /// Write the template to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: ApplicationArgs) -> Result<()> {
    let identity = args.identity.identity();
    let env = args.account.account_env()?;
    let qualifier = resolve_qualifier(args.qualifier.as_deref(), &identity);
    let boundary_arn = boundary_policy_arn(&qualifier, &env.account);

    let text = tokio::fs::read_to_string(&args.template)
        .await
        .map_err(|e| PipelineError::io(format!("read {}", args.template.display()), e))?;
    let mut template = TemplateDocument::parse(&text)?;

    let roles = attach_boundary(&mut template, &boundary_arn)?;
    if !args.no_parameter_grant {
        grant_parameter_access(&mut template, &identity, &env, &roles);
    }

    write_output(args.output.as_deref(), &template.to_json_pretty()?)?;
    info!(
        stack = %application_stack_id(&identity),
        qualifier = %qualifier,
        roles = roles.len(),
        "application template bounded"
    );
    Ok(())
}
