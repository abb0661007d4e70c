//! Policy command: print the permission boundary

use std::path::PathBuf;

use clap::Args;

use boundary_policy::BoundaryPolicy;

use super::write_output;
use crate::config::{AccountArgs, IdentityArgs};
use crate::Result;

#[derive(Args, Debug)]
pub struct PolicyArgs {
    #[command(flatten)]
    pub identity: IdentityArgs,

    #[command(flatten)]
    pub account: AccountArgs,

    /// Print the CloudFormation resource instead of the bare policy document
    #[arg(long)]
    pub resource: bool,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: PolicyArgs) -> Result<()> {
    let identity = args.identity.identity();
    let account = args.account.account_id()?;
    let boundary = BoundaryPolicy::build(&identity.qualifier(), &identity, account);

    let value = if args.resource {
        boundary.to_resource()
    } else {
        boundary.document.to_value()
    };
    eprintln!("{}", boundary.arn);
    write_output(args.output.as_deref(), &serde_json::to_string_pretty(&value)?)
}
