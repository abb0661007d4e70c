//! Qualifier command

use clap::Args;
use tracing::debug;

use crate::config::IdentityArgs;
use crate::Result;

#[derive(Args, Debug)]
pub struct QualifierArgs {
    #[command(flatten)]
    pub identity: IdentityArgs,
}

pub async fn run(args: QualifierArgs) -> Result<()> {
    let identity = args.identity.identity();
    let qualifier = identity.qualifier();
    debug!(
        tenant = %identity.tenant,
        application = %identity.application,
        qualifier = %qualifier,
        "qualifier derived"
    );
    println!("{}", qualifier);
    Ok(())
}
