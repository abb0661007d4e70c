//! Synth command: build the bounded pipeline stack

use std::path::PathBuf;

use clap::Args;
use tracing::{info, warn};

use boundary_bootstrap::{CdkBootstrapGenerator, FixtureGenerator, TemplateGenerator};
use boundary_common::AccountEnv;

use super::{shutdown_signal, write_output};
use crate::config::{AccountArgs, GeneratorArgs, IdentityArgs, PipelineArgs, SourceArgs};
use crate::pipeline::{run_pipeline, PipelineRequest};
use crate::{Error, Result};

#[derive(Args, Debug)]
pub struct SynthArgs {
    #[command(flatten)]
    pub identity: IdentityArgs,

    #[command(flatten)]
    pub account: AccountArgs,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub generator: GeneratorArgs,

    /// Write the template to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Pick the template source from the flags
pub fn template_generator(
    args: &GeneratorArgs,
    env: &AccountEnv,
) -> Result<Box<dyn TemplateGenerator>> {
    if let Some(path) = &args.bootstrap_template {
        info!(path = %path.display(), "using bootstrap template file");
        return Ok(Box::new(FixtureGenerator::from_file(path)?));
    }
    if args.offline {
        info!("using bundled bootstrap template");
        return Ok(Box::new(FixtureGenerator::builtin()));
    }
    Ok(Box::new(CdkBootstrapGenerator::new(&args.cdk_bin, env.clone())?))
}

pub async fn run(args: SynthArgs) -> Result<()> {
    let env = args.account.account_env()?;
    let request = PipelineRequest {
        identity: args.identity.identity(),
        env: env.clone(),
        pipeline_role_arn: args.pipeline.pipeline_role_arn()?.to_string(),
        source: args.source.source(),
    };
    let generator = template_generator(&args.generator, &env)?;

    // Dropping the pipeline future kills a running toolkit process.
    let output = tokio::select! {
        result = run_pipeline(&request, generator.as_ref()) => result?,
        () = shutdown_signal() => {
            warn!("synthesis interrupted, nothing was written");
            return Err(Error::Interrupted);
        }
    };

    let rendered = output.template.to_json_pretty()?;
    write_output(args.output.as_deref(), &rendered)?;

    info!(
        stack = %output.stack_id,
        qualifier = %output.qualifier,
        boundary = %output.boundary_arn,
        "synth complete"
    );
    eprintln!("{}", output.boundary_arn);
    Ok(())
}
