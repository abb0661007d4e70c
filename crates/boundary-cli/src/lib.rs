//! Permission-boundary pipeline CLI library

pub mod commands;
pub mod config;
pub mod error;
pub mod pipeline;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

use boundary_common::telemetry::LogFormat;

/// Bound a CDK delivery pipeline and the roles it deploys
#[derive(Parser, Debug)]
#[command(name = "boundary")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log output format (text or json)
    #[arg(long, global = true, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the qualifier derived from tenant and application
    Qualifier(commands::qualifier::QualifierArgs),
    /// Print the permission boundary policy
    Policy(commands::policy::PolicyArgs),
    /// Synthesize the pipeline stack with the rewritten bootstrap template
    Synth(commands::synth::SynthArgs),
    /// Attach the permission boundary to an application template
    Application(commands::application::ApplicationArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Qualifier(args) => commands::qualifier::run(args).await,
            Commands::Policy(args) => commands::policy::run(args).await,
            Commands::Synth(args) => commands::synth::run(args).await,
            Commands::Application(args) => commands::application::run(args).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn synth_flags_parse() {
        let cli = Cli::try_parse_from([
            "boundary",
            "--log-format",
            "json",
            "synth",
            "--tenant",
            "acme",
            "--environment",
            "staging",
            "--application",
            "widgets",
            "--account",
            "123456789012",
            "--region",
            "eu-west-1",
            "--pipeline-role-arn",
            "arn:aws:iam::123456789012:role/AcmePipelineRole",
            "--offline",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        let Commands::Synth(args) = cli.command else {
            panic!("expected synth");
        };
        assert_eq!(args.identity.identity().qualifier().as_str(), "35e2023292");
        assert!(args.generator.offline);
        assert_eq!(
            args.source.source().full_name(),
            "NixM0nk3y/permission-boundary-pipeline-cdk"
        );
        assert_eq!(args.source.github_branch, "main");
    }

    #[test]
    fn synth_source_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "boundary",
            "synth",
            "--github-org",
            "acme",
            "--github-repo",
            "widgets-pipeline",
            "--github-branch",
            "release",
        ])
        .unwrap();
        let Commands::Synth(args) = cli.command else {
            panic!("expected synth");
        };
        let source = args.source.source();
        assert_eq!(source.full_name(), "acme/widgets-pipeline");
        assert_eq!(source.branch, "release");
    }

    #[test]
    fn offline_conflicts_with_template_file() {
        let result = Cli::try_parse_from([
            "boundary",
            "synth",
            "--offline",
            "--bootstrap-template",
            "bootstrap.yaml",
        ]);
        assert!(result.is_err());
    }
}
