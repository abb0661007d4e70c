//! Permission-boundary pipeline CLI
//!
//! Synthesizes the bounded pipeline stack and bounds application templates.

use clap::Parser;

use boundary_cli::{Cli, Result};
use boundary_common::telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_telemetry(TelemetryConfig {
        service_name: "boundary-cli".to_string(),
        format: cli.log_format,
        ..Default::default()
    })?;

    cli.run().await
}
