//! Boundary API server

use clap::Parser;

use boundary_api::{serve, ApiError};
use boundary_common::telemetry::{init_telemetry, LogFormat, TelemetryConfig};

/// Serve the application API
#[derive(Parser, Debug)]
#[command(name = "boundary-api")]
#[command(version = boundary_api::VERSION, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "BOUNDARY_API_ADDR", default_value = "0.0.0.0:8080")]
    addr: String,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR); RUST_LOG takes precedence
    #[arg(long, env = "LOG_LEVEL", default_value = "INFO")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let args = Args::parse();

    init_telemetry(
        TelemetryConfig {
            service_name: "boundary-api".to_string(),
            format: LogFormat::Json,
            ..Default::default()
        }
        .with_level_name(Some(&args.log_level)),
    )?;

    serve(&args.addr).await
}
