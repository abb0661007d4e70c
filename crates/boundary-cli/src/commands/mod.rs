//! CLI commands

use std::path::Path;

use tracing::{info, warn};

use crate::{Error, Result};

pub mod application;
pub mod policy;
pub mod qualifier;
pub mod synth;

/// Write `text` to `path`, or to stdout when no path is given.
///
/// Stdout carries nothing but the document so it can be piped.
pub(crate) fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, text).map_err(|e| Error::write(path, e))?;
            info!(path = %path.display(), bytes = text.len(), "document written");
        }
        None => println!("{}", text),
    }
    Ok(())
}

/// Resolves when the process is asked to stop (Ctrl-C or SIGTERM).
///
/// If the handlers cannot be installed the future never resolves, so the
/// command runs to completion instead of failing.
pub(crate) async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(terminate) => terminate,
            Err(e) => {
                warn!(error = %e, "failed to register SIGTERM handler");
                return std::future::pending().await;
            }
        };
        let interrupt = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };
        tokio::select! {
            () = interrupt => info!("received interrupt"),
            _ = terminate.recv() => info!("received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        info!("received interrupt");
    }
}
