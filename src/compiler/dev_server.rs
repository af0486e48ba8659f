use super::{Compiler, DevServer};
use anyhow::Result;
use tracing::{info, warn};

/// Keeps a secondary compiler in watch mode for the life of the process and
/// logs every rebuild
#[derive(Debug, Default, Clone, Copy)]
pub struct RebuildServer;

impl DevServer for RebuildServer {
    fn start(&self, mut compiler: Box<dyn Compiler>) -> Result<()> {
        tokio::spawn(async move {
            let mut cycles = match compiler.watch().await {
                Ok(rx) => rx,
                Err(e) => {
                    warn!(error = %e, "Development server failed to start");
                    return;
                }
            };
            info!("Development server watching for changes");

            while let Some(outcome) = cycles.recv().await {
                match (outcome.error, outcome.stats) {
                    (Some(e), _) => warn!(error = %e, "Web rebuild failed"),
                    (None, Some(stats)) if stats.has_errors() => {
                        warn!(errors = stats.errors.len(), "Web rebuild finished with errors")
                    }
                    (None, Some(stats)) => info!(hash = %stats.hash, "Web rebuild complete"),
                    (None, None) => {}
                }
            }
            info!("Development server stopped");
        });
        Ok(())
    }
}
