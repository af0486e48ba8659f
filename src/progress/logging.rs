//! Logging-based progress handler

use super::{BuildEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &BuildEvent) {
        match event {
            BuildEvent::Started {
                project_dir,
                platform,
            } => {
                info!(project = %project_dir, platform = %platform, "Starting build");
            }
            BuildEvent::PhaseStarted { phase } => {
                debug!(phase = %phase, "Starting phase");
            }
            BuildEvent::PhaseComplete { phase, duration } => {
                info!(
                    phase = %phase,
                    duration_ms = duration.as_millis(),
                    "Phase complete"
                );
            }
            BuildEvent::CycleReported {
                cycle,
                warnings,
                errors,
            } => {
                if *errors > 0 {
                    warn!(cycle, warnings, errors, "Build cycle finished with errors");
                } else {
                    info!(cycle, warnings, "Build cycle finished");
                }
            }
            BuildEvent::Completed { cycles, total_time } => {
                info!(
                    cycles,
                    total_time_ms = total_time.as_millis(),
                    "Build complete"
                );
            }
            BuildEvent::Failed { error } => {
                warn!(error = %error, "Build failed");
            }
        }
    }
}
