//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while a build invocation runs
#[derive(Debug, Clone)]
pub enum BuildEvent {
    /// Build started
    Started {
        project_dir: String,
        platform: String,
    },

    /// An orchestration phase started
    PhaseStarted { phase: String },

    /// An orchestration phase completed
    PhaseComplete { phase: String, duration: Duration },

    /// A compile cycle was reported
    CycleReported {
        cycle: usize,
        warnings: usize,
        errors: usize,
    },

    /// Build completed (one-shot) or the watch stream ended
    Completed { cycles: usize, total_time: Duration },

    /// Build failed
    Failed { error: String },
}

/// Trait for handling progress events during a build
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &BuildEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &BuildEvent) {}
}
