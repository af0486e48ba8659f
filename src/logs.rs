//! Per-invocation log queues
//!
//! Collaborators push messages through a cloneable [`LogSink`]; the build
//! reporter drains all three queues once per cycle.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct LogQueues {
    info: VecDeque<String>,
    warning: VecDeque<String>,
    error: VecDeque<String>,
}

/// Everything that was queued since the previous drain, in push order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainedLogs {
    pub info: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl DrainedLogs {
    pub fn is_empty(&self) -> bool {
        self.info.is_empty() && self.warnings.is_empty() && self.errors.is_empty()
    }
}

/// Owner of the three log queues for one invocation
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    queues: Arc<Mutex<LogQueues>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle collaborators use to push messages
    pub fn sink(&self) -> LogSink {
        LogSink {
            queues: Arc::clone(&self.queues),
        }
    }

    /// Empty every queue. A second drain with nothing pushed in between
    /// returns empty lists.
    pub fn drain(&self) -> DrainedLogs {
        let mut queues = lock(&self.queues);
        DrainedLogs {
            info: queues.info.drain(..).collect(),
            warnings: queues.warning.drain(..).collect(),
            errors: queues.error.drain(..).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        let queues = lock(&self.queues);
        queues.info.is_empty() && queues.warning.is_empty() && queues.error.is_empty()
    }
}

/// Write side of a [`LogBuffer`]
#[derive(Debug, Clone)]
pub struct LogSink {
    queues: Arc<Mutex<LogQueues>>,
}

impl LogSink {
    pub fn info(&self, message: impl Into<String>) {
        lock(&self.queues).info.push_back(message.into());
    }

    pub fn warning(&self, message: impl Into<String>) {
        lock(&self.queues).warning.push_back(message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        lock(&self.queues).error.push_back(message.into());
    }
}

fn lock(queues: &Mutex<LogQueues>) -> MutexGuard<'_, LogQueues> {
    queues.lock().unwrap_or_else(|e| e.into_inner())
}
