//! Per-cycle reporting of queued logs and compile statistics

use super::error::BuildError;
use crate::compiler::CompileStats;
use crate::logs::LogBuffer;
use std::sync::{Arc, Mutex};

/// Dynamic `require()` warnings are expected in bundled mini-app code
pub const BENIGN_WARNING: &str = "Critical dependency: the request of a dependency is an expression";

/// Where user-facing build output goes
pub trait Console: Send + Sync {
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl Console for StdConsole {
    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn warning(&self, message: &str) {
        println!("Warning:\n {}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("Error:\n {}", message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    Info(String),
    Warning(String),
    Error(String),
}

/// Records every line; used to observe reporting order
#[derive(Debug, Default, Clone)]
pub struct MemoryConsole {
    lines: Arc<Mutex<Vec<ConsoleLine>>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<ConsoleLine> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn push(&self, line: ConsoleLine) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line);
    }
}

impl Console for MemoryConsole {
    fn info(&self, message: &str) {
        self.push(ConsoleLine::Info(message.to_string()));
    }

    fn warning(&self, message: &str) {
        self.push(ConsoleLine::Warning(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.push(ConsoleLine::Error(message.to_string()));
    }
}

fn is_benign(warning: &str) -> bool {
    warning.contains(BENIGN_WARNING)
}

/// Prints queued logs and compile statistics for one cycle
#[derive(Clone)]
pub struct Reporter {
    console: Arc<dyn Console>,
    silent: bool,
    hosted: bool,
}

impl Reporter {
    pub fn new(console: Arc<dyn Console>, silent: bool, hosted: bool) -> Self {
        Self {
            console,
            silent,
            hosted,
        }
    }

    /// Report one build cycle. In hosted mode the first error is fatal.
    pub fn report_cycle(
        &self,
        error: Option<&anyhow::Error>,
        stats: Option<&CompileStats>,
        logs: &LogBuffer,
    ) -> Result<(), BuildError> {
        if let Some(error) = error {
            self.report_error(error);
        }

        let drained = logs.drain();
        if !drained.info.is_empty() {
            self.console.info(&drained.info.join("\n"));
        }
        for warning in &drained.warnings {
            self.console.warning(warning);
        }
        for queued in &drained.errors {
            self.console.error(queued);
        }
        if self.hosted {
            if let Some(first) = drained.errors.first() {
                return Err(BuildError::FatalCompileError(first.clone()));
            }
        }

        match stats {
            Some(stats) => self.report_stats(stats),
            None => Ok(()),
        }
    }

    /// The compiler itself failed; nothing else is known about the cycle
    pub fn report_error(&self, error: &anyhow::Error) {
        self.console.error(&format!("{:#}", error));
    }

    /// Warnings then errors from the compiler's own statistics
    pub fn report_stats(&self, stats: &CompileStats) -> Result<(), BuildError> {
        if !self.silent {
            for warning in stats.warnings.iter().filter(|w| !is_benign(w)) {
                self.console.warning(warning);
            }
        }
        for error in &stats.errors {
            self.console.error(error);
            if self.hosted {
                return Err(BuildError::FatalCompileError(error.clone()));
            }
        }
        Ok(())
    }
}
