//! Build orchestration: validate, prepare context, run pre-build tasks,
//! compile, and report every cycle.

pub mod context;
pub mod error;
pub mod h5;
pub mod options;
pub mod orchestrator;
pub mod report;
pub mod tasks;

pub use context::{BuildContext, PLATFORM_ENV, WEBVIEW_ENV};
pub use error::BuildError;
pub use h5::{H5PostProcessor, INTERMEDIATE_DIR};
pub use options::{BuildOptions, CompletionHook};
pub use orchestrator::{compiler_config, BuildOrchestrator, BuildSummary};
pub use report::{Console, ConsoleLine, MemoryConsole, Reporter, StdConsole, BENIGN_WARNING};
pub use tasks::{MergeTask, NoPreBuildTasks, PreBuildRequest, PreBuildTasks, TaskSet};
