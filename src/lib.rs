//! minapack - multi-platform mini-app build orchestrator
//!
//! Independently developed mini-app projects are staged into a shared merge
//! cache and recombined into one source tree, which is then handed to an
//! external bundler for a native mini-app, quick app or web target.
//!
//! # Example Usage
//!
//! ```no_run
//! use minapack::{BuildOptions, BuildOrchestrator, CommandCompilerFactory, RealFileSystem};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let factory = CommandCompilerFactory::new("node build.js")?;
//! let orchestrator = BuildOrchestrator::new(Arc::new(RealFileSystem::new()), Arc::new(factory));
//!
//! let summary = orchestrator
//!     .build(Path::new("/work/app"), BuildOptions::new("wx").with_compress(true))
//!     .await?;
//! println!("{} cycle(s) for {}", summary.cycles, summary.platform);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`merge`]: staging and recombination of projects in the merge cache
//! - [`pipeline`]: option validation, build context and the build cycle
//! - [`compiler`]: the seam to the external bundler
//! - [`routes`]: webview page discovery for the quick target

pub mod cli;
pub mod compiler;
pub mod config;
pub mod fs;
pub mod logs;
pub mod merge;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod routes;
pub mod util;

pub use compiler::{
    CommandCompilerFactory, CompileOutcome, CompileStats, Compiler, CompilerConfig,
    CompilerFactory,
};
pub use config::{ConfigError, MinapackConfig};
pub use fs::{FileSystem, MockFileSystem, RealFileSystem};
pub use logs::{LogBuffer, LogSink};
pub use merge::{CacheLayout, CollisionPolicy, MergeEngine, MergeError, MergeQueue, MergeReport};
pub use pipeline::{BuildError, BuildOptions, BuildOrchestrator, BuildSummary};
pub use platform::Platform;
pub use progress::{BuildEvent, LoggingHandler, NoOpHandler, ProgressHandler};
pub use routes::{RouteDiscovery, RouteDiscoveryError, WebViewRules};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
