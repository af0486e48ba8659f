//! Compiler seam: the configuration handed to a bundler and the outcome it
//! reports back per build cycle.

mod command;
mod dev_server;

pub use command::{CommandCompiler, CommandCompilerFactory, CONFIG_ENV, WATCH_ENV};
pub use dev_server::RebuildServer;

use crate::platform::Platform;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Prepended to the post loaders when compression is on
pub const COMPRESS_LOADER: &str = "nanachi-compress-loader";

/// Loader lists forwarded to the bundler, in application order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderSet {
    pub prev: Vec<String>,
    pub post: Vec<String>,
    pub prev_js: Vec<String>,
    pub post_js: Vec<String>,
    pub prev_css: Vec<String>,
    pub post_css: Vec<String>,
}

/// Main compiler configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompilerConfig {
    pub platform: Platform,
    pub compress: bool,
    pub compress_options: Value,
    pub beta: bool,
    pub beta_ui: bool,
    pub typescript: bool,
    pub huawei: bool,
    pub analysis: bool,
    pub loaders: LoaderSet,
    pub rules: Vec<Value>,
    pub plugins: Vec<String>,
    /// Environment markers for the compiler process
    pub env: BTreeMap<String, String>,
    pub project_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum H5Mode {
    Development,
    Production,
}

/// Configuration of the secondary web compiler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct H5CompilerConfig {
    pub mode: H5Mode,
    pub entry: PathBuf,
    pub project_dir: PathBuf,
    pub output_dir: PathBuf,
    pub env: BTreeMap<String, String>,
}

impl H5CompilerConfig {
    pub fn new(
        mode: H5Mode,
        project_dir: PathBuf,
        typescript: bool,
        env: BTreeMap<String, String>,
    ) -> Self {
        let entry_name = if typescript { "app.tsx" } else { "app.js" };
        Self {
            mode,
            entry: project_dir.join("source").join(entry_name),
            output_dir: project_dir.join("dist").join("web"),
            project_dir,
            env,
        }
    }
}

/// Statistics of one build cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileStats {
    pub hash: String,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub output_dir: Option<PathBuf>,
}

impl CompileStats {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// What the completion hook receives for each cycle
#[derive(Debug, Default)]
pub struct CompileOutcome {
    /// The compiler itself failed
    pub error: Option<anyhow::Error>,
    pub stats: Option<CompileStats>,
}

impl CompileOutcome {
    pub fn success(stats: CompileStats) -> Self {
        Self {
            error: None,
            stats: Some(stats),
        }
    }

    pub fn failure(error: anyhow::Error) -> Self {
        Self {
            error: Some(error),
            stats: None,
        }
    }
}

#[async_trait]
pub trait Compiler: Send {
    /// Build once
    async fn run(&mut self) -> CompileOutcome;

    /// Build on every change; each cycle's outcome is sent on the channel
    async fn watch(&mut self) -> anyhow::Result<mpsc::UnboundedReceiver<CompileOutcome>>;
}

pub trait CompilerFactory: Send + Sync {
    fn create(&self, config: &CompilerConfig) -> anyhow::Result<Box<dyn Compiler>>;

    fn create_h5(&self, config: &H5CompilerConfig) -> anyhow::Result<Box<dyn Compiler>>;
}

/// Long-lived development server for the web target
pub trait DevServer: Send + Sync {
    fn start(&self, compiler: Box<dyn Compiler>) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_h5_entry_follows_typescript() {
        let js = H5CompilerConfig::new(
            H5Mode::Production,
            PathBuf::from("/app"),
            false,
            BTreeMap::new(),
        );
        let ts = H5CompilerConfig::new(
            H5Mode::Development,
            PathBuf::from("/app"),
            true,
            BTreeMap::new(),
        );

        assert_eq!(js.entry, PathBuf::from("/app/source/app.js"));
        assert_eq!(ts.entry, PathBuf::from("/app/source/app.tsx"));
        assert_eq!(js.output_dir, PathBuf::from("/app/dist/web"));
    }

    #[test]
    fn test_stats_tolerate_missing_fields() {
        let stats: CompileStats = serde_json::from_str(r#"{"hash":"abc"}"#).unwrap();
        assert_eq!(stats.hash, "abc");
        assert!(!stats.has_errors());
        assert!(stats.output_dir.is_none());
    }
}
