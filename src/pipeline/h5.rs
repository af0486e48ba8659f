//! Web target post-processing: a second compiler pass producing the browser
//! bundle, optionally folded into the legacy web shell.

use super::context::BuildContext;
use super::error::BuildError;
use super::report::Reporter;
use crate::compiler::{CompileStats, CompilerFactory, DevServer, H5CompilerConfig, H5Mode};
use crate::fs::FileSystem;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Emitted next to the bundle but never shipped
pub const INTERMEDIATE_DIR: &str = "__intermediate__";

const SHELL_DIR: &str = "src";
const HASH_PREFIX_LEN: usize = 10;

pub struct H5PostProcessor {
    fs: Arc<dyn FileSystem>,
    factory: Arc<dyn CompilerFactory>,
    dev_server: Arc<dyn DevServer>,
    scaffold_template: Option<PathBuf>,
    server_started: AtomicBool,
}

impl H5PostProcessor {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        factory: Arc<dyn CompilerFactory>,
        dev_server: Arc<dyn DevServer>,
        scaffold_template: Option<PathBuf>,
    ) -> Self {
        Self {
            fs,
            factory,
            dev_server,
            scaffold_template,
            server_started: AtomicBool::new(false),
        }
    }

    /// Run after the main compiler's cycle has been reported
    pub async fn process(
        &self,
        context: &BuildContext,
        watch: bool,
        reporter: &Reporter,
    ) -> Result<(), BuildError> {
        let project_dir = context.project_dir();
        if context.legacy_web_shell() {
            self.ensure_scaffold(project_dir)
                .await
                .map_err(BuildError::PostProcess)?;
        }

        let mode = if watch {
            H5Mode::Development
        } else {
            H5Mode::Production
        };
        let config = H5CompilerConfig::new(
            mode,
            project_dir.to_path_buf(),
            context.typescript(),
            context.env_markers(),
        );

        if watch {
            // One server for the whole watch session
            if !self.server_started.swap(true, Ordering::SeqCst) {
                let compiler = self
                    .factory
                    .create_h5(&config)
                    .map_err(BuildError::PostProcess)?;
                self.dev_server
                    .start(compiler)
                    .map_err(BuildError::PostProcess)?;
                info!("Web development server started");
            }
            return Ok(());
        }

        let mut compiler = self
            .factory
            .create_h5(&config)
            .map_err(BuildError::PostProcess)?;
        let outcome = compiler.run().await;

        if context.legacy_web_shell() {
            if let Some(stats) = &outcome.stats {
                self.embed_bundle(project_dir, &config, stats)
                    .await
                    .map_err(BuildError::PostProcess)?;
            }
        }

        if let Some(error) = &outcome.error {
            reporter.report_error(error);
            return Ok(());
        }
        match &outcome.stats {
            Some(stats) => reporter.report_stats(stats),
            None => Ok(()),
        }
    }

    /// Copy the shell template into `<project>/src` unless it already exists
    pub async fn ensure_scaffold(&self, project_dir: &Path) -> Result<()> {
        let target = project_dir.join(SHELL_DIR);
        if self.fs.exists(&target) {
            return Ok(());
        }
        let template = self
            .scaffold_template
            .as_ref()
            .ok_or_else(|| anyhow!("No web shell template configured"))?;

        debug!(template = %template.display(), "Copying web shell scaffold");
        self.fs
            .copy_dir(template, &target)
            .await
            .with_context(|| format!("Failed to copy web shell template {}", template.display()))
    }

    async fn embed_bundle(
        &self,
        project_dir: &Path,
        config: &H5CompilerConfig,
        stats: &CompileStats,
    ) -> Result<()> {
        let shell = project_dir.join(SHELL_DIR);
        let app_path = shell.join("app.js");
        let script = self
            .fs
            .read_to_string(&app_path)
            .await
            .with_context(|| format!("Failed to read {}", app_path.display()))?;
        let hash: String = stats.hash.chars().take(HASH_PREFIX_LEN).collect();
        let script = format!("import './dist/web/bundle.{}.js';\n{}", hash, script);
        self.fs.write(&app_path, &script).await?;

        let output_dir = stats
            .output_dir
            .clone()
            .unwrap_or_else(|| config.output_dir.clone());
        let destination = shell.join("dist").join("web");
        self.fs.create_dir_all(&destination).await?;

        let entries = self
            .fs
            .read_dir(&output_dir)
            .with_context(|| format!("Failed to list {}", output_dir.display()))?;
        for entry in entries {
            if entry.file_name() == INTERMEDIATE_DIR {
                continue;
            }
            let target = destination.join(entry.file_name());
            if entry.is_dir() {
                self.fs.copy_dir(entry.path(), &target).await?;
            } else {
                self.fs.copy_file(entry.path(), &target).await?;
            }
        }
        debug!(bundle = %hash, "Embedded web bundle into shell");
        Ok(())
    }
}
