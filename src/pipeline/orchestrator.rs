use super::context::BuildContext;
use super::error::BuildError;
use super::h5::H5PostProcessor;
use super::options::{BuildOptions, CompletionHook};
use super::report::{Console, Reporter, StdConsole};
use super::tasks::{NoPreBuildTasks, PreBuildRequest, PreBuildTasks};
use crate::compiler::{
    CompileOutcome, CompilerConfig, CompilerFactory, DevServer, RebuildServer, COMPRESS_LOADER,
};
use crate::fs::FileSystem;
use crate::logs::LogBuffer;
use crate::platform::Platform;
use crate::progress::{BuildEvent, NoOpHandler, ProgressHandler};
use crate::routes::{select_scanner, RouteDiscovery};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// What a finished invocation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub platform: Platform,
    pub cycles: usize,
    pub webview_routes: Vec<PathBuf>,
}

/// State shared by every cycle of one invocation
struct CycleScope<'a> {
    context: &'a BuildContext,
    watch: bool,
    reporter: Reporter,
    h5: H5PostProcessor,
    logs: LogBuffer,
    complete: Option<CompletionHook>,
}

pub struct BuildOrchestrator {
    fs: Arc<dyn FileSystem>,
    factory: Arc<dyn CompilerFactory>,
    pre_build: Arc<dyn PreBuildTasks>,
    route_discovery: RouteDiscovery,
    dev_server: Arc<dyn DevServer>,
    console: Arc<dyn Console>,
    progress: Arc<dyn ProgressHandler>,
    hosted: bool,
    scaffold_template: Option<PathBuf>,
}

impl BuildOrchestrator {
    pub fn new(fs: Arc<dyn FileSystem>, factory: Arc<dyn CompilerFactory>) -> Self {
        let route_discovery = RouteDiscovery::new(select_scanner(Arc::clone(&fs)));
        Self {
            fs,
            factory,
            pre_build: Arc::new(NoPreBuildTasks),
            route_discovery,
            dev_server: Arc::new(RebuildServer),
            console: Arc::new(StdConsole),
            progress: Arc::new(NoOpHandler),
            hosted: false,
            scaffold_template: None,
        }
    }

    pub fn with_pre_build_tasks(mut self, tasks: Arc<dyn PreBuildTasks>) -> Self {
        self.pre_build = tasks;
        self
    }

    pub fn with_route_discovery(mut self, discovery: RouteDiscovery) -> Self {
        self.route_discovery = discovery;
        self
    }

    pub fn with_dev_server(mut self, server: Arc<dyn DevServer>) -> Self {
        self.dev_server = server;
        self
    }

    pub fn with_console(mut self, console: Arc<dyn Console>) -> Self {
        self.console = console;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    /// In hosted mode the first compile error ends the invocation
    pub fn with_hosted(mut self, hosted: bool) -> Self {
        self.hosted = hosted;
        self
    }

    pub fn with_scaffold_template(mut self, template: Option<PathBuf>) -> Self {
        self.scaffold_template = template;
        self
    }

    pub async fn build(
        &self,
        project_dir: &Path,
        options: BuildOptions,
    ) -> Result<BuildSummary, BuildError> {
        let start = Instant::now();
        self.progress.on_progress(&BuildEvent::Started {
            project_dir: project_dir.display().to_string(),
            platform: options.platform.clone(),
        });

        match self.execute(project_dir, options).await {
            Ok(summary) => {
                self.progress.on_progress(&BuildEvent::Completed {
                    cycles: summary.cycles,
                    total_time: start.elapsed(),
                });
                Ok(summary)
            }
            Err(e) => {
                self.progress.on_progress(&BuildEvent::Failed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        project_dir: &Path,
        mut options: BuildOptions,
    ) -> Result<BuildSummary, BuildError> {
        let phase = self.phase_started("Validate");
        let platform = self.validate(project_dir, &options)?;
        self.phase_complete("Validate", phase);

        let logs = LogBuffer::new();

        let phase = self.phase_started("PrepareContext");
        let webview = self
            .route_discovery
            .discover(platform, project_dir, &logs.sink())
            .await?;
        let context = BuildContext::new(platform, &options, project_dir, webview);
        self.phase_complete("PrepareContext", phase);

        let phase = self.phase_started("PreBuildTasks");
        let request = PreBuildRequest {
            platform,
            beta: options.beta,
            beta_ui: options.beta_ui,
            compress: options.compress,
        };
        self.pre_build
            .run(&request, &context, &logs.sink())
            .await
            .map_err(BuildError::PreBuildTasks)?;
        self.phase_complete("PreBuildTasks", phase);

        let phase = self.phase_started("Compile");
        let config = compiler_config(&context, &options);
        let mut compiler = self
            .factory
            .create(&config)
            .map_err(BuildError::Compiler)?;

        let mut scope = CycleScope {
            context: &context,
            watch: options.watch,
            reporter: Reporter::new(Arc::clone(&self.console), options.silent, self.hosted),
            h5: H5PostProcessor::new(
                Arc::clone(&self.fs),
                Arc::clone(&self.factory),
                Arc::clone(&self.dev_server),
                self.scaffold_template.clone(),
            ),
            logs,
            complete: options.complete.take(),
        };

        let mut cycles = 0;
        if options.watch {
            info!(platform = %platform, "Watching for changes");
            let mut outcomes = compiler.watch().await.map_err(BuildError::Compiler)?;
            while let Some(outcome) = outcomes.recv().await {
                cycles += 1;
                self.finish_cycle(cycles, outcome, &mut scope).await?;
            }
        } else {
            let outcome = compiler.run().await;
            cycles += 1;
            self.finish_cycle(cycles, outcome, &mut scope).await?;
        }
        self.phase_complete("Compile", phase);

        Ok(BuildSummary {
            platform,
            cycles,
            webview_routes: context.webview_routes().to_vec(),
        })
    }

    /// Reject invalid options before anything touches disk or spawns
    fn validate(&self, project_dir: &Path, options: &BuildOptions) -> Result<Platform, BuildError> {
        if options.watch && options.legacy_web_shell {
            return Err(BuildError::WatchWithLegacyWebShell);
        }

        let platform = options
            .platform
            .parse::<Platform>()
            .map_err(BuildError::UnsupportedPlatform)?;

        let tsx_entry = project_dir.join("source").join("app.tsx");
        if self.fs.exists(&tsx_entry) && !options.typescript {
            return Err(BuildError::TypeScriptNotEnabled(tsx_entry));
        }

        Ok(platform)
    }

    async fn finish_cycle(
        &self,
        cycle: usize,
        outcome: CompileOutcome,
        scope: &mut CycleScope<'_>,
    ) -> Result<(), BuildError> {
        scope.reporter.report_cycle(
            outcome.error.as_ref(),
            outcome.stats.as_ref(),
            &scope.logs,
        )?;

        // The completion hook fires even when web post-processing fails
        let post = if scope.context.platform().is_web() && outcome.error.is_none() {
            scope
                .h5
                .process(scope.context, scope.watch, &scope.reporter)
                .await
        } else {
            Ok(())
        };

        let (warnings, errors) = outcome
            .stats
            .as_ref()
            .map(|s| (s.warnings.len(), s.errors.len()))
            .unwrap_or((0, usize::from(outcome.error.is_some())));
        self.progress.on_progress(&BuildEvent::CycleReported {
            cycle,
            warnings,
            errors,
        });

        if let Some(complete) = scope.complete.as_mut() {
            complete(&outcome);
        }
        post
    }

    fn phase_started(&self, phase: &str) -> Instant {
        info!("Phase: {}", phase);
        self.progress.on_progress(&BuildEvent::PhaseStarted {
            phase: phase.to_string(),
        });
        Instant::now()
    }

    fn phase_complete(&self, phase: &str, started: Instant) {
        self.progress.on_progress(&BuildEvent::PhaseComplete {
            phase: phase.to_string(),
            duration: started.elapsed(),
        });
        debug!("Phase {} complete", phase);
    }
}

/// Assemble the main compiler's configuration
pub fn compiler_config(context: &BuildContext, options: &BuildOptions) -> CompilerConfig {
    let mut loaders = options.loaders.clone();
    if context.compress() {
        loaders.post.insert(0, COMPRESS_LOADER.to_string());
    }

    CompilerConfig {
        platform: context.platform(),
        compress: context.compress(),
        compress_options: options.compress_options.clone(),
        beta: options.beta,
        beta_ui: options.beta_ui,
        typescript: context.typescript(),
        huawei: context.huawei(),
        analysis: options.analysis,
        loaders,
        rules: options.rules.clone(),
        plugins: options.plugins.clone(),
        env: context.env_markers(),
        project_dir: context.project_dir().to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::LoaderSet;

    #[test]
    fn test_compress_loader_prepended() {
        let options = BuildOptions::new("wx")
            .with_compress(true)
            .with_loaders(LoaderSet {
                post: vec!["custom-loader".to_string()],
                ..LoaderSet::default()
            });
        let context = BuildContext::new(Platform::Wx, &options, Path::new("/app"), None);

        let config = compiler_config(&context, &options);

        assert_eq!(config.loaders.post, vec![COMPRESS_LOADER, "custom-loader"]);
        assert_eq!(options.loaders.post, vec!["custom-loader"]);
    }

    #[test]
    fn test_compress_off_leaves_loaders() {
        let options = BuildOptions::new("wx");
        let context = BuildContext::new(Platform::Wx, &options, Path::new("/app"), None);

        let config = compiler_config(&context, &options);

        assert!(config.loaders.post.is_empty());
        assert_eq!(config.env.get("ANU_ENV").map(String::as_str), Some("wx"));
    }
}
