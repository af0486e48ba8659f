//! Command handlers. Each returns the process exit code.

use super::commands::{BuildArgs, MergeArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::compiler::{
    Compiler, CommandCompilerFactory, CompilerConfig, CompilerFactory, H5CompilerConfig, LoaderSet,
};
use crate::config::MinapackConfig;
use crate::fs::{FileSystem, RealFileSystem};
use crate::merge::{CacheLayout, MergeEngine, MergeQueue};
use crate::pipeline::{BuildOptions, BuildOrchestrator, MergeTask};
use crate::progress::LoggingHandler;
use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

/// Stands in when no bundler is configured; fails only once compilation starts
struct UnconfiguredCompiler;

impl CompilerFactory for UnconfiguredCompiler {
    fn create(&self, _config: &CompilerConfig) -> Result<Box<dyn Compiler>> {
        Err(anyhow!(
            "No compiler configured. Pass --compiler or set MINAPACK_COMPILER"
        ))
    }

    fn create_h5(&self, config: &H5CompilerConfig) -> Result<Box<dyn Compiler>> {
        Err(anyhow!(
            "No compiler configured for the web build of {}",
            config.project_dir.display()
        ))
    }
}

fn resolve_project_dir(path: Option<&PathBuf>) -> Result<PathBuf> {
    let cwd = env::current_dir().context("Failed to get current directory")?;
    Ok(match path {
        Some(p) if p.is_absolute() => p.clone(),
        Some(p) => cwd.join(p),
        None => cwd,
    })
}

fn load_config() -> Result<MinapackConfig> {
    let config = MinapackConfig::from_env()?;
    config.validate()?;
    debug!("{}", config);
    Ok(config)
}

fn merge_engine(
    fs: Arc<dyn FileSystem>,
    config: &MinapackConfig,
    project_dir: &Path,
) -> MergeEngine {
    MergeEngine::new(fs, CacheLayout::new(config.cache_root(project_dir)))
        .with_concurrency(config.merge_concurrency)
        .with_collision_policy(config.collision_policy)
}

fn build_options(args: &BuildArgs) -> BuildOptions {
    BuildOptions {
        watch: args.watch,
        platform: args.platform.clone(),
        beta: args.beta,
        beta_ui: args.beta_ui,
        compress: args.compress,
        typescript: args.typescript,
        huawei: args.huawei,
        legacy_web_shell: args.legacy_web_shell,
        loaders: LoaderSet {
            prev: args.prev_loaders.clone(),
            post: args.post_loaders.clone(),
            ..LoaderSet::default()
        },
        plugins: args.plugins.clone(),
        analysis: args.analysis,
        silent: args.silent,
        ..BuildOptions::default()
    }
}

pub async fn handle_build(args: &BuildArgs) -> i32 {
    match run_build(args).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Build failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

async fn run_build(args: &BuildArgs) -> Result<()> {
    let config = load_config()?;
    let project_dir = resolve_project_dir(args.project_path.as_ref())?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem::new());

    let compiler = args.compiler.as_ref().or(config.compiler.as_ref());
    let factory: Arc<dyn CompilerFactory> = match compiler {
        Some(command) => Arc::new(CommandCompilerFactory::new(command)?),
        None => Arc::new(UnconfiguredCompiler),
    };

    let mut orchestrator = BuildOrchestrator::new(Arc::clone(&fs), factory)
        .with_progress(Arc::new(LoggingHandler))
        .with_hosted(config.hosted)
        .with_scaffold_template(config.scaffold_template.clone());
    if !args.no_merge {
        let engine = merge_engine(Arc::clone(&fs), &config, &project_dir);
        orchestrator = orchestrator.with_pre_build_tasks(Arc::new(MergeTask::new(engine)));
    }

    let summary = orchestrator
        .build(&project_dir, build_options(args))
        .await?;

    let output = OutputFormatter::new(OutputFormat::Human).format_build(&summary)?;
    print!("{}", output);
    Ok(())
}

pub async fn handle_merge(args: &MergeArgs) -> i32 {
    match run_merge(args).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Merge failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

async fn run_merge(args: &MergeArgs) -> Result<()> {
    let config = load_config()?;
    let project_dir = resolve_project_dir(args.project_path.as_ref())?;
    let engine = merge_engine(Arc::new(RealFileSystem::new()), &config, &project_dir);

    let mut queue = MergeQueue::new();
    let report = engine.run(&project_dir, &mut queue).await?;

    let output =
        OutputFormatter::new(args.format.into()).format_merge(&project_dir, &report, &queue)?;
    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_project_dir() {
        let cwd = env::current_dir().unwrap();
        assert_eq!(resolve_project_dir(None).unwrap(), cwd);
        assert_eq!(
            resolve_project_dir(Some(&PathBuf::from("app"))).unwrap(),
            cwd.join("app")
        );
        assert_eq!(
            resolve_project_dir(Some(&PathBuf::from("/abs/app"))).unwrap(),
            PathBuf::from("/abs/app")
        );
    }

    #[test]
    fn test_build_options_from_args() {
        use crate::cli::commands::{CliArgs, Commands};
        use clap::Parser;

        let args = CliArgs::parse_from([
            "minapack",
            "build",
            "-p",
            "h5",
            "--prev-loader",
            "pre",
            "--post-loader",
            "post",
            "-s",
        ]);
        let Commands::Build(build) = args.command else {
            panic!("Expected Build command");
        };

        let options = build_options(&build);
        assert_eq!(options.platform, "h5");
        assert_eq!(options.loaders.prev, vec!["pre"]);
        assert_eq!(options.loaders.post, vec!["post"]);
        assert!(options.silent);
        assert!(options.complete.is_none());
    }

    #[test]
    fn test_unconfigured_compiler_fails_on_create() {
        let config = H5CompilerConfig::new(
            crate::compiler::H5Mode::Production,
            PathBuf::from("/app"),
            false,
            Default::default(),
        );
        assert!(UnconfiguredCompiler.create_h5(&config).is_err());
    }
}
