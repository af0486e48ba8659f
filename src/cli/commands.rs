use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Multi-platform mini-app build orchestrator
#[derive(Parser, Debug)]
#[command(
    name = "minapack",
    about = "Multi-platform mini-app build orchestrator",
    version,
    long_about = "minapack merges independently staged mini-app projects into one source \
                  tree and drives an external bundler for a native mini-app, quick app or \
                  web target, once or in watch mode."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Build a project for one platform",
        long_about = "Validates options, merges staged projects, and runs the bundler.\n\n\
                      Examples:\n  \
                      minapack build -p wx\n  \
                      minapack build /path/to/app -p h5 --watch\n  \
                      minapack build -p quick --huawei --compiler 'node build.js'"
    )]
    Build(BuildArgs),

    #[command(
        about = "Merge staged projects without compiling",
        long_about = "Stages the project into the merge cache and recombines every staged \
                      project into the merged tree.\n\n\
                      Examples:\n  \
                      minapack merge\n  \
                      minapack merge /path/to/app --format json"
    )]
    Merge(MergeArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    #[arg(
        value_name = "PATH",
        help = "Project directory (defaults to current directory)"
    )]
    pub project_path: Option<PathBuf>,

    #[arg(short = 'p', long, default_value = "wx", help = "Target platform")]
    pub platform: String,

    #[arg(short = 'w', long, help = "Rebuild on every change")]
    pub watch: bool,

    #[arg(long, help = "Use the beta runtime")]
    pub beta: bool,

    #[arg(long, help = "Use the beta UI library")]
    pub beta_ui: bool,

    #[arg(short = 'c', long, help = "Compress output")]
    pub compress: bool,

    #[arg(short = 't', long, help = "Compile TypeScript sources")]
    pub typescript: bool,

    #[arg(long, help = "Target Huawei quick apps (quick platform only)")]
    pub huawei: bool,

    #[arg(long, help = "Emit bundle analysis")]
    pub analysis: bool,

    #[arg(short = 's', long, help = "Hide compile warnings")]
    pub silent: bool,

    #[arg(long, help = "Embed the web bundle into the legacy web shell")]
    pub legacy_web_shell: bool,

    #[arg(
        long,
        value_name = "COMMAND",
        help = "Bundler command line (overrides MINAPACK_COMPILER)"
    )]
    pub compiler: Option<String>,

    #[arg(long = "prev-loader", value_name = "LOADER", help = "Extra loader run first")]
    pub prev_loaders: Vec<String>,

    #[arg(long = "post-loader", value_name = "LOADER", help = "Extra loader run last")]
    pub post_loaders: Vec<String>,

    #[arg(long = "plugin", value_name = "ID", help = "Bundler plugin id")]
    pub plugins: Vec<String>,

    #[arg(long, help = "Skip merging staged projects")]
    pub no_merge: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct MergeArgs {
    #[arg(
        value_name = "PATH",
        help = "Project directory (defaults to current directory)"
    )]
    pub project_path: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
