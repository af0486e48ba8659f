use minapack::cli::commands::{CliArgs, Commands};
use minapack::cli::handlers::{handle_build, handle_merge};
use minapack::util::logging::{init_logging, LoggingConfig};
use minapack::VERSION;

use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::for_cli(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("minapack v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Build(build_args) => handle_build(build_args).await,
        Commands::Merge(merge_args) => handle_merge(merge_args).await,
    };

    std::process::exit(exit_code);
}
