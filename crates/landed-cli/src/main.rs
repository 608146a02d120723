mod backend;
mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Command::Bronze(args) | Command::Silver(args) => {
            if args.verbose {
                "debug"
            } else if args.quiet {
                "error"
            } else {
                "info"
            }
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .init();

    let result = match cli.command {
        Command::Bronze(args) => commands::bronze(args).await,
        Command::Silver(args) => commands::silver(args).await,
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "run failed with an internal error");
            landed_domain::ErrorKind::Internal.exit_code()
        }
    };

    std::process::exit(exit_code);
}
