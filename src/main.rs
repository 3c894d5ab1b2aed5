use clap::{Parser, Subcommand};
use divrot::core::log::init_logging;
use divrot::{AppCommand, RunOptions};
use std::process::ExitCode;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Score the basket and print the recommended fund (default)
    Signal {
        /// Push the recommendation through the configured notifier
        #[arg(short, long)]
        notify: bool,

        /// Refetch dividend yields even if the cache is fresh
        #[arg(long)]
        refresh_yields: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let options = match cli.command {
        Some(Commands::Setup) => {
            return match divrot::cli::setup::setup() {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!(error = %e, "Setup failed");
                    eprintln!("Error: {e:#}");
                    ExitCode::FAILURE
                }
            };
        }
        Some(Commands::Signal {
            notify,
            refresh_yields,
        }) => RunOptions {
            notify,
            refresh_yields,
        },
        None => RunOptions::default(),
    };

    match divrot::run_command(AppCommand::Signal(options), cli.config_path.as_deref()).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            tracing::error!(error = %e, "Application failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
