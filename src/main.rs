use anyhow::Result;
use clap::{Parser, Subcommand};
use iocsim::cli;
use iocsim::infra::config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "iocsim",
    version,
    about = "Supervisor for the beamline tutorial's demo IOC containers"
)]
struct Cli {
    /// Configuration directory (default: ~/.config/iocsim)
    #[arg(long, env = "IOCSIM_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean up, launch, and probe every demo IOC
    StartAll,
    /// Stop and remove every demo IOC
    StopAll,
    /// Report the current state of every demo IOC
    Status,
    /// Install the default configuration template
    Setup,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config_dir = cli
        .config_dir
        .map(|dir| config::expand_path(&dir))
        .unwrap_or_else(config::default_config_dir);

    match cli.command {
        Commands::StartAll => cli::supervise::start_all(&config_dir),
        Commands::StopAll => cli::supervise::stop_all(&config_dir),
        Commands::Status => cli::supervise::status(&config_dir),
        Commands::Setup => {
            cli::setup::install(&config_dir)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
