mod commands;
mod summary;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "iris", about = "Image quality statistics for dual-camera exposures")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Run config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run directory (overrides the config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest an exposure and print its statistics
    Run(commands::run::RunArgs),
    /// Print the stored statistics of one exposure
    Stats(commands::stats::StatsArgs),
    /// List every frame of an output cube with its statistics
    History(commands::history::HistoryArgs),
    /// Export one frame of an output cube as an image
    Export(commands::export::ExportArgs),
    /// Listen for remote-control messages
    Listen(commands::listen::ListenArgs),
    /// Send a remote-control message to a listener
    Notify(commands::notify::NotifyArgs),
    /// Print or save the default run config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let load = || commands::load_config(cli.config.as_deref(), cli.data_dir.as_deref());
    match &cli.command {
        Commands::Run(args) => commands::run::run(args, load()?),
        Commands::Stats(args) => commands::stats::run(args, load()?),
        Commands::History(args) => commands::history::run(args, load()?),
        Commands::Export(args) => commands::export::run(args, load()?),
        Commands::Listen(args) => commands::listen::run(args, load()?),
        Commands::Notify(args) => commands::notify::run(args, load()?),
        Commands::Config(args) => commands::config::run(args),
    }
}
