//! eigensound CLI - solve a complex operator and listen to its eigenmodes.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eigensound")]
#[command(author, version, about = "Eigenmodes of a complex matrix, as sound", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose the matrix and print its eigenmodes
    Solve(commands::solve::SolveArgs),

    /// Excite the eigenmodes and play the chord
    Play(commands::play::PlayArgs),

    /// Filter live input through the eigenmode resonators
    Effect(commands::effect::EffectArgs),

    /// Render to a WAV file without an audio device
    Render(commands::render::RenderArgs),

    /// List audio devices
    Devices(commands::devices::DevicesArgs),

    /// Create, show or locate the configuration file
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Solve(args) => commands::solve::run(config, args),
        Commands::Play(args) => commands::play::run(config, args),
        Commands::Effect(args) => commands::effect::run(config, args),
        Commands::Render(args) => commands::render::run(config, args),
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Config(args) => commands::config::run(config, args),
    }
}
