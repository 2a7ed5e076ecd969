mod commands;
mod reporter;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "volmetrics", about = "Streaming PSNR/SSIM evaluation of 4-D volumes")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show NPY volume metadata
    Info(commands::info::InfoArgs),
    /// Compare a reconstruction against ground truth slice by slice
    Eval(commands::eval::EvalArgs),
    /// Print a default evaluation config as TOML
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Eval(args) => commands::eval::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
