//! rfx - apply filter chains to images on the GPU or CPU

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod io;

#[derive(Parser)]
#[command(name = "rfx")]
#[command(author, version, about = "Apply image filter chains on the GPU or CPU")]
#[command(long_about = "
Runs a chain of image filters over a PNG, on the GPU (wgpu) when available
and enabled, otherwise on the CPU.

A chain is a JSON array of filter records:
  [{ \"type\": \"Brightness\", \"brightness\": 0.1 }, { \"type\": \"Blur\", \"blur\": 0.2 }]

Examples:
  rfx apply in.png -o out.png --chain chain.json
  rfx apply in.png -o out.png -f '{\"type\":\"Sepia\"}' --backend cpu
  rfx apply in.png -o thumb.png -f '{\"type\":\"Resize\",\"scaleX\":0.25,\"scaleY\":0.25}'
  rfx probe --json
  rfx filters
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a filter chain to an image
    #[command(visible_alias = "a")]
    Apply(ApplyArgs),

    /// Show GPU capabilities and the backend that would be selected
    Probe(ProbeArgs),

    /// List registered filter types
    Filters,
}

#[derive(Args)]
struct ApplyArgs {
    /// Input PNG
    input: PathBuf,

    /// Output PNG
    #[arg(short, long)]
    output: PathBuf,

    /// JSON file holding an array of filter records
    #[arg(short, long)]
    chain: Option<PathBuf>,

    /// Inline filter record, appended after --chain (repeatable)
    #[arg(short = 'f', long = "filter")]
    filters: Vec<String>,

    /// Backend: auto, cpu, wgpu
    #[arg(short, long, default_value = "auto")]
    backend: String,

    /// Draw the source at this width before filtering
    #[arg(short = 'W', long)]
    width: Option<u32>,

    /// Draw the source at this height before filtering
    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Keep neutral filters in the chain
    #[arg(long)]
    keep_neutral: bool,

    /// Texture cache key for the uploaded source
    #[arg(long)]
    cache_key: Option<String>,
}

#[derive(Args)]
struct ProbeArgs {
    /// Machine-readable output (JSON)
    #[arg(long)]
    json: bool,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Apply(args) => commands::apply::run(args, cli.verbose > 0),
        Commands::Probe(args) => commands::probe::run(args),
        Commands::Filters => commands::filters::run(),
    }
}
