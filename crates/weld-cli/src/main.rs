#![forbid(unsafe_code)]

mod cmd;

use clap::{Parser, Subcommand};
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "weld: fuse generated model fragments into one consistent model",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Fuse fragments and emit the fused JSON and XMI documents",
        after_help = "EXAMPLES:\n    # Fuse two generator outputs into both documents\n    weld fuse req.json bdd.json --out-json fused.json --out-xmi model.xmi\n\n    # Tighten the merge threshold\n    weld fuse req.json bdd.json --threshold 0.95 --out-json fused.json\n\n    # Print the fused JSON to stdout\n    weld fuse req.json"
    )]
    Fuse(cmd::fuse::FuseArgs),

    #[command(
        about = "Validate fragments without fusing",
        after_help = "EXAMPLES:\n    # Check every generator output independently\n    weld check out/*.json"
    )]
    Check(cmd::check::CheckArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("WELD_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "weld=debug,info"
        } else {
            "weld=info,warn"
        })
    });

    let format = env::var("WELD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Fuse(args) => cmd::fuse::run_fuse(&args),
        Commands::Check(args) => cmd::check::run_check(&args),
    }
}
