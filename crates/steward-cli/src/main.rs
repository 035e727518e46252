mod cmd;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "steward",
    about = "Declarative recipe runner: assert, label, and apply resource state",
    version,
    propagate_version = true
)]
struct Cli {
    /// State directory backing the resource store
    #[arg(long, global = true, env = "STEWARD_STORE", default_value = ".steward")]
    store: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a recipe file against the store
    Run {
        /// Path to the recipe YAML
        recipe: PathBuf,
    },

    /// Load documents (multi-doc YAML) into the store via create-or-merge
    Seed {
        /// Path to the document file
        doc: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run { recipe } => cmd::run::run(&recipe, &cli.store, cli.json),
        Commands::Seed { doc } => cmd::seed::run(&doc, &cli.store, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
