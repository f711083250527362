//! Attest CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use attest::cli::{Cli, Commands};

// Single-threaded cooperative scheduling: stages within a run are
// strictly sequential, so one worker thread is all the pipeline needs.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ask(args) => attest::cli::execute_ask(args, cli.json).await,
    };

    if let Err(err) = result {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}
