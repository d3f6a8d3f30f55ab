use clap::Parser;
use tracing_subscriber::EnvFilter;

use jobboard_api::cli::{self, Cli};

const DEFAULT_LOG_FILTER: &str = "info,jobboard_api=debug,tower_http=info";

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up JWT_SECRET, DATABASE_URL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = cli::run(cli).await {
        tracing::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
