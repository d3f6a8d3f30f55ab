use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::auth::hash_password;
use crate::config::AppConfig;
use crate::database::models::{NewAccount, Role};
use crate::database::DatabaseManager;
use crate::handlers::validate_email_format;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "jobboard-api")]
#[command(about = "Job marketplace API server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP and WebSocket server (default)")]
    Serve {
        #[arg(long, help = "Listen port, overrides PORT")]
        port: Option<u16>,
    },

    #[command(about = "Create an admin account in the configured store")]
    CreateAdmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, port).await,
        Commands::CreateAdmin {
            name,
            email,
            password,
        } => create_admin(config, name, email, password).await,
    }
}

async fn serve(mut config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.api.port = port;
    }
    info!("Starting Job Board API in {:?} mode", config.environment);

    let store = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let state = AppState::new(store.clone(), config);
    let gateway = state.gateway.clone();
    let app = crate::routes::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Job Board API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Dropping every outbox closes the open sockets
            gateway.shutdown().await;
        })
        .await
        .context("server error")?;

    store.close().await;
    info!("Server stopped");
    Ok(())
}

async fn create_admin(config: AppConfig, name: String, email: String, password: String) -> anyhow::Result<()> {
    let name = name.trim().to_string();
    let email = email.trim().to_string();
    if name.is_empty() || password.is_empty() {
        bail!("name and password must not be empty");
    }
    validate_email_format(&email).map_err(|e| anyhow::anyhow!("{}", e))?;

    let store = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;

    if store.find_account_by_email(&email).await?.is_some() {
        bail!("an account with email {} already exists", email);
    }

    let password_hash = hash_password(&password, config.security.bcrypt_cost).await?;
    let account = store
        .insert_account(NewAccount {
            name,
            email,
            password_hash,
            role: Role::Admin,
        })
        .await?;

    info!("Created admin account {}", account.id);
    println!("Created admin {} ({})", account.email, account.id);
    store.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
