mod bootstrap;
mod cli;
mod config;
mod error;
mod handlers;
mod routes;
mod services;
mod state;
mod utils;

use std::io;
use std::net::SocketAddr;

use altshop_db::db::init_db;
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "altshop-admin")]
#[command(about = "AltShop admin panel backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve,
    /// Administrative tools
    Admin {
        #[command(subcommand)]
        subcommand: AdminCommands,
    },
    /// Database backups
    Backup {
        #[command(subcommand)]
        subcommand: BackupCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Reset an administrator's password, creating the account if needed
    ResetPassword {
        /// Username of the admin
        username: String,
        /// New password
        new_pass: String,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Dump the database into the backup directory
    Create,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        println!("Warning: Failed to load .env file: {}", e);
    }

    let cli = Cli::parse();

    // reqwest is built without a bundled crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| ".".to_string());
    let file_appender = tracing_appender::rolling::never(log_dir, "server.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "altshop_admin=debug,tower_http=info,sqlx=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stdout))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    let config = AppConfig::from_env();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await?,
        Commands::Admin { subcommand } => match subcommand {
            AdminCommands::ResetPassword { username, new_pass } => {
                let pool = init_db(&config.database.url()).await?;
                cli::reset_password(&pool, &username, &new_pass).await?;
            }
        },
        Commands::Backup { subcommand } => match subcommand {
            BackupCommands::Create => cli::backup_create(&config).await?,
        },
    }

    Ok(())
}

async fn run_server(config: AppConfig) -> Result<()> {
    let pool = init_db(&config.database.url()).await?;
    tracing::info!("Connected to PostgreSQL at {}:{}", config.database.host, config.database.port);

    let report = bootstrap::run(&pool, &config).await?;
    tracing::debug!("Bootstrap finished: {:?}", report);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(pool, config);
    let app = routes::app(state)?;

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
