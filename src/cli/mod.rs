use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use crate::app::{app, AppState};
use crate::auth::CredentialManager;
use crate::avatar::FsAvatarProcessor;
use crate::config::AppConfig;
use crate::database::{DatabaseManager, PgStore};
use crate::notify::{Notifier, RetryPolicy, SmtpMailer};

/// How long shutdown waits for queued emails to go out
const MAIL_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "contacts-api")]
#[command(about = "Contacts and users REST API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Listening port, overrides PORT")]
        port: Option<u16>,
    },

    #[command(about = "Create database tables and indexes, then exit")]
    Migrate,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!("Starting contacts API in {:?} mode", config.environment);

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config.with_port(port)).await,
        Commands::Migrate => migrate(config).await,
    }
}

async fn migrate(config: AppConfig) -> anyhow::Result<()> {
    let db = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    db.migrate().await.context("failed to create schema")?;
    db.close().await;
    Ok(())
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let db = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    db.health_check().await.context("database is not reachable")?;
    db.migrate().await.context("failed to create schema")?;

    let store = Arc::new(PgStore::new(db.pool()));
    let credentials = CredentialManager::new(&config.security).context("invalid security configuration")?;
    let mailer = SmtpMailer::new(&config.mail).context("invalid mail configuration")?;
    let (notifier, mail_worker) = Notifier::spawn(
        Arc::new(mailer),
        config.notify.queue_capacity,
        RetryPolicy::from(&config.notify),
    );

    let port = config.server.port;
    let state = AppState {
        contacts: store.clone(),
        users: store,
        credentials: Arc::new(credentials),
        notifier,
        avatars: Arc::new(FsAvatarProcessor::new(&config.avatars)),
        config: Arc::new(config),
    };

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Contacts API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // The router owned the last Notifier, so the worker stops once the queue drains
    if tokio::time::timeout(MAIL_DRAIN_TIMEOUT, mail_worker).await.is_err() {
        tracing::warn!("Gave up waiting for queued emails");
    }
    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
