//! docstage server binary.

use anyhow::{Context, Result};
use clap::Parser;
use docstage_core::config::AppConfig;
use docstage_server::{AppState, create_router};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// docstage - staged document uploads into a document repository
#[derive(Parser, Debug)]
#[command(name = "docstaged")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "DOCSTAGE_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Load configuration from an optional TOML file overlaid with `DOCSTAGE_` variables.
fn load_config(config_path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();
    if std::path::Path::new(config_path).exists() {
        tracing::info!(config_path = %config_path, "Loading configuration from file");
        figment = figment.merge(Toml::file(config_path));
    } else {
        tracing::info!(
            config_path = %config_path,
            "No config file found, using defaults and environment variables"
        );
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("DOCSTAGE_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("docstage v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    docstage_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let storage = docstage_storage::from_config(&config.storage)
        .await
        .context("failed to initialize staging storage")?;
    storage
        .health_check()
        .await
        .context("staging storage health check failed")?;
    tracing::info!(backend = storage.backend_name(), "Staging storage initialized");

    let metadata = docstage_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    tracing::info!("Metadata store initialized");

    let sessions = docstage_repository::from_config(&config.repository, &config.session_pool)
        .await
        .context("failed to open document repository")?;
    // Open the first session now so a broken repository fails start-up.
    drop(
        sessions
            .rent()
            .await
            .context("failed to open a repository session")?,
    );
    tracing::info!(
        idle_timeout_secs = config.session_pool.idle_timeout_secs,
        "Document repository session pool ready"
    );

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;

    let state = AppState::new(config, storage, metadata, sessions);
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
