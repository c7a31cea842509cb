//! Billing API Server Binary
//!
//! Starts the HTTP API for bills, returns and customer credit.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin billing-api
//!
//! # Run against the in-memory store, seeded from a JSON catalog
//! API_STORE_BACKEND=memory API_MEMORY_SEED_PATH=seed.json cargo run --bin billing-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_STORE_BACKEND` - `postgres` or `memory` (default: postgres)
//! * `API_CURRENCY` - ISO 4217 code for all amounts (default: USD)
//! * `API_CREDIT_SHORTFALL` - `clamp` or `reject` (default: clamp)
//! * `API_MEMORY_SEED_PATH` - JSON customers and products for the memory backend

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::Currency;
use domain_billing::{BillingEngine, BillingStore, InMemoryBillingStore, UuidBillNumberGenerator};
use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresBillingStore};
use interface_api::config::{ApiConfig, StoreBackend};
use interface_api::create_router;
use interface_api::seed::SeedFile;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = load_config();
    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        store = ?config.store_backend,
        "Starting billing API server"
    );

    let billing_config = config
        .billing_config()
        .context("invalid billing configuration")?;
    let store = open_store(&config, billing_config.currency).await?;
    let engine = BillingEngine::new(store, Arc::new(UuidBillNumberGenerator), billing_config);

    let app = create_router(engine, config.clone());

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid server address {}", config.server_addr()))?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Loads API configuration from environment variables
///
/// Falls back to individual variables and defaults when the `API_` source
/// cannot be deserialised as a whole.
fn load_config() -> ApiConfig {
    ApiConfig::from_env().unwrap_or_else(|_| {
        let defaults = ApiConfig::default();
        ApiConfig {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            jwt_secret: std::env::var("API_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_expiration_secs: std::env::var("API_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jwt_expiration_secs),
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("API_DATABASE_URL"))
                .unwrap_or(defaults.database_url),
            log_level: std::env::var("API_LOG_LEVEL")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            store_backend: std::env::var("API_STORE_BACKEND")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.store_backend),
            currency: std::env::var("API_CURRENCY").unwrap_or(defaults.currency),
            credit_shortfall: std::env::var("API_CREDIT_SHORTFALL").unwrap_or(defaults.credit_shortfall),
            memory_seed_path: std::env::var("API_MEMORY_SEED_PATH").ok(),
        }
    })
}

/// Initializes the tracing subscriber for structured logging
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Opens the configured store, applying migrations for PostgreSQL
async fn open_store(config: &ApiConfig, currency: Currency) -> anyhow::Result<Arc<dyn BillingStore>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = create_pool(
                DatabaseConfig::new(&config.database_url)
                    .max_connections(10)
                    .min_connections(2)
                    .connect_timeout(Duration::from_secs(30)),
            )
            .await
            .context("failed to connect to database")?;

            run_migrations(&pool).await.context("failed to run migrations")?;
            tracing::info!("Database ready");
            Ok(Arc::new(PostgresBillingStore::new(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on shutdown");
            let store = InMemoryBillingStore::new();
            match &config.memory_seed_path {
                Some(path) => {
                    let json = tokio::fs::read_to_string(path)
                        .await
                        .with_context(|| format!("failed to read seed file {path}"))?;
                    let catalog = SeedFile::parse(&json)?.load_into(&store, currency).await?;
                    tracing::info!(
                        path = %path,
                        customers = catalog.customers.len(),
                        products = catalog.products.len(),
                        "Seeded in-memory store"
                    );
                }
                None => tracing::warn!(
                    "No API_MEMORY_SEED_PATH set; the store has no customers or products"
                ),
            }
            Ok(Arc::new(store))
        }
    }
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
