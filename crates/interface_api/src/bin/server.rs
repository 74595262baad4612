//! Company Onboarding - API Server Binary
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin onboarding-api
//!
//! # Run with environment variables
//! API_PORT=8080 API_DATABASE_URL=postgres://... cargo run --bin onboarding-api
//!
//! # Print a reviewer token for the configured secret
//! cargo run --bin onboarding-api -- issue-token reviewer@example.in
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_UPLOAD_DIR` - Directory documents are written to (default: ./uploads)
//! * `API_PUBLIC_BASE_URL` - URL prefix the upload directory is served under
//! * `API_MAX_BODY_BYTES` - Largest accepted request body

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_onboarding::adapters::{FormatOnlyBankVerifier, LocalFileStore, LoggingNotifier};
use domain_onboarding::OnboardingService;
use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresApplicationStore};
use interface_api::{auth, config::ApiConfig, create_router};

/// Initializes logging, loads configuration, connects and migrates the
/// database, wires the onboarding service and serves HTTP until shutdown.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid API_* configuration")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let [command, subject, roles @ ..] = args.as_slice() {
        if command == "issue-token" {
            return issue_token(&config, subject, roles);
        }
    }

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        upload_dir = %config.upload_dir,
        "Starting onboarding API server"
    );

    let pool = create_pool(
        DatabaseConfig::new(&config.database_url)
            .max_connections(config.database_max_connections)
            .application_name("onboarding-api"),
    )
    .await
    .context("database connection failed")?;
    run_migrations(&pool).await.context("database migration failed")?;

    let service = OnboardingService::new(
        Arc::new(PostgresApplicationStore::new(pool)),
        Arc::new(LocalFileStore::new(&config.upload_dir, &config.public_base_url)),
        Arc::new(LoggingNotifier::new()),
        Arc::new(FormatOnlyBankVerifier::new()),
    );

    let app = create_router(service, config.clone());

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server_addr()))?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Prints a token for `subject`; without explicit roles it carries the
/// review role.
fn issue_token(config: &ApiConfig, subject: &str, roles: &[String]) -> anyhow::Result<()> {
    let roles = if roles.is_empty() {
        vec![auth::permissions::ONBOARDING_REVIEW.to_string()]
    } else {
        roles.to_vec()
    };
    let token = auth::create_token(subject, roles, &config.jwt_secret, config.jwt_expiration_secs)?;
    println!("{}", token);
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
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
