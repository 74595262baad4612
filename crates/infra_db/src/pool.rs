//! Connection pool and schema migrations
//!
//! Every connection identifies itself with an `application_name` so
//! onboarding sessions can be told apart in `pg_stat_activity`.

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::DatabaseError;

pub type DatabasePool = PgPool;

const DEFAULT_APPLICATION_NAME: &str = "onboarding";

/// Pool settings
///
/// ```rust
/// use infra_db::DatabaseConfig;
/// use std::time::Duration;
///
/// let config = DatabaseConfig::new("postgres://localhost/onboarding")
///     .max_connections(20)
///     .acquire_timeout(Duration::from_secs(5))
///     .application_name("onboarding-api");
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a request waits for a free connection
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    /// Reported to the server as `application_name`
    pub application_name: String,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(10 * 60),
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    fn connect_options(&self) -> Result<PgConnectOptions, DatabaseError> {
        PgConnectOptions::from_str(&self.url)
            .map(|options| options.application_name(&self.application_name))
            .map_err(|e| DatabaseError::ConnectionFailed(format!("invalid database URL: {}", e)))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new("postgres://localhost/onboarding")
    }
}

/// Opens the pool and checks that one connection can be established
///
/// # Errors
///
/// `DatabaseError::ConnectionFailed` for an unparseable URL or an unreachable
/// server.
pub async fn create_pool(config: DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    let options = config.connect_options()?;
    info!(
        max_connections = config.max_connections,
        application_name = %config.application_name,
        "Opening database pool"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))
}

/// Applies the embedded migrations under `crates/infra_db/migrations`
///
/// Already applied migrations are skipped, so this runs on every start-up.
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database schema up to date");
    Ok(())
}
