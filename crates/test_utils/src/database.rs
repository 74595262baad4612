//! PostgreSQL Test Containers
//!
//! Each [`TestDatabase`] owns a throwaway `postgres:16-alpine` container with
//! the onboarding migrations applied. Dropping it stops the container.

use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

use infra_db::{create_pool, run_migrations, DatabaseConfig, DatabasePool, PostgresApplicationStore};

const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "onboarding";
const POSTGRES_PASSWORD: &str = "onboarding";
const POSTGRES_DB: &str = "onboarding_test";

/// Tables in foreign key order, children first
const ONBOARDING_TABLES: [&str; 2] = ["onboarding_status_history", "company_onboarding"];

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Connection URL for a container listening on `host:port`
pub fn connection_url(host: &str, port: u16) -> String {
    format!(
        "postgres://{}:{}@{}:{}/{}",
        POSTGRES_USER, POSTGRES_PASSWORD, host, port, POSTGRES_DB
    )
}

/// A migrated PostgreSQL container
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pub url: String,
    pub pool: DatabasePool,
}

impl TestDatabase {
    /// Starts a container, connects and applies the migrations
    pub async fn start() -> Result<Self, BoxError> {
        let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_USER", POSTGRES_USER)
            .with_env_var("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
            .with_env_var("POSTGRES_DB", POSTGRES_DB)
            .start()
            .await?;

        let host = container.get_host().await?.to_string();
        let port = container.get_host_port_ipv4(5432).await?;
        let url = connection_url(&host, port);

        let pool = create_pool(
            DatabaseConfig::new(&url)
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(30))
                .application_name("onboarding-tests"),
        )
        .await?;
        run_migrations(&pool).await?;

        Ok(Self {
            _container: container,
            url,
            pool,
        })
    }

    /// A store over this database
    pub fn application_store(&self) -> PostgresApplicationStore {
        PostgresApplicationStore::new(self.pool.clone())
    }

    /// Empties the onboarding tables, keeping the schema
    pub async fn reset(&self) -> Result<(), BoxError> {
        for table in ONBOARDING_TABLES {
            sqlx::query(&format!("TRUNCATE TABLE {} CASCADE", table))
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    /// Rows currently in `table`
    pub async fn count_rows(&self, table: &str) -> Result<i64, BoxError> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
