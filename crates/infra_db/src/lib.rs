//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for company onboarding applications using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: [`repositories`] hold the SQL
//! and plain row types, [`adapters`] implement the domain ports on top of
//! them. The schema lives in `migrations/` and is embedded at build time.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresApplicationStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/onboarding")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresApplicationStore::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::PostgresApplicationStore;
pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use repositories::ApplicationRepository;
