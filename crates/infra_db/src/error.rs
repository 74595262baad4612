//! Database error types
//!
//! PostgreSQL error codes are sorted into the few cases the application
//! store adapter distinguishes when it reports a [`core_kernel::PortError`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Unparseable URL, unreachable server or a dropped connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Record not found: {0}")]
    NotFound(String),

    /// `23505`; `constraint` names the violated unique index when PostgreSQL
    /// reports one
    #[error("Duplicate entry: {message}")]
    DuplicateEntry {
        constraint: Option<String>,
        message: String,
    },

    /// Foreign key (`23503`) or check (`23514`) violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A JSONB section that does not match its Rust type
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQL error: {0}")]
    Sql(#[source] sqlx::Error),
}

impl DatabaseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }

    /// True when the database could not be reached at all
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted
        )
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("no matching row".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => DatabaseError::PoolExhausted,
            sqlx::Error::Io(e) => DatabaseError::ConnectionFailed(e.to_string()),
            sqlx::Error::Database(db_err) => {
                // https://www.postgresql.org/docs/current/errcodes-appendix.html
                let message = db_err.message().to_string();
                match db_err.code().as_deref() {
                    Some("23505") => DatabaseError::DuplicateEntry {
                        constraint: db_err.constraint().map(str::to_string),
                        message,
                    },
                    Some("23503") | Some("23514") => DatabaseError::ConstraintViolation(message),
                    _ => DatabaseError::QueryFailed(message),
                }
            }
            _ => DatabaseError::Sql(error),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationFailed(error.to_string())
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(error: serde_json::Error) -> Self {
        DatabaseError::Serialization(error.to_string())
    }
}
