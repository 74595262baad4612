//! API configuration

use serde::Deserialize;

/// API configuration
///
/// Read from `API_*` environment variables; any variable that is not set
/// keeps its default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for reviewer authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Pool size
    pub database_max_connections: u32,
    /// Log level
    pub log_level: String,
    /// Directory uploaded documents are written to
    pub upload_dir: String,
    /// URL prefix under which `upload_dir` is served
    pub public_base_url: String,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/onboarding".to_string(),
            database_max_connections: 10,
            log_level: "info".to_string(),
            upload_dir: "./uploads".to_string(),
            public_base_url: "http://localhost:8080/uploads".to_string(),
            // six inline documents of 10 MiB each, base64 encoded, plus the form
            max_body_bytes: 90 * 1024 * 1024,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
