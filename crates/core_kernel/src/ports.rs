//! Port infrastructure
//!
//! Domain crates declare their collaborator traits on top of [`DomainPort`]
//! and report failures as [`PortError`]; adapters (PostgreSQL, local files,
//! in-memory mocks) implement them.
//!
//! ```text
//!   OnboardingService
//!          │
//!          ▼
//!   ApplicationStore, FileTransfer, SubmissionNotifier, BankAccountVerifier
//!          ▲                                   ▲
//!   PostgresApplicationStore          local / in-memory adapters
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Failure reported by an adapter
#[derive(Debug, Error)]
pub enum PortError {
    #[error("Not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    /// The store refused the data itself
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// A unique key was rejected by the underlying store
    ///
    /// `key` names the logical identifier (for example `tax_id`), not the
    /// physical constraint.
    #[error("Duplicate {key}: {value}")]
    DuplicateKey { key: String, value: String },

    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Service unavailable: {service}")]
    ServiceUnavailable { service: String },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl PortError {
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn duplicate_key(key: impl Into<String>, value: impl Into<String>) -> Self {
        PortError::DuplicateKey {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// True for failures a caller may retry unchanged
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortError::Connection { .. } | PortError::ServiceUnavailable { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Marker for collaborator traits; ports are shared across tasks
pub trait DomainPort: Send + Sync + 'static {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    Unhealthy,
}

/// Outcome of one adapter health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter_id: String,
    pub status: AdapterHealth,
    pub latency_ms: u64,
    pub message: Option<String>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl HealthCheckResult {
    pub fn healthy(adapter_id: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status: AdapterHealth::Healthy,
            latency_ms,
            message: None,
            checked_at: chrono::Utc::now(),
        }
    }

    pub fn unhealthy(
        adapter_id: impl Into<String>,
        latency_ms: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: AdapterHealth::Unhealthy,
            message: Some(message.into()),
            ..Self::healthy(adapter_id, latency_ms)
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == AdapterHealth::Healthy
    }
}

/// Adapters that can probe their backing system
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}

/// Who asked for a write and how to correlate what it produced
///
/// Stores copy the correlation id onto every audit row the write creates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationMetadata {
    pub correlation_id: Option<String>,
    pub initiated_by: Option<String>,
    pub operation: Option<String>,
}

impl OperationMetadata {
    /// Metadata for one named write, with a fresh correlation id
    pub fn for_operation(operation: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(Uuid::new_v4().to_string()),
            initiated_by: None,
            operation: Some(operation.into()),
        }
    }

    /// Metadata carrying a correlation id issued elsewhere
    pub fn with_correlation_id(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(correlation_id.into()),
            ..Default::default()
        }
    }

    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.initiated_by = Some(actor.into());
        self
    }
}
