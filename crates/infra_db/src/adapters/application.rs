//! PostgreSQL Application Store
//!
//! Implements the onboarding `ApplicationStore` port over
//! [`ApplicationRepository`]. Sections and document URLs travel as JSONB;
//! identifiers, status and timestamps are plain columns so uniqueness and the
//! review queues are enforced and served by the database.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresApplicationStore;
//! use domain_onboarding::ApplicationStore;
//! use std::sync::Arc;
//!
//! let store: Arc<dyn ApplicationStore> = Arc::new(PostgresApplicationStore::new(pool));
//! let application = store.find_by_application_id(id).await?;
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use core_kernel::{
    ApplicationId, CompanyId, DomainPort, HealthCheckResult, HealthCheckable,
    OperationMetadata, PortError,
};
use domain_onboarding::{
    Application, ApplicationParts, ApplicationStatus, ApplicationStore, IdentifierField,
    StatusChange,
};

use crate::error::DatabaseError;
use crate::repositories::application::{
    ApplicationRepository, ApplicationRow, ApplicationStatus as DbApplicationStatus,
    NewStatusHistory, StatusHistoryRow,
};

const ADAPTER_ID: &str = "postgres-application-store";

/// Unique constraint names from the migrations, mapped to logical keys
const GST_NUMBER_CONSTRAINT: &str = "uq_onboarding_gst_number";
const PAN_NUMBER_CONSTRAINT: &str = "uq_onboarding_pan_number";

/// PostgreSQL-backed implementation of the ApplicationStore port
///
/// # Error Handling
///
/// - unique violations on the GST or PAN index -> `PortError::DuplicateKey`
/// - connection failures and pool exhaustion -> `PortError::Connection`
/// - check constraint failures -> `PortError::Validation`
/// - anything else -> `PortError::Internal`
#[derive(Debug, Clone)]
pub struct PostgresApplicationStore {
    repository: ApplicationRepository,
    pool: PgPool,
}

impl PostgresApplicationStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ApplicationRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &ApplicationRepository {
        &self.repository
    }

    /// Attaches history rows and rebuilds domain applications
    async fn hydrate(&self, rows: Vec<ApplicationRow>) -> Result<Vec<Application>, PortError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.application_id).collect();
        let mut history: HashMap<Uuid, Vec<StatusHistoryRow>> = HashMap::new();
        for entry in self
            .repository
            .history_for(&ids)
            .await
            .map_err(db_to_port_error)?
        {
            history.entry(entry.application_id).or_default().push(entry);
        }

        rows.into_iter()
            .map(|row| {
                let entries = history.remove(&row.application_id).unwrap_or_default();
                row_to_application(row, entries)
            })
            .collect()
    }

    async fn hydrate_one(&self, row: Option<ApplicationRow>) -> Result<Option<Application>, PortError> {
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }
}

impl DomainPort for PostgresApplicationStore {}

#[async_trait]
impl HealthCheckable for PostgresApplicationStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy(ADAPTER_ID, latency_ms),
            Err(e) => {
                HealthCheckResult::unhealthy(ADAPTER_ID, latency_ms, format!("Database error: {}", e))
            }
        }
    }
}

#[async_trait]
impl ApplicationStore for PostgresApplicationStore {
    #[instrument(skip(self, application, metadata), fields(application_id = %application.application_id()))]
    async fn save(
        &self,
        application: &Application,
        metadata: Option<OperationMetadata>,
    ) -> Result<Application, PortError> {
        let row = application_to_row(application)?;
        let history = history_entries(application.history(), 0, metadata.as_ref())?;

        match self.repository.insert(&row, &history).await {
            Ok(()) => {
                debug!("Application inserted");
                Ok(application.clone())
            }
            Err(DatabaseError::DuplicateEntry { constraint, message }) => {
                warn!(?constraint, "Unique constraint rejected application");
                Err(duplicate_to_port_error(constraint.as_deref(), message, application))
            }
            Err(e) => Err(db_to_port_error(e)),
        }
    }

    #[instrument(skip(self))]
    async fn find_by_application_id(
        &self,
        id: ApplicationId,
    ) -> Result<Option<Application>, PortError> {
        let row = self
            .repository
            .get_by_id(*id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        self.hydrate_one(row).await
    }

    async fn find_by_tax_registration_number(
        &self,
        gst_number: &str,
    ) -> Result<Option<Application>, PortError> {
        let row = self
            .repository
            .find_by_gst_number(gst_number)
            .await
            .map_err(db_to_port_error)?;
        self.hydrate_one(row).await
    }

    async fn find_by_tax_id(&self, pan_number: &str) -> Result<Option<Application>, PortError> {
        let row = self
            .repository
            .find_by_pan_number(pan_number)
            .await
            .map_err(db_to_port_error)?;
        self.hydrate_one(row).await
    }

    async fn exists_by_tax_registration_number(&self, gst_number: &str) -> Result<bool, PortError> {
        self.repository
            .exists_by_gst_number(gst_number)
            .await
            .map_err(db_to_port_error)
    }

    async fn exists_by_tax_id(&self, pan_number: &str) -> Result<bool, PortError> {
        self.repository
            .exists_by_pan_number(pan_number)
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self))]
    async fn find_by_status(
        &self,
        status: ApplicationStatus,
    ) -> Result<Vec<Application>, PortError> {
        let rows = self
            .repository
            .find_by_status(status_to_db(status))
            .await
            .map_err(db_to_port_error)?;
        debug!(count = rows.len(), "Loaded review queue");
        self.hydrate(rows).await
    }

    #[instrument(skip(self, application, metadata), fields(application_id = %application.application_id(), to = %application.status()))]
    async fn update_if_status(
        &self,
        application: &Application,
        expected: ApplicationStatus,
        metadata: Option<OperationMetadata>,
    ) -> Result<bool, PortError> {
        let row = application_to_row(application)?;
        let history = history_entries(application.history(), 0, metadata.as_ref())?;

        let applied = self
            .repository
            .update_lifecycle_if_status(&row, status_to_db(expected), &history)
            .await
            .map_err(db_to_port_error)?;

        if !applied {
            debug!(%expected, version = application.version(), "Stored status or version no longer matches");
        }
        Ok(applied)
    }

    #[instrument(
        skip(self, application, metadata),
        fields(
            application_id = %application.application_id(),
            correlation_id = metadata.as_ref().and_then(|m| m.correlation_id.as_deref()),
        )
    )]
    async fn update_documents(
        &self,
        application: &Application,
        expected: ApplicationStatus,
        metadata: Option<OperationMetadata>,
    ) -> Result<bool, PortError> {
        let documents = to_json(application.documents())?;
        let applied = self
            .repository
            .update_documents_if_status(
                *application.application_id().as_uuid(),
                status_to_db(expected),
                application.version(),
                &documents,
                application.updated_at(),
            )
            .await
            .map_err(db_to_port_error)?;

        if applied {
            debug!("Document URLs replaced");
        } else {
            debug!(%expected, version = application.version(), "Stored status or version no longer matches");
        }
        Ok(applied)
    }
}

/// Converts a domain status to the database enum
fn status_to_db(status: ApplicationStatus) -> DbApplicationStatus {
    match status {
        ApplicationStatus::Submitted => DbApplicationStatus::Submitted,
        ApplicationStatus::UnderReview => DbApplicationStatus::UnderReview,
        ApplicationStatus::PendingDocuments => DbApplicationStatus::PendingDocuments,
        ApplicationStatus::Approved => DbApplicationStatus::Approved,
        ApplicationStatus::Rejected => DbApplicationStatus::Rejected,
    }
}

/// Converts a database status to the domain enum
fn status_from_db(status: DbApplicationStatus) -> ApplicationStatus {
    match status {
        DbApplicationStatus::Submitted => ApplicationStatus::Submitted,
        DbApplicationStatus::UnderReview => ApplicationStatus::UnderReview,
        DbApplicationStatus::PendingDocuments => ApplicationStatus::PendingDocuments,
        DbApplicationStatus::Approved => ApplicationStatus::Approved,
        DbApplicationStatus::Rejected => ApplicationStatus::Rejected,
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, PortError> {
    serde_json::to_value(value).map_err(|e| db_to_port_error(e.into()))
}

fn from_json<T: DeserializeOwned>(column: &str, value: serde_json::Value) -> Result<T, PortError> {
    serde_json::from_value(value).map_err(|e| PortError::Internal {
        message: format!("corrupt {} column: {}", column, e),
        source: Some(Box::new(e)),
    })
}

fn application_to_row(application: &Application) -> Result<ApplicationRow, PortError> {
    Ok(ApplicationRow {
        application_id: *application.application_id().as_uuid(),
        company_id: *application.company_id().as_uuid(),
        gst_number: application.gst_number().to_string(),
        pan_number: application.pan_number().to_string(),
        legal_name: application.company.legal_name.clone(),
        contact_email: application.contact.email.clone(),
        company: to_json(&application.company)?,
        address: to_json(&application.address)?,
        contact: to_json(&application.contact)?,
        banking: to_json(&application.banking)?,
        documents: to_json(application.documents())?,
        status: status_to_db(application.status()),
        submitted_at: application.submitted_at(),
        reviewed_at: application.reviewed_at(),
        documents_requested_at: application.documents_requested_at(),
        approved_at: application.approved_at(),
        rejected_at: application.rejected_at(),
        rejection_reason: application.rejection_reason().map(str::to_string),
        reviewed_by: application.reviewed_by().map(str::to_string),
        created_at: application.created_at(),
        updated_at: application.updated_at(),
        version: application.version(),
    })
}

/// History rows for every change from position `start` on
fn history_entries(
    history: &[StatusChange],
    start: usize,
    metadata: Option<&OperationMetadata>,
) -> Result<Vec<NewStatusHistory>, PortError> {
    let correlation_id = metadata.and_then(|m| m.correlation_id.clone());
    history
        .iter()
        .enumerate()
        .skip(start)
        .map(|(seq, change)| {
            Ok(NewStatusHistory {
                seq: seq as i32,
                from_status: change.from.map(status_to_db),
                to_status: status_to_db(change.to),
                actor: change.actor.clone(),
                reason: change.reason.clone(),
                requested_documents: to_json(&change.requested_documents)?,
                correlation_id: correlation_id.clone(),
                changed_at: change.at,
            })
        })
        .collect()
}

fn row_to_status_change(row: StatusHistoryRow) -> Result<StatusChange, PortError> {
    Ok(StatusChange {
        from: row.from_status.map(status_from_db),
        to: status_from_db(row.to_status),
        actor: row.actor,
        reason: row.reason,
        requested_documents: from_json("requested_documents", row.requested_documents)?,
        at: row.changed_at,
    })
}

/// Rebuilds a domain application from its row and ordered history
fn row_to_application(
    row: ApplicationRow,
    history: Vec<StatusHistoryRow>,
) -> Result<Application, PortError> {
    let history = history
        .into_iter()
        .map(row_to_status_change)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Application::from_parts(ApplicationParts {
        application_id: ApplicationId::from_uuid(row.application_id),
        company_id: CompanyId::from_uuid(row.company_id),
        company: from_json("company", row.company)?,
        address: from_json("address", row.address)?,
        contact: from_json("contact", row.contact)?,
        banking: from_json("banking", row.banking)?,
        documents: from_json("documents", row.documents)?,
        status: status_from_db(row.status),
        submitted_at: row.submitted_at,
        reviewed_at: row.reviewed_at,
        documents_requested_at: row.documents_requested_at,
        approved_at: row.approved_at,
        rejected_at: row.rejected_at,
        rejection_reason: row.rejection_reason,
        reviewed_by: row.reviewed_by,
        history,
        created_at: row.created_at,
        updated_at: row.updated_at,
        version: row.version,
    }))
}

/// Maps a unique violation on insert to the logical key that collided
fn duplicate_to_port_error(
    constraint: Option<&str>,
    message: String,
    application: &Application,
) -> PortError {
    match constraint {
        Some(GST_NUMBER_CONSTRAINT) => PortError::duplicate_key(
            IdentifierField::TaxRegistrationNumber.key(),
            application.gst_number(),
        ),
        Some(PAN_NUMBER_CONSTRAINT) => {
            PortError::duplicate_key(IdentifierField::TaxId.key(), application.pan_number())
        }
        _ => PortError::Conflict { message },
    }
}

/// Converts database errors to port errors
fn db_to_port_error(e: DatabaseError) -> PortError {
    match e {
        DatabaseError::NotFound(msg) => PortError::not_found("Application", msg),
        DatabaseError::DuplicateEntry { message, .. } => PortError::Conflict { message },
        DatabaseError::ConnectionFailed(msg) => PortError::connection(msg),
        DatabaseError::PoolExhausted => PortError::connection("connection pool exhausted"),
        DatabaseError::ConstraintViolation(msg) => PortError::validation(msg),
        other => PortError::Internal {
            message: other.to_string(),
            source: Some(Box::new(other)),
        },
    }
}
