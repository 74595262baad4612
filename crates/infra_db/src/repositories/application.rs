//! Onboarding application repository
//!
//! Database access for `company_onboarding` and its append-only
//! `onboarding_status_history`. Updates are compare-and-set on the stored
//! status and version, so a writer holding a stale copy changes nothing even
//! when the status has returned to the value it read.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::DatabaseError;

const APPLICATION_COLUMNS: &str = r#"
    application_id, company_id, gst_number, pan_number, legal_name, contact_email,
    company, address, contact, banking, documents,
    status, submitted_at, reviewed_at, documents_requested_at, approved_at,
    rejected_at, rejection_reason, reviewed_by, created_at, updated_at, version
"#;

const HISTORY_COLUMNS: &str = r#"
    application_id, seq, from_status, to_status, actor, reason,
    requested_documents, correlation_id, changed_at
"#;

fn select_applications(filter: &str) -> String {
    format!("SELECT {} FROM company_onboarding {}", APPLICATION_COLUMNS, filter)
}

/// Repository for onboarding applications
#[derive(Debug, Clone)]
pub struct ApplicationRepository {
    pool: PgPool,
}

impl ApplicationRepository {
    /// Creates a new ApplicationRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts an application together with its initial history
    ///
    /// A second application with the same GST number, PAN or company id is
    /// rejected by the unique constraints and surfaces as
    /// [`DatabaseError::DuplicateEntry`] carrying the constraint name.
    pub async fn insert(
        &self,
        row: &ApplicationRow,
        history: &[NewStatusHistory],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO company_onboarding (
                application_id, company_id, gst_number, pan_number, legal_name, contact_email,
                company, address, contact, banking, documents,
                status, submitted_at, reviewed_at, documents_requested_at, approved_at,
                rejected_at, rejection_reason, reviewed_by, created_at, updated_at, version
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22
            )
            "#,
        )
        .bind(row.application_id)
        .bind(row.company_id)
        .bind(&row.gst_number)
        .bind(&row.pan_number)
        .bind(&row.legal_name)
        .bind(&row.contact_email)
        .bind(&row.company)
        .bind(&row.address)
        .bind(&row.contact)
        .bind(&row.banking)
        .bind(&row.documents)
        .bind(row.status)
        .bind(row.submitted_at)
        .bind(row.reviewed_at)
        .bind(row.documents_requested_at)
        .bind(row.approved_at)
        .bind(row.rejected_at)
        .bind(&row.rejection_reason)
        .bind(&row.reviewed_by)
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(row.version)
        .execute(&mut *tx)
        .await?;

        Self::insert_history(&mut tx, row.application_id, history, 0).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Retrieves an application by its identifier
    pub async fn get_by_id(&self, application_id: Uuid) -> Result<Option<ApplicationRow>, DatabaseError> {
        let sql = select_applications("WHERE application_id = $1");
        let row = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(application_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Retrieves the application holding a GST number
    pub async fn find_by_gst_number(&self, gst_number: &str) -> Result<Option<ApplicationRow>, DatabaseError> {
        let sql = select_applications("WHERE gst_number = $1");
        let row = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(gst_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Retrieves the application holding a PAN
    pub async fn find_by_pan_number(&self, pan_number: &str) -> Result<Option<ApplicationRow>, DatabaseError> {
        let sql = select_applications("WHERE pan_number = $1");
        let row = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(pan_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn exists_by_gst_number(&self, gst_number: &str) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM company_onboarding WHERE gst_number = $1)",
        )
        .bind(gst_number)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn exists_by_pan_number(&self, pan_number: &str) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM company_onboarding WHERE pan_number = $1)",
        )
        .bind(pan_number)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Applications in one status, oldest submission first
    pub async fn find_by_status(
        &self,
        status: ApplicationStatus,
    ) -> Result<Vec<ApplicationRow>, DatabaseError> {
        let sql = select_applications("WHERE status = $1 ORDER BY submitted_at ASC, application_id ASC");
        let rows = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Status history of several applications, ordered by sequence number
    pub async fn history_for(
        &self,
        application_ids: &[Uuid],
    ) -> Result<Vec<StatusHistoryRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM onboarding_status_history WHERE application_id = ANY($1) ORDER BY application_id, seq",
            HISTORY_COLUMNS
        );
        let rows = sqlx::query_as::<_, StatusHistoryRow>(&sql)
            .bind(application_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Writes the lifecycle columns if the stored status equals `expected`
    /// and the stored version equals `row.version`, then bumps the version
    ///
    /// The history rows past the stored tail are appended in the same
    /// transaction. Returns `false` without writing anything when another
    /// write got there first.
    pub async fn update_lifecycle_if_status(
        &self,
        row: &ApplicationRow,
        expected: ApplicationStatus,
        history: &[NewStatusHistory],
    ) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE company_onboarding
            SET status = $3,
                documents = $4,
                reviewed_at = $5,
                documents_requested_at = $6,
                approved_at = $7,
                rejected_at = $8,
                rejection_reason = $9,
                reviewed_by = $10,
                updated_at = $11,
                version = version + 1
            WHERE application_id = $1 AND status = $2 AND version = $12
            "#,
        )
        .bind(row.application_id)
        .bind(expected)
        .bind(row.status)
        .bind(&row.documents)
        .bind(row.reviewed_at)
        .bind(row.documents_requested_at)
        .bind(row.approved_at)
        .bind(row.rejected_at)
        .bind(&row.rejection_reason)
        .bind(&row.reviewed_by)
        .bind(row.updated_at)
        .bind(row.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        // The row lock taken by the update keeps the tail stable
        let next_seq = sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM onboarding_status_history WHERE application_id = $1",
        )
        .bind(row.application_id)
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_history(&mut tx, row.application_id, history, next_seq).await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Replaces the document URLs if the stored status equals `expected` and
    /// the stored version equals `expected_version`, then bumps the version
    pub async fn update_documents_if_status(
        &self,
        application_id: Uuid,
        expected: ApplicationStatus,
        expected_version: i64,
        documents: &serde_json::Value,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE company_onboarding
            SET documents = $4, updated_at = $5, version = version + 1
            WHERE application_id = $1 AND status = $2 AND version = $3
            "#,
        )
        .bind(application_id)
        .bind(expected)
        .bind(expected_version)
        .bind(documents)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Inserts the entries numbered `from_seq` and later
    ///
    /// A sequence number that is already taken fails the transaction.
    async fn insert_history(
        tx: &mut Transaction<'_, Postgres>,
        application_id: Uuid,
        history: &[NewStatusHistory],
        from_seq: i32,
    ) -> Result<(), DatabaseError> {
        for entry in history.iter().filter(|entry| entry.seq >= from_seq) {
            sqlx::query(
                r#"
                INSERT INTO onboarding_status_history (
                    application_id, seq, from_status, to_status, actor, reason,
                    requested_documents, correlation_id, changed_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(application_id)
            .bind(entry.seq)
            .bind(entry.from_status)
            .bind(entry.to_status)
            .bind(&entry.actor)
            .bind(&entry.reason)
            .bind(&entry.requested_documents)
            .bind(&entry.correlation_id)
            .bind(entry.changed_at)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

/// Application status as stored in the `application_status` enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "application_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    PendingDocuments,
    Approved,
    Rejected,
}

/// Database row for an application
///
/// The validated sections and the document URLs are JSONB columns written
/// from the domain types.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApplicationRow {
    pub application_id: Uuid,
    pub company_id: Uuid,
    pub gst_number: String,
    pub pan_number: String,
    pub legal_name: String,
    pub contact_email: String,
    pub company: serde_json::Value,
    pub address: serde_json::Value,
    pub contact: serde_json::Value,
    pub banking: serde_json::Value,
    pub documents: serde_json::Value,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub documents_requested_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Version the row holds; for an update, the version the writer read
    pub version: i64,
}

/// Database row for one status history entry
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatusHistoryRow {
    pub application_id: Uuid,
    pub seq: i32,
    pub from_status: Option<ApplicationStatus>,
    pub to_status: ApplicationStatus,
    pub actor: Option<String>,
    pub reason: Option<String>,
    pub requested_documents: serde_json::Value,
    pub correlation_id: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Data for appending a status history entry
#[derive(Debug, Clone)]
pub struct NewStatusHistory {
    /// Zero-based position in the application's history
    pub seq: i32,
    pub from_status: Option<ApplicationStatus>,
    pub to_status: ApplicationStatus,
    pub actor: Option<String>,
    pub reason: Option<String>,
    pub requested_documents: serde_json::Value,
    pub correlation_id: Option<String>,
    pub changed_at: DateTime<Utc>,
}
