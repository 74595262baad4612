//! Onboarding Domain Ports
//!
//! The service depends on these traits only. Adapters live in `infra_db`
//! (PostgreSQL) and in [`crate::adapters`] (local files, logging, format-only
//! bank checks).
//!
//! # Usage
//!
//! ```rust,ignore
//! let service = OnboardingService::new(
//!     Arc::new(PostgresApplicationStore::new(pool)),
//!     Arc::new(LocalFileStore::new(upload_dir, public_base_url)),
//!     Arc::new(LoggingNotifier::new()),
//!     Arc::new(FormatOnlyBankVerifier::new()),
//! );
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{ApplicationId, DomainPort, HealthCheckable, OperationMetadata, PortError};

use crate::application::Application;
use crate::documents::DocumentUpload;
use crate::lifecycle::ApplicationStatus;

/// Persistence of applications
///
/// Implementations must enforce uniqueness of the tax registration number
/// and the tax ID atomically with the write, reporting a rejected value as
/// [`PortError::DuplicateKey`] with key `tax_registration_number` or
/// `tax_id`.
#[async_trait]
pub trait ApplicationStore: DomainPort + HealthCheckable {
    /// Inserts a new application
    async fn save(
        &self,
        application: &Application,
        metadata: Option<OperationMetadata>,
    ) -> Result<Application, PortError>;

    async fn find_by_application_id(
        &self,
        id: ApplicationId,
    ) -> Result<Option<Application>, PortError>;

    async fn find_by_tax_registration_number(
        &self,
        gst_number: &str,
    ) -> Result<Option<Application>, PortError>;

    async fn find_by_tax_id(&self, pan_number: &str) -> Result<Option<Application>, PortError>;

    async fn exists_by_tax_registration_number(&self, gst_number: &str) -> Result<bool, PortError>;

    async fn exists_by_tax_id(&self, pan_number: &str) -> Result<bool, PortError>;

    /// Applications in `status`, oldest submission first
    async fn find_by_status(
        &self,
        status: ApplicationStatus,
    ) -> Result<Vec<Application>, PortError>;

    /// Writes lifecycle fields, document URLs and new history entries if the
    /// stored status still equals `expected` and the stored version still
    /// equals [`Application::version`]
    ///
    /// An accepted write stores `version + 1`. Returns `false` without
    /// writing when anything was stored after the caller's read, even if the
    /// status has since come back to `expected`.
    async fn update_if_status(
        &self,
        application: &Application,
        expected: ApplicationStatus,
        metadata: Option<OperationMetadata>,
    ) -> Result<bool, PortError>;

    /// Writes document URLs under the same status and version condition as
    /// [`ApplicationStore::update_if_status`]
    async fn update_documents(
        &self,
        application: &Application,
        expected: ApplicationStatus,
        metadata: Option<OperationMetadata>,
    ) -> Result<bool, PortError>;
}

/// Durable storage for document content
#[async_trait]
pub trait FileTransfer: DomainPort {
    /// Stores the content and returns the URL it can be fetched from
    async fn store(&self, upload: &DocumentUpload) -> Result<String, PortError>;
}

/// Told about every accepted submission
#[async_trait]
pub trait SubmissionNotifier: DomainPort {
    async fn notify_submission(&self, application: &Application) -> Result<(), PortError>;
}

/// Outcome of a bank account check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "reason", rename_all = "camelCase")]
pub enum BankVerification {
    /// The bank confirmed the account
    Verified,
    /// The account was rejected
    Rejected(String),
    /// Well formed, but nobody confirmed it
    Unverified,
}

/// Confirms a bank account against its routing code
#[async_trait]
pub trait BankAccountVerifier: DomainPort {
    async fn verify(
        &self,
        account_number: &str,
        ifsc_code: &str,
    ) -> Result<BankVerification, PortError>;
}

/// In-memory port implementations for tests
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;

    const MOCK_STORE_ID: &str = "in-memory-application-store";

    /// In-memory application store
    ///
    /// Uniqueness is checked under the write lock, so concurrent saves of
    /// the same identifier admit exactly one.
    #[derive(Debug, Default)]
    pub struct InMemoryApplicationStore {
        applications: Arc<RwLock<HashMap<ApplicationId, Application>>>,
        stale_existence_checks: bool,
        unavailable: AtomicBool,
    }

    impl InMemoryApplicationStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// A store whose `exists_*` queries always answer `false`, as if
        /// reading before a concurrent writer committed
        pub fn with_stale_existence_checks() -> Self {
            Self {
                stale_existence_checks: true,
                ..Self::default()
            }
        }

        /// Pre-populates with applications for testing
        pub async fn with_applications(applications: Vec<Application>) -> Self {
            let store = Self::new();
            {
                let mut stored = store.applications.write().await;
                for application in applications {
                    stored.insert(application.application_id(), application);
                }
            }
            store
        }

        /// Makes every call fail with a connection error
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        pub async fn len(&self) -> usize {
            self.applications.read().await.len()
        }

        pub async fn is_empty(&self) -> bool {
            self.applications.read().await.is_empty()
        }

        /// Overwrites a stored application without any checks
        pub async fn put(&self, application: Application) {
            self.applications
                .write()
                .await
                .insert(application.application_id(), application);
        }

        fn check_available(&self) -> Result<(), PortError> {
            if self.unavailable.load(Ordering::SeqCst) {
                Err(PortError::connection("in-memory store marked unavailable"))
            } else {
                Ok(())
            }
        }
    }

    impl DomainPort for InMemoryApplicationStore {}

    fn is_current(stored: &Application, loaded: &Application, expected: ApplicationStatus) -> bool {
        stored.status() == expected && stored.version() == loaded.version()
    }

    #[async_trait]
    impl HealthCheckable for InMemoryApplicationStore {
        async fn health_check(&self) -> HealthCheckResult {
            if self.unavailable.load(Ordering::SeqCst) {
                HealthCheckResult::unhealthy(MOCK_STORE_ID, 0, "marked unavailable")
            } else {
                HealthCheckResult::healthy(MOCK_STORE_ID, 0)
            }
        }
    }

    #[async_trait]
    impl ApplicationStore for InMemoryApplicationStore {
        async fn save(
            &self,
            application: &Application,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Application, PortError> {
            self.check_available()?;
            let mut applications = self.applications.write().await;

            if applications.contains_key(&application.application_id()) {
                return Err(PortError::duplicate_key(
                    "application_id",
                    application.application_id().to_string(),
                ));
            }
            for existing in applications.values() {
                if existing.gst_number() == application.gst_number() {
                    return Err(PortError::duplicate_key(
                        "tax_registration_number",
                        application.gst_number(),
                    ));
                }
                if existing.pan_number() == application.pan_number() {
                    return Err(PortError::duplicate_key("tax_id", application.pan_number()));
                }
            }

            applications.insert(application.application_id(), application.clone());
            Ok(application.clone())
        }

        async fn find_by_application_id(
            &self,
            id: ApplicationId,
        ) -> Result<Option<Application>, PortError> {
            self.check_available()?;
            Ok(self.applications.read().await.get(&id).cloned())
        }

        async fn find_by_tax_registration_number(
            &self,
            gst_number: &str,
        ) -> Result<Option<Application>, PortError> {
            self.check_available()?;
            Ok(self
                .applications
                .read()
                .await
                .values()
                .find(|a| a.gst_number() == gst_number)
                .cloned())
        }

        async fn find_by_tax_id(&self, pan_number: &str) -> Result<Option<Application>, PortError> {
            self.check_available()?;
            Ok(self
                .applications
                .read()
                .await
                .values()
                .find(|a| a.pan_number() == pan_number)
                .cloned())
        }

        async fn exists_by_tax_registration_number(&self, gst_number: &str) -> Result<bool, PortError> {
            if self.stale_existence_checks {
                self.check_available()?;
                return Ok(false);
            }
            Ok(self.find_by_tax_registration_number(gst_number).await?.is_some())
        }

        async fn exists_by_tax_id(&self, pan_number: &str) -> Result<bool, PortError> {
            if self.stale_existence_checks {
                self.check_available()?;
                return Ok(false);
            }
            Ok(self.find_by_tax_id(pan_number).await?.is_some())
        }

        async fn find_by_status(
            &self,
            status: ApplicationStatus,
        ) -> Result<Vec<Application>, PortError> {
            self.check_available()?;
            let mut matching: Vec<_> = self
                .applications
                .read()
                .await
                .values()
                .filter(|a| a.status() == status)
                .cloned()
                .collect();
            matching.sort_by_key(|a| (a.submitted_at(), a.application_id()));
            Ok(matching)
        }

        async fn update_if_status(
            &self,
            application: &Application,
            expected: ApplicationStatus,
            _metadata: Option<OperationMetadata>,
        ) -> Result<bool, PortError> {
            self.check_available()?;
            let mut applications = self.applications.write().await;
            match applications.get_mut(&application.application_id()) {
                Some(stored) if is_current(stored, application, expected) => {
                    *stored = application.clone();
                    stored.version = application.version() + 1;
                    Ok(true)
                }
                Some(_) => Ok(false),
                None => Err(PortError::not_found("Application", application.application_id())),
            }
        }

        async fn update_documents(
            &self,
            application: &Application,
            expected: ApplicationStatus,
            _metadata: Option<OperationMetadata>,
        ) -> Result<bool, PortError> {
            self.check_available()?;
            let mut applications = self.applications.write().await;
            match applications.get_mut(&application.application_id()) {
                Some(stored) if is_current(stored, application, expected) => {
                    stored.documents = application.documents().clone();
                    stored.updated_at = application.updated_at();
                    stored.version += 1;
                    Ok(true)
                }
                Some(_) => Ok(false),
                None => Err(PortError::not_found("Application", application.application_id())),
            }
        }
    }

    /// File transfer that keeps uploads in memory
    #[derive(Debug, Default)]
    pub struct RecordingFileTransfer {
        uploads: Mutex<Vec<DocumentUpload>>,
        failing: bool,
    }

    impl RecordingFileTransfer {
        pub fn new() -> Self {
            Self::default()
        }

        /// A transfer whose every store call fails
        pub fn failing() -> Self {
            Self {
                failing: true,
                ..Self::default()
            }
        }

        pub fn uploads(&self) -> Vec<DocumentUpload> {
            self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
        }

        pub fn upload_count(&self) -> usize {
            self.uploads.lock().map(|u| u.len()).unwrap_or_default()
        }
    }

    impl DomainPort for RecordingFileTransfer {}

    #[async_trait]
    impl FileTransfer for RecordingFileTransfer {
        async fn store(&self, upload: &DocumentUpload) -> Result<String, PortError> {
            if self.failing {
                return Err(PortError::ServiceUnavailable {
                    service: "file-transfer".to_string(),
                });
            }
            let mut uploads = self
                .uploads
                .lock()
                .map_err(|_| PortError::internal("upload log poisoned"))?;
            uploads.push(upload.clone());
            Ok(format!(
                "memory://{}/{}-{}",
                upload.category.slug(),
                uploads.len(),
                upload.file_name
            ))
        }
    }

    /// Notifier that records the applications it was told about
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        notified: Mutex<Vec<ApplicationId>>,
        failing: bool,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        /// A notifier whose every call fails
        pub fn failing() -> Self {
            Self {
                failing: true,
                ..Self::default()
            }
        }

        pub fn notified(&self) -> Vec<ApplicationId> {
            self.notified.lock().map(|n| n.clone()).unwrap_or_default()
        }
    }

    impl DomainPort for RecordingNotifier {}

    #[async_trait]
    impl SubmissionNotifier for RecordingNotifier {
        async fn notify_submission(&self, application: &Application) -> Result<(), PortError> {
            if self.failing {
                return Err(PortError::connection("mail relay refused connection"));
            }
            self.notified
                .lock()
                .map_err(|_| PortError::internal("notification log poisoned"))?
                .push(application.application_id());
            Ok(())
        }
    }

    /// Bank verifier returning a fixed answer
    #[derive(Debug, Clone)]
    pub struct StaticBankVerifier {
        answer: BankVerification,
    }

    impl StaticBankVerifier {
        pub fn new(answer: BankVerification) -> Self {
            Self { answer }
        }
    }

    impl DomainPort for StaticBankVerifier {}

    #[async_trait]
    impl BankAccountVerifier for StaticBankVerifier {
        async fn verify(
            &self,
            _account_number: &str,
            _ifsc_code: &str,
        ) -> Result<BankVerification, PortError> {
            Ok(self.answer.clone())
        }
    }
}
