//! Test Data Builders
//!
//! Builders for payloads, stored applications and a fully wired service over
//! the in-memory ports. Tests specify only what they care about.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::sync::Arc;

use core_kernel::{ApplicationId, CompanyId};
use domain_onboarding::ports::mock::{
    InMemoryApplicationStore, RecordingFileTransfer, RecordingNotifier, StaticBankVerifier,
};
use domain_onboarding::{
    Application, ApplicationPayload, ApplicationStatus, ApplicationValidator, BankVerification,
    DocumentCategory, DocumentUrls, FileUploadPayload, OnboardingService, TransitionRequest,
};

use crate::fixtures::{IdentifierFixtures, PayloadFixtures, ReviewerFixtures, TemporalFixtures};

/// Builder for raw submissions
///
/// Fields are addressed by their dotted wire path, the same path validation
/// reports violations under.
#[derive(Debug, Clone)]
pub struct ApplicationPayloadBuilder {
    payload: Value,
}

impl Default for ApplicationPayloadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationPayloadBuilder {
    /// Starts from a payload that passes every rule
    pub fn new() -> Self {
        Self::from_payload(&PayloadFixtures::valid())
    }

    pub fn from_payload(payload: &ApplicationPayload) -> Self {
        Self {
            payload: serde_json::to_value(payload).expect("payload serializes"),
        }
    }

    pub fn with_identifiers(self, gst_number: &str, pan_number: &str) -> Self {
        self.set("companyRegistration.gstNumber", gst_number)
            .set("companyRegistration.panNumber", pan_number)
    }

    /// Sets one field, creating its section if needed
    pub fn set(mut self, path: &str, value: impl Into<String>) -> Self {
        let (section, field) = split_path(path);
        let slot = &mut self.payload[section];
        if !slot.is_object() {
            *slot = Value::Object(Default::default());
        }
        slot[field] = Value::String(value.into());
        self
    }

    /// Removes one field, or a whole section when `path` has no dot
    pub fn without(mut self, path: &str) -> Self {
        match path.split_once('.') {
            Some((section, field)) => {
                if let Some(object) = self.payload[section].as_object_mut() {
                    object.remove(field);
                }
            }
            None => {
                if let Some(object) = self.payload.as_object_mut() {
                    object.remove(path);
                }
            }
        }
        self
    }

    /// Replaces or clears one document slot
    pub fn with_document(mut self, category: DocumentCategory, file: Option<FileUploadPayload>) -> Self {
        let slot = match file {
            Some(file) => serde_json::to_value(file).expect("document serializes"),
            None => Value::Null,
        };
        let documents = &mut self.payload["documents"];
        if !documents.is_object() {
            *documents = Value::Object(Default::default());
        }
        documents[category.as_str()] = slot;
        self
    }

    pub fn build(self) -> ApplicationPayload {
        serde_json::from_value(self.payload).expect("payload deserializes")
    }
}

fn split_path(path: &str) -> (&str, &str) {
    path.split_once('.')
        .unwrap_or_else(|| panic!("field path needs a section: {}", path))
}

/// Builder for applications as the store would hold them
#[derive(Debug, Clone)]
pub struct ApplicationBuilder {
    payload: ApplicationPayload,
    status: ApplicationStatus,
    submitted_at: DateTime<Utc>,
    step: Duration,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationBuilder {
    pub fn new() -> Self {
        Self {
            payload: PayloadFixtures::valid(),
            status: ApplicationStatus::Submitted,
            submitted_at: TemporalFixtures::submitted_at(),
            step: Duration::hours(1),
        }
    }

    pub fn with_identifiers(mut self, gst_number: &str, pan_number: &str) -> Self {
        self.payload = PayloadFixtures::with_identifiers(gst_number, pan_number);
        self
    }

    /// Uses the `n`th distinct identifier pair
    pub fn numbered(self, n: u16) -> Self {
        let (gst_number, pan_number) = IdentifierFixtures::pair(n);
        self.with_identifiers(&gst_number, &pan_number)
    }

    pub fn submitted_at(mut self, at: DateTime<Utc>) -> Self {
        self.submitted_at = at;
        self
    }

    /// Drives the application to `status` through legal transitions, one
    /// hour apart
    pub fn in_status(mut self, status: ApplicationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> Application {
        let validated = ApplicationValidator::validate(&self.payload)
            .expect("builder payload validates");
        let mut urls = DocumentUrls::default();
        for category in DocumentCategory::ALL {
            urls.set(category, Some(format!("https://files.example/{}.pdf", category.slug())));
        }

        let mut application = Application::submitted(
            ApplicationId::new(),
            CompanyId::new(),
            validated.sections,
            urls,
            self.submitted_at,
        );

        let mut at = self.submitted_at;
        for target in path_to(self.status) {
            at += self.step;
            let mut request = TransitionRequest::new(target, ReviewerFixtures::reviewer());
            if target == ApplicationStatus::Rejected {
                request = request.with_reason(ReviewerFixtures::rejection_reason());
            }
            application
                .apply_transition(&request, at)
                .expect("builder path is legal");
        }
        application
    }
}

/// Legal route from SUBMITTED to `status`
fn path_to(status: ApplicationStatus) -> Vec<ApplicationStatus> {
    use ApplicationStatus::*;
    match status {
        Submitted => vec![],
        UnderReview => vec![UnderReview],
        PendingDocuments => vec![UnderReview, PendingDocuments],
        Approved => vec![UnderReview, Approved],
        Rejected => vec![UnderReview, Rejected],
    }
}

/// A service wired to in-memory ports, with handles on every double
pub struct ServiceHarness {
    pub service: OnboardingService,
    pub store: Arc<InMemoryApplicationStore>,
    pub files: Arc<RecordingFileTransfer>,
    pub notifier: Arc<RecordingNotifier>,
}

/// Builder for [`ServiceHarness`]
pub struct ServiceHarnessBuilder {
    store: InMemoryApplicationStore,
    files: RecordingFileTransfer,
    notifier: RecordingNotifier,
    bank_answer: BankVerification,
}

impl Default for ServiceHarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceHarnessBuilder {
    pub fn new() -> Self {
        Self {
            store: InMemoryApplicationStore::new(),
            files: RecordingFileTransfer::new(),
            notifier: RecordingNotifier::new(),
            bank_answer: BankVerification::Unverified,
        }
    }

    pub fn with_store(mut self, store: InMemoryApplicationStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_failing_files(mut self) -> Self {
        self.files = RecordingFileTransfer::failing();
        self
    }

    pub fn with_failing_notifier(mut self) -> Self {
        self.notifier = RecordingNotifier::failing();
        self
    }

    pub fn with_bank_answer(mut self, answer: BankVerification) -> Self {
        self.bank_answer = answer;
        self
    }

    pub fn build(self) -> ServiceHarness {
        let store = Arc::new(self.store);
        let files = Arc::new(self.files);
        let notifier = Arc::new(self.notifier);
        let service = OnboardingService::new(
            store.clone(),
            files.clone(),
            notifier.clone(),
            Arc::new(StaticBankVerifier::new(self.bank_answer)),
        );
        ServiceHarness {
            service,
            store,
            files,
            notifier,
        }
    }
}
