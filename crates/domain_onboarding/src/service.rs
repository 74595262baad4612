//! Onboarding application service
//!
//! Orchestrates validation, identifier uniqueness, document transfer and the
//! review lifecycle over the domain ports.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use core_kernel::{ApplicationId, OperationMetadata};

use crate::application::{Application, StatusView};
use crate::documents::{DocumentChecker, DocumentSet, DocumentUpload, UploadPolicy};
use crate::error::{IdentifierField, OnboardingError};
use crate::identity::IdentityGuard;
use crate::lifecycle::{ApplicationStatus, TransitionRequest};
use crate::payload::{ApplicationPayload, DocumentsPayload};
use crate::ports::{
    ApplicationStore, BankAccountVerifier, BankVerification, FileTransfer, SubmissionNotifier,
};
use crate::validation::ApplicationValidator;

/// Entry point for every onboarding operation
#[derive(Clone)]
pub struct OnboardingService {
    store: Arc<dyn ApplicationStore>,
    files: Arc<dyn FileTransfer>,
    notifier: Arc<dyn SubmissionNotifier>,
    bank_verifier: Arc<dyn BankAccountVerifier>,
    identity: IdentityGuard,
}

impl OnboardingService {
    pub fn new(
        store: Arc<dyn ApplicationStore>,
        files: Arc<dyn FileTransfer>,
        notifier: Arc<dyn SubmissionNotifier>,
        bank_verifier: Arc<dyn BankAccountVerifier>,
    ) -> Self {
        Self {
            identity: IdentityGuard::new(store.clone()),
            store,
            files,
            notifier,
            bank_verifier,
        }
    }

    /// The store this service writes to
    pub fn store(&self) -> &Arc<dyn ApplicationStore> {
        &self.store
    }

    /// Validates and records a new application
    ///
    /// Order of checks: identifier uniqueness (for well formed identifiers),
    /// field validation, document resolvability, inline uploads, document
    /// completeness, then the save. A notification failure is logged and
    /// does not fail the submission.
    #[instrument(skip(self, payload))]
    pub async fn submit(&self, payload: ApplicationPayload) -> Result<Application, OnboardingError> {
        let (gst_number, pan_number) = ApplicationValidator::present_identifiers(&payload);
        self.identity
            .ensure_unique(gst_number.as_deref(), pan_number.as_deref())
            .await?;

        let validated = ApplicationValidator::validate(&payload)?;

        let unresolvable = DocumentChecker::unresolvable(&validated.documents);
        if !unresolvable.is_empty() {
            return Err(OnboardingError::IncompleteDocuments {
                missing: unresolvable,
            });
        }

        let documents = self.transfer_pending(validated.documents).await?;
        let urls = DocumentChecker::check(&documents)?;

        let (application_id, company_id) = IdentityGuard::assign();
        let application = Application::submitted(
            application_id,
            company_id,
            validated.sections,
            urls,
            Utc::now(),
        );

        let metadata = OperationMetadata::for_operation("submit").by(application.contact.email.clone());
        let stored = self.store.save(&application, Some(metadata)).await?;

        info!(
            application_id = %stored.application_id(),
            company_id = %stored.company_id(),
            "Onboarding application submitted"
        );

        if let Err(err) = self.notifier.notify_submission(&stored).await {
            warn!(
                application_id = %stored.application_id(),
                error = %err,
                "Submission notification failed"
            );
        }

        Ok(stored)
    }

    /// Moves an application through the review lifecycle
    #[instrument(skip(self, request), fields(target = %request.target, actor = %request.actor))]
    pub async fn transition(
        &self,
        application_id: ApplicationId,
        request: TransitionRequest,
    ) -> Result<Application, OnboardingError> {
        let mut application = self.load(application_id).await?;
        let expected = application.status();
        let change = application.apply_transition(&request, Utc::now())?;

        let metadata = OperationMetadata::for_operation("transition").by(request.actor.trim());
        let applied = self
            .store
            .update_if_status(&application, expected, Some(metadata))
            .await?;

        if !applied {
            // Another write landed after our read; its status may equal ours
            let current = self.load(application_id).await?.status();
            debug!(%current, %expected, "Lost status compare-and-set");
            return Err(OnboardingError::InvalidTransition {
                from: current,
                to: request.target,
            });
        }
        application.record_stored_write();

        info!(
            application_id = %application_id,
            from = %expected,
            to = %change.to,
            "Application status changed"
        );
        Ok(application)
    }

    pub async fn get_status(&self, application_id: ApplicationId) -> Result<StatusView, OnboardingError> {
        Ok(self.load(application_id).await?.status_view())
    }

    pub async fn get_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<Application, OnboardingError> {
        self.load(application_id).await
    }

    /// Review queue for one status, oldest submission first
    pub async fn list_by_status(
        &self,
        status: ApplicationStatus,
    ) -> Result<Vec<Application>, OnboardingError> {
        Ok(self.store.find_by_status(status).await?)
    }

    /// True if no application holds this GST number
    pub async fn check_tax_registration_number_available(
        &self,
        gst_number: &str,
    ) -> Result<bool, OnboardingError> {
        let gst_number = ApplicationValidator::check_identifier("gstNumber", gst_number)?;
        self.identity
            .is_available(IdentifierField::TaxRegistrationNumber, &gst_number)
            .await
    }

    /// True if no application holds this PAN
    pub async fn check_tax_id_available(&self, pan_number: &str) -> Result<bool, OnboardingError> {
        let pan_number = ApplicationValidator::check_identifier("panNumber", pan_number)?;
        self.identity
            .is_available(IdentifierField::TaxId, &pan_number)
            .await
    }

    /// Stores one document ahead of submission and returns its URL
    #[instrument(skip(self, upload), fields(category = %upload.category, size = upload.size()))]
    pub async fn upload_document(&self, upload: DocumentUpload) -> Result<String, OnboardingError> {
        UploadPolicy::check(&upload)?;
        let url = self.store_upload(&upload).await?;
        debug!(%url, "Document stored");
        Ok(url)
    }

    /// Replaces documents of an application waiting on the applicant
    #[instrument(skip(self, documents))]
    pub async fn supply_documents(
        &self,
        application_id: ApplicationId,
        documents: DocumentsPayload,
    ) -> Result<Application, OnboardingError> {
        let mut application = self.load(application_id).await?;
        if application.status() != ApplicationStatus::PendingDocuments {
            return Err(OnboardingError::NotAcceptingDocuments {
                status: application.status(),
            });
        }

        let supplied = ApplicationValidator::validate_documents(&documents)?;
        if supplied.is_empty() {
            return Err(OnboardingError::invalid_field(
                "documents",
                "required",
                "At least one document with a fileUrl or base64Data is required",
            ));
        }

        let supplied = self.transfer_pending(supplied).await?;
        let urls: Vec<_> = supplied
            .iter()
            .filter_map(|(category, reference)| reference.url().map(|url| (category, url.to_string())))
            .collect();
        application.replace_documents(urls, Utc::now());

        let applied = self
            .store
            .update_documents(
                &application,
                ApplicationStatus::PendingDocuments,
                Some(OperationMetadata::for_operation("supply_documents")),
            )
            .await?;
        if !applied {
            let current = self.load(application_id).await?.status();
            debug!(%current, "Lost documents compare-and-set");
            return Err(OnboardingError::NotAcceptingDocuments { status: current });
        }
        application.record_stored_write();

        info!(
            application_id = %application_id,
            missing = application.documents().missing().len(),
            "Documents supplied"
        );
        Ok(application)
    }

    /// Checks the account format and asks the verifier about it
    pub async fn verify_bank_account(
        &self,
        account_number: &str,
        ifsc_code: &str,
    ) -> Result<BankVerification, OnboardingError> {
        let (account_number, ifsc_code) =
            ApplicationValidator::check_bank_account(account_number, ifsc_code)?;
        self.bank_verifier
            .verify(&account_number, &ifsc_code)
            .await
            .map_err(|err| OnboardingError::VerifierUnavailable(err.to_string()))
    }

    async fn load(&self, application_id: ApplicationId) -> Result<Application, OnboardingError> {
        self.store
            .find_by_application_id(application_id)
            .await?
            .ok_or_else(|| OnboardingError::NotFound(application_id.to_string()))
    }

    async fn store_upload(&self, upload: &DocumentUpload) -> Result<String, OnboardingError> {
        self.files
            .store(upload)
            .await
            .map_err(|err| OnboardingError::DocumentUploadFailed {
                category: upload.category,
                message: err.to_string(),
            })
    }

    /// Uploads inline content for slots without a URL
    ///
    /// Works on a copy: the caller's application is untouched until every
    /// upload has succeeded.
    async fn transfer_pending(&self, mut documents: DocumentSet) -> Result<DocumentSet, OnboardingError> {
        let pending: Vec<DocumentUpload> = documents.pending_uploads().cloned().collect();
        for upload in pending {
            UploadPolicy::check(&upload)?;
            let url = self.store_upload(&upload).await?;
            if let Some(reference) = documents.get_mut(upload.category) {
                reference.file_url = Some(url);
                reference.upload = None;
            }
        }
        Ok(documents)
    }
}
