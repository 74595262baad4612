//! Tests for domain_onboarding

use std::sync::Arc;

use chrono::{Duration, Utc};
use proptest::prelude::*;

use core_kernel::ApplicationId;

use domain_onboarding::ports::mock::{
    InMemoryApplicationStore, RecordingFileTransfer, RecordingNotifier, StaticBankVerifier,
};
use domain_onboarding::{
    Application, ApplicationPayload, ApplicationStatus, ApplicationStore, ApplicationValidator,
    BankVerification, BankingDetailsPayload, BusinessAddressPayload, CompanyRegistrationPayload,
    ContactPersonPayload, DocumentCategory, DocumentUpload, DocumentUrls, DocumentsPayload,
    FileUploadPayload, IdentifierField, IdentityGuard, OnboardingError, OnboardingService,
    TransitionRequest,
};

// ============================================================================
// Fixtures
// ============================================================================

const GST: &str = "27AAAPL1234C1Z5";
const PAN: &str = "AAAPL1234C";

fn document(category: DocumentCategory) -> FileUploadPayload {
    FileUploadPayload {
        file_name: Some(format!("{}.pdf", category.slug())),
        file_size: Some(4096),
        file_type: Some("application/pdf".to_string()),
        file_url: Some(format!("https://files.example/{}.pdf", category.slug())),
        ..Default::default()
    }
}

fn all_documents() -> DocumentsPayload {
    let mut documents = DocumentsPayload::default();
    for category in DocumentCategory::ALL {
        documents.set(category, Some(document(category)));
    }
    documents
}

fn payload_with(gst_number: &str, pan_number: &str) -> ApplicationPayload {
    ApplicationPayload {
        company_registration: Some(CompanyRegistrationPayload {
            legal_name: Some("Acme Traders Private Limited".to_string()),
            trade_name: Some("Acme Traders".to_string()),
            gst_number: Some(gst_number.to_string()),
            pan_number: Some(pan_number.to_string()),
            incorporation_date: Some("2015-06-01".to_string()),
            business_type: Some("wholesaler".to_string()),
            annual_turnover: Some("25000000".to_string()),
            number_of_employees: Some("51-200".to_string()),
            website: Some("https://acme-traders.example".to_string()),
        }),
        business_address: Some(BusinessAddressPayload {
            address_line1: Some("Plot 7, MIDC Industrial Area".to_string()),
            address_line2: None,
            city: Some("Pune".to_string()),
            state: Some("Maharashtra".to_string()),
            pincode: Some("411019".to_string()),
            country: Some("India".to_string()),
        }),
        contact_person: Some(ContactPersonPayload {
            full_name: Some("Priya Sharma".to_string()),
            designation: Some("Finance Director".to_string()),
            email: Some("priya.sharma@acme.example".to_string()),
            phone: Some("9876543210".to_string()),
            alternate_phone: Some("8765432109".to_string()),
        }),
        banking_details: Some(BankingDetailsPayload {
            bank_name: Some("HDFC Bank".to_string()),
            account_number: Some("50100012345678".to_string()),
            ifsc_code: Some("HDFC0001234".to_string()),
            account_holder_name: Some("Acme Traders Private Limited".to_string()),
            account_type: Some("current".to_string()),
            branch_name: Some("Pimpri".to_string()),
            requested_credit_limit: Some("1000000".to_string()),
        }),
        documents: Some(all_documents()),
    }
}

fn valid_payload() -> ApplicationPayload {
    payload_with(GST, PAN)
}

/// Distinct, well formed identifier pair for index `n`
fn identifiers(n: u16) -> (String, String) {
    (format!("27AAAPL{:04}C1Z5", n), format!("AAAPL{:04}C", n))
}

struct Harness {
    service: OnboardingService,
    store: Arc<InMemoryApplicationStore>,
    files: Arc<RecordingFileTransfer>,
    notifier: Arc<RecordingNotifier>,
}

fn harness_with(
    store: InMemoryApplicationStore,
    files: RecordingFileTransfer,
    notifier: RecordingNotifier,
) -> Harness {
    let store = Arc::new(store);
    let files = Arc::new(files);
    let notifier = Arc::new(notifier);
    let service = OnboardingService::new(
        store.clone(),
        files.clone(),
        notifier.clone(),
        Arc::new(StaticBankVerifier::new(BankVerification::Unverified)),
    );
    Harness {
        service,
        store,
        files,
        notifier,
    }
}

fn harness() -> Harness {
    harness_with(
        InMemoryApplicationStore::new(),
        RecordingFileTransfer::new(),
        RecordingNotifier::new(),
    )
}

fn stored_application(gst_number: &str, pan_number: &str) -> Application {
    let validated = ApplicationValidator::validate(&payload_with(gst_number, pan_number)).unwrap();
    let (application_id, company_id) = IdentityGuard::assign();
    let mut urls = DocumentUrls::default();
    for category in DocumentCategory::ALL {
        urls.set(category, Some(format!("https://files.example/{}", category.slug())));
    }
    Application::submitted(application_id, company_id, validated.sections, urls, Utc::now())
}

async fn move_to(service: &OnboardingService, id: ApplicationId, path: &[ApplicationStatus]) {
    for status in path {
        let mut request = TransitionRequest::new(*status, "reviewer1");
        if *status == ApplicationStatus::Rejected {
            request = request.with_reason("Turnover could not be verified");
        }
        service.transition(id, request).await.unwrap();
    }
}

// ============================================================================
// Submission
// ============================================================================

mod submission_tests {
    use super::*;

    type Mutation = fn(&mut ApplicationPayload);

    fn removal(path: &'static str, remove: Mutation) -> (&'static str, Mutation) {
        (path, remove)
    }

    fn required_field_removals() -> Vec<(&'static str, Mutation)> {
        vec![
            removal("companyRegistration.legalName", |p| {
                p.company_registration.as_mut().unwrap().legal_name = None
            }),
            removal("companyRegistration.tradeName", |p| {
                p.company_registration.as_mut().unwrap().trade_name = Some("  ".to_string())
            }),
            removal("companyRegistration.gstNumber", |p| {
                p.company_registration.as_mut().unwrap().gst_number = None
            }),
            removal("companyRegistration.panNumber", |p| {
                p.company_registration.as_mut().unwrap().pan_number = None
            }),
            removal("companyRegistration.incorporationDate", |p| {
                p.company_registration.as_mut().unwrap().incorporation_date = None
            }),
            removal("companyRegistration.businessType", |p| {
                p.company_registration.as_mut().unwrap().business_type = None
            }),
            removal("companyRegistration.annualTurnover", |p| {
                p.company_registration.as_mut().unwrap().annual_turnover = None
            }),
            removal("companyRegistration.numberOfEmployees", |p| {
                p.company_registration.as_mut().unwrap().number_of_employees = None
            }),
            removal("businessAddress.addressLine1", |p| {
                p.business_address.as_mut().unwrap().address_line1 = None
            }),
            removal("businessAddress.city", |p| p.business_address.as_mut().unwrap().city = None),
            removal("businessAddress.state", |p| p.business_address.as_mut().unwrap().state = None),
            removal("businessAddress.pincode", |p| p.business_address.as_mut().unwrap().pincode = None),
            removal("businessAddress.country", |p| p.business_address.as_mut().unwrap().country = None),
            removal("contactPerson.fullName", |p| p.contact_person.as_mut().unwrap().full_name = None),
            removal("contactPerson.designation", |p| {
                p.contact_person.as_mut().unwrap().designation = None
            }),
            removal("contactPerson.email", |p| p.contact_person.as_mut().unwrap().email = None),
            removal("contactPerson.phone", |p| p.contact_person.as_mut().unwrap().phone = None),
            removal("bankingDetails.bankName", |p| p.banking_details.as_mut().unwrap().bank_name = None),
            removal("bankingDetails.accountNumber", |p| {
                p.banking_details.as_mut().unwrap().account_number = None
            }),
            removal("bankingDetails.ifscCode", |p| p.banking_details.as_mut().unwrap().ifsc_code = None),
            removal("bankingDetails.accountHolderName", |p| {
                p.banking_details.as_mut().unwrap().account_holder_name = None
            }),
            removal("bankingDetails.accountType", |p| {
                p.banking_details.as_mut().unwrap().account_type = None
            }),
            removal("bankingDetails.branchName", |p| {
                p.banking_details.as_mut().unwrap().branch_name = None
            }),
            removal("businessAddress", |p| p.business_address = None),
            removal("documents.panCard.fileType", |p| {
                let mut pan = document(DocumentCategory::PanCard);
                pan.file_type = None;
                p.documents.as_mut().unwrap().set(DocumentCategory::PanCard, Some(pan));
            }),
        ]
    }

    #[tokio::test]
    async fn test_missing_required_field_is_reported_and_nothing_saved() {
        for (path, remove) in required_field_removals() {
            let h = harness();
            let mut payload = valid_payload();
            remove(&mut payload);

            let err = h.service.submit(payload).await.unwrap_err();
            let violations = err.violations().unwrap_or_else(|| panic!("{path}: {err:?}"));
            assert!(violations.contains_field(path), "{path} missing from {violations}");
            assert!(h.store.is_empty().await, "{path} persisted a record");
            assert_eq!(h.files.upload_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_every_violation_is_reported_together() {
        let h = harness();
        let mut payload = valid_payload();
        payload.contact_person.as_mut().unwrap().email = Some("not-an-email".to_string());
        payload.contact_person.as_mut().unwrap().phone = Some("12345".to_string());
        payload.banking_details.as_mut().unwrap().ifsc_code = Some("HDFC1234".to_string());

        let err = h.service.submit(payload).await.unwrap_err();
        let violations = err.violations().unwrap();
        assert_eq!(violations.len(), 3);
        assert!(violations.contains_field("contactPerson.email"));
        assert!(violations.contains_field("contactPerson.phone"));
        assert!(violations.contains_field("bankingDetails.ifscCode"));
    }

    #[tokio::test]
    async fn test_submit_then_get_status_round_trip() {
        let h = harness();
        let started = Utc::now();

        let application = h.service.submit(valid_payload()).await.unwrap();
        let view = h.service.get_status(application.application_id()).await.unwrap();

        assert_eq!(view.status, ApplicationStatus::Submitted);
        assert!(view.submitted_at >= started);
        assert_eq!(view.application_id, application.application_id());
        assert_eq!(view.company_id, application.company_id());
        assert!(view.reviewed_at.is_none());
        assert!(view.missing_documents.is_empty());
    }

    #[tokio::test]
    async fn test_identifiers_are_normalized_before_storage() {
        let h = harness();
        let application = h
            .service
            .submit(payload_with(" 27aaapl1234c1z5 ", "aaapl1234c"))
            .await
            .unwrap();

        assert_eq!(application.gst_number(), GST);
        assert_eq!(application.pan_number(), PAN);
        assert!(h.store.find_by_tax_id(PAN).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_submission_is_notified() {
        let h = harness();
        let application = h.service.submit(valid_payload()).await.unwrap();
        assert_eq!(h.notifier.notified(), vec![application.application_id()]);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_submission() {
        let h = harness_with(
            InMemoryApplicationStore::new(),
            RecordingFileTransfer::new(),
            RecordingNotifier::failing(),
        );
        let application = h.service.submit(valid_payload()).await.unwrap();
        assert!(h
            .store
            .find_by_application_id(application.application_id())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_storage_outage_is_reported() {
        let h = harness();
        h.store.set_unavailable(true);
        let err = h.service.submit(valid_payload()).await.unwrap_err();
        assert!(matches!(err, OnboardingError::StorageUnavailable(_)));
    }

    #[tokio::test]
    async fn test_history_starts_with_submission() {
        let h = harness();
        let application = h.service.submit(valid_payload()).await.unwrap();
        let history = application.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from, None);
        assert_eq!(history[0].to, ApplicationStatus::Submitted);
    }
}

// ============================================================================
// Identity & uniqueness
// ============================================================================

mod uniqueness_tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_gst_reported_regardless_of_other_fields() {
        let store = InMemoryApplicationStore::with_applications(vec![stored_application(
            GST, "ZZZPL9999Z",
        )])
        .await;
        let h = harness_with(store, RecordingFileTransfer::new(), RecordingNotifier::new());

        let mut payload = payload_with("27aaapl1234c1z5", "BBBPL1111B");
        payload.contact_person = None;
        payload.banking_details.as_mut().unwrap().ifsc_code = Some("bad".to_string());
        payload.documents = None;

        match h.service.submit(payload).await.unwrap_err() {
            OnboardingError::DuplicateIdentifier { field, value } => {
                assert_eq!(field, IdentifierField::TaxRegistrationNumber);
                assert_eq!(value, GST);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(h.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_pan_cites_pan_field() {
        let store = InMemoryApplicationStore::with_applications(vec![stored_application(
            "29AAAPL1234C1Z7",
            PAN,
        )])
        .await;
        let h = harness_with(store, RecordingFileTransfer::new(), RecordingNotifier::new());

        match h.service.submit(payload_with(GST, PAN)).await.unwrap_err() {
            OnboardingError::DuplicateIdentifier { field, value } => {
                assert_eq!(field, IdentifierField::TaxId);
                assert_eq!(field.field_path(), "companyRegistration.panNumber");
                assert_eq!(value, PAN);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_store_rejection_maps_to_duplicate_identifier() {
        let store = InMemoryApplicationStore::with_stale_existence_checks();
        store.put(stored_application(GST, "ZZZPL9999Z")).await;
        let h = harness_with(store, RecordingFileTransfer::new(), RecordingNotifier::new());

        let err = h.service.submit(valid_payload()).await.unwrap_err();
        assert!(matches!(
            err,
            OnboardingError::DuplicateIdentifier {
                field: IdentifierField::TaxRegistrationNumber,
                ..
            }
        ));
        assert!(h.notifier.notified().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_submissions_admit_one() {
        let h = harness_with(
            InMemoryApplicationStore::with_stale_existence_checks(),
            RecordingFileTransfer::new(),
            RecordingNotifier::new(),
        );
        let service = Arc::new(h.service);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.submit(valid_payload()).await })
            })
            .collect();

        let mut accepted = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(OnboardingError::DuplicateIdentifier { .. }) => duplicates += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(duplicates, 7);
        assert_eq!(h.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_submissions_get_distinct_identifiers() {
        let h = harness();
        let mut application_ids = std::collections::HashSet::new();
        let mut company_ids = std::collections::HashSet::new();
        for n in 0..20 {
            let (gst, pan) = identifiers(n);
            let application = h.service.submit(payload_with(&gst, &pan)).await.unwrap();
            assert!(application_ids.insert(application.application_id()));
            assert!(company_ids.insert(application.company_id()));
        }
    }

    #[tokio::test]
    async fn test_availability_checks() {
        let h = harness();
        h.service.submit(valid_payload()).await.unwrap();

        assert!(!h.service.check_tax_registration_number_available("27aaapl1234c1z5").await.unwrap());
        assert!(!h.service.check_tax_id_available(PAN).await.unwrap());
        assert!(h.service.check_tax_id_available("BBBPL1111B").await.unwrap());

        let err = h.service.check_tax_id_available("1234").await.unwrap_err();
        assert!(err.violations().unwrap().contains_field("companyRegistration.panNumber"));
    }
}

// ============================================================================
// Documents
// ============================================================================

mod document_tests {
    use super::*;

    fn mask_strategy() -> impl Strategy<Value = Vec<bool>> {
        proptest::collection::vec(any::<bool>(), 6).prop_filter("at least one missing", |m| {
            m.iter().any(|present| !present)
        })
    }

    proptest! {
        #[test]
        fn prop_missing_documents_listed_exactly(mask in mask_strategy()) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let h = harness();

            let mut payload = valid_payload();
            let documents = payload.documents.as_mut().unwrap();
            let mut expected = Vec::new();
            for (category, present) in DocumentCategory::ALL.into_iter().zip(&mask) {
                if !present {
                    documents.set(category, None);
                    expected.push(category);
                }
            }

            let result = runtime.block_on(h.service.submit(payload));
            match result {
                Err(OnboardingError::IncompleteDocuments { missing }) => prop_assert_eq!(missing, expected),
                other => prop_assert!(false, "unexpected result: {:?}", other),
            }
            prop_assert!(runtime.block_on(h.store.is_empty()));
        }
    }

    #[tokio::test]
    async fn test_blank_url_counts_as_missing() {
        let h = harness();
        let mut payload = valid_payload();
        let mut cheque = document(DocumentCategory::CancelledCheque);
        cheque.file_url = Some("   ".to_string());
        payload
            .documents
            .as_mut()
            .unwrap()
            .set(DocumentCategory::CancelledCheque, Some(cheque));

        match h.service.submit(payload).await.unwrap_err() {
            OnboardingError::IncompleteDocuments { missing } => {
                assert_eq!(missing, vec![DocumentCategory::CancelledCheque])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_inline_documents_are_uploaded_during_submit() {
        let h = harness();
        let mut payload = valid_payload();
        let inline = FileUploadPayload {
            file_name: Some("statement.pdf".to_string()),
            file_size: Some(13),
            file_type: Some("application/pdf".to_string()),
            base64_data: Some("JVBERi0xLjQgdGVzdA==".to_string()),
            ..Default::default()
        };
        payload
            .documents
            .as_mut()
            .unwrap()
            .set(DocumentCategory::BankStatement, Some(inline));

        let application = h.service.submit(payload).await.unwrap();
        let url = application.documents().get(DocumentCategory::BankStatement).unwrap();
        assert!(url.starts_with("memory://bank-statement/"));

        let uploads = h.files.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].content, b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn test_upload_failure_persists_nothing() {
        let h = harness_with(
            InMemoryApplicationStore::new(),
            RecordingFileTransfer::failing(),
            RecordingNotifier::new(),
        );
        let mut payload = valid_payload();
        let mut pan = document(DocumentCategory::PanCard);
        pan.file_url = None;
        pan.base64_data = Some("aGVsbG8=".to_string());
        payload.documents.as_mut().unwrap().set(DocumentCategory::PanCard, Some(pan));

        match h.service.submit(payload).await.unwrap_err() {
            OnboardingError::DocumentUploadFailed { category, .. } => {
                assert_eq!(category, DocumentCategory::PanCard)
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unresolvable_documents_rejected_before_any_upload() {
        let h = harness();
        let mut payload = valid_payload();
        let documents = payload.documents.as_mut().unwrap();
        let mut pan = document(DocumentCategory::PanCard);
        pan.file_url = None;
        pan.base64_data = Some("aGVsbG8=".to_string());
        documents.set(DocumentCategory::PanCard, Some(pan));
        documents.set(DocumentCategory::AddressProof, None);

        let err = h.service.submit(payload).await.unwrap_err();
        assert!(matches!(err, OnboardingError::IncompleteDocuments { .. }));
        assert_eq!(h.files.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_document_enforces_policy() {
        let h = harness();

        let url = h
            .service
            .upload_document(DocumentUpload::new(
                DocumentCategory::GstCertificate,
                "gst.png",
                "image/png",
                vec![0x89, 0x50, 0x4e, 0x47],
            ))
            .await
            .unwrap();
        assert!(url.contains("gst-certificate"));

        let err = h
            .service
            .upload_document(DocumentUpload::new(
                DocumentCategory::GstCertificate,
                "gst.exe",
                "application/octet-stream",
                vec![1],
            ))
            .await
            .unwrap_err();
        assert!(err
            .violations()
            .unwrap()
            .contains_field("documents.gstCertificate.fileType"));
        assert_eq!(h.files.upload_count(), 1);
    }

    #[tokio::test]
    async fn test_pending_documents_round_trip() {
        let h = harness();
        let id = h.service.submit(valid_payload()).await.unwrap().application_id();
        move_to(&h.service, id, &[ApplicationStatus::UnderReview]).await;

        let request = TransitionRequest::new(ApplicationStatus::PendingDocuments, "reviewer1")
            .with_reason("Bank statement is illegible")
            .requesting([DocumentCategory::BankStatement]);
        let pending = h.service.transition(id, request).await.unwrap();
        assert!(pending.documents_requested_at().is_some());
        assert_eq!(pending.documents().missing(), vec![DocumentCategory::BankStatement]);

        let err = h
            .service
            .transition(id, TransitionRequest::new(ApplicationStatus::UnderReview, "reviewer1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OnboardingError::IncompleteDocuments { ref missing } if missing == &vec![DocumentCategory::BankStatement]
        ));

        let mut supplied = DocumentsPayload::default();
        supplied.set(
            DocumentCategory::BankStatement,
            Some(document(DocumentCategory::BankStatement)),
        );
        let updated = h.service.supply_documents(id, supplied).await.unwrap();
        assert!(updated.documents().missing().is_empty());

        let back = h
            .service
            .transition(id, TransitionRequest::new(ApplicationStatus::UnderReview, "reviewer2"))
            .await
            .unwrap();
        assert_eq!(back.status(), ApplicationStatus::UnderReview);
        assert_eq!(back.reviewed_by(), Some("reviewer2"));
    }

    #[tokio::test]
    async fn test_supply_documents_only_when_pending() {
        let h = harness();
        let id = h.service.submit(valid_payload()).await.unwrap().application_id();

        let err = h.service.supply_documents(id, all_documents()).await.unwrap_err();
        assert!(matches!(
            err,
            OnboardingError::NotAcceptingDocuments {
                status: ApplicationStatus::Submitted
            }
        ));
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_review_then_approve() {
        let h = harness();
        let id = h.service.submit(valid_payload()).await.unwrap().application_id();

        h.service
            .transition(id, TransitionRequest::new(ApplicationStatus::UnderReview, "reviewer1"))
            .await
            .unwrap();
        let approved = h
            .service
            .transition(id, TransitionRequest::new(ApplicationStatus::Approved, "reviewer1"))
            .await
            .unwrap();

        assert_eq!(approved.status(), ApplicationStatus::Approved);
        assert!(approved.approved_at().is_some());
        assert!(approved.rejected_at().is_none());
        assert_eq!(approved.reviewed_by(), Some("reviewer1"));
        assert_eq!(approved.history().len(), 3);

        let view = h.service.get_status(id).await.unwrap();
        assert_eq!(view.status, ApplicationStatus::Approved);
        assert!(view.approved_at >= view.reviewed_at);
    }

    #[tokio::test]
    async fn test_rejected_is_terminal() {
        let h = harness();
        let id = h.service.submit(valid_payload()).await.unwrap().application_id();
        move_to(
            &h.service,
            id,
            &[ApplicationStatus::UnderReview, ApplicationStatus::Rejected],
        )
        .await;

        // The terminal state wins over anything wrong with the request itself
        for target in ApplicationStatus::ALL {
            let requests = [
                TransitionRequest::new(target, "reviewer1").with_reason("again"),
                TransitionRequest::new(target, "reviewer1"),
                TransitionRequest::new(target, "  "),
            ];
            for request in requests {
                let err = h.service.transition(id, request.clone()).await.unwrap_err();
                assert!(
                    matches!(err, OnboardingError::InvalidTransition { from: ApplicationStatus::Rejected, to } if to == target),
                    "{request:?}: {err:?}"
                );
            }
            assert_eq!(
                h.service.get_status(id).await.unwrap().status,
                ApplicationStatus::Rejected
            );
        }
        assert_eq!(h.service.get_application(id).await.unwrap().history().len(), 3);
    }

    #[tokio::test]
    async fn test_reject_with_empty_reason_fails_validation() {
        let h = harness();
        let id = h.service.submit(valid_payload()).await.unwrap().application_id();
        move_to(&h.service, id, &[ApplicationStatus::UnderReview]).await;

        let request = TransitionRequest::new(ApplicationStatus::Rejected, "reviewer1").with_reason("");
        let err = h.service.transition(id, request).await.unwrap_err();
        assert!(err.violations().unwrap().contains_field("rejectionReason"));

        let view = h.service.get_status(id).await.unwrap();
        assert_eq!(view.status, ApplicationStatus::UnderReview);
        assert!(view.rejected_at.is_none());
        assert!(view.rejection_reason.is_none());
    }

    #[tokio::test]
    async fn test_rejection_records_reason() {
        let h = harness();
        let id = h.service.submit(valid_payload()).await.unwrap().application_id();
        move_to(
            &h.service,
            id,
            &[ApplicationStatus::UnderReview, ApplicationStatus::Rejected],
        )
        .await;

        let view = h.service.get_status(id).await.unwrap();
        assert_eq!(view.rejection_reason.as_deref(), Some("Turnover could not be verified"));
        assert!(view.rejected_at.is_some());
        assert!(view.approved_at.is_none());
    }

    #[tokio::test]
    async fn test_skipping_review_is_invalid() {
        let h = harness();
        let id = h.service.submit(valid_payload()).await.unwrap().application_id();

        let err = h
            .service
            .transition(id, TransitionRequest::new(ApplicationStatus::Approved, "reviewer1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OnboardingError::InvalidTransition {
                from: ApplicationStatus::Submitted,
                to: ApplicationStatus::Approved
            }
        ));
    }

    #[tokio::test]
    async fn test_reviewed_at_is_set_once() {
        let h = harness();
        let id = h.service.submit(valid_payload()).await.unwrap().application_id();
        move_to(
            &h.service,
            id,
            &[ApplicationStatus::UnderReview, ApplicationStatus::PendingDocuments],
        )
        .await;
        let first_review = h.service.get_status(id).await.unwrap().reviewed_at;

        move_to(&h.service, id, &[ApplicationStatus::UnderReview]).await;
        let view = h.service.get_status(id).await.unwrap();
        assert_eq!(view.reviewed_at, first_review);
        assert_eq!(view.status, ApplicationStatus::UnderReview);
    }

    #[tokio::test]
    async fn test_unknown_application_not_found() {
        let h = harness();
        let err = h.service.get_status(ApplicationId::new()).await.unwrap_err();
        assert!(matches!(err, OnboardingError::NotFound(_)));

        let err = h
            .service
            .transition(
                ApplicationId::new(),
                TransitionRequest::new(ApplicationStatus::UnderReview, "reviewer1"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardingError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_racing_decisions_admit_one() {
        let h = harness();
        let id = h.service.submit(valid_payload()).await.unwrap().application_id();
        move_to(&h.service, id, &[ApplicationStatus::UnderReview]).await;

        let service = Arc::new(h.service);
        let approve = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .transition(id, TransitionRequest::new(ApplicationStatus::Approved, "reviewer1"))
                    .await
            })
        };
        let reject = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .transition(
                        id,
                        TransitionRequest::new(ApplicationStatus::Rejected, "reviewer2")
                            .with_reason("Duplicate trading entity"),
                    )
                    .await
            })
        };

        let outcomes = [approve.await.unwrap(), reject.await.unwrap()];
        let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
        assert_eq!(succeeded, 1);
        assert!(outcomes
            .iter()
            .any(|o| matches!(o, Err(OnboardingError::InvalidTransition { .. }))));

        let final_status = service.get_status(id).await.unwrap().status;
        assert!(final_status.is_terminal());
    }

    #[test]
    fn test_timestamps_clamped_against_clock_skew() {
        let mut application = stored_application(GST, PAN);
        let submitted_at = application.submitted_at();

        application
            .apply_transition(
                &TransitionRequest::new(ApplicationStatus::UnderReview, "reviewer1"),
                submitted_at - Duration::hours(2),
            )
            .unwrap();
        assert_eq!(application.reviewed_at(), Some(submitted_at));

        application
            .apply_transition(
                &TransitionRequest::new(ApplicationStatus::Approved, "reviewer1"),
                submitted_at - Duration::hours(1),
            )
            .unwrap();
        assert!(application.approved_at().unwrap() >= application.reviewed_at().unwrap());
    }

    #[tokio::test]
    async fn test_review_queue_lists_by_status() {
        let h = harness();
        let mut ids = Vec::new();
        for n in 0..3 {
            let (gst, pan) = identifiers(n);
            ids.push(h.service.submit(payload_with(&gst, &pan)).await.unwrap().application_id());
        }
        move_to(&h.service, ids[1], &[ApplicationStatus::UnderReview]).await;

        let submitted: Vec<_> = h
            .service
            .list_by_status(ApplicationStatus::Submitted)
            .await
            .unwrap()
            .iter()
            .map(|a| a.application_id())
            .collect();
        assert_eq!(submitted, vec![ids[0], ids[2]]);

        let under_review = h.service.list_by_status(ApplicationStatus::UnderReview).await.unwrap();
        assert_eq!(under_review.len(), 1);
    }
}

// ============================================================================
// Bank verification
// ============================================================================

mod bank_tests {
    use super::*;
    use domain_onboarding::adapters::FormatOnlyBankVerifier;

    #[tokio::test]
    async fn test_bank_verification_validates_format_first() {
        let h = harness();
        let err = h.service.verify_bank_account("12", "HDFC0001234").await.unwrap_err();
        assert!(err
            .violations()
            .unwrap()
            .contains_field("bankingDetails.accountNumber"));
    }

    #[tokio::test]
    async fn test_format_only_verifier_never_claims_verified() {
        let store = Arc::new(InMemoryApplicationStore::new());
        let service = OnboardingService::new(
            store,
            Arc::new(RecordingFileTransfer::new()),
            Arc::new(RecordingNotifier::new()),
            Arc::new(FormatOnlyBankVerifier::new()),
        );
        let result = service
            .verify_bank_account("50100012345678", "hdfc0001234")
            .await
            .unwrap();
        assert_eq!(result, BankVerification::Unverified);
    }
}

// ============================================================================
// Stale writers
// ============================================================================

mod stale_write_tests {
    use super::*;
    use async_trait::async_trait;
    use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, OperationMetadata, PortError};
    use std::sync::Mutex;

    use ApplicationStatus::{Approved, PendingDocuments, UnderReview};

    const NEW_STATEMENT_URL: &str = "https://files.example/bank-statement-resubmitted.pdf";

    /// Answers the next read of an application with a snapshot taken
    /// earlier, as if that read had raced ahead of the writes since
    struct SnapshotStore {
        inner: Arc<InMemoryApplicationStore>,
        snapshot: Mutex<Option<Application>>,
    }

    impl SnapshotStore {
        fn new(inner: Arc<InMemoryApplicationStore>) -> Self {
            Self {
                inner,
                snapshot: Mutex::new(None),
            }
        }

        fn serve_next(&self, application: Application) {
            *self.snapshot.lock().unwrap() = Some(application);
        }
    }

    impl DomainPort for SnapshotStore {}

    #[async_trait]
    impl HealthCheckable for SnapshotStore {
        async fn health_check(&self) -> HealthCheckResult {
            self.inner.health_check().await
        }
    }

    #[async_trait]
    impl ApplicationStore for SnapshotStore {
        async fn save(
            &self,
            application: &Application,
            metadata: Option<OperationMetadata>,
        ) -> Result<Application, PortError> {
            self.inner.save(application, metadata).await
        }

        async fn find_by_application_id(
            &self,
            id: ApplicationId,
        ) -> Result<Option<Application>, PortError> {
            let snapshot = self.snapshot.lock().unwrap().take();
            match snapshot {
                Some(application) if application.application_id() == id => Ok(Some(application)),
                _ => self.inner.find_by_application_id(id).await,
            }
        }

        async fn find_by_tax_registration_number(
            &self,
            gst_number: &str,
        ) -> Result<Option<Application>, PortError> {
            self.inner.find_by_tax_registration_number(gst_number).await
        }

        async fn find_by_tax_id(&self, pan_number: &str) -> Result<Option<Application>, PortError> {
            self.inner.find_by_tax_id(pan_number).await
        }

        async fn exists_by_tax_registration_number(&self, gst_number: &str) -> Result<bool, PortError> {
            self.inner.exists_by_tax_registration_number(gst_number).await
        }

        async fn exists_by_tax_id(&self, pan_number: &str) -> Result<bool, PortError> {
            self.inner.exists_by_tax_id(pan_number).await
        }

        async fn find_by_status(
            &self,
            status: ApplicationStatus,
        ) -> Result<Vec<Application>, PortError> {
            self.inner.find_by_status(status).await
        }

        async fn update_if_status(
            &self,
            application: &Application,
            expected: ApplicationStatus,
            metadata: Option<OperationMetadata>,
        ) -> Result<bool, PortError> {
            self.inner.update_if_status(application, expected, metadata).await
        }

        async fn update_documents(
            &self,
            application: &Application,
            expected: ApplicationStatus,
            metadata: Option<OperationMetadata>,
        ) -> Result<bool, PortError> {
            self.inner.update_documents(application, expected, metadata).await
        }
    }

    fn snapshot_harness() -> (OnboardingService, Arc<SnapshotStore>, Arc<InMemoryApplicationStore>) {
        let inner = Arc::new(InMemoryApplicationStore::new());
        let store = Arc::new(SnapshotStore::new(inner.clone()));
        let service = OnboardingService::new(
            store.clone(),
            Arc::new(RecordingFileTransfer::new()),
            Arc::new(RecordingNotifier::new()),
            Arc::new(StaticBankVerifier::new(BankVerification::Unverified)),
        );
        (service, store, inner)
    }

    fn resubmitted_statement() -> DocumentsPayload {
        let mut documents = DocumentsPayload::default();
        let mut statement = document(DocumentCategory::BankStatement);
        statement.file_url = Some(NEW_STATEMENT_URL.to_string());
        documents.set(DocumentCategory::BankStatement, Some(statement));
        documents
    }

    /// Second reviewer asks for the bank statement again, the applicant
    /// sends a new one and review resumes: the status ends where it began
    async fn round_trip_through_pending_documents(service: &OnboardingService, id: ApplicationId) {
        let request = TransitionRequest::new(PendingDocuments, "reviewer2")
            .requesting([DocumentCategory::BankStatement]);
        service.transition(id, request).await.unwrap();
        service.supply_documents(id, resubmitted_statement()).await.unwrap();
        service
            .transition(id, TransitionRequest::new(UnderReview, "reviewer2"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stored_writes_bump_version() {
        let h = harness();
        let submitted = h.service.submit(valid_payload()).await.unwrap();
        assert_eq!(submitted.version(), 1);
        let id = submitted.application_id();

        let reviewed = h
            .service
            .transition(id, TransitionRequest::new(UnderReview, "reviewer1"))
            .await
            .unwrap();
        assert_eq!(reviewed.version(), 2);

        round_trip_through_pending_documents(&h.service, id).await;
        let stored = h.store.find_by_application_id(id).await.unwrap().unwrap();
        assert_eq!(stored.version(), 5);
    }

    #[tokio::test]
    async fn test_stale_copy_cannot_overwrite_status_that_came_back() {
        let h = harness();
        let id = h.service.submit(valid_payload()).await.unwrap().application_id();
        move_to(&h.service, id, &[UnderReview]).await;
        let stale = h.store.find_by_application_id(id).await.unwrap().unwrap();

        round_trip_through_pending_documents(&h.service, id).await;
        let current = h.store.find_by_application_id(id).await.unwrap().unwrap();
        assert_eq!(current.status(), UnderReview);
        assert_eq!(current.history().len(), 4);

        let mut approved = stale.clone();
        approved
            .apply_transition(&TransitionRequest::new(Approved, "reviewer1"), Utc::now())
            .unwrap();
        assert!(!h.store.update_if_status(&approved, UnderReview, None).await.unwrap());
        assert!(!h.store.update_documents(&stale, UnderReview, None).await.unwrap());

        let stored = h.store.find_by_application_id(id).await.unwrap().unwrap();
        assert_eq!(stored, current);
        assert_eq!(stored.history().len(), 4);
        assert_eq!(
            stored.documents().get(DocumentCategory::BankStatement),
            Some(NEW_STATEMENT_URL)
        );
        assert!(stored.documents_requested_at().is_some());
        assert!(stored.approved_at().is_none());
    }

    #[tokio::test]
    async fn test_transition_from_stale_read_is_invalid() {
        let (service, store, inner) = snapshot_harness();
        let id = service.submit(valid_payload()).await.unwrap().application_id();
        move_to(&service, id, &[UnderReview]).await;
        let stale = inner.find_by_application_id(id).await.unwrap().unwrap();
        round_trip_through_pending_documents(&service, id).await;

        store.serve_next(stale);
        let err = service
            .transition(id, TransitionRequest::new(Approved, "reviewer1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OnboardingError::InvalidTransition {
                from: UnderReview,
                to: Approved
            }
        ));

        let stored = inner.find_by_application_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status(), UnderReview);
        assert_eq!(stored.history().len(), 4);
        assert!(stored.approved_at().is_none());

        // A fresh read goes through
        let approved = service
            .transition(id, TransitionRequest::new(Approved, "reviewer1"))
            .await
            .unwrap();
        assert_eq!(approved.history().len(), 5);
        let stored = inner.find_by_application_id(id).await.unwrap().unwrap();
        assert_eq!(stored, approved);
    }

    #[tokio::test]
    async fn test_documents_from_stale_read_are_not_written() {
        let (service, store, inner) = snapshot_harness();
        let id = service.submit(valid_payload()).await.unwrap().application_id();
        let request = TransitionRequest::new(PendingDocuments, "reviewer1")
            .requesting([DocumentCategory::BankStatement]);
        move_to(&service, id, &[UnderReview]).await;
        service.transition(id, request.clone()).await.unwrap();
        let stale = inner.find_by_application_id(id).await.unwrap().unwrap();

        // Supplied, reviewed and asked for again while the stale read is held
        service.supply_documents(id, all_documents()).await.unwrap();
        service
            .transition(id, TransitionRequest::new(UnderReview, "reviewer1"))
            .await
            .unwrap();
        service.transition(id, request).await.unwrap();
        let current = inner.find_by_application_id(id).await.unwrap().unwrap();

        store.serve_next(stale);
        let err = service
            .supply_documents(id, resubmitted_statement())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OnboardingError::NotAcceptingDocuments {
                status: PendingDocuments
            }
        ));

        let stored = inner.find_by_application_id(id).await.unwrap().unwrap();
        assert_eq!(stored, current);
        assert_eq!(stored.documents().get(DocumentCategory::BankStatement), None);
    }
}
