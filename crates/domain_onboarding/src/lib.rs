//! Company Onboarding Domain
//!
//! Validates supplier registration submissions, guards tax identifier
//! uniqueness, checks supporting documents, and drives the review lifecycle.
//!
//! # Application Lifecycle
//!
//! ```text
//! SUBMITTED -> UNDER_REVIEW -> APPROVED | REJECTED
//!                   ^  |
//!                   |  v
//!           PENDING_DOCUMENTS
//! ```

pub mod adapters;
pub mod application;
pub mod documents;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod payload;
pub mod ports;
pub mod service;
pub mod validation;

pub use application::{
    AccountType, Application, ApplicationParts, ApplicationSections, BankingDetails,
    BusinessAddress, BusinessType, CompanyRegistration, ContactPerson, StatusChange, StatusView,
};
pub use documents::{
    DocumentCategory, DocumentChecker, DocumentReference, DocumentSet, DocumentUpload,
    DocumentUrls, UploadPolicy, MAX_DOCUMENT_BYTES,
};
pub use error::{FieldViolation, IdentifierField, OnboardingError, ValidationErrors};
pub use identity::IdentityGuard;
pub use lifecycle::{ApplicationStatus, TransitionRequest};
pub use payload::{
    ApplicationPayload, BankingDetailsPayload, BusinessAddressPayload, CompanyRegistrationPayload,
    ContactPersonPayload, DocumentsPayload, FileUploadPayload,
};
pub use ports::{
    ApplicationStore, BankAccountVerifier, BankVerification, FileTransfer, SubmissionNotifier,
};
pub use service::OnboardingService;
pub use validation::{ApplicationValidator, ValidatedApplication};
