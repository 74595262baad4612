//! Custom Test Assertions
//!
//! Assertion helpers for onboarding results that print the whole error on
//! failure instead of a bare `matches!` miss.

use domain_onboarding::{
    Application, ApplicationStatus, DocumentCategory, IdentifierField, OnboardingError,
};

fn violations_of(err: &OnboardingError) -> &domain_onboarding::ValidationErrors {
    err.violations()
        .unwrap_or_else(|| panic!("Expected validation errors, got {:?}", err))
}

/// Asserts that validation reported `field`
pub fn assert_violation(err: &OnboardingError, field: &str) {
    let errors = violations_of(err);
    assert!(
        errors.contains_field(field),
        "Expected a violation at {}, got: {}",
        field,
        errors
    );
}

/// Asserts that validation reported `field` with `code`
pub fn assert_violation_code(err: &OnboardingError, field: &str, code: &str) {
    let errors = violations_of(err);
    assert!(
        errors.for_field(field).any(|v| v.code == code),
        "Expected {} at {}, got: {}",
        code,
        field,
        errors
    );
}

/// Asserts that validation reported exactly these fields, in any order
pub fn assert_violation_fields(err: &OnboardingError, expected: &[&str]) {
    let errors = violations_of(err);
    let mut actual: Vec<&str> = errors.violations().iter().map(|v| v.field.as_str()).collect();
    actual.sort_unstable();
    actual.dedup();
    let mut expected = expected.to_vec();
    expected.sort_unstable();
    assert_eq!(actual, expected, "Violation fields differ: {}", errors);
}

/// Asserts a duplicate identifier rejection on `field`
pub fn assert_duplicate(err: &OnboardingError, field: IdentifierField) {
    match err {
        OnboardingError::DuplicateIdentifier { field: actual, .. } => assert_eq!(
            *actual, field,
            "Duplicate reported on the wrong identifier"
        ),
        other => panic!("Expected DuplicateIdentifier({}), got {:?}", field, other),
    }
}

/// Asserts an incomplete-documents rejection naming exactly `expected`
pub fn assert_missing_documents(err: &OnboardingError, expected: &[DocumentCategory]) {
    match err {
        OnboardingError::IncompleteDocuments { missing } => {
            assert_eq!(missing.as_slice(), expected, "Missing documents differ")
        }
        other => panic!("Expected IncompleteDocuments, got {:?}", other),
    }
}

/// Asserts an invalid transition rejection
pub fn assert_invalid_transition(
    err: &OnboardingError,
    from: ApplicationStatus,
    to: ApplicationStatus,
) {
    match err {
        OnboardingError::InvalidTransition { from: f, to: t } => {
            assert_eq!((*f, *t), (from, to), "Transition endpoints differ")
        }
        other => panic!("Expected InvalidTransition, got {:?}", other),
    }
}

/// Asserts the lifecycle invariants of a stored application
///
/// - history starts with the submission and chains `from` to the previous `to`
/// - the last history entry matches the current status
/// - history timestamps never decrease and none precedes `submitted_at`
/// - `reviewed_at`, `approved_at` and `rejected_at` are not earlier than
///   `submitted_at`
pub fn assert_lifecycle_consistent(application: &Application) {
    let history = application.history();
    assert!(!history.is_empty(), "History must not be empty");
    assert_eq!(history[0].from, None, "First entry must be the submission");
    assert_eq!(history[0].to, ApplicationStatus::Submitted);

    for pair in history.windows(2) {
        assert_eq!(
            pair[1].from,
            Some(pair[0].to),
            "History entries do not chain: {:?}",
            history
        );
        assert!(pair[1].at >= pair[0].at, "History timestamps decrease");
    }

    let last = history.last().map(|change| change.to);
    assert_eq!(last, Some(application.status()), "History ends elsewhere");

    let submitted_at = application.submitted_at();
    for at in [
        application.reviewed_at(),
        application.documents_requested_at(),
        application.approved_at(),
        application.rejected_at(),
    ]
    .into_iter()
    .flatten()
    {
        assert!(at >= submitted_at, "Timestamp {} precedes submission {}", at, submitted_at);
    }

    if application.status() == ApplicationStatus::Rejected {
        assert!(
            application.rejection_reason().is_some(),
            "Rejected application without a reason"
        );
    }
}
