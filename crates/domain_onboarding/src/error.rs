//! Onboarding domain errors
//!
//! Every failure an onboarding operation can produce is one of the
//! [`OnboardingError`] variants. Field-level problems are collected into a
//! single [`ValidationErrors`] value so callers see every violation at once.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use core_kernel::PortError;

use crate::documents::DocumentCategory;
use crate::lifecycle::ApplicationStatus;

/// A single failed rule, addressed by its dotted wire path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Dotted path such as `companyRegistration.gstNumber`
    pub field: String,
    /// Stable machine-readable code such as `gst_number.pattern`
    pub code: String,
    /// Human readable message
    pub message: String,
}

impl FieldViolation {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Ordered collection of field violations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection holding exactly one violation
    pub fn single(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut errors = Self::new();
        errors.push(FieldViolation::new(field, code, message));
        errors
    }

    pub fn push(&mut self, violation: FieldViolation) {
        self.violations.push(violation);
    }

    pub fn add(
        &mut self,
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(FieldViolation::new(field, code, message));
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        self.violations.extend(other.violations);
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<FieldViolation> {
        self.violations
    }

    /// Returns true if any violation is reported against `field`
    pub fn contains_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    /// Returns the violations reported against `field`
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldViolation> + 'a {
        self.violations.iter().filter(move |v| v.field == field)
    }

    /// Returns `Ok(value)` when no violations were recorded
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violation(s)", self.violations.len())?;
        for (i, violation) in self.violations.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}: {}", sep, violation.field, violation.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// The two identifiers that must be unique across all applications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentifierField {
    /// GST number
    TaxRegistrationNumber,
    /// PAN
    TaxId,
}

impl IdentifierField {
    /// Wire path of the field carrying this identifier
    pub fn field_path(&self) -> &'static str {
        match self {
            IdentifierField::TaxRegistrationNumber => "companyRegistration.gstNumber",
            IdentifierField::TaxId => "companyRegistration.panNumber",
        }
    }

    /// Logical key used by storage adapters in [`PortError::DuplicateKey`]
    pub fn key(&self) -> &'static str {
        match self {
            IdentifierField::TaxRegistrationNumber => "tax_registration_number",
            IdentifierField::TaxId => "tax_id",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "tax_registration_number" => Some(IdentifierField::TaxRegistrationNumber),
            "tax_id" => Some(IdentifierField::TaxId),
            _ => None,
        }
    }

    /// Label used in messages
    pub fn label(&self) -> &'static str {
        match self {
            IdentifierField::TaxRegistrationNumber => "GST number",
            IdentifierField::TaxId => "PAN",
        }
    }
}

impl fmt::Display for IdentifierField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors that can occur in the onboarding domain
#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error("Validation failed with {0}")]
    Validation(ValidationErrors),

    #[error("{field} {value} is already registered")]
    DuplicateIdentifier { field: IdentifierField, value: String },

    #[error("Required documents missing: {}", join_categories(.missing))]
    IncompleteDocuments { missing: Vec<DocumentCategory> },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },

    #[error("Application not found: {0}")]
    NotFound(String),

    #[error("Application in status {status} does not accept documents")]
    NotAcceptingDocuments { status: ApplicationStatus },

    #[error("Document upload failed for {category}: {message}")]
    DocumentUploadFailed {
        category: DocumentCategory,
        message: String,
    },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Bank account verification unavailable: {0}")]
    VerifierUnavailable(String),
}

impl OnboardingError {
    /// Shorthand for a validation failure on a single field
    pub fn invalid_field(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        OnboardingError::Validation(ValidationErrors::single(field, code, message))
    }

    /// Returns the violations if this is a validation failure
    pub fn violations(&self) -> Option<&ValidationErrors> {
        match self {
            OnboardingError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for OnboardingError {
    fn from(errors: ValidationErrors) -> Self {
        OnboardingError::Validation(errors)
    }
}

impl From<PortError> for OnboardingError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::DuplicateKey { key, value } => match IdentifierField::from_key(&key) {
                Some(field) => OnboardingError::DuplicateIdentifier { field, value },
                None => OnboardingError::StorageUnavailable(format!(
                    "unexpected unique key {} rejected value {}",
                    key, value
                )),
            },
            PortError::NotFound { id, .. } => OnboardingError::NotFound(id),
            PortError::Validation { message, field } => OnboardingError::invalid_field(
                field.unwrap_or_else(|| "application".to_string()),
                "storage.rejected",
                message,
            ),
            other => OnboardingError::StorageUnavailable(other.to_string()),
        }
    }
}

fn join_categories(categories: &[DocumentCategory]) -> String {
    categories
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
