//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_onboarding::{FieldViolation, OnboardingError};

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Vec<ErrorDetail>,
    },

    #[error("Upstream failure: {0}")]
    BadGateway(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// One field-level problem in an error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl From<&FieldViolation> for ErrorDetail {
    fn from(violation: &FieldViolation) -> Self {
        Self {
            field: violation.field.clone(),
            code: violation.code.clone(),
            message: violation.message.clone(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ErrorDetail>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::BadGateway(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            ApiError::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let (message, details) = match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Forbidden(msg)
            | ApiError::Conflict(msg)
            | ApiError::BadGateway(msg)
            | ApiError::ServiceUnavailable(msg)
            | ApiError::Internal(msg) => (msg, None),
            ApiError::Unauthorized => ("Unauthorized".to_string(), None),
            ApiError::Validation { message, details } => (message, Some(details)),
        };

        let body = ErrorResponse {
            success: false,
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<OnboardingError> for ApiError {
    fn from(err: OnboardingError) -> Self {
        match err {
            OnboardingError::Validation(errors) => ApiError::Validation {
                message: "Validation failed".to_string(),
                details: errors.violations().iter().map(ErrorDetail::from).collect(),
            },
            OnboardingError::IncompleteDocuments { ref missing } => ApiError::Validation {
                message: err.to_string(),
                details: missing
                    .iter()
                    .map(|category| ErrorDetail {
                        field: category.field_path(),
                        code: "required".to_string(),
                        message: format!("{} is required", category),
                    })
                    .collect(),
            },
            OnboardingError::DuplicateIdentifier { .. }
            | OnboardingError::InvalidTransition { .. }
            | OnboardingError::NotAcceptingDocuments { .. } => ApiError::Conflict(err.to_string()),
            OnboardingError::NotFound(_) => ApiError::NotFound(err.to_string()),
            OnboardingError::DocumentUploadFailed { .. } => {
                error!(error = %err, "Document upload failed");
                ApiError::BadGateway(err.to_string())
            }
            OnboardingError::StorageUnavailable(_) | OnboardingError::VerifierUnavailable(_) => {
                error!(error = %err, "Collaborator unavailable");
                ApiError::ServiceUnavailable(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_onboarding::{
        ApplicationStatus, DocumentCategory, IdentifierField, ValidationErrors,
    };

    fn status_of(err: OnboardingError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_onboarding_error_status_codes() {
        assert_eq!(
            status_of(OnboardingError::Validation(ValidationErrors::single(
                "contactPerson.email",
                "email.format",
                "Invalid email"
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(OnboardingError::IncompleteDocuments {
                missing: vec![DocumentCategory::PanCard]
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(OnboardingError::DuplicateIdentifier {
                field: IdentifierField::TaxId,
                value: "AAAPL1234C".into()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(OnboardingError::InvalidTransition {
                from: ApplicationStatus::Rejected,
                to: ApplicationStatus::Approved
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(OnboardingError::NotFound("APP-1".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(OnboardingError::DocumentUploadFailed {
                category: DocumentCategory::BankStatement,
                message: "disk full".into()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(OnboardingError::StorageUnavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_incomplete_documents_lists_each_category() {
        let err = ApiError::from(OnboardingError::IncompleteDocuments {
            missing: vec![DocumentCategory::PanCard, DocumentCategory::CancelledCheque],
        });
        match err {
            ApiError::Validation { details, .. } => {
                let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, ["documents.panCard", "documents.cancelledCheque"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
