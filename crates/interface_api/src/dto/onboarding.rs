//! Onboarding DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ApplicationId, CompanyId};
use domain_onboarding::{Application, ApplicationStatus, DocumentCategory, TransitionRequest};

/// Envelope every successful response is wrapped in
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Returned after a successful submission
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub application_id: ApplicationId,
    pub company_id: CompanyId,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
}

impl From<&Application> for SubmissionResponse {
    fn from(application: &Application) -> Self {
        Self {
            application_id: application.application_id(),
            company_id: application.company_id(),
            status: application.status(),
            submitted_at: application.submitted_at(),
        }
    }
}

/// Reviewer request body for `PUT /:applicationId/status`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: ApplicationStatus,
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub requested_documents: Vec<DocumentCategory>,
}

impl UpdateStatusRequest {
    /// Builds the domain request with the authenticated reviewer as actor
    pub fn into_transition(self, actor: impl Into<String>) -> TransitionRequest {
        let request = TransitionRequest::new(self.status, actor).requesting(self.requested_documents);
        match self.rejection_reason {
            Some(reason) => request.with_reason(reason),
            None => request,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GstQuery {
    pub gst_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanQuery {
    pub pan_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankQuery {
    pub account_number: String,
    pub ifsc_code: String,
}

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub status: ApplicationStatus,
}

/// Answer of the identifier pre-checks
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}
