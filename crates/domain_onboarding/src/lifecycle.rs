//! Review lifecycle
//!
//! ```text
//! SUBMITTED -> UNDER_REVIEW -> APPROVED
//!                   |  ^     -> REJECTED
//!                   v  |
//!           PENDING_DOCUMENTS
//! ```
//!
//! APPROVED and REJECTED are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::application::{Application, StatusChange};
use crate::documents::{DocumentCategory, DocumentChecker};
use crate::error::{OnboardingError, ValidationErrors};

/// Longest accepted rejection reason, in characters
pub const MAX_REJECTION_REASON: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    PendingDocuments,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
        ApplicationStatus::PendingDocuments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "SUBMITTED",
            ApplicationStatus::UnderReview => "UNDER_REVIEW",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::PendingDocuments => "PENDING_DOCUMENTS",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::Rejected)
    }

    /// Statuses reachable in one step
    pub fn allowed_targets(&self) -> &'static [ApplicationStatus] {
        use ApplicationStatus::*;
        match self {
            Submitted => &[UnderReview],
            UnderReview => &[Approved, Rejected, PendingDocuments],
            PendingDocuments => &[UnderReview],
            Approved | Rejected => &[],
        }
    }

    pub fn can_transition_to(&self, target: ApplicationStatus) -> bool {
        self.allowed_targets().contains(&target)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == upper)
            .ok_or_else(|| format!("Unknown application status: {}", s))
    }
}

/// A reviewer's request to move an application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub target: ApplicationStatus,
    pub actor: String,
    pub reason: Option<String>,
    /// Categories to clear and ask for again; only with PENDING_DOCUMENTS
    pub requested_documents: Vec<DocumentCategory>,
}

impl TransitionRequest {
    pub fn new(target: ApplicationStatus, actor: impl Into<String>) -> Self {
        Self {
            target,
            actor: actor.into(),
            reason: None,
            requested_documents: Vec::new(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn requesting(mut self, categories: impl IntoIterator<Item = DocumentCategory>) -> Self {
        self.requested_documents = categories.into_iter().collect();
        self
    }

    fn normalized_reason(&self) -> Option<&str> {
        self.reason.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }

    /// Checks the request itself, independent of the application's state
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.actor.trim().is_empty() {
            errors.add("reviewedBy", "required", "Reviewer is required");
        }

        match self.normalized_reason() {
            None if self.target == ApplicationStatus::Rejected => {
                errors.add(
                    "rejectionReason",
                    "required",
                    "A reason is required to reject an application",
                );
            }
            Some(reason) if reason.chars().count() > MAX_REJECTION_REASON => {
                errors.add(
                    "rejectionReason",
                    "length",
                    "Reason must not exceed 500 characters",
                );
            }
            _ => {}
        }

        if !self.requested_documents.is_empty()
            && self.target != ApplicationStatus::PendingDocuments
        {
            errors.add(
                "requestedDocuments",
                "not_applicable",
                "Documents can only be requested when moving to PENDING_DOCUMENTS",
            );
        }

        errors.into_result(())
    }
}

impl Application {
    /// Moves the application to `request.target`
    ///
    /// The move itself is checked before the request's fields, so a
    /// terminal application answers `InvalidTransition` to every request.
    /// Timestamps are clamped so none is ever earlier than one already on the
    /// record, even when `now` comes from a skewed clock.
    pub fn apply_transition(
        &mut self,
        request: &TransitionRequest,
        now: DateTime<Utc>,
    ) -> Result<StatusChange, OnboardingError> {
        let from = self.status;
        let to = request.target;
        if !from.can_transition_to(to) {
            return Err(OnboardingError::InvalidTransition { from, to });
        }
        request.validate()?;
        if from == ApplicationStatus::PendingDocuments {
            DocumentChecker::check_urls(&self.documents)?;
        }

        let at = now.max(self.latest_timestamp());
        let actor = request.actor.trim().to_string();
        let reason = request.normalized_reason().map(str::to_string);

        match to {
            ApplicationStatus::UnderReview => {
                self.reviewed_at.get_or_insert(at);
            }
            ApplicationStatus::PendingDocuments => {
                self.documents_requested_at.get_or_insert(at);
                for category in &request.requested_documents {
                    self.documents.set(*category, None);
                }
            }
            ApplicationStatus::Approved => {
                self.approved_at.get_or_insert(at);
            }
            ApplicationStatus::Rejected => {
                self.rejected_at.get_or_insert(at);
                self.rejection_reason = reason.clone();
            }
            ApplicationStatus::Submitted => {}
        }

        self.status = to;
        self.reviewed_by = Some(actor.clone());
        self.updated_at = at;

        let change = StatusChange {
            from: Some(from),
            to,
            actor: Some(actor),
            reason,
            requested_documents: request.requested_documents.clone(),
            at,
        };
        self.history.push(change.clone());
        Ok(change)
    }
}
