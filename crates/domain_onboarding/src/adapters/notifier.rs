//! Submission notifier that only logs

use async_trait::async_trait;
use tracing::info;

use core_kernel::{DomainPort, PortError};

use crate::application::Application;
use crate::ports::SubmissionNotifier;

/// Emits one structured event per accepted submission
///
/// Stands in for mail delivery, which is handled outside this service.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

impl LoggingNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl DomainPort for LoggingNotifier {}

#[async_trait]
impl SubmissionNotifier for LoggingNotifier {
    async fn notify_submission(&self, application: &Application) -> Result<(), PortError> {
        info!(
            application_id = %application.application_id(),
            company_id = %application.company_id(),
            legal_name = %application.company.legal_name,
            contact_email = %application.contact.email,
            status = %application.status(),
            "Onboarding submission received"
        );
        Ok(())
    }
}
