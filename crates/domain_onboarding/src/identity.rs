//! Identifier assignment and uniqueness

use std::sync::Arc;
use tracing::debug;

use core_kernel::{ApplicationId, CompanyId};

use crate::error::{IdentifierField, OnboardingError};
use crate::ports::ApplicationStore;

/// Assigns identifiers and guards tax identifier uniqueness
///
/// The existence checks here give early, friendly answers. The store's
/// unique constraints remain the authority: a save that loses a race is
/// rejected there and mapped to the same [`OnboardingError::DuplicateIdentifier`].
#[derive(Clone)]
pub struct IdentityGuard {
    store: Arc<dyn ApplicationStore>,
}

impl IdentityGuard {
    pub fn new(store: Arc<dyn ApplicationStore>) -> Self {
        Self { store }
    }

    /// Fresh identifiers for a new application
    pub fn assign() -> (ApplicationId, CompanyId) {
        (ApplicationId::new(), CompanyId::new())
    }

    /// Trims and upper-cases an identifier the way validation does
    pub fn normalize(value: &str) -> String {
        value.trim().to_ascii_uppercase()
    }

    /// Fails on the first identifier already registered, GST number first
    pub async fn ensure_unique(
        &self,
        gst_number: Option<&str>,
        pan_number: Option<&str>,
    ) -> Result<(), OnboardingError> {
        if let Some(gst_number) = gst_number {
            if self.store.exists_by_tax_registration_number(gst_number).await? {
                debug!(gst_number, "GST number already registered");
                return Err(OnboardingError::DuplicateIdentifier {
                    field: IdentifierField::TaxRegistrationNumber,
                    value: gst_number.to_string(),
                });
            }
        }
        if let Some(pan_number) = pan_number {
            if self.store.exists_by_tax_id(pan_number).await? {
                debug!(pan_number, "PAN already registered");
                return Err(OnboardingError::DuplicateIdentifier {
                    field: IdentifierField::TaxId,
                    value: pan_number.to_string(),
                });
            }
        }
        Ok(())
    }

    pub async fn is_available(
        &self,
        field: IdentifierField,
        value: &str,
    ) -> Result<bool, OnboardingError> {
        let value = Self::normalize(value);
        let taken = match field {
            IdentifierField::TaxRegistrationNumber => {
                self.store.exists_by_tax_registration_number(&value).await?
            }
            IdentifierField::TaxId => self.store.exists_by_tax_id(&value).await?,
        };
        Ok(!taken)
    }
}
