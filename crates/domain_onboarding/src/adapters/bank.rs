//! Format-only bank account verification

use async_trait::async_trait;

use core_kernel::{DomainPort, PortError};

use crate::ports::{BankAccountVerifier, BankVerification};
use crate::validation::rules::{ACCOUNT_NUMBER_PATTERN, IFSC_CODE_PATTERN};

/// Checks the shape of an account number and IFSC code
///
/// Never answers [`BankVerification::Verified`]: nothing here talks to a
/// bank, so a well formed account is reported as `Unverified`.
#[derive(Debug, Clone, Default)]
pub struct FormatOnlyBankVerifier;

impl FormatOnlyBankVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl DomainPort for FormatOnlyBankVerifier {}

#[async_trait]
impl BankAccountVerifier for FormatOnlyBankVerifier {
    async fn verify(
        &self,
        account_number: &str,
        ifsc_code: &str,
    ) -> Result<BankVerification, PortError> {
        if !ACCOUNT_NUMBER_PATTERN.is_match(account_number) {
            return Ok(BankVerification::Rejected(
                "Account number must be 9 to 18 digits".to_string(),
            ));
        }
        if !IFSC_CODE_PATTERN.is_match(ifsc_code) {
            return Ok(BankVerification::Rejected("Invalid IFSC code".to_string()));
        }
        Ok(BankVerification::Unverified)
    }
}
