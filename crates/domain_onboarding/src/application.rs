//! Onboarding application aggregate

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ApplicationId, CompanyId};

use crate::documents::{DocumentCategory, DocumentUrls};
use crate::lifecycle::ApplicationStatus;

/// Nature of the applicant's business
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessType {
    Manufacturer,
    Wholesaler,
    Distributor,
    Retailer,
}

impl BusinessType {
    pub const WIRE_NAMES: &'static [&'static str] =
        &["manufacturer", "wholesaler", "distributor", "retailer"];

    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessType::Manufacturer => "manufacturer",
            BusinessType::Wholesaler => "wholesaler",
            BusinessType::Distributor => "distributor",
            BusinessType::Retailer => "retailer",
        }
    }
}

impl fmt::Display for BusinessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BusinessType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manufacturer" => Ok(BusinessType::Manufacturer),
            "wholesaler" => Ok(BusinessType::Wholesaler),
            "distributor" => Ok(BusinessType::Distributor),
            "retailer" => Ok(BusinessType::Retailer),
            other => Err(format!("Unknown business type: {}", other)),
        }
    }
}

/// Kind of bank account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Current,
    Savings,
}

impl AccountType {
    pub const WIRE_NAMES: &'static [&'static str] = &["current", "savings"];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Current => "current",
            AccountType::Savings => "savings",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "current" => Ok(AccountType::Current),
            "savings" => Ok(AccountType::Savings),
            other => Err(format!("Unknown account type: {}", other)),
        }
    }
}

/// Company registration details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRegistration {
    pub legal_name: String,
    pub trade_name: String,
    /// Tax registration number (GSTIN), upper-cased
    pub gst_number: String,
    /// Tax identifier (PAN), upper-cased
    pub pan_number: String,
    pub incorporation_date: NaiveDate,
    pub business_type: BusinessType,
    pub annual_turnover: Decimal,
    pub number_of_employees: String,
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessAddress {
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPerson {
    pub full_name: String,
    pub designation: String,
    pub email: String,
    pub phone: String,
    pub alternate_phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankingDetails {
    pub bank_name: String,
    pub account_number: String,
    /// Bank routing code (IFSC), upper-cased
    pub ifsc_code: String,
    pub account_holder_name: String,
    pub account_type: AccountType,
    pub branch_name: String,
    pub requested_credit_limit: Option<Decimal>,
}

/// One entry of the append-only status history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    /// `None` for the initial submission
    pub from: Option<ApplicationStatus>,
    pub to: ApplicationStatus,
    /// Reviewer responsible, `None` for the initial submission
    pub actor: Option<String>,
    pub reason: Option<String>,
    /// Categories the reviewer asked to be supplied again
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requested_documents: Vec<DocumentCategory>,
    pub at: DateTime<Utc>,
}

/// Every field of an application, used to rebuild one from storage
#[derive(Debug, Clone)]
pub struct ApplicationParts {
    pub application_id: ApplicationId,
    pub company_id: CompanyId,
    pub company: CompanyRegistration,
    pub address: BusinessAddress,
    pub contact: ContactPerson,
    pub banking: BankingDetails,
    pub documents: DocumentUrls,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub documents_requested_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<String>,
    pub history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

/// A company's onboarding application
///
/// Identity, status and timestamps are private: identifiers never change
/// after creation and status only moves through
/// [`Application::apply_transition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    application_id: ApplicationId,
    company_id: CompanyId,
    pub company: CompanyRegistration,
    pub address: BusinessAddress,
    pub contact: ContactPerson,
    pub banking: BankingDetails,
    pub(crate) documents: DocumentUrls,
    pub(crate) status: ApplicationStatus,
    pub(crate) submitted_at: DateTime<Utc>,
    pub(crate) reviewed_at: Option<DateTime<Utc>>,
    pub(crate) documents_requested_at: Option<DateTime<Utc>>,
    pub(crate) approved_at: Option<DateTime<Utc>>,
    pub(crate) rejected_at: Option<DateTime<Utc>>,
    pub(crate) rejection_reason: Option<String>,
    pub(crate) reviewed_by: Option<String>,
    pub(crate) history: Vec<StatusChange>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    /// Bumped by every stored write; compare-and-set writes require the
    /// stored value to equal the one the caller loaded
    pub(crate) version: i64,
}

impl Application {
    /// Creates a freshly submitted application
    pub fn submitted(
        application_id: ApplicationId,
        company_id: CompanyId,
        sections: ApplicationSections,
        documents: DocumentUrls,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            application_id,
            company_id,
            company: sections.company,
            address: sections.address,
            contact: sections.contact,
            banking: sections.banking,
            documents,
            status: ApplicationStatus::Submitted,
            submitted_at: now,
            reviewed_at: None,
            documents_requested_at: None,
            approved_at: None,
            rejected_at: None,
            rejection_reason: None,
            reviewed_by: None,
            history: vec![StatusChange {
                from: None,
                to: ApplicationStatus::Submitted,
                actor: None,
                reason: None,
                requested_documents: Vec::new(),
                at: now,
            }],
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub fn from_parts(parts: ApplicationParts) -> Self {
        Self {
            application_id: parts.application_id,
            company_id: parts.company_id,
            company: parts.company,
            address: parts.address,
            contact: parts.contact,
            banking: parts.banking,
            documents: parts.documents,
            status: parts.status,
            submitted_at: parts.submitted_at,
            reviewed_at: parts.reviewed_at,
            documents_requested_at: parts.documents_requested_at,
            approved_at: parts.approved_at,
            rejected_at: parts.rejected_at,
            rejection_reason: parts.rejection_reason,
            reviewed_by: parts.reviewed_by,
            history: parts.history,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            version: parts.version,
        }
    }

    pub fn into_parts(self) -> ApplicationParts {
        ApplicationParts {
            application_id: self.application_id,
            company_id: self.company_id,
            company: self.company,
            address: self.address,
            contact: self.contact,
            banking: self.banking,
            documents: self.documents,
            status: self.status,
            submitted_at: self.submitted_at,
            reviewed_at: self.reviewed_at,
            documents_requested_at: self.documents_requested_at,
            approved_at: self.approved_at,
            rejected_at: self.rejected_at,
            rejection_reason: self.rejection_reason,
            reviewed_by: self.reviewed_by,
            history: self.history,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        }
    }

    pub fn application_id(&self) -> ApplicationId {
        self.application_id
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    pub fn gst_number(&self) -> &str {
        &self.company.gst_number
    }

    pub fn pan_number(&self) -> &str {
        &self.company.pan_number
    }

    pub fn documents(&self) -> &DocumentUrls {
        &self.documents
    }

    pub fn status(&self) -> ApplicationStatus {
        self.status
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.reviewed_at
    }

    pub fn documents_requested_at(&self) -> Option<DateTime<Utc>> {
        self.documents_requested_at
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    pub fn rejected_at(&self) -> Option<DateTime<Utc>> {
        self.rejected_at
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn reviewed_by(&self) -> Option<&str> {
        self.reviewed_by.as_deref()
    }

    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// Follows a compare-and-set write the store accepted
    pub(crate) fn record_stored_write(&mut self) {
        self.version += 1;
    }

    /// Latest lifecycle timestamp recorded so far
    pub(crate) fn latest_timestamp(&self) -> DateTime<Utc> {
        [
            Some(self.submitted_at),
            self.reviewed_at,
            self.documents_requested_at,
            self.approved_at,
            self.rejected_at,
            Some(self.updated_at),
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(self.submitted_at)
    }

    /// Replaces the URLs of the given categories
    pub(crate) fn replace_documents(
        &mut self,
        urls: impl IntoIterator<Item = (DocumentCategory, String)>,
        now: DateTime<Utc>,
    ) {
        for (category, url) in urls {
            self.documents.set(category, Some(url));
        }
        self.updated_at = now.max(self.updated_at);
    }

    /// Read-only status summary
    pub fn status_view(&self) -> StatusView {
        StatusView {
            application_id: self.application_id,
            company_id: self.company_id,
            status: self.status,
            submitted_at: self.submitted_at,
            reviewed_at: self.reviewed_at,
            documents_requested_at: self.documents_requested_at,
            approved_at: self.approved_at,
            rejected_at: self.rejected_at,
            rejection_reason: self.rejection_reason.clone(),
            missing_documents: self.documents.missing(),
        }
    }
}

/// The four validated data sections of an application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationSections {
    pub company: CompanyRegistration,
    pub address: BusinessAddress,
    pub contact: ContactPerson,
    pub banking: BankingDetails,
}

/// Status summary returned to applicants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub application_id: ApplicationId,
    pub company_id: CompanyId,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub documents_requested_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    /// Categories the applicant still has to supply
    pub missing_documents: Vec<DocumentCategory>,
}
