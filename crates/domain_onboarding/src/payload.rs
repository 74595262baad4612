//! Raw submission payloads
//!
//! These mirror the JSON submitted by the onboarding front end. Every field
//! is optional so that absent values surface as validation violations rather
//! than deserialization failures.

use serde::{Deserialize, Serialize};

use crate::documents::DocumentCategory;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPayload {
    pub company_registration: Option<CompanyRegistrationPayload>,
    pub business_address: Option<BusinessAddressPayload>,
    pub contact_person: Option<ContactPersonPayload>,
    pub banking_details: Option<BankingDetailsPayload>,
    pub documents: Option<DocumentsPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRegistrationPayload {
    pub legal_name: Option<String>,
    pub trade_name: Option<String>,
    pub gst_number: Option<String>,
    pub pan_number: Option<String>,
    pub incorporation_date: Option<String>,
    pub business_type: Option<String>,
    pub annual_turnover: Option<String>,
    pub number_of_employees: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessAddressPayload {
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPersonPayload {
    pub full_name: Option<String>,
    pub designation: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub alternate_phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankingDetailsPayload {
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub account_holder_name: Option<String>,
    pub account_type: Option<String>,
    pub branch_name: Option<String>,
    pub requested_credit_limit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsPayload {
    pub gst_certificate: Option<FileUploadPayload>,
    pub pan_card: Option<FileUploadPayload>,
    pub incorporation_certificate: Option<FileUploadPayload>,
    pub bank_statement: Option<FileUploadPayload>,
    pub address_proof: Option<FileUploadPayload>,
    pub cancelled_cheque: Option<FileUploadPayload>,
}

impl DocumentsPayload {
    pub fn get(&self, category: DocumentCategory) -> Option<&FileUploadPayload> {
        match category {
            DocumentCategory::GstCertificate => self.gst_certificate.as_ref(),
            DocumentCategory::PanCard => self.pan_card.as_ref(),
            DocumentCategory::IncorporationCertificate => self.incorporation_certificate.as_ref(),
            DocumentCategory::BankStatement => self.bank_statement.as_ref(),
            DocumentCategory::AddressProof => self.address_proof.as_ref(),
            DocumentCategory::CancelledCheque => self.cancelled_cheque.as_ref(),
        }
    }

    pub fn set(&mut self, category: DocumentCategory, file: Option<FileUploadPayload>) {
        let slot = match category {
            DocumentCategory::GstCertificate => &mut self.gst_certificate,
            DocumentCategory::PanCard => &mut self.pan_card,
            DocumentCategory::IncorporationCertificate => &mut self.incorporation_certificate,
            DocumentCategory::BankStatement => &mut self.bank_statement,
            DocumentCategory::AddressProof => &mut self.address_proof,
            DocumentCategory::CancelledCheque => &mut self.cancelled_cheque,
        };
        *slot = file;
    }
}

/// One document slot: either a previously returned `fileUrl` or inline
/// `base64Data`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadPayload {
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub file_url: Option<String>,
    pub base64_data: Option<String>,
    pub uploaded_at: Option<String>,
}

/// Reads a payload field by its wire name
///
/// The rule table addresses fields by name; this is the bridge from those
/// names to the typed payload structs.
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<String>;
}

impl FieldSource for CompanyRegistrationPayload {
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "legalName" => self.legal_name.clone(),
            "tradeName" => self.trade_name.clone(),
            "gstNumber" => self.gst_number.clone(),
            "panNumber" => self.pan_number.clone(),
            "incorporationDate" => self.incorporation_date.clone(),
            "businessType" => self.business_type.clone(),
            "annualTurnover" => self.annual_turnover.clone(),
            "numberOfEmployees" => self.number_of_employees.clone(),
            "website" => self.website.clone(),
            _ => None,
        }
    }
}

impl FieldSource for BusinessAddressPayload {
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "addressLine1" => self.address_line1.clone(),
            "addressLine2" => self.address_line2.clone(),
            "city" => self.city.clone(),
            "state" => self.state.clone(),
            "pincode" => self.pincode.clone(),
            "country" => self.country.clone(),
            _ => None,
        }
    }
}

impl FieldSource for ContactPersonPayload {
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "fullName" => self.full_name.clone(),
            "designation" => self.designation.clone(),
            "email" => self.email.clone(),
            "phone" => self.phone.clone(),
            "alternatePhone" => self.alternate_phone.clone(),
            _ => None,
        }
    }
}

impl FieldSource for BankingDetailsPayload {
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "bankName" => self.bank_name.clone(),
            "accountNumber" => self.account_number.clone(),
            "ifscCode" => self.ifsc_code.clone(),
            "accountHolderName" => self.account_holder_name.clone(),
            "accountType" => self.account_type.clone(),
            "branchName" => self.branch_name.clone(),
            "requestedCreditLimit" => self.requested_credit_limit.clone(),
            _ => None,
        }
    }
}

impl FieldSource for FileUploadPayload {
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "fileName" => self.file_name.clone(),
            "fileSize" => self.file_size.map(|s| s.to_string()),
            "fileType" => self.file_type.clone(),
            "fileUrl" => self.file_url.clone(),
            "base64Data" => self.base64_data.clone(),
            _ => None,
        }
    }
}
