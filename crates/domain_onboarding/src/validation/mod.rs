//! Submission validation
//!
//! [`ApplicationValidator`] normalizes a raw [`ApplicationPayload`], runs
//! the rule table over every section, and either returns the typed
//! sections with their document slots or every violation it found.

pub mod rules;

use std::collections::HashMap;

use crate::application::{
    ApplicationSections, BankingDetails, BusinessAddress, CompanyRegistration, ContactPerson,
};
use crate::documents::{DocumentCategory, DocumentReference, DocumentSet, DocumentUpload};
use crate::error::ValidationErrors;
use crate::payload::{ApplicationPayload, DocumentsPayload, FieldSource, FileUploadPayload};

use rules::{
    decode_base64, parse_amount, parse_date, rules_for, FieldRules, BANKING_DETAILS_RULES,
    BUSINESS_ADDRESS_RULES, COMPANY_REGISTRATION_RULES, CONTACT_PERSON_RULES, DOCUMENT_RULES,
};

/// Output of a successful validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedApplication {
    pub sections: ApplicationSections,
    pub documents: DocumentSet,
}

/// Normalized values of one section that passed their checks
struct SectionValues(HashMap<&'static str, String>);

impl SectionValues {
    fn take(&mut self, field: &str) -> Option<String> {
        self.0.remove(field)
    }
}

/// Evaluates every rule of `table` against `source`
fn evaluate_section(
    prefix: &str,
    table: &'static [FieldRules],
    source: &impl FieldSource,
    errors: &mut ValidationErrors,
) -> SectionValues {
    let values = table
        .iter()
        .filter_map(|rules| {
            let raw = source.field(rules.field);
            rules
                .evaluate(prefix, raw.as_deref(), errors)
                .map(|value| (rules.field, value))
        })
        .collect();
    SectionValues(values)
}

/// Validates the section at `prefix`, reporting a missing section once
fn section<S: FieldSource, T>(
    prefix: &str,
    payload: Option<&S>,
    table: &'static [FieldRules],
    errors: &mut ValidationErrors,
    build: impl FnOnce(SectionValues) -> Option<T>,
) -> Option<T> {
    let Some(source) = payload else {
        errors.add(prefix, "required", format!("{} is required", prefix));
        return None;
    };
    let mut section_errors = ValidationErrors::new();
    let values = evaluate_section(prefix, table, source, &mut section_errors);
    let clean = section_errors.is_empty();
    errors.merge(section_errors);
    if clean {
        build(values)
    } else {
        None
    }
}

pub struct ApplicationValidator;

impl ApplicationValidator {
    /// Validates a complete submission
    pub fn validate(payload: &ApplicationPayload) -> Result<ValidatedApplication, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let company = section(
            "companyRegistration",
            payload.company_registration.as_ref(),
            COMPANY_REGISTRATION_RULES,
            &mut errors,
            |mut v| {
                Some(CompanyRegistration {
                    legal_name: v.take("legalName")?,
                    trade_name: v.take("tradeName")?,
                    gst_number: v.take("gstNumber")?,
                    pan_number: v.take("panNumber")?,
                    incorporation_date: parse_date(&v.take("incorporationDate")?)?,
                    business_type: v.take("businessType")?.parse().ok()?,
                    annual_turnover: parse_amount(&v.take("annualTurnover")?)?,
                    number_of_employees: v.take("numberOfEmployees")?,
                    website: v.take("website"),
                })
            },
        );

        let address = section(
            "businessAddress",
            payload.business_address.as_ref(),
            BUSINESS_ADDRESS_RULES,
            &mut errors,
            |mut v| {
                Some(BusinessAddress {
                    address_line1: v.take("addressLine1")?,
                    address_line2: v.take("addressLine2"),
                    city: v.take("city")?,
                    state: v.take("state")?,
                    pincode: v.take("pincode")?,
                    country: v.take("country")?,
                })
            },
        );

        let contact = section(
            "contactPerson",
            payload.contact_person.as_ref(),
            CONTACT_PERSON_RULES,
            &mut errors,
            |mut v| {
                Some(ContactPerson {
                    full_name: v.take("fullName")?,
                    designation: v.take("designation")?,
                    email: v.take("email")?,
                    phone: v.take("phone")?,
                    alternate_phone: v.take("alternatePhone"),
                })
            },
        );

        let banking = section(
            "bankingDetails",
            payload.banking_details.as_ref(),
            BANKING_DETAILS_RULES,
            &mut errors,
            |mut v| {
                let requested_credit_limit = match v.take("requestedCreditLimit") {
                    Some(raw) => Some(parse_amount(&raw)?),
                    None => None,
                };
                Some(BankingDetails {
                    bank_name: v.take("bankName")?,
                    account_number: v.take("accountNumber")?,
                    ifsc_code: v.take("ifscCode")?,
                    account_holder_name: v.take("accountHolderName")?,
                    account_type: v.take("accountType")?.parse().ok()?,
                    branch_name: v.take("branchName")?,
                    requested_credit_limit,
                })
            },
        );

        let documents = match payload.documents.as_ref() {
            Some(documents) => Self::validate_documents(documents)
                .map_err(|doc_errors| errors.merge(doc_errors))
                .ok(),
            None => Some(DocumentSet::new()),
        };

        match (company, address, contact, banking, documents) {
            (Some(company), Some(address), Some(contact), Some(banking), Some(documents))
                if errors.is_empty() =>
            {
                Ok(ValidatedApplication {
                    sections: ApplicationSections {
                        company,
                        address,
                        contact,
                        banking,
                    },
                    documents,
                })
            }
            _ => {
                if errors.is_empty() {
                    errors.add("application", "invalid", "Application could not be validated");
                }
                Err(errors)
            }
        }
    }

    /// Validates the document slots that carry a URL or inline content
    ///
    /// Slots with neither are left out of the set; whether a category is
    /// missing is for [`crate::documents::DocumentChecker`] to report.
    pub fn validate_documents(documents: &DocumentsPayload) -> Result<DocumentSet, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut set = DocumentSet::new();

        for category in DocumentCategory::ALL {
            let Some(file) = documents.get(category).filter(|f| Self::has_content(f)) else {
                continue;
            };
            if let Some(reference) = Self::document_slot(category, file, &mut errors) {
                set.insert(category, reference);
            }
        }

        errors.into_result(set)
    }

    fn has_content(file: &FileUploadPayload) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&file.file_url) || present(&file.base64_data)
    }

    fn document_slot(
        category: DocumentCategory,
        file: &FileUploadPayload,
        errors: &mut ValidationErrors,
    ) -> Option<DocumentReference> {
        let prefix = category.field_path();
        let mut slot_errors = ValidationErrors::new();
        let mut values = evaluate_section(&prefix, DOCUMENT_RULES, file, &mut slot_errors);
        if !slot_errors.is_empty() {
            errors.merge(slot_errors);
            return None;
        }

        let file_name = values.take("fileName")?;
        let content_type = values.take("fileType")?;
        let upload = values
            .take("base64Data")
            .and_then(|data| decode_base64(&data))
            .map(|content| DocumentUpload::new(category, file_name, content_type, content));

        Some(DocumentReference {
            file_url: values.take("fileUrl"),
            upload,
        })
    }

    /// Normalized identifiers that are present and well formed
    ///
    /// Used for the uniqueness pre-check, which runs before full validation.
    pub fn present_identifiers(payload: &ApplicationPayload) -> (Option<String>, Option<String>) {
        let Some(company) = payload.company_registration.as_ref() else {
            return (None, None);
        };
        let well_formed = |field: &str| {
            let rules = rules_for(COMPANY_REGISTRATION_RULES, field)?;
            let mut scratch = ValidationErrors::new();
            rules.evaluate("companyRegistration", company.field(field).as_deref(), &mut scratch)
        };
        (well_formed("gstNumber"), well_formed("panNumber"))
    }

    /// Validates a single identifier field against the company rules
    pub fn check_identifier(field: &str, raw: &str) -> Result<String, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let value = rules_for(COMPANY_REGISTRATION_RULES, field)
            .and_then(|rules| rules.evaluate("companyRegistration", Some(raw), &mut errors));
        match value {
            Some(value) if errors.is_empty() => Ok(value),
            _ => {
                if errors.is_empty() {
                    errors.add(field, "unknown_field", format!("Unknown field {}", field));
                }
                Err(errors)
            }
        }
    }

    /// Validates an account number and routing code pair
    pub fn check_bank_account(
        account_number: &str,
        ifsc_code: &str,
    ) -> Result<(String, String), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut evaluate = |field: &str, raw: &str| {
            rules_for(BANKING_DETAILS_RULES, field)
                .and_then(|rules| rules.evaluate("bankingDetails", Some(raw), &mut errors))
        };
        let account = evaluate("accountNumber", account_number);
        let ifsc = evaluate("ifscCode", ifsc_code);
        match (account, ifsc) {
            (Some(account), Some(ifsc)) => Ok((account, ifsc)),
            _ => Err(errors),
        }
    }
}
