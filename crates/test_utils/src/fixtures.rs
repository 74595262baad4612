//! Pre-built Test Fixtures
//!
//! Ready-to-use onboarding data. Every value here passes the validation
//! rules, so tests only spell out the part they break.

use chrono::{DateTime, TimeZone, Utc};

use domain_onboarding::{
    ApplicationPayload, BankingDetailsPayload, BusinessAddressPayload,
    CompanyRegistrationPayload, ContactPersonPayload, DocumentCategory, DocumentsPayload,
    FileUploadPayload,
};

/// Tax identifiers
pub struct IdentifierFixtures;

impl IdentifierFixtures {
    /// A well formed GST number (Maharashtra)
    pub fn gst_number() -> &'static str {
        "27AAAPL1234C1Z5"
    }

    /// The PAN embedded in [`IdentifierFixtures::gst_number`]
    pub fn pan_number() -> &'static str {
        "AAAPL1234C"
    }

    /// Distinct, well formed GST/PAN pair for index `n`
    pub fn pair(n: u16) -> (String, String) {
        (format!("27AAAPL{:04}C1Z5", n), format!("AAAPL{:04}C", n))
    }

    pub fn ifsc_code() -> &'static str {
        "HDFC0001234"
    }

    pub fn account_number() -> &'static str {
        "50100012345678"
    }
}

/// Document slots
pub struct DocumentFixtures;

impl DocumentFixtures {
    /// `%PDF-1.4 test` in standard base64
    pub const INLINE_PDF_BASE64: &'static str = "JVBERi0xLjQgdGVzdA==";
    pub const INLINE_PDF_LEN: i64 = 13;

    /// A slot pointing at an already uploaded PDF
    pub fn uploaded(category: DocumentCategory) -> FileUploadPayload {
        FileUploadPayload {
            file_name: Some(format!("{}.pdf", category.slug())),
            file_size: Some(4096),
            file_type: Some("application/pdf".to_string()),
            file_url: Some(format!("https://files.example/{}.pdf", category.slug())),
            ..Default::default()
        }
    }

    /// A slot carrying its content inline
    pub fn inline(category: DocumentCategory) -> FileUploadPayload {
        FileUploadPayload {
            file_name: Some(format!("{}.pdf", category.slug())),
            file_size: Some(Self::INLINE_PDF_LEN),
            file_type: Some("application/pdf".to_string()),
            base64_data: Some(Self::INLINE_PDF_BASE64.to_string()),
            ..Default::default()
        }
    }

    /// All six categories, uploaded
    pub fn complete() -> DocumentsPayload {
        let mut documents = DocumentsPayload::default();
        for category in DocumentCategory::ALL {
            documents.set(category, Some(Self::uploaded(category)));
        }
        documents
    }
}

/// Whole submissions
pub struct PayloadFixtures;

impl PayloadFixtures {
    /// A submission that passes every rule
    pub fn valid() -> ApplicationPayload {
        Self::with_identifiers(IdentifierFixtures::gst_number(), IdentifierFixtures::pan_number())
    }

    /// A valid submission carrying the given identifiers
    pub fn with_identifiers(gst_number: &str, pan_number: &str) -> ApplicationPayload {
        ApplicationPayload {
            company_registration: Some(CompanyRegistrationPayload {
                legal_name: Some("Acme Traders Private Limited".to_string()),
                trade_name: Some("Acme Traders".to_string()),
                gst_number: Some(gst_number.to_string()),
                pan_number: Some(pan_number.to_string()),
                incorporation_date: Some("2015-06-01".to_string()),
                business_type: Some("wholesaler".to_string()),
                annual_turnover: Some("25000000".to_string()),
                number_of_employees: Some("51-200".to_string()),
                website: Some("https://acme-traders.example".to_string()),
            }),
            business_address: Some(BusinessAddressPayload {
                address_line1: Some("Plot 7, MIDC Industrial Area".to_string()),
                address_line2: None,
                city: Some("Pune".to_string()),
                state: Some("Maharashtra".to_string()),
                pincode: Some("411019".to_string()),
                country: Some("India".to_string()),
            }),
            contact_person: Some(ContactPersonPayload {
                full_name: Some("Priya Sharma".to_string()),
                designation: Some("Finance Director".to_string()),
                email: Some("priya.sharma@acme.example".to_string()),
                phone: Some("9876543210".to_string()),
                alternate_phone: None,
            }),
            banking_details: Some(BankingDetailsPayload {
                bank_name: Some("HDFC Bank".to_string()),
                account_number: Some(IdentifierFixtures::account_number().to_string()),
                ifsc_code: Some(IdentifierFixtures::ifsc_code().to_string()),
                account_holder_name: Some("Acme Traders Private Limited".to_string()),
                account_type: Some("current".to_string()),
                branch_name: Some("Pimpri".to_string()),
                requested_credit_limit: Some("1000000".to_string()),
            }),
            documents: Some(DocumentFixtures::complete()),
        }
    }
}

/// Fixed instants
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Submission instant used by builders (Mar 1, 2024 09:30 UTC)
    pub fn submitted_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }
}

/// Reviewer identities
pub struct ReviewerFixtures;

impl ReviewerFixtures {
    pub fn reviewer() -> &'static str {
        "reviewer@onboarding.example"
    }

    pub fn rejection_reason() -> &'static str {
        "GST certificate does not match the registered legal name"
    }
}
