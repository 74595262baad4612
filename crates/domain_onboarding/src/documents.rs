//! Supporting documents
//!
//! An application needs one resolvable document in each of six categories.
//! A slot resolves either to a URL already known to the file transfer
//! collaborator or to inline content that is uploaded during submission.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{OnboardingError, ValidationErrors};

/// Largest accepted document, in bytes (10 MiB)
pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

/// Required document categories, in reporting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentCategory {
    GstCertificate,
    PanCard,
    IncorporationCertificate,
    BankStatement,
    AddressProof,
    CancelledCheque,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 6] = [
        DocumentCategory::GstCertificate,
        DocumentCategory::PanCard,
        DocumentCategory::IncorporationCertificate,
        DocumentCategory::BankStatement,
        DocumentCategory::AddressProof,
        DocumentCategory::CancelledCheque,
    ];

    /// Wire name, also used as the field name under `documents`
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::GstCertificate => "gstCertificate",
            DocumentCategory::PanCard => "panCard",
            DocumentCategory::IncorporationCertificate => "incorporationCertificate",
            DocumentCategory::BankStatement => "bankStatement",
            DocumentCategory::AddressProof => "addressProof",
            DocumentCategory::CancelledCheque => "cancelledCheque",
        }
    }

    /// Directory segment used by file stores
    pub fn slug(&self) -> &'static str {
        match self {
            DocumentCategory::GstCertificate => "gst-certificate",
            DocumentCategory::PanCard => "pan-card",
            DocumentCategory::IncorporationCertificate => "incorporation-certificate",
            DocumentCategory::BankStatement => "bank-statement",
            DocumentCategory::AddressProof => "address-proof",
            DocumentCategory::CancelledCheque => "cancelled-cheque",
        }
    }

    /// Dotted path of this slot in a submission payload
    pub fn field_path(&self) -> String {
        format!("documents.{}", self.as_str())
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        DocumentCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed) || c.slug() == trimmed)
            .ok_or_else(|| format!("Unknown document type: {}", s))
    }
}

/// Decoded document content awaiting upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub category: DocumentCategory,
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(
        category: DocumentCategory,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            category,
            file_name: file_name.into(),
            content_type: content_type.into(),
            content,
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// What a submission supplied for one slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentReference {
    /// URL of an already transferred document
    pub file_url: Option<String>,
    /// Inline content still to be transferred
    pub upload: Option<DocumentUpload>,
}

impl DocumentReference {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            file_url: Some(url.into()),
            upload: None,
        }
    }

    pub fn inline(upload: DocumentUpload) -> Self {
        Self {
            file_url: None,
            upload: Some(upload),
        }
    }

    /// A URL or inline content is present
    pub fn is_resolvable(&self) -> bool {
        self.url().is_some() || self.upload.is_some()
    }

    /// Non-blank URL, if any
    pub fn url(&self) -> Option<&str> {
        self.file_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Validated document slots of a submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSet {
    slots: Vec<(DocumentCategory, DocumentReference)>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: DocumentCategory, reference: DocumentReference) {
        match self.slots.iter_mut().find(|(c, _)| *c == category) {
            Some(slot) => slot.1 = reference,
            None => self.slots.push((category, reference)),
        }
    }

    pub fn with(mut self, category: DocumentCategory, reference: DocumentReference) -> Self {
        self.insert(category, reference);
        self
    }

    pub fn get(&self, category: DocumentCategory) -> Option<&DocumentReference> {
        self.slots.iter().find(|(c, _)| *c == category).map(|(_, r)| r)
    }

    pub fn get_mut(&mut self, category: DocumentCategory) -> Option<&mut DocumentReference> {
        self.slots
            .iter_mut()
            .find(|(c, _)| *c == category)
            .map(|(_, r)| r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocumentCategory, &DocumentReference)> {
        self.slots.iter().map(|(c, r)| (*c, r))
    }

    /// Slots that still carry inline content and no URL
    pub fn pending_uploads(&self) -> impl Iterator<Item = &DocumentUpload> {
        self.slots
            .iter()
            .filter(|(_, r)| r.url().is_none())
            .filter_map(|(_, r)| r.upload.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Resolved document URLs stored on an application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUrls {
    pub gst_certificate: Option<String>,
    pub pan_card: Option<String>,
    pub incorporation_certificate: Option<String>,
    pub bank_statement: Option<String>,
    pub address_proof: Option<String>,
    pub cancelled_cheque: Option<String>,
}

impl DocumentUrls {
    pub fn get(&self, category: DocumentCategory) -> Option<&str> {
        let url = match category {
            DocumentCategory::GstCertificate => &self.gst_certificate,
            DocumentCategory::PanCard => &self.pan_card,
            DocumentCategory::IncorporationCertificate => &self.incorporation_certificate,
            DocumentCategory::BankStatement => &self.bank_statement,
            DocumentCategory::AddressProof => &self.address_proof,
            DocumentCategory::CancelledCheque => &self.cancelled_cheque,
        };
        url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    pub fn set(&mut self, category: DocumentCategory, url: Option<String>) {
        let slot = match category {
            DocumentCategory::GstCertificate => &mut self.gst_certificate,
            DocumentCategory::PanCard => &mut self.pan_card,
            DocumentCategory::IncorporationCertificate => &mut self.incorporation_certificate,
            DocumentCategory::BankStatement => &mut self.bank_statement,
            DocumentCategory::AddressProof => &mut self.address_proof,
            DocumentCategory::CancelledCheque => &mut self.cancelled_cheque,
        };
        *slot = url;
    }

    /// Categories without a usable URL, in category order
    pub fn missing(&self) -> Vec<DocumentCategory> {
        DocumentCategory::ALL
            .into_iter()
            .filter(|c| self.get(*c).is_none())
            .collect()
    }
}

/// Document completeness rules
pub struct DocumentChecker;

impl DocumentChecker {
    /// Categories that have neither a URL nor inline content
    ///
    /// Evaluated before any upload so a submission that can never become
    /// complete does not transfer files.
    pub fn unresolvable(documents: &DocumentSet) -> Vec<DocumentCategory> {
        DocumentCategory::ALL
            .into_iter()
            .filter(|c| !documents.get(*c).is_some_and(DocumentReference::is_resolvable))
            .collect()
    }

    /// Resolves every category to its URL or reports all missing categories
    pub fn check(documents: &DocumentSet) -> Result<DocumentUrls, OnboardingError> {
        let mut urls = DocumentUrls::default();
        for category in DocumentCategory::ALL {
            let url = documents.get(category).and_then(|r| r.url()).map(str::to_string);
            urls.set(category, url);
        }
        Self::check_urls(&urls)?;
        Ok(urls)
    }

    /// Fails with every category lacking a URL
    pub fn check_urls(urls: &DocumentUrls) -> Result<(), OnboardingError> {
        let missing = urls.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(OnboardingError::IncompleteDocuments { missing })
        }
    }
}

/// Content rules applied before anything is handed to file transfer
pub struct UploadPolicy;

impl UploadPolicy {
    /// `application/pdf` or any `image/*` subtype
    pub fn accepts_content_type(content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        essence == "application/pdf"
            || essence
                .strip_prefix("image/")
                .is_some_and(|subtype| !subtype.is_empty())
    }

    pub fn check(upload: &DocumentUpload) -> Result<(), ValidationErrors> {
        let path = upload.category.field_path();
        let mut errors = ValidationErrors::new();

        if upload.file_name.trim().is_empty() {
            errors.add(
                format!("{}.fileName", path),
                "file_name.required",
                "File name is required",
            );
        }
        if upload.content.is_empty() {
            errors.add(
                format!("{}.fileSize", path),
                "file_size.range",
                "File must not be empty",
            );
        } else if upload.size() > MAX_DOCUMENT_BYTES {
            errors.add(
                format!("{}.fileSize", path),
                "file_size.range",
                "File size must not exceed 10MB",
            );
        }
        if !Self::accepts_content_type(&upload.content_type) {
            errors.add(
                format!("{}.fileType", path),
                "file_type.unsupported",
                "Only PDF and image files are allowed",
            );
        }

        errors.into_result(())
    }
}
