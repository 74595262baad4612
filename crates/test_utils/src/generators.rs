//! Property-Based Test Generators
//!
//! proptest strategies for identifiers and field values that satisfy the
//! validation rules, plus statuses, document subsets and transition walks.

use proptest::prelude::*;

use domain_onboarding::{ApplicationStatus, DocumentCategory};

/// Well formed GST numbers: state code, embedded PAN, entity code, `Z`, checksum
pub fn gst_number_strategy() -> impl Strategy<Value = String> {
    (
        "[0-9]{2}",
        pan_number_strategy(),
        "[1-9A-Z]",
        "[0-9A-Z]",
    )
        .prop_map(|(state, pan, entity, check)| format!("{}{}{}Z{}", state, pan, entity, check))
}

/// Well formed PANs
pub fn pan_number_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{5}[0-9]{4}[A-Z]"
}

/// Strings that are never a well formed PAN
pub fn malformed_pan_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Z]{4}[0-9]{4}[A-Z]",
        "[A-Z]{5}[0-9]{5}",
        "[0-9]{10}",
        "[A-Z]{5}[0-9]{4}[A-Z]{2}",
    ]
}

pub fn pincode_strategy() -> impl Strategy<Value = String> {
    "[1-9][0-9]{5}"
}

pub fn phone_strategy() -> impl Strategy<Value = String> {
    "[6-9][0-9]{9}"
}

pub fn ifsc_code_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{4}0[A-Z0-9]{6}"
}

pub fn account_number_strategy() -> impl Strategy<Value = String> {
    "[0-9]{9,18}"
}

/// Random casing and surrounding blanks, which normalization must undo
pub fn untidy_strategy(value: String) -> impl Strategy<Value = String> {
    (
        proptest::collection::vec(any::<bool>(), value.len()),
        "[ \t]{0,3}",
        "[ \t]{0,3}",
    )
        .prop_map(move |(lower, lead, trail)| {
            let body: String = value
                .chars()
                .zip(lower)
                .map(|(c, l)| if l { c.to_ascii_lowercase() } else { c })
                .collect();
            format!("{}{}{}", lead, body, trail)
        })
}

pub fn status_strategy() -> impl Strategy<Value = ApplicationStatus> {
    proptest::sample::select(ApplicationStatus::ALL.to_vec())
}

/// Any subset of the document categories, in category order
pub fn document_subset_strategy() -> impl Strategy<Value = Vec<DocumentCategory>> {
    proptest::sample::subsequence(DocumentCategory::ALL.to_vec(), 0..=DocumentCategory::ALL.len())
}

/// Sequences of requested target statuses, legal or not
pub fn transition_walk_strategy(max_len: usize) -> impl Strategy<Value = Vec<ApplicationStatus>> {
    proptest::collection::vec(status_strategy(), 0..=max_len)
}
