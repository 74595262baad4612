//! Field rule table
//!
//! Each [`FieldRules`] entry names a field relative to its section, how the
//! raw value is normalized, and the ordered checks it must pass. The tables
//! are plain data and can be evaluated one field at a time.

use base64::Engine;
use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use validator::ValidateEmail;

use crate::application::{AccountType, BusinessType};
use crate::documents::{UploadPolicy, MAX_DOCUMENT_BYTES};
use crate::error::ValidationErrors;

pub static GST_NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]$")
        .expect("GST number pattern should always compile")
});

pub static PAN_NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("PAN pattern should always compile")
});

pub static PINCODE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[1-9][0-9]{5}$").expect("pincode pattern should always compile")
});

pub static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[6-9][0-9]{9}$").expect("phone pattern should always compile")
});

pub static IFSC_CODE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{4}0[A-Z0-9]{6}$").expect("IFSC pattern should always compile")
});

pub static ACCOUNT_NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{9,18}$").expect("account number pattern should always compile")
});

pub static DIGITS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("digits pattern should always compile"));

pub static WEBSITE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?([\da-z.-]+)\.([a-z.]{2,6})([/\w .-]*)*/?$")
        .expect("website pattern should always compile")
});

/// Digits allowed before the decimal point of a `NUMERIC(15,2)` column
const MAX_AMOUNT_DIGITS: usize = 13;

/// How a raw value is cleaned before its checks run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalize {
    Trim,
    /// Trim and upper-case; used for identifiers
    TrimUpper,
}

pub enum Rule {
    Required,
    /// Inclusive bounds on the character count
    Length { min: usize, max: usize },
    Pattern(&'static Lazy<Regex>),
    OneOf(&'static [&'static str]),
    Predicate(fn(&str) -> bool),
}

impl Rule {
    fn passes(&self, value: &str) -> bool {
        match self {
            Rule::Required => !value.is_empty(),
            Rule::Length { min, max } => {
                let len = value.chars().count();
                len >= *min && len <= *max
            }
            Rule::Pattern(pattern) => pattern.is_match(value),
            Rule::OneOf(allowed) => allowed.contains(&value),
            Rule::Predicate(check) => check(value),
        }
    }
}

pub struct Check {
    pub rule: Rule,
    pub code: &'static str,
    pub message: &'static str,
}

pub struct FieldRules {
    /// Field name relative to its section, e.g. `gstNumber`
    pub field: &'static str,
    pub normalize: Normalize,
    pub checks: &'static [Check],
}

impl FieldRules {
    pub fn is_required(&self) -> bool {
        self.checks.iter().any(|c| matches!(c.rule, Rule::Required))
    }

    /// Trims (and upper-cases identifiers); blank becomes `None`
    pub fn normalize(&self, raw: Option<&str>) -> Option<String> {
        let trimmed = raw.map(str::trim).filter(|v| !v.is_empty())?;
        Some(match self.normalize {
            Normalize::Trim => trimmed.to_string(),
            Normalize::TrimUpper => trimmed.to_ascii_uppercase(),
        })
    }

    /// Runs every check against `raw`, reporting failures under
    /// `<prefix>.<field>`
    ///
    /// Returns the normalized value when it is present and passed every
    /// check. A missing required value produces only its `Required`
    /// violation; a missing optional value produces none.
    pub fn evaluate(
        &self,
        prefix: &str,
        raw: Option<&str>,
        errors: &mut ValidationErrors,
    ) -> Option<String> {
        let path = format!("{}.{}", prefix, self.field);
        let Some(value) = self.normalize(raw) else {
            if let Some(required) = self.checks.iter().find(|c| matches!(c.rule, Rule::Required)) {
                errors.add(path, required.code, required.message);
            }
            return None;
        };

        let mut passed = true;
        for check in self.checks {
            if !check.rule.passes(&value) {
                errors.add(path.clone(), check.code, check.message);
                passed = false;
            }
        }
        passed.then_some(value)
    }
}

/// Looks up the rules for `field` in `table`
pub fn rules_for(table: &'static [FieldRules], field: &str) -> Option<&'static FieldRules> {
    table.iter().find(|rules| rules.field == field)
}

pub fn is_valid_email(value: &str) -> bool {
    value.to_string().validate_email()
}

pub fn is_iso_date(value: &str) -> bool {
    parse_date(value).is_some()
}

/// Unparseable dates pass here and are reported by [`is_iso_date`]
pub fn is_not_in_future(value: &str) -> bool {
    parse_date(value).map_or(true, |date| date <= Utc::now().date_naive())
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Digits that fit the amount columns; non-digit input is left to the
/// digits pattern
pub fn fits_amount(value: &str) -> bool {
    if !DIGITS_PATTERN.is_match(value) {
        return true;
    }
    value.trim_start_matches('0').len() <= MAX_AMOUNT_DIGITS
}

pub fn parse_amount(value: &str) -> Option<Decimal> {
    Decimal::from_str(value).ok().map(|mut amount| {
        amount.rescale(2);
        amount
    })
}

pub fn is_within_upload_limit(value: &str) -> bool {
    value
        .parse::<u64>()
        .is_ok_and(|size| (1..=MAX_DOCUMENT_BYTES).contains(&size))
}

pub fn is_accepted_content_type(value: &str) -> bool {
    UploadPolicy::accepts_content_type(value)
}

pub fn is_base64(value: &str) -> bool {
    decode_base64(value).is_some()
}

/// Decodes standard base64, tolerating a `data:<mime>;base64,` prefix
pub fn decode_base64(value: &str) -> Option<Vec<u8>> {
    let data = match value.split_once(";base64,") {
        Some((header, data)) if header.starts_with("data:") => data,
        _ => value,
    };
    base64::engine::general_purpose::STANDARD.decode(data.trim()).ok()
}

const REQUIRED: Rule = Rule::Required;

pub static COMPANY_REGISTRATION_RULES: &[FieldRules] = &[
    FieldRules {
        field: "legalName",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Legal name is required" },
            Check {
                rule: Rule::Length { min: 3, max: 200 },
                code: "length",
                message: "Legal name must be between 3 and 200 characters",
            },
        ],
    },
    FieldRules {
        field: "tradeName",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Trade name is required" },
            Check {
                rule: Rule::Length { min: 3, max: 200 },
                code: "length",
                message: "Trade name must be between 3 and 200 characters",
            },
        ],
    },
    FieldRules {
        field: "gstNumber",
        normalize: Normalize::TrimUpper,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "GST number is required" },
            Check {
                rule: Rule::Pattern(&GST_NUMBER_PATTERN),
                code: "gst_number.pattern",
                message: "Invalid GST number format",
            },
        ],
    },
    FieldRules {
        field: "panNumber",
        normalize: Normalize::TrimUpper,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "PAN number is required" },
            Check {
                rule: Rule::Pattern(&PAN_NUMBER_PATTERN),
                code: "pan_number.pattern",
                message: "Invalid PAN number format",
            },
        ],
    },
    FieldRules {
        field: "incorporationDate",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Incorporation date is required" },
            Check {
                rule: Rule::Predicate(is_iso_date),
                code: "incorporation_date.format",
                message: "Incorporation date must be a date in YYYY-MM-DD format",
            },
            Check {
                rule: Rule::Predicate(is_not_in_future),
                code: "incorporation_date.future",
                message: "Incorporation date cannot be in the future",
            },
        ],
    },
    FieldRules {
        field: "businessType",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Business type is required" },
            Check {
                rule: Rule::OneOf(BusinessType::WIRE_NAMES),
                code: "business_type.one_of",
                message: "Business type must be manufacturer, wholesaler, distributor or retailer",
            },
        ],
    },
    FieldRules {
        field: "annualTurnover",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Annual turnover is required" },
            Check {
                rule: Rule::Pattern(&DIGITS_PATTERN),
                code: "annual_turnover.digits",
                message: "Annual turnover must contain only digits",
            },
            Check {
                rule: Rule::Predicate(fits_amount),
                code: "annual_turnover.range",
                message: "Annual turnover is too large",
            },
        ],
    },
    FieldRules {
        field: "numberOfEmployees",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Number of employees is required" },
            Check {
                rule: Rule::Length { min: 1, max: 50 },
                code: "length",
                message: "Number of employees must not exceed 50 characters",
            },
        ],
    },
    FieldRules {
        field: "website",
        normalize: Normalize::Trim,
        checks: &[
            Check {
                rule: Rule::Pattern(&WEBSITE_PATTERN),
                code: "website.pattern",
                message: "Invalid website URL",
            },
            Check {
                rule: Rule::Length { min: 1, max: 255 },
                code: "length",
                message: "Website must not exceed 255 characters",
            },
        ],
    },
];

pub static BUSINESS_ADDRESS_RULES: &[FieldRules] = &[
    FieldRules {
        field: "addressLine1",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Address line 1 is required" },
            Check {
                rule: Rule::Length { min: 5, max: 200 },
                code: "length",
                message: "Address line 1 must be between 5 and 200 characters",
            },
        ],
    },
    FieldRules {
        field: "addressLine2",
        normalize: Normalize::Trim,
        checks: &[Check {
            rule: Rule::Length { min: 1, max: 200 },
            code: "length",
            message: "Address line 2 must not exceed 200 characters",
        }],
    },
    FieldRules {
        field: "city",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "City is required" },
            Check {
                rule: Rule::Length { min: 2, max: 100 },
                code: "length",
                message: "City must be between 2 and 100 characters",
            },
        ],
    },
    FieldRules {
        field: "state",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "State is required" },
            Check {
                rule: Rule::Length { min: 2, max: 100 },
                code: "length",
                message: "State must be between 2 and 100 characters",
            },
        ],
    },
    FieldRules {
        field: "pincode",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Pincode is required" },
            Check {
                rule: Rule::Pattern(&PINCODE_PATTERN),
                code: "pincode.pattern",
                message: "Invalid pincode",
            },
        ],
    },
    FieldRules {
        field: "country",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Country is required" },
            Check {
                rule: Rule::Length { min: 1, max: 100 },
                code: "length",
                message: "Country must not exceed 100 characters",
            },
        ],
    },
];

pub static CONTACT_PERSON_RULES: &[FieldRules] = &[
    FieldRules {
        field: "fullName",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Full name is required" },
            Check {
                rule: Rule::Length { min: 3, max: 100 },
                code: "length",
                message: "Full name must be between 3 and 100 characters",
            },
        ],
    },
    FieldRules {
        field: "designation",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Designation is required" },
            Check {
                rule: Rule::Length { min: 2, max: 100 },
                code: "length",
                message: "Designation must be between 2 and 100 characters",
            },
        ],
    },
    FieldRules {
        field: "email",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Email is required" },
            Check {
                rule: Rule::Predicate(is_valid_email),
                code: "email.format",
                message: "Invalid email format",
            },
            Check {
                rule: Rule::Length { min: 1, max: 100 },
                code: "length",
                message: "Email must not exceed 100 characters",
            },
        ],
    },
    FieldRules {
        field: "phone",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Phone number is required" },
            Check {
                rule: Rule::Pattern(&PHONE_PATTERN),
                code: "phone.pattern",
                message: "Invalid phone number",
            },
        ],
    },
    FieldRules {
        field: "alternatePhone",
        normalize: Normalize::Trim,
        checks: &[Check {
            rule: Rule::Pattern(&PHONE_PATTERN),
            code: "phone.pattern",
            message: "Invalid alternate phone number",
        }],
    },
];

pub static BANKING_DETAILS_RULES: &[FieldRules] = &[
    FieldRules {
        field: "bankName",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Bank name is required" },
            Check {
                rule: Rule::Length { min: 3, max: 100 },
                code: "length",
                message: "Bank name must be between 3 and 100 characters",
            },
        ],
    },
    FieldRules {
        field: "accountNumber",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Account number is required" },
            Check {
                rule: Rule::Pattern(&ACCOUNT_NUMBER_PATTERN),
                code: "account_number.pattern",
                message: "Account number must be 9 to 18 digits",
            },
        ],
    },
    FieldRules {
        field: "ifscCode",
        normalize: Normalize::TrimUpper,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "IFSC code is required" },
            Check {
                rule: Rule::Pattern(&IFSC_CODE_PATTERN),
                code: "ifsc_code.pattern",
                message: "Invalid IFSC code",
            },
        ],
    },
    FieldRules {
        field: "accountHolderName",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Account holder name is required" },
            Check {
                rule: Rule::Length { min: 3, max: 200 },
                code: "length",
                message: "Account holder name must be between 3 and 200 characters",
            },
        ],
    },
    FieldRules {
        field: "accountType",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Account type is required" },
            Check {
                rule: Rule::OneOf(AccountType::WIRE_NAMES),
                code: "account_type.one_of",
                message: "Account type must be current or savings",
            },
        ],
    },
    FieldRules {
        field: "branchName",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "Branch name is required" },
            Check {
                rule: Rule::Length { min: 3, max: 200 },
                code: "length",
                message: "Branch name must be between 3 and 200 characters",
            },
        ],
    },
    FieldRules {
        field: "requestedCreditLimit",
        normalize: Normalize::Trim,
        checks: &[
            Check {
                rule: Rule::Pattern(&DIGITS_PATTERN),
                code: "requested_credit_limit.digits",
                message: "Requested credit limit must contain only digits",
            },
            Check {
                rule: Rule::Predicate(fits_amount),
                code: "requested_credit_limit.range",
                message: "Requested credit limit is too large",
            },
        ],
    },
];

/// Rules for one document slot, relative to `documents.<category>`
pub static DOCUMENT_RULES: &[FieldRules] = &[
    FieldRules {
        field: "fileName",
        normalize: Normalize::Trim,
        checks: &[Check { rule: REQUIRED, code: "required", message: "File name is required" }],
    },
    FieldRules {
        field: "fileSize",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "File size is required" },
            Check {
                rule: Rule::Predicate(is_within_upload_limit),
                code: "file_size.range",
                message: "File size must be between 1 byte and 10MB",
            },
        ],
    },
    FieldRules {
        field: "fileType",
        normalize: Normalize::Trim,
        checks: &[
            Check { rule: REQUIRED, code: "required", message: "File type is required" },
            Check {
                rule: Rule::Predicate(is_accepted_content_type),
                code: "file_type.unsupported",
                message: "Only PDF and image files are allowed",
            },
        ],
    },
    FieldRules {
        field: "fileUrl",
        normalize: Normalize::Trim,
        checks: &[],
    },
    FieldRules {
        field: "base64Data",
        normalize: Normalize::Trim,
        checks: &[Check {
            rule: Rule::Predicate(is_base64),
            code: "base64_data.encoding",
            message: "Document content is not valid base64",
        }],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluate(table: &'static [FieldRules], field: &str, raw: Option<&str>) -> (Option<String>, ValidationErrors) {
        let rules = rules_for(table, field).unwrap();
        let mut errors = ValidationErrors::new();
        let value = rules.evaluate("section", raw, &mut errors);
        (value, errors)
    }

    #[test]
    fn test_gst_number_is_normalized_before_matching() {
        let (value, errors) = evaluate(COMPANY_REGISTRATION_RULES, "gstNumber", Some(" 27aaapl1234c1z5 "));
        assert!(errors.is_empty(), "{errors}");
        assert_eq!(value.as_deref(), Some("27AAAPL1234C1Z5"));
    }

    #[test]
    fn test_gst_number_rejects_bad_format() {
        for bad in ["27AAAPL1234C0Z5", "27AAAPL1234C1X5", "2AAAPL1234C1Z5", "27AAAPL1234C1Z"] {
            let (value, errors) = evaluate(COMPANY_REGISTRATION_RULES, "gstNumber", Some(bad));
            assert!(value.is_none(), "{bad} accepted");
            assert_eq!(errors.violations()[0].code, "gst_number.pattern");
        }
    }

    #[test]
    fn test_missing_required_value_yields_single_violation() {
        for raw in [None, Some(""), Some("   ")] {
            let (_, errors) = evaluate(COMPANY_REGISTRATION_RULES, "legalName", raw);
            assert_eq!(errors.len(), 1);
            assert_eq!(errors.violations()[0].code, "required");
            assert_eq!(errors.violations()[0].field, "section.legalName");
        }
    }

    #[test]
    fn test_missing_optional_value_yields_nothing() {
        let (value, errors) = evaluate(COMPANY_REGISTRATION_RULES, "website", None);
        assert!(value.is_none());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_every_failing_check_is_reported() {
        let long_invalid = format!("{}@", "a".repeat(120));
        let (_, errors) = evaluate(CONTACT_PERSON_RULES, "email", Some(&long_invalid));
        let codes: Vec<_> = errors.violations().iter().map(|v| v.code.as_str()).collect();
        assert_eq!(codes, vec!["email.format", "length"]);
    }

    #[test]
    fn test_future_incorporation_date_rejected() {
        let tomorrow = (Utc::now().date_naive() + chrono::Days::new(1)).to_string();
        let (_, errors) = evaluate(COMPANY_REGISTRATION_RULES, "incorporationDate", Some(&tomorrow));
        assert_eq!(errors.violations()[0].code, "incorporation_date.future");

        let (_, errors) = evaluate(COMPANY_REGISTRATION_RULES, "incorporationDate", Some("01/02/2020"));
        let codes: Vec<_> = errors.violations().iter().map(|v| v.code.as_str()).collect();
        assert_eq!(codes, vec!["incorporation_date.format"]);
    }

    #[test]
    fn test_identifier_patterns() {
        assert!(PAN_NUMBER_PATTERN.is_match("AAAPL1234C"));
        assert!(!PAN_NUMBER_PATTERN.is_match("AAAPL1234"));
        assert!(IFSC_CODE_PATTERN.is_match("HDFC0001234"));
        assert!(!IFSC_CODE_PATTERN.is_match("HDFC1001234"));
        assert!(PHONE_PATTERN.is_match("9876543210"));
        assert!(!PHONE_PATTERN.is_match("5876543210"));
        assert!(PINCODE_PATTERN.is_match("400001"));
        assert!(!PINCODE_PATTERN.is_match("040001"));
        assert!(ACCOUNT_NUMBER_PATTERN.is_match("123456789"));
        assert!(!ACCOUNT_NUMBER_PATTERN.is_match("12345678"));
    }

    #[test]
    fn test_website_pattern() {
        assert!(WEBSITE_PATTERN.is_match("https://acme-traders.co.in/about"));
        assert!(WEBSITE_PATTERN.is_match("acme.com"));
        assert!(!WEBSITE_PATTERN.is_match("not a url"));
    }

    #[test]
    fn test_amount_limits() {
        assert!(fits_amount("9999999999999"));
        assert!(!fits_amount("10000000000000"));
        assert_eq!(parse_amount("5000000").unwrap().to_string(), "5000000.00");
    }

    #[test]
    fn test_upload_limit() {
        assert!(is_within_upload_limit("1"));
        assert!(is_within_upload_limit("10485760"));
        assert!(!is_within_upload_limit("0"));
        assert!(!is_within_upload_limit("10485761"));
        assert!(!is_within_upload_limit("-5"));
    }

    #[test]
    fn test_base64_accepts_data_uri() {
        assert_eq!(decode_base64("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_base64("data:application/pdf;base64,aGVsbG8=").unwrap(), b"hello");
        assert!(decode_base64("not base64!").is_none());
    }

    #[test]
    fn test_required_fields_declared() {
        assert!(rules_for(COMPANY_REGISTRATION_RULES, "gstNumber").unwrap().is_required());
        assert!(!rules_for(BUSINESS_ADDRESS_RULES, "addressLine2").unwrap().is_required());
        assert!(!rules_for(BANKING_DETAILS_RULES, "requestedCreditLimit").unwrap().is_required());
    }
}
