use crate::constants::*;
use crate::draft::{DocumentKind, EducationStage, RegistrationDraft};
use crate::sections::SectionId;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static MOBILE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10}$").unwrap());
static AADHAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{12}$").unwrap());
static PINCODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{6}$").unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").unwrap());
static ACCOUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{9,18}$").unwrap());
static IFSC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{4}0[A-Z0-9]{6}$").unwrap());

/// Outcome of validating one section. `Invalid` names the offending field
/// so the caller can point the student at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ValidationResult {
    Valid,
    Invalid { field: String, message: String },
}

impl ValidationResult {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationResult::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Validates one section of the draft. Pure: reads the draft, touches
/// nothing, and is reused unchanged for the terminal section.
pub fn validate_section(section: SectionId, draft: &RegistrationDraft) -> ValidationResult {
    match section {
        SectionId::Identity => validate_identity(draft),
        SectionId::Personal => validate_personal(draft),
        SectionId::Contact => validate_contact(draft),
        SectionId::Family => validate_family(draft),
        SectionId::Education => validate_education(draft),
        SectionId::Bank => validate_bank(draft),
        SectionId::Documents => validate_documents(draft),
        SectionId::Emergency => validate_emergency(draft),
    }
}

fn first_missing(draft: &RegistrationDraft, required: &[(&str, &str)]) -> Option<ValidationResult> {
    for (field, label) in required {
        if draft.field(field).trim().is_empty() {
            return Some(ValidationResult::invalid(field, format!("{} is required", label)));
        }
    }
    None
}

/// Format rule on a single field. Empty values pass unless `required`;
/// required presence is reported before format.
fn format_rule(
    draft: &RegistrationDraft,
    field: &str,
    label: &str,
    re: &Regex,
    expectation: &str,
    required: bool,
) -> Option<ValidationResult> {
    let value = draft.field(field).trim().to_string();
    if value.is_empty() {
        if required {
            return Some(ValidationResult::invalid(field, format!("{} is required", label)));
        }
        return None;
    }
    if !re.is_match(&value) {
        return Some(ValidationResult::invalid(
            field,
            format!("{} must be {}", label, expectation),
        ));
    }
    None
}

fn validate_identity(draft: &RegistrationDraft) -> ValidationResult {
    if let Some(failure) = first_missing(
        draft,
        &[
            (FIRST_NAME, "First name"),
            (LAST_NAME, "Last name"),
            (EMAIL, "Email"),
        ],
    ) {
        return failure;
    }
    if let Some(failure) = format_rule(
        draft,
        MOBILE_NUMBER,
        "Mobile number",
        &MOBILE_RE,
        "exactly 10 digits",
        true,
    ) {
        return failure;
    }
    if let Some(failure) = format_rule(
        draft,
        AADHAR_NUMBER,
        "Aadhar number",
        &AADHAR_RE,
        "exactly 12 digits",
        true,
    ) {
        return failure;
    }
    ValidationResult::Valid
}

fn validate_personal(draft: &RegistrationDraft) -> ValidationResult {
    let dob = draft.field(DATE_OF_BIRTH).trim().to_string();
    if dob.is_empty() {
        return ValidationResult::invalid(DATE_OF_BIRTH, "Date of birth is required");
    }
    if NaiveDate::parse_from_str(&dob, "%Y-%m-%d").is_err() {
        return ValidationResult::invalid(
            DATE_OF_BIRTH,
            "Date of birth must be a valid date (YYYY-MM-DD)",
        );
    }
    if draft.field(GENDER).trim().is_empty() {
        return ValidationResult::invalid(GENDER, "Gender is required");
    }
    ValidationResult::Valid
}

fn validate_contact(draft: &RegistrationDraft) -> ValidationResult {
    if let Some(failure) = first_missing(
        draft,
        &[
            (PERMANENT_ADDRESS_LINE, "Permanent address"),
            (PERMANENT_CITY, "Permanent address city"),
            (PERMANENT_DISTRICT, "Permanent address district"),
            (PERMANENT_STATE, "Permanent address state"),
        ],
    ) {
        return failure;
    }
    if let Some(failure) = format_rule(
        draft,
        PERMANENT_PINCODE,
        "Permanent address pincode",
        &PINCODE_RE,
        "exactly 6 digits",
        true,
    ) {
        return failure;
    }
    if let Some(failure) = first_missing(
        draft,
        &[
            (CURRENT_ADDRESS_LINE, "Current address"),
            (CURRENT_CITY, "Current address city"),
            (CURRENT_DISTRICT, "Current address district"),
            (CURRENT_STATE, "Current address state"),
        ],
    ) {
        return failure;
    }
    if let Some(failure) = format_rule(
        draft,
        CURRENT_PINCODE,
        "Current address pincode",
        &PINCODE_RE,
        "exactly 6 digits",
        true,
    ) {
        return failure;
    }
    ValidationResult::Valid
}

fn validate_family(draft: &RegistrationDraft) -> ValidationResult {
    if let Some(failure) = first_missing(
        draft,
        &[(FATHER_NAME, "Father's name"), (MOTHER_NAME, "Mother's name")],
    ) {
        return failure;
    }
    // Guardian mobile is optional but must be well-formed when given
    if let Some(failure) = format_rule(
        draft,
        GUARDIAN_MOBILE,
        "Guardian mobile number",
        &MOBILE_RE,
        "exactly 10 digits",
        false,
    ) {
        return failure;
    }
    ValidationResult::Valid
}

fn validate_education(draft: &RegistrationDraft) -> ValidationResult {
    let secondary = EducationStage::Secondary;
    if draft.field(secondary.primary_field()).trim().is_empty() {
        return ValidationResult::invalid(
            secondary.primary_field(),
            "Secondary (10th) board is required",
        );
    }
    if let Some(failure) = format_rule(
        draft,
        secondary.year_field(),
        "Secondary year of passing",
        &YEAR_RE,
        "a 4-digit year",
        true,
    ) {
        return failure;
    }
    for stage in crate::draft::EDUCATION_STAGES {
        let field = stage.percentage_field();
        let value = draft.field(field).trim().to_string();
        if value.is_empty() {
            continue;
        }
        match value.parse::<f64>() {
            Ok(p) if (0.0..=100.0).contains(&p) => {}
            _ => {
                return ValidationResult::invalid(
                    field,
                    "Percentage must be a number between 0 and 100",
                );
            }
        }
    }
    ValidationResult::Valid
}

fn validate_bank(draft: &RegistrationDraft) -> ValidationResult {
    if let Some(failure) = first_missing(
        draft,
        &[(BANK_NAME, "Bank name"), (ACCOUNT_HOLDER, "Account holder name")],
    ) {
        return failure;
    }
    if let Some(failure) = format_rule(
        draft,
        ACCOUNT_NUMBER,
        "Account number",
        &ACCOUNT_RE,
        "9 to 18 digits",
        true,
    ) {
        return failure;
    }
    if let Some(failure) = format_rule(
        draft,
        IFSC_CODE,
        "IFSC code",
        &IFSC_RE,
        "a valid IFSC code (e.g. SBIN0001234)",
        true,
    ) {
        return failure;
    }
    ValidationResult::Valid
}

fn validate_documents(draft: &RegistrationDraft) -> ValidationResult {
    if draft.document(DocumentKind::Photo).is_none() {
        return ValidationResult::invalid(DocumentKind::Photo.name(), "Student photo is required");
    }
    ValidationResult::Valid
}

fn validate_emergency(draft: &RegistrationDraft) -> ValidationResult {
    if let Some(failure) = first_missing(
        draft,
        &[
            (EMERGENCY_NAME, "Emergency contact name"),
            (EMERGENCY_RELATION, "Emergency contact relation"),
        ],
    ) {
        return failure;
    }
    if let Some(failure) = format_rule(
        draft,
        EMERGENCY_MOBILE,
        "Emergency contact mobile",
        &MOBILE_RE,
        "exactly 10 digits",
        true,
    ) {
        return failure;
    }
    if draft.field(EMERGENCY_ADDRESS).trim().is_empty() {
        return ValidationResult::invalid(EMERGENCY_ADDRESS, "Emergency contact address is required");
    }
    ValidationResult::Valid
}
