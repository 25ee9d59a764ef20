use crate::constants;
use crate::sections::{SectionId, SECTION_ORDER};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Partial record shape exchanged with the record store.
pub type JsonMap = serde_json::Map<String, Value>;

/// A row fetched from the record store: its id plus the raw column map.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: String,
    pub fields: JsonMap,
}

/// Education levels a student can report. A level's sub-record is written
/// during finalize only when its identifying institution field is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EducationStage {
    Secondary,
    HigherSecondary,
    Diploma,
    Undergraduate,
    Postgraduate,
}

pub const EDUCATION_STAGES: [EducationStage; 5] = [
    EducationStage::Secondary,
    EducationStage::HigherSecondary,
    EducationStage::Diploma,
    EducationStage::Undergraduate,
    EducationStage::Postgraduate,
];

impl EducationStage {
    /// Level name stored in the education sub-record.
    pub fn name(&self) -> &'static str {
        match self {
            EducationStage::Secondary => "secondary",
            EducationStage::HigherSecondary => "higher_secondary",
            EducationStage::Diploma => "diploma",
            EducationStage::Undergraduate => "undergraduate",
            EducationStage::Postgraduate => "postgraduate",
        }
    }

    /// Column holding the board or university name. This is the primary
    /// identifying field: a stage with it left empty is not persisted.
    pub fn primary_field(&self) -> &'static str {
        match self {
            EducationStage::Secondary => "secondary_board",
            EducationStage::HigherSecondary => "higher_secondary_board",
            EducationStage::Diploma => "diploma_board",
            EducationStage::Undergraduate => "undergraduate_university",
            EducationStage::Postgraduate => "postgraduate_university",
        }
    }

    pub fn year_field(&self) -> &'static str {
        match self {
            EducationStage::Secondary => "secondary_year",
            EducationStage::HigherSecondary => "higher_secondary_year",
            EducationStage::Diploma => "diploma_year",
            EducationStage::Undergraduate => "undergraduate_year",
            EducationStage::Postgraduate => "postgraduate_year",
        }
    }

    pub fn percentage_field(&self) -> &'static str {
        match self {
            EducationStage::Secondary => "secondary_percentage",
            EducationStage::HigherSecondary => "higher_secondary_percentage",
            EducationStage::Diploma => "diploma_percentage",
            EducationStage::Undergraduate => "undergraduate_percentage",
            EducationStage::Postgraduate => "postgraduate_percentage",
        }
    }
}

/// Kinds of binary attachments a registration can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Photo,
    Signature,
    AadharCard,
    Marksheet,
}

pub const DOCUMENT_KINDS: [DocumentKind; 4] = [
    DocumentKind::Photo,
    DocumentKind::Signature,
    DocumentKind::AadharCard,
    DocumentKind::Marksheet,
];

impl DocumentKind {
    pub fn name(&self) -> &'static str {
        match self {
            DocumentKind::Photo => "photo",
            DocumentKind::Signature => "signature",
            DocumentKind::AadharCard => "aadhar_card",
            DocumentKind::Marksheet => "marksheet",
        }
    }

    /// Student column the uploaded object URL is linked into.
    pub fn url_column(&self) -> &'static str {
        match self {
            DocumentKind::Photo => "photo_url",
            DocumentKind::Signature => "signature_url",
            DocumentKind::AadharCard => "aadhar_card_url",
            DocumentKind::Marksheet => "marksheet_url",
        }
    }

    pub fn from_name(name: &str) -> Option<DocumentKind> {
        DOCUMENT_KINDS.iter().copied().find(|k| k.name() == name)
    }
}

/// A file attached to the draft, uploaded to object storage at finalize.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    pub kind: DocumentKind,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Public URL assigned after a successful upload.
    pub url: Option<String>,
}

/// The in-progress registration record edited across sections.
///
/// A plain value object: validators read it without side effects and
/// persistence happens only through the wizard's explicit boundary calls.
#[derive(Debug, Clone)]
pub struct RegistrationDraft {
    pub record_id: String,
    pub account_email: String,
    /// Scalar field values keyed by stored column name. Absent means unset.
    pub fields: BTreeMap<String, String>,
    pub documents: Vec<DocumentFile>,
    /// Active section position, always within `SECTION_ORDER`.
    pub cursor: usize,
    /// True iff the latest edit has been written to the store.
    pub persisted: bool,
    pub completed: bool,
}

impl RegistrationDraft {
    /// An unsaved draft with nothing filled in; used by offline validation.
    pub fn empty(account_email: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(constants::EMAIL.to_string(), account_email.to_string());
        Self {
            record_id: String::new(),
            account_email: account_email.to_string(),
            fields,
            documents: Vec::new(),
            cursor: 0,
            persisted: false,
            completed: false,
        }
    }

    /// Builds a draft from a fetched row. Scalar columns become string
    /// field values; bookkeeping columns are lifted out of the map.
    pub fn from_record(record: StoredRecord) -> Self {
        let mut fields = BTreeMap::new();
        let mut completed = false;
        for (column, value) in &record.fields {
            if column == constants::ID {
                continue;
            }
            if column == constants::COMPLETED {
                completed = value.as_bool().unwrap_or(false);
                continue;
            }
            match value {
                Value::String(s) => {
                    fields.insert(column.clone(), s.clone());
                }
                Value::Bool(b) => {
                    fields.insert(column.clone(), b.to_string());
                }
                Value::Number(n) => {
                    fields.insert(column.clone(), n.to_string());
                }
                _ => {}
            }
        }
        let account_email = fields.get(constants::EMAIL).cloned().unwrap_or_default();
        Self {
            record_id: record.id,
            account_email,
            fields,
            documents: Vec::new(),
            // Completed drafts reopen at the first section for later edits
            cursor: 0,
            persisted: true,
            completed,
        }
    }

    /// Current value of a field, empty string when unset.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn set_field(&mut self, name: &str, value: &str) {
        self.fields.insert(name.to_string(), value.to_string());
        self.persisted = false;
    }

    /// Applies one field edit, including the one-way current-address copy
    /// triggered by the same-as-permanent toggle. The copy happens at
    /// toggle time only; later permanent-address edits do not propagate.
    pub fn apply_field_edit(&mut self, field: &str, value: &str) {
        self.set_field(field, value);
        if field == constants::CURRENT_SAME_AS_PERMANENT && value.eq_ignore_ascii_case("true") {
            for (permanent, current) in constants::ADDRESS_PAIRS {
                let copied = self.field(permanent).to_string();
                self.set_field(current, &copied);
            }
        }
    }

    pub fn current_section(&self) -> SectionId {
        SECTION_ORDER[self.cursor.min(SECTION_ORDER.len() - 1)]
    }

    /// Attaches a document, replacing any previous file of the same kind.
    pub fn attach_document(&mut self, document: DocumentFile) {
        self.documents.retain(|d| d.kind != document.kind);
        self.documents.push(document);
        self.persisted = false;
    }

    pub fn document(&self, kind: DocumentKind) -> Option<&DocumentFile> {
        self.documents.iter().find(|d| d.kind == kind)
    }

    /// The scalar fields as a partial record for the student row.
    pub fn core_fields(&self) -> JsonMap {
        let mut map = JsonMap::new();
        for (column, value) in &self.fields {
            map.insert(column.clone(), Value::String(value.clone()));
        }
        map
    }

    /// One sub-record per education stage whose institution is filled.
    pub fn education_rows(&self) -> Vec<JsonMap> {
        let mut rows = Vec::new();
        for stage in EDUCATION_STAGES {
            let institution = self.field(stage.primary_field()).trim().to_string();
            if institution.is_empty() {
                continue;
            }
            let mut row = JsonMap::new();
            row.insert(
                constants::EDUCATION_STUDENT_ID.to_string(),
                Value::String(self.record_id.clone()),
            );
            row.insert(
                constants::EDUCATION_LEVEL.to_string(),
                Value::String(stage.name().to_string()),
            );
            row.insert(
                constants::EDUCATION_INSTITUTION.to_string(),
                Value::String(institution),
            );
            row.insert(
                constants::EDUCATION_YEAR.to_string(),
                Value::String(self.field(stage.year_field()).to_string()),
            );
            row.insert(
                constants::EDUCATION_PERCENTAGE.to_string(),
                Value::String(self.field(stage.percentage_field()).to_string()),
            );
            rows.push(row);
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_record_lifts_bookkeeping_columns() {
        let mut fields = JsonMap::new();
        fields.insert("id".to_string(), Value::String("r1".to_string()));
        fields.insert("email".to_string(), Value::String("s@uni.edu".to_string()));
        fields.insert("completed".to_string(), Value::Bool(true));
        fields.insert("first_name".to_string(), Value::String("Asha".to_string()));

        let draft = RegistrationDraft::from_record(StoredRecord {
            id: "r1".to_string(),
            fields,
        });

        assert_eq!(draft.record_id, "r1");
        assert_eq!(draft.account_email, "s@uni.edu");
        assert!(draft.completed);
        assert_eq!(draft.cursor, 0);
        assert_eq!(draft.field("first_name"), "Asha");
        assert!(!draft.fields.contains_key("id"));
        assert!(!draft.fields.contains_key("completed"));
    }

    #[test]
    fn education_rows_skip_unfilled_stages() {
        let mut draft = RegistrationDraft::empty("s@uni.edu");
        draft.record_id = "r1".to_string();
        draft.set_field("secondary_board", "State Board");
        draft.set_field("secondary_year", "2019");
        draft.set_field("undergraduate_university", "Tech University");

        let rows = draft.education_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["level"], Value::String("secondary".to_string()));
        assert_eq!(rows[1]["level"], Value::String("undergraduate".to_string()));
        assert_eq!(rows[0]["student_id"], Value::String("r1".to_string()));
    }

    #[test]
    fn attach_document_replaces_same_kind() {
        let mut draft = RegistrationDraft::empty("s@uni.edu");
        draft.attach_document(DocumentFile {
            kind: DocumentKind::Photo,
            file_name: "old.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![1],
            url: None,
        });
        draft.attach_document(DocumentFile {
            kind: DocumentKind::Photo,
            file_name: "new.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![2],
            url: None,
        });
        assert_eq!(draft.documents.len(), 1);
        assert_eq!(draft.document(DocumentKind::Photo).unwrap().file_name, "new.jpg");
    }
}
