use serde::{Deserialize, Serialize};

/// Unique identifier for one page of the registration form.
///
/// Sections are addressed by identifier rather than raw index so that the
/// validator mapping cannot silently shadow an entry the way duplicated
/// integer branches can.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionId {
    Identity,
    Personal,
    Contact,
    Family,
    Education,
    Bank,
    Documents,
    Emergency,
}

/// The fixed order the wizard walks through. Order is meaningful: later
/// sections may read values collected earlier (the current-address copy
/// reads the permanent address entered in Contact).
pub const SECTION_ORDER: [SectionId; 8] = [
    SectionId::Identity,
    SectionId::Personal,
    SectionId::Contact,
    SectionId::Family,
    SectionId::Education,
    SectionId::Bank,
    SectionId::Documents,
    SectionId::Emergency,
];

impl SectionId {
    /// Human-readable section title, as shown in the form's tab selector.
    pub fn title(&self) -> &'static str {
        match self {
            SectionId::Identity => "Identity",
            SectionId::Personal => "Personal Details",
            SectionId::Contact => "Contact",
            SectionId::Family => "Family",
            SectionId::Education => "Education",
            SectionId::Bank => "Bank Details",
            SectionId::Documents => "Documents",
            SectionId::Emergency => "Emergency Contact",
        }
    }

    /// Position of this section in the fixed walk order.
    pub fn index(&self) -> usize {
        SECTION_ORDER
            .iter()
            .position(|s| s == self)
            .expect("every SectionId appears in SECTION_ORDER")
    }

    /// Section at the given cursor position, if in range.
    pub fn at(index: usize) -> Option<SectionId> {
        SECTION_ORDER.get(index).copied()
    }

    pub fn is_last(&self) -> bool {
        self.index() == SECTION_ORDER.len() - 1
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}
