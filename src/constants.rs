/// Stored column names used across the draft, validators, and persistence.
/// These constants define the mapping between form fields and the columns
/// of the hosted record store; both sides must agree for writes to round-trip.

// Record bookkeeping columns
pub const ID: &str = "id";
pub const COMPLETED: &str = "completed";

// Identity
pub const FIRST_NAME: &str = "first_name";
pub const LAST_NAME: &str = "last_name";
pub const EMAIL: &str = "email";
pub const MOBILE_NUMBER: &str = "mobile_number";
pub const AADHAR_NUMBER: &str = "aadhar_number";

// Personal details
pub const DATE_OF_BIRTH: &str = "date_of_birth";
pub const GENDER: &str = "gender";
pub const BLOOD_GROUP: &str = "blood_group";
pub const NATIONALITY: &str = "nationality";
pub const CATEGORY: &str = "category";

// Contact: permanent address block
pub const PERMANENT_ADDRESS_LINE: &str = "permanent_address_line";
pub const PERMANENT_CITY: &str = "permanent_city";
pub const PERMANENT_DISTRICT: &str = "permanent_district";
pub const PERMANENT_STATE: &str = "permanent_state";
pub const PERMANENT_PINCODE: &str = "permanent_pincode";

// Contact: current address block
pub const CURRENT_SAME_AS_PERMANENT: &str = "current_same_as_permanent";
pub const CURRENT_ADDRESS_LINE: &str = "current_address_line";
pub const CURRENT_CITY: &str = "current_city";
pub const CURRENT_DISTRICT: &str = "current_district";
pub const CURRENT_STATE: &str = "current_state";
pub const CURRENT_PINCODE: &str = "current_pincode";

/// Permanent-to-current column pairs copied when the student marks the
/// current address as same as permanent. One-way copy, not a live link.
pub const ADDRESS_PAIRS: [(&str, &str); 5] = [
    (PERMANENT_ADDRESS_LINE, CURRENT_ADDRESS_LINE),
    (PERMANENT_CITY, CURRENT_CITY),
    (PERMANENT_DISTRICT, CURRENT_DISTRICT),
    (PERMANENT_STATE, CURRENT_STATE),
    (PERMANENT_PINCODE, CURRENT_PINCODE),
];

// Family
pub const FATHER_NAME: &str = "father_name";
pub const MOTHER_NAME: &str = "mother_name";
pub const FATHER_OCCUPATION: &str = "father_occupation";
pub const MOTHER_OCCUPATION: &str = "mother_occupation";
pub const GUARDIAN_MOBILE: &str = "guardian_mobile";

// Bank details
pub const BANK_NAME: &str = "bank_name";
pub const ACCOUNT_HOLDER: &str = "account_holder";
pub const ACCOUNT_NUMBER: &str = "account_number";
pub const IFSC_CODE: &str = "ifsc_code";
pub const BANK_BRANCH: &str = "bank_branch";

// Emergency contact
pub const EMERGENCY_NAME: &str = "emergency_name";
pub const EMERGENCY_RELATION: &str = "emergency_relation";
pub const EMERGENCY_MOBILE: &str = "emergency_mobile";
pub const EMERGENCY_ADDRESS: &str = "emergency_address";

// Education sub-record columns
pub const EDUCATION_STUDENT_ID: &str = "student_id";
pub const EDUCATION_LEVEL: &str = "level";
pub const EDUCATION_INSTITUTION: &str = "institution";
pub const EDUCATION_YEAR: &str = "year_of_passing";
pub const EDUCATION_PERCENTAGE: &str = "percentage";
