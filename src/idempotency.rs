use crate::draft::JsonMap;
use sha2::{Digest, Sha256};

/// Fingerprint of a partial record, used to suppress redundant saves.
/// serde_json's map keeps keys sorted, so iteration order is canonical.
pub fn compute_draft_fingerprint(fields: &JsonMap) -> String {
    let mut s = String::new();
    for (column, value) in fields {
        s.push_str(column);
        s.push('=');
        s.push_str(&value.to_string());
        s.push('\n');
    }

    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let out = hasher.finalize();
    hex::encode(out)
}
