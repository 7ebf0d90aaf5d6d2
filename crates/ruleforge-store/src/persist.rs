//! Persisted snapshot format (v1)
//!
//! ```json
//! { "format_version": 1, "checksum": "<sha256 of state>", "state": { ... } }
//! ```
//!
//! The checksum is the hex SHA-256 of the compact JSON encoding of `state`.

use ruleforge_core::{DynamicRule, KnowledgeEntry, StaticRule};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::StoreError;

/// Current snapshot format
pub const FORMAT_VERSION: u32 = 1;

/// The full logical state of a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PersistedState {
    /// Declaration order
    pub static_rules: Vec<StaticRule>,

    /// Ordered by id
    pub dynamic_rules: Vec<DynamicRule>,

    /// Ordered by id
    pub entries: Vec<KnowledgeEntry>,
}

/// Versioned, checksummed envelope around `PersistedState`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    pub format_version: u32,
    pub checksum: String,
    pub state: PersistedState,
}

impl StoreDocument {
    pub fn new(state: PersistedState) -> Result<Self, StoreError> {
        let checksum = checksum(&state)?;
        Ok(Self {
            format_version: FORMAT_VERSION,
            checksum,
            state,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec_pretty(self).map_err(|e| StoreError::CorruptSnapshot(e.to_string()))
    }

    /// Decode and verify version and checksum
    pub fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        let document: StoreDocument = serde_json::from_slice(bytes)
            .map_err(|e| StoreError::CorruptSnapshot(e.to_string()))?;

        if document.format_version != FORMAT_VERSION {
            return Err(StoreError::CorruptSnapshot(format!(
                "unsupported format version {} (expected {})",
                document.format_version, FORMAT_VERSION
            )));
        }

        let actual = checksum(&document.state)?;
        if actual != document.checksum {
            return Err(StoreError::CorruptSnapshot(format!(
                "checksum mismatch: recorded {}, computed {}",
                document.checksum, actual
            )));
        }

        Ok(document)
    }
}

fn checksum(state: &PersistedState) -> Result<String, StoreError> {
    let bytes = serde_json::to_vec(state).map_err(|e| StoreError::CorruptSnapshot(e.to_string()))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruleforge_core::RuleSeverity;

    fn state() -> PersistedState {
        PersistedState {
            static_rules: vec![StaticRule::new("hb-force-try", r"\btry!", "Force try", RuleSeverity::Warning)],
            dynamic_rules: Vec::new(),
            entries: Vec::new(),
        }
    }

    #[test]
    fn encode_decode() {
        let doc = StoreDocument::new(state()).unwrap();
        let decoded = StoreDocument::decode(&doc.encode().unwrap()).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let doc = StoreDocument::new(state()).unwrap();
        let text = String::from_utf8(doc.encode().unwrap()).unwrap();
        let tampered = text.replace("Force try", "Force-try");

        let err = StoreDocument::decode(tampered.as_bytes()).unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot(msg) if msg.contains("checksum")));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut doc = StoreDocument::new(state()).unwrap();
        doc.format_version = 99;
        let err = StoreDocument::decode(&doc.encode().unwrap()).unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot(msg) if msg.contains("version")));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(StoreDocument::decode(b"not json").is_err());
    }
}
