//! Canonicalization
//!
//! Deterministic serialization for computing digests. The on-chain data hash
//! must be a pure function of the snapshot, so every payload is canonicalized
//! (sorted keys, compact encoding) before hashing.

use serde::Serialize;

use crate::error::ProgressionResult;
use crate::types::Digest32;

/// Canonicalizer with domain-separated hashing
pub struct Canonicalizer {
    domain_tag: String,
}

impl Canonicalizer {
    /// Create with a domain separation tag
    pub fn new(domain_tag: &str) -> Self {
        Self {
            domain_tag: domain_tag.to_string(),
        }
    }

    /// Canonicalizer for on-chain metadata payloads
    pub fn for_metadata() -> Self {
        Self::new("progression:metadata")
    }

    /// Canonicalize to bytes (sorted keys, compact JSON)
    pub fn canonicalize<T: Serialize>(&self, value: &T) -> ProgressionResult<Vec<u8>> {
        let json = serde_json::to_value(value)?;
        let sorted = sort_json_keys(&json);
        Ok(serde_json::to_vec(&sorted)?)
    }

    /// Canonicalize and hash under the domain tag
    pub fn canonicalize_and_hash<T: Serialize>(&self, value: &T) -> ProgressionResult<Digest32> {
        let canonical = self.canonicalize(value)?;
        Ok(self.hash_with_domain(&canonical))
    }

    fn hash_with_domain(&self, data: &[u8]) -> Digest32 {
        let mut tagged = Vec::with_capacity(self.domain_tag.len() + 1 + data.len());
        tagged.extend_from_slice(self.domain_tag.as_bytes());
        tagged.push(0x00);
        tagged.extend_from_slice(data);
        Digest32::blake3(&tagged)
    }
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::for_metadata()
    }
}

/// Sort JSON object keys alphabetically (recursive)
fn sort_json_keys(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted_map = serde_json::Map::new();
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted_map.insert(key.clone(), sort_json_keys(&map[key]));
            }
            serde_json::Value::Object(sorted_map)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(sort_json_keys).collect())
        }
        other => other.clone(),
    }
}
