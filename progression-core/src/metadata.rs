//! Metadata Builder
//!
//! Renders the on-chain payload for the next update as a pure, deterministic
//! function of a progression snapshot. Full-state dumps risk exceeding the
//! ledger's hard transaction-size ceiling, so the builder prefers partial
//! attribute sets and walks down through detail levels until the rendering
//! fits. Large content (portrait art) is referenced by content-store URI,
//! never embedded.

use serde::{Deserialize, Serialize};

use crate::canon::Canonicalizer;
use crate::error::{ProgressionError, ProgressionResult};
use crate::types::{CharacterId, Digest32, SkillName, StateVersion};

/// One skill's state inside a snapshot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSnapshot {
    /// Skill name
    pub skill: SkillName,
    /// Experience total
    pub experience: u64,
    /// Level derived from experience
    pub level: u8,
    /// Whether this skill mutated since the last confirmed update
    pub dirty: bool,
}

/// Point-in-time view of a character's committed off-chain state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionSnapshot {
    /// Character ID
    pub character_id: CharacterId,
    /// Display name
    pub name: String,
    /// Combat level
    pub combat_level: u8,
    /// Sum of all skill levels
    pub total_level: u16,
    /// Off-chain state version this snapshot was taken at
    pub state_version: StateVersion,
    /// Content-store reference to portrait art, if any
    pub portrait_uri: Option<String>,
    /// All skills, in no particular order (the builder sorts)
    pub skills: Vec<SkillSnapshot>,
}

/// Rendering detail, largest first. The builder only ever moves down this
/// ladder; it never retries the same oversized rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DetailLevel {
    /// Every skill attribute
    Full,
    /// Only dirty skills, plus core attributes
    DirtyOnly,
    /// Core attributes only (name, combat level, total level, version)
    CoreOnly,
}

impl DetailLevel {
    /// Next smaller rendering, if any
    pub fn shrink(&self) -> Option<Self> {
        match self {
            Self::Full => Some(Self::DirtyOnly),
            Self::DirtyOnly => Some(Self::CoreOnly),
            Self::CoreOnly => None,
        }
    }
}

/// One rendered attribute
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute key
    pub trait_type: String,
    /// Attribute value
    pub value: String,
}

/// Rendered payload, ready for transaction building
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataPayload {
    /// Detail level used
    pub detail: DetailLevel,
    /// Attributes in canonical order
    pub attributes: Vec<Attribute>,
    /// Canonical encoded bytes (what goes on chain)
    pub canonical_bytes: Vec<u8>,
    /// Digest of the canonical bytes
    pub data_hash: Digest32,
    /// Snapshot version this payload represents
    pub state_version: StateVersion,
}

impl MetadataPayload {
    /// Encoded size in bytes
    pub fn encoded_size(&self) -> usize {
        self.canonical_bytes.len()
    }
}

/// Wire shape of the on-chain metadata document
#[derive(Serialize)]
struct MetadataDocument<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    state_version: StateVersion,
    attributes: &'a [Attribute],
}

/// Size-bounded deterministic payload renderer
pub struct MetadataBuilder {
    canon: Canonicalizer,
}

impl MetadataBuilder {
    /// Create a builder
    pub fn new() -> Self {
        Self {
            canon: Canonicalizer::for_metadata(),
        }
    }

    /// Render a snapshot at a fixed detail level. Pure: identical snapshots
    /// produce identical bytes and data hashes.
    pub fn build(
        &self,
        snapshot: &ProgressionSnapshot,
        detail: DetailLevel,
    ) -> ProgressionResult<MetadataPayload> {
        let attributes = self.render_attributes(snapshot, detail);
        let document = MetadataDocument {
            name: &snapshot.name,
            image: snapshot.portrait_uri.as_deref(),
            state_version: snapshot.state_version,
            attributes: &attributes,
        };
        let canonical_bytes = self.canon.canonicalize(&document)?;
        let data_hash = Digest32::blake3(&canonical_bytes);

        Ok(MetadataPayload {
            detail,
            attributes,
            canonical_bytes,
            data_hash,
            state_version: snapshot.state_version,
        })
    }

    /// Render the largest detail level that fits under `ceiling` bytes.
    /// Walks `Full -> DirtyOnly -> CoreOnly`; if even `CoreOnly` exceeds the
    /// ceiling the error escapes, because resubmitting an oversized payload
    /// unchanged can never succeed.
    pub fn build_within(
        &self,
        snapshot: &ProgressionSnapshot,
        ceiling: usize,
    ) -> ProgressionResult<MetadataPayload> {
        let mut detail = DetailLevel::Full;
        loop {
            let payload = self.build(snapshot, detail)?;
            if payload.encoded_size() <= ceiling {
                return Ok(payload);
            }
            match detail.shrink() {
                Some(smaller) => detail = smaller,
                None => {
                    return Err(ProgressionError::PayloadTooLarge {
                        size: payload.encoded_size(),
                        ceiling,
                    })
                }
            }
        }
    }

    fn render_attributes(
        &self,
        snapshot: &ProgressionSnapshot,
        detail: DetailLevel,
    ) -> Vec<Attribute> {
        let mut attributes = vec![
            Attribute {
                trait_type: "combat_level".to_string(),
                value: snapshot.combat_level.to_string(),
            },
            Attribute {
                trait_type: "total_level".to_string(),
                value: snapshot.total_level.to_string(),
            },
        ];

        if detail == DetailLevel::CoreOnly {
            return attributes;
        }

        // Sorted by skill name for a deterministic attribute order.
        let mut skills: Vec<&SkillSnapshot> = snapshot
            .skills
            .iter()
            .filter(|s| detail == DetailLevel::Full || s.dirty)
            .collect();
        skills.sort_by(|a, b| a.skill.cmp(&b.skill));

        for skill in skills {
            attributes.push(Attribute {
                trait_type: format!("skill:{}", skill.skill),
                value: format!("{}:{}", skill.level, skill.experience),
            });
        }

        attributes
    }
}

impl Default for MetadataBuilder {
    fn default() -> Self {
        Self::new()
    }
}
