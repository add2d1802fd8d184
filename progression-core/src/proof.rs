//! Membership Proof Model
//!
//! A compressed asset's content is authenticated by a merkle tree; any
//! mutation must carry an ordered sibling-hash path proving the leaf belongs
//! under the current root. The proof is ephemeral: it is fetched immediately
//! before building a transaction and is invalid the instant another actor
//! mutates the tree. It is never persisted.

use serde::{Deserialize, Serialize};

use crate::types::Digest32;

/// Membership proof for a compressed asset leaf
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetProof {
    /// Sibling-hash path, leaf to root
    pub proof: Vec<Digest32>,
    /// Root the path was generated against
    pub root: Digest32,
    /// Hash of the leaf's current data
    pub data_hash: Digest32,
    /// Hash of the creator set
    pub creator_hash: Digest32,
    /// Leaf index in the tree
    pub leaf_index: u32,
}

impl AssetProof {
    /// Tree depth implied by the path
    pub fn depth(&self) -> usize {
        self.proof.len()
    }

    /// Encoded size contribution of this proof in a transaction: one 32-byte
    /// node per path entry plus root, data hash and creator hash.
    pub fn encoded_size(&self) -> usize {
        (self.proof.len() + 3) * 32 + 4
    }

    /// Recompute the root from a leaf hash along the sibling path. Test
    /// support: the hot path trusts the index and lets the chain enforce
    /// membership.
    pub fn verify_against(&self, leaf: &Digest32) -> bool {
        let mut current = *leaf;
        let mut index = self.leaf_index;
        for sibling in &self.proof {
            current = if index % 2 == 0 {
                Digest32::combine(&current, sibling)
            } else {
                Digest32::combine(sibling, &current)
            };
            index /= 2;
        }
        current == self.root
    }
}
