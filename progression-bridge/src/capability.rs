//! Startup Capability Check
//!
//! One-time compatibility gate run before the reconciliation loop starts:
//! probes both collaborators and validates the chain client's reported
//! limits, failing fast on incompatibility instead of letting every request
//! discover it separately.

use tracing::info;

use crate::chain_client::{ChainCapabilities, ChainClient};
use crate::error::{BridgeError, BridgeResult};
use crate::proof_client::ProofIndexClient;

/// Proof depth this service requires the chain client to carry
pub const REQUIRED_PROOF_DEPTH: usize = 24;

/// Probe collaborators and validate reported limits. Returns the chain
/// capabilities so callers can size payloads against the real ceiling.
pub async fn ensure_capabilities(
    chain: &dyn ChainClient,
    index: &dyn ProofIndexClient,
) -> BridgeResult<ChainCapabilities> {
    let health = chain.health_check().await?;
    if !health.available {
        return Err(BridgeError::Incompatible(format!(
            "chain endpoint unavailable: {}",
            health.message
        )));
    }

    if !index.health_check().await? {
        return Err(BridgeError::Incompatible(
            "proof index unavailable".to_string(),
        ));
    }

    let capabilities = chain.capabilities().await?;
    if capabilities.max_transaction_bytes == 0 {
        return Err(BridgeError::Incompatible(
            "chain client reports a zero transaction ceiling".to_string(),
        ));
    }
    if !capabilities.supports_leaf_replace {
        return Err(BridgeError::Incompatible(
            "chain client cannot replace compressed-asset leaves".to_string(),
        ));
    }
    if capabilities.max_proof_depth < REQUIRED_PROOF_DEPTH {
        return Err(BridgeError::Incompatible(format!(
            "chain client carries proofs up to depth {}, need {}",
            capabilities.max_proof_depth, REQUIRED_PROOF_DEPTH
        )));
    }

    info!(
        max_transaction_bytes = capabilities.max_transaction_bytes,
        max_proof_depth = capabilities.max_proof_depth,
        "Collaborator capability check passed"
    );
    Ok(capabilities)
}
