//! Bridge Error Types

use thiserror::Error;

/// Bridge Result type
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Bridge errors
///
/// These cover transport-level failures only. Structured rejections from the
/// chain (stale root, oversized payload) are not errors; they arrive as
/// [`crate::SubmitOutcome`] variants every caller must match on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Network or transport failure talking to a collaborator
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Collaborator answered but the response could not be interpreted
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Operation exceeded its timeout budget
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Startup capability check failed
    #[error("Incompatible collaborator: {0}")]
    Incompatible(String),

    /// Content upload failed
    #[error("Upload failed: {0}")]
    UploadFailed(String),
}

impl From<BridgeError> for progression_core::ProgressionError {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::Incompatible(reason) => {
                progression_core::ProgressionError::Incompatible { reason }
            }
            other => progression_core::ProgressionError::TransientNetwork {
                reason: other.to_string(),
            },
        }
    }
}
