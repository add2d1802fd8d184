//! Store Error Types

use thiserror::Error;

/// Store Result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Store Error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Entity not found
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    /// Uniqueness constraint violation
    #[error("Duplicate {entity_type}: {id}")]
    Duplicate { entity_type: String, id: String },

    /// Invalid entity state
    #[error("Invalid entity state: {message}")]
    InvalidState { message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for progression_core::ProgressionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity_type, id } => {
                progression_core::ProgressionError::NotFound {
                    entity: entity_type,
                    id,
                }
            }
            StoreError::Duplicate { entity_type, id } => {
                progression_core::ProgressionError::InvalidState {
                    reason: format!("duplicate {}: {}", entity_type, id),
                }
            }
            StoreError::InvalidState { message } => {
                progression_core::ProgressionError::InvalidState { reason: message }
            }
            StoreError::Validation(message) => {
                progression_core::ProgressionError::InvalidState { reason: message }
            }
            StoreError::Internal(message) => {
                progression_core::ProgressionError::Internal(message)
            }
        }
    }
}

impl StoreError {
    /// Create a not-found error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Create a duplicate error
    pub fn duplicate(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }
}
