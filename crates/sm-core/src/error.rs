//! Service-level error type.

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::db::DbError;

/// Errors returned by [`crate::workflow::ComplianceService`] operations.
#[derive(Debug, Error)]
pub enum ComplianceError {
    /// The referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The record is not in a state that allows the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The actor's role or ownership does not allow the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Database(#[from] DbError),

    /// Encrypting a detail for storage failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl ComplianceError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        ComplianceError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

/// Result alias for service operations.
pub type ComplianceResult<T> = Result<T, ComplianceError>;
