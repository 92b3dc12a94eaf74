//! Error types for the Aegis trust layer.
//!
//! Uses `thiserror` with structured variants so an API layer can map every
//! rejection to a status without parsing free text. Only call-time
//! rejections are errors; verification outcomes (`verify_operation`,
//! `verify_proof`, `verify_integrity`) are returned as data.

use crate::config::ConfigError;
use crate::evidence::EvidenceError;
use crate::explain::ExplainError;
use crate::merkle::MerkleError;
use crate::signer::SignError;
use crate::store::StoreError;

/// Top-level error type for the trust layer.
#[derive(Debug, thiserror::Error)]
pub enum AegisError {
    #[error("merkle error: {0}")]
    Merkle(#[from] MerkleError),

    #[error("explainability error: {0}")]
    Explain(#[from] ExplainError),

    #[error("signing error: {0}")]
    Sign(#[from] SignError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("evidence error: {0}")]
    Evidence(#[from] EvidenceError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A type alias for results using the top-level [`AegisError`].
pub type Result<T> = std::result::Result<T, AegisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merkle_error_display() {
        let err = AegisError::Merkle(MerkleError::EmptyInput);
        assert_eq!(
            err.to_string(),
            "merkle error: cannot build a Merkle tree over empty input"
        );
    }

    #[test]
    fn test_explain_error_display() {
        let err = AegisError::Explain(ExplainError::ConfidenceOutOfRange { value: 1.5 });
        assert_eq!(
            err.to_string(),
            "explainability error: confidence 1.5 is outside [0.0, 1.0]"
        );
    }

    #[test]
    fn test_sign_error_display() {
        let err = AegisError::Sign(SignError::InvalidRequest {
            field: "actor",
            reason: "must not be empty".into(),
        });
        assert_eq!(
            err.to_string(),
            "signing error: invalid request field 'actor': must not be empty"
        );
    }

    #[test]
    fn test_error_from_conversions() {
        let err: AegisError = MerkleError::IndexOutOfBounds { index: 9, len: 3 }.into();
        assert!(matches!(err, AegisError::Merkle(_)));

        let serde_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: AegisError = serde_err.into();
        assert!(matches!(err, AegisError::Serialization(_)));
    }
}
