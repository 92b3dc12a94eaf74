//! # Aegis Core
//!
//! The trust layer for AI-driven commerce decisions: explains model
//! decisions with ranked feature attributions, signs consequential
//! operations with Ed25519, maintains append-only attestation logs with
//! Merkle inclusion proofs, and assembles everything into tamper-evident,
//! exportable evidence packs for audit.
//!
//! All cryptographic and tree operations are synchronous, CPU-bound pure
//! functions of their inputs. Stores are explicit objects constructed by
//! the caller and passed by reference; nothing here holds global state.

pub mod attestation;
pub mod canonical;
pub mod config;
pub mod error;
pub mod evidence;
pub mod explain;
pub mod merkle;
pub mod signer;
pub mod store;
pub mod types;

// Re-export commonly used types at the crate root.
pub use attestation::{hash_action, AttestationLogEntry, AttestationLogManager};
pub use config::{load_config, AegisConfig, EvidenceConfig, SignerConfig};
pub use error::{AegisError, Result};
pub use evidence::{
    export_json, export_zip, generate_pack, generate_summary, verify_integrity, EvidencePack,
    PackContents, PackFormat, PackRequest,
};
pub use explain::{
    feature_importance_stats, AttributionScorer, ContributionDirection, ExplainRequest,
    ExplainabilityEngine, ExplainerConfig, Explanation, FeatureImportance, FeatureStat,
    HeuristicScorer, Locale,
};
pub use merkle::{
    build_tree, generate_proof, verify_proof, MerkleNode, MerkleProof, Position, ProofStep,
};
pub use signer::{
    generate_keypair, generate_nonce, sign_data_export, sign_model_deployment, sign_operation,
    sign_operation_with, sign_price_update, sign_promotion_activation, sign_refund_approval,
    verify_operation, verify_operation_with_window, KeyPair, LocalSigner, SignedOperation,
    SignedOperationRequest, Signer, VerificationFailure, VerificationResult,
};
pub use store::SignatureStore;
pub use types::{DecisionType, ExplainabilityMethod, OperationType, Scalar};
