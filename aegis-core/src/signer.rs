//! # Operation Signing
//!
//! Ed25519 signing and verification for consequential operations: price
//! changes, promotion activations, refund approvals, data exports, and
//! model deployments. A captured signature is only as damaging as its
//! replay window allows, so verification rejects operations older than
//! [`REPLAY_WINDOW_MINUTES`] even when the signature itself is valid.
//!
//! The canonical payload signed here is the interop contract defined in
//! [`crate::canonical`]; the nonce is part of the verifiable record, and
//! signer and verifier build the payload from the identical field set.
//!
//! Signing is a capability behind the [`Signer`] trait. [`LocalSigner`]
//! wraps raw key material; an HSM or KMS backend implements the same two
//! methods and plugs into [`sign_operation_with`] unchanged. Key material
//! is zeroized when a `LocalSigner` is dropped, and no key state outlives
//! a call.

use crate::canonical::{self, canonical_json, format_timestamp, hex_encode};
use crate::types::OperationType;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

/// The only signature algorithm this layer produces or accepts.
pub const SIGNATURE_ALGORITHM: &str = "Ed25519";

/// Maximum age of an operation before verification rejects it as a
/// potential replay.
pub const REPLAY_WINDOW_MINUTES: i64 = 30;

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// A freshly generated Ed25519 keypair, DER-encoded and base64-wrapped:
/// PKCS#8 for the private key, SPKI for the public key.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub public_key: String,
    pub private_key: String,
}

/// Caller-built request to sign one operation. Transient: exists only to
/// produce a [`SignedOperation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedOperationRequest {
    pub operation_type: OperationType,
    pub payload: Map<String, Value>,
    pub actor: String,
    #[serde(with = "crate::canonical::ts_millis")]
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied nonce; 128-bit random recommended (see
    /// [`generate_nonce`]).
    pub nonce: String,
}

/// An operation with its Ed25519 signature and the public key that
/// verifies it. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedOperation {
    pub operation_id: Uuid,
    pub operation_type: OperationType,
    pub payload: Map<String, Value>,
    pub actor: String,
    #[serde(with = "crate::canonical::ts_millis")]
    pub timestamp: DateTime<Utc>,
    pub nonce: String,
    /// Base64 of the 64-byte Ed25519 signature.
    pub signature: String,
    /// Base64 of the SPKI DER public key.
    pub public_key: String,
    pub algorithm: String,
}

/// Why a verification failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationFailure {
    BadSignature,
    StaleTimestamp,
    Malformed,
}

/// Outcome of verifying a [`SignedOperation`]. Computed per call, never
/// stored; failures are data, not errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub valid: bool,
    pub operation_id: Uuid,
    #[serde(with = "crate::canonical::ts_millis")]
    pub verified_at: DateTime<Utc>,
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<VerificationFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl VerificationResult {
    fn ok(operation: &SignedOperation) -> Self {
        Self {
            valid: true,
            operation_id: operation.operation_id,
            verified_at: canonical::now_millis(),
            public_key: operation.public_key.clone(),
            failure: None,
            error_message: None,
        }
    }

    fn rejected(
        operation: &SignedOperation,
        failure: VerificationFailure,
        message: impl Into<String>,
    ) -> Self {
        Self {
            valid: false,
            operation_id: operation.operation_id,
            verified_at: canonical::now_millis(),
            public_key: operation.public_key.clone(),
            failure: Some(failure),
            error_message: Some(message.into()),
        }
    }
}

/// Errors rejecting a signing request at call time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignError {
    #[error("invalid request field '{field}': {reason}")]
    InvalidRequest { field: &'static str, reason: String },

    #[error("unparseable key material: {reason}")]
    KeyDecode { reason: String },
}

// ---------------------------------------------------------------------------
// Signer capability
// ---------------------------------------------------------------------------

/// The signing capability. Production deployments may replace raw key
/// material with an HSM/KMS-backed implementation exposing this same
/// shape.
pub trait Signer: Send + Sync {
    /// Sign a canonical payload, returning the 64-byte Ed25519 signature.
    fn sign(&self, payload: &[u8]) -> Vec<u8>;

    /// SPKI DER encoding of the public key that verifies this signer.
    fn public_key_der(&self) -> Vec<u8>;
}

/// In-process signer over raw Ed25519 key material. The wrapped key is
/// zeroized when the signer is dropped.
pub struct LocalSigner {
    key: SigningKey,
}

impl LocalSigner {
    /// Generate a signer with a fresh random key.
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Decode a signer from a base64 PKCS#8 DER private key.
    pub fn from_private_key_b64(private_key: &str) -> Result<Self, SignError> {
        let der = b64_decode(private_key).map_err(|e| SignError::KeyDecode {
            reason: format!("private key is not valid base64: {e}"),
        })?;
        let key = SigningKey::from_pkcs8_der(&der).map_err(|e| SignError::KeyDecode {
            reason: format!("private key is not valid PKCS#8 Ed25519: {e}"),
        })?;
        Ok(Self { key })
    }
}

impl Signer for LocalSigner {
    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        self.key.sign(payload).to_bytes().to_vec()
    }

    fn public_key_der(&self) -> Vec<u8> {
        self.key
            .verifying_key()
            .to_public_key_der()
            .expect("Ed25519 SPKI encoding is infallible")
            .as_bytes()
            .to_vec()
    }
}

// ---------------------------------------------------------------------------
// Key generation & signing
// ---------------------------------------------------------------------------

/// Generate a fresh Ed25519 keypair, base64 DER on both sides.
pub fn generate_keypair() -> KeyPair {
    let signing = SigningKey::generate(&mut OsRng);
    let private = signing
        .to_pkcs8_der()
        .expect("Ed25519 PKCS#8 encoding is infallible");
    let public = signing
        .verifying_key()
        .to_public_key_der()
        .expect("Ed25519 SPKI encoding is infallible");
    debug!("generated Ed25519 keypair");
    KeyPair {
        public_key: b64_encode(public.as_bytes()),
        private_key: b64_encode(private.as_bytes()),
    }
}

/// A fresh 128-bit random nonce as lowercase hex.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

/// Sign an operation with a base64 PKCS#8 private key.
pub fn sign_operation(
    request: SignedOperationRequest,
    private_key: &str,
) -> Result<SignedOperation, SignError> {
    let signer = LocalSigner::from_private_key_b64(private_key)?;
    sign_operation_with(request, &signer)
}

/// Sign an operation with any [`Signer`] capability.
pub fn sign_operation_with(
    request: SignedOperationRequest,
    signer: &dyn Signer,
) -> Result<SignedOperation, SignError> {
    validate_request(&request)?;

    let operation_id = Uuid::new_v4();
    let timestamp = canonical::truncate_millis(request.timestamp);
    let payload_bytes = signing_payload(
        &operation_id,
        request.operation_type,
        &request.payload,
        &request.actor,
        &timestamp,
        &request.nonce,
    );

    let signature = signer.sign(payload_bytes.as_bytes());
    let public_key = b64_encode(&signer.public_key_der());

    debug!(
        operation_id = %operation_id,
        operation_type = %request.operation_type,
        actor = %request.actor,
        "signed operation"
    );

    Ok(SignedOperation {
        operation_id,
        operation_type: request.operation_type,
        payload: request.payload,
        actor: request.actor,
        timestamp,
        nonce: request.nonce,
        signature: b64_encode(&signature),
        public_key,
        algorithm: SIGNATURE_ALGORITHM.to_string(),
    })
}

fn validate_request(request: &SignedOperationRequest) -> Result<(), SignError> {
    if request.actor.trim().is_empty() {
        return Err(SignError::InvalidRequest {
            field: "actor",
            reason: "must not be empty".to_string(),
        });
    }
    if request.nonce.trim().is_empty() {
        return Err(SignError::InvalidRequest {
            field: "nonce",
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify a signed operation against its embedded public key, with the
/// default 30-minute replay window. Never panics; all failures are
/// classified in the returned [`VerificationResult`].
pub fn verify_operation(operation: &SignedOperation) -> VerificationResult {
    verify_operation_with_window(operation, Duration::minutes(REPLAY_WINDOW_MINUTES))
}

/// Verify with an explicit replay window.
pub fn verify_operation_with_window(
    operation: &SignedOperation,
    replay_window: Duration,
) -> VerificationResult {
    // Structural checks first: a record we cannot even parse is malformed,
    // not merely unsigned.
    if operation.algorithm != SIGNATURE_ALGORITHM {
        return VerificationResult::rejected(
            operation,
            VerificationFailure::Malformed,
            format!("unsupported algorithm '{}'", operation.algorithm),
        );
    }

    let verifying_key = match decode_public_key(&operation.public_key) {
        Ok(key) => key,
        Err(reason) => {
            warn!(operation_id = %operation.operation_id, %reason, "malformed public key");
            return VerificationResult::rejected(operation, VerificationFailure::Malformed, reason);
        }
    };

    let signature = match decode_signature(&operation.signature) {
        Ok(sig) => sig,
        Err(reason) => {
            return VerificationResult::rejected(operation, VerificationFailure::Malformed, reason);
        }
    };

    // Replay window is enforced independently of signature validity.
    let age = Utc::now() - operation.timestamp;
    if age > replay_window {
        return VerificationResult::rejected(
            operation,
            VerificationFailure::StaleTimestamp,
            format!(
                "operation is {} minutes old, replay window is {} minutes",
                age.num_minutes(),
                replay_window.num_minutes()
            ),
        );
    }

    let payload_bytes = signing_payload(
        &operation.operation_id,
        operation.operation_type,
        &operation.payload,
        &operation.actor,
        &operation.timestamp,
        &operation.nonce,
    );

    match verifying_key.verify(payload_bytes.as_bytes(), &signature) {
        Ok(()) => VerificationResult::ok(operation),
        Err(_) => VerificationResult::rejected(
            operation,
            VerificationFailure::BadSignature,
            "signature does not match canonical payload",
        ),
    }
}

fn decode_public_key(public_key_b64: &str) -> Result<VerifyingKey, String> {
    let der = b64_decode(public_key_b64)
        .map_err(|e| format!("public key is not valid base64: {e}"))?;
    VerifyingKey::from_public_key_der(&der)
        .map_err(|e| format!("public key is not valid SPKI Ed25519: {e}"))
}

fn decode_signature(signature_b64: &str) -> Result<Signature, String> {
    let bytes = b64_decode(signature_b64)
        .map_err(|e| format!("signature is not valid base64: {e}"))?;
    Signature::from_slice(&bytes).map_err(|e| format!("signature has invalid length: {e}"))
}

/// The canonical byte payload that is signed and verified. Field set and
/// encoding are fixed by the interop contract; the nonce is included on
/// both sides.
fn signing_payload(
    operation_id: &Uuid,
    operation_type: OperationType,
    payload: &Map<String, Value>,
    actor: &str,
    timestamp: &DateTime<Utc>,
    nonce: &str,
) -> String {
    let value = json!({
        "actor": actor,
        "nonce": nonce,
        "operation_id": operation_id.to_string(),
        "operation_type": operation_type,
        "payload": payload,
        "timestamp": format_timestamp(timestamp),
    });
    canonical_json(&value)
}

// ---------------------------------------------------------------------------
// Convenience builders
// ---------------------------------------------------------------------------

fn request_now(
    operation_type: OperationType,
    payload: Map<String, Value>,
    actor: &str,
) -> SignedOperationRequest {
    SignedOperationRequest {
        operation_type,
        payload,
        actor: actor.to_string(),
        timestamp: canonical::now_millis(),
        nonce: generate_nonce(),
    }
}

/// Sign a price change. The payload records the relative change so audit
/// consumers never have to re-derive it.
pub fn sign_price_update(
    actor: &str,
    sku: &str,
    old_price: f64,
    new_price: f64,
    private_key: &str,
) -> Result<SignedOperation, SignError> {
    let change_percent = if old_price == 0.0 {
        0.0
    } else {
        (new_price - old_price) / old_price * 100.0
    };
    let mut payload = Map::new();
    payload.insert("sku".to_string(), json!(sku));
    payload.insert("old_price".to_string(), json!(old_price));
    payload.insert("new_price".to_string(), json!(new_price));
    payload.insert("change_percent".to_string(), json!(change_percent));
    sign_operation(request_now(OperationType::PriceUpdate, payload, actor), private_key)
}

/// Sign a promotion activation.
pub fn sign_promotion_activation(
    actor: &str,
    promotion_id: &str,
    discount_percent: f64,
    private_key: &str,
) -> Result<SignedOperation, SignError> {
    let mut payload = Map::new();
    payload.insert("promotion_id".to_string(), json!(promotion_id));
    payload.insert("discount_percent".to_string(), json!(discount_percent));
    sign_operation(
        request_now(OperationType::PromotionActivation, payload, actor),
        private_key,
    )
}

/// Sign a refund approval.
pub fn sign_refund_approval(
    actor: &str,
    order_id: &str,
    amount: f64,
    reason: &str,
    private_key: &str,
) -> Result<SignedOperation, SignError> {
    let mut payload = Map::new();
    payload.insert("order_id".to_string(), json!(order_id));
    payload.insert("amount".to_string(), json!(amount));
    payload.insert("reason".to_string(), json!(reason));
    sign_operation(
        request_now(OperationType::RefundApproval, payload, actor),
        private_key,
    )
}

/// Sign a data export.
pub fn sign_data_export(
    actor: &str,
    dataset: &str,
    record_count: u64,
    private_key: &str,
) -> Result<SignedOperation, SignError> {
    let mut payload = Map::new();
    payload.insert("dataset".to_string(), json!(dataset));
    payload.insert("record_count".to_string(), json!(record_count));
    sign_operation(request_now(OperationType::DataExport, payload, actor), private_key)
}

/// Sign a model deployment.
pub fn sign_model_deployment(
    actor: &str,
    model_name: &str,
    model_version: &str,
    private_key: &str,
) -> Result<SignedOperation, SignError> {
    let mut payload = Map::new();
    payload.insert("model_name".to_string(), json!(model_name));
    payload.insert("model_version".to_string(), json!(model_version));
    sign_operation(
        request_now(OperationType::ModelDeployment, payload, actor),
        private_key,
    )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn b64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

fn b64_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(s)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
