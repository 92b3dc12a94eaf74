//! # Evidence Packs
//!
//! Assembles an explanation, a signed operation, a Merkle inclusion proof,
//! and raw attestation-log entries into one integrity-hashed, exportable
//! bundle for external audit. A pack holds independent copies of every
//! artifact it includes, so it stays verifiable even if the originating
//! log is later compacted.
//!
//! The integrity hash covers the canonical serialization of the pack's
//! identifying fields and contents; mutating any included field after
//! generation makes [`verify_integrity`] return `false`.

use crate::attestation::AttestationLogEntry;
use crate::canonical::{self, canonical_sha256, format_timestamp};
use crate::explain::Explanation;
use crate::merkle::{self, MerkleError, MerkleProof};
use crate::signer::SignedOperation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::io::Write;
use tracing::{debug, info};
use uuid::Uuid;
use zip::write::SimpleFileOptions;

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// Export format of a pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackFormat {
    #[default]
    Json,
    Zip,
}

impl fmt::Display for PackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackFormat::Json => write!(f, "json"),
            PackFormat::Zip => write!(f, "zip"),
        }
    }
}

/// Input to [`generate_pack`]. Artifacts are moved into the pack; the
/// attestation logs are the full snapshot the Merkle proof is computed
/// over, in log order.
#[derive(Debug, Clone)]
pub struct PackRequest {
    pub decision_id: String,
    pub explanation: Option<Explanation>,
    pub signed_operation: Option<SignedOperation>,
    pub attestation_logs: Option<Vec<AttestationLogEntry>>,
    pub format: PackFormat,
}

/// The artifacts included in a pack. All copies, no shared state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackContents {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_operation: Option<SignedOperation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merkle_proof: Option<MerkleProof>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation_logs: Option<Vec<AttestationLogEntry>>,
}

/// A tamper-evident audit bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidencePack {
    pub pack_id: Uuid,
    pub decision_id: String,
    #[serde(with = "crate::canonical::ts_millis")]
    pub created_at: DateTime<Utc>,
    pub includes: PackContents,
    /// SHA-256 hex over the canonical form of the pack's fields.
    pub integrity_hash: String,
    pub format: PackFormat,
}

/// Errors from pack generation and export.
#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    #[error("proof generation failed: {0}")]
    Proof(#[from] MerkleError),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Generation & integrity
// ---------------------------------------------------------------------------

/// Assemble an evidence pack. When attestation logs are supplied and one
/// of them references the decision, an inclusion proof over the full
/// supplied log (in supplied order) is embedded; a missing match is not an
/// error, the pack simply carries no proof.
pub fn generate_pack(request: PackRequest) -> Result<EvidencePack, EvidenceError> {
    let merkle_proof = match &request.attestation_logs {
        Some(logs) => proof_for_decision(logs, &request.decision_id)?,
        None => None,
    };

    let includes = PackContents {
        explanation: request.explanation,
        signed_operation: request.signed_operation,
        merkle_proof,
        attestation_logs: request.attestation_logs,
    };

    let pack_id = Uuid::new_v4();
    let created_at = canonical::now_millis();
    let integrity_hash = compute_integrity_hash(&pack_id, &request.decision_id, &created_at, &includes);

    info!(
        pack_id = %pack_id,
        decision_id = %request.decision_id,
        has_proof = includes.merkle_proof.is_some(),
        "generated evidence pack"
    );

    Ok(EvidencePack {
        pack_id,
        decision_id: request.decision_id,
        created_at,
        includes,
        integrity_hash,
        format: request.format,
    })
}

/// Recompute the integrity hash from the pack's own fields and compare.
/// Any post-hoc mutation of an included field returns `false`.
pub fn verify_integrity(pack: &EvidencePack) -> bool {
    let expected =
        compute_integrity_hash(&pack.pack_id, &pack.decision_id, &pack.created_at, &pack.includes);
    expected == pack.integrity_hash
}

fn compute_integrity_hash(
    pack_id: &Uuid,
    decision_id: &str,
    created_at: &DateTime<Utc>,
    includes: &PackContents,
) -> String {
    let value = json!({
        "pack_id": pack_id.to_string(),
        "decision_id": decision_id,
        "created_at": format_timestamp(created_at),
        "explanation": includes.explanation,
        "signed_operation": includes.signed_operation,
        "merkle_proof": includes.merkle_proof,
        "attestation_logs": includes.attestation_logs,
    });
    canonical_sha256(&value)
}

/// Find the log entry referencing `decision_id` (metadata `decision_id`
/// field, else `action_hash` equality) and build its inclusion proof over
/// the supplied snapshot.
fn proof_for_decision(
    logs: &[AttestationLogEntry],
    decision_id: &str,
) -> Result<Option<MerkleProof>, EvidenceError> {
    let Some(index) = logs.iter().position(|entry| references(entry, decision_id)) else {
        debug!(decision_id, "no attestation entry references decision, pack carries no proof");
        return Ok(None);
    };

    let leaves: Vec<String> = logs.iter().map(|e| e.canonical()).collect();
    Ok(Some(merkle::generate_proof(&leaves, index)?))
}

fn references(entry: &AttestationLogEntry, decision_id: &str) -> bool {
    let via_metadata = entry
        .metadata
        .as_ref()
        .and_then(|m| m.get("decision_id"))
        .and_then(Value::as_str)
        .is_some_and(|id| id == decision_id);
    via_metadata || entry.action_hash == decision_id
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Export the pack as pretty-printed JSON.
pub fn export_json(pack: &EvidencePack) -> Result<String, EvidenceError> {
    Ok(serde_json::to_string_pretty(pack)?)
}

/// Export the pack as a ZIP archive: the full pack, one file per included
/// sub-artifact, and a human-readable summary.
pub fn export_zip(pack: &EvidencePack) -> Result<Vec<u8>, EvidenceError> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("pack.json", options)?;
    zip.write_all(export_json(pack)?.as_bytes())?;

    if let Some(explanation) = &pack.includes.explanation {
        zip.start_file("explanation.json", options)?;
        zip.write_all(serde_json::to_string_pretty(explanation)?.as_bytes())?;
    }
    if let Some(operation) = &pack.includes.signed_operation {
        zip.start_file("signed_operation.json", options)?;
        zip.write_all(serde_json::to_string_pretty(operation)?.as_bytes())?;
    }
    if let Some(proof) = &pack.includes.merkle_proof {
        zip.start_file("merkle_proof.json", options)?;
        zip.write_all(serde_json::to_string_pretty(proof)?.as_bytes())?;
    }
    if let Some(logs) = &pack.includes.attestation_logs {
        zip.start_file("attestation_logs.json", options)?;
        zip.write_all(serde_json::to_string_pretty(logs)?.as_bytes())?;
    }

    zip.start_file("SUMMARY.txt", options)?;
    zip.write_all(generate_summary(pack).as_bytes())?;

    Ok(zip.finish()?.into_inner())
}

/// Fixed-format plain-text report of the pack. Signatures are truncated;
/// raw key or signature material is never printed in full.
pub fn generate_summary(pack: &EvidencePack) -> String {
    let mut out = String::new();
    out.push_str("EVIDENCE PACK\n");
    out.push_str("=============\n");
    out.push_str(&format!("Pack ID:       {}\n", pack.pack_id));
    out.push_str(&format!("Decision ID:   {}\n", pack.decision_id));
    out.push_str(&format!("Created:       {}\n", format_timestamp(&pack.created_at)));
    out.push_str(&format!("Integrity:     sha256:{}\n", pack.integrity_hash));
    out.push_str(&format!("Format:        {}\n", pack.format));

    out.push_str("\nExplanation:\n");
    match &pack.includes.explanation {
        Some(explanation) => {
            out.push_str(&format!(
                "  Model:       {} v{}\n",
                explanation.model_name, explanation.model_version
            ));
            out.push_str(&format!("  Prediction:  {}\n", explanation.prediction));
            out.push_str(&format!(
                "  Confidence:  {:.0}%\n",
                explanation.confidence * 100.0
            ));
            out.push_str(&format!(
                "  Summary:     {}\n",
                explanation.natural_language_summary
            ));
        }
        None => out.push_str("  (not included)\n"),
    }

    out.push_str("\nSigned operation:\n");
    match &pack.includes.signed_operation {
        Some(operation) => {
            out.push_str(&format!("  Operation ID: {}\n", operation.operation_id));
            out.push_str(&format!("  Type:         {}\n", operation.operation_type));
            out.push_str(&format!("  Actor:        {}\n", operation.actor));
            out.push_str(&format!(
                "  Timestamp:    {}\n",
                format_timestamp(&operation.timestamp)
            ));
            out.push_str(&format!(
                "  Signature:    {} (truncated)\n",
                truncated(&operation.signature)
            ));
        }
        None => out.push_str("  (not included)\n"),
    }

    out.push_str("\nMerkle proof:\n");
    match &pack.includes.merkle_proof {
        Some(proof) => {
            out.push_str(&format!("  Root:  {}\n", proof.root_hash));
            out.push_str(&format!("  Leaf:  {}\n", proof.leaf_hash));
            out.push_str(&format!("  Path:  {} steps\n", proof.proof_path.len()));
        }
        None => out.push_str("  (not included)\n"),
    }

    let log_count = pack
        .includes
        .attestation_logs
        .as_ref()
        .map_or(0, |logs| logs.len());
    out.push_str(&format!("\nAttestation log entries: {log_count}\n"));
    out
}

fn truncated(value: &str) -> &str {
    // Signatures are base64 ASCII, so byte slicing is char-safe.
    if value.len() > 16 {
        &value[..16]
    } else {
        value
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
