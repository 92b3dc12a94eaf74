//! # Attestation Log
//!
//! An append-only, totally ordered sequence of action records. The append
//! index of an entry is its leaf position in the Merkle tree built over
//! the log, so appends must be serialized (single-writer: `&mut self`)
//! while reads work against point-in-time snapshots. Entries are never
//! edited or deleted.

use crate::canonical::{self, canonical_sha256, hex_sha256};
use crate::merkle::{self, MerkleError, MerkleProof};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// One attested action. The `action_hash` identifies what happened (for
/// example the canonical hash of an explanation or a signed operation);
/// `metadata` carries free-form context such as the originating
/// `decision_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttestationLogEntry {
    /// SHA-256 hex of the attested action.
    pub action_hash: String,
    #[serde(with = "crate::canonical::ts_millis")]
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl AttestationLogEntry {
    /// Build an entry stamped with the current time.
    pub fn new(action_hash: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            action_hash: action_hash.into(),
            timestamp: canonical::now_millis(),
            actor: actor.into(),
            metadata: None,
        }
    }

    /// Attach metadata to the entry.
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Canonical serialization of the entry; the Merkle leaf content.
    pub fn canonical(&self) -> String {
        let value =
            serde_json::to_value(self).expect("attestation entry serialization is infallible");
        canonical::canonical_json(&value)
    }

    /// Canonical hash of the entry.
    pub fn canonical_hash(&self) -> String {
        let value =
            serde_json::to_value(self).expect("attestation entry serialization is infallible");
        canonical_sha256(&value)
    }
}

/// Hash arbitrary action bytes into an `action_hash`.
pub fn hash_action(data: &[u8]) -> String {
    hex_sha256(data)
}

/// Append-only manager over an ordered attestation log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttestationLogManager {
    entries: Vec<AttestationLogEntry>,
}

impl AttestationLogManager {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its index, which is also its Merkle leaf
    /// position.
    pub fn append(&mut self, entry: AttestationLogEntry) -> usize {
        let index = self.entries.len();
        debug!(index, actor = %entry.actor, "appended attestation entry");
        self.entries.push(entry);
        index
    }

    /// Point-in-time copy of the full log, in append order.
    pub fn get_all(&self) -> Vec<AttestationLogEntry> {
        self.entries.clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries recorded by `actor`, in append order.
    pub fn get_by_actor(&self, actor: &str) -> Vec<&AttestationLogEntry> {
        self.entries.iter().filter(|e| e.actor == actor).collect()
    }

    /// All entries with the given `action_hash`, in append order.
    pub fn get_by_action_hash(&self, action_hash: &str) -> Vec<&AttestationLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.action_hash == action_hash)
            .collect()
    }

    /// Merkle root over the current log snapshot.
    pub fn root_hash(&self) -> Result<String, MerkleError> {
        merkle::root_hash(&self.leaves())
    }

    /// Inclusion proof for the first entry with `action_hash`, against the
    /// current full log snapshot. `Ok(None)` when the hash is not present.
    pub fn generate_proof_for_log(
        &self,
        action_hash: &str,
    ) -> Result<Option<MerkleProof>, MerkleError> {
        let Some(index) = self
            .entries
            .iter()
            .position(|e| e.action_hash == action_hash)
        else {
            return Ok(None);
        };
        let proof = merkle::generate_proof(&self.leaves(), index)?;
        Ok(Some(proof))
    }

    fn leaves(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.canonical()).collect()
    }
}
