//! # Merkle Trees & Inclusion Proofs
//!
//! Builds binary hash trees over ordered string data and produces compact
//! inclusion proofs: a verifier holding only the root hash can confirm that
//! a given item is part of the committed dataset.
//!
//! Leaf hash is `SHA256(item)`; an internal node hashes the hex
//! concatenation of its children, `SHA256(left_hex ++ right_hex)`. When a
//! level has an odd node count the last node is paired with a copy of
//! itself. This duplication scheme is an inherited wire-compatibility
//! choice; it admits proof-construction subtleties under an adversarial
//! auditor, so the log layers above never accept externally supplied trees,
//! only trees rebuilt from their own entries.
//!
//! Input order is the canonical order. Data is never sorted: the append
//! index of a log entry *is* its leaf index.

use crate::canonical::hex_sha256;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A node in a Merkle tree. Leaves carry their original data; internal
/// nodes carry their children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleNode {
    /// SHA-256 hex of this node.
    pub hash: String,
    /// Left child, absent on leaves.
    pub left: Option<Box<MerkleNode>>,
    /// Right child, absent on leaves.
    pub right: Option<Box<MerkleNode>>,
    /// Original leaf data, absent on internal nodes.
    pub data: Option<String>,
}

/// Which side of the path node a proof sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Right,
}

/// One step of an inclusion proof: a sibling hash and its side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub hash: String,
    pub position: Position,
}

/// A compact proof that a leaf is included in the tree with root
/// `root_hash`. Steps are ordered leaf-to-root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf_hash: String,
    pub root_hash: String,
    pub proof_path: Vec<ProofStep>,
    pub leaf_index: usize,
}

/// Errors from tree construction and proof generation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MerkleError {
    #[error("cannot build a Merkle tree over empty input")]
    EmptyInput,

    #[error("leaf index {index} out of bounds for {len} leaves")]
    IndexOutOfBounds { index: usize, len: usize },
}

// ---------------------------------------------------------------------------
// Tree construction
// ---------------------------------------------------------------------------

/// Build a Merkle tree over `data` and return its root node.
pub fn build_tree(data: &[String]) -> Result<MerkleNode, MerkleError> {
    if data.is_empty() {
        return Err(MerkleError::EmptyInput);
    }

    let mut level: Vec<MerkleNode> = data
        .iter()
        .map(|item| MerkleNode {
            hash: hex_sha256(item.as_bytes()),
            left: None,
            right: None,
            data: Some(item.clone()),
        })
        .collect();

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        let mut iter = level.into_iter();
        while let Some(left) = iter.next() {
            // Odd node count: the last node pairs with a copy of itself.
            let right = iter.next().unwrap_or_else(|| left.clone());
            let hash = combine(&left.hash, &right.hash);
            next.push(MerkleNode {
                hash,
                left: Some(Box::new(left)),
                right: Some(Box::new(right)),
                data: None,
            });
        }
        level = next;
    }

    Ok(level.remove(0))
}

/// Root hash of the tree over `data`, without keeping the tree around.
pub fn root_hash(data: &[String]) -> Result<String, MerkleError> {
    if data.is_empty() {
        return Err(MerkleError::EmptyInput);
    }
    let mut level: Vec<String> = data.iter().map(|d| hex_sha256(d.as_bytes())).collect();
    while level.len() > 1 {
        level = parent_level(&level);
    }
    Ok(level.remove(0))
}

// ---------------------------------------------------------------------------
// Proofs
// ---------------------------------------------------------------------------

/// Generate an inclusion proof for `data[leaf_index]`.
pub fn generate_proof(data: &[String], leaf_index: usize) -> Result<MerkleProof, MerkleError> {
    if data.is_empty() {
        return Err(MerkleError::EmptyInput);
    }
    if leaf_index >= data.len() {
        return Err(MerkleError::IndexOutOfBounds {
            index: leaf_index,
            len: data.len(),
        });
    }

    let mut level: Vec<String> = data.iter().map(|d| hex_sha256(d.as_bytes())).collect();
    let leaf_hash = level[leaf_index].clone();
    let mut proof_path = Vec::new();
    let mut index = leaf_index;

    while level.len() > 1 {
        let sibling_index = if index % 2 == 0 { index + 1 } else { index - 1 };
        // A last, unpaired node is its own sibling.
        let (sibling_hash, position) = if sibling_index >= level.len() {
            (level[index].clone(), Position::Right)
        } else if sibling_index < index {
            (level[sibling_index].clone(), Position::Left)
        } else {
            (level[sibling_index].clone(), Position::Right)
        };
        proof_path.push(ProofStep {
            hash: sibling_hash,
            position,
        });

        level = parent_level(&level);
        index /= 2;
    }

    Ok(MerkleProof {
        leaf_hash,
        root_hash: level.remove(0),
        proof_path,
        leaf_index,
    })
}

/// Verify an inclusion proof against raw leaf data. Never fails: any
/// malformed or mismatched proof simply returns `false`.
pub fn verify_proof(proof: &MerkleProof, leaf_data: &str) -> bool {
    let mut current = hex_sha256(leaf_data.as_bytes());
    if current != proof.leaf_hash {
        return false;
    }
    for step in &proof.proof_path {
        current = match step.position {
            Position::Left => combine(&step.hash, &current),
            Position::Right => combine(&current, &step.hash),
        };
    }
    current == proof.root_hash
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Hash of an internal node from its children's hex hashes.
fn combine(left_hex: &str, right_hex: &str) -> String {
    let mut joined = String::with_capacity(left_hex.len() + right_hex.len());
    joined.push_str(left_hex);
    joined.push_str(right_hex);
    hex_sha256(joined.as_bytes())
}

/// Compute the parent level of a list of hashes, duplicating the last
/// element when the count is odd.
fn parent_level(level: &[String]) -> Vec<String> {
    let mut next = Vec::with_capacity(level.len().div_ceil(2));
    for pair in level.chunks(2) {
        let left = &pair[0];
        let right = pair.get(1).unwrap_or(left);
        next.push(combine(left, right));
    }
    next
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn items(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    // -- Construction -------------------------------------------------------

    #[test]
    fn test_empty_input_rejected() {
        assert_eq!(build_tree(&[]).unwrap_err(), MerkleError::EmptyInput);
        assert_eq!(root_hash(&[]).unwrap_err(), MerkleError::EmptyInput);
        assert_eq!(generate_proof(&[], 0).unwrap_err(), MerkleError::EmptyInput);
    }

    #[test]
    fn test_single_leaf_tree() {
        let data = items(&["only"]);
        let root = build_tree(&data).unwrap();
        assert_eq!(root.hash, hex_sha256(b"only"));
        assert_eq!(root.data.as_deref(), Some("only"));
        assert!(root.left.is_none());
        assert!(root.right.is_none());
    }

    #[test]
    fn test_two_leaf_tree() {
        let data = items(&["a", "b"]);
        let root = build_tree(&data).unwrap();
        let expected = combine(&hex_sha256(b"a"), &hex_sha256(b"b"));
        assert_eq!(root.hash, expected);
        assert_eq!(root.left.as_ref().unwrap().data.as_deref(), Some("a"));
        assert_eq!(root.right.as_ref().unwrap().data.as_deref(), Some("b"));
    }

    #[test]
    fn test_odd_count_duplicates_last() {
        let data = items(&["a", "b", "c"]);
        let root = build_tree(&data).unwrap();
        let ab = combine(&hex_sha256(b"a"), &hex_sha256(b"b"));
        let cc = combine(&hex_sha256(b"c"), &hex_sha256(b"c"));
        assert_eq!(root.hash, combine(&ab, &cc));
    }

    #[test]
    fn test_root_hash_matches_tree() {
        let data = items(&["w", "x", "y", "z", "q"]);
        assert_eq!(root_hash(&data).unwrap(), build_tree(&data).unwrap().hash);
    }

    #[test]
    fn test_input_order_is_canonical() {
        let forward = items(&["a", "b"]);
        let reversed = items(&["b", "a"]);
        assert_ne!(root_hash(&forward).unwrap(), root_hash(&reversed).unwrap());
    }

    #[test]
    fn test_single_element_change_changes_root() {
        let data = items(&["a", "b", "c", "d"]);
        let original = root_hash(&data).unwrap();
        for i in 0..data.len() {
            let mut mutated = data.clone();
            mutated[i] = format!("{}-tampered", mutated[i]);
            assert_ne!(root_hash(&mutated).unwrap(), original);
        }
    }

    // -- Proof generation ---------------------------------------------------

    #[test]
    fn test_proof_index_out_of_bounds() {
        let data = items(&["a", "b"]);
        let err = generate_proof(&data, 2).unwrap_err();
        assert_eq!(err, MerkleError::IndexOutOfBounds { index: 2, len: 2 });
    }

    #[test]
    fn test_proof_for_single_leaf_is_empty_path() {
        let data = items(&["solo"]);
        let proof = generate_proof(&data, 0).unwrap();
        assert!(proof.proof_path.is_empty());
        assert_eq!(proof.leaf_hash, proof.root_hash);
        assert!(verify_proof(&proof, "solo"));
    }

    #[test]
    fn test_proof_roundtrip_all_indices() {
        for n in 1..=9 {
            let data: Vec<String> = (0..n).map(|i| format!("entry-{i}")).collect();
            for i in 0..n {
                let proof = generate_proof(&data, i).unwrap();
                assert!(
                    verify_proof(&proof, &data[i]),
                    "proof failed for index {i} of {n}"
                );
                assert_eq!(proof.leaf_index, i);
                assert_eq!(proof.root_hash, root_hash(&data).unwrap());
            }
        }
    }

    #[test]
    fn test_scenario_four_leaves_index_two() {
        let data = items(&["a", "b", "c", "d"]);
        let proof = generate_proof(&data, 2).unwrap();
        assert!(verify_proof(&proof, "c"));
        assert!(!verify_proof(&proof, "c2"));
    }

    #[test]
    fn test_proof_path_length_is_tree_depth() {
        let data: Vec<String> = (0..8).map(|i| format!("e{i}")).collect();
        let proof = generate_proof(&data, 3).unwrap();
        assert_eq!(proof.proof_path.len(), 3);
    }

    #[test]
    fn test_proof_for_duplicated_last_leaf() {
        // Index 2 of 3 pairs with a copy of itself at the first level.
        let data = items(&["a", "b", "c"]);
        let proof = generate_proof(&data, 2).unwrap();
        assert_eq!(proof.proof_path[0].hash, hex_sha256(b"c"));
        assert_eq!(proof.proof_path[0].position, Position::Right);
        assert!(verify_proof(&proof, "c"));
    }

    // -- Proof verification -------------------------------------------------

    #[test]
    fn test_verify_rejects_wrong_leaf_data() {
        let data = items(&["x", "y", "z"]);
        let proof = generate_proof(&data, 1).unwrap();
        assert!(!verify_proof(&proof, "Y"));
        assert!(!verify_proof(&proof, ""));
    }

    #[test]
    fn test_verify_rejects_tampered_root() {
        let data = items(&["x", "y", "z"]);
        let mut proof = generate_proof(&data, 1).unwrap();
        proof.root_hash = "0".repeat(64);
        assert!(!verify_proof(&proof, "y"));
    }

    #[test]
    fn test_verify_rejects_tampered_path() {
        let data = items(&["x", "y", "z", "w"]);
        let mut proof = generate_proof(&data, 0).unwrap();
        proof.proof_path[0].hash = hex_sha256(b"forged");
        assert!(!verify_proof(&proof, "x"));
    }

    #[test]
    fn test_verify_rejects_swapped_position() {
        let data = items(&["x", "y", "z", "w"]);
        let mut proof = generate_proof(&data, 0).unwrap();
        proof.proof_path[0].position = Position::Left;
        assert!(!verify_proof(&proof, "x"));
    }

    // -- Serialization ------------------------------------------------------

    #[test]
    fn test_proof_serialization_roundtrip() {
        let data = items(&["a", "b", "c", "d", "e"]);
        let proof = generate_proof(&data, 4).unwrap();
        let json = serde_json::to_string(&proof).expect("serialize");
        let restored: MerkleProof = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, proof);
        assert!(verify_proof(&restored, "e"));
    }

    #[test]
    fn test_position_serde_tags() {
        assert_eq!(serde_json::to_string(&Position::Left).unwrap(), "\"left\"");
        assert_eq!(serde_json::to_string(&Position::Right).unwrap(), "\"right\"");
    }
}
