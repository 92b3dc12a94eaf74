//! Append-only store of signed operations.
//!
//! Owns every [`SignedOperation`] appended to it, keyed by `operation_id`
//! and queryable by actor and type. There is deliberately no update or
//! delete surface. Appends take `&mut self` (single-writer discipline);
//! reads take `&self` and may proceed concurrently against a snapshot.

use crate::signer::SignedOperation;
use crate::types::OperationType;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Errors from the signature store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("operation {operation_id} is already stored")]
    DuplicateOperation { operation_id: Uuid },
}

/// Insertion-ordered, append-only collection of signed operations.
#[derive(Debug, Clone, Default)]
pub struct SignatureStore {
    operations: Vec<SignedOperation>,
    index: HashMap<Uuid, usize>,
}

impl SignatureStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a signed operation. Duplicate `operation_id`s are rejected;
    /// records are never overwritten.
    pub fn store(&mut self, operation: SignedOperation) -> Result<(), StoreError> {
        if self.index.contains_key(&operation.operation_id) {
            return Err(StoreError::DuplicateOperation {
                operation_id: operation.operation_id,
            });
        }
        debug!(operation_id = %operation.operation_id, "stored signed operation");
        self.index.insert(operation.operation_id, self.operations.len());
        self.operations.push(operation);
        Ok(())
    }

    /// Look up an operation by id.
    pub fn get(&self, operation_id: Uuid) -> Option<&SignedOperation> {
        self.index
            .get(&operation_id)
            .map(|&idx| &self.operations[idx])
    }

    /// All operations signed by `actor`, in append order.
    pub fn list_by_actor(&self, actor: &str) -> Vec<&SignedOperation> {
        self.operations.iter().filter(|op| op.actor == actor).collect()
    }

    /// All operations of the given type, in append order.
    pub fn list_by_type(&self, operation_type: OperationType) -> Vec<&SignedOperation> {
        self.operations
            .iter()
            .filter(|op| op.operation_type == operation_type)
            .collect()
    }

    /// Number of stored operations.
    pub fn count(&self) -> usize {
        self.operations.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Point-in-time copy of every stored operation, in append order.
    pub fn all(&self) -> Vec<SignedOperation> {
        self.operations.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::{generate_keypair, sign_data_export, sign_price_update};

    fn sample_ops() -> (SignedOperation, SignedOperation, SignedOperation) {
        let keypair = generate_keypair();
        let a = sign_price_update("alice", "SKU-1", 100.0, 110.0, &keypair.private_key).unwrap();
        let b = sign_price_update("bob", "SKU-2", 50.0, 45.0, &keypair.private_key).unwrap();
        let c = sign_data_export("alice", "orders", 10, &keypair.private_key).unwrap();
        (a, b, c)
    }

    #[test]
    fn test_store_and_get() {
        let (a, _, _) = sample_ops();
        let mut store = SignatureStore::new();
        store.store(a.clone()).unwrap();

        assert_eq!(store.count(), 1);
        assert_eq!(store.get(a.operation_id).unwrap().actor, "alice");
        assert!(store.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let (a, _, _) = sample_ops();
        let mut store = SignatureStore::new();
        store.store(a.clone()).unwrap();

        let err = store.store(a.clone()).unwrap_err();
        assert_eq!(
            err,
            StoreError::DuplicateOperation {
                operation_id: a.operation_id
            }
        );
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_list_by_actor() {
        let (a, b, c) = sample_ops();
        let mut store = SignatureStore::new();
        store.store(a).unwrap();
        store.store(b).unwrap();
        store.store(c).unwrap();

        let alice = store.list_by_actor("alice");
        assert_eq!(alice.len(), 2);
        assert!(store.list_by_actor("nobody").is_empty());
    }

    #[test]
    fn test_list_by_type() {
        let (a, b, c) = sample_ops();
        let mut store = SignatureStore::new();
        store.store(a).unwrap();
        store.store(b).unwrap();
        store.store(c).unwrap();

        assert_eq!(store.list_by_type(OperationType::PriceUpdate).len(), 2);
        assert_eq!(store.list_by_type(OperationType::DataExport).len(), 1);
        assert!(store.list_by_type(OperationType::RefundApproval).is_empty());
    }

    #[test]
    fn test_append_order_preserved() {
        let (a, b, c) = sample_ops();
        let ids = [a.operation_id, b.operation_id, c.operation_id];
        let mut store = SignatureStore::new();
        store.store(a).unwrap();
        store.store(b).unwrap();
        store.store(c).unwrap();

        let snapshot = store.all();
        let snapshot_ids: Vec<Uuid> = snapshot.iter().map(|op| op.operation_id).collect();
        assert_eq!(snapshot_ids, ids);
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let (a, b, _) = sample_ops();
        let mut store = SignatureStore::new();
        store.store(a).unwrap();
        let snapshot = store.all();
        store.store(b).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.count(), 2);
    }
}
