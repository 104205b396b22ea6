//! In-memory reference implementation of `TransactionStore`.
//!
//! Documents live in a `HashMap` behind a `Mutex`; the version check and
//! the replacement happen under one lock acquisition, which is what makes
//! `update` an atomic conditional write.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use kassa_contracts::{
    error::{KassaError, KassaResult},
    transaction::{Transaction, TransactionId},
};

use crate::traits::TransactionStore;

/// Thread-safe in-memory transaction store with optimistic versioned writes.
#[derive(Default)]
pub struct InMemoryTransactionStore {
    documents: Mutex<HashMap<TransactionId, Transaction>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> KassaResult<std::sync::MutexGuard<'_, HashMap<TransactionId, Transaction>>> {
        self.documents.lock().map_err(|e| KassaError::PersistenceError {
            reason: format!("transaction store lock poisoned: {}", e),
        })
    }
}

impl TransactionStore for InMemoryTransactionStore {
    fn insert(&self, tx: &Transaction) -> KassaResult<()> {
        let mut documents = self.lock()?;
        if documents.contains_key(&tx.id) {
            return Err(KassaError::PersistenceError {
                reason: format!("transaction '{}' already exists", tx.id),
            });
        }
        documents.insert(tx.id.clone(), tx.clone());
        Ok(())
    }

    fn get(&self, id: &TransactionId) -> KassaResult<Transaction> {
        let documents = self.lock()?;
        documents
            .get(id)
            .cloned()
            .ok_or_else(|| KassaError::NotFound { id: id.to_string() })
    }

    fn update(&self, tx: &Transaction) -> KassaResult<Transaction> {
        let mut documents = self.lock()?;
        let stored = documents
            .get(&tx.id)
            .ok_or_else(|| KassaError::NotFound { id: tx.id.to_string() })?;

        // The optimistic precondition: the caller must have seen the
        // current version.
        if stored.version != tx.version {
            return Err(KassaError::ConcurrencyConflict {
                resource: format!("transaction '{}'", tx.id),
            });
        }

        let mut updated = tx.clone();
        updated.version = tx.version + 1;
        updated.updated_at = Utc::now();
        documents.insert(tx.id.clone(), updated.clone());
        Ok(updated)
    }

    fn discard(&self, id: &TransactionId) -> KassaResult<()> {
        let mut documents = self.lock()?;
        documents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| KassaError::NotFound { id: id.to_string() })
    }
}
