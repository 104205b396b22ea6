//! In-memory implementation of `SequenceCounter`.
//!
//! All counters live in one `HashMap` behind a `Mutex`; the read, the
//! increment, and the write-back happen under a single lock acquisition,
//! which is what makes `next` an atomic increment-and-fetch. Two concurrent
//! callers for the same `(scope, period)` key always receive different,
//! consecutive values.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use kassa_contracts::{
    counter::CounterScope,
    error::{KassaError, KassaResult},
};
use kassa_core::traits::SequenceCounter;

type CounterKey = (CounterScope, i32);

/// Thread-safe in-memory counter store.
///
/// A key is created on first use with value 0, so the first value `next`
/// returns is 1. Values never decrease and keys are never removed.
#[derive(Default)]
pub struct InMemoryCounterStore {
    values: Mutex<HashMap<CounterKey, u64>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> KassaResult<MutexGuard<'_, HashMap<CounterKey, u64>>> {
        self.values.lock().map_err(|e| KassaError::PersistenceError {
            reason: format!("counter store lock poisoned: {}", e),
        })
    }
}

impl SequenceCounter for InMemoryCounterStore {
    fn next(&self, scope: CounterScope, period: i32) -> KassaResult<u64> {
        let mut values = self.lock()?;
        let value = values.entry((scope, period)).or_insert(0);
        *value += 1;
        debug!(scope = %scope, period, value = *value, "sequence number issued");
        Ok(*value)
    }

    fn current(&self, scope: CounterScope, period: i32) -> KassaResult<u64> {
        let values = self.lock()?;
        Ok(values.get(&(scope, period)).copied().unwrap_or(0))
    }
}
