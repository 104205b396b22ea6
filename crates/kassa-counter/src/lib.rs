//! # kassa-counter
//!
//! Duplicate-free sequence numbering for fiscal documents.
//!
//! Receipt and invoice numbers must be strictly increasing within a
//! calendar year with no duplicates across concurrent POS terminals — a
//! repeated receipt number is a compliance defect, not a cosmetic one.
//! Counters are therefore incremented with a single atomic
//! increment-and-fetch at the storage layer, never a separate read and
//! write from the caller.

pub mod memory;

pub use memory::InMemoryCounterStore;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use kassa_contracts::counter::CounterScope;
    use kassa_core::traits::SequenceCounter;

    use super::InMemoryCounterStore;

    /// The documented starting contract: an unseen key reads 0, the first
    /// issued value is 1.
    #[test]
    fn first_value_for_a_key_is_one() {
        let counters = InMemoryCounterStore::new();
        assert_eq!(counters.current(CounterScope::Receipt, 2024).unwrap(), 0);
        assert_eq!(counters.next(CounterScope::Receipt, 2024).unwrap(), 1);
        assert_eq!(counters.current(CounterScope::Receipt, 2024).unwrap(), 1);
    }

    #[test]
    fn values_are_sequential_within_a_key() {
        let counters = InMemoryCounterStore::new();
        for expected in 1..=5 {
            assert_eq!(counters.next(CounterScope::Invoice, 2024).unwrap(), expected);
        }
    }

    #[test]
    fn scopes_count_independently() {
        let counters = InMemoryCounterStore::new();
        counters.next(CounterScope::Receipt, 2024).unwrap();
        counters.next(CounterScope::Receipt, 2024).unwrap();

        assert_eq!(counters.next(CounterScope::Invoice, 2024).unwrap(), 1);
        assert_eq!(counters.next(CounterScope::AuditHash, 2024).unwrap(), 1);
    }

    #[test]
    fn periods_count_independently() {
        let counters = InMemoryCounterStore::new();
        counters.next(CounterScope::Receipt, 2024).unwrap();
        counters.next(CounterScope::Receipt, 2024).unwrap();

        // A new year restarts the numbering.
        assert_eq!(counters.next(CounterScope::Receipt, 2025).unwrap(), 1);
        assert_eq!(counters.current(CounterScope::Receipt, 2024).unwrap(), 2);
    }

    /// N concurrent callers receive exactly the integers {k+1, ..., k+N}
    /// with no repeats, regardless of completion order.
    #[test]
    fn concurrent_next_calls_never_duplicate() {
        let counters = Arc::new(InMemoryCounterStore::new());

        // Pre-advance so the batch does not start at a fresh key.
        let k = 7;
        for _ in 0..k {
            counters.next(CounterScope::Receipt, 2024).unwrap();
        }

        let threads: Vec<_> = (0..10)
            .map(|_| {
                let counters = Arc::clone(&counters);
                std::thread::spawn(move || {
                    (0..20)
                        .map(|_| counters.next(CounterScope::Receipt, 2024).unwrap())
                        .collect::<Vec<u64>>()
                })
            })
            .collect();

        let mut issued: Vec<u64> = Vec::new();
        for handle in threads {
            issued.extend(handle.join().unwrap());
        }

        let unique: HashSet<u64> = issued.iter().copied().collect();
        assert_eq!(unique.len(), 200, "no duplicate numbers across concurrent callers");

        let expected: HashSet<u64> = (k + 1..=k + 200).collect();
        assert_eq!(unique, expected, "issued values must be exactly {{k+1, ..., k+N}}");
    }
}
