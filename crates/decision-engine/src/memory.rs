use analysis_core::{SignalRecord, SignalStore};
use dashmap::DashMap;
use std::collections::BTreeMap;

/// Process-local signal memory.
///
/// Each symbol lives in one DashMap shard, so reads and writes for the same
/// symbol are serialized by the shard lock and `swap` is a single insert.
#[derive(Debug, Default)]
pub struct InMemorySignalStore {
    records: DashMap<String, SignalRecord>,
}

impl InMemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (String, SignalRecord)>,
    {
        let store = Self::new();
        for (symbol, record) in records {
            store.records.insert(symbol, record);
        }
        store
    }

    /// Sorted copy of every record, for persistence.
    pub fn records(&self) -> BTreeMap<String, SignalRecord> {
        self.records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn remove(&self, symbol: &str) -> Option<SignalRecord> {
        self.records.remove(symbol).map(|(_, record)| record)
    }
}

impl SignalStore for InMemorySignalStore {
    fn get(&self, symbol: &str) -> Option<SignalRecord> {
        self.records.get(symbol).map(|r| r.value().clone())
    }

    fn put(&self, symbol: &str, record: SignalRecord) {
        self.records.insert(symbol.to_string(), record);
    }

    fn swap(&self, symbol: &str, record: SignalRecord) -> Option<SignalRecord> {
        self.records.insert(symbol.to_string(), record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::Action;
    use chrono::Utc;
    use std::sync::Arc;
    use std::thread;

    fn record(action: Action, score: i32) -> SignalRecord {
        SignalRecord {
            action,
            score,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_get_put_swap() {
        let store = InMemorySignalStore::new();
        assert!(store.get("2330").is_none());

        assert!(store.swap("2330", record(Action::Buy, 70)).is_none());
        let previous = store.swap("2330", record(Action::Sell, 30)).unwrap();
        assert_eq!(previous.action, Action::Buy);
        assert_eq!(store.get("2330").unwrap().score, 30);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_round_trip_through_records() {
        let store = InMemorySignalStore::new();
        store.put("AAPL", record(Action::Hold, 55));
        store.put("MSFT", record(Action::StrongBuy, 88));

        let exported = store.records();
        assert_eq!(exported.keys().collect::<Vec<_>>(), vec!["AAPL", "MSFT"]);

        let restored = InMemorySignalStore::from_records(exported);
        assert_eq!(restored.get("MSFT").unwrap().action, Action::StrongBuy);
        assert_eq!(restored.remove("AAPL").unwrap().score, 55);
        assert!(!restored.is_empty());
    }

    #[test]
    fn test_concurrent_swaps_lose_no_updates() {
        let store = Arc::new(InMemorySignalStore::new());
        let threads = 8;
        let per_thread = 250;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let mut seen = 0;
                    for i in 0..per_thread {
                        if store.swap("SAME", record(Action::Buy, t * 1000 + i)).is_some() {
                            seen += 1;
                        }
                    }
                    seen
                })
            })
            .collect();

        let previous_seen: i32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // Every swap except the very first observed a predecessor
        assert_eq!(previous_seen, threads * per_thread - 1);
    }
}
