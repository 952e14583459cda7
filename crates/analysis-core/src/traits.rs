use crate::SignalRecord;

/// Caller-owned memory of the last signal per symbol.
///
/// The decision engine never owns this state; it only reads and writes through
/// the trait, so lifetime and persistence (in-memory map, bounded cache,
/// durable table) are up to the caller. Implementations must serialize access
/// per symbol.
pub trait SignalStore: Send + Sync {
    fn get(&self, symbol: &str) -> Option<SignalRecord>;

    fn put(&self, symbol: &str, record: SignalRecord);

    /// Store `record` and return the previous one as a single step.
    ///
    /// The default is a plain get-then-put; override it when the backing
    /// store can do the exchange atomically.
    fn swap(&self, symbol: &str, record: SignalRecord) -> Option<SignalRecord> {
        let previous = self.get(symbol);
        self.put(symbol, record);
        previous
    }
}
