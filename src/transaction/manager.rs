use super::clock::Clock;
use super::lock_manager::LockManager;
use super::{Transaction, TransactionId};
use chrono::{DateTime, Duration, DurationRound, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hands out transactions and commit timestamps for one database.
pub struct TransactionManager {
    pub(super) locks: LockManager,
    clock: Arc<dyn Clock>,
    /// Guarded separately from the write lock.
    last_commit: Mutex<Option<DateTime<Utc>>>,
    next_id: AtomicU64,
}

impl TransactionManager {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            locks: LockManager::new(),
            clock,
            last_commit: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a transaction. It does nothing until started.
    pub fn begin(self: &Arc<Self>, read_only: bool) -> Transaction {
        let id = TransactionId::from_u64(self.next_id.fetch_add(1, Ordering::Relaxed));
        Transaction::new(id, read_only, Arc::clone(self))
    }

    /// The next commit timestamp: the clock truncated to microseconds,
    /// bumped past the previous one if the clock hasn't moved on.
    pub(super) fn next_commit_timestamp(&self) -> DateTime<Utc> {
        let tick = Duration::microseconds(1);
        let mut last = self.last_commit.lock();

        let now = self.clock.now();
        let mut ts = now.duration_trunc(tick).unwrap_or(now);
        if let Some(prev) = *last {
            if ts <= prev {
                ts = prev + tick;
            }
        }
        *last = Some(ts);
        ts
    }

    pub fn last_commit_timestamp(&self) -> Option<DateTime<Utc>> {
        *self.last_commit.lock()
    }

    pub fn write_lock_holder(&self) -> Option<TransactionId> {
        self.locks.holder()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::clock::FixedClock;
    use chrono::TimeZone;

    fn fixed_manager() -> (Arc<FixedClock>, Arc<TransactionManager>) {
        let start = Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap()
            + Duration::nanoseconds(1_234_567);
        let clock = Arc::new(FixedClock::new(start));
        let manager = Arc::new(TransactionManager::new(clock.clone()));
        (clock, manager)
    }

    #[test]
    fn test_commit_timestamps_truncate_to_micros() {
        let (clock, manager) = fixed_manager();
        let ts = manager.next_commit_timestamp();
        assert_eq!(ts, clock.now() - Duration::nanoseconds(567));
        assert_eq!(manager.last_commit_timestamp(), Some(ts));
    }

    #[test]
    fn test_commit_timestamps_strictly_increase() {
        let (clock, manager) = fixed_manager();
        let first = manager.next_commit_timestamp();
        let second = manager.next_commit_timestamp();
        let third = manager.next_commit_timestamp();
        assert_eq!(second, first + Duration::microseconds(1));
        assert_eq!(third, second + Duration::microseconds(1));

        // A clock running backwards still gives increasing timestamps.
        clock.advance(Duration::seconds(-10));
        assert_eq!(
            manager.next_commit_timestamp(),
            third + Duration::microseconds(1)
        );

        clock.advance(Duration::seconds(20));
        let later = manager.next_commit_timestamp();
        assert!(later > third + Duration::seconds(9));
    }

    #[test]
    fn test_transaction_ids_are_unique() {
        let (_, manager) = fixed_manager();
        let a = manager.begin(false);
        let b = manager.begin(true);
        assert_ne!(a.id(), b.id());
        assert!(a.id() < b.id());
    }
}
