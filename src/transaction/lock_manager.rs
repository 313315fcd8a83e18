use super::TransactionId;
use parking_lot::{Condvar, Mutex};

/// The database-wide write lock.
///
/// At most one read-write transaction holds it at a time. Acquisition is
/// re-entrant for the holding transaction; everyone else blocks until the
/// holder releases.
pub struct LockManager {
    holder: Mutex<Option<TransactionId>>,
    released: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            holder: Mutex::new(None),
            released: Condvar::new(),
        }
    }

    /// Block until the write lock is held by `tx_id`.
    pub fn acquire(&self, tx_id: TransactionId) {
        let mut holder = self.holder.lock();
        loop {
            match *holder {
                None => break,
                Some(owner) if owner == tx_id => return,
                Some(owner) => {
                    tracing::debug!("Transaction {} waiting on write lock held by {}", tx_id, owner);
                    self.released.wait(&mut holder);
                }
            }
        }
        *holder = Some(tx_id);
        tracing::debug!("Transaction {} acquired write lock", tx_id);
    }

    /// Take the write lock if it is free. Returns whether `tx_id` holds it.
    pub fn try_acquire(&self, tx_id: TransactionId) -> bool {
        let mut holder = self.holder.lock();
        match *holder {
            None => {
                *holder = Some(tx_id);
                tracing::debug!("Transaction {} acquired write lock", tx_id);
                true
            }
            Some(owner) => owner == tx_id,
        }
    }

    /// Release the write lock if `tx_id` holds it.
    pub fn release(&self, tx_id: TransactionId) {
        let mut holder = self.holder.lock();
        if *holder == Some(tx_id) {
            *holder = None;
            self.released.notify_one();
            tracing::debug!("Transaction {} released write lock", tx_id);
        }
    }

    pub fn holder(&self) -> Option<TransactionId> {
        *self.holder.lock()
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
