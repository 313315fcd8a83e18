pub mod clock;
pub mod lock_manager;
pub mod manager;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{DbError, DbResult};
use manager::TransactionManager;

/// Unique identifier for a transaction, allocated in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Create a transaction ID from a raw value
    pub fn from_u64(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx:{}", self.0)
    }
}

/// Transaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    /// Created but not started
    Created,
    /// Started; a read-write transaction holds the database write lock
    Started,
    Committed,
    RolledBack,
}

/// A database transaction.
///
/// Read-write transactions serialize on the database write lock from
/// [`start`](Transaction::start) until commit or rollback, and get their
/// commit timestamp when they start. Read-only transactions never lock.
/// Mutations are applied in place; rollback releases the lock but does
/// not undo them.
pub struct Transaction {
    id: TransactionId,
    read_only: bool,
    state: TransactionState,
    commit_timestamp: Option<DateTime<Utc>>,
    manager: Arc<TransactionManager>,
}

impl Transaction {
    pub(crate) fn new(id: TransactionId, read_only: bool, manager: Arc<TransactionManager>) -> Self {
        Self {
            id,
            read_only,
            state: TransactionState::Created,
            commit_timestamp: None,
            manager,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Commit timestamp; assigned when a read-write transaction starts.
    pub fn commit_timestamp(&self) -> Option<DateTime<Utc>> {
        self.commit_timestamp
    }

    /// Start the transaction. For a read-write transaction this blocks until
    /// the database write lock is available.
    pub fn start(&mut self) -> DbResult<()> {
        if self.state != TransactionState::Created {
            return Err(DbError::FailedPrecondition(format!(
                "transaction {} already started",
                self.id
            )));
        }
        if !self.read_only {
            self.manager.locks.acquire(self.id);
            self.commit_timestamp = Some(self.manager.next_commit_timestamp());
        }
        self.state = TransactionState::Started;
        tracing::debug!(
            "Transaction {} started (read_only={}, commit_ts={:?})",
            self.id,
            self.read_only,
            self.commit_timestamp
        );
        Ok(())
    }

    /// Commit, returning the commit timestamp of a read-write transaction.
    pub fn commit(mut self) -> DbResult<Option<DateTime<Utc>>> {
        if self.state != TransactionState::Started {
            return Err(DbError::FailedPrecondition(format!(
                "transaction {} was never started",
                self.id
            )));
        }
        self.finish(TransactionState::Committed);
        tracing::debug!("Transaction {} committed", self.id);
        Ok(self.commit_timestamp)
    }

    pub fn rollback(mut self) {
        self.finish(TransactionState::RolledBack);
        tracing::debug!("Transaction {} rolled back", self.id);
    }

    /// Gate for every mutation.
    pub(crate) fn check_mutable(&self) -> DbResult<()> {
        if self.read_only {
            return Err(DbError::ReadOnlyTransaction);
        }
        if self.state != TransactionState::Started {
            return Err(DbError::FailedPrecondition(format!(
                "transaction {} is not active",
                self.id
            )));
        }
        Ok(())
    }

    fn finish(&mut self, state: TransactionState) {
        if self.state == TransactionState::Started && !self.read_only {
            self.manager.locks.release(self.id);
        }
        self.state = state;
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state == TransactionState::Started {
            tracing::debug!("Transaction {} dropped while active, rolling back", self.id);
            self.finish(TransactionState::RolledBack);
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("read_only", &self.read_only)
            .field("state", &self.state)
            .field("commit_timestamp", &self.commit_timestamp)
            .finish()
    }
}
