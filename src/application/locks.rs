use crate::domain::ids::{GameId, TransactionId, UserId};
use crate::error::{LedgerError, Result};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A row that writers must hold exclusively while they read-modify-write it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockKey {
    Game(GameId),
    Transaction(TransactionId),
    User(UserId),
    Username(String),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Game(id) => write!(f, "game {id}"),
            LockKey::Transaction(id) => write!(f, "transaction {id}"),
            LockKey::User(id) => write!(f, "user {id}"),
            LockKey::Username(name) => write!(f, "username {name}"),
        }
    }
}

type LockTable = DashMap<LockKey, Arc<Mutex<()>>>;

/// Row-level locks keyed by entity.
///
/// Operations touching disjoint rows never wait on each other. Keys are always
/// taken in sorted order, and waiting is bounded by the configured timeout.
pub struct LockManager {
    table: Arc<LockTable>,
    timeout: Duration,
}

impl LockManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            table: Arc::new(DashMap::new()),
            timeout,
        }
    }

    /// Acquires every key in `keys`, or none of them.
    pub async fn acquire(&self, keys: impl IntoIterator<Item = LockKey>) -> Result<LockSet> {
        let mut keys: Vec<LockKey> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let mut set = LockSet {
            guards: Vec::with_capacity(keys.len()),
            table: Arc::clone(&self.table),
        };
        for key in keys {
            let mutex = Arc::clone(self.table.entry(key.clone()).or_default().value());
            let guard = tokio::time::timeout(self.timeout, mutex.lock_owned())
                .await
                .map_err(|_| LedgerError::LockTimeout(key.to_string()))?;
            set.guards.push((key, guard));
        }
        Ok(set)
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.table.len()
    }
}

/// Guards held by one operation. Dropping it releases every lock.
pub struct LockSet {
    guards: Vec<(LockKey, OwnedMutexGuard<()>)>,
    table: Arc<LockTable>,
}

impl Drop for LockSet {
    fn drop(&mut self) {
        for (key, guard) in self.guards.drain(..) {
            drop(guard);
            // Only the table itself still references an idle mutex.
            self.table
                .remove_if(&key, |_, mutex| Arc::strong_count(mutex) == 1);
        }
    }
}
