use super::changes::ChangeSet;
use super::escrow::GameEscrow;
use super::game::{Game, GameMove};
use super::ids::{GameId, TransactionId, UserId};
use super::transaction::Transaction;
use super::user::{AppWallet, User};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A consistent view of every balance-bearing row, for reconciliation.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub users: Vec<User>,
    pub wallet: Option<AppWallet>,
    pub transactions: Vec<Transaction>,
}

/// Durable storage for the ledger tables.
///
/// Reads return committed state only. `commit` applies a whole [`ChangeSet`]
/// atomically; callers serialize conflicting writers with row locks.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn user(&self, id: &UserId) -> Result<Option<User>>;
    async fn user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn users(&self) -> Result<Vec<User>>;
    async fn wallet(&self) -> Result<Option<AppWallet>>;
    async fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>>;
    async fn transactions_for(&self, user: &UserId) -> Result<Vec<Transaction>>;
    async fn game(&self, id: &GameId) -> Result<Option<Game>>;
    async fn escrow(&self, game: &GameId) -> Result<Option<GameEscrow>>;
    async fn moves(&self, game: &GameId) -> Result<Vec<GameMove>>;
    async fn snapshot(&self) -> Result<LedgerSnapshot>;
    async fn commit(&self, changes: ChangeSet) -> Result<()>;
}

pub type LedgerStoreRef = Arc<dyn LedgerStore>;
pub type LedgerStoreFactory = Box<dyn Fn() -> LedgerStoreRef + Send + Sync>;
