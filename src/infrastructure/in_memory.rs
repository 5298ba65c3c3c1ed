use crate::domain::changes::{Change, ChangeSet};
use crate::domain::escrow::GameEscrow;
use crate::domain::game::{Game, GameMove};
use crate::domain::ids::{GameId, TransactionId, UserId};
use crate::domain::money::checked_sum;
use crate::domain::ports::{LedgerSnapshot, LedgerStore};
use crate::domain::transaction::Transaction;
use crate::domain::user::{AppWallet, User};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    wallet: Option<AppWallet>,
    transactions: HashMap<TransactionId, Transaction>,
    games: HashMap<GameId, Game>,
    escrows: HashMap<GameId, GameEscrow>,
    moves: HashMap<GameId, Vec<GameMove>>,
}

impl Tables {
    /// Checks every change against the current rows before anything is written.
    fn validate(&self, changes: &ChangeSet) -> Result<()> {
        let mut balance = self.wallet.as_ref().map(|w| w.balance);
        for change in changes.iter() {
            match change {
                Change::InitWallet(wallet) => {
                    balance.get_or_insert(wallet.balance);
                }
                Change::CreditPlatform(delta) => {
                    let current = balance.ok_or_else(missing_wallet)?;
                    balance = Some(checked_sum(current, *delta)?);
                }
                Change::SetDepositAddresses(_) => {
                    balance.ok_or_else(missing_wallet)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn apply(&mut self, change: Change) {
        match change {
            Change::PutUser(user) => {
                self.users.insert(user.id.clone(), user);
            }
            Change::InitWallet(wallet) => {
                self.wallet.get_or_insert(wallet);
            }
            Change::CreditPlatform(delta) => {
                if let Some(wallet) = self.wallet.as_mut() {
                    wallet.balance += delta;
                    wallet.updated_at = Utc::now();
                }
            }
            Change::SetDepositAddresses(addresses) => {
                if let Some(wallet) = self.wallet.as_mut() {
                    addresses.apply_to(wallet);
                    wallet.updated_at = Utc::now();
                }
            }
            Change::PutTransaction(tx) => {
                self.transactions.insert(tx.id, tx);
            }
            Change::PutGame(game) => {
                self.games.insert(game.id.clone(), game);
            }
            Change::PutEscrow(escrow) => {
                self.escrows.insert(escrow.game_id.clone(), escrow);
            }
            Change::AppendMove(mv) => {
                self.moves.entry(mv.game_id.clone()).or_default().push(mv);
            }
        }
    }
}

fn missing_wallet() -> LedgerError {
    LedgerError::InternalError(Box::new(std::io::Error::other(
        "App wallet not initialized",
    )))
}

/// A thread-safe in-memory ledger.
///
/// All tables live behind one `RwLock`, so a commit is applied under a single
/// write guard and readers never observe half of a change set.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn user(&self, id: &UserId) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn users(&self) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().cloned().collect())
    }

    async fn wallet(&self) -> Result<Option<AppWallet>> {
        let tables = self.tables.read().await;
        Ok(tables.wallet.clone())
    }

    async fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let tables = self.tables.read().await;
        Ok(tables.transactions.get(&id).cloned())
    }

    async fn transactions_for(&self, user: &UserId) -> Result<Vec<Transaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transactions
            .values()
            .filter(|tx| tx.user_id.as_ref() == Some(user))
            .cloned()
            .collect())
    }

    async fn game(&self, id: &GameId) -> Result<Option<Game>> {
        let tables = self.tables.read().await;
        Ok(tables.games.get(id).cloned())
    }

    async fn escrow(&self, game: &GameId) -> Result<Option<GameEscrow>> {
        let tables = self.tables.read().await;
        Ok(tables.escrows.get(game).cloned())
    }

    async fn moves(&self, game: &GameId) -> Result<Vec<GameMove>> {
        let tables = self.tables.read().await;
        Ok(tables.moves.get(game).cloned().unwrap_or_default())
    }

    async fn snapshot(&self) -> Result<LedgerSnapshot> {
        let tables = self.tables.read().await;
        Ok(LedgerSnapshot {
            users: tables.users.values().cloned().collect(),
            wallet: tables.wallet.clone(),
            transactions: tables.transactions.values().cloned().collect(),
        })
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.validate(&changes)?;
        for change in changes {
            tables.apply(change);
        }
        Ok(())
    }
}
