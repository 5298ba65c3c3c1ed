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
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for user rows.
pub const CF_USERS: &str = "users";
/// Column Family holding the single app wallet row.
pub const CF_APP_WALLET: &str = "app_wallet";
/// Column Family for the transaction log.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family for game rows.
pub const CF_GAMES: &str = "games";
/// Column Family for escrow rows, keyed by game id.
pub const CF_ESCROWS: &str = "game_escrow";
/// Column Family for the move log, keyed by game id and move id.
pub const CF_MOVES: &str = "game_moves";

const ALL_CFS: [&str; 6] = [CF_USERS, CF_APP_WALLET, CF_TRANSACTIONS, CF_GAMES, CF_ESCROWS, CF_MOVES];
const WALLET_KEY: [u8; 1] = [AppWallet::SINGLETON_ID];

/// A persistent ledger backed by RocksDB.
///
/// Each table lives in its own Column Family. A [`ChangeSet`] is written as one
/// `WriteBatch`, so a commit either lands completely or not at all.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    // Serializes commits so platform credits read the latest wallet row.
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            LedgerError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    fn move_key(game: &GameId, id: u64) -> Vec<u8> {
        let mut key = Self::move_prefix(game);
        key.extend_from_slice(&id.to_be_bytes());
        key
    }

    fn move_prefix(game: &GameId) -> Vec<u8> {
        let mut key = game.as_str().as_bytes().to_vec();
        key.push(0);
        key
    }
}

fn missing_wallet() -> LedgerError {
    LedgerError::InternalError(Box::new(std::io::Error::other(
        "App wallet not initialized",
    )))
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn user(&self, id: &UserId) -> Result<Option<User>> {
        self.get_json(CF_USERS, id.as_str().as_bytes())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users: Vec<User> = self.scan(CF_USERS)?;
        Ok(users.into_iter().find(|u| u.username == username))
    }

    async fn users(&self) -> Result<Vec<User>> {
        self.scan(CF_USERS)
    }

    async fn wallet(&self) -> Result<Option<AppWallet>> {
        self.get_json(CF_APP_WALLET, &WALLET_KEY)
    }

    async fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        self.get_json(CF_TRANSACTIONS, id.as_bytes())
    }

    async fn transactions_for(&self, user: &UserId) -> Result<Vec<Transaction>> {
        let txs: Vec<Transaction> = self.scan(CF_TRANSACTIONS)?;
        Ok(txs
            .into_iter()
            .filter(|tx| tx.user_id.as_ref() == Some(user))
            .collect())
    }

    async fn game(&self, id: &GameId) -> Result<Option<Game>> {
        self.get_json(CF_GAMES, id.as_str().as_bytes())
    }

    async fn escrow(&self, game: &GameId) -> Result<Option<GameEscrow>> {
        self.get_json(CF_ESCROWS, game.as_str().as_bytes())
    }

    async fn moves(&self, game: &GameId) -> Result<Vec<GameMove>> {
        let cf = self.cf(CF_MOVES)?;
        let prefix = Self::move_prefix(game);
        let mut moves = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix.as_slice(), Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            moves.push(serde_json::from_slice(&value)?);
        }
        Ok(moves)
    }

    async fn snapshot(&self) -> Result<LedgerSnapshot> {
        let snapshot = self.db.snapshot();

        let mut users = Vec::new();
        for item in snapshot.iterator_cf(self.cf(CF_USERS)?, IteratorMode::Start) {
            let (_key, value) = item?;
            users.push(serde_json::from_slice(&value)?);
        }

        let mut transactions = Vec::new();
        for item in snapshot.iterator_cf(self.cf(CF_TRANSACTIONS)?, IteratorMode::Start) {
            let (_key, value) = item?;
            transactions.push(serde_json::from_slice(&value)?);
        }

        let wallet = match snapshot.get_cf(self.cf(CF_APP_WALLET)?, WALLET_KEY)? {
            Some(bytes) => Some(serde_json::from_slice(&bytes)?),
            None => None,
        };

        Ok(LedgerSnapshot {
            users,
            wallet,
            transactions,
        })
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let _guard = self.commit_lock.lock().await;

        let mut batch = WriteBatch::default();
        let mut wallet: Option<AppWallet> = self.get_json(CF_APP_WALLET, &WALLET_KEY)?;
        let mut wallet_dirty = false;

        for change in changes {
            match change {
                Change::PutUser(user) => {
                    batch.put_cf(
                        self.cf(CF_USERS)?,
                        user.id.as_str().as_bytes(),
                        serde_json::to_vec(&user)?,
                    );
                }
                Change::InitWallet(w) => {
                    if wallet.is_none() {
                        wallet = Some(w);
                        wallet_dirty = true;
                    }
                }
                Change::CreditPlatform(delta) => {
                    let w = wallet.as_mut().ok_or_else(missing_wallet)?;
                    w.balance = checked_sum(w.balance, delta)?;
                    w.updated_at = Utc::now();
                    wallet_dirty = true;
                }
                Change::SetDepositAddresses(addresses) => {
                    let w = wallet.as_mut().ok_or_else(missing_wallet)?;
                    addresses.apply_to(w);
                    w.updated_at = Utc::now();
                    wallet_dirty = true;
                }
                Change::PutTransaction(tx) => {
                    batch.put_cf(
                        self.cf(CF_TRANSACTIONS)?,
                        tx.id.as_bytes(),
                        serde_json::to_vec(&tx)?,
                    );
                }
                Change::PutGame(game) => {
                    batch.put_cf(
                        self.cf(CF_GAMES)?,
                        game.id.as_str().as_bytes(),
                        serde_json::to_vec(&game)?,
                    );
                }
                Change::PutEscrow(escrow) => {
                    batch.put_cf(
                        self.cf(CF_ESCROWS)?,
                        escrow.game_id.as_str().as_bytes(),
                        serde_json::to_vec(&escrow)?,
                    );
                }
                Change::AppendMove(mv) => {
                    batch.put_cf(
                        self.cf(CF_MOVES)?,
                        Self::move_key(&mv.game_id, mv.id),
                        serde_json::to_vec(&mv)?,
                    );
                }
            }
        }

        if wallet_dirty && let Some(w) = wallet {
            batch.put_cf(self.cf(CF_APP_WALLET)?, WALLET_KEY, serde_json::to_vec(&w)?);
        }

        self.db.write(batch)?;
        Ok(())
    }
}
