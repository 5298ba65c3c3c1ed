use super::escrow::EscrowManager;
use super::ledger::Ledger;
use super::locks::{LockKey, LockManager};
use super::settlement::{Settlement, SettlementEngine};
use super::wallet::WalletAccessor;
use crate::config::LedgerConfig;
use crate::domain::changes::{Change, ChangeSet, DepositAddresses};
use crate::domain::escrow::GameEscrow;
use crate::domain::game::{Game, GameMove, GameResult, GameStatus};
use crate::domain::ids::{GameId, TransactionId, UserId};
use crate::domain::money::Amount;
use crate::domain::ports::LedgerStoreRef;
use crate::domain::settlement::Outcome;
use crate::domain::transaction::{CryptoMeta, TransactionType};
use crate::domain::user::{AppWallet, Role, User};
use crate::error::{LedgerError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything an auditor needs to review one game.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditTrail {
    pub game: Game,
    pub escrow: Option<GameEscrow>,
    /// Only populated for flagged games.
    pub moves: Vec<GameMove>,
}

/// The entry point used by the gameplay collaborator and the CLI.
///
/// `LedgerEngine` owns the store, the row locks and the configuration, and wires
/// the four ledger components together. It also keeps the user and game
/// registries those components depend on.
pub struct LedgerEngine {
    store: LedgerStoreRef,
    locks: Arc<LockManager>,
    config: LedgerConfig,
    ledger: Ledger,
    escrows: EscrowManager,
    settlement: SettlementEngine,
    wallet: WalletAccessor,
}

impl LedgerEngine {
    /// Creates a new `LedgerEngine` over `store`.
    ///
    /// # Arguments
    ///
    /// * `store` - Backing storage for every ledger table.
    /// * `config` - Fee rate, game modes, lock timeout and admin seed.
    pub fn new(store: LedgerStoreRef, config: LedgerConfig) -> Self {
        let locks = Arc::new(LockManager::new(config.lock_timeout()));
        let ledger = Ledger::new(Arc::clone(&store), Arc::clone(&locks));
        let escrows = EscrowManager::new(Arc::clone(&store), Arc::clone(&locks));
        let settlement =
            SettlementEngine::new(Arc::clone(&store), escrows.clone(), config.fee_rate);
        let wallet = WalletAccessor::new(
            Arc::clone(&store),
            ledger.clone(),
            config.min_games_before_withdrawal,
        );
        Self {
            store,
            locks,
            config,
            ledger,
            escrows,
            settlement,
            wallet,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn escrows(&self) -> &EscrowManager {
        &self.escrows
    }

    pub fn settlement(&self) -> &SettlementEngine {
        &self.settlement
    }

    pub fn wallet(&self) -> &WalletAccessor {
        &self.wallet
    }

    /// Ensures the app wallet exists and seeds the configured admin.
    ///
    /// Safe to run on every start: an existing wallet keeps its balance and no
    /// admin is added once one exists.
    pub async fn bootstrap(&self) -> Result<()> {
        let now = Utc::now();
        let mut changes = ChangeSet::new();
        changes.push(Change::InitWallet(AppWallet::new(now)));

        let seed = &self.config.admin;
        let _locks = self
            .locks
            .acquire([LockKey::Username(seed.username.clone())])
            .await?;
        if let Some(hash) = &seed.password_hash
            && !self.has_admin().await?
        {
            if self.store.user_by_username(&seed.username).await?.is_some() {
                warn!(username = %seed.username, "admin username taken by a player, not seeding");
            } else {
                let admin = User::new(UserId::generate(), &seed.username, hash, Role::Admin, now);
                info!(user = %admin.id, username = %admin.username, "admin seeded");
                changes.push(Change::PutUser(admin));
            }
        }
        self.store.commit(changes).await
    }

    async fn has_admin(&self) -> Result<bool> {
        Ok(self
            .store
            .users()
            .await?
            .iter()
            .any(|u| u.role == Role::Admin))
    }

    pub async fn register_user(
        &self,
        id: UserId,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User> {
        let _locks = self
            .locks
            .acquire([
                LockKey::User(id.clone()),
                LockKey::Username(username.to_string()),
            ])
            .await?;
        if self.store.user(&id).await?.is_some() {
            return Err(LedgerError::DuplicateUser(id.to_string()));
        }
        if self.store.user_by_username(username).await?.is_some() {
            return Err(LedgerError::DuplicateUser(username.to_string()));
        }

        let user = User::new(id, username, password_hash, role, Utc::now());
        let mut changes = ChangeSet::new();
        changes.push(Change::PutUser(user.clone()));
        self.store.commit(changes).await?;
        info!(user = %user.id, username, "user registered");
        Ok(user)
    }

    pub async fn set_banned(&self, id: &UserId, banned: bool) -> Result<()> {
        self.update_user(id, |user| user.is_banned = banned).await?;
        info!(user = %id, banned, "ban status changed");
        Ok(())
    }

    pub async fn set_frozen(&self, id: &UserId, frozen: bool) -> Result<()> {
        self.update_user(id, |user| user.is_frozen = frozen).await?;
        info!(user = %id, frozen, "freeze status changed");
        Ok(())
    }

    async fn update_user(&self, id: &UserId, apply: impl FnOnce(&mut User)) -> Result<()> {
        let _locks = self.locks.acquire([LockKey::User(id.clone())]).await?;
        let mut user = self
            .store
            .user(id)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(id.clone()))?;
        apply(&mut user);
        user.updated_at = Utc::now();

        let mut changes = ChangeSet::new();
        changes.push(Change::PutUser(user));
        self.store.commit(changes).await
    }

    /// Registers a `waiting` game whose stake and clocks come from `mode`.
    pub async fn register_game(&self, id: GameId, mode: &str) -> Result<Game> {
        let settings = self.config.game_mode(mode)?;
        let _locks = self.locks.acquire([LockKey::Game(id.clone())]).await?;
        if self.store.game(&id).await?.is_some() {
            return Err(LedgerError::DuplicateGame(id));
        }

        let game = Game::waiting(
            id,
            mode,
            settings.entry_fee,
            settings.time_control_secs,
            Utc::now(),
        );
        let mut changes = ChangeSet::new();
        changes.push(Change::PutGame(game.clone()));
        self.store.commit(changes).await?;
        info!(game = %game.id, mode, entry_fee = %game.entry_fee, "game registered");
        Ok(game)
    }

    /// Records the result of a `playing` game without settling it.
    pub async fn finish_game(&self, id: &GameId, result: GameResult) -> Result<Game> {
        let _locks = self.locks.acquire([LockKey::Game(id.clone())]).await?;
        let mut game = self.load_game(id).await?;
        game.finish(result, Utc::now())?;

        let mut changes = ChangeSet::new();
        changes.push(Change::PutGame(game.clone()));
        self.store.commit(changes).await?;
        Ok(game)
    }

    pub async fn append_move(&self, mv: GameMove) -> Result<()> {
        let _locks = self
            .locks
            .acquire([LockKey::Game(mv.game_id.clone())])
            .await?;
        self.load_game(&mv.game_id)
            .await?
            .expect_status(GameStatus::Playing, "playing")?;

        let mut changes = ChangeSet::new();
        changes.push(Change::AppendMove(mv));
        self.store.commit(changes).await
    }

    pub async fn game(&self, id: &GameId) -> Result<Option<Game>> {
        self.store.game(id).await
    }

    pub async fn audit_trail(&self, id: &GameId) -> Result<AuditTrail> {
        let game = self.load_game(id).await?;
        let escrow = self.store.escrow(id).await?;
        let moves = if game.flagged {
            self.store.moves(id).await?
        } else {
            Vec::new()
        };
        Ok(AuditTrail {
            game,
            escrow,
            moves,
        })
    }

    pub async fn set_deposit_addresses(&self, addresses: DepositAddresses) -> Result<()> {
        let mut changes = ChangeSet::new();
        changes.push(Change::SetDepositAddresses(addresses));
        self.store.commit(changes).await
    }

    pub async fn create_escrow(
        &self,
        game_id: &GameId,
        white: &UserId,
        black: &UserId,
        entry_fee: Amount,
    ) -> Result<GameEscrow> {
        self.escrows
            .create_escrow(game_id, white, black, entry_fee)
            .await
    }

    pub async fn release(
        &self,
        game_id: &GameId,
        white_payout: Decimal,
        black_payout: Decimal,
        platform_fee: Decimal,
    ) -> Result<()> {
        self.escrows
            .release(game_id, white_payout, black_payout, platform_fee)
            .await
    }

    pub async fn refund(&self, game_id: &GameId) -> Result<()> {
        self.escrows.refund(game_id).await
    }

    pub async fn settle_game(&self, game_id: &GameId, outcome: Outcome) -> Result<Settlement> {
        self.settlement.settle_game(game_id, outcome).await
    }

    pub async fn record_transaction(
        &self,
        user_id: Option<UserId>,
        r#type: TransactionType,
        amount: Decimal,
        crypto: Option<CryptoMeta>,
    ) -> Result<TransactionId> {
        self.ledger
            .record_transaction(user_id, r#type, amount, crypto)
            .await
    }

    pub async fn get_balance(&self, user_id: &UserId) -> Result<Decimal> {
        self.wallet.get_balance(user_id).await
    }

    /// All users, sorted by id.
    pub async fn users(&self) -> Result<Vec<User>> {
        let mut users = self.store.users().await?;
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    pub async fn app_wallet(&self) -> Result<Option<AppWallet>> {
        self.store.wallet().await
    }

    async fn load_game(&self, id: &GameId) -> Result<Game> {
        self.store
            .game(id)
            .await?
            .ok_or_else(|| LedgerError::GameNotFound(id.clone()))
    }
}
