use super::ledger::{post_platform_entry, post_user_entry};
use super::locks::{LockKey, LockManager, LockSet};
use crate::domain::changes::{Change, ChangeSet};
use crate::domain::escrow::GameEscrow;
use crate::domain::game::{Color, Game, GameStatus};
use crate::domain::ids::{GameId, UserId};
use crate::domain::money::Amount;
use crate::domain::ports::LedgerStoreRef;
use crate::domain::settlement::{Outcome, Payouts};
use crate::domain::transaction::TransactionType;
use crate::domain::user::User;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

/// An escrow together with every row its resolution touches, read under lock.
pub(crate) struct EscrowContext {
    _locks: LockSet,
    pub escrow: GameEscrow,
    pub game: Game,
    pub white: User,
    pub black: User,
}

impl EscrowContext {
    pub fn user_mut(&mut self, side: Color) -> &mut User {
        match side {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    /// Pushes the final state of every locked row.
    pub fn stage_rows(&self, changes: &mut ChangeSet) {
        changes.push(Change::PutUser(self.white.clone()));
        changes.push(Change::PutUser(self.black.clone()));
        changes.push(Change::PutGame(self.game.clone()));
        changes.push(Change::PutEscrow(self.escrow.clone()));
    }
}

/// Owns the lifecycle of each game's held pot: `held -> released | refunded`.
#[derive(Clone)]
pub struct EscrowManager {
    store: LedgerStoreRef,
    locks: Arc<LockManager>,
}

impl EscrowManager {
    pub fn new(store: LedgerStoreRef, locks: Arc<LockManager>) -> Self {
        Self { store, locks }
    }

    /// Debits both players and holds the pot for `game_id`.
    ///
    /// The game must be registered and `waiting` with the same entry fee; it moves
    /// to `playing` in the same commit.
    pub async fn create_escrow(
        &self,
        game_id: &GameId,
        white_id: &UserId,
        black_id: &UserId,
        entry_fee: Amount,
    ) -> Result<GameEscrow> {
        if white_id == black_id {
            return Err(LedgerError::SelfMatch(white_id.clone()));
        }
        let _locks = self
            .locks
            .acquire([
                LockKey::Game(game_id.clone()),
                LockKey::User(white_id.clone()),
                LockKey::User(black_id.clone()),
            ])
            .await?;

        if self.store.escrow(game_id).await?.is_some() {
            return Err(LedgerError::DuplicateEscrow(game_id.clone()));
        }
        let mut game = self.load_game(game_id).await?;
        game.expect_status(GameStatus::Waiting, "waiting")?;
        let fee = entry_fee.value();
        if game.entry_fee != fee {
            return Err(LedgerError::InvalidAmount(format!(
                "entry fee {fee} does not match game {game_id} ({})",
                game.entry_fee
            )));
        }

        let mut white = self.load_user(white_id).await?;
        let mut black = self.load_user(black_id).await?;
        for player in [&white, &black] {
            player.ensure_unrestricted()?;
            player.ensure_funds(fee)?;
        }

        let now = Utc::now();
        let debit = TransactionType::GameEntry.signed_amount(fee)?;
        let mut changes = ChangeSet::new();
        post_user_entry(&mut changes, &mut white, TransactionType::GameEntry, debit, now)?;
        post_user_entry(&mut changes, &mut black, TransactionType::GameEntry, debit, now)?;
        game.start(white.id.clone(), black.id.clone(), now)?;
        let escrow = GameEscrow::held(game_id.clone(), white.id.clone(), black.id.clone(), fee, now);

        changes.push(Change::PutUser(white));
        changes.push(Change::PutUser(black));
        changes.push(Change::PutGame(game));
        changes.push(Change::PutEscrow(escrow.clone()));
        self.store.commit(changes).await?;

        info!(game = %game_id, white = %white_id, black = %black_id, entry_fee = %fee, "escrow created");
        Ok(escrow)
    }

    /// Pays out a finished game's pot. The split must sum exactly to the pot.
    pub async fn release(
        &self,
        game_id: &GameId,
        white_payout: Decimal,
        black_payout: Decimal,
        platform_fee: Decimal,
    ) -> Result<()> {
        let mut ctx = self.lock_escrow(game_id).await?;
        ctx.escrow.ensure_held()?;
        ctx.game.expect_status(GameStatus::Finished, "finished")?;
        let outcome = match ctx.game.result {
            Some(result) => Outcome::from(result),
            None => {
                return Err(LedgerError::InvalidGameState {
                    game: game_id.clone(),
                    expected: "finished with a result",
                    actual: ctx.game.status,
                });
            }
        };

        let payouts = Payouts {
            white: white_payout,
            black: black_payout,
            platform_fee,
        };
        let mut changes = ChangeSet::new();
        stage_release(&mut ctx, &mut changes, outcome, payouts, Utc::now())?;
        ctx.stage_rows(&mut changes);
        self.store.commit(changes).await?;

        info!(game = %game_id, white = %white_payout, black = %black_payout, platform_fee = %platform_fee, "escrow released");
        Ok(())
    }

    /// Returns each player's entry fee for a game that ended without a result.
    pub async fn refund(&self, game_id: &GameId) -> Result<()> {
        let mut ctx = self.lock_escrow(game_id).await?;
        let now = Utc::now();
        ctx.escrow.refund(now)?;
        ctx.game.abort(now)?;

        let fee = ctx.escrow.entry_fee;
        let mut changes = ChangeSet::new();
        for side in [Color::White, Color::Black] {
            post_user_entry(&mut changes, ctx.user_mut(side), TransactionType::GameEntry, fee, now)?;
        }
        ctx.stage_rows(&mut changes);
        self.store.commit(changes).await?;

        info!(game = %game_id, entry_fee = %fee, "escrow refunded");
        Ok(())
    }

    /// Locks the game and both players, then reads them.
    pub(crate) async fn lock_escrow(&self, game_id: &GameId) -> Result<EscrowContext> {
        let players = self.load_escrow(game_id).await?;
        let locks = self
            .locks
            .acquire([
                LockKey::Game(game_id.clone()),
                LockKey::User(players.white_user_id.clone()),
                LockKey::User(players.black_user_id.clone()),
            ])
            .await?;

        // Players are fixed at creation, so the locks above still cover them.
        let escrow = self.load_escrow(game_id).await?;
        let game = self.load_game(game_id).await?;
        let white = self.load_user(&escrow.white_user_id).await?;
        let black = self.load_user(&escrow.black_user_id).await?;
        Ok(EscrowContext {
            _locks: locks,
            escrow,
            game,
            white,
            black,
        })
    }

    async fn load_escrow(&self, game_id: &GameId) -> Result<GameEscrow> {
        self.store
            .escrow(game_id)
            .await?
            .ok_or_else(|| LedgerError::EscrowNotFound(game_id.clone()))
    }

    async fn load_game(&self, game_id: &GameId) -> Result<Game> {
        self.store
            .game(game_id)
            .await?
            .ok_or_else(|| LedgerError::GameNotFound(game_id.clone()))
    }

    async fn load_user(&self, user_id: &UserId) -> Result<User> {
        self.store
            .user(user_id)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(user_id.clone()))
    }
}

/// Books the payout rows for `outcome` and marks the escrow released.
///
/// Only nonzero payouts are booked, except the forfeiting party's zero
/// `cheat_forfeit` marker. The platform fee goes to the app wallet.
pub(crate) fn stage_release(
    ctx: &mut EscrowContext,
    changes: &mut ChangeSet,
    outcome: Outcome,
    payouts: Payouts,
    now: DateTime<Utc>,
) -> Result<()> {
    ctx.escrow
        .ensure_conserved(payouts.white, payouts.black, payouts.platform_fee)?;

    for side in [Color::White, Color::Black] {
        let amount = payouts.for_side(side);
        let kind = outcome.transaction_type(side);
        if amount.is_zero() && kind != TransactionType::CheatForfeit {
            continue;
        }
        let signed = kind.signed_amount(amount)?;
        post_user_entry(changes, ctx.user_mut(side), kind, signed, now)?;
    }
    if !payouts.platform_fee.is_zero() {
        post_platform_entry(
            changes,
            outcome.platform_transaction_type(),
            payouts.platform_fee,
            now,
        )?;
    }

    ctx.game.white_payout = payouts.white;
    ctx.game.black_payout = payouts.black;
    ctx.game.platform_fee = payouts.platform_fee;
    ctx.escrow.release(now)
}
