use super::escrow::{EscrowManager, stage_release};
use crate::domain::changes::ChangeSet;
use crate::domain::game::{Color, GameStatus};
use crate::domain::ids::GameId;
use crate::domain::money::{FeeRate, checked_sum};
use crate::domain::ports::LedgerStoreRef;
use crate::domain::settlement::{Outcome, Payouts, split_pot};
use crate::error::{LedgerError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

/// The effect of a settled game.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub game_id: GameId,
    pub outcome: Outcome,
    pub payouts: Payouts,
}

/// Turns a game's outcome into payouts and resolves its escrow.
#[derive(Clone)]
pub struct SettlementEngine {
    store: LedgerStoreRef,
    escrows: EscrowManager,
    fee_rate: FeeRate,
}

impl SettlementEngine {
    pub fn new(store: LedgerStoreRef, escrows: EscrowManager, fee_rate: FeeRate) -> Self {
        Self {
            store,
            escrows,
            fee_rate,
        }
    }

    pub fn fee_rate(&self) -> FeeRate {
        self.fee_rate
    }

    /// Settles `game_id` exactly once.
    ///
    /// A `playing` game is finished with `outcome`; a game that is already
    /// finished must carry the same result. Player statistics, the game's payout
    /// columns, every ledger row and the escrow release land in one commit.
    pub async fn settle_game(&self, game_id: &GameId, outcome: Outcome) -> Result<Settlement> {
        let mut ctx = self.escrows.lock_escrow(game_id).await?;
        ctx.escrow.ensure_held()?;

        let now = Utc::now();
        let result = outcome.result();
        match ctx.game.status {
            GameStatus::Finished if ctx.game.result == Some(result) => {}
            GameStatus::Finished => return Err(LedgerError::OutcomeMismatch(game_id.clone())),
            _ => ctx.game.finish(result, now)?,
        }

        let entry_fee = ctx.escrow.entry_fee;
        let payouts = split_pot(entry_fee, self.fee_rate, result);
        for side in [Color::White, Color::Black] {
            let payout = payouts.for_side(side);
            let user = ctx.user_mut(side);
            user.games_played += 1;
            match result.winner() {
                None => user.games_draw += 1,
                Some(winner) if winner == side => user.games_won += 1,
                Some(_) => user.games_lost += 1,
            }
            user.total_earnings =
                checked_sum(user.total_earnings, (payout - entry_fee).max(Decimal::ZERO))?;
            user.updated_at = now;
        }

        if let Some(cheater) = outcome.cheater() {
            ctx.game.flag(format!("cheat forfeit by {cheater}"));
            let user = ctx.user_mut(cheater);
            user.is_frozen = true;
            warn!(game = %game_id, user = %user.id, "cheater frozen");
        }

        let mut changes = ChangeSet::new();
        stage_release(&mut ctx, &mut changes, outcome, payouts, now)?;
        ctx.stage_rows(&mut changes);
        self.store.commit(changes).await?;

        info!(
            game = %game_id,
            white = %payouts.white,
            black = %payouts.black,
            platform_fee = %payouts.platform_fee,
            "game settled"
        );
        Ok(Settlement {
            game_id: game_id.clone(),
            outcome,
            payouts,
        })
    }
}
