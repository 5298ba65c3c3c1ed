use super::ids::{GameId, UserId};
use super::money::checked_sum;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EscrowStatus {
    Held,
    Released,
    Refunded,
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EscrowStatus::Held => "held",
            EscrowStatus::Released => "released",
            EscrowStatus::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

/// Funds held for the duration of one game.
///
/// Leaves `Held` exactly once, to either `Released` or `Refunded`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEscrow {
    pub game_id: GameId,
    pub white_user_id: UserId,
    pub black_user_id: UserId,
    pub entry_fee: Decimal,
    pub total_amount: Decimal,
    pub status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

impl GameEscrow {
    /// `entry_fee` is a validated [`super::money::Amount`], so doubling it cannot overflow.
    pub fn held(
        game_id: GameId,
        white_user_id: UserId,
        black_user_id: UserId,
        entry_fee: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            game_id,
            white_user_id,
            black_user_id,
            entry_fee,
            total_amount: entry_fee * Decimal::TWO,
            status: EscrowStatus::Held,
            created_at: now,
            released_at: None,
        }
    }

    pub fn ensure_held(&self) -> Result<()> {
        if self.status != EscrowStatus::Held {
            return Err(LedgerError::AlreadyResolved {
                game: self.game_id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// Checks that a payout split distributes exactly the held pot.
    pub fn ensure_conserved(&self, white: Decimal, black: Decimal, platform_fee: Decimal) -> Result<()> {
        let mismatch = || LedgerError::PayoutMismatch {
            game: self.game_id.clone(),
            white,
            black,
            platform_fee,
            total_amount: self.total_amount,
        };
        let negative = [white, black, platform_fee]
            .iter()
            .any(|v| v.is_sign_negative() && !v.is_zero());
        if negative {
            return Err(mismatch());
        }
        let total = checked_sum(white, black)
            .and_then(|sum| checked_sum(sum, platform_fee))
            .map_err(|_| mismatch())?;
        if total != self.total_amount {
            return Err(mismatch());
        }
        Ok(())
    }

    pub fn release(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_held()?;
        self.status = EscrowStatus::Released;
        self.released_at = Some(now);
        Ok(())
    }

    pub fn refund(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_held()?;
        self.status = EscrowStatus::Refunded;
        self.released_at = Some(now);
        Ok(())
    }
}
