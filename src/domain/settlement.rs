//! Pure payout arithmetic for a finished game.

use super::game::{Color, GameResult};
use super::money::{FeeRate, truncate_to_cents};
use super::transaction::TransactionType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a game ended, as reported by the gameplay engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win(Color),
    Draw,
    /// The named side was caught cheating; the opponent wins.
    CheatForfeit { cheater: Color },
}

impl Outcome {
    pub fn result(&self) -> GameResult {
        match *self {
            Outcome::Win(color) => color.into(),
            Outcome::Draw => GameResult::Draw,
            Outcome::CheatForfeit { cheater } => cheater.opponent().into(),
        }
    }

    pub fn cheater(&self) -> Option<Color> {
        match *self {
            Outcome::CheatForfeit { cheater } => Some(cheater),
            _ => None,
        }
    }

    /// The ledger entry type booked for `side` on settlement.
    pub fn transaction_type(&self, side: Color) -> TransactionType {
        match *self {
            Outcome::Draw => TransactionType::GameDraw,
            Outcome::Win(winner) if winner == side => TransactionType::GameWin,
            Outcome::Win(_) => TransactionType::GameLoss,
            Outcome::CheatForfeit { cheater } if cheater == side => TransactionType::CheatForfeit,
            Outcome::CheatForfeit { .. } => TransactionType::GameWin,
        }
    }

    /// The ledger entry type of the platform fee row.
    pub fn platform_transaction_type(&self) -> TransactionType {
        match self {
            Outcome::Draw => TransactionType::GameDraw,
            _ => TransactionType::GameWin,
        }
    }
}

impl From<GameResult> for Outcome {
    fn from(result: GameResult) -> Self {
        match result.winner() {
            Some(color) => Outcome::Win(color),
            None => Outcome::Draw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payouts {
    pub white: Decimal,
    pub black: Decimal,
    pub platform_fee: Decimal,
}

impl Payouts {
    pub fn for_side(&self, side: Color) -> Decimal {
        match side {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    pub fn total(&self) -> Decimal {
        self.white + self.black + self.platform_fee
    }
}

/// Splits the pot `2 * entry_fee` for `result`.
///
/// Player shares are truncated to cents; the platform takes whatever remains, so
/// the three parts always sum to the pot exactly.
pub fn split_pot(entry_fee: Decimal, fee_rate: FeeRate, result: GameResult) -> Payouts {
    let pot = entry_fee * Decimal::TWO;
    let keep = Decimal::ONE - fee_rate.value();
    match result.winner() {
        Some(winner) => {
            let prize = truncate_to_cents(pot * keep);
            let (white, black) = match winner {
                Color::White => (prize, Decimal::ZERO),
                Color::Black => (Decimal::ZERO, prize),
            };
            Payouts {
                white,
                black,
                platform_fee: pot - prize,
            }
        }
        None => {
            let share = truncate_to_cents(entry_fee * keep);
            Payouts {
                white: share,
                black: share,
                platform_fee: pot - share - share,
            }
        }
    }
}
