use super::ids::{GameId, UserId};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Color::White => "white",
            Color::Black => "black",
        })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Playing,
    Finished,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameStatus::Waiting => "waiting",
            GameStatus::Playing => "playing",
            GameStatus::Finished => "finished",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    White,
    Black,
    Draw,
}

impl GameResult {
    pub fn winner(self) -> Option<Color> {
        match self {
            GameResult::White => Some(Color::White),
            GameResult::Black => Some(Color::Black),
            GameResult::Draw => None,
        }
    }
}

impl From<Color> for GameResult {
    fn from(color: Color) -> Self {
        match color {
            Color::White => GameResult::White,
            Color::Black => GameResult::Black,
        }
    }
}

/// A wagered game as seen by the ledger. Board state and clocks are owned by the
/// gameplay engine and carried here untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub mode: String,
    pub white_user_id: Option<UserId>,
    pub black_user_id: Option<UserId>,
    pub status: GameStatus,
    pub result: Option<GameResult>,
    pub game_state_json: Option<String>,
    pub white_time_remaining: u32,
    pub black_time_remaining: u32,
    pub entry_fee: Decimal,
    pub white_payout: Decimal,
    pub black_payout: Decimal,
    pub platform_fee: Decimal,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub flagged: bool,
    pub flag_reason: Option<String>,
}

impl Game {
    pub fn waiting(
        id: GameId,
        mode: impl Into<String>,
        entry_fee: Decimal,
        time_control_secs: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            mode: mode.into(),
            white_user_id: None,
            black_user_id: None,
            status: GameStatus::Waiting,
            result: None,
            game_state_json: None,
            white_time_remaining: time_control_secs,
            black_time_remaining: time_control_secs,
            entry_fee,
            white_payout: Decimal::ZERO,
            black_payout: Decimal::ZERO,
            platform_fee: Decimal::ZERO,
            started_at: None,
            ended_at: None,
            created_at: now,
            flagged: false,
            flag_reason: None,
        }
    }

    pub fn player(&self, color: Color) -> Option<&UserId> {
        match color {
            Color::White => self.white_user_id.as_ref(),
            Color::Black => self.black_user_id.as_ref(),
        }
    }

    pub fn start(&mut self, white: UserId, black: UserId, now: DateTime<Utc>) -> Result<()> {
        self.expect_status(GameStatus::Waiting, "waiting")?;
        self.white_user_id = Some(white);
        self.black_user_id = Some(black);
        self.status = GameStatus::Playing;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn finish(&mut self, result: GameResult, now: DateTime<Utc>) -> Result<()> {
        self.expect_status(GameStatus::Playing, "playing")?;
        self.status = GameStatus::Finished;
        self.result = Some(result);
        self.ended_at = Some(now);
        Ok(())
    }

    /// Ends a game that never produced a result. Payouts stay zero.
    pub fn abort(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status == GameStatus::Finished {
            return Err(LedgerError::InvalidGameState {
                game: self.id.clone(),
                expected: "waiting or playing",
                actual: self.status,
            });
        }
        self.status = GameStatus::Finished;
        self.result = None;
        self.ended_at = Some(now);
        self.white_payout = Decimal::ZERO;
        self.black_payout = Decimal::ZERO;
        self.platform_fee = Decimal::ZERO;
        Ok(())
    }

    pub fn flag(&mut self, reason: impl Into<String>) {
        self.flagged = true;
        self.flag_reason = Some(reason.into());
    }

    pub fn expect_status(&self, expected: GameStatus, label: &'static str) -> Result<()> {
        if self.status != expected {
            return Err(LedgerError::InvalidGameState {
                game: self.id.clone(),
                expected: label,
                actual: self.status,
            });
        }
        Ok(())
    }
}

/// One entry of the gameplay engine's append-only move log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMove {
    pub id: u64,
    pub game_id: GameId,
    pub move_number: u32,
    pub from_square: String,
    pub to_square: String,
    pub piece_type: String,
    pub piece_color: Color,
    pub captured_type: Option<String>,
    pub promotion_type: Option<String>,
    pub is_castling: bool,
    pub is_en_passant: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn game() -> Game {
        Game::waiting(GameId::new("g1"), "blitz-3", dec!(5), 180, Utc::now())
    }

    #[test]
    fn test_lifecycle() {
        let mut g = game();
        g.start(UserId::new("w"), UserId::new("b"), Utc::now())
            .unwrap();
        assert_eq!(g.status, GameStatus::Playing);
        assert_eq!(g.player(Color::Black), Some(&UserId::new("b")));

        g.finish(GameResult::Draw, Utc::now()).unwrap();
        assert_eq!(g.status, GameStatus::Finished);
        assert_eq!(g.result, Some(GameResult::Draw));
    }

    #[test]
    fn test_cannot_finish_waiting_game() {
        let mut g = game();
        assert!(matches!(
            g.finish(GameResult::White, Utc::now()),
            Err(LedgerError::InvalidGameState {
                actual: GameStatus::Waiting,
                ..
            })
        ));
    }

    #[test]
    fn test_abort_only_before_finish() {
        let mut g = game();
        g.abort(Utc::now()).unwrap();
        assert_eq!(g.result, None);
        assert!(g.abort(Utc::now()).is_err());
    }
}
