use crate::application::engine::LedgerEngine;
use crate::domain::game::{Color, GameStatus};
use crate::domain::ids::{GameId, UserId};
use crate::domain::money::Amount;
use crate::domain::settlement::Outcome;
use crate::domain::transaction::CryptoType;
use crate::domain::user::Role;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Script-supplied users have no credentials.
const SCRIPT_PASSWORD_HASH: &str = "";

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Register,
    Deposit,
    Withdraw,
    Start,
    Settle,
    Abort,
    Freeze,
    Ban,
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptOutcome {
    White,
    Black,
    Draw,
    CheatWhite,
    CheatBlack,
}

impl From<ScriptOutcome> for Outcome {
    fn from(outcome: ScriptOutcome) -> Self {
        match outcome {
            ScriptOutcome::White => Outcome::Win(Color::White),
            ScriptOutcome::Black => Outcome::Win(Color::Black),
            ScriptOutcome::Draw => Outcome::Draw,
            ScriptOutcome::CheatWhite => Outcome::CheatForfeit {
                cheater: Color::White,
            },
            ScriptOutcome::CheatBlack => Outcome::CheatForfeit {
                cheater: Color::Black,
            },
        }
    }
}

/// One row of a command script. Columns an op does not use may be left empty.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Command {
    pub op: Op,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub opponent: Option<String>,
    #[serde(default)]
    pub game: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub outcome: Option<ScriptOutcome>,
    #[serde(default)]
    pub address: Option<String>,
}

impl Command {
    /// Runs the command against `engine`.
    ///
    /// Deposits and withdrawals are requested and completed in one step, standing
    /// in for the operator approval flow.
    pub async fn apply(&self, engine: &LedgerEngine) -> Result<()> {
        match self.op {
            Op::Register => {
                let name = self.field(&self.user, "user")?;
                engine
                    .register_user(UserId::new(name), name, SCRIPT_PASSWORD_HASH, Role::Player)
                    .await?;
            }
            Op::Deposit => {
                let user = self.user_id()?;
                let amount = self.amount()?;
                let id = engine
                    .wallet()
                    .request_deposit(&user, amount, CryptoType::Usdt)
                    .await?;
                engine.ledger().complete_transaction(id).await?;
            }
            Op::Withdraw => {
                let user = self.user_id()?;
                let amount = self.amount()?;
                let address = self.field(&self.address, "address")?;
                let id = engine
                    .wallet()
                    .request_withdrawal(&user, amount, CryptoType::Usdt, address)
                    .await?;
                engine.ledger().complete_transaction(id).await?;
            }
            Op::Start => {
                let white = self.user_id()?;
                let black = UserId::new(self.field(&self.opponent, "opponent")?);
                let mode = self.field(&self.mode, "mode")?;
                let id = self.game_id()?;
                // A start that failed after registering leaves its game waiting.
                let game = match engine.game(&id).await? {
                    Some(game) if game.status == GameStatus::Waiting && game.mode == mode => game,
                    _ => engine.register_game(id, mode).await?,
                };
                engine
                    .create_escrow(&game.id, &white, &black, Amount::new(game.entry_fee)?)
                    .await?;
            }
            Op::Settle => {
                let outcome = self.outcome.ok_or_else(|| self.missing("outcome"))?;
                engine.settle_game(&self.game_id()?, outcome.into()).await?;
            }
            Op::Abort => engine.refund(&self.game_id()?).await?,
            Op::Freeze => engine.set_frozen(&self.user_id()?, true).await?,
            Op::Ban => engine.set_banned(&self.user_id()?, true).await?,
        }
        Ok(())
    }

    fn field<'a>(&self, value: &'a Option<String>, name: &str) -> Result<&'a str> {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| self.missing(name))
    }

    fn user_id(&self) -> Result<UserId> {
        self.field(&self.user, "user").map(UserId::new)
    }

    fn game_id(&self) -> Result<GameId> {
        self.field(&self.game, "game").map(GameId::new)
    }

    fn amount(&self) -> Result<Amount> {
        Amount::new(self.amount.ok_or_else(|| self.missing("amount"))?)
    }

    fn missing(&self, name: &str) -> LedgerError {
        LedgerError::InvalidRequest(format!("{:?} requires {name}", self.op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::infrastructure::in_memory::InMemoryLedgerStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn command(op: Op) -> Command {
        Command {
            op,
            user: None,
            opponent: None,
            game: None,
            mode: None,
            amount: None,
            outcome: None,
            address: None,
        }
    }

    async fn engine() -> LedgerEngine {
        let engine = LedgerEngine::new(Arc::new(InMemoryLedgerStore::new()), LedgerConfig::default());
        engine.bootstrap().await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_script_game() {
        let engine = engine().await;
        for name in ["alice", "bob"] {
            let mut register = command(Op::Register);
            register.user = Some(name.to_string());
            register.apply(&engine).await.unwrap();

            let mut deposit = command(Op::Deposit);
            deposit.user = Some(name.to_string());
            deposit.amount = Some(dec!(10));
            deposit.apply(&engine).await.unwrap();
        }

        let mut start = command(Op::Start);
        start.user = Some("alice".to_string());
        start.opponent = Some("bob".to_string());
        start.game = Some("g1".to_string());
        start.mode = Some("blitz-3".to_string());
        start.apply(&engine).await.unwrap();

        let mut settle = command(Op::Settle);
        settle.game = Some("g1".to_string());
        settle.outcome = Some(ScriptOutcome::Black);
        settle.apply(&engine).await.unwrap();

        assert_eq!(engine.get_balance(&UserId::new("alice")).await.unwrap(), dec!(5));
        assert_eq!(engine.get_balance(&UserId::new("bob")).await.unwrap(), dec!(14));
        assert_eq!(engine.wallet().platform_balance().await.unwrap(), dec!(1));
    }

    #[tokio::test]
    async fn test_start_can_be_retried_after_funding() {
        let engine = engine().await;
        for name in ["alice", "bob"] {
            let mut register = command(Op::Register);
            register.user = Some(name.to_string());
            register.apply(&engine).await.unwrap();
        }
        let mut deposit = command(Op::Deposit);
        deposit.user = Some("alice".to_string());
        deposit.amount = Some(dec!(10));
        deposit.apply(&engine).await.unwrap();

        let mut start = command(Op::Start);
        start.user = Some("alice".to_string());
        start.opponent = Some("bob".to_string());
        start.game = Some("g1".to_string());
        start.mode = Some("blitz-3".to_string());
        assert!(matches!(
            start.apply(&engine).await,
            Err(LedgerError::InsufficientFunds { .. })
        ));

        deposit.user = Some("bob".to_string());
        deposit.apply(&engine).await.unwrap();
        start.apply(&engine).await.unwrap();

        let game = engine.game(&GameId::new("g1")).await.unwrap().unwrap();
        assert_eq!(game.status, GameStatus::Playing);
        assert_eq!(engine.get_balance(&UserId::new("bob")).await.unwrap(), dec!(5));

        // A game that is already underway is not reused.
        assert!(matches!(
            start.apply(&engine).await,
            Err(LedgerError::DuplicateGame(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_columns() {
        let engine = engine().await;
        assert!(matches!(
            command(Op::Deposit).apply(&engine).await,
            Err(LedgerError::InvalidRequest(_))
        ));

        let mut settle = command(Op::Settle);
        settle.game = Some("g1".to_string());
        assert!(matches!(
            settle.apply(&engine).await,
            Err(LedgerError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(
            Outcome::from(ScriptOutcome::CheatWhite),
            Outcome::CheatForfeit {
                cheater: Color::White
            }
        );
        assert_eq!(Outcome::from(ScriptOutcome::Draw), Outcome::Draw);
    }
}
