use crate::domain::ids::AccountId;
use crate::domain::user::User;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// Final state of one account as written to the output CSV.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct AccountState {
    pub account: String,
    pub balance: Decimal,
    pub games_played: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub games_draw: u32,
    pub total_earnings: Decimal,
    pub frozen: bool,
}

impl AccountState {
    /// The app wallet's row. It has no game statistics.
    pub fn platform(balance: Decimal) -> Self {
        Self {
            account: AccountId::Platform.to_string(),
            balance: balance.normalize(),
            games_played: 0,
            games_won: 0,
            games_lost: 0,
            games_draw: 0,
            total_earnings: Decimal::ZERO,
            frozen: false,
        }
    }
}

impl From<&User> for AccountState {
    fn from(user: &User) -> Self {
        Self {
            account: user.id.to_string(),
            balance: user.wallet_balance.normalize(),
            games_played: user.games_played,
            games_won: user.games_won,
            games_lost: user.games_lost,
            games_draw: user.games_draw,
            total_earnings: user.total_earnings.normalize(),
            frozen: user.is_frozen,
        }
    }
}

/// Writes account states as CSV with a header row.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_accounts(&mut self, accounts: impl IntoIterator<Item = AccountState>) -> Result<()> {
        for account in accounts {
            self.writer.serialize(account)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
