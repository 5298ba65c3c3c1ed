use super::ids::UserId;
use super::money::checked_sum;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Player,
}

/// A platform user together with the cached projection of their ledger balance.
///
/// `wallet_balance` is only ever changed by [`User::apply_delta`], which is called
/// while completing a ledger transaction; the transaction log stays authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub wallet_balance: Decimal,
    pub games_played: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub games_draw: u32,
    pub total_earnings: Decimal,
    pub is_banned: bool,
    pub is_frozen: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        id: UserId,
        username: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            password_hash: password_hash.into(),
            role,
            wallet_balance: Decimal::ZERO,
            games_played: 0,
            games_won: 0,
            games_lost: 0,
            games_draw: 0,
            total_earnings: Decimal::ZERO,
            is_banned: false,
            is_frozen: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.is_banned || self.is_frozen
    }

    pub fn ensure_unrestricted(&self) -> Result<()> {
        if self.is_restricted() {
            return Err(LedgerError::UserRestricted(self.id.clone()));
        }
        Ok(())
    }

    pub fn ensure_funds(&self, required: Decimal) -> Result<()> {
        if self.wallet_balance < required {
            return Err(LedgerError::InsufficientFunds {
                user: self.id.clone(),
                balance: self.wallet_balance,
                required,
            });
        }
        Ok(())
    }

    /// Applies a signed balance delta, refusing to go negative or overflow.
    pub fn apply_delta(&mut self, delta: Decimal, now: DateTime<Utc>) -> Result<()> {
        if delta.is_sign_negative() {
            self.ensure_funds(-delta)?;
        }
        self.wallet_balance = checked_sum(self.wallet_balance, delta)?;
        self.updated_at = now;
        Ok(())
    }
}

/// The platform's own float. Exactly one exists per ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppWallet {
    pub id: u8,
    pub balance: Decimal,
    pub btc_address: Option<String>,
    pub eth_address: Option<String>,
    pub usdt_address: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl AppWallet {
    pub const SINGLETON_ID: u8 = 1;

    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: Self::SINGLETON_ID,
            balance: Decimal::ZERO,
            btc_address: None,
            eth_address: None,
            usdt_address: None,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn player() -> User {
        User::new(UserId::new("u1"), "alice", "hash", Role::Player, Utc::now())
    }

    #[test]
    fn test_apply_credit_and_debit() {
        let mut user = player();
        user.apply_delta(dec!(10.0), Utc::now()).unwrap();
        user.apply_delta(dec!(-4.5), Utc::now()).unwrap();
        assert_eq!(user.wallet_balance, dec!(5.5));
    }

    #[test]
    fn test_apply_debit_insufficient() {
        let mut user = player();
        user.apply_delta(dec!(3.0), Utc::now()).unwrap();

        let result = user.apply_delta(dec!(-5.0), Utc::now());
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(user.wallet_balance, dec!(3.0));
    }

    #[test]
    fn test_apply_credit_overflow() {
        let mut user = player();
        user.wallet_balance = Decimal::MAX;

        let result = user.apply_delta(dec!(1), Utc::now());
        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
        assert_eq!(user.wallet_balance, Decimal::MAX);
    }

    #[test]
    fn test_restricted_flags() {
        let mut user = player();
        assert!(user.ensure_unrestricted().is_ok());

        user.is_frozen = true;
        assert!(matches!(
            user.ensure_unrestricted(),
            Err(LedgerError::UserRestricted(_))
        ));

        user.is_frozen = false;
        user.is_banned = true;
        assert!(user.is_restricted());
    }
}
