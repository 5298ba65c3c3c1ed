use super::ids::{AccountId, TransactionId, UserId};
use super::money::ensure_well_formed;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    GameEntry,
    GameWin,
    GameLoss,
    GameDraw,
    CheatForfeit,
}

impl TransactionType {
    /// Whether a row of this type adds to the owner's balance.
    pub fn is_credit(&self) -> bool {
        match self {
            TransactionType::Deposit
            | TransactionType::GameWin
            | TransactionType::GameLoss
            | TransactionType::GameDraw => true,
            TransactionType::Withdrawal
            | TransactionType::GameEntry
            | TransactionType::CheatForfeit => false,
        }
    }

    /// Types a platform-only row may carry: the app wallet only ever receives fees.
    pub fn is_platform_fee(&self) -> bool {
        matches!(self, TransactionType::GameWin | TransactionType::GameDraw)
    }

    /// Zero-valued rows are allowed only where they carry audit meaning.
    fn allows_zero(&self) -> bool {
        matches!(
            self,
            TransactionType::GameLoss | TransactionType::GameDraw | TransactionType::CheatForfeit
        )
    }

    /// Turns a caller-supplied magnitude into the signed amount stored on the row.
    pub fn signed_amount(&self, magnitude: Decimal) -> Result<Decimal> {
        if magnitude.is_sign_negative() && !magnitude.is_zero() {
            return Err(LedgerError::InvalidAmount(format!(
                "{self} amount {magnitude} must not be negative"
            )));
        }
        if magnitude.is_zero() && !self.allows_zero() {
            return Err(LedgerError::InvalidAmount(format!(
                "{self} amount must be positive"
            )));
        }
        let magnitude = ensure_well_formed(magnitude)?;
        if magnitude.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(if self.is_credit() { magnitude } else { -magnitude })
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::GameEntry => "game_entry",
            TransactionType::GameWin => "game_win",
            TransactionType::GameLoss => "game_loss",
            TransactionType::GameDraw => "game_draw",
            TransactionType::CheatForfeit => "cheat_forfeit",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl TransactionStatus {
    /// Pending and approved rows may still be completed or rejected.
    pub fn is_open(&self) -> bool {
        matches!(self, TransactionStatus::Pending | TransactionStatus::Approved)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Approved => "approved",
            TransactionStatus::Rejected => "rejected",
            TransactionStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CryptoType {
    Btc,
    Eth,
    Usdt,
}

impl FromStr for CryptoType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "btc" => Ok(CryptoType::Btc),
            "eth" => Ok(CryptoType::Eth),
            "usdt" => Ok(CryptoType::Usdt),
            other => Err(LedgerError::InvalidRequest(format!(
                "unsupported crypto type {other}"
            ))),
        }
    }
}

/// Off-ledger payment details attached to deposits and withdrawals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoMeta {
    pub crypto_type: CryptoType,
    pub address: Option<String>,
}

/// An immutable fact about a balance change.
///
/// Only `status` and `processed_at` ever change, and only while the row is open.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: Option<UserId>,
    pub r#type: TransactionType,
    pub amount: Decimal,
    pub crypto_type: Option<CryptoType>,
    pub crypto_address: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn pending(
        user_id: Option<UserId>,
        r#type: TransactionType,
        amount: Decimal,
        crypto: Option<CryptoMeta>,
        now: DateTime<Utc>,
    ) -> Self {
        let (crypto_type, crypto_address) = match crypto {
            Some(meta) => (Some(meta.crypto_type), meta.address),
            None => (None, None),
        };
        Self {
            id: TransactionId::generate(),
            user_id,
            r#type,
            amount,
            crypto_type,
            crypto_address,
            status: TransactionStatus::Pending,
            created_at: now,
            processed_at: None,
        }
    }

    pub fn account(&self) -> AccountId {
        AccountId::from_owner(self.user_id.as_ref())
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    pub fn approve(&mut self) -> Result<()> {
        if self.status != TransactionStatus::Pending {
            return Err(self.finalized());
        }
        self.status = TransactionStatus::Approved;
        Ok(())
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.close(TransactionStatus::Completed, now)
    }

    pub fn reject(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.close(TransactionStatus::Rejected, now)
    }

    fn close(&mut self, status: TransactionStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.is_open() {
            return Err(self.finalized());
        }
        self.status = status;
        self.processed_at = Some(now);
        Ok(())
    }

    fn finalized(&self) -> LedgerError {
        LedgerError::AlreadyFinalized {
            id: self.id,
            status: self.status,
        }
    }
}
