use crate::error::{LedgerError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fractional digits a monetary value may carry (cents).
pub const MONEY_SCALE: u32 = 2;

/// Largest magnitude a single amount may carry. Pots and payouts derived from
/// bounded amounts stay far below `Decimal::MAX`.
pub const MAX_AMOUNT: Decimal = dec!(1000000000000);

/// Rejects values carrying more precision than [`MONEY_SCALE`] or a magnitude
/// above [`MAX_AMOUNT`].
pub fn ensure_well_formed(value: Decimal) -> Result<Decimal> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::InvalidAmount(format!(
            "{value} has more than {MONEY_SCALE} decimal places"
        )));
    }
    if value.abs() > MAX_AMOUNT {
        return Err(LedgerError::InvalidAmount(format!(
            "{value} exceeds the maximum of {MAX_AMOUNT}"
        )));
    }
    Ok(value)
}

/// Adds two balances, failing instead of overflowing.
pub fn checked_sum(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| LedgerError::InvalidAmount(format!("{a} + {b} overflows")))
}

/// Truncates towards zero at cent precision.
pub fn truncate_to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::ToZero)
}

/// Represents a strictly positive monetary amount (entry fees, deposits, withdrawals).
///
/// Construction validates both the sign and the precision, so an `Amount` can be
/// handed to any ledger operation without further checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "{value} must be positive"
            )));
        }
        ensure_well_formed(value).map(Self)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Share of a game pot retained by the platform, in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct FeeRate(Decimal);

impl FeeRate {
    pub const DEFAULT: FeeRate = FeeRate(dec!(0.1));

    pub fn new(value: Decimal) -> Result<Self> {
        if value < Decimal::ZERO || value >= Decimal::ONE {
            return Err(LedgerError::ConfigError(format!(
                "fee rate {value} must be in [0, 1)"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for FeeRate {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<FeeRate> for Decimal {
    fn from(rate: FeeRate) -> Self {
        rate.0
    }
}
