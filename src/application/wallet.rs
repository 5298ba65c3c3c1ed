use super::ledger::Ledger;
use crate::domain::ids::{TransactionId, UserId};
use crate::domain::money::Amount;
use crate::domain::ports::LedgerStoreRef;
use crate::domain::transaction::{CryptoMeta, CryptoType, Transaction, TransactionType};
use crate::domain::user::User;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

const MIN_ADDRESS_LEN: usize = 10;

/// Balance reads and the user-initiated deposit/withdrawal requests.
///
/// Requests only append pending rows; balances move when an operator completes
/// them through the [`Ledger`].
#[derive(Clone)]
pub struct WalletAccessor {
    store: LedgerStoreRef,
    ledger: Ledger,
    min_games_before_withdrawal: u32,
}

impl WalletAccessor {
    pub fn new(store: LedgerStoreRef, ledger: Ledger, min_games_before_withdrawal: u32) -> Self {
        Self {
            store,
            ledger,
            min_games_before_withdrawal,
        }
    }

    pub async fn get_balance(&self, user_id: &UserId) -> Result<Decimal> {
        Ok(self.load(user_id).await?.wallet_balance)
    }

    pub async fn platform_balance(&self) -> Result<Decimal> {
        Ok(self
            .store
            .wallet()
            .await?
            .map(|w| w.balance)
            .unwrap_or_default())
    }

    /// Newest first, at most `limit` rows (default [`DEFAULT_HISTORY_LIMIT`]).
    pub async fn transaction_history(
        &self,
        user_id: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>> {
        let mut history = self.store.transactions_for(user_id).await?;
        history.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        history.truncate(limit.unwrap_or(DEFAULT_HISTORY_LIMIT));
        Ok(history)
    }

    pub async fn request_deposit(
        &self,
        user_id: &UserId,
        amount: Amount,
        crypto_type: CryptoType,
    ) -> Result<TransactionId> {
        self.load(user_id).await?.ensure_unrestricted()?;
        self.ledger
            .record_transaction(
                Some(user_id.clone()),
                TransactionType::Deposit,
                amount.value(),
                Some(CryptoMeta {
                    crypto_type,
                    address: None,
                }),
            )
            .await
    }

    pub async fn request_withdrawal(
        &self,
        user_id: &UserId,
        amount: Amount,
        crypto_type: CryptoType,
        address: &str,
    ) -> Result<TransactionId> {
        let user = self.load(user_id).await?;
        user.ensure_unrestricted()?;
        let address = address.trim();
        if address.len() < MIN_ADDRESS_LEN {
            return Err(LedgerError::InvalidRequest(format!(
                "withdrawal address must be at least {MIN_ADDRESS_LEN} characters"
            )));
        }
        if user.games_played < self.min_games_before_withdrawal {
            return Err(LedgerError::InvalidRequest(format!(
                "{} games must be played before withdrawing",
                self.min_games_before_withdrawal
            )));
        }
        user.ensure_funds(amount.value())?;

        self.ledger
            .record_transaction(
                Some(user_id.clone()),
                TransactionType::Withdrawal,
                amount.value(),
                Some(CryptoMeta {
                    crypto_type,
                    address: Some(address.to_string()),
                }),
            )
            .await
    }

    async fn load(&self, user_id: &UserId) -> Result<User> {
        self.store
            .user(user_id)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(user_id.clone()))
    }
}
