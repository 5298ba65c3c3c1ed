use super::locks::{LockKey, LockManager};
use crate::domain::changes::{Change, ChangeSet};
use crate::domain::ids::{AccountId, TransactionId, UserId};
use crate::domain::money::checked_sum;
use crate::domain::ports::LedgerStoreRef;
use crate::domain::transaction::{CryptoMeta, Transaction, TransactionType};
use crate::domain::user::User;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{error, info, warn};

/// An account whose cached balance disagrees with its transaction log.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceMismatch {
    pub account: AccountId,
    pub cached: Decimal,
    pub derived: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationReport {
    pub accounts_checked: usize,
    pub mismatches: Vec<BalanceMismatch>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// The append-only transaction log and the balances cached from it.
///
/// A transaction is appended as `pending` and closed exactly once. Completing it
/// moves its amount onto the owner's cached balance in the same commit.
#[derive(Clone)]
pub struct Ledger {
    store: LedgerStoreRef,
    locks: Arc<LockManager>,
}

impl Ledger {
    pub fn new(store: LedgerStoreRef, locks: Arc<LockManager>) -> Self {
        Self { store, locks }
    }

    /// Appends a pending transaction. `amount` is a magnitude; its sign on the
    /// stored row follows the direction of `type`.
    pub async fn record_transaction(
        &self,
        user_id: Option<UserId>,
        r#type: TransactionType,
        amount: Decimal,
        crypto: Option<CryptoMeta>,
    ) -> Result<TransactionId> {
        let signed = r#type.signed_amount(amount)?;
        match &user_id {
            Some(id) => {
                if self.store.user(id).await?.is_none() {
                    return Err(LedgerError::UserNotFound(id.clone()));
                }
            }
            None if !r#type.is_platform_fee() => {
                return Err(LedgerError::InvalidRequest(format!(
                    "{} cannot be booked against the platform wallet",
                    r#type
                )));
            }
            None => {}
        }

        let tx = Transaction::pending(user_id, r#type, signed, crypto, Utc::now());
        let id = tx.id;
        let mut changes = ChangeSet::new();
        changes.push(Change::PutTransaction(tx));
        self.store.commit(changes).await?;

        info!(transaction = %id, kind = %r#type, amount = %signed, "transaction recorded");
        Ok(id)
    }

    /// Operator sign-off on a pending transaction. No balance effect.
    pub async fn approve_transaction(&self, id: TransactionId) -> Result<()> {
        let _locks = self.locks.acquire([LockKey::Transaction(id)]).await?;
        let mut tx = self.load(id).await?;
        tx.approve()?;

        let mut changes = ChangeSet::new();
        changes.push(Change::PutTransaction(tx));
        self.store.commit(changes).await?;
        info!(transaction = %id, "transaction approved");
        Ok(())
    }

    /// Applies an open transaction to its owner's balance and marks it completed.
    pub async fn complete_transaction(&self, id: TransactionId) -> Result<()> {
        let owner = self.load(id).await?.user_id;
        let mut keys = vec![LockKey::Transaction(id)];
        if let Some(user) = &owner {
            keys.push(LockKey::User(user.clone()));
        }
        let _locks = self.locks.acquire(keys).await?;

        let mut tx = self.load(id).await?;
        let now = Utc::now();
        let mut changes = ChangeSet::new();
        match &owner {
            Some(user_id) => {
                let mut user = self
                    .store
                    .user(user_id)
                    .await?
                    .ok_or_else(|| LedgerError::UserNotFound(user_id.clone()))?;
                tx.complete(now)?;
                user.apply_delta(tx.amount, now)?;
                changes.push(Change::PutUser(user));
            }
            None => {
                tx.complete(now)?;
                changes.push(Change::CreditPlatform(tx.amount));
            }
        }
        let (kind, amount) = (tx.r#type, tx.amount);
        changes.push(Change::PutTransaction(tx));
        self.store.commit(changes).await?;

        info!(transaction = %id, kind = %kind, amount = %amount, "transaction completed");
        Ok(())
    }

    pub async fn reject_transaction(&self, id: TransactionId, reason: &str) -> Result<()> {
        let _locks = self.locks.acquire([LockKey::Transaction(id)]).await?;
        let mut tx = self.load(id).await?;
        tx.reject(Utc::now())?;

        let mut changes = ChangeSet::new();
        changes.push(Change::PutTransaction(tx));
        self.store.commit(changes).await?;
        warn!(transaction = %id, reason, "transaction rejected");
        Ok(())
    }

    /// Compares every cached balance against the sum of its completed transactions.
    pub async fn reconcile(&self) -> Result<ReconciliationReport> {
        let snapshot = self.store.snapshot().await?;

        let mut derived: BTreeMap<AccountId, Decimal> = BTreeMap::new();
        for tx in snapshot.transactions.iter().filter(|tx| tx.is_completed()) {
            let sum = derived.entry(tx.account()).or_default();
            *sum = checked_sum(*sum, tx.amount)?;
        }

        let mut cached: BTreeMap<AccountId, Decimal> = snapshot
            .users
            .iter()
            .map(|u| (AccountId::User(u.id.clone()), u.wallet_balance))
            .collect();
        cached.insert(
            AccountId::Platform,
            snapshot.wallet.map(|w| w.balance).unwrap_or_default(),
        );

        let accounts: BTreeSet<&AccountId> = cached.keys().chain(derived.keys()).collect();
        let mut report = ReconciliationReport {
            accounts_checked: accounts.len(),
            mismatches: Vec::new(),
        };
        for account in accounts {
            let cached = cached.get(account).copied().unwrap_or_default();
            let derived = derived.get(account).copied().unwrap_or_default();
            if cached != derived {
                report.mismatches.push(BalanceMismatch {
                    account: account.clone(),
                    cached,
                    derived,
                });
            }
        }
        Ok(report)
    }

    /// Runs [`Ledger::reconcile`] and turns any divergence into an error.
    ///
    /// Mismatches are reported, never corrected.
    pub async fn verify_integrity(&self) -> Result<ReconciliationReport> {
        let report = self.reconcile().await?;
        if !report.is_clean() {
            for m in &report.mismatches {
                error!(
                    account = %m.account,
                    cached = %m.cached,
                    derived = %m.derived,
                    "cached balance diverges from transaction log"
                );
            }
            return Err(LedgerError::ReconciliationMismatch {
                count: report.mismatches.len(),
            });
        }
        Ok(report)
    }

    async fn load(&self, id: TransactionId) -> Result<Transaction> {
        self.store
            .transaction(id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))
    }
}

/// Books a completed entry against `user` inside a larger change set.
///
/// The caller still owns `user` and must push it once all entries are staged.
pub(crate) fn post_user_entry(
    changes: &mut ChangeSet,
    user: &mut User,
    r#type: TransactionType,
    signed_amount: Decimal,
    now: DateTime<Utc>,
) -> Result<TransactionId> {
    let mut tx = Transaction::pending(Some(user.id.clone()), r#type, signed_amount, None, now);
    user.apply_delta(signed_amount, now)?;
    tx.complete(now)?;
    let id = tx.id;
    changes.push(Change::PutTransaction(tx));
    Ok(id)
}

/// Books a completed platform-only entry crediting the app wallet.
pub(crate) fn post_platform_entry(
    changes: &mut ChangeSet,
    r#type: TransactionType,
    amount: Decimal,
    now: DateTime<Utc>,
) -> Result<TransactionId> {
    let mut tx = Transaction::pending(None, r#type, amount, None, now);
    tx.complete(now)?;
    let id = tx.id;
    changes.push(Change::PutTransaction(tx));
    changes.push(Change::CreditPlatform(amount));
    Ok(id)
}
