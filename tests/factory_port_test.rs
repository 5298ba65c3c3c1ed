use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;
use wager_ledger::domain::changes::{Change, ChangeSet};
use wager_ledger::domain::ids::UserId;
use wager_ledger::domain::ports::{LedgerStoreFactory, LedgerStoreRef};
use wager_ledger::domain::transaction::{Transaction, TransactionType};
use wager_ledger::domain::user::{AppWallet, Role, User};
use wager_ledger::infrastructure::in_memory::InMemoryLedgerStore;

fn factory() -> LedgerStoreFactory {
    Box::new(|| Arc::new(InMemoryLedgerStore::new()) as LedgerStoreRef)
}

#[tokio::test]
async fn test_factory_instantiation() {
    let store = factory()();
    let user = User::new(UserId::new("u1"), "alice", "hash", Role::Player, Utc::now());
    let tx = Transaction::pending(
        Some(user.id.clone()),
        TransactionType::Deposit,
        dec!(10),
        None,
        Utc::now(),
    );

    let mut changes = ChangeSet::new();
    changes.push(Change::PutUser(user.clone()));
    changes.push(Change::PutTransaction(tx.clone()));
    store.commit(changes).await.unwrap();

    assert_eq!(store.user(&user.id).await.unwrap(), Some(user.clone()));
    assert_eq!(store.transaction(tx.id).await.unwrap(), Some(tx));
    assert_eq!(
        store.user_by_username("alice").await.unwrap().map(|u| u.id),
        Some(user.id)
    );
}

#[tokio::test]
async fn test_factory_in_task() {
    let factory = factory();

    let handle = tokio::spawn(async move {
        let store = factory();
        let mut changes = ChangeSet::new();
        changes.push(Change::InitWallet(AppWallet::new(Utc::now())));
        changes.push(Change::CreditPlatform(dec!(3)));
        store.commit(changes).await.unwrap();
        store.wallet().await.unwrap().unwrap()
    });

    let wallet = handle.await.unwrap();
    assert_eq!(wallet.balance, dec!(3));
}

#[tokio::test]
async fn test_factory_builds_isolated_stores() {
    let factory = factory();
    let first = factory();
    let second = factory();

    let mut changes = ChangeSet::new();
    changes.push(Change::PutUser(User::new(
        UserId::new("u1"),
        "alice",
        "hash",
        Role::Player,
        Utc::now(),
    )));
    first.commit(changes).await.unwrap();

    assert_eq!(first.users().await.unwrap().len(), 1);
    assert!(second.users().await.unwrap().is_empty());
}
