//! Application layer orchestrating the ledger components.
//!
//! [`engine::LedgerEngine`] is the entry point. It wires the transaction
//! [`ledger::Ledger`], the [`escrow::EscrowManager`], the
//! [`settlement::SettlementEngine`] and the [`wallet::WalletAccessor`] over one
//! store and one [`locks::LockManager`]. Every mutation takes row locks, stages a
//! change set, and commits it atomically.

pub mod engine;
pub mod escrow;
pub mod ledger;
pub mod locks;
pub mod settlement;
pub mod wallet;
