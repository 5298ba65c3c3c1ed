//! Ledger entities, their state machines, and the storage port.

pub mod changes;
pub mod escrow;
pub mod game;
pub mod ids;
pub mod money;
pub mod ports;
pub mod settlement;
pub mod transaction;
pub mod user;
