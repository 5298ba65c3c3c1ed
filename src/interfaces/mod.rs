//! Adapters between the ledger engine and the outside world.

pub mod csv;
