use super::escrow::GameEscrow;
use super::game::{Game, GameMove};
use super::transaction::Transaction;
use super::user::{AppWallet, User};
use rust_decimal::Decimal;

/// Addresses users send crypto deposits to. `None` leaves an address unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositAddresses {
    pub btc: Option<String>,
    pub eth: Option<String>,
    pub usdt: Option<String>,
}

impl DepositAddresses {
    pub fn apply_to(&self, wallet: &mut AppWallet) {
        if let Some(btc) = &self.btc {
            wallet.btc_address = Some(btc.clone());
        }
        if let Some(eth) = &self.eth {
            wallet.eth_address = Some(eth.clone());
        }
        if let Some(usdt) = &self.usdt {
            wallet.usdt_address = Some(usdt.clone());
        }
    }
}

/// A single row-level write.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    PutUser(User),
    /// Creates the platform wallet unless one already exists.
    InitWallet(AppWallet),
    /// Adds to the platform wallet balance at commit time.
    CreditPlatform(Decimal),
    SetDepositAddresses(DepositAddresses),
    PutTransaction(Transaction),
    PutGame(Game),
    PutEscrow(GameEscrow),
    AppendMove(GameMove),
}

/// Writes that a store must apply all together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.changes.iter().filter_map(|c| match c {
            Change::PutTransaction(tx) => Some(tx),
            _ => None,
        })
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}
