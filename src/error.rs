use crate::domain::escrow::EscrowStatus;
use crate::domain::game::GameStatus;
use crate::domain::ids::{GameId, TransactionId, UserId};
use crate::domain::transaction::TransactionStatus;
use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Insufficient funds for user {user}: balance {balance}, required {required}")]
    InsufficientFunds {
        user: UserId,
        balance: Decimal,
        required: Decimal,
    },
    #[error("User {0} is banned or frozen")]
    UserRestricted(UserId),
    #[error("Escrow already exists for game {0}")]
    DuplicateEscrow(GameId),
    #[error(
        "Payout mismatch for game {game}: {white} + {black} + {platform_fee} != {total_amount}"
    )]
    PayoutMismatch {
        game: GameId,
        white: Decimal,
        black: Decimal,
        platform_fee: Decimal,
        total_amount: Decimal,
    },
    #[error("Escrow for game {game} is already {status}")]
    AlreadyResolved { game: GameId, status: EscrowStatus },
    #[error("Transaction {id} is already {status}")]
    AlreadyFinalized {
        id: TransactionId,
        status: TransactionStatus,
    },
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("User {0} not found")]
    UserNotFound(UserId),
    #[error("User {0} already exists")]
    DuplicateUser(String),
    #[error("Game {0} not found")]
    GameNotFound(GameId),
    #[error("Game {0} already exists")]
    DuplicateGame(GameId),
    #[error("No escrow for game {0}")]
    EscrowNotFound(GameId),
    #[error("Transaction {0} not found")]
    TransactionNotFound(TransactionId),
    #[error("Game {game} is {actual}, expected {expected}")]
    InvalidGameState {
        game: GameId,
        expected: &'static str,
        actual: GameStatus,
    },
    #[error("User {0} cannot play against themselves")]
    SelfMatch(UserId),
    #[error("Unknown game mode: {0}")]
    UnknownGameMode(String),
    #[error("Game {0} already finished with a different result")]
    OutcomeMismatch(GameId),
    #[error("Timed out waiting for lock on {0}")]
    LockTimeout(String),
    #[error("Ledger reconciliation failed for {count} account(s)")]
    ReconciliationMismatch { count: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::InternalError(Box::new(e))
    }
}
