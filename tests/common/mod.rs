#![allow(dead_code)]

use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use wager_ledger::application::engine::LedgerEngine;
use wager_ledger::config::LedgerConfig;
use wager_ledger::domain::ids::{GameId, UserId};
use wager_ledger::domain::money::Amount;
use wager_ledger::domain::transaction::TransactionType;
use wager_ledger::domain::user::Role;
use wager_ledger::infrastructure::in_memory::InMemoryLedgerStore;

pub const HEADER: [&str; 7] = ["op", "user", "opponent", "game", "mode", "amount", "outcome"];

/// Writes a script that registers and funds `players` users, then plays
/// `games` bullet games between neighbours, cycling through every outcome.
pub fn generate_script(path: &Path, players: usize, games: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(HEADER)?;

    for i in 1..=players {
        let user = format!("p{i:04}");
        wtr.write_record(["register", &user, "", "", "", "", ""])?;
        wtr.write_record(["deposit", &user, "", "", "", "100", ""])?;
    }

    let outcomes = ["white", "black", "draw", "cheat-white", "cheat-black"];
    for g in 0..games {
        let white = format!("p{:04}", g % players + 1);
        let black = format!("p{:04}", (g + 1) % players + 1);
        let game = format!("g{g}");
        wtr.write_record(["start", &white, &black, &game, "bullet-1", "", ""])?;
        wtr.write_record(["settle", "", "", &game, "", "", outcomes[g % outcomes.len()]])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes `rows` under the standard header into a temporary file.
pub fn script(rows: &[[&str; 7]]) -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut wtr = csv::Writer::from_path(file.path()).unwrap();
    wtr.write_record(HEADER).unwrap();
    for row in rows {
        wtr.write_record(row).unwrap();
    }
    wtr.flush().unwrap();
    file
}

pub fn engine(config: LedgerConfig) -> LedgerEngine {
    LedgerEngine::new(Arc::new(InMemoryLedgerStore::new()), config)
}

/// Registers `id` and completes a deposit of `balance` for it.
pub async fn funded_player(engine: &LedgerEngine, id: &str, balance: Decimal) -> UserId {
    let user = UserId::new(id);
    engine
        .register_user(user.clone(), id, "hash", Role::Player)
        .await
        .unwrap();
    if !balance.is_zero() {
        let tx = engine
            .record_transaction(Some(user.clone()), TransactionType::Deposit, balance, None)
            .await
            .unwrap();
        engine.ledger().complete_transaction(tx).await.unwrap();
    }
    user
}

/// Registers a game in `mode` and escrows both players' entry fees.
pub async fn start_game(
    engine: &LedgerEngine,
    game: &str,
    mode: &str,
    white: &UserId,
    black: &UserId,
) -> wager_ledger::error::Result<GameId> {
    let game = engine.register_game(GameId::new(game), mode).await?;
    engine
        .create_escrow(&game.id, white, black, Amount::new(game.entry_fee)?)
        .await?;
    Ok(game.id)
}
