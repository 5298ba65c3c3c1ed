use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wager_ledger::config::LedgerConfig;
use wager_ledger::domain::game::Color;
use wager_ledger::domain::ids::{GameId, UserId};
use wager_ledger::domain::money::FeeRate;
use wager_ledger::domain::settlement::Outcome;

mod common;

/// Plays a random sequence of games, refunds and withdrawals, then checks that
/// no money was created or destroyed.
#[tokio::test]
async fn test_random_play_conserves_money() {
    let mut rng = StdRng::seed_from_u64(7);
    let config = LedgerConfig {
        fee_rate: FeeRate::new(dec!(0.0777)).unwrap(),
        ..LedgerConfig::default()
    };
    let engine = common::engine(config);
    engine.bootstrap().await.unwrap();

    let mut deposited = Decimal::ZERO;
    let mut players = Vec::new();
    for i in 0..8 {
        let cents: i64 = rng.gen_range(500..10_000);
        let balance = Decimal::new(cents, 2);
        deposited += balance;
        players.push(common::funded_player(&engine, &format!("p{i}"), balance).await);
    }

    let modes = ["bullet-1", "blitz-3", "blitz-5"];
    let mut withdrawn = Decimal::ZERO;
    for round in 0..200 {
        let white = &players[rng.gen_range(0..players.len())];
        let black = &players[rng.gen_range(0..players.len())];
        let mode = modes[rng.gen_range(0..modes.len())];

        // Failures (self match, insufficient funds, frozen players) are expected.
        let Ok(game) = common::start_game(&engine, &format!("g{round}"), mode, white, black).await
        else {
            continue;
        };

        let result = match rng.gen_range(0..6) {
            0 => engine.refund(&game).await.map(|_| ()),
            1 => engine.settle_game(&game, Outcome::Draw).await.map(|_| ()),
            2 => engine
                .settle_game(&game, Outcome::CheatForfeit { cheater: Color::White })
                .await
                .map(|_| ()),
            3 | 4 => engine
                .settle_game(&game, Outcome::Win(Color::White))
                .await
                .map(|_| ()),
            _ => engine
                .settle_game(&game, Outcome::Win(Color::Black))
                .await
                .map(|_| ()),
        };
        result.unwrap();

        if round % 25 == 0 {
            let user = &players[rng.gen_range(0..players.len())];
            let amount = wager_ledger::domain::money::Amount::new(dec!(1)).unwrap();
            if let Ok(id) = engine
                .wallet()
                .request_withdrawal(user, amount, wager_ledger::domain::transaction::CryptoType::Btc, "bc1qrandomaddress")
                .await
            {
                engine.ledger().complete_transaction(id).await.unwrap();
                withdrawn += dec!(1);
            }
        }
    }

    let held: Decimal = {
        let mut total = Decimal::ZERO;
        for round in 0..200 {
            if let Ok(trail) = engine.audit_trail(&GameId::new(format!("g{round}"))).await
                && let Some(escrow) = trail.escrow
                && escrow.status == wager_ledger::domain::escrow::EscrowStatus::Held
            {
                total += escrow.total_amount;
            }
        }
        total
    };
    assert_eq!(held, Decimal::ZERO);

    let mut balances = engine.wallet().platform_balance().await.unwrap();
    for player in &players {
        balances += engine.get_balance(player).await.unwrap();
    }
    assert_eq!(balances, deposited - withdrawn);

    let report = engine.ledger().reconcile().await.unwrap();
    assert!(report.is_clean(), "{:?}", report.mismatches);
    assert!(engine.get_balance(&UserId::new("p0")).await.unwrap() >= Decimal::ZERO);
}

#[tokio::test]
async fn test_released_games_conserve_pot() {
    let engine = common::engine(LedgerConfig::default());
    engine.bootstrap().await.unwrap();
    let w = common::funded_player(&engine, "w", dec!(100)).await;
    let b = common::funded_player(&engine, "b", dec!(100)).await;

    let outcomes = [
        Outcome::Win(Color::White),
        Outcome::Win(Color::Black),
        Outcome::Draw,
        Outcome::CheatForfeit {
            cheater: Color::White,
        },
    ];
    for (i, outcome) in outcomes.into_iter().enumerate() {
        let game = common::start_game(&engine, &format!("g{i}"), "blitz-5", &w, &b)
            .await
            .unwrap();
        engine.settle_game(&game, outcome).await.unwrap();

        let trail = engine.audit_trail(&game).await.unwrap();
        assert_eq!(
            trail.game.white_payout + trail.game.black_payout + trail.game.platform_fee,
            dec!(2) * trail.game.entry_fee
        );
    }
}
