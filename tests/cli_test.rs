use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("wager-ledger"));
    cmd.arg("tests/fixtures/games.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "account,balance,games_played,games_won,games_lost,games_draw,total_earnings,frozen",
        ))
        // Won g1, refunded g3, withdrew 8
        .stdout(predicate::str::contains("alice,50,1,1,0,0,8,false"))
        // Lost g1, forfeited g5 for cheating
        .stdout(predicate::str::contains("bob,15,2,0,2,0,0,true"))
        .stdout(predicate::str::contains("carol,23.5,2,1,0,1,4,false"))
        .stdout(predicate::str::contains("dave,9.5,1,0,0,1,0,false"))
        .stdout(predicate::str::contains("platform,4,0,0,0,0,0,false"))
        // dave cannot cover the g4 entry fee
        .stderr(predicate::str::contains("Error processing command"));

    Ok(())
}

#[test]
fn test_cli_fee_rate_override() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("wager-ledger"));
    cmd.arg("tests/fixtures/games.csv").arg("--fee-rate").arg("0.05");

    cmd.assert()
        .success()
        // g1 pays 19, g2 pays 4.75 each, g5 pays 9.5
        .stdout(predicate::str::contains("alice,51,1,1,0,0,9,false"))
        .stdout(predicate::str::contains("carol,24.25,2,1,0,1,4.5,false"))
        .stdout(predicate::str::contains("platform,2,0,0,0,0,0,false"));

    Ok(())
}

#[test]
fn test_cli_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = tempfile::NamedTempFile::new()?;
    std::io::Write::write_all(
        &mut config,
        b"fee_rate = \"0\"\n[game_modes.bullet-1]\ntime_control_secs = 60\nentry_fee = \"1\"\n",
    )?;
    let script = tempfile::NamedTempFile::new()?;
    std::fs::write(
        script.path(),
        "op,user,opponent,game,mode,amount,outcome\n\
         register,a,,,,,\n\
         register,b,,,,,\n\
         deposit,a,,,,1,\n\
         deposit,b,,,,1,\n\
         start,a,b,g1,bullet-1,,\n\
         settle,,,g1,,,black\n\
         start,a,b,g2,blitz-3,,\n",
    )?;

    let mut cmd = Command::new(cargo_bin!("wager-ledger"));
    cmd.arg(script.path()).arg("--config").arg(config.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("a,0,1,0,1,0,0,false"))
        .stdout(predicate::str::contains("b,2,1,1,0,0,1,false"))
        .stdout(predicate::str::contains("platform,0,0,0,0,0,0,false"))
        // blitz-3 is not configured
        .stderr(predicate::str::contains("Unknown game mode"));

    Ok(())
}

#[test]
fn test_cli_rejects_invalid_fee_rate() {
    let mut cmd = Command::new(cargo_bin!("wager-ledger"));
    cmd.arg("tests/fixtures/games.csv").arg("--fee-rate").arg("1.5");

    cmd.assert().failure();
}
