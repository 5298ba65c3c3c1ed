#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: register, fund and start a game
    let mut csv1 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv1, "op,user,opponent,game,mode,amount,outcome").unwrap();
    writeln!(csv1, "register,alice,,,,,").unwrap();
    writeln!(csv1, "register,bob,,,,,").unwrap();
    writeln!(csv1, "deposit,alice,,,,100,").unwrap();
    writeln!(csv1, "deposit,bob,,,,100,").unwrap();
    writeln!(csv1, "start,alice,bob,g1,bullet-1,,").unwrap();

    let mut cmd1 = Command::new(cargo_bin!("wager-ledger"));
    cmd1.arg(csv1.path()).arg("--db-path").arg(&db_path);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("alice,90,0,0,0,0,0,false"));

    // 2. Second run: settle the escrow held by the first run
    let mut csv2 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv2, "op,user,opponent,game,mode,amount,outcome").unwrap();
    writeln!(csv2, "settle,,,g1,,,black").unwrap();
    // Settling twice is rejected and changes nothing
    writeln!(csv2, "settle,,,g1,,,black").unwrap();

    let mut cmd2 = Command::new(cargo_bin!("wager-ledger"));
    cmd2.arg(csv2.path()).arg("--db-path").arg(&db_path);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    let stderr2 = String::from_utf8_lossy(&output2.stderr);

    assert!(stdout2.contains("alice,90,1,0,1,0,0,false"));
    assert!(stdout2.contains("bob,108,1,1,0,0,8,false"));
    assert!(stdout2.contains("platform,2,0,0,0,0,0,false"));
    assert!(stderr2.contains("already released"));
}
