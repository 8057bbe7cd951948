#![cfg(feature = "storage-rocksdb")]

mod common;

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_rocksdb_lock_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");
    let rooms_csv = dir.path().join("rooms.csv");
    common::generate_rooms_csv(&rooms_csv, 2).unwrap();

    let run = || {
        let output = Command::new(cargo_bin!("roomlock"))
            .arg("simulate")
            .arg("--rooms")
            .arg(&rooms_csv)
            .arg("--renters")
            .arg("3")
            .arg("--db-path")
            .arg(&db_path)
            .output()
            .expect("Failed to execute command");
        assert!(output.status.success());
        String::from_utf8(output.stdout).unwrap()
    };

    let first = run();
    assert_eq!(first.matches(",confirmed,approved,true,").count(), 2);

    // Rooms locked by the first run stay locked: the second run's renters
    // all lose, and earlier requests are still there.
    let second = run();
    assert_eq!(second.matches(",confirmed,approved,true,").count(), 2);
    assert_eq!(second.lines().filter(|l| l.ends_with(",false,true")).count(), 2);
    assert_eq!(second.lines().filter(|l| l.contains(",renter-")).count(), 12);
}
