use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

#[test]
fn test_malformed_rows_do_not_stop_the_replay() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "type, store, seller, amount, reference").unwrap();
    // Valid credit
    writeln!(file, "credit, store-1, , 50.0, ").unwrap();
    // Invalid event type
    writeln!(file, "transfer, store-1, , 10.0, ").unwrap();
    // Missing amount for a credit (required)
    writeln!(file, "credit, store-1, , , ").unwrap();
    // Valid credit again
    writeln!(file, "credit, store-1, , 25.0, ").unwrap();

    let mut cmd = Command::new(cargo_bin!("marketledger"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading event"))
        .stderr(predicate::str::contains("Error applying event"))
        .stdout(predicate::str::contains("store-1,75,75,0,0"));
}

#[test]
fn test_invalid_amounts_reported() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "type, store, seller, amount, reference").unwrap();
    // Text in the amount field
    writeln!(file, "credit, store-1, , lots, ").unwrap();
    // Valid credit
    writeln!(file, "credit, store-1, , 5.0, ").unwrap();

    let mut cmd = Command::new(cargo_bin!("marketledger"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading event"))
        .stdout(predicate::str::contains("store-1,5,5,0,0"));
}

#[test]
fn test_negative_credit_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "type, store, seller, amount, reference").unwrap();
    writeln!(file, "credit, store-1, , 10.0, ").unwrap();
    writeln!(file, "credit, store-1, , -5.0, ").unwrap();

    let mut cmd = Command::new(cargo_bin!("marketledger"));
    cmd.arg(file.path());

    // A negative "credit" would drain available below earnings conservation;
    // the delta is rejected and the prior balance stands.
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error applying event"))
        .stdout(predicate::str::contains("store-1,10,10,0,0"));
}
