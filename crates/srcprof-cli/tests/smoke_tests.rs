//! Smoke tests for the srcprof CLI
//!
//! These tests run the binary end to end on small source trees.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command for the srcprof binary
fn srcprof() -> Command {
    let mut cmd = Command::cargo_bin("srcprof").expect("srcprof binary should exist");
    cmd.env_remove("RUST_LOG");
    cmd
}

const LEDGER: &str = "package bank;\n\
                      \n\
                      public class Ledger {\n\
                        long balance;\n\
                      \n\
                        void post(long amount) {\n\
                          if (amount < 0) {\n\
                            reject();\n\
                          } else {\n\
                            balance += amount;\n\
                          }\n\
                        }\n\
                      }\n";

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src/bank");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("Ledger.java"), LEDGER).unwrap();
    fs::write(src.join("Broken.java"), "class Broken { void f( }").unwrap();
    dir
}

/// Write a counts file the way the generated counter class does
fn write_counts(path: &Path, counts: &[u64]) {
    let mut bytes = (counts.len() as u32).to_be_bytes().to_vec();
    for count in counts {
        bytes.extend_from_slice(&count.to_be_bytes());
    }
    fs::write(path, bytes).unwrap();
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    srcprof()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4.0"));
}

#[test]
fn test_help_lists_subcommands() {
    srcprof()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("instrument"))
        .stdout(predicate::str::contains("report"))
        .stdout(predicate::str::contains("merge"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_no_args_fails() {
    srcprof().assert().failure();
}

// ============================================================================
// Pipeline
// ============================================================================

#[test]
fn test_instrument_then_report() {
    let dir = project();
    let out = dir.path().join("out");

    srcprof()
        .current_dir(dir.path())
        .args(["--color", "never", "instrument", "src", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Instrumented 1/2 file(s): 3 counters"))
        .stderr(predicate::str::contains("Broken.java"));

    assert!(out.join("metadata.json").is_file());
    assert!(out.join("auxiliary/__Counter.java").is_file());
    let ledger = fs::read_to_string(out.join("bank/Ledger.java")).unwrap();
    assert!(ledger.contains("auxiliary.__Counter.inc(1);"));

    write_counts(&out.join("counts.dat"), &[1, 0, 1]);
    srcprof()
        .current_dir(dir.path())
        .args(["--color", "never", "report", "-o"])
        .arg(&out)
        .args(["--html", "html", "--lcov", "lcov.info", "--source-root", "src"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ledger"))
        .stdout(predicate::str::contains("50.0% (1/2)"));

    assert!(dir.path().join("html/index.html").is_file());
    let lcov = fs::read_to_string(dir.path().join("lcov.info")).unwrap();
    assert!(lcov.contains("BRDA:7,0,0,-"));
    assert!(lcov.contains("BRDA:9,0,1,1"));
}

#[test]
fn test_report_rejects_foreign_snapshot() {
    let dir = project();
    let out = dir.path().join("out");
    srcprof()
        .args(["-q", "instrument"])
        .arg(dir.path().join("src"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let counts = dir.path().join("other.dat");
    write_counts(&counts, &[1, 2]);
    srcprof()
        .args(["report", "-o"])
        .arg(&out)
        .arg("--counts")
        .arg(&counts)
        .assert()
        .failure()
        .stderr(predicate::str::contains("counter count mismatch"));
}

#[test]
fn test_report_without_metadata_fails() {
    let dir = tempfile::tempdir().unwrap();
    srcprof()
        .current_dir(dir.path())
        .arg("report")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing input file"));
}

#[test]
fn test_merge_adds_runs() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.dat");
    let b = dir.path().join("b.dat");
    write_counts(&a, &[1, 0, 2]);
    write_counts(&b, &[0, 3, 0]);
    let merged = dir.path().join("all.dat");

    srcprof()
        .args(["--color", "never", "merge"])
        .arg(&a)
        .arg(&b)
        .arg("-o")
        .arg(&merged)
        .assert()
        .success()
        .stdout(predicate::str::contains("6 hits"));

    let bytes = fs::read(&merged).unwrap();
    assert_eq!(&bytes[..4], &3u32.to_be_bytes());
    assert_eq!(&bytes[12..20], &3u64.to_be_bytes());
}

#[test]
fn test_inspect_prints_blocks() {
    let dir = project();
    srcprof()
        .args(["--color", "never", "inspect"])
        .arg(dir.path().join("src/bank/Ledger.java"))
        .assert()
        .success()
        .stdout(predicate::str::contains("if branch"))
        .stdout(predicate::str::contains("d0F"));
}

#[test]
fn test_inspect_rewritten() {
    let dir = project();
    srcprof()
        .args(["inspect", "--rewritten"])
        .arg(dir.path().join("src/bank/Ledger.java"))
        .assert()
        .success()
        .stdout(predicate::str::contains("auxiliary.__Counter.inc(0);"));
}

#[test]
fn test_project_config_is_applied() {
    let dir = project();
    fs::write(
        dir.path().join("srcprof.yaml"),
        "counter_class: rt.Hits\noutput: build\nexclude: ['**/Broken.java']\n",
    )
    .unwrap();

    srcprof()
        .current_dir(dir.path())
        .args(["--color", "never", "instrument", "src"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Instrumented 1/1 file(s)"));

    let ledger = fs::read_to_string(dir.path().join("build/bank/Ledger.java")).unwrap();
    assert!(ledger.contains("rt.Hits.inc(0);"));
    assert!(dir.path().join("build/rt/Hits.java").is_file());
}

#[test]
fn test_bad_project_config_fails() {
    let dir = project();
    fs::write(dir.path().join("srcprof.yaml"), "no_such_key: 1\n").unwrap();
    srcprof()
        .current_dir(dir.path())
        .args(["instrument", "src"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}
