//! Process-wide counter runtime.
//!
//! Kept in its own test binary: the runtime can only be installed once per
//! process.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use srcprof::coverage::{branch, inc, CounterRuntime, CountsSnapshot};

#[test]
fn test_installed_runtime_flushes_once_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("counts.bin");

    // no runtime yet: calls are no-ops
    inc(0);
    assert!(branch(true, 1, 2));
    assert!(CounterRuntime::global().is_none());

    let guard = CounterRuntime::install(3, &output).unwrap();
    assert!(CounterRuntime::install(3, &output).is_err());

    inc(0);
    inc(0);
    assert!(!branch(false, 1, 2));
    inc(99);

    let runtime = CounterRuntime::global().unwrap();
    assert_eq!(runtime.snapshot().counts(), &[2, 0, 1]);
    assert!(!output.exists());

    drop(guard);
    assert!(runtime.is_flushed());
    let written = CountsSnapshot::load(&output).unwrap();
    assert_eq!(written.counts(), &[2, 0, 1]);

    // later hits are not written again
    inc(1);
    assert!(!runtime.flush().unwrap());
    assert_eq!(CountsSnapshot::load(&output).unwrap(), written);
}
