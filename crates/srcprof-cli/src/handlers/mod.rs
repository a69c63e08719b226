//! Command handlers
//!
//! Each handler module contains:
//! - The execution logic for a CLI command
//! - Pure helper functions
//! - Tests

pub mod inspect;
pub mod instrument;
pub mod merge;
pub mod report;

pub use inspect::{block_table, execute_inspect};
pub use instrument::{apply_excludes, build_instrument_config, execute_instrument};
pub use merge::{execute_merge, merge_files};
pub use report::{check_source_hashes, execute_report, summary_table, HashMismatch};
