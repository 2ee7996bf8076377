//! Stable exit codes for the `booster-test` CLI.

/// Action completed successfully.
pub const OK: i32 = 0;
/// Precondition failure, assertion failure, or a caught runtime error.
pub const FAILURE: i32 = 1;
/// Unparseable action or bad arguments.
pub const USAGE: i32 = 2;
