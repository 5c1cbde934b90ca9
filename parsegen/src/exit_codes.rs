//! Stable exit codes for the parsegen CLI.

/// A generated parser matched the reference table.
pub const OK: i32 = 0;
/// Fatal configuration or invocation error (missing credential, bad config).
pub const INVALID: i32 = 1;
/// Attempt budget consumed without a passing candidate.
pub const EXHAUSTED: i32 = 3;
