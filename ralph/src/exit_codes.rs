//! Stable exit codes for `ralph` CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid usage, unreadable config, or a storage error.
pub const INVALID: i32 = 1;
/// `ralph status` found no active loop.
pub const INACTIVE: i32 = 2;
