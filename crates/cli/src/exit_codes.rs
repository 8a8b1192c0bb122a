//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Domain    | Description                                     |
//! |------|-----------|-------------------------------------------------|
//! | 0    | Universal | Success                                         |
//! | 1    | Universal | General error (unspecified)                     |
//! | 2    | Universal | CLI usage error (bad args, missing file)        |
//! | 3    | linkage   | Invalid argument (error budget outside [0, 1])  |
//! | 4    | linkage   | Data error (empty class, unknown/duplicate id)  |
//! | 5    | linkage   | Configuration error (bad TOML, negative cap)    |
//! | 6    | linkage   | I/O error (unreadable file, bad CSV)            |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `linkage_exit_code` or the relevant command

use orglink_linkage::{ErrorKind, LinkageError};

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Linkage (3-6)
// =============================================================================

/// Error-rate budget outside [0, 1], malformed label table.
pub const EXIT_INVALID_ARGUMENT: u8 = 3;

/// Training data unusable: zero examples of a class, pair with unknown id,
/// duplicate record id.
pub const EXIT_DATA: u8 = 4;

/// Config cannot be parsed or validated (including negative `max_matches`).
pub const EXIT_CONFIG: u8 = 5;

/// Input file unreadable, missing column, unparseable id.
pub const EXIT_IO: u8 = 6;

/// Map an engine error onto its exit code.
pub fn linkage_exit_code(err: &LinkageError) -> u8 {
    match err.kind() {
        ErrorKind::InvalidArgument => EXIT_INVALID_ARGUMENT,
        ErrorKind::Data => EXIT_DATA,
        ErrorKind::Configuration => EXIT_CONFIG,
        ErrorKind::Io => EXIT_IO,
    }
}
