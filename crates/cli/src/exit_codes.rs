//! CLI exit codes.
//!
//! Scripts rely on these, so they only ever grow.
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Success                                        |
//! | 1    | General error                                  |
//! | 2    | Usage error (bad arguments, bad reference)     |
//! | 3    | I/O error (unreadable log or settings file)    |
//! | 4    | Parse error (malformed event line or settings) |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unparseable reference or label.
pub const EXIT_USAGE: u8 = 2;

/// A file could not be read or written.
pub const EXIT_IO: u8 = 3;

/// A file was read but its contents are malformed.
pub const EXIT_PARSE: u8 = 4;
