//! Error types for tmux_tui_testing.
//!
//! This module defines all error types that can occur while parsing and running
//! spec files. The main error type [`TttError`] is an enum covering every failure
//! mode, and [`Result<T>`] is a type alias for convenience. Parse failures have
//! their own [`ParseError`] type because they always carry a line number.
//!
//! # Examples
//!
//! ```rust
//! use tmux_tui_testing::{Result, TttError};
//!
//! fn may_fail() -> Result<()> {
//!     Err(TttError::Timeout { timeout_ms: 300_000 })
//! }
//!
//! match may_fail() {
//!     Ok(_) => println!("Success"),
//!     Err(TttError::Timeout { timeout_ms }) => {
//!         eprintln!("Timed out after {}ms", timeout_ms);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::{fmt, io};

use thiserror::Error;

use crate::compare::Comparison;

/// Result type alias for tmux_tui_testing operations.
///
/// This is a convenience alias for `std::result::Result<T, TttError>`.
pub type Result<T> = std::result::Result<T, TttError>;

/// What was wrong with a spec line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A `#` name line outside the start of the file.
    UnexpectedName,
    /// A `%` command line anywhere but directly after the name.
    UnexpectedCommand,
    /// A `>` input line before the command line or after the output section began.
    UnexpectedInput,
    /// An input line with fewer than three tokens.
    MissingTokens {
        /// Number of tokens that were found.
        found: usize,
    },
    /// The confirmation key is not one of `enter`, `tab` or `none`.
    InvalidConfirmationKey(String),
    /// The sleep token is not a non-negative integer.
    InvalidSleep(String),
    /// An `@name` token that names no known meta command.
    UnknownMetaCommand(String),
    /// A plain line before the output section.
    UnparsableLine,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::UnexpectedName => f.write_str("unexpected name declaration"),
            ParseErrorKind::UnexpectedCommand => f.write_str("unexpected command declaration"),
            ParseErrorKind::UnexpectedInput => {
                f.write_str("input line outside the input section")
            }
            ParseErrorKind::MissingTokens { found } => write!(
                f,
                "invalid input format, expected: > \"text\" key sleepInMs (found {} tokens)",
                found
            ),
            ParseErrorKind::InvalidConfirmationKey(key) => {
                write!(f, "invalid confirmation key: {}", key)
            }
            ParseErrorKind::InvalidSleep(value) => write!(f, "invalid sleep duration: {}", value),
            ParseErrorKind::UnknownMetaCommand(name) => {
                write!(f, "unknown meta command: @{}", name)
            }
            ParseErrorKind::UnparsableLine => f.write_str("unparsable line"),
        }
    }
}

/// A malformed line in a spec file.
///
/// Parsing happens before any session is created, so a `ParseError` never has
/// side effects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} in line {line}")]
pub struct ParseError {
    /// 1-based line number of the offending line.
    pub line: usize,
    /// What was wrong with it.
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(line: usize, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }
}

/// Errors that can occur while parsing or running a spec.
///
/// # Variants
///
/// - [`TttError::Parse`]: Malformed spec text
/// - [`TttError::Io`]: Reading spec files or directories
/// - [`TttError::ExternalService`]: A terminal controller call failed
/// - [`TttError::Timeout`]: An input's wait exceeded the global bound
/// - [`TttError::ComparisonMismatch`]: Actual and expected output diverged
/// - [`TttError::Runtime`]: The async runtime or the timer task failed
#[derive(Debug, Error)]
pub enum TttError {
    /// Malformed spec text.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Standard I/O error.
    ///
    /// This wraps [`std::io::Error`] and occurs when a spec file or directory
    /// cannot be read. Automatically converted via `From` trait.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A terminal controller call failed.
    ///
    /// Fatal while creating the session or dispatching inputs; only logged while
    /// tearing a session down.
    #[error("{operation} failed: {message}")]
    ExternalService {
        /// The controller operation, e.g. `send-keys`.
        operation: &'static str,
        /// What the controller reported.
        message: String,
    },

    /// The wait after an input exceeded the global wait bound.
    ///
    /// This is distinct from a sleep that completed: the timer task is cancelled
    /// and the remaining inputs are not dispatched.
    #[error("Timeout waiting for input to settle after {timeout_ms}ms")]
    Timeout {
        /// The wait bound in milliseconds.
        timeout_ms: u64,
    },

    /// Actual and expected output diverged.
    ///
    /// Carries the complete comparison, so every differing line is reported
    /// rather than only the first.
    #[error("Output mismatch in '{name}':\n{comparison}")]
    ComparisonMismatch {
        /// Name of the failing spec.
        name: String,
        /// The full line-by-line comparison.
        comparison: Box<Comparison>,
    },

    /// The async runtime could not be built or the timer task failed.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl TttError {
    pub(crate) fn external(operation: &'static str, message: impl Into<String>) -> Self {
        TttError::ExternalService {
            operation,
            message: message.into(),
        }
    }
}
