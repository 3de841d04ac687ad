//! # tmux_tui_testing
//!
//! Spec-file driven end-to-end testing for interactive terminal programs.
//!
//! ## Overview
//!
//! A spec file describes one scripted terminal session: the program to start,
//! the keystrokes to type, and the output the session should end up showing.
//! `tmux_tui_testing` starts the program inside a detached tmux session, types
//! the inputs, captures the pane and compares it line by line with the expected
//! output.
//!
//! - **Plain-text specs**: no code needed per test case
//! - **Snapshots**: capture the screen mid-run with `@snapshot`
//! - **Bounded waits**: every input's pause is capped, so a run never hangs
//! - **Full reports**: every differing line is listed, not just the first
//!
//! ## Quick Start
//!
//! Write a spec, `tests/specs/echo.spec`:
//!
//! ```text
//! #Echo
//! %sh
//! > "echo hi" enter 200
//!
//! $ echo hi
//! hi
//! $
//! ```
//!
//! And run it from a test:
//!
//! ```rust,no_run
//! #[test]
//! fn specs() {
//!     tmux_tui_testing::assert_spec_dir("tests/specs");
//! }
//! ```
//!
//! ## Spec Format
//!
//! | Line          | Meaning                                                    |
//! |---------------|------------------------------------------------------------|
//! | `#name`       | Test name, first line                                      |
//! | `%command`    | Program started in the session                             |
//! | `> text key ms` | Type `text`, press `key` (`enter`, `tab`, `none`), wait `ms` |
//! | `> @snapshot none 0` | Capture the screen at this point                    |
//! | blank line    | Start of the expected output                               |
//!
//! Text containing spaces must be quoted: `> "echo hi" enter 0`.
//!
//! ## Testing Without tmux
//!
//! [`SpecRunner`] works with any [`TerminalController`]. [`MockController`]
//! records calls and replays scripted captures:
//!
//! ```rust
//! use tmux_tui_testing::{parse, MockController, RunConfig, SpecRunner};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tmux_tui_testing::Result<()> {
//! let spec = parse("#Echo\n%sh\n> \"echo hi\" enter 0\n\nhi\n")?;
//! let mock = MockController::new().with_capture("hi\n");
//! let runner = SpecRunner::new(mock, RunConfig::new());
//!
//! let outcome = runner.execute(&spec).await?;
//! assert!(outcome.passed());
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! [`run_spec`] and [`run_spec_dir`] read [`RunConfig::from_env`]; see
//! [`config`] for the variables. Set `TTT_LOG=debug` and call
//! [`telemetry::init_tracing`] to follow a run input by input.
//!
//! ## Feature Flags
//!
//! - `serde`: derive `Serialize` on specs, inputs, comparisons and outcomes

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unsafe_code)]

pub mod compare;
pub mod config;
pub mod controller;
pub mod driver;
mod error;
pub mod input;
pub mod parser;
pub mod runner;
pub mod telemetry;
pub mod wait;

// Public API exports
pub use compare::{compare, Comparison, LineCountMismatch, LineMismatch};
pub use config::RunConfig;
pub use controller::{
    ControlKey, ControllerCall, MockController, ServerState, SessionGuard, SessionHandle,
    TerminalController, Tmux,
};
pub use driver::{drive, SessionDriver, SessionOutput};
pub use error::{ParseError, ParseErrorKind, Result, TttError};
pub use input::{ConfirmationKey, Input, MetaCommand, Payload};
pub use parser::{parse, ParserState, SpecParser, TestSpec};
pub use runner::{
    assert_spec, assert_spec_dir, run_spec, run_spec_dir, SpecRun, SpecRunner, TestOutcome,
};
