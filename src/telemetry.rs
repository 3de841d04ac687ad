//! Log output for spec runs.
//!
//! The crate only emits `tracing` events. Call [`init_tracing`] from a test to
//! see them:
//!
//! ```rust
//! tmux_tui_testing::telemetry::init_tracing("info");
//! ```
//!
//! `TTT_LOG` takes an [`EnvFilter`] directive such as
//! `tmux_tui_testing=debug` and overrides the default level.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "TTT_LOG";

/// Installs a global fmt subscriber writing to the test writer.
///
/// Returns `false` if a global subscriber was already installed, in which case
/// nothing changes.
pub fn init_tracing(default_level: &str) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_test_writer()
        .try_init()
        .is_ok()
}
