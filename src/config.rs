//! Run configuration.
//!
//! [`RunConfig`] holds the knobs shared by every spec run: which tmux binary and
//! session name to use, how long any single input may wait, and how long to
//! give a freshly created session before typing into it.
//!
//! Defaults can be overridden from the environment with [`RunConfig::from_env`]:
//!
//! | Variable               | Field           | Default        |
//! |------------------------|-----------------|----------------|
//! | `TTT_SESSION_NAME`     | `session_name`  | `ttt-session`  |
//! | `TTT_TMUX`             | `tmux_binary`   | `tmux`         |
//! | `TTT_TMUX_SOCKET`      | `tmux_socket`   | default server |
//! | `TTT_WAIT_TIMEOUT_MS`  | `wait_timeout`  | 5 minutes      |
//! | `TTT_STARTUP_DELAY_MS` | `startup_delay` | 500 ms         |

use std::time::Duration;

/// Default tmux session name.
pub const DEFAULT_SESSION_NAME: &str = "ttt-session";

/// Default bound on any single input's wait.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default pause after creating a session.
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_millis(500);

const SESSION_NAME_VAR: &str = "TTT_SESSION_NAME";
const TMUX_VAR: &str = "TTT_TMUX";
const TMUX_SOCKET_VAR: &str = "TTT_TMUX_SOCKET";
const WAIT_TIMEOUT_VAR: &str = "TTT_WAIT_TIMEOUT_MS";
const STARTUP_DELAY_VAR: &str = "TTT_STARTUP_DELAY_MS";

/// Configuration for spec runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Name of the tmux session each run creates.
    pub session_name: String,
    /// tmux binary to execute.
    pub tmux_binary: String,
    /// Named tmux server socket (`tmux -L`); `None` uses the default server.
    pub tmux_socket: Option<String>,
    /// Longest any single input may wait before the run fails.
    pub wait_timeout: Duration,
    /// Pause after creating the session, before the first input.
    pub startup_delay: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            session_name: DEFAULT_SESSION_NAME.to_string(),
            tmux_binary: "tmux".to_string(),
            tmux_socket: None,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            startup_delay: DEFAULT_STARTUP_DELAY,
        }
    }
}

impl RunConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration from defaults overridden by `TTT_*` variables.
    ///
    /// Variables that do not parse are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(name) = lookup(SESSION_NAME_VAR).filter(|v| !v.is_empty()) {
            config.session_name = name;
        }
        if let Some(binary) = lookup(TMUX_VAR).filter(|v| !v.is_empty()) {
            config.tmux_binary = binary;
        }
        if let Some(socket) = lookup(TMUX_SOCKET_VAR).filter(|v| !v.is_empty()) {
            config.tmux_socket = Some(socket);
        }
        if let Some(timeout) = millis(&lookup, WAIT_TIMEOUT_VAR) {
            config.wait_timeout = timeout;
        }
        if let Some(delay) = millis(&lookup, STARTUP_DELAY_VAR) {
            config.startup_delay = delay;
        }
        config
    }

    /// Sets the session name.
    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    /// Sets the tmux binary.
    pub fn with_tmux_binary(mut self, binary: impl Into<String>) -> Self {
        self.tmux_binary = binary.into();
        self
    }

    /// Sets the tmux server socket name.
    pub fn with_tmux_socket(mut self, socket: impl Into<String>) -> Self {
        self.tmux_socket = Some(socket.into());
        self
    }

    /// Sets the bound on any single input's wait.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Sets the pause after session creation.
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let value = lookup(key)?;
    match value.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            tracing::warn!(variable = key, value = %value, "ignoring invalid duration");
            None
        }
    }
}
