//! tmux-backed terminal controller.
//!
//! Every operation shells out to the `tmux` binary:
//!
//! | Operation        | tmux command                                      |
//! |------------------|---------------------------------------------------|
//! | create session   | `new-session -d -s <name> <command>`              |
//! | send text        | `send-keys -t <name> -l -- <text>`                |
//! | send key         | `send-keys -t <name> C-m` / `C-i`                 |
//! | capture output   | `capture-pane -J -p -t <name> -S - -E -`          |
//! | destroy session  | `kill-session -t <name>`                          |
//!
//! tmux reads an argument ending in `;` as a command separator, so text ending
//! in `;` is sent with that last `;` escaped.
//!
//! [`Tmux::with_socket`] points every command at a named server socket
//! (`tmux -L <socket>`), isolating runs from the user's default server.

use std::{
    borrow::Cow,
    process::{Command, Output, Stdio},
};

use super::{ControlKey, SessionHandle, TerminalController};
use crate::{
    config::RunConfig,
    error::{Result, TttError},
};

const ENTER_KEY: &str = "C-m";
const TAB_KEY: &str = "C-i";

/// Whether a tmux server was running before [`Tmux::setup`].
///
/// Hand it back to [`Tmux::teardown`] to leave tmux as it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerState {
    /// A server was already running.
    pub was_running: bool,
}

/// Drives one named tmux session.
///
/// Only one session with a given name can exist per tmux server, so runs that
/// execute in parallel need distinct names.
#[derive(Debug, Clone)]
pub struct Tmux {
    binary: String,
    socket: Option<String>,
    session_name: String,
}

impl Default for Tmux {
    fn default() -> Self {
        Self::from_config(&RunConfig::default())
    }
}

impl Tmux {
    /// Creates a controller for the named session using the `tmux` on `PATH`.
    pub fn new(session_name: impl Into<String>) -> Self {
        Self {
            binary: "tmux".to_string(),
            socket: None,
            session_name: session_name.into(),
        }
    }

    /// Creates a controller from a run configuration.
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            binary: config.tmux_binary.clone(),
            socket: config.tmux_socket.clone(),
            session_name: config.session_name.clone(),
        }
    }

    /// Uses another tmux binary.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Talks to the server on the named socket instead of the default one.
    pub fn with_socket(mut self, socket: impl Into<String>) -> Self {
        self.socket = Some(socket.into());
        self
    }

    /// The session name this controller creates.
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Whether the tmux binary can be executed.
    pub fn is_available(&self) -> bool {
        self.command()
            .arg("-V")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Prepares tmux for a batch of runs.
    ///
    /// Records whether a server is already running and removes a stale session
    /// left behind under this controller's name.
    ///
    /// # Errors
    ///
    /// Returns [`TttError::ExternalService`] if tmux cannot be executed or
    /// `list-sessions` fails for a reason other than a missing server.
    pub fn setup(&self) -> Result<ServerState> {
        let output = self.output("list-sessions", &["list-sessions"])?;
        let was_running = if output.status.success() {
            true
        } else {
            let message = combined_output(&output);
            if !is_no_server_message(&message) {
                tracing::warn!(
                    "consider killing the tmux server (`tmux kill-server`) before running the tests"
                );
                return Err(TttError::external("list-sessions", message));
            }
            false
        };

        if was_running {
            let stale = SessionHandle::new(self.session_name.clone());
            if let Err(err) = self.destroy_session(&stale) {
                tracing::debug!(session = %stale, error = %err, "no stale session to remove");
            }
        }

        tracing::debug!(was_running, "tmux prepared");
        Ok(ServerState { was_running })
    }

    /// Restores tmux to the state recorded by [`Tmux::setup`].
    ///
    /// Kills the whole server if none was running before, otherwise only this
    /// controller's session. A server or session that is already gone counts
    /// as restored.
    ///
    /// # Errors
    ///
    /// Returns [`TttError::ExternalService`] if the kill fails for any other
    /// reason.
    pub fn teardown(&self, state: ServerState) -> Result<()> {
        let result = if state.was_running {
            let session = SessionHandle::new(self.session_name.clone());
            self.destroy_session(&session)
        } else {
            self.run("kill-server", &["kill-server"]).map(drop)
        };

        match result {
            Err(TttError::ExternalService { message, .. }) if is_gone_message(&message) => {
                tracing::debug!(message = %message, "nothing left to tear down");
                Ok(())
            }
            other => other,
        }
    }

    fn new_session_args<'a>(&'a self, command: &'a str) -> Vec<&'a str> {
        let mut args = vec!["new-session", "-d", "-s", self.session_name.as_str()];
        if !command.is_empty() {
            args.push(command);
        }
        args
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        if let Some(socket) = &self.socket {
            command.args(["-L", socket]);
        }
        command
    }

    fn output(&self, operation: &'static str, args: &[&str]) -> Result<Output> {
        self.command()
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                TttError::external(operation, format!("could not run {}: {}", self.binary, e))
            })
    }

    fn run(&self, operation: &'static str, args: &[&str]) -> Result<String> {
        let output = self.output(operation, args)?;
        if !output.status.success() {
            let message = combined_output(&output);
            let message = if message.is_empty() {
                format!("tmux exited with {}", output.status)
            } else {
                message
            };
            return Err(TttError::external(operation, message));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TerminalController for Tmux {
    fn create_session(&self, command: &str) -> Result<SessionHandle> {
        self.run("new-session", &self.new_session_args(command))?;
        Ok(SessionHandle::new(self.session_name.clone()))
    }

    fn send_text(&self, session: &SessionHandle, text: &str) -> Result<()> {
        let text = escape_trailing_semicolon(text);
        self.run(
            "send-keys",
            &["send-keys", "-t", session.name(), "-l", "--", &*text],
        )
        .map(drop)
    }

    fn send_key(&self, session: &SessionHandle, key: ControlKey) -> Result<()> {
        self.run(
            "send-keys",
            &["send-keys", "-t", session.name(), key_name(key)],
        ).map(drop)
    }

    fn capture_output(&self, session: &SessionHandle) -> Result<String> {
        self.run(
            "capture-pane",
            &["capture-pane", "-J", "-p", "-t", session.name(), "-S", "-", "-E", "-"],
        )
    }

    fn destroy_session(&self, session: &SessionHandle) -> Result<()> {
        self.run("kill-session", &["kill-session", "-t", session.name()]).map(drop)
    }
}

fn key_name(key: ControlKey) -> &'static str {
    match key {
        ControlKey::Enter => ENTER_KEY,
        ControlKey::Tab => TAB_KEY,
    }
}

fn escape_trailing_semicolon(text: &str) -> Cow<'_, str> {
    match text.strip_suffix(';') {
        Some(head) => Cow::Owned(format!("{}\\;", head)),
        None => Cow::Borrowed(text),
    }
}

fn combined_output(output: &Output) -> String {
    let mut message = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        if !message.is_empty() {
            message.push('\n');
        }
        message.push_str(stdout.trim());
    }
    message
}

fn is_no_server_message(message: &str) -> bool {
    message.contains("no server running") || message.contains("error connecting to")
}

fn is_gone_message(message: &str) -> bool {
    is_no_server_message(message)
        || message.contains("can't find session")
        || message.contains("session not found")
}
