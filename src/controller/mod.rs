//! Terminal controller boundary.
//!
//! The session driver never talks to a terminal directly. It goes through the
//! [`TerminalController`] trait, which can create and destroy a session, type
//! into it, press control keys and capture what it rendered.
//!
//! Two implementations ship with the crate:
//!
//! - [`Tmux`]: drives a detached tmux session through the `tmux` binary
//! - [`MockController`]: records calls and replays scripted captures, for tests

mod mock;
mod tmux;

use std::fmt;

pub use mock::{ControllerCall, MockController};
pub use tmux::{ServerState, Tmux};

use crate::error::Result;

/// Identifies one live session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    name: String,
}

impl SessionHandle {
    /// Creates a handle for the named session.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The session name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Control keys a controller can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKey {
    /// Carriage return.
    Enter,
    /// Horizontal tab.
    Tab,
}

impl fmt::Display for ControlKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlKey::Enter => f.write_str("Enter"),
            ControlKey::Tab => f.write_str("Tab"),
        }
    }
}

/// Operations the session driver needs from a terminal.
///
/// Every call is blocking and fails with
/// [`TttError::ExternalService`](crate::TttError::ExternalService).
pub trait TerminalController {
    /// Starts a detached session running `command`.
    ///
    /// Creating a session whose name is already taken is an error.
    fn create_session(&self, command: &str) -> Result<SessionHandle>;

    /// Types `text` into the session as literal characters.
    fn send_text(&self, session: &SessionHandle, text: &str) -> Result<()>;

    /// Presses a control key.
    fn send_key(&self, session: &SessionHandle, key: ControlKey) -> Result<()>;

    /// Returns everything the session rendered, from its start to now.
    fn capture_output(&self, session: &SessionHandle) -> Result<String>;

    /// Destroys the session and the processes running in it.
    fn destroy_session(&self, session: &SessionHandle) -> Result<()>;
}

impl<C: TerminalController + ?Sized> TerminalController for &C {
    fn create_session(&self, command: &str) -> Result<SessionHandle> {
        (**self).create_session(command)
    }

    fn send_text(&self, session: &SessionHandle, text: &str) -> Result<()> {
        (**self).send_text(session, text)
    }

    fn send_key(&self, session: &SessionHandle, key: ControlKey) -> Result<()> {
        (**self).send_key(session, key)
    }

    fn capture_output(&self, session: &SessionHandle) -> Result<String> {
        (**self).capture_output(session)
    }

    fn destroy_session(&self, session: &SessionHandle) -> Result<()> {
        (**self).destroy_session(session)
    }
}

/// Owns a live session and destroys it when dropped.
///
/// Teardown is best effort: a failing destroy is logged, never raised, so the
/// error that ended the run stays the one reported.
#[derive(Debug)]
pub struct SessionGuard<'c, C: TerminalController + ?Sized> {
    controller: &'c C,
    session: SessionHandle,
    destroyed: bool,
}

impl<'c, C: TerminalController + ?Sized> SessionGuard<'c, C> {
    /// Creates a session and wraps it in a guard.
    ///
    /// # Errors
    ///
    /// Returns the controller's error if the session cannot be created.
    pub fn create(controller: &'c C, command: &str) -> Result<Self> {
        let session = controller.create_session(command)?;
        tracing::debug!(session = %session, command, "session created");
        Ok(Self {
            controller,
            session,
            destroyed: false,
        })
    }

    /// The guarded session.
    pub fn handle(&self) -> &SessionHandle {
        &self.session
    }

    /// Destroys the session now instead of on drop.
    pub fn close(mut self) {
        self.destroy();
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        match self.controller.destroy_session(&self.session) {
            Ok(()) => tracing::debug!(session = %self.session, "session destroyed"),
            Err(err) => {
                tracing::warn!(session = %self.session, error = %err, "failed to kill session")
            }
        }
    }
}

impl<C: TerminalController + ?Sized> Drop for SessionGuard<'_, C> {
    fn drop(&mut self) {
        self.destroy();
    }
}
