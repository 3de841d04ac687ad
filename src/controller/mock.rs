//! In-memory terminal controller for tests.
//!
//! [`MockController`] never starts a process. It logs every call as a
//! [`ControllerCall`] and answers captures from a scripted queue.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{ControlKey, SessionHandle, TerminalController};
use crate::error::{Result, TttError};

/// A call received by a [`MockController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerCall {
    /// `create_session` with the command.
    CreateSession(String),
    /// `send_text` with the text.
    SendText(String),
    /// `send_key` with the key.
    SendKey(ControlKey),
    /// `capture_output`.
    CaptureOutput,
    /// `destroy_session` with the session name.
    DestroySession(String),
}

#[derive(Debug, Default, Clone, Copy)]
struct Failures {
    create: bool,
    send_text: bool,
    send_key: bool,
    capture: bool,
    destroy: bool,
}

/// A [`TerminalController`] that records calls instead of driving a terminal.
///
/// Captures are replayed from a queue; once the queue is drained the last
/// capture is repeated. Individual operations can be made to fail.
///
/// # Example
///
/// ```rust
/// use tmux_tui_testing::controller::{ControllerCall, MockController, TerminalController};
///
/// let mock = MockController::new().with_capture("$ echo hi\nhi\n$");
/// let session = mock.create_session("sh").unwrap();
/// mock.send_text(&session, "echo hi").unwrap();
///
/// assert_eq!(mock.capture_output(&session).unwrap(), "$ echo hi\nhi\n$");
/// assert_eq!(mock.calls()[1], ControllerCall::SendText("echo hi".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct MockController {
    session_name: String,
    calls: Arc<Mutex<Vec<ControllerCall>>>,
    captures: Arc<Mutex<VecDeque<String>>>,
    last_capture: Arc<Mutex<String>>,
    live: Arc<Mutex<bool>>,
    failures: Failures,
}

impl Default for MockController {
    fn default() -> Self {
        Self::new()
    }
}

impl MockController {
    /// Creates a mock whose sessions are named `mock-session`.
    pub fn new() -> Self {
        Self {
            session_name: "mock-session".to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            captures: Arc::new(Mutex::new(VecDeque::new())),
            last_capture: Arc::new(Mutex::new(String::new())),
            live: Arc::new(Mutex::new(false)),
            failures: Failures::default(),
        }
    }

    /// Sets the name given to created sessions.
    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    /// Queues a capture result.
    pub fn with_capture(self, output: impl Into<String>) -> Self {
        lock(&self.captures).push_back(output.into());
        self
    }

    /// Makes `create_session` fail.
    pub fn fail_on_create(mut self) -> Self {
        self.failures.create = true;
        self
    }

    /// Makes `send_text` fail.
    pub fn fail_on_send_text(mut self) -> Self {
        self.failures.send_text = true;
        self
    }

    /// Makes `send_key` fail.
    pub fn fail_on_send_key(mut self) -> Self {
        self.failures.send_key = true;
        self
    }

    /// Makes `capture_output` fail.
    pub fn fail_on_capture(mut self) -> Self {
        self.failures.capture = true;
        self
    }

    /// Makes `destroy_session` fail.
    pub fn fail_on_destroy(mut self) -> Self {
        self.failures.destroy = true;
        self
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> Vec<ControllerCall> {
        lock(&self.calls).clone()
    }

    /// Number of calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&ControllerCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|call| predicate(call)).count()
    }

    /// Whether a session is currently live.
    pub fn has_live_session(&self) -> bool {
        *lock(&self.live)
    }

    /// Clears recorded calls.
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn record(&self, call: ControllerCall) {
        lock(&self.calls).push(call);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TerminalController for MockController {
    fn create_session(&self, command: &str) -> Result<SessionHandle> {
        self.record(ControllerCall::CreateSession(command.to_string()));
        if self.failures.create {
            return Err(TttError::external("new-session", "mock failure"));
        }

        let mut live = lock(&self.live);
        if *live {
            return Err(TttError::external(
                "new-session",
                format!("duplicate session: {}", self.session_name),
            ));
        }
        *live = true;
        Ok(SessionHandle::new(self.session_name.clone()))
    }

    fn send_text(&self, _session: &SessionHandle, text: &str) -> Result<()> {
        self.record(ControllerCall::SendText(text.to_string()));
        if self.failures.send_text {
            return Err(TttError::external("send-keys", "mock failure"));
        }
        Ok(())
    }

    fn send_key(&self, _session: &SessionHandle, key: ControlKey) -> Result<()> {
        self.record(ControllerCall::SendKey(key));
        if self.failures.send_key {
            return Err(TttError::external("send-keys", "mock failure"));
        }
        Ok(())
    }

    fn capture_output(&self, _session: &SessionHandle) -> Result<String> {
        self.record(ControllerCall::CaptureOutput);
        if self.failures.capture {
            return Err(TttError::external("capture-pane", "mock failure"));
        }

        let mut last = lock(&self.last_capture);
        if let Some(next) = lock(&self.captures).pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }

    fn destroy_session(&self, session: &SessionHandle) -> Result<()> {
        self.record(ControllerCall::DestroySession(session.name().to_string()));
        *lock(&self.live) = false;
        if self.failures.destroy {
            return Err(TttError::external("kill-session", "mock failure"));
        }
        Ok(())
    }
}
