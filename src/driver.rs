//! Session driver.
//!
//! The driver replays a spec's inputs against a live session, strictly in order
//! and one at a time:
//!
//! 1. A snapshot meta command captures the pane and moves straight on to the
//!    next input. Its confirmation key and sleep are skipped.
//! 2. Non-empty text is typed verbatim.
//! 3. The confirmation key is pressed (Enter, Tab, or nothing).
//! 4. The input's sleep runs, bounded by the configured wait timeout.
//!
//! Any controller failure or timeout aborts the remaining inputs. There is no
//! retry.
//!
//! # Example
//!
//! ```rust
//! use tmux_tui_testing::{
//!     config::RunConfig,
//!     controller::MockController,
//!     driver::drive,
//!     parser::parse,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tmux_tui_testing::Result<()> {
//! let spec = parse("#Echo\n%sh\n> \"echo hi\" enter 0\n\nhi\n")?;
//! let mock = MockController::new().with_capture("hi");
//! let config = RunConfig::new().with_startup_delay(std::time::Duration::ZERO);
//!
//! let output = drive(&mock, &spec, &config).await?;
//! assert_eq!(output.final_output, "hi");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use crate::{
    config::{RunConfig, DEFAULT_WAIT_TIMEOUT},
    controller::{SessionGuard, SessionHandle, TerminalController},
    error::Result,
    input::{Input, MetaCommand, Payload},
    parser::TestSpec,
    wait::sleep_within,
};

/// Snapshots and final capture of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOutput {
    /// Trimmed mid-run captures, in order.
    pub snapshots: Vec<String>,
    /// Trimmed capture taken after the last input.
    pub final_output: String,
}

impl SessionOutput {
    /// The text compared against the expected output: the snapshots joined by
    /// newlines, then the final capture on the following line.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.snapshots.join("\n"), self.final_output)
    }
}

/// Replays inputs against one session.
#[derive(Debug)]
pub struct SessionDriver<'a, C: TerminalController + ?Sized> {
    controller: &'a C,
    session: &'a SessionHandle,
    wait_timeout: Duration,
}

impl<'a, C: TerminalController + ?Sized> SessionDriver<'a, C> {
    /// Creates a driver with the default wait timeout.
    pub fn new(controller: &'a C, session: &'a SessionHandle) -> Self {
        Self {
            controller,
            session,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    /// Sets the bound on any single input's sleep.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Sends every input in order and returns the snapshots taken on the way.
    ///
    /// # Errors
    ///
    /// Returns the first controller error, or [`TttError::Timeout`] when an
    /// input's sleep exceeds the wait timeout. Remaining inputs are not sent.
    ///
    /// [`TttError::Timeout`]: crate::TttError::Timeout
    pub async fn send_inputs(&self, inputs: &[Input]) -> Result<Vec<String>> {
        let mut snapshots = Vec::new();
        tracing::debug!(session = %self.session, count = inputs.len(), "sending inputs");

        for (idx, input) in inputs.iter().enumerate() {
            tracing::debug!(index = idx, %input, "input");

            let text = match &input.payload {
                Payload::Meta(MetaCommand::Snapshot) => {
                    tracing::debug!(index = idx, "taking snapshot");
                    snapshots.push(self.capture()?.trim().to_string());
                    continue;
                }
                Payload::Text(text) => text,
            };

            if !text.is_empty() {
                self.controller.send_text(self.session, text)?;
            }

            match input.confirmation_key.control_key() {
                Some(key) => self.controller.send_key(self.session, key)?,
                None => tracing::trace!(index = idx, "no confirmation key"),
            }

            sleep_within(input.sleep, self.wait_timeout).await?;
        }

        Ok(snapshots)
    }

    /// Captures the session's output.
    ///
    /// # Errors
    ///
    /// Returns the controller's error.
    pub fn capture(&self) -> Result<String> {
        self.controller.capture_output(self.session)
    }
}

/// Runs one spec against a fresh session: create, drive, capture, destroy.
///
/// The session is destroyed whether the run succeeds or fails; a failing
/// destroy is only logged.
///
/// # Errors
///
/// Returns the error that ended the run: session creation, input dispatch,
/// timeout or the final capture.
pub async fn drive<C>(controller: &C, spec: &TestSpec, config: &RunConfig) -> Result<SessionOutput>
where
    C: TerminalController + ?Sized,
{
    let guard = SessionGuard::create(controller, &spec.root_program)?;
    if !config.startup_delay.is_zero() {
        tokio::time::sleep(config.startup_delay).await;
    }

    let driver =
        SessionDriver::new(controller, guard.handle()).with_wait_timeout(config.wait_timeout);
    let snapshots = driver.send_inputs(&spec.inputs).await?;
    let final_output = driver.capture()?.trim().to_string();

    guard.close();
    Ok(SessionOutput {
        snapshots,
        final_output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        controller::{ControlKey, ControllerCall, MockController},
        error::TttError,
        input::ConfirmationKey,
    };

    fn text(text: &str, key: ConfirmationKey, ms: u64) -> Input {
        Input::text(text, key, Duration::from_millis(ms))
    }

    fn spec(inputs: Vec<Input>) -> TestSpec {
        TestSpec {
            name: "T".to_string(),
            root_program: "sh".to_string(),
            inputs,
            expected_output: String::new(),
        }
    }

    fn config() -> RunConfig {
        RunConfig::new().with_startup_delay(Duration::ZERO)
    }

    #[tokio::test(start_paused = true)]
    async fn test_inputs_are_sent_in_order() {
        let mock = MockController::new();
        let session = SessionHandle::new("mock-session");
        let driver = SessionDriver::new(&mock, &session);

        let inputs = vec![
            text("echo hi", ConfirmationKey::Enter, 10),
            text("ec", ConfirmationKey::Tab, 0),
            text("partial", ConfirmationKey::None, 0),
        ];
        let snapshots = driver.send_inputs(&inputs).await.unwrap();

        assert!(snapshots.is_empty());
        assert_eq!(
            mock.calls(),
            vec![
                ControllerCall::SendText("echo hi".to_string()),
                ControllerCall::SendKey(ControlKey::Enter),
                ControllerCall::SendText("ec".to_string()),
                ControllerCall::SendKey(ControlKey::Tab),
                ControllerCall::SendText("partial".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_text_only_sends_key() {
        let mock = MockController::new();
        let session = SessionHandle::new("mock-session");
        let driver = SessionDriver::new(&mock, &session);

        driver.send_inputs(&[text("", ConfirmationKey::Enter, 0)]).await.unwrap();

        assert_eq!(
            mock.calls(),
            vec![ControllerCall::SendKey(ControlKey::Enter)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_is_applied_after_key() {
        let mock = MockController::new();
        let session = SessionHandle::new("mock-session");
        let driver = SessionDriver::new(&mock, &session);

        let start = tokio::time::Instant::now();
        driver.send_inputs(&[text("x", ConfirmationKey::Enter, 250)]).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_skips_key_and_sleep() {
        let mock = MockController::new().with_capture("  first screen \n\n");
        let session = SessionHandle::new("mock-session");
        let driver = SessionDriver::new(&mock, &session);

        let mut snapshot = Input::meta(MetaCommand::Snapshot);
        snapshot.confirmation_key = ConfirmationKey::Enter;
        snapshot.sleep = Duration::from_secs(60);

        let start = tokio::time::Instant::now();
        let snapshots = driver.send_inputs(&[snapshot]).await.unwrap();

        assert_eq!(snapshots, vec!["first screen".to_string()]);
        assert_eq!(mock.calls(), vec![ControllerCall::CaptureOutput]);
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_does_not_trip_wait_timeout() {
        let mock = MockController::new().with_capture("screen");
        let session = SessionHandle::new("mock-session");
        let driver =
            SessionDriver::new(&mock, &session).with_wait_timeout(Duration::from_millis(1));

        let mut snapshot = Input::meta(MetaCommand::Snapshot);
        snapshot.sleep = Duration::from_secs(3600);

        assert!(driver.send_inputs(&[snapshot]).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_longer_than_bound_is_timeout() {
        let mock = MockController::new();
        let session = SessionHandle::new("mock-session");
        let driver =
            SessionDriver::new(&mock, &session).with_wait_timeout(Duration::from_secs(300));

        let inputs = vec![
            text("slow", ConfirmationKey::Enter, 600_000),
            text("never sent", ConfirmationKey::Enter, 0),
        ];
        let err = driver.send_inputs(&inputs).await.unwrap_err();

        assert!(matches!(
            err,
            TttError::Timeout {
                timeout_ms: 300_000,
            }
        ));
        assert_eq!(mock.count(|c| matches!(c, ControllerCall::SendText(_))), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_aborts_remaining_inputs() {
        let mock = MockController::new().fail_on_send_text();
        let session = SessionHandle::new("mock-session");
        let driver = SessionDriver::new(&mock, &session);

        let inputs =
            vec![text("a", ConfirmationKey::Enter, 0), text("b", ConfirmationKey::Enter, 0)];
        let err = driver.send_inputs(&inputs).await.unwrap_err();

        assert!(matches!(
            err,
            TttError::ExternalService {
                operation: "send-keys",
                ..
            }
        ));
        assert_eq!(
            mock.calls(),
            vec![ControllerCall::SendText("a".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_failure_is_fatal() {
        let mock = MockController::new().fail_on_send_key();
        let session = SessionHandle::new("mock-session");
        let driver = SessionDriver::new(&mock, &session);

        let result = driver.send_inputs(&[text("a", ConfirmationKey::Tab, 0)]).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_full_lifecycle() {
        let mock = MockController::new().with_capture("snap").with_capture("$ echo hi\nhi\n$ \n");
        let spec = spec(vec![
            text("echo hi", ConfirmationKey::Enter, 200),
            Input::meta(MetaCommand::Snapshot),
        ]);

        let output = drive(&mock, &spec, &config()).await.unwrap();

        assert_eq!(output.snapshots, vec!["snap".to_string()]);
        assert_eq!(output.final_output, "$ echo hi\nhi\n$");
        assert_eq!(
            mock.calls(),
            vec![
                ControllerCall::CreateSession("sh".to_string()),
                ControllerCall::SendText("echo hi".to_string()),
                ControllerCall::SendKey(ControlKey::Enter),
                ControllerCall::CaptureOutput,
                ControllerCall::CaptureOutput,
                ControllerCall::DestroySession("mock-session".to_string()),
            ]
        );
        assert!(!mock.has_live_session());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_destroys_session_on_failure() {
        let mock = MockController::new();
        let config = config().with_wait_timeout(Duration::from_millis(10));
        let spec = spec(vec![text("x", ConfirmationKey::Enter, 1000)]);

        let err = drive(&mock, &spec, &config).await.unwrap_err();

        assert!(matches!(err, TttError::Timeout { .. }));
        assert_eq!(
            mock.count(|c| matches!(c, ControllerCall::DestroySession(_))),
            1
        );
        assert!(!mock.has_live_session());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_create_failure_has_no_teardown() {
        let mock = MockController::new().fail_on_create();
        let err = drive(&mock, &spec(vec![]), &config()).await.unwrap_err();

        assert!(matches!(
            err,
            TttError::ExternalService {
                operation: "new-session",
                ..
            }
        ));
        assert_eq!(
            mock.calls(),
            vec![ControllerCall::CreateSession("sh".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_waits_startup_delay() {
        let mock = MockController::new();
        let config = config().with_startup_delay(Duration::from_millis(500));

        let start = tokio::time::Instant::now();
        drive(&mock, &spec(vec![]), &config).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[test]
    fn test_combined_output() {
        let output = SessionOutput {
            snapshots: vec!["one".to_string(), "two".to_string()],
            final_output: "three".to_string(),
        };
        assert_eq!(output.combined(), "one\ntwo\nthree");

        let output = SessionOutput {
            snapshots: vec![],
            final_output: "only".to_string(),
        };
        assert_eq!(output.combined(), "\nonly");
    }
}
