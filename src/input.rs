//! Scripted input events.
//!
//! Each `>` line of a spec file becomes one [`Input`]: a payload (literal text or
//! a meta command), the confirmation key pressed after it, and how long to wait
//! before the next event.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use tmux_tui_testing::input::{ConfirmationKey, Input};
//!
//! let input = Input::text("echo hi", ConfirmationKey::Enter, Duration::from_millis(200));
//! assert_eq!(input.to_string(), "'echo hi' Enter 200ms");
//!
//! let key: ConfirmationKey = "TAB".parse().unwrap();
//! assert_eq!(key, ConfirmationKey::Tab);
//! ```

use std::{fmt, str::FromStr, time::Duration};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::controller::ControlKey;

/// Key pressed after an input's text has been typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum ConfirmationKey {
    /// Submit with Enter.
    Enter,
    /// Complete with Tab.
    Tab,
    /// Send nothing after the text.
    #[default]
    None,
}

impl ConfirmationKey {
    /// The control key to send, if any.
    pub fn control_key(self) -> Option<ControlKey> {
        match self {
            ConfirmationKey::Enter => Some(ControlKey::Enter),
            ConfirmationKey::Tab => Some(ControlKey::Tab),
            ConfirmationKey::None => None,
        }
    }
}

impl fmt::Display for ConfirmationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfirmationKey::Enter => "Enter",
            ConfirmationKey::Tab => "Tab",
            ConfirmationKey::None => "None",
        };
        f.write_str(name)
    }
}

/// Error returned when a confirmation key name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownConfirmationKey(pub String);

impl FromStr for ConfirmationKey {
    type Err = UnknownConfirmationKey;

    /// Case-insensitive; the empty string means [`ConfirmationKey::None`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enter" => Ok(ConfirmationKey::Enter),
            "tab" => Ok(ConfirmationKey::Tab),
            "none" | "" => Ok(ConfirmationKey::None),
            _ => Err(UnknownConfirmationKey(s.to_string())),
        }
    }
}

/// Out-of-band instructions to the session driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum MetaCommand {
    /// Capture the pane mid-run and keep it for the final comparison.
    Snapshot,
}

impl MetaCommand {
    /// Name used after the `@` marker in spec files.
    pub fn name(self) -> &'static str {
        match self {
            MetaCommand::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for MetaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaCommand::Snapshot => f.write_str("Snapshot"),
        }
    }
}

impl FromStr for MetaCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "snapshot" => Ok(MetaCommand::Snapshot),
            _ => Err(s.to_string()),
        }
    }
}

/// What an input does: type text or run a meta command.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Payload {
    /// Literal characters typed into the session. May be empty.
    Text(String),
    /// A meta command; skips the confirmation key and the sleep.
    Meta(MetaCommand),
}

/// One scripted event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Input {
    /// Text or meta command.
    pub payload: Payload,
    /// Key pressed after the text.
    pub confirmation_key: ConfirmationKey,
    /// Wait applied after the confirmation key.
    pub sleep: Duration,
}

impl Input {
    /// Creates a text input.
    pub fn text(
        text: impl Into<String>,
        confirmation_key: ConfirmationKey,
        sleep: Duration,
    ) -> Self {
        Self {
            payload: Payload::Text(text.into()),
            confirmation_key,
            sleep,
        }
    }

    /// Creates a meta command input with no key and no sleep.
    pub fn meta(command: MetaCommand) -> Self {
        Self {
            payload: Payload::Meta(command),
            confirmation_key: ConfirmationKey::None,
            sleep: Duration::ZERO,
        }
    }

    /// Returns the meta command, if this input carries one.
    pub fn meta_command(&self) -> Option<MetaCommand> {
        match self.payload {
            Payload::Meta(command) => Some(command),
            Payload::Text(_) => None,
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Text(text) => write!(f, "'{}'", text)?,
            Payload::Meta(command) => write!(f, "'{}'", command)?,
        }
        write!(f, " {} {:?}", self.confirmation_key, self.sleep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_key_parsing_is_case_insensitive() {
        assert_eq!("enter".parse(), Ok(ConfirmationKey::Enter));
        assert_eq!("ENTER".parse(), Ok(ConfirmationKey::Enter));
        assert_eq!("Tab".parse(), Ok(ConfirmationKey::Tab));
        assert_eq!("none".parse(), Ok(ConfirmationKey::None));
        assert_eq!("".parse(), Ok(ConfirmationKey::None));
    }

    #[test]
    fn test_unknown_confirmation_key_is_rejected() {
        let err = "ctrl".parse::<ConfirmationKey>().unwrap_err();
        assert_eq!(err, UnknownConfirmationKey("ctrl".to_string()));
    }

    #[test]
    fn test_confirmation_key_maps_to_control_key() {
        assert_eq!(
            ConfirmationKey::Enter.control_key(),
            Some(ControlKey::Enter)
        );
        assert_eq!(ConfirmationKey::Tab.control_key(), Some(ControlKey::Tab));
        assert_eq!(ConfirmationKey::None.control_key(), None);
    }

    #[test]
    fn test_meta_command_parsing() {
        assert_eq!("snapshot".parse(), Ok(MetaCommand::Snapshot));
        assert_eq!("Snapshot".parse(), Ok(MetaCommand::Snapshot));
        assert_eq!("shot".parse::<MetaCommand>(), Err("shot".to_string()));
        assert_eq!(MetaCommand::Snapshot.name(), "snapshot");
    }

    #[test]
    fn test_input_display() {
        let input = Input::text("ls -la", ConfirmationKey::Enter, Duration::from_millis(100));
        assert_eq!(input.to_string(), "'ls -la' Enter 100ms");

        let input = Input::meta(MetaCommand::Snapshot);
        assert_eq!(input.to_string(), "'Snapshot' None 0ns");
    }

    #[test]
    fn test_meta_command_accessor() {
        assert_eq!(
            Input::meta(MetaCommand::Snapshot).meta_command(),
            Some(MetaCommand::Snapshot)
        );
        let text = Input::text("x", ConfirmationKey::None, Duration::ZERO);
        assert_eq!(text.meta_command(), None);
    }
}
