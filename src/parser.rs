//! Spec file parsing.
//!
//! A spec file is line oriented:
//!
//! ```text
//! #Echo
//! %sh
//! > "echo hi" enter 200
//! > @snapshot none 0
//!
//! $ echo hi
//! hi
//! ```
//!
//! The first line names the test, the `%` line is the program launched in the
//! session, each `>` line is one [`Input`], and everything after the first blank
//! line is the expected output.
//!
//! Parsing is done by [`SpecParser`], a forward-only state machine fed one line
//! at a time. [`parse`] drives it over a whole string.
//!
//! # Example
//!
//! ```rust
//! use tmux_tui_testing::parser::parse;
//!
//! let spec = parse("#T\n%sh\n> \"hello\" enter 100\n\nhi\n").unwrap();
//! assert_eq!(spec.name, "T");
//! assert_eq!(spec.root_program, "sh");
//! assert_eq!(spec.inputs.len(), 1);
//! assert_eq!(spec.expected_output, "hi");
//! ```
//!
//! # Limitations
//!
//! Quotes in input lines cannot be escaped: a `"` always opens or closes a
//! quoted run. A spec without a blank line never reaches the output section, so
//! trailing plain lines are rejected instead of being read as output.

use std::{fmt, fs, path::Path, time::Duration};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{
    error::{ParseError, ParseErrorKind, Result},
    input::{ConfirmationKey, Input, MetaCommand, Payload},
};

const NAME_MARKER: char = '#';
const COMMAND_MARKER: char = '%';
const INPUT_MARKER: char = '>';
const META_MARKER: char = '@';
const QUOTE: char = '"';

/// A parsed spec file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TestSpec {
    /// Test name from the `#` line.
    pub name: String,
    /// Command line launched inside the session, from the `%` line.
    pub root_program: String,
    /// Scripted events, in file order.
    pub inputs: Vec<Input>,
    /// Expected output, trimmed of surrounding whitespace.
    pub expected_output: String,
}

impl TestSpec {
    /// Reads and parses a spec file.
    ///
    /// # Errors
    ///
    /// Returns [`TttError::Io`](crate::TttError::Io) if the file cannot be read and
    /// [`TttError::Parse`](crate::TttError::Parse) if its content is malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "reading spec");
        let text = fs::read_to_string(path)?;
        let spec = parse(&text)?;
        tracing::debug!(name = %spec.name, inputs = spec.inputs.len(), "done reading spec");
        Ok(spec)
    }
}

impl fmt::Display for TestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Program: {}", self.root_program)?;
        write!(f, "Inputs: ")?;
        for (idx, input) in self.inputs.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", input)?;
        }
        writeln!(f)?;
        write!(f, "ExpectedOutput:\n{}", self.expected_output)
    }
}

/// Section the parser is currently in. Only ever advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParserState {
    /// Waiting for the `#` name line.
    Start,
    /// Name seen, waiting for the `%` command line.
    ExpectingRootProgram,
    /// Reading `>` input lines.
    CollectingInputs,
    /// Past the first blank line; everything else is expected output.
    CollectingExpectedOutput,
}

impl fmt::Display for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParserState::Start => "Start",
            ParserState::ExpectingRootProgram => "ExpectingRootProgram",
            ParserState::CollectingInputs => "CollectingInputs",
            ParserState::CollectingExpectedOutput => "CollectingExpectedOutput",
        };
        f.write_str(name)
    }
}

/// Line-at-a-time spec parser.
///
/// ```rust
/// use tmux_tui_testing::parser::{ParserState, SpecParser};
///
/// let mut parser = SpecParser::new();
/// parser.feed("#Name").unwrap();
/// assert_eq!(parser.state(), ParserState::ExpectingRootProgram);
/// parser.feed("%sh").unwrap();
/// parser.feed("").unwrap();
/// parser.feed("output").unwrap();
///
/// let spec = parser.finish();
/// assert_eq!(spec.expected_output, "output");
/// ```
#[derive(Debug, Clone)]
pub struct SpecParser {
    state: ParserState,
    line: usize,
    spec: TestSpec,
}

impl Default for SpecParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecParser {
    /// Creates a parser in [`ParserState::Start`].
    pub fn new() -> Self {
        Self {
            state: ParserState::Start,
            line: 0,
            spec: TestSpec::default(),
        }
    }

    /// Current section.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Number of lines fed so far.
    pub fn lines_read(&self) -> usize {
        self.line
    }

    /// Feeds the next line. A trailing `\r` is ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] carrying the 1-based line number when the line is
    /// not valid in the current section. The parser should be discarded after an
    /// error.
    pub fn feed(&mut self, line: &str) -> std::result::Result<(), ParseError> {
        self.line += 1;
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.trim().is_empty() && self.state != ParserState::CollectingExpectedOutput {
            self.state = ParserState::CollectingExpectedOutput;
            return Ok(());
        }

        let marked = line.trim_start();
        let mut chars = marked.chars();
        match chars.next() {
            Some(NAME_MARKER) => self.name_line(chars.as_str()),
            Some(COMMAND_MARKER) => self.command_line(chars.as_str()),
            Some(INPUT_MARKER) => self.input_line(chars.as_str()),
            _ if self.state == ParserState::CollectingExpectedOutput => {
                self.spec.expected_output.push_str(line);
                self.spec.expected_output.push('\n');
                Ok(())
            }
            _ => Err(self.error(ParseErrorKind::UnparsableLine)),
        }
    }

    /// Completes parsing, trimming the expected output.
    pub fn finish(self) -> TestSpec {
        let mut spec = self.spec;
        spec.expected_output = spec.expected_output.trim().to_string();
        spec
    }

    fn name_line(&mut self, rest: &str) -> std::result::Result<(), ParseError> {
        if self.state != ParserState::Start {
            return Err(self.error(ParseErrorKind::UnexpectedName));
        }
        self.spec.name = rest.trim().to_string();
        self.state = ParserState::ExpectingRootProgram;
        Ok(())
    }

    fn command_line(&mut self, rest: &str) -> std::result::Result<(), ParseError> {
        if self.state != ParserState::ExpectingRootProgram {
            return Err(self.error(ParseErrorKind::UnexpectedCommand));
        }
        self.spec.root_program = rest.trim().to_string();
        self.state = ParserState::CollectingInputs;
        Ok(())
    }

    fn input_line(&mut self, rest: &str) -> std::result::Result<(), ParseError> {
        if self.state != ParserState::CollectingInputs {
            return Err(self.error(ParseErrorKind::UnexpectedInput));
        }

        let tokens = tokenize(rest.trim());
        if tokens.len() < 3 {
            return Err(self.error(ParseErrorKind::MissingTokens {
                found: tokens.len(),
            }));
        }

        let confirmation_key = tokens[1]
            .parse::<ConfirmationKey>()
            .map_err(|e| self.error(ParseErrorKind::InvalidConfirmationKey(e.0)))?;
        let sleep = self.parse_sleep(tokens[2])?;

        let input = match tokens[0].strip_prefix(META_MARKER) {
            Some(name) => {
                let command = name
                    .parse::<MetaCommand>()
                    .map_err(|name| self.error(ParseErrorKind::UnknownMetaCommand(name)))?;
                Input {
                    payload: Payload::Meta(command),
                    confirmation_key,
                    sleep,
                }
            }
            None => Input::text(tokens[0].trim_matches(QUOTE), confirmation_key, sleep),
        };

        self.spec.inputs.push(input);
        Ok(())
    }

    fn parse_sleep(&self, token: &str) -> std::result::Result<Duration, ParseError> {
        if token == "0" {
            return Ok(Duration::ZERO);
        }
        token
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| self.error(ParseErrorKind::InvalidSleep(token.to_string())))
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.line, kind)
    }
}

/// Parses a complete spec text.
///
/// # Errors
///
/// Returns the first [`ParseError`] encountered.
pub fn parse(text: &str) -> std::result::Result<TestSpec, ParseError> {
    let mut parser = SpecParser::new();
    for line in text.split('\n') {
        parser.feed(line)?;
    }
    Ok(parser.finish())
}

/// Splits an input line on spaces, keeping a double-quoted run in one token.
///
/// Quote characters stay in the token; empty tokens are dropped.
fn tokenize(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut quoted = false;
    let mut start = 0;

    for (idx, ch) in line.char_indices() {
        if ch == QUOTE {
            quoted = !quoted;
        } else if ch == ' ' && !quoted {
            if idx > start {
                tokens.push(&line[start..idx]);
            }
            start = idx + 1;
        }
    }
    if line.len() > start {
        tokens.push(&line[start..]);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_minimal_spec() {
        let spec = parse("#T\n%sh\n> \"hello\" enter 100\n\nhi\n").unwrap();

        assert_eq!(
            spec,
            TestSpec {
                name: "T".to_string(),
                root_program: "sh".to_string(),
                inputs: vec![Input::text(
                    "hello",
                    ConfirmationKey::Enter,
                    Duration::from_millis(100)
                )],
                expected_output: "hi".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_is_deterministic() {
        let text = "#T\n%sh\n> \"a\" tab 5\n> b none 0\n\nx\ny\n";
        assert_eq!(parse(text).unwrap(), parse(text).unwrap());
    }

    #[test]
    fn test_quoted_text_keeps_spaces() {
        let spec = parse("#T\n%sh\n> \"a b\" none 0\n").unwrap();
        assert_eq!(
            spec.inputs,
            vec![Input::text("a b", ConfirmationKey::None, Duration::ZERO)]
        );
    }

    #[test]
    fn test_unquoted_text_is_accepted() {
        let spec = parse("#T\n%sh\n> ls enter 10\n").unwrap();
        assert_eq!(spec.inputs[0].payload, Payload::Text("ls".to_string()));
    }

    #[test]
    fn test_empty_quoted_text() {
        let spec = parse("#T\n%sh\n> \"\" enter 0\n").unwrap();
        assert_eq!(spec.inputs[0].payload, Payload::Text(String::new()));
        assert_eq!(spec.inputs[0].confirmation_key, ConfirmationKey::Enter);
    }

    #[test]
    fn test_extra_spaces_between_tokens() {
        let spec = parse("#T\n%sh\n>   \"x\"   TAB   250  \n").unwrap();
        assert_eq!(
            spec.inputs,
            vec![Input::text("x", ConfirmationKey::Tab, Duration::from_millis(250))]
        );
    }

    #[test]
    fn test_missing_tokens_is_error() {
        let err = parse("#T\n%sh\n> \"x\" enter\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::new(3, ParseErrorKind::MissingTokens { found: 2 })
        );
    }

    #[test]
    fn test_unknown_confirmation_key_is_error() {
        let err = parse("#T\n%sh\n> \"x\" ctrl 10\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::new(
                3,
                ParseErrorKind::InvalidConfirmationKey("ctrl".to_string()),
            )
        );
    }

    #[test]
    fn test_invalid_sleep_is_error() {
        let err = parse("#T\n%sh\n> \"x\" enter soon\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidSleep("soon".to_string()));

        let err = parse("#T\n%sh\n> \"x\" enter -5\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidSleep("-5".to_string()));
    }

    #[test]
    fn test_snapshot_meta_command() {
        let spec = parse("#T\n%sh\n> @snapshot enter 500\n").unwrap();
        let input = &spec.inputs[0];

        assert_eq!(input.payload, Payload::Meta(MetaCommand::Snapshot));
        // Key and sleep are still parsed; the driver ignores them.
        assert_eq!(input.confirmation_key, ConfirmationKey::Enter);
        assert_eq!(input.sleep, Duration::from_millis(500));
    }

    #[test]
    fn test_quoted_meta_marker_is_literal_text() {
        let spec = parse("#T\n%sh\n> \"@snapshot\" none 0\n").unwrap();
        assert_eq!(
            spec.inputs[0].payload,
            Payload::Text("@snapshot".to_string())
        );
    }

    #[test]
    fn test_unknown_meta_command_is_error() {
        let err = parse("#T\n%sh\n> @shot none 0\n").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::UnknownMetaCommand("shot".to_string())
        );
    }

    #[test]
    fn test_markers_out_of_order() {
        let err = parse("%sh\n").unwrap_err();
        assert_eq!(err, ParseError::new(1, ParseErrorKind::UnexpectedCommand));

        let err = parse("#T\n#U\n").unwrap_err();
        assert_eq!(err, ParseError::new(2, ParseErrorKind::UnexpectedName));

        let err = parse("#T\n> x enter 0\n").unwrap_err();
        assert_eq!(err, ParseError::new(2, ParseErrorKind::UnexpectedInput));

        let err = parse("#T\n%sh\n%bash\n").unwrap_err();
        assert_eq!(err, ParseError::new(3, ParseErrorKind::UnexpectedCommand));
    }

    #[test]
    fn test_plain_line_before_output_is_error() {
        let err = parse("#T\n%sh\nhello\n").unwrap_err();
        assert_eq!(err, ParseError::new(3, ParseErrorKind::UnparsableLine));
    }

    #[test]
    fn test_spec_without_blank_line_rejects_trailing_output() {
        let err = parse("#T\n%sh\n> x enter 0\nhi").unwrap_err();
        assert_eq!(err.line, 4);
    }

    #[test]
    fn test_no_section_regression_after_blank_line() {
        let err = parse("#T\n%sh\n\n> x enter 0\n").unwrap_err();
        assert_eq!(err, ParseError::new(4, ParseErrorKind::UnexpectedInput));

        let err = parse("#T\n\n%sh\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedCommand);
    }

    #[test]
    fn test_marker_inside_expected_output_is_error() {
        let err = parse("#T\n%sh\n\nok\n# not a comment\n").unwrap_err();
        assert_eq!(err, ParseError::new(5, ParseErrorKind::UnexpectedName));
    }

    #[test]
    fn test_expected_output_keeps_inner_blank_lines() {
        let spec = parse("#T\n%sh\n\n\nfirst\n\n  second\n\n").unwrap();
        assert_eq!(spec.expected_output, "first\n\n  second");
    }

    #[test]
    fn test_carriage_returns_are_stripped() {
        let spec = parse("#T\r\n%sh\r\n> \"x\" enter 1\r\n\r\nout\r\n").unwrap();
        assert_eq!(spec.name, "T");
        assert_eq!(spec.root_program, "sh");
        assert_eq!(spec.expected_output, "out");
    }

    #[test]
    fn test_name_and_program_are_trimmed() {
        let spec = parse("#  My Test  \n%  sh -c 'cat'  \n").unwrap();
        assert_eq!(spec.name, "My Test");
        assert_eq!(spec.root_program, "sh -c 'cat'");
    }

    #[test]
    fn test_parser_state_advances() {
        let mut parser = SpecParser::new();
        assert_eq!(parser.state(), ParserState::Start);

        parser.feed("#T").unwrap();
        assert_eq!(parser.state(), ParserState::ExpectingRootProgram);
        parser.feed("%sh").unwrap();
        assert_eq!(parser.state(), ParserState::CollectingInputs);
        parser.feed("> x none 0").unwrap();
        assert_eq!(parser.state(), ParserState::CollectingInputs);
        parser.feed("   ").unwrap();
        assert_eq!(parser.state(), ParserState::CollectingExpectedOutput);
        parser.feed("   ").unwrap();
        assert_eq!(parser.state(), ParserState::CollectingExpectedOutput);
        assert_eq!(parser.lines_read(), 5);
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("\"a b\" none 0"), vec!["\"a b\"", "none", "0"]);
        assert_eq!(tokenize("a  b"), vec!["a", "b"]);
        assert_eq!(tokenize("x\"y z\"w k"), vec!["x\"y z\"w", "k"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_spec_display() {
        let spec = parse("#T\n%sh\n> a enter 1\n> b tab 2\n\nout").unwrap();
        let text = spec.to_string();

        assert!(text.contains("Name: T"));
        assert!(text.contains("Program: sh"));
        assert!(text.contains("'a' Enter 1ms, 'b' Tab 2ms"));
        assert!(text.ends_with("ExpectedOutput:\nout"));
    }
}
