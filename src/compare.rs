//! Line-by-line output comparison.
//!
//! [`compare`] checks captured session output against a spec's expected output.
//! The comparison is strictly positional: line `n` of the actual output is
//! compared with line `n` of the expected output, each trimmed of surrounding
//! whitespace. An inserted or deleted line therefore shifts every later line out
//! of alignment and every one of them is reported.
//!
//! Every difference is collected before a verdict is given, so a failing run
//! shows all divergent lines rather than only the first.
//!
//! # Example
//!
//! ```rust
//! use tmux_tui_testing::compare::compare;
//!
//! let result = compare("a\nb", "a\nc");
//! assert!(!result.passed());
//! assert_eq!(result.mismatches.len(), 1);
//! assert_eq!(result.mismatches[0].line, 2);
//! ```

use std::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;
use similar::{ChangeTag, TextDiff};

/// Actual and expected outputs have a different number of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct LineCountMismatch {
    /// Lines in the actual output.
    pub actual: usize,
    /// Lines in the expected output.
    pub expected: usize,
}

/// One line that differs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct LineMismatch {
    /// 1-based line number.
    pub line: usize,
    /// Trimmed actual line; empty when the actual output is shorter.
    pub actual: String,
    /// Trimmed expected line; empty when the expected output is shorter.
    pub expected: String,
}

/// Result of comparing actual against expected output.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Comparison {
    /// Actual output, trimmed.
    pub actual: String,
    /// Expected output, trimmed.
    pub expected: String,
    /// Set when the line counts differ.
    pub line_count: Option<LineCountMismatch>,
    /// Every differing line, in order.
    pub mismatches: Vec<LineMismatch>,
}

impl Comparison {
    /// Whether the outputs matched line for line.
    pub fn passed(&self) -> bool {
        self.line_count.is_none() && self.mismatches.is_empty()
    }

    /// A unified diff of expected against actual.
    ///
    /// Informational only: the diff aligns lines by content, so it can look
    /// smaller than the positional mismatch list that decides pass or fail.
    pub fn unified_diff(&self) -> String {
        let diff = TextDiff::from_lines(&self.expected, &self.actual);

        let mut output = String::new();
        output.push_str("--- expected\n");
        output.push_str("+++ actual\n");

        for (idx, group) in diff.grouped_ops(3).iter().enumerate() {
            if idx > 0 {
                output.push_str("...\n");
            }

            for op in group {
                for change in diff.iter_changes(op) {
                    let sign = match change.tag() {
                        ChangeTag::Delete => "-",
                        ChangeTag::Insert => "+",
                        ChangeTag::Equal => " ",
                    };
                    output.push_str(sign);
                    output.push_str(change.value());
                    if !change.value().ends_with('\n') {
                        output.push('\n');
                    }
                }
            }
        }

        output
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return f.write_str("Output matches");
        }
        if let Some(count) = self.line_count {
            writeln!(
                f,
                "Expected {} lines got {} actual lines!",
                count.expected,
                count.actual
            )?;
        }
        for mismatch in &self.mismatches {
            writeln!(f, "Line {} differ:", mismatch.line)?;
            writeln!(f, "A: '{}'", mismatch.actual)?;
            writeln!(f, "E: '{}'", mismatch.expected)?;
        }
        Ok(())
    }
}

/// Compares `actual` against `expected`, position by position.
pub fn compare(actual: &str, expected: &str) -> Comparison {
    let actual = actual.trim();
    let expected = expected.trim();

    let actual_lines: Vec<&str> = actual.split('\n').collect();
    let expected_lines: Vec<&str> = expected.split('\n').collect();

    let line_count = (actual_lines.len() != expected_lines.len()).then_some(LineCountMismatch {
        actual: actual_lines.len(),
        expected: expected_lines.len(),
    });

    let total = actual_lines.len().max(expected_lines.len());
    let mismatches = (0..total)
        .filter_map(|idx| {
            let actual_line = actual_lines.get(idx).map_or("", |line| line.trim());
            let expected_line = expected_lines.get(idx).map_or("", |line| line.trim());
            (actual_line != expected_line).then(|| LineMismatch {
                line: idx + 1,
                actual: actual_line.to_string(),
                expected: expected_line.to_string(),
            })
        })
        .collect();

    Comparison {
        actual: actual.to_string(),
        expected: expected.to_string(),
        line_count,
        mismatches,
    }
}
