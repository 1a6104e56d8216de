use colored::Colorize;
use std::fmt;

use crate::input::model::Input;

/// Why the tokenizer could not produce the next [`Input`].
///
/// Every variant keeps `root`, the partially built value the failure happened in
/// (the enclosing list or map, or the scalar read so far), and `position`, the
/// byte offset where reading stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum InputParseFail {
    /// A specific token was required, e.g. `=` after a map key.
    TokenExpected {
        expected: Vec<String>,
        found: Option<char>,
        root: Input,
        position: usize,
    },
    /// After an element either a separator or the closing bracket was required.
    TokenOrElementExpected {
        expected: Vec<String>,
        found: Option<char>,
        root: Input,
        position: usize,
    },
    /// A separator was not followed by an element, e.g. `[a,]` or `{a=}`.
    NextElementNotFound { root: Input, position: usize },
    /// Nothing left to read.
    NoMoreElements { root: Input, position: usize },
    InputMalformation {
        reason: String,
        root: Input,
        position: usize,
    },
}

impl InputParseFail {
    pub fn root(&self) -> &Input {
        match self {
            Self::TokenExpected { root, .. }
            | Self::TokenOrElementExpected { root, .. }
            | Self::NextElementNotFound { root, .. }
            | Self::NoMoreElements { root, .. }
            | Self::InputMalformation { root, .. } => root,
        }
    }

    pub fn position(&self) -> usize {
        match self {
            Self::TokenExpected { position, .. }
            | Self::TokenOrElementExpected { position, .. }
            | Self::NextElementNotFound { position, .. }
            | Self::NoMoreElements { position, .. }
            | Self::InputMalformation { position, .. } => *position,
        }
    }
}

fn describe_found(found: &Option<char>) -> String {
    match found {
        Some(c) => format!("'{c}'"),
        None => "end of input".to_string(),
    }
}

impl fmt::Display for InputParseFail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenExpected { expected, found, position, .. } => write!(
                f,
                "{}: expected {} at position {}, found {}",
                "error".red().bold(),
                expected.join(" or ").green(),
                position,
                describe_found(found).yellow()
            ),
            Self::TokenOrElementExpected { expected, found, position, .. } => write!(
                f,
                "{}: expected {} or another element at position {}, found {}",
                "error".red().bold(),
                expected.join(" or ").green(),
                position,
                describe_found(found).yellow()
            ),
            Self::NextElementNotFound { root, position } => write!(
                f,
                "{}: missing element after separator at position {} in '{}'",
                "error".red().bold(),
                position,
                root.content().yellow()
            ),
            Self::NoMoreElements { position, .. } => {
                write!(f, "{}: no more input at position {}", "error".red().bold(), position)
            }
            Self::InputMalformation { reason, position, .. } => write!(
                f,
                "{}: malformed input at position {}: {}",
                "error".red().bold(),
                position,
                reason
            ),
        }
    }
}

impl std::error::Error for InputParseFail {}
