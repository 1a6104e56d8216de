use colored::Colorize;
use std::fmt;
use std::sync::Arc;

use crate::command::{Argument, Command, CommandContainer};
use crate::input::{Input, InputParseFail};
use crate::types::Validation;

/// Parser progress at the point of failure: the commands resolved so far and the
/// token index the parser stopped at.
#[derive(Debug, Clone, Default)]
pub struct ParseState {
    pub commands: Vec<CommandContainer>,
    pub position: usize,
}

/// Why a command line could not be parsed.
#[derive(Debug, Clone)]
pub enum ParseFail {
    CommandNotFound {
        input: Input,
        /// The command whose sub-commands were searched, if any.
        parent: Option<Arc<Command>>,
        suggestions: Vec<String>,
        state: ParseState,
    },
    /// `--name` matched no remaining argument.
    ArgumentNotFound {
        command: Arc<Command>,
        input: Input,
        state: ParseState,
    },
    ArgumentShortNamesNotFound {
        command: Arc<Command>,
        input: Input,
        missing: Vec<char>,
        state: ParseState,
    },
    ArgumentsMissing {
        command: Arc<Command>,
        missing: Vec<Argument>,
        state: ParseState,
    },
    NoInputForArgument {
        command: Arc<Command>,
        argument: Argument,
        state: ParseState,
    },
    InvalidInputForArgument {
        command: Arc<Command>,
        argument: Argument,
        input: Input,
        validation: Validation,
        state: ParseState,
    },
    IncompatibleInputTypesForShortArguments {
        command: Arc<Command>,
        input: Input,
        arguments: Vec<Argument>,
        state: ParseState,
    },
    /// The value of `--name=value` could not be tokenized.
    ArgumentInputParseFail {
        command: Arc<Command>,
        argument: Argument,
        fail: InputParseFail,
        state: ParseState,
    },
    Input { fail: InputParseFail, state: ParseState },
}

impl ParseFail {
    pub fn state(&self) -> &ParseState {
        match self {
            Self::CommandNotFound { state, .. }
            | Self::ArgumentNotFound { state, .. }
            | Self::ArgumentShortNamesNotFound { state, .. }
            | Self::ArgumentsMissing { state, .. }
            | Self::NoInputForArgument { state, .. }
            | Self::InvalidInputForArgument { state, .. }
            | Self::IncompatibleInputTypesForShortArguments { state, .. }
            | Self::ArgumentInputParseFail { state, .. }
            | Self::Input { state, .. } => state,
        }
    }

    /// The command being bound when the failure happened.
    pub fn command(&self) -> Option<&Arc<Command>> {
        match self {
            Self::CommandNotFound { parent, .. } => parent.as_ref(),
            Self::ArgumentNotFound { command, .. }
            | Self::ArgumentShortNamesNotFound { command, .. }
            | Self::ArgumentsMissing { command, .. }
            | Self::NoInputForArgument { command, .. }
            | Self::InvalidInputForArgument { command, .. }
            | Self::IncompatibleInputTypesForShortArguments { command, .. }
            | Self::ArgumentInputParseFail { command, .. } => Some(command),
            Self::Input { .. } => None,
        }
    }

    /// The offending token, when there is one.
    pub fn input(&self) -> Option<&Input> {
        match self {
            Self::CommandNotFound { input, .. }
            | Self::ArgumentNotFound { input, .. }
            | Self::ArgumentShortNamesNotFound { input, .. }
            | Self::InvalidInputForArgument { input, .. }
            | Self::IncompatibleInputTypesForShortArguments { input, .. } => Some(input),
            Self::ArgumentInputParseFail { fail, .. } | Self::Input { fail, .. } => Some(fail.root()),
            Self::ArgumentsMissing { .. } | Self::NoInputForArgument { .. } => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::CommandNotFound { .. } => "CommandNotFound",
            Self::ArgumentNotFound { .. } => "ArgumentNotFound",
            Self::ArgumentShortNamesNotFound { .. } => "ArgumentShortNamesNotFound",
            Self::ArgumentsMissing { .. } => "ArgumentsMissing",
            Self::NoInputForArgument { .. } => "NoInputForArgument",
            Self::InvalidInputForArgument { .. } => "InvalidInputForArgument",
            Self::IncompatibleInputTypesForShortArguments { .. } => "IncompatibleInputTypesForShortArguments",
            Self::ArgumentInputParseFail { .. } => "ArgumentInputParseFail",
            Self::Input { .. } => "InputParseFail",
        }
    }
}

impl fmt::Display for ParseFail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFail::CommandNotFound {
                input,
                parent,
                suggestions,
                ..
            } => {
                match parent {
                    Some(parent) => write!(
                        f,
                        "{}: The command '{}' wasn't found under '{}'",
                        "error".red().bold(),
                        input.content().yellow(),
                        parent.full_name().blue()
                    )?,
                    None => write!(
                        f,
                        "{}: The command '{}' wasn't found",
                        "error".red().bold(),
                        input.content().yellow()
                    )?,
                }

                if !suggestions.is_empty() {
                    writeln!(f)?;
                    writeln!(f)?;
                    if suggestions.len() == 1 {
                        write!(f, "Did you mean '{}'?", suggestions[0].green())?;
                    } else {
                        write!(f, "Did you mean one of these?")?;
                        for suggestion in suggestions {
                            write!(f, "\n    {}", suggestion.green())?;
                        }
                    }
                }
                Ok(())
            }

            ParseFail::ArgumentNotFound { command, input, .. } => write!(
                f,
                "{}: Command '{}' has no argument '{}' at position {}",
                "error".red().bold(),
                command.full_name().blue(),
                input.content().yellow(),
                input.start()
            ),

            ParseFail::ArgumentShortNamesNotFound {
                command,
                input,
                missing,
                ..
            } => {
                let missing: Vec<String> = missing.iter().map(|c| c.to_string()).collect();
                write!(
                    f,
                    "{}: Command '{}' has no short argument(s) {} in '{}'",
                    "error".red().bold(),
                    command.full_name().blue(),
                    missing.join(", ").yellow(),
                    input.content()
                )
            }

            ParseFail::ArgumentsMissing { command, missing, .. } => {
                write!(
                    f,
                    "{}: The following required argument(s) were not provided for '{}':",
                    "error".red().bold(),
                    command.full_name().blue()
                )?;
                for argument in missing {
                    write!(
                        f,
                        "\n    {} <{}>",
                        argument.name().yellow(),
                        argument.argument_type().name()
                    )?;
                }
                Ok(())
            }

            ParseFail::NoInputForArgument { command, argument, .. } => write!(
                f,
                "{}: No value for argument '{}' of '{}', expected <{}>",
                "error".red().bold(),
                argument.name().yellow(),
                command.full_name().blue(),
                argument.argument_type().name().green()
            ),

            ParseFail::InvalidInputForArgument {
                command,
                argument,
                input,
                validation,
                ..
            } => write!(
                f,
                "{}: Invalid value '{}' for argument '{}' of '{}' at position {}\n\n{}",
                "error".red().bold(),
                input.content().yellow(),
                argument.name().yellow(),
                command.full_name().blue(),
                input.start(),
                validation
            ),

            ParseFail::IncompatibleInputTypesForShortArguments {
                command,
                input,
                arguments,
                ..
            } => {
                let names: Vec<&str> = arguments.iter().map(Argument::name).collect();
                write!(
                    f,
                    "{}: Short arguments {} of '{}' in '{}' take different kinds of input",
                    "error".red().bold(),
                    names.join(", ").yellow(),
                    command.full_name().blue(),
                    input.content()
                )
            }

            ParseFail::ArgumentInputParseFail {
                command,
                argument,
                fail,
                ..
            } => write!(
                f,
                "{}: Could not read the value of '{}' for '{}'\n\n{}",
                "error".red().bold(),
                argument.name().yellow(),
                command.full_name().blue(),
                fail
            ),

            ParseFail::Input { fail, .. } => write!(f, "{fail}"),
        }
    }
}

impl std::error::Error for ParseFail {}
