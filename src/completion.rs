use log::debug;
use serde::Serialize;
use std::sync::Arc;

use crate::command::{Argument, Command, CommandManager};
use crate::input::{Input, Span};
use crate::parser::ParseFail;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub text: String,
    pub description: String,
    pub kind: CompletionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    Command,
    ArgumentName,
    ArgumentValue,
}

/// Completes `line` against the commands of `manager`.
pub fn complete(manager: &CommandManager, line: &str) -> Vec<Completion> {
    CompletionGenerator::new(manager).generate_completions(line)
}

/// Turns the outcome of parsing a partial line into candidates for the next (or
/// the unfinished last) token.
pub struct CompletionGenerator<'a> {
    manager: &'a CommandManager,
}

impl<'a> CompletionGenerator<'a> {
    pub fn new(manager: &'a CommandManager) -> Self {
        Self { manager }
    }

    pub fn generate_completions(&self, line: &str) -> Vec<Completion> {
        let completions = match self.manager.parse(line) {
            Ok(containers) => match containers.last() {
                Some(last) => {
                    let bound: Vec<&str> = last.arguments.iter().map(|a| a.argument.name()).collect();
                    let mut completions = self.sub_command_completions(&last.command, "");
                    completions.extend(
                        last.command
                            .arguments()
                            .all()
                            .iter()
                            .filter(|a| !bound.contains(&a.name()))
                            .map(|a| self.argument_name_completion(a)),
                    );
                    completions
                }
                None => self.root_completions(""),
            },
            Err(fail) => self.fail_completions(&fail),
        };
        debug!("{} completion(s) for '{}'", completions.len(), line);
        completions
    }

    fn fail_completions(&self, fail: &ParseFail) -> Vec<Completion> {
        match fail {
            ParseFail::CommandNotFound { input, parent, .. } => {
                let prefix = input.text().unwrap_or_default();
                match parent {
                    Some(parent) => {
                        let mut completions = Vec::new();
                        let mut node = Some(Arc::clone(parent));
                        while let Some(command) = node {
                            completions.extend(self.sub_command_completions(&command, prefix));
                            node = command.parent();
                        }
                        completions
                    }
                    None => self.root_completions(prefix),
                }
            }
            ParseFail::ArgumentNotFound { command, input, .. } => {
                let prefix = input.content();
                command
                    .arguments()
                    .all()
                    .iter()
                    .map(|a| self.argument_name_completion(a))
                    .filter(|c| c.text.starts_with(prefix))
                    .collect()
            }
            ParseFail::ArgumentsMissing { missing, .. } => {
                let mut completions: Vec<Completion> =
                    missing.iter().map(|a| self.argument_name_completion(a)).collect();
                if let Some(first) = missing.first() {
                    completions.extend(value_completions(first, &Input::empty(Span::synthetic())));
                }
                completions
            }
            ParseFail::NoInputForArgument { argument, .. } => {
                value_completions(argument, &Input::empty(Span::synthetic()))
            }
            ParseFail::InvalidInputForArgument { argument, input, .. } => value_completions(argument, input),
            _ => vec![],
        }
    }

    fn root_completions(&self, prefix: &str) -> Vec<Completion> {
        self.manager
            .commands()
            .iter()
            .filter(|c| c.name().starts_with(prefix))
            .map(|c| command_completion(c))
            .collect()
    }

    fn sub_command_completions(&self, command: &Command, prefix: &str) -> Vec<Completion> {
        command
            .sub_commands()
            .iter()
            .filter(|c| c.name().starts_with(prefix))
            .map(|c| command_completion(c))
            .collect()
    }

    fn argument_name_completion(&self, argument: &Argument) -> Completion {
        Completion {
            text: format!("{}{}", self.manager.syntax().long_prefix, argument.name()),
            description: argument.get_description().to_string(),
            kind: CompletionKind::ArgumentName,
        }
    }
}

fn command_completion(command: &Command) -> Completion {
    Completion {
        text: command.name().to_string(),
        description: command.description().to_string(),
        kind: CompletionKind::Command,
    }
}

fn value_completions(argument: &Argument, input: &Input) -> Vec<Completion> {
    argument
        .argument_type()
        .possibilities(input)
        .iter()
        .map(|p| Completion {
            text: p.to_input_string(),
            description: argument.argument_type().name().to_string(),
            kind: CompletionKind::ArgumentValue,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;

    fn manager() -> CommandManager {
        let mut manager = CommandManager::new();
        manager
            .register(
                Command::builder("git")
                    .description("version control")
                    .sub_command(Command::builder("remote").description("manage remotes"))
                    .sub_command(Command::builder("rebase")),
            )
            .unwrap();
        manager
            .register(
                Command::builder("build")
                    .argument(
                        Argument::new("profile", types::choice(&["debug", "release"]))
                            .description("build profile"),
                    )
                    .argument(Argument::new("verbose", types::boolean()).optional()),
            )
            .unwrap();
        manager
    }

    fn texts(completions: &[Completion]) -> Vec<&str> {
        completions.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_root_completions() {
        let manager = manager();
        assert_eq!(texts(&complete(&manager, "")), vec!["build", "git"]);
        assert_eq!(texts(&complete(&manager, "gi")), vec!["git"]);
    }

    #[test]
    fn test_sub_command_completions() {
        let manager = manager();
        let completions = complete(&manager, "git re");
        assert_eq!(texts(&completions), vec!["remote", "rebase"]);
        assert!(completions.iter().all(|c| c.kind == CompletionKind::Command));
    }

    #[test]
    fn test_missing_argument_completions() {
        let manager = manager();
        let completions = complete(&manager, "build");
        assert!(texts(&completions).contains(&"--profile"));
        assert!(texts(&completions).contains(&"debug"));
        assert!(texts(&completions).contains(&"release"));
    }

    #[test]
    fn test_value_completions() {
        let manager = manager();
        let completions = complete(&manager, "build --profile rel");
        assert_eq!(texts(&completions), vec!["release"]);
        assert_eq!(completions[0].kind, CompletionKind::ArgumentValue);
    }

    #[test]
    fn test_argument_name_completions() {
        let manager = manager();
        let completions = complete(&manager, "build release --verb");
        assert_eq!(texts(&completions), vec!["--verbose"]);
    }

    #[test]
    fn test_argument_name_completions_after_last_argument() {
        let manager = manager();
        let completions = complete(&manager, "build release --verbose true --verb");
        assert_eq!(texts(&completions), vec!["--verbose"]);
        assert_eq!(completions[0].kind, CompletionKind::ArgumentName);
    }

    #[test]
    fn test_completions_after_success() {
        let manager = manager();
        let completions = complete(&manager, "build debug");
        assert_eq!(texts(&completions), vec!["--verbose"]);
    }

    #[test]
    fn test_possibilities_are_pure() {
        let manager = manager();
        assert_eq!(complete(&manager, "build"), complete(&manager, "build"));
    }
}
