use levenshtein::levenshtein;
use log::{debug, trace};
use std::sync::Arc;

use crate::cfg::syntax::Syntax;
use crate::command::{Argument, ArgumentContainer, Command, CommandContainer, CommandManager};
use crate::input::{Input, InputKind, InputParseFail, Span, TokenResult, Tokenizer};
use crate::parser::fail::{ParseFail, ParseState};
use crate::parser::stated_iterator::StatedIterator;
use crate::types::Validation;

/// How an argument was addressed on the command line.
#[derive(Clone, Copy)]
enum Binding<'i> {
    Positional,
    Long(&'i Input),
    Short(&'i Input),
}

/// Resolves one command line against a [`CommandManager`].
///
/// The line is tokenized up front; the parser then walks the tokens with a
/// [`StatedIterator`], restoring its position whenever an interpretation does not
/// work out.
pub struct CommandParser<'a> {
    manager: &'a CommandManager,
    syntax: &'a Syntax,
    source: Arc<str>,
    tokens: StatedIterator<TokenResult>,
    owner_resolver: &'a dyn Fn(&Input) -> Option<String>,
    commands: Vec<CommandContainer>,
    /// Failure of an optional positional argument that was defaulted instead, with
    /// the token position it happened at.
    recovered: Option<(usize, ParseFail)>,
}

impl<'a> CommandParser<'a> {
    pub fn new(manager: &'a CommandManager, line: &str, owner_resolver: &'a dyn Fn(&Input) -> Option<String>) -> Self {
        let syntax = manager.syntax();
        let source: Arc<str> = Arc::from(line);
        let tokens = Tokenizer::from_shared(Arc::clone(&source), syntax).tokenize_all();
        debug!("parsing '{}' ({} tokens)", line, tokens.len());
        Self {
            manager,
            syntax,
            source,
            tokens: StatedIterator::new(tokens),
            owner_resolver,
            commands: vec![],
            recovered: None,
        }
    }

    pub fn parse(mut self) -> Result<Vec<CommandContainer>, ParseFail> {
        let mut current: Option<Arc<Command>> = None;

        while let Some(token) = self.tokens.peek() {
            let input = match token {
                Ok(input) => input.clone(),
                Err(fail) => {
                    let fail = fail.clone();
                    return Err(ParseFail::Input {
                        fail,
                        state: self.state(),
                    });
                }
            };

            if self.is_chain(&input) {
                self.tokens.next();
                current = None;
                continue;
            }

            let Some(command) = self.resolve(current.as_ref(), &input) else {
                return Err(self.not_found(input, current));
            };
            self.tokens.next();
            self.recovered = None;
            trace!("resolved '{}'", command.full_name());

            if self.next_is_sub_command_of(&command) {
                current = Some(command);
                continue;
            }

            let arguments = self.bind_arguments(&command)?;
            self.commands.push(CommandContainer::new(Arc::clone(&command), arguments));
            current = Some(command);
        }

        debug!("parsed {} command(s)", self.commands.len());
        Ok(self.commands)
    }

    fn state(&self) -> ParseState {
        ParseState {
            commands: self.commands.clone(),
            position: self.tokens.pos(),
        }
    }

    fn is_chain(&self, input: &Input) -> bool {
        input.kind() == InputKind::Single && input.content() == self.syntax.chain
    }

    fn looks_like_name(&self, input: &Input) -> bool {
        input.kind() == InputKind::Single && self.syntax.looks_like_argument_name(input.content())
    }

    /// Looks `input` up as a sub-command of `current` or one of its ancestors, or as
    /// a root command when nothing is open.
    fn resolve(&self, current: Option<&Arc<Command>>, input: &Input) -> Option<Arc<Command>> {
        let name = input.text()?;
        match current {
            Some(current) => find_up(current, name, self.syntax),
            None => {
                let owner = (self.owner_resolver)(input);
                self.manager.find_command(name, owner.as_deref())
            }
        }
    }

    fn next_is_sub_command_of(&self, command: &Command) -> bool {
        match self.tokens.peek() {
            Some(Ok(input)) => bare_text(input).is_some_and(|name| command.sub_command(name, self.syntax).is_some()),
            _ => false,
        }
    }

    /// An unquoted token naming a sub-command of `command` or of an ancestor.
    fn names_sub_command(&self, command: &Arc<Command>, input: &Input) -> bool {
        bare_text(input).is_some_and(|name| find_up(command, name, self.syntax).is_some())
    }

    fn not_found(&mut self, input: Input, parent: Option<Arc<Command>>) -> ParseFail {
        if let Some((position, fail)) = self.recovered.take() {
            if position == self.tokens.pos() {
                return fail;
            }
        }

        let candidates: Vec<String> = match &parent {
            Some(parent) => {
                let mut names = Vec::new();
                let mut node = Some(Arc::clone(parent));
                while let Some(command) = node {
                    names.extend(command.sub_commands().iter().map(|c| c.name().to_string()));
                    node = command.parent();
                }
                names
            }
            None => self
                .manager
                .commands()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
        };
        let name = input.text().unwrap_or_else(|| input.content());
        let suggestions = suggest_similar_names(name, &candidates, self.syntax.suggestion_distance);

        ParseFail::CommandNotFound {
            input,
            parent,
            suggestions,
            state: self.state(),
        }
    }

    fn bind_arguments(&mut self, command: &Arc<Command>) -> Result<Vec<ArgumentContainer>, ParseFail> {
        let mut bound: Vec<ArgumentContainer> = Vec::new();

        loop {
            let remaining = command.arguments().remaining(&bound);
            if remaining.is_empty() {
                // a name after the last argument is reported against this command
                match self.tokens.peek() {
                    Some(Ok(input)) if self.looks_like_name(input) => {
                        let input = input.clone();
                        self.bind_named(command, &remaining, &input, &mut bound)?;
                        continue;
                    }
                    _ => break,
                }
            }
            let input = match self.tokens.peek() {
                None => break,
                Some(Ok(input)) => input.clone(),
                Some(Err(fail)) => {
                    let fail = fail.clone();
                    return Err(ParseFail::ArgumentInputParseFail {
                        command: Arc::clone(command),
                        argument: remaining[0].clone(),
                        fail,
                        state: self.state(),
                    });
                }
            };

            if self.is_chain(&input) {
                break;
            }
            if remaining.iter().all(Argument::is_optional) && self.names_sub_command(command, &input) {
                trace!("'{}' ends '{}'", input.content(), command.full_name());
                break;
            }

            if self.looks_like_name(&input) {
                self.bind_named(command, &remaining, &input, &mut bound)?;
            } else {
                self.bind_positional(command, remaining[0].clone(), &mut bound)?;
            }
        }

        self.finish(command, bound)
    }

    fn bind_named(
        &mut self,
        command: &Arc<Command>,
        remaining: &[Argument],
        input: &Input,
        bound: &mut Vec<ArgumentContainer>,
    ) -> Result<(), ParseFail> {
        if input.content().starts_with(self.syntax.long_prefix.as_str()) {
            self.bind_long(command, remaining, input, bound)
        } else {
            self.bind_short(command, remaining, input, bound)
        }
    }

    fn bind_positional(
        &mut self,
        command: &Arc<Command>,
        argument: Argument,
        bound: &mut Vec<ArgumentContainer>,
    ) -> Result<(), ParseFail> {
        let pos = self.tokens.pos();
        match self.bind_value(command, &argument, Binding::Positional) {
            Ok(container) => bound.push(container),
            Err(fail) if argument.is_optional() => {
                debug!(
                    "optional argument '{}' of '{}' defaulted ({})",
                    argument.name(),
                    command.full_name(),
                    fail.kind_name()
                );
                self.tokens.restore(pos);
                let value = argument.default_value().cloned().unwrap_or_default();
                bound.push(ArgumentContainer::new(argument, None, value));
                self.recovered = Some((pos, fail));
            }
            Err(fail) => return Err(fail),
        }
        Ok(())
    }

    /// `--name` or `--name=value`.
    fn bind_long(
        &mut self,
        command: &Arc<Command>,
        remaining: &[Argument],
        input: &Input,
        bound: &mut Vec<ArgumentContainer>,
    ) -> Result<(), ParseFail> {
        let prefix_len = self.syntax.long_prefix.len();
        let body = &input.content()[prefix_len..];
        let (name, value_start) = match body.find(self.syntax.assignment) {
            Some(i) => (
                &body[..i],
                Some(input.start() + prefix_len + i + self.syntax.assignment.len_utf8()),
            ),
            None => (body, None),
        };

        let Some(argument) = remaining.iter().find(|a| a.matches(name, self.syntax)).cloned() else {
            return Err(ParseFail::ArgumentNotFound {
                command: Arc::clone(command),
                input: input.clone(),
                state: self.state(),
            });
        };
        self.tokens.next();

        let container = match value_start {
            Some(start) => self.bind_assigned(command, &argument, start, input.end())?,
            None => self.bind_value(command, &argument, Binding::Long(input))?,
        };
        bound.push(container);
        Ok(())
    }

    /// `-x`, stacked `-xyz`, or `-x=value`.
    fn bind_short(
        &mut self,
        command: &Arc<Command>,
        remaining: &[Argument],
        input: &Input,
        bound: &mut Vec<ArgumentContainer>,
    ) -> Result<(), ParseFail> {
        let prefix_len = self.syntax.short_prefix.len();
        let body = &input.content()[prefix_len..];
        let (names, value_start) = match body.find(self.syntax.assignment) {
            Some(i) => (
                &body[..i],
                Some(input.start() + prefix_len + i + self.syntax.assignment.len_utf8()),
            ),
            None => (body, None),
        };

        let mut arguments: Vec<Argument> = Vec::new();
        let mut missing: Vec<char> = Vec::new();
        for c in names.chars() {
            match remaining.iter().find(|a| a.matches_short(c, self.syntax)) {
                Some(argument) if !arguments.contains(argument) => arguments.push(argument.clone()),
                Some(_) => {}
                None => missing.push(c),
            }
        }
        if !missing.is_empty() || arguments.is_empty() {
            return Err(ParseFail::ArgumentShortNamesNotFound {
                command: Arc::clone(command),
                input: input.clone(),
                missing,
                state: self.state(),
            });
        }

        let kind = arguments[0].argument_type().input_kind();
        if arguments.iter().any(|a| a.argument_type().input_kind() != kind) {
            return Err(ParseFail::IncompatibleInputTypesForShortArguments {
                command: Arc::clone(command),
                input: input.clone(),
                arguments,
                state: self.state(),
            });
        }

        self.tokens.next();
        let last = arguments.len() - 1;
        for (i, argument) in arguments.iter().enumerate() {
            let container = match value_start {
                Some(start) if i == last => self.bind_assigned(command, argument, start, input.end())?,
                _ => self.bind_value(command, argument, Binding::Short(input))?,
            };
            bound.push(container);
        }
        Ok(())
    }

    /// Reads the right-hand side of an assignment from `source[start..end]`.
    fn bind_assigned(
        &mut self,
        command: &Arc<Command>,
        argument: &Argument,
        start: usize,
        end: usize,
    ) -> Result<ArgumentContainer, ParseFail> {
        let mut tokenizer = Tokenizer::bounded(Arc::clone(&self.source), start, end, self.syntax);
        if !tokenizer.has_more() {
            return Err(ParseFail::NoInputForArgument {
                command: Arc::clone(command),
                argument: argument.clone(),
                state: self.state(),
            });
        }

        let fail_with = |fail: InputParseFail, state: ParseState| ParseFail::ArgumentInputParseFail {
            command: Arc::clone(command),
            argument: argument.clone(),
            fail,
            state,
        };
        let mut value = match tokenizer.next_input() {
            Ok(value) => value,
            Err(fail) => return Err(fail_with(fail, self.state())),
        };
        if tokenizer.has_more() {
            let position = value.end();
            return Err(fail_with(
                InputParseFail::InputMalformation {
                    reason: "unexpected input after value".to_string(),
                    root: value,
                    position,
                },
                self.state(),
            ));
        }

        let ty = argument.argument_type();
        if value.kind() == InputKind::Single && ty.input_kind() == Some(InputKind::List) {
            let span = value.span().clone();
            value = Input::list(vec![value], span);
        }
        match ty.parse(&value) {
            Ok(parsed) => Ok(ArgumentContainer::new(argument.clone(), Some(value), parsed)),
            Err(validation) => Err(self.invalid(command, argument, value, validation)),
        }
    }

    fn bind_value(
        &mut self,
        command: &Arc<Command>,
        argument: &Argument,
        binding: Binding<'_>,
    ) -> Result<ArgumentContainer, ParseFail> {
        let ty = argument.argument_type();
        if ty.is_boolean() {
            match binding {
                Binding::Long(flag) => return self.bind_flag(command, argument, flag, false),
                Binding::Short(flag) => return self.bind_flag(command, argument, flag, true),
                Binding::Positional => {}
            }
        }
        if ty.is_multiple() {
            self.bind_multiple(command, argument)
        } else {
            self.bind_single(command, argument)
        }
    }

    /// A boolean named argument: presence alone means true.
    fn bind_flag(
        &mut self,
        command: &Arc<Command>,
        argument: &Argument,
        flag: &Input,
        short: bool,
    ) -> Result<ArgumentContainer, ParseFail> {
        let next = match self.tokens.peek() {
            Some(Ok(input)) => Some(input.clone()),
            _ => None,
        };
        let Some(next) = next
            .filter(|n| !self.is_chain(n) && !self.looks_like_name(n) && !self.names_sub_command(command, n))
        else {
            return self.flag_present(command, argument, flag);
        };

        match argument.argument_type().parse(&next) {
            Ok(value) => {
                self.tokens.next();
                Ok(ArgumentContainer::new(argument.clone(), Some(next), value))
            }
            Err(_) if short => self.flag_present(command, argument, flag),
            Err(validation) => Err(self.invalid(command, argument, next, validation)),
        }
    }

    /// Value of a flag given without one, run through the argument's own type.
    fn flag_present(
        &self,
        command: &Arc<Command>,
        argument: &Argument,
        flag: &Input,
    ) -> Result<ArgumentContainer, ParseFail> {
        match argument.argument_type().parse(&Input::synthetic("true")) {
            Ok(value) => Ok(ArgumentContainer::new(argument.clone(), Some(flag.clone()), value)),
            Err(validation) => Err(self.invalid(command, argument, flag.clone(), validation)),
        }
    }

    /// Reads the next token as the whole value, or fails with no input.
    fn next_value_token(&mut self, command: &Arc<Command>, argument: &Argument) -> Result<Input, ParseFail> {
        let input = match self.tokens.peek() {
            Some(Ok(input)) => input.clone(),
            Some(Err(fail)) => {
                let fail = fail.clone();
                return Err(ParseFail::ArgumentInputParseFail {
                    command: Arc::clone(command),
                    argument: argument.clone(),
                    fail,
                    state: self.state(),
                });
            }
            None => return Err(self.no_input(command, argument)),
        };
        if self.is_chain(&input) || self.looks_like_name(&input) {
            return Err(self.no_input(command, argument));
        }
        Ok(input)
    }

    fn bind_single(&mut self, command: &Arc<Command>, argument: &Argument) -> Result<ArgumentContainer, ParseFail> {
        let input = self.next_value_token(command, argument)?;
        match argument.argument_type().parse(&input) {
            Ok(value) => {
                self.tokens.next();
                Ok(ArgumentContainer::new(argument.clone(), Some(input), value))
            }
            Err(validation) => Err(self.invalid(command, argument, input, validation)),
        }
    }

    /// A list or map shaped argument: either one bracketed literal, or a run of
    /// bare tokens each checked against the element type for its position.
    fn bind_multiple(&mut self, command: &Arc<Command>, argument: &Argument) -> Result<ArgumentContainer, ParseFail> {
        let ty = argument.argument_type();
        let first = self.next_value_token(command, argument)?;

        if first.kind() != InputKind::Single {
            return match ty.parse(&first) {
                Ok(value) => {
                    self.tokens.next();
                    Ok(ArgumentContainer::new(argument.clone(), Some(first), value))
                }
                Err(validation) => Err(self.invalid(command, argument, first, validation)),
            };
        }

        let start = self.tokens.pos();
        let mut items: Vec<Input> = Vec::new();
        let mut rejection: Option<Validation> = None;
        while let Some(Ok(token)) = self.tokens.peek() {
            if self.is_chain(token) || self.looks_like_name(token) {
                break;
            }
            let Some(element) = ty.type_at(items.len()) else {
                break;
            };
            match element.parse(token) {
                Ok(_) => {
                    items.push(token.clone());
                    self.tokens.next();
                }
                Err(validation) => {
                    if items.is_empty() {
                        rejection = Some(validation);
                    }
                    break;
                }
            }
        }

        let is_map = ty.input_kind() == Some(InputKind::Map);
        if is_map && items.len() % 2 == 1 {
            items.pop();
            self.tokens.restore(self.tokens.pos() - 1);
        }

        let (Some(head), Some(tail)) = (items.first(), items.last()) else {
            self.tokens.restore(start);
            return Err(match rejection {
                Some(validation) => self.invalid(command, argument, first, validation),
                None => self.no_input(command, argument),
            });
        };
        let span = Span::new(Arc::clone(&self.source), head.start(), tail.end());

        let composite = if is_map {
            let mut entries = Vec::with_capacity(items.len() / 2);
            let mut items = items.into_iter();
            while let (Some(key), Some(value)) = (items.next(), items.next()) {
                entries.push((key, value));
            }
            Input::map(entries, span)
        } else {
            Input::list(items, span)
        };
        trace!("accumulated {} for '{}'", composite.to_input_string(), argument.name());

        match ty.parse(&composite) {
            Ok(value) => Ok(ArgumentContainer::new(argument.clone(), Some(composite), value)),
            Err(validation) => {
                self.tokens.restore(start);
                Err(self.invalid(command, argument, composite, validation))
            }
        }
    }

    /// Closes a command: required leftovers fail, optional ones with a default are
    /// filled in. The argument set is re-queried after every injection.
    fn finish(
        &self,
        command: &Arc<Command>,
        mut bound: Vec<ArgumentContainer>,
    ) -> Result<Vec<ArgumentContainer>, ParseFail> {
        loop {
            let remaining = command.arguments().remaining(&bound);
            let missing: Vec<Argument> = remaining.iter().filter(|a| !a.is_optional()).cloned().collect();
            if !missing.is_empty() {
                return Err(ParseFail::ArgumentsMissing {
                    command: Arc::clone(command),
                    missing,
                    state: self.state(),
                });
            }

            let next = remaining.into_iter().find(|a| {
                a.default_value().is_some() && !bound.iter().any(|b| b.argument.name() == a.name())
            });
            match next {
                Some(argument) => {
                    let value = argument.default_value().cloned().unwrap_or_default();
                    bound.push(ArgumentContainer::new(argument, None, value));
                }
                None => break,
            }
        }
        Ok(bound)
    }

    fn no_input(&self, command: &Arc<Command>, argument: &Argument) -> ParseFail {
        ParseFail::NoInputForArgument {
            command: Arc::clone(command),
            argument: argument.clone(),
            state: self.state(),
        }
    }

    fn invalid(&self, command: &Arc<Command>, argument: &Argument, input: Input, validation: Validation) -> ParseFail {
        ParseFail::InvalidInputForArgument {
            command: Arc::clone(command),
            argument: argument.clone(),
            input,
            validation,
            state: self.state(),
        }
    }
}

/// Text of a single token written without quotes or escapes.
fn bare_text(input: &Input) -> Option<&str> {
    match input {
        Input::Single { text, .. } if input.content() == text => Some(text.as_str()),
        _ => None,
    }
}

fn find_up(command: &Arc<Command>, name: &str, syntax: &Syntax) -> Option<Arc<Command>> {
    let mut node = Some(Arc::clone(command));
    while let Some(current) = node {
        if let Some(found) = current.sub_command(name, syntax) {
            return Some(Arc::clone(found));
        }
        node = current.parent();
    }
    None
}

/// Up to three candidates within `max_distance` edits of `name`, closest first.
pub fn suggest_similar_names(name: &str, candidates: &[String], max_distance: usize) -> Vec<String> {
    let mut suggestions: Vec<(String, usize)> = candidates
        .iter()
        .map(|candidate| (candidate.clone(), levenshtein(name, candidate)))
        .filter(|(_, distance)| *distance <= max_distance)
        .collect();

    suggestions.sort_by_key(|(_, distance)| *distance);
    suggestions.dedup_by(|a, b| a.0 == b.0);
    suggestions.into_iter().take(3).map(|(name, _)| name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Arguments;
    use crate::types::{self, Value};

    fn manager(commands: Vec<crate::command::CommandBuilder>) -> CommandManager {
        let mut manager = CommandManager::new();
        for command in commands {
            manager.register(command).unwrap();
        }
        manager
    }

    fn names(containers: &[CommandContainer]) -> Vec<String> {
        containers.iter().map(|c| c.command.full_name()).collect()
    }

    #[test]
    fn test_sub_command_preferred_over_optional_value() {
        let manager = manager(vec![
            Command::builder("a")
                .argument(Argument::new("x", types::string().with_default("none")).optional())
                .sub_command(Command::builder("b")),
        ]);

        let result = manager.parse("a b").unwrap();
        assert_eq!(names(&result), vec!["a b"]);

        let result = manager.parse("a v").unwrap();
        assert_eq!(names(&result), vec!["a"]);
        assert_eq!(result[0].get("x"), Some(&Value::str("v")));

        let result = manager.parse("a v b").unwrap();
        assert_eq!(names(&result), vec!["a", "a b"]);

        let result = manager.parse("a").unwrap();
        assert_eq!(result[0].get("x"), Some(&Value::str("none")));
        assert!(result[0].argument("x").unwrap().is_defaulted());
    }

    #[test]
    fn test_quoted_sub_command_name_is_a_value() {
        let optional = manager(vec![
            Command::builder("a")
                .argument(Argument::new("x", types::string()).optional())
                .sub_command(Command::builder("b")),
        ]);
        for line in ["a \"b\"", "a 'b'"] {
            let result = optional.parse(line).unwrap();
            assert_eq!(names(&result), vec!["a"], "{line}");
            assert_eq!(result[0].get("x"), Some(&Value::str("b")));
        }

        let required = manager(vec![
            Command::builder("a")
                .argument(Argument::new("x", types::string()))
                .sub_command(Command::builder("b")),
        ]);
        let result = required.parse("a \"b\"").unwrap();
        assert_eq!(names(&result), vec!["a"]);
        assert_eq!(result[0].get("x"), Some(&Value::str("b")));
    }

    #[test]
    fn test_list_accumulation_stops_at_argument_name() {
        let manager = manager(vec![
            Command::builder("cmd")
                .argument(Argument::new("nums", types::list(types::int())))
                .argument(Argument::new("flag", types::boolean()).optional()),
        ]);

        let result = manager.parse("cmd --nums 1 2 3 --flag").unwrap();
        assert_eq!(
            result[0].get("nums"),
            Some(&Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
        );
        assert_eq!(result[0].get("flag"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_bare_list_stops_at_invalid_element() {
        let manager = manager(vec![
            Command::builder("sum")
                .argument(Argument::new("nums", types::list(types::int())))
                .argument(Argument::new("label", types::string())),
        ]);
        let result = manager.parse("sum 1 2 total").unwrap();
        assert_eq!(result[0].get("nums").and_then(|v| v.as_list()).map(<[Value]>::len), Some(2));
        assert_eq!(result[0].get("label"), Some(&Value::str("total")));
    }

    #[test]
    fn test_flag_at_end_of_input() {
        let manager = manager(vec![
            Command::builder("rm").argument(Argument::new("recursive", types::boolean()).alias("r")),
        ]);
        let result = manager.parse("rm --recursive").unwrap();
        assert_eq!(result[0].get("recursive"), Some(&Value::Bool(true)));

        let result = manager.parse("rm --recursive false").unwrap();
        assert_eq!(result[0].get("recursive"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_long_flag_rejects_non_boolean() {
        let manager = manager(vec![
            Command::builder("rm")
                .argument(Argument::new("recursive", types::boolean()).optional())
                .argument(Argument::new("path", types::string())),
        ]);
        let err = manager.parse("rm --recursive src").unwrap_err();
        assert!(matches!(err, ParseFail::InvalidInputForArgument { ref argument, .. } if argument.name() == "recursive"));
    }

    #[test]
    fn test_short_flag_falls_back_to_true() {
        let manager = manager(vec![
            Command::builder("ls")
                .argument(Argument::new("l", types::boolean()).optional())
                .argument(Argument::new("path", types::string())),
        ]);
        let result = manager.parse("ls -l src").unwrap();
        assert_eq!(result[0].get("l"), Some(&Value::Bool(true)));
        assert_eq!(result[0].get("path"), Some(&Value::str("src")));
    }

    #[test]
    fn test_flag_presence_uses_custom_conversion() {
        let mode = types::custom("mode", types::boolean(), |v| match v.as_bool() {
            Some(true) => Value::str("on"),
            _ => Value::str("off"),
        });
        let manager = manager(vec![
            Command::builder("run").argument(Argument::new("verbose", mode).alias("v").optional()),
        ]);
        for line in ["run --verbose", "run -v", "run --verbose yes"] {
            let result = manager.parse(line).unwrap();
            assert_eq!(result[0].get("verbose"), Some(&Value::str("on")), "{line}");
        }
        let result = manager.parse("run --verbose no").unwrap();
        assert_eq!(result[0].get("verbose"), Some(&Value::str("off")));
    }

    #[test]
    fn test_flag_presence_runs_filters() {
        let dry = types::boolean().filter("must_be_false", |v| v.as_bool() == Some(false));
        let manager = manager(vec![
            Command::builder("plan").argument(Argument::new("dry", dry).alias("d").optional()),
        ]);
        for line in ["plan --dry", "plan -d"] {
            match manager.parse(line).unwrap_err() {
                ParseFail::InvalidInputForArgument { argument, validation, .. } => {
                    assert_eq!(argument.name(), "dry");
                    assert_eq!(validation.invalids()[0].parser, "must_be_false");
                }
                other => panic!("unexpected failure for {line}: {other:?}"),
            }
        }
        let result = manager.parse("plan --dry false").unwrap();
        assert_eq!(result[0].get("dry"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_missing_required_argument() {
        let manager = manager(vec![Command::builder("create").argument(Argument::new("name", types::string()))]);
        match manager.parse("create").unwrap_err() {
            ParseFail::ArgumentsMissing { command, missing, .. } => {
                assert_eq!(command.name(), "create");
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0].name(), "name");
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn test_chained_commands() {
        let manager = manager(vec![Command::builder("a"), Command::builder("b")]);
        let result = manager.parse("a & b").unwrap();
        assert_eq!(names(&result), vec!["a", "b"]);

        let result = manager.parse("& a & & b").unwrap();
        assert_eq!(names(&result), vec!["a", "b"]);
    }

    #[test]
    fn test_chain_requires_arguments() {
        let manager = manager(vec![
            Command::builder("say").argument(Argument::new("text", types::string())),
            Command::builder("b"),
        ]);
        assert!(matches!(
            manager.parse("say & b").unwrap_err(),
            ParseFail::NoInputForArgument { .. } | ParseFail::ArgumentsMissing { .. }
        ));
        let result = manager.parse("say \"&\" & b").unwrap();
        assert_eq!(result[0].get("text"), Some(&Value::str("&")));
        assert_eq!(names(&result), vec!["say", "b"]);
    }

    #[test]
    fn test_roots_need_chain() {
        let manager = manager(vec![Command::builder("a"), Command::builder("b")]);
        match manager.parse("a b").unwrap_err() {
            ParseFail::CommandNotFound { parent, state, .. } => {
                assert_eq!(parent.unwrap().name(), "a");
                assert_eq!(state.commands.len(), 1);
                assert_eq!(state.position, 1);
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn test_nested_sub_commands() {
        let manager = manager(vec![
            Command::builder("git").sub_command(
                Command::builder("remote").sub_command(
                    Command::builder("add")
                        .argument(Argument::new("name", types::string()))
                        .argument(Argument::new("url", types::string())),
                ),
            ),
        ]);
        let result = manager.parse("git remote add origin https://example.com/repo.git").unwrap();
        assert_eq!(names(&result), vec!["git remote add"]);
        assert_eq!(result[0].get("name"), Some(&Value::str("origin")));
        assert_eq!(result[0].command.path(), &["git", "remote", "add"]);
    }

    #[test]
    fn test_sibling_sub_command_after_arguments() {
        let manager = manager(vec![
            Command::builder("svc")
                .sub_command(Command::builder("start").argument(Argument::new("name", types::string())))
                .sub_command(Command::builder("stop")),
        ]);
        let result = manager.parse("svc start web stop").unwrap();
        assert_eq!(names(&result), vec!["svc start", "svc stop"]);
    }

    struct TypedValue;

    impl Arguments for TypedValue {
        fn all(&self) -> Vec<Argument> {
            vec![
                Argument::new("kind", types::choice(&["int", "bool"])),
                Argument::new("value", types::string()),
            ]
        }

        fn remaining(&self, bound: &[ArgumentContainer]) -> Vec<Argument> {
            match bound {
                [] => vec![Argument::new("kind", types::choice(&["int", "bool"]))],
                [kind] => {
                    let ty = match kind.value.as_str() {
                        Some("int") => types::int(),
                        _ => types::boolean(),
                    };
                    vec![Argument::new("value", ty)]
                }
                _ => vec![],
            }
        }
    }

    #[test]
    fn test_dynamic_arguments() {
        let manager = manager(vec![Command::builder("set").arguments(TypedValue)]);
        let result = manager.parse("set int 42").unwrap();
        assert_eq!(result[0].get("value"), Some(&Value::Int(42)));

        let result = manager.parse("set bool yes").unwrap();
        assert_eq!(result[0].get("value"), Some(&Value::Bool(true)));

        assert!(matches!(
            manager.parse("set int yes").unwrap_err(),
            ParseFail::InvalidInputForArgument { .. }
        ));
    }

    #[test]
    fn test_stacked_short_names() {
        let manager = manager(vec![
            Command::builder("tar")
                .argument(Argument::new("x", types::boolean()).optional())
                .argument(Argument::new("v", types::boolean()).optional())
                .argument(Argument::new("n", types::list(types::int())).optional())
                .argument(Argument::new("file", types::string()).alias("f").optional()),
        ]);

        let result = manager.parse("tar -xv").unwrap();
        assert_eq!(result[0].get("x"), Some(&Value::Bool(true)));
        assert_eq!(result[0].get("v"), Some(&Value::Bool(true)));

        match manager.parse("tar -xz").unwrap_err() {
            ParseFail::ArgumentShortNamesNotFound { missing, .. } => assert_eq!(missing, vec!['z']),
            other => panic!("unexpected failure: {other:?}"),
        }

        assert!(matches!(
            manager.parse("tar -xn 1").unwrap_err(),
            ParseFail::IncompatibleInputTypesForShortArguments { .. }
        ));

        let result = manager.parse("tar -xf out.tar").unwrap();
        assert_eq!(result[0].get("file"), Some(&Value::str("out.tar")));
    }

    #[test]
    fn test_assignment_form() {
        let manager = manager(vec![
            Command::builder("greet")
                .argument(Argument::new("name", types::string()))
                .argument(Argument::new("times", types::int()).optional())
                .argument(Argument::new("tags", types::list(types::string())).optional()),
        ]);

        let result = manager.parse("greet --name=\"John Doe\" --times=3").unwrap();
        assert_eq!(result[0].get("name"), Some(&Value::str("John Doe")));
        assert_eq!(result[0].get("times"), Some(&Value::Int(3)));

        let result = manager.parse("greet --tags=[a,b] --name=x").unwrap();
        assert_eq!(
            result[0].get("tags"),
            Some(&Value::List(vec![Value::str("a"), Value::str("b")]))
        );

        assert!(matches!(
            manager.parse("greet --name=").unwrap_err(),
            ParseFail::NoInputForArgument { .. }
        ));
        assert!(matches!(
            manager.parse("greet --name=x --times=lots").unwrap_err(),
            ParseFail::InvalidInputForArgument { .. }
        ));
        assert!(matches!(
            manager.parse("greet --name=[a,").unwrap_err(),
            ParseFail::ArgumentInputParseFail { .. }
        ));
    }

    #[test]
    fn test_unknown_long_name() {
        let manager = manager(vec![Command::builder("greet").argument(Argument::new("name", types::string()))]);
        match manager.parse("greet --nmae x").unwrap_err() {
            ParseFail::ArgumentNotFound { input, .. } => assert_eq!(input.content(), "--nmae"),
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn test_repeated_name_after_last_argument() {
        let manager = manager(vec![
            Command::builder("greet").argument(Argument::new("name", types::string()).alias("n")),
        ]);
        match manager.parse("greet --name a --name b").unwrap_err() {
            ParseFail::ArgumentNotFound { command, input, .. } => {
                assert_eq!(command.name(), "greet");
                assert_eq!(input.content(), "--name");
            }
            other => panic!("unexpected failure: {other:?}"),
        }
        match manager.parse("greet -n a -n b").unwrap_err() {
            ParseFail::ArgumentShortNamesNotFound { missing, .. } => assert_eq!(missing, vec!['n']),
            other => panic!("unexpected failure: {other:?}"),
        }
        match manager.parse("greet a --loud").unwrap_err() {
            ParseFail::ArgumentNotFound { input, .. } => assert_eq!(input.content(), "--loud"),
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn test_literal_arguments() {
        let manager = manager(vec![
            Command::builder("sum").argument(Argument::new("nums", types::list(types::int()))),
            Command::builder("env").argument(Argument::new("vars", types::map(types::string(), types::int()))),
            Command::builder("point").argument(Argument::new("xy", types::pair(types::string(), types::float()))),
        ]);

        let result = manager.parse("sum [1, 2, 3]").unwrap();
        assert_eq!(
            result[0].get("nums"),
            Some(&Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
        );

        let result = manager.parse("env {A=1, B:2}").unwrap();
        assert_eq!(result[0].get("vars").and_then(|v| v.get("B")), Some(&Value::Int(2)));

        let result = manager.parse("env A 1 B 2").unwrap();
        assert_eq!(result[0].get("vars").and_then(|v| v.as_map()).map(<[(Value, Value)]>::len), Some(2));

        let result = manager.parse("point {x=1.5}").unwrap();
        assert_eq!(
            result[0].get("xy"),
            Some(&Value::pair(Value::str("x"), Value::Float(1.5)))
        );
        let result = manager.parse("point y 2").unwrap();
        assert_eq!(result[0].get("xy"), Some(&Value::pair(Value::str("y"), Value::Float(2.0))));

        match manager.parse("sum [1, x, y]").unwrap_err() {
            ParseFail::InvalidInputForArgument { validation, .. } => assert_eq!(validation.len(), 2),
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn test_command_not_found_suggestions() {
        let manager = manager(vec![Command::builder("build"), Command::builder("test"), Command::builder("bench")]);
        match manager.parse("buidl").unwrap_err() {
            ParseFail::CommandNotFound { suggestions, parent, .. } => {
                assert!(parent.is_none());
                assert_eq!(suggestions.first().map(String::as_str), Some("build"));
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn test_recovered_failure_reported() {
        let manager = manager(vec![Command::builder("count").argument(Argument::new("n", types::int()).optional())]);
        let result = manager.parse("count").unwrap();
        assert!(result[0].get("n").is_none());

        match manager.parse("count abc").unwrap_err() {
            ParseFail::InvalidInputForArgument { argument, input, .. } => {
                assert_eq!(argument.name(), "n");
                assert_eq!(input.content(), "abc");
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn test_optional_positional_skipped() {
        let manager = manager(vec![
            Command::builder("head")
                .argument(Argument::new("lines", types::int().with_default(10i64)).optional())
                .argument(Argument::new("file", types::string())),
        ]);
        let result = manager.parse("head notes.txt").unwrap();
        assert_eq!(result[0].get("lines"), Some(&Value::Int(10)));
        assert_eq!(result[0].get("file"), Some(&Value::str("notes.txt")));

        let result = manager.parse("head 5 notes.txt").unwrap();
        assert_eq!(result[0].get("lines"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_required_positional_invalid() {
        let manager = manager(vec![Command::builder("count").argument(Argument::new("n", types::int()))]);
        assert!(matches!(
            manager.parse("count abc").unwrap_err(),
            ParseFail::InvalidInputForArgument { .. }
        ));
    }

    #[test]
    fn test_tokenizer_failure() {
        let manager = manager(vec![
            Command::builder("echo"),
            Command::builder("sum").argument(Argument::new("nums", types::list(types::int()))),
        ]);
        match manager.parse("echo [1, 2").unwrap_err() {
            ParseFail::Input { state, .. } => assert_eq!(state.commands.len(), 1),
            other => panic!("unexpected failure: {other:?}"),
        }
        assert!(matches!(
            manager.parse("sum [1, 2").unwrap_err(),
            ParseFail::ArgumentInputParseFail { .. }
        ));
    }

    #[test]
    fn test_owner_resolver() {
        let manager = manager(vec![
            Command::builder("reload").description("core"),
            Command::builder("reload").owner("plugin").description("plugin"),
        ]);
        let result = manager.parse_with_owner("reload", |_| Some("plugin".to_string())).unwrap();
        assert_eq!(result[0].command.description(), "plugin");
        let result = manager.parse("reload").unwrap();
        assert_eq!(result[0].command.description(), "core");
    }

    #[test]
    fn test_empty_line() {
        let manager = manager(vec![Command::builder("a")]);
        assert!(manager.parse("").unwrap().is_empty());
        assert!(manager.parse("   ").unwrap().is_empty());
    }

    #[test]
    fn test_suggest_similar_names() {
        let names = vec!["hello".to_string(), "help".to_string(), "build".to_string()];
        let suggestions = suggest_similar_names("hell", &names, 3);
        assert!(suggestions.contains(&"hello".to_string()));
        assert!(suggestions.contains(&"help".to_string()));
        assert!(suggest_similar_names("xyzxyzxyz", &names, 3).is_empty());
    }
}
