use std::fmt;
use std::sync::Arc;

use crate::command::argument::{Argument, ArgumentHandler};
use crate::command::tree::{Command, CommandHandler};
use crate::input::Input;
use crate::types::Value;

/// A bound argument: the argument, the input it consumed (none when defaulted)
/// and the resulting value.
#[derive(Clone)]
pub struct ArgumentContainer {
    pub argument: Argument,
    pub input: Option<Input>,
    pub value: Value,
    pub handler: Option<ArgumentHandler>,
}

impl ArgumentContainer {
    pub fn new(argument: Argument, input: Option<Input>, value: Value) -> Self {
        let handler = argument.get_handler().cloned();
        Self {
            argument,
            input,
            value,
            handler,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        self.input.is_none()
    }
}

impl fmt::Debug for ArgumentContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentContainer")
            .field("argument", &self.argument.name())
            .field("input", &self.input.as_ref().map(Input::to_input_string))
            .field("value", &self.value)
            .finish()
    }
}

/// One resolved command invocation.
#[derive(Clone)]
pub struct CommandContainer {
    pub command: Arc<Command>,
    pub arguments: Vec<ArgumentContainer>,
    pub handler: Option<CommandHandler>,
}

impl CommandContainer {
    pub fn new(command: Arc<Command>, arguments: Vec<ArgumentContainer>) -> Self {
        let handler = command.effective_handler().cloned();
        Self {
            command,
            arguments,
            handler,
        }
    }

    pub fn argument(&self, name: &str) -> Option<&ArgumentContainer> {
        self.arguments.iter().find(|a| a.argument.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.argument(name).map(|a| &a.value)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut arguments = serde_json::Map::new();
        for container in &self.arguments {
            arguments.insert(container.argument.name().to_string(), container.value.to_json());
        }
        serde_json::json!({
            "command": self.command.path(),
            "arguments": arguments,
        })
    }
}

impl fmt::Debug for CommandContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContainer")
            .field("command", &self.command.full_name())
            .field("arguments", &self.arguments)
            .finish()
    }
}
