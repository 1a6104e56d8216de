use eyre::{Result, eyre};
use log::debug;
use serde::Deserialize;
use serde::de::{Deserializer, Error, MapAccess, SeqAccess, Visitor};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::cfg::syntax::Syntax;
use crate::command::{Argument, Command, CommandBuilder, CommandManager};
use crate::input::tokenize;
use crate::types::TypeRegistry;

fn default_type() -> String {
    "string".to_string()
}

/// A command tree read from YAML.
///
/// ```yaml
/// commands:
///   - name: build
///     alias: b
///     arguments:
///       profile:
///         type: choice(debug|release)
///         default: debug
///       -v|--verbose:
///         type: bool
///     commands:
///       - name: clean
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct DefinitionSpec {
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CommandSpec {
    pub name: String,

    #[serde(default, deserialize_with = "deserialize_names")]
    pub alias: Vec<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub order: i32,

    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default, deserialize_with = "deserialize_names")]
    pub requires: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_argument_map")]
    pub arguments: Vec<ArgumentSpec>,

    #[serde(default)]
    pub commands: Vec<CommandSpec>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ArgumentSpec {
    #[serde(skip_deserializing)]
    pub name: String,

    #[serde(default, deserialize_with = "deserialize_names")]
    pub alias: Vec<String>,

    #[serde(rename = "type", default = "default_type")]
    pub type_name: String,

    #[serde(default)]
    pub optional: bool,

    /// Written the way it would be typed on the command line, e.g. `[1, 2]`.
    #[serde(default, deserialize_with = "deserialize_default")]
    pub default: Option<String>,

    #[serde(default)]
    pub description: String,
}

impl DefinitionSpec {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| eyre!("command definition error: {}", e))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| eyre!("failed to read command definitions {}: {}", path.display(), e))?;
        Self::from_yaml(&content)
    }

    /// Builds every command and registers it with `manager`.
    pub fn register(&self, manager: &mut CommandManager, registry: &TypeRegistry) -> Result<Vec<Arc<Command>>> {
        let syntax = manager.syntax().clone();
        let mut registered = Vec::with_capacity(self.commands.len());
        for spec in &self.commands {
            let builder = spec.to_builder(registry, &syntax)?;
            registered.push(manager.register(builder)?);
        }
        debug!("registered {} command(s) from definitions", registered.len());
        Ok(registered)
    }
}

impl CommandSpec {
    pub fn to_builder(&self, registry: &TypeRegistry, syntax: &Syntax) -> Result<CommandBuilder> {
        let mut builder = Command::builder(&self.name)
            .description(&self.description)
            .order(self.order);
        for alias in &self.alias {
            builder = builder.alias(alias);
        }
        if let Some(owner) = &self.owner {
            builder = builder.owner(owner);
        }
        for id in &self.requires {
            builder = builder.requirement(id);
        }
        for argument in &self.arguments {
            let argument = argument
                .to_argument(registry, syntax)
                .map_err(|e| eyre!("command '{}': {}", self.name, e))?;
            builder = builder.argument(argument);
        }
        for sub_command in &self.commands {
            builder = builder.sub_command(sub_command.to_builder(registry, syntax)?);
        }
        Ok(builder)
    }
}

impl ArgumentSpec {
    /// An argument with a default is optional even when not marked so.
    pub fn to_argument(&self, registry: &TypeRegistry, syntax: &Syntax) -> Result<Argument> {
        let mut argument_type = registry
            .resolve(&self.type_name)
            .map_err(|e| eyre!("argument '{}': {}", self.name, e))?;

        if let Some(text) = &self.default {
            let input = tokenize(text, syntax)
                .into_iter()
                .next()
                .ok_or_else(|| eyre!("argument '{}': empty default", self.name))?
                .map_err(|e| eyre!("argument '{}': default '{}' is malformed: {}", self.name, text, e))?;
            let value = argument_type
                .parse(&input)
                .map_err(|v| eyre!("argument '{}': invalid default '{}': {}", self.name, text, v))?;
            argument_type = argument_type.with_default(value);
        }

        let mut argument = Argument::new(&self.name, argument_type)
            .description(&self.description)
            .set_optional(self.optional || self.default.is_some());
        for alias in &self.alias {
            argument = argument.alias(alias);
        }
        Ok(argument)
    }
}

/// Splits an argument title such as `-v|--verbose` into its name (the long form if
/// present) and aliases.
fn divine(title: &str) -> (String, Vec<String>) {
    let names: Vec<&str> = title
        .split('|')
        .map(|part| part.trim().trim_start_matches('-'))
        .filter(|part| !part.is_empty())
        .collect();

    let name = names
        .iter()
        .copied()
        .find(|n| n.chars().count() > 1)
        .or_else(|| names.first().copied())
        .unwrap_or(title)
        .to_string();
    let aliases = names.into_iter().filter(|n| *n != name).map(str::to_string).collect();
    (name, aliases)
}

fn deserialize_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Names;

    impl<'de> Visitor<'de> for Names {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("string or list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(vec![value.to_owned()])
        }

        fn visit_seq<S>(self, mut visitor: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut names: Vec<String> = vec![];
            while let Some(item) = visitor.next_element()? {
                names.push(item);
            }
            Ok(names)
        }
    }

    deserializer.deserialize_any(Names)
}

fn deserialize_default<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct DefaultText;

    impl<'de> Visitor<'de> for DefaultText {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, number or boolean")
        }

        fn visit_str<E: Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(Some(value.to_owned()))
        }

        fn visit_bool<E: Error>(self, value: bool) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_i64<E: Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E: Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_f64<E: Error>(self, value: f64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_unit<E: Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(DefaultText)
}

/// Arguments are a mapping of title to spec; document order is declaration order.
fn deserialize_argument_map<'de, D>(deserializer: D) -> Result<Vec<ArgumentSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ArgumentMap;

    impl<'de> Visitor<'de> for ArgumentMap {
        type Value = Vec<ArgumentSpec>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of name to argument")
        }

        fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
        where
            M: MapAccess<'de>,
        {
            let mut arguments = Vec::new();
            while let Some((title, spec)) = map.next_entry::<String, Option<ArgumentSpec>>()? {
                let (name, aliases) = divine(&title);
                let mut argument = spec.unwrap_or_else(|| ArgumentSpec {
                    name: String::new(),
                    alias: vec![],
                    type_name: default_type(),
                    optional: false,
                    default: None,
                    description: String::new(),
                });
                if arguments.iter().any(|a: &ArgumentSpec| a.name == name) {
                    return Err(M::Error::custom(format!("duplicate argument '{name}'")));
                }
                argument.name = name;
                argument.alias.extend(aliases);
                arguments.push(argument);
            }
            Ok(arguments)
        }
    }

    deserializer.deserialize_map(ArgumentMap)
}
