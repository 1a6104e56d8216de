use std::fmt;
use std::sync::Arc;

use crate::cfg::syntax::Syntax;
use crate::command::container::ArgumentContainer;
use crate::types::{ArgumentType, Value};

pub type ArgumentHandler = Arc<dyn Fn(&ArgumentContainer) -> eyre::Result<()> + Send + Sync>;

/// A named, typed parameter slot of a command.
#[derive(Clone)]
pub struct Argument {
    name: String,
    aliases: Vec<String>,
    description: String,
    optional: bool,
    argument_type: ArgumentType,
    requirements: Vec<String>,
    required_info: Vec<String>,
    handler: Option<ArgumentHandler>,
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argument")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("optional", &self.optional)
            .field("type", &self.argument_type.name())
            .finish()
    }
}

impl PartialEq for Argument {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Argument {}

impl Argument {
    pub fn new(name: impl Into<String>, argument_type: ArgumentType) -> Self {
        Self {
            name: name.into(),
            aliases: vec![],
            description: String::new(),
            optional: false,
            argument_type,
            requirements: vec![],
            required_info: vec![],
            handler: None,
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn set_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    #[must_use]
    pub fn requirement(mut self, id: impl Into<String>) -> Self {
        self.requirements.push(id.into());
        self
    }

    #[must_use]
    pub fn required_info(mut self, id: impl Into<String>) -> Self {
        self.required_info.push(id.into());
        self
    }

    #[must_use]
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ArgumentContainer) -> eyre::Result<()> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn get_description(&self) -> &str {
        &self.description
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn argument_type(&self) -> &ArgumentType {
        &self.argument_type
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.argument_type.default_value()
    }

    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    pub fn required_infos(&self) -> &[String] {
        &self.required_info
    }

    pub fn get_handler(&self) -> Option<&ArgumentHandler> {
        self.handler.as_ref()
    }

    /// Long-form match against the name or any alias.
    pub fn matches(&self, name: &str, syntax: &Syntax) -> bool {
        syntax.names_match(&self.name, name) || self.aliases.iter().any(|a| syntax.names_match(a, name))
    }

    /// Short-form match against single-character names and aliases.
    pub fn matches_short(&self, c: char, syntax: &Syntax) -> bool {
        std::iter::once(&self.name)
            .chain(self.aliases.iter())
            .filter(|n| n.chars().count() == 1)
            .any(|n| {
                let mut buf = [0u8; 4];
                syntax.names_match(n, c.encode_utf8(&mut buf))
            })
    }
}

/// The argument list of a command.
///
/// `remaining` supports argument sets that depend on what was already bound:
/// the argument at position N may be chosen from the values of 0..N-1.
pub trait Arguments: Send + Sync {
    fn all(&self) -> Vec<Argument>;

    /// Arguments still eligible after `bound`, in declaration order.
    fn remaining(&self, bound: &[ArgumentContainer]) -> Vec<Argument>;
}

/// A fixed argument list.
#[derive(Clone, Debug, Default)]
pub struct StaticArguments {
    arguments: Vec<Argument>,
}

impl StaticArguments {
    pub fn new(arguments: Vec<Argument>) -> Self {
        Self { arguments }
    }
}

impl Arguments for StaticArguments {
    fn all(&self) -> Vec<Argument> {
        self.arguments.clone()
    }

    fn remaining(&self, bound: &[ArgumentContainer]) -> Vec<Argument> {
        self.arguments
            .iter()
            .filter(|a| !bound.iter().any(|b| b.argument.name() == a.name()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;

    #[test]
    fn test_matches_aliases() {
        let syntax = Syntax::default();
        let arg = Argument::new("recursive", types::boolean()).alias("r").alias("rec");
        assert!(arg.matches("recursive", &syntax));
        assert!(arg.matches("rec", &syntax));
        assert!(!arg.matches("Recursive", &syntax));
        assert!(arg.matches_short('r', &syntax));
        assert!(!arg.matches_short('e', &syntax));
    }

    #[test]
    fn test_single_char_name_is_short() {
        let syntax = Syntax::default();
        let arg = Argument::new("n", types::int());
        assert!(arg.matches_short('n', &syntax));
    }

    #[test]
    fn test_static_remaining_filters_bound() {
        let a = Argument::new("a", types::string());
        let b = Argument::new("b", types::string());
        let arguments = StaticArguments::new(vec![a.clone(), b.clone()]);
        let bound = vec![ArgumentContainer::new(a, None, Value::str("x"))];
        assert_eq!(arguments.remaining(&bound), vec![b]);
        assert_eq!(arguments.all().len(), 2);
    }
}
