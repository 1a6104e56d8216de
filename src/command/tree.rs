use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use crate::cfg::syntax::Syntax;
use crate::command::argument::{Argument, Arguments, StaticArguments};
use crate::command::container::CommandContainer;

pub type CommandHandler = Arc<dyn Fn(&CommandContainer) -> eyre::Result<()> + Send + Sync>;

/// A node of the command tree.
///
/// Nodes are immutable and shared through `Arc`. A node owns its sub-commands and
/// keeps a weak link to its parent, so the parent is reachable for as long as the
/// tree it belongs to is alive. Identity is the path of names from the root.
pub struct Command {
    parent: Weak<Command>,
    path: Vec<String>,
    name: String,
    aliases: Vec<String>,
    description: String,
    arguments: Arc<dyn Arguments>,
    sub_commands: Vec<Arc<Command>>,
    handler: Option<CommandHandler>,
    effective_handler: Option<CommandHandler>,
    requirements: Vec<String>,
    required_info: Vec<String>,
    order: i32,
    owner: Option<String>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("path", &self.path)
            .field("aliases", &self.aliases)
            .field("arguments", &self.arguments.all())
            .field("sub_commands", &self.sub_commands.iter().map(|c| c.name()).collect::<Vec<_>>())
            .field("order", &self.order)
            .field("owner", &self.owner)
            .finish()
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.owner == other.owner
    }
}

impl Eq for Command {}

impl Hash for Command {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
        self.owner.hash(state);
    }
}

impl Command {
    pub fn builder(name: impl Into<String>) -> CommandBuilder {
        CommandBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn arguments(&self) -> &dyn Arguments {
        self.arguments.as_ref()
    }

    pub fn sub_commands(&self) -> &[Arc<Command>] {
        &self.sub_commands
    }

    /// The enclosing command. Parents are held weakly, so a handle only reaches its
    /// root while its tree is still registered. `path` and `full_name` stay valid
    /// either way.
    pub fn parent(&self) -> Option<Arc<Command>> {
        self.parent.upgrade()
    }

    pub fn is_root(&self) -> bool {
        self.path.len() == 1
    }

    /// Names from the root down to this command.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn full_name(&self) -> String {
        self.path.join(" ")
    }

    pub fn handler(&self) -> Option<&CommandHandler> {
        self.handler.as_ref()
    }

    /// This command's handler, else the nearest ancestor's.
    pub fn effective_handler(&self) -> Option<&CommandHandler> {
        self.effective_handler.as_ref()
    }

    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    pub fn required_info(&self) -> &[String] {
        &self.required_info
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn matches(&self, name: &str, syntax: &Syntax) -> bool {
        syntax.names_match(&self.name, name) || self.aliases.iter().any(|a| syntax.names_match(a, name))
    }

    pub fn sub_command(&self, name: &str, syntax: &Syntax) -> Option<&Arc<Command>> {
        self.sub_commands.iter().find(|c| c.matches(name, syntax))
    }

    /// Structural copy of this command and its sub-tree, detached from its parent.
    pub fn to_builder(&self) -> CommandBuilder {
        CommandBuilder {
            name: self.name.clone(),
            aliases: self.aliases.clone(),
            description: self.description.clone(),
            arguments: ArgumentsSource::Shared(Arc::clone(&self.arguments)),
            sub_commands: self.sub_commands.iter().map(|c| c.to_builder()).collect(),
            handler: self.handler.clone(),
            requirements: self.requirements.clone(),
            required_info: self.required_info.clone(),
            order: self.order,
            owner: self.owner.clone(),
        }
    }
}

#[derive(Clone)]
enum ArgumentsSource {
    Static(Vec<Argument>),
    Shared(Arc<dyn Arguments>),
}

/// Collects a command definition; [`CommandBuilder::build`] turns it into an
/// immutable tree.
#[derive(Clone)]
pub struct CommandBuilder {
    name: String,
    aliases: Vec<String>,
    description: String,
    arguments: ArgumentsSource,
    sub_commands: Vec<CommandBuilder>,
    handler: Option<CommandHandler>,
    requirements: Vec<String>,
    required_info: Vec<String>,
    order: i32,
    owner: Option<String>,
}

impl fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("name", &self.name)
            .field("sub_commands", &self.sub_commands)
            .finish()
    }
}

impl From<&Command> for CommandBuilder {
    fn from(command: &Command) -> Self {
        command.to_builder()
    }
}

impl From<Arc<Command>> for CommandBuilder {
    fn from(command: Arc<Command>) -> Self {
        command.to_builder()
    }
}

impl From<&Arc<Command>> for CommandBuilder {
    fn from(command: &Arc<Command>) -> Self {
        command.to_builder()
    }
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: vec![],
            description: String::new(),
            arguments: ArgumentsSource::Static(vec![]),
            sub_commands: vec![],
            handler: None,
            requirements: vec![],
            required_info: vec![],
            order: 0,
            owner: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
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

    /// Appends to a fixed argument list. Replaces a list previously set with
    /// [`CommandBuilder::arguments`].
    #[must_use]
    pub fn argument(mut self, argument: Argument) -> Self {
        match &mut self.arguments {
            ArgumentsSource::Static(list) => list.push(argument),
            ArgumentsSource::Shared(_) => self.arguments = ArgumentsSource::Static(vec![argument]),
        }
        self
    }

    #[must_use]
    pub fn arguments<A: Arguments + 'static>(mut self, arguments: A) -> Self {
        self.arguments = ArgumentsSource::Shared(Arc::new(arguments));
        self
    }

    /// Attaches a copy of `sub_command`; the value passed in is left untouched.
    #[must_use]
    pub fn sub_command(mut self, sub_command: impl Into<CommandBuilder>) -> Self {
        self.sub_commands.push(sub_command.into());
        self
    }

    #[must_use]
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CommandContainer) -> eyre::Result<()> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
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
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn get_owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Adds `child` under the sub-command at `path` (relative to this builder, whose
    /// own name is not part of it). Returns false when the path does not exist.
    pub(crate) fn insert_at(&mut self, path: &[String], child: CommandBuilder) -> bool {
        match path.split_first() {
            None => {
                self.sub_commands.push(child);
                true
            }
            Some((head, rest)) => self
                .sub_commands
                .iter_mut()
                .find(|c| &c.name == head)
                .is_some_and(|c| c.insert_at(rest, child)),
        }
    }

    /// Removes the sub-command at `path`. Returns false when it does not exist.
    pub(crate) fn remove_at(&mut self, path: &[String]) -> bool {
        match path.split_first() {
            None => false,
            Some((head, [])) => {
                let before = self.sub_commands.len();
                self.sub_commands.retain(|c| &c.name != head);
                before != self.sub_commands.len()
            }
            Some((head, rest)) => self
                .sub_commands
                .iter_mut()
                .find(|c| &c.name == head)
                .is_some_and(|c| c.remove_at(rest)),
        }
    }

    pub fn build(self) -> Arc<Command> {
        build_node(self, Weak::new(), &[], None)
    }
}

fn build_node(
    builder: CommandBuilder,
    parent: Weak<Command>,
    parent_path: &[String],
    inherited: Option<&CommandHandler>,
) -> Arc<Command> {
    let mut path = parent_path.to_vec();
    path.push(builder.name.clone());
    let effective_handler = builder.handler.clone().or_else(|| inherited.cloned());
    let arguments: Arc<dyn Arguments> = match builder.arguments {
        ArgumentsSource::Static(list) => Arc::new(StaticArguments::new(list)),
        ArgumentsSource::Shared(shared) => shared,
    };
    let children = builder.sub_commands;

    Arc::new_cyclic(|me: &Weak<Command>| {
        let sub_commands = children
            .into_iter()
            .map(|child| build_node(child, me.clone(), &path, effective_handler.as_ref()))
            .collect();
        Command {
            parent,
            path,
            name: builder.name,
            aliases: builder.aliases,
            description: builder.description,
            arguments,
            sub_commands,
            handler: builder.handler,
            effective_handler,
            requirements: builder.requirements,
            required_info: builder.required_info,
            order: builder.order,
            owner: builder.owner,
        }
    })
}
