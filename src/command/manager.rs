use eyre::{Result, eyre};
use log::{debug, info};
use std::sync::Arc;

use crate::cfg::syntax::Syntax;
use crate::command::container::CommandContainer;
use crate::command::tree::{Command, CommandBuilder};
use crate::input::Input;
use crate::parser::{CommandParser, ParseFail};

/// Registry of root commands.
///
/// Registration takes `&mut self` and parsing `&self`, so a manager shared between
/// threads is read-only unless the caller locks it.
#[derive(Debug, Default)]
pub struct CommandManager {
    syntax: Syntax,
    commands: Vec<Arc<Command>>,
}

impl CommandManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_syntax(syntax: Syntax) -> Self {
        Self {
            syntax,
            commands: vec![],
        }
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    /// Registers a root command. A root with the same name (or alias) and owner
    /// is an error.
    pub fn register(&mut self, command: impl Into<CommandBuilder>) -> Result<Arc<Command>> {
        let builder = command.into();
        let owner = builder.get_owner().map(str::to_string);
        if self
            .commands
            .iter()
            .any(|c| c.owner() == owner.as_deref() && c.matches(builder.name(), &self.syntax))
        {
            return Err(eyre!(
                "command '{}' is already registered{}",
                builder.name(),
                owner.map(|o| format!(" for owner '{o}'")).unwrap_or_default()
            ));
        }
        let command = builder.build();
        info!("registered command '{}'", command.name());
        self.commands.push(Arc::clone(&command));
        Ok(command)
    }

    /// Attaches `sub_command` under `parent`, which must belong to this manager.
    ///
    /// The tree holding `parent` is rebuilt; previously returned handles keep the
    /// old tree. Returns the new sub-command node.
    pub fn register_sub_command(
        &mut self,
        parent: &Command,
        sub_command: impl Into<CommandBuilder>,
    ) -> Result<Arc<Command>> {
        let sub_command = sub_command.into();
        let (index, root) = self.root_of(parent)?;
        let current = find_in(&root, &parent.path()[1..])
            .ok_or_else(|| eyre!("command '{}' is not part of its root", parent.full_name()))?;
        if current.sub_command(sub_command.name(), &self.syntax).is_some() {
            return Err(eyre!(
                "command '{}' already has a sub-command '{}'",
                parent.full_name(),
                sub_command.name()
            ));
        }

        let mut path = parent.path().to_vec();
        path.push(sub_command.name().to_string());

        let mut builder = root.to_builder();
        if !builder.insert_at(&parent.path()[1..], sub_command) {
            return Err(eyre!("command '{}' is not part of its root", parent.full_name()));
        }
        let rebuilt = builder.build();
        self.commands[index] = Arc::clone(&rebuilt);
        debug!("registered sub-command '{}'", path.join(" "));

        find_in(&rebuilt, &path[1..]).ok_or_else(|| eyre!("sub-command '{}' missing after rebuild", path.join(" ")))
    }

    /// Removes a root command or a sub-command. Returns whether anything was removed.
    pub fn unregister(&mut self, command: &Command) -> bool {
        if command.is_root() {
            let before = self.commands.len();
            self.commands.retain(|c| c.as_ref() != command);
            return before != self.commands.len();
        }
        let Ok((index, root)) = self.root_of(command) else {
            return false;
        };
        let mut builder = root.to_builder();
        if !builder.remove_at(&command.path()[1..]) {
            return false;
        }
        self.commands[index] = builder.build();
        debug!("unregistered '{}'", command.full_name());
        true
    }

    /// Looks up a root command by name or alias.
    ///
    /// With an owner, commands registered for that owner win over ownerless ones;
    /// commands of other owners are not visible. Without an owner, ownerless
    /// commands win over owned ones.
    pub fn find_command(&self, name: &str, owner: Option<&str>) -> Option<Arc<Command>> {
        let candidates = || self.commands.iter().filter(|c| c.matches(name, &self.syntax));
        let found = match owner {
            Some(owner) => candidates()
                .find(|c| c.owner() == Some(owner))
                .or_else(|| candidates().find(|c| c.owner().is_none())),
            None => candidates()
                .find(|c| c.owner().is_none())
                .or_else(|| candidates().next()),
        };
        found.cloned()
    }

    pub fn sub_command(&self, parent: &Command, name: &str) -> Option<Arc<Command>> {
        parent.sub_command(name, &self.syntax).cloned()
    }

    /// Resolves a whole path such as `["git", "remote", "add"]`.
    pub fn find_by_path<S: AsRef<str>>(&self, path: &[S], owner: Option<&str>) -> Option<Arc<Command>> {
        let (head, rest) = path.split_first()?;
        let mut command = self.find_command(head.as_ref(), owner)?;
        for name in rest {
            command = self.sub_command(&command, name.as_ref())?;
        }
        Some(command)
    }

    /// Root commands ordered by `(order, name)`.
    pub fn commands(&self) -> Vec<Arc<Command>> {
        let mut commands = self.commands.clone();
        commands.sort_by(|a, b| a.order().cmp(&b.order()).then_with(|| a.name().cmp(b.name())));
        commands
    }

    pub fn parse(&self, line: &str) -> Result<Vec<CommandContainer>, ParseFail> {
        self.parse_with_owner(line, |_| None)
    }

    /// Parses with a per-token owner used for root command lookups.
    pub fn parse_with_owner<F>(&self, line: &str, owner_resolver: F) -> Result<Vec<CommandContainer>, ParseFail>
    where
        F: Fn(&Input) -> Option<String>,
    {
        CommandParser::new(self, line, &owner_resolver).parse()
    }

    /// Parses `line`, then runs each command's argument handlers followed by its
    /// command handler, in invocation order.
    pub fn dispatch(&self, line: &str) -> Result<Vec<CommandContainer>> {
        let containers = self.parse(line)?;
        for container in &containers {
            for argument in &container.arguments {
                if let Some(handler) = &argument.handler {
                    handler(argument)?;
                }
            }
            match &container.handler {
                Some(handler) => handler(container)?,
                None => debug!("no handler for '{}'", container.command.full_name()),
            }
        }
        Ok(containers)
    }

    fn root_of(&self, command: &Command) -> Result<(usize, Arc<Command>)> {
        let root_name = command
            .path()
            .first()
            .ok_or_else(|| eyre!("command has an empty path"))?;
        let mut top = command.parent();
        while let Some(parent) = top.as_ref().and_then(|p| p.parent()) {
            top = Some(parent);
        }
        let owner = match &top {
            Some(root) => root.owner(),
            None => command.owner(),
        };
        let (index, root) = self
            .commands
            .iter()
            .enumerate()
            .find(|(_, c)| c.name() == root_name && c.owner() == owner)
            .ok_or_else(|| eyre!("command '{}' is not registered", command.full_name()))?;
        Ok((index, Arc::clone(root)))
    }
}

fn find_in(root: &Arc<Command>, path: &[String]) -> Option<Arc<Command>> {
    let mut command = Arc::clone(root);
    for name in path {
        let next = command.sub_commands().iter().find(|c| c.name() == name).cloned()?;
        command = next;
    }
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::argument::Argument;
    use crate::types;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_register_duplicate() {
        let mut manager = CommandManager::new();
        manager.register(Command::builder("build")).unwrap();
        assert!(manager.register(Command::builder("build")).is_err());
        assert!(manager.register(Command::builder("build").owner("plugin")).is_ok());
    }

    #[test]
    fn test_find_command_owner_scoping() {
        let mut manager = CommandManager::new();
        manager.register(Command::builder("reload").description("core")).unwrap();
        manager
            .register(Command::builder("reload").owner("plugin").description("plugin"))
            .unwrap();
        manager.register(Command::builder("only").owner("other")).unwrap();

        assert_eq!(manager.find_command("reload", None).unwrap().description(), "core");
        assert_eq!(manager.find_command("reload", Some("plugin")).unwrap().description(), "plugin");
        assert!(manager.find_command("only", Some("plugin")).is_none());
        assert!(manager.find_command("only", None).is_some());
    }

    #[test]
    fn test_register_sub_command_rebuilds_root() {
        let mut manager = CommandManager::new();
        let git = manager.register(Command::builder("git")).unwrap();
        let remote = manager.register_sub_command(&git, Command::builder("remote")).unwrap();
        let add = manager.register_sub_command(&remote, Command::builder("add")).unwrap();

        assert_eq!(add.path(), &["git", "remote", "add"]);
        assert!(git.sub_commands().is_empty());
        let found = manager.find_by_path(&["git", "remote", "add"], None).unwrap();
        assert_eq!(found.as_ref(), add.as_ref());
        assert_eq!(found.parent().unwrap().parent().unwrap().name(), "git");
        assert!(manager.register_sub_command(&remote, Command::builder("add")).is_err());
    }

    #[test]
    fn test_parsed_handle_outlives_replaced_root() {
        let mut manager = CommandManager::new();
        let git = manager
            .register(Command::builder("git").sub_command(Command::builder("status")))
            .unwrap();
        let parsed = manager.parse("git status").unwrap();
        let status = Arc::clone(&parsed[0].command);
        assert_eq!(status.parent().unwrap().name(), "git");

        drop(git);
        let old_root = status.parent().unwrap();
        manager.register_sub_command(&old_root, Command::builder("log")).unwrap();
        drop(old_root);

        assert!(status.parent().is_none());
        assert_eq!(status.full_name(), "git status");
        let fresh = manager.find_by_path(&["git", "status"], None).unwrap();
        assert_eq!(fresh.parent().unwrap().name(), "git");
    }

    #[test]
    fn test_unregister() {
        let mut manager = CommandManager::new();
        manager
            .register(Command::builder("git").sub_command(Command::builder("status")))
            .unwrap();
        let status = manager.find_by_path(&["git", "status"], None).unwrap();
        assert!(manager.unregister(&status));
        assert!(manager.find_by_path(&["git", "status"], None).is_none());
        let git = manager.find_command("git", None).unwrap();
        assert!(manager.unregister(&git));
        assert!(manager.commands().is_empty());
    }

    #[test]
    fn test_commands_sorted() {
        let mut manager = CommandManager::new();
        manager.register(Command::builder("zeta")).unwrap();
        manager.register(Command::builder("alpha").order(5)).unwrap();
        manager.register(Command::builder("beta")).unwrap();
        let names: Vec<_> = manager.commands().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["beta", "zeta", "alpha"]);
    }

    #[test]
    fn test_dispatch_runs_handlers_in_order() {
        static ARGS: AtomicUsize = AtomicUsize::new(0);
        static COMMANDS: AtomicUsize = AtomicUsize::new(0);

        let mut manager = CommandManager::new();
        manager
            .register(
                Command::builder("greet")
                    .argument(Argument::new("name", types::string()).handler(|c| {
                        assert_eq!(c.value.as_str(), Some("world"));
                        ARGS.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }))
                    .handler(|c| {
                        assert_eq!(ARGS.load(Ordering::SeqCst), 1);
                        assert_eq!(c.get("name").and_then(|v| v.as_str()), Some("world"));
                        COMMANDS.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }),
            )
            .unwrap();

        let containers = manager.dispatch("greet world").unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(COMMANDS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_propagates_handler_error() {
        let mut manager = CommandManager::new();
        manager
            .register(Command::builder("fail").handler(|_| Err(eyre!("boom"))))
            .unwrap();
        let err = manager.dispatch("fail").unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(manager.dispatch("missing").is_err());
    }

    #[test]
    fn test_manager_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CommandManager>();
    }
}
