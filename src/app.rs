use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use eyre::Result;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cfg::{DefinitionSpec, Syntax};
use crate::command::{Command, CommandContainer, CommandManager};
use crate::completion::complete;
use crate::input::{TokenResult, tokenize};
use crate::types::TypeRegistry;

/// Parse a command line against a YAML command tree
#[derive(Debug, clap::Parser)]
#[command(name = "cmdtree", version)]
pub struct CmdtreeCommand {
    /// YAML file with the command definitions
    #[arg(short, long, value_name = "FILE", env = "CMDTREE_COMMANDS")]
    pub commands: PathBuf,

    /// YAML file overriding the input syntax
    #[arg(short, long, value_name = "FILE")]
    pub syntax: Option<PathBuf>,

    /// Print the tokens instead of parsing
    #[arg(long, conflicts_with_all = ["complete", "list"])]
    pub tokens: bool,

    /// Print completion candidates for the line
    #[arg(long, conflicts_with = "list")]
    pub complete: bool,

    /// Show the registered command tree
    #[arg(long)]
    pub list: bool,

    /// The command line to parse
    #[arg(value_name = "LINE", trailing_var_arg = true, allow_hyphen_values = true)]
    pub line: Vec<String>,
}

impl CmdtreeCommand {
    /// Runs the command. `Ok(false)` means the line did not parse; the failure has
    /// already been reported on stderr.
    pub fn execute(&self) -> Result<bool> {
        let syntax = match &self.syntax {
            Some(path) => Syntax::load(path)?,
            None => Syntax::default(),
        };
        let line = self.line.join(" ");

        if self.tokens {
            let tokens = tokenize(&line, &syntax);
            println!("{}", serde_json::to_string_pretty(&tokens_to_json(&tokens))?);
            return Ok(tokens.iter().all(Result::is_ok));
        }

        let mut manager = CommandManager::with_syntax(syntax);
        DefinitionSpec::load(&self.commands)?.register(&mut manager, &TypeRegistry::default())?;
        info!("loaded {} command(s) from {}", manager.commands().len(), self.commands.display());

        if self.list {
            println!("{}", commands_table(&manager));
            return Ok(true);
        }

        if self.complete {
            let completions = complete(&manager, &line);
            println!("{}", serde_json::to_string_pretty(&completions)?);
            return Ok(true);
        }

        match manager.parse(&line) {
            Ok(containers) => {
                println!("{}", serde_json::to_string_pretty(&containers_to_json(&containers))?);
                Ok(true)
            }
            Err(fail) => {
                eprintln!("{fail}");
                if let Some(input) = fail.input() {
                    eprintln!("\n    {}\n    {}{}", line, " ".repeat(input.start()), "^".red().bold());
                }
                Ok(false)
            }
        }
    }
}

pub fn containers_to_json(containers: &[CommandContainer]) -> serde_json::Value {
    serde_json::Value::Array(containers.iter().map(CommandContainer::to_json).collect())
}

pub fn tokens_to_json(tokens: &[TokenResult]) -> serde_json::Value {
    let tokens = tokens
        .iter()
        .map(|token| match token {
            Ok(input) => serde_json::json!({
                "kind": input.kind().to_string(),
                "value": input.to_input_string(),
                "start": input.start(),
                "end": input.end(),
            }),
            Err(fail) => serde_json::json!({
                "error": fail.to_string(),
                "position": fail.position(),
            }),
        })
        .collect();
    serde_json::Value::Array(tokens)
}

/// One row per command, sub-commands included, in `(order, name)` order.
pub fn commands_table(manager: &CommandManager) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Command").set_alignment(CellAlignment::Left),
            Cell::new("Aliases").set_alignment(CellAlignment::Left),
            Cell::new("Arguments").set_alignment(CellAlignment::Left),
            Cell::new("Description").set_alignment(CellAlignment::Left),
        ]);

    let mut pending: Vec<Arc<Command>> = manager.commands().into_iter().rev().collect();
    while let Some(command) = pending.pop() {
        let arguments: Vec<String> = command
            .arguments()
            .all()
            .iter()
            .map(|a| {
                if a.is_optional() {
                    format!("[{}: {}]", a.name(), a.argument_type().name())
                } else {
                    format!("<{}: {}>", a.name(), a.argument_type().name())
                }
            })
            .collect();
        table.add_row(vec![
            Cell::new(command.full_name()),
            Cell::new(command.aliases().join(", ")),
            Cell::new(arguments.join(" ")),
            Cell::new(command.description()),
        ]);
        pending.extend(command.sub_commands().iter().rev().cloned());
    }
    table
}
