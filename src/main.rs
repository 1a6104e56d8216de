use clap::Parser;
use cmdtree::app::CmdtreeCommand;
use env_logger::Target;
use eyre::{Report, Result};
use log::info;
use std::io::IsTerminal;

fn setup_logging() -> Result<(), Report> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "warn"))
        .target(Target::Stderr)
        .try_init()?;
    Ok(())
}

fn main() {
    if let Err(e) = setup_logging() {
        eprintln!("Failed to setup logging: {e}");
        std::process::exit(1);
    }
    if !std::io::stderr().is_terminal() {
        colored::control::set_override(false);
    }
    info!("Starting cmdtree");

    let command = CmdtreeCommand::parse();
    match command.execute() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
