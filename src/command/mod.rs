pub mod argument;
pub mod container;
pub mod manager;
pub mod tree;

pub use argument::{Argument, ArgumentHandler, Arguments, StaticArguments};
pub use container::{ArgumentContainer, CommandContainer};
pub use manager::CommandManager;
pub use tree::{Command, CommandBuilder, CommandHandler};
