pub mod definition;
pub mod syntax;

pub use definition::{ArgumentSpec, CommandSpec, DefinitionSpec};
pub use syntax::{Syntax, default_syntax};
