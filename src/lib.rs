pub mod app;
pub mod cfg;
pub mod command;
pub mod completion;
pub mod input;
pub mod parser;
pub mod types;

pub use cfg::{DefinitionSpec, Syntax};
pub use command::{Argument, ArgumentContainer, Arguments, Command, CommandBuilder, CommandContainer, CommandManager};
pub use completion::{Completion, CompletionKind, complete};
pub use input::{Input, InputKind, InputParseFail, tokenize};
pub use parser::{CommandParser, ParseFail, ParseState};
pub use types::{ArgumentType, TypeRegistry, Validation, Value};
