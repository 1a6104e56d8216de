pub mod fail;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod stated_iterator;

pub use fail::{ParseFail, ParseState};
pub use parser::{CommandParser, suggest_similar_names};
pub use stated_iterator::StatedIterator;
