pub mod cursor;
pub mod error;
pub mod model;
pub mod tokenizer;

pub use error::InputParseFail;
pub use model::{Input, InputKind, Span};
pub use tokenizer::{TokenResult, Tokenizer, tokenize};
