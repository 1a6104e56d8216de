use colored::Colorize;
use std::fmt;

use crate::input::Input;
use crate::types::argument_type::ArgumentType;
use crate::types::value::Value;

/// One rejected input: what was read, the type that rejected it, and the name of
/// the parser (or filter) inside that type that said no.
#[derive(Clone, Debug)]
pub struct InvalidElement {
    pub input: Input,
    pub argument_type: ArgumentType,
    pub parser: String,
}

impl InvalidElement {
    pub fn new(input: Input, argument_type: ArgumentType, parser: impl Into<String>) -> Self {
        Self {
            input,
            argument_type,
            parser: parser.into(),
        }
    }
}

/// All invalid elements found while parsing one input, in discovery order.
#[derive(Clone, Debug, Default)]
pub struct Validation {
    invalids: Vec<InvalidElement>,
}

pub type ValueOrValidation = Result<Value, Validation>;

impl Validation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalid(input: Input, argument_type: ArgumentType, parser: impl Into<String>) -> Self {
        Self {
            invalids: vec![InvalidElement::new(input, argument_type, parser)],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.invalids.is_empty()
    }

    pub fn invalids(&self) -> &[InvalidElement] {
        &self.invalids
    }

    pub fn len(&self) -> usize {
        self.invalids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invalids.is_empty()
    }

    pub fn push(&mut self, element: InvalidElement) {
        self.invalids.push(element);
    }

    pub fn extend(&mut self, other: Validation) {
        self.invalids.extend(other.invalids);
    }

    #[must_use]
    pub fn concat(mut self, other: Validation) -> Self {
        self.extend(other);
        self
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.invalids.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "  '{}' is not a valid {} (rejected by {})",
                element.input.to_input_string().red(),
                element.argument_type.name().green(),
                element.parser
            )?;
            if !element.input.span().is_synthetic() {
                write!(f, " at {}..{}", element.input.start(), element.input.end())?;
            }
        }
        Ok(())
    }
}
