use eyre::{Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::Path;

fn default_long_prefix() -> String {
    "--".to_string()
}

fn default_short_prefix() -> String {
    "-".to_string()
}

fn default_chain() -> String {
    "&".to_string()
}

fn default_escape() -> char {
    '\\'
}

fn default_quotes() -> Vec<char> {
    vec!['"', '\'']
}

fn default_assignment() -> char {
    '='
}

fn default_key_value_separators() -> Vec<char> {
    vec!['=', ':']
}

fn default_element_separator() -> char {
    ','
}

fn default_suggestion_distance() -> usize {
    3
}

#[must_use]
pub fn default_syntax() -> Syntax {
    Syntax {
        long_prefix: default_long_prefix(),
        short_prefix: default_short_prefix(),
        chain: default_chain(),
        escape: default_escape(),
        quotes: default_quotes(),
        assignment: default_assignment(),
        key_value_separators: default_key_value_separators(),
        element_separator: default_element_separator(),
        case_insensitive: false,
        suggestion_distance: default_suggestion_distance(),
    }
}

/// Lexical conventions of the command language.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Syntax {
    #[serde(default = "default_long_prefix")]
    pub long_prefix: String,

    #[serde(default = "default_short_prefix")]
    pub short_prefix: String,

    /// Bare token that ends the current command, `a & b`.
    #[serde(default = "default_chain")]
    pub chain: String,

    #[serde(default = "default_escape")]
    pub escape: char,

    #[serde(default = "default_quotes")]
    pub quotes: Vec<char>,

    /// Separates name from value in `--name=value`.
    #[serde(default = "default_assignment")]
    pub assignment: char,

    #[serde(default = "default_key_value_separators")]
    pub key_value_separators: Vec<char>,

    #[serde(default = "default_element_separator")]
    pub element_separator: char,

    #[serde(default)]
    pub case_insensitive: bool,

    /// Maximum edit distance for "did you mean" suggestions.
    #[serde(default = "default_suggestion_distance")]
    pub suggestion_distance: usize,
}

impl Default for Syntax {
    fn default() -> Self {
        default_syntax()
    }
}

impl Syntax {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let syntax: Syntax = serde_yaml::from_str(content).map_err(|e| eyre!("syntax config error: {}", e))?;
        syntax.validate()?;
        Ok(syntax)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| eyre!("failed to read syntax config {}: {}", path.display(), e))?;
        Self::from_yaml(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.long_prefix.is_empty() || self.short_prefix.is_empty() {
            return Err(eyre!("argument prefixes must not be empty"));
        }
        if self.long_prefix == self.short_prefix {
            return Err(eyre!("long and short prefixes must differ, both are '{}'", self.long_prefix));
        }
        if self.chain.is_empty() {
            return Err(eyre!("chain token must not be empty"));
        }
        if self.quotes.contains(&self.escape) {
            return Err(eyre!("escape character '{}' cannot also be a quote", self.escape));
        }
        Ok(())
    }

    pub fn is_quote(&self, c: char) -> bool {
        self.quotes.contains(&c)
    }

    pub fn is_key_value_separator(&self, c: char) -> bool {
        self.key_value_separators.contains(&c)
    }

    pub fn names_match(&self, a: &str, b: &str) -> bool {
        if self.case_insensitive {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    }

    /// Raw token text that reads as `--name` or `-n`, quotes excluded.
    pub fn looks_like_argument_name(&self, content: &str) -> bool {
        if let Some(rest) = content.strip_prefix(self.long_prefix.as_str()) {
            if !rest.is_empty() {
                return true;
            }
        }
        content
            .strip_prefix(self.short_prefix.as_str())
            .and_then(|rest| rest.chars().next())
            .is_some_and(char::is_alphabetic)
    }
}
