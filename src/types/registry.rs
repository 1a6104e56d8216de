use eyre::{Result, eyre};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::types::argument_type::{self as types, ArgumentType};

static GENERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z_]+)\s*<(.*)>$").expect("generic type pattern is valid"));
static CHOICE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^choice\s*\((.*)\)$").expect("choice pattern is valid"));

/// Resolves argument types by declared name, e.g. `int` or `map<string,list<int>>`.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, ArgumentType>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for ty in [
            types::string(),
            types::int(),
            types::float(),
            types::boolean(),
            types::character(),
            types::any(),
        ] {
            registry.register(ty.name().to_string(), ty);
        }
        registry.register("str", types::string());
        registry.register("integer", types::int());
        registry.register("boolean", types::boolean());
        registry
    }
}

impl TypeRegistry {
    pub fn empty() -> Self {
        Self { types: HashMap::new() }
    }

    pub fn register(&mut self, name: impl Into<String>, argument_type: ArgumentType) {
        self.types.insert(name.into(), argument_type);
    }

    pub fn get(&self, name: &str) -> Option<&ArgumentType> {
        self.types.get(name)
    }

    pub fn resolve(&self, expression: &str) -> Result<ArgumentType> {
        let expression = expression.trim();

        if let Some(ty) = self.types.get(expression) {
            return Ok(ty.clone());
        }

        if let Some(captures) = CHOICE_RE.captures(expression) {
            let choices: Vec<&str> = captures[1].split('|').map(str::trim).filter(|c| !c.is_empty()).collect();
            if choices.is_empty() {
                return Err(eyre!("choice type '{}' has no choices", expression));
            }
            return Ok(types::choice(&choices));
        }

        if let Some(captures) = GENERIC_RE.captures(expression) {
            let params = split_top_level(&captures[2])
                .iter()
                .map(|p| self.resolve(p))
                .collect::<Result<Vec<_>>>()?;
            let arity = params.len();
            let mut params = params.into_iter();
            return match (&captures[1], arity) {
                ("list", 1) => Ok(types::list(next_param(&mut params)?)),
                ("map", 2) => Ok(types::map(next_param(&mut params)?, next_param(&mut params)?)),
                ("pair", 2) => Ok(types::pair(next_param(&mut params)?, next_param(&mut params)?)),
                ("tuple", n) if n > 0 => Ok(types::exact_list(params.collect())),
                (name, n) => Err(eyre!("unknown type '{}' with {} parameter(s) in '{}'", name, n, expression)),
            };
        }

        Err(eyre!("unknown argument type '{}'", expression))
    }
}

fn next_param(params: &mut impl Iterator<Item = ArgumentType>) -> Result<ArgumentType> {
    params.next().ok_or_else(|| eyre!("missing type parameter"))
}

/// Splits `a, map<b,c>, d` on commas that are not nested in angle brackets.
fn split_top_level(params: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in params.chars() {
        match c {
            '<' | '(' => {
                depth += 1;
                current.push(c);
            }
            '>' | ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts.into_iter().map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect()
}
