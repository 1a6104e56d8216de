use std::fmt;
use std::sync::Arc;

use crate::input::{Input, InputKind, Span};
use crate::types::validation::{Validation, ValueOrValidation};
use crate::types::value::Value;

pub type ScalarFn = Arc<dyn Fn(&str) -> Option<Value> + Send + Sync>;
pub type ConvertFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;
pub type PredicateFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

const TRUE_WORDS: &[&str] = &["true", "yes", "y", "valid"];
const FALSE_WORDS: &[&str] = &["false", "no", "n", "invalid"];

pub fn parse_bool(text: &str) -> Option<bool> {
    let lower = text.to_lowercase();
    if TRUE_WORDS.contains(&lower.as_str()) {
        Some(true)
    } else if FALSE_WORDS.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Scalar interpretations of a single token.
#[derive(Clone)]
pub enum Scalar {
    String,
    Int,
    Float,
    Bool,
    Char,
    /// One of a fixed set of literals.
    Choice(Vec<String>),
    /// Caller-supplied conversion with an optional list of suggestions.
    Parsed { parser: ScalarFn, suggestions: Vec<String> },
}

impl Scalar {
    fn parse(&self, text: &str) -> Option<Value> {
        match self {
            Self::String => Some(Value::Str(text.to_string())),
            Self::Int => text.parse::<i64>().ok().map(Value::Int),
            Self::Float => text.parse::<f64>().ok().filter(|f| f.is_finite()).map(Value::Float),
            Self::Bool => parse_bool(text).map(Value::Bool),
            Self::Char => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Value::Char(c)),
                    _ => None,
                }
            }
            Self::Choice(choices) => choices.iter().find(|c| *c == text).map(|c| Value::Str(c.clone())),
            Self::Parsed { parser, .. } => parser(text),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Bool => vec!["true".to_string(), "false".to_string()],
            Self::Choice(choices) => choices.clone(),
            Self::Parsed { suggestions, .. } => suggestions.clone(),
            _ => vec![],
        }
    }
}

/// One fixed entry of a complex map.
#[derive(Clone, Debug)]
pub struct EntryType {
    pub key: ArgumentType,
    pub value: ArgumentType,
    pub optional: bool,
}

impl EntryType {
    pub fn required(key: ArgumentType, value: ArgumentType) -> Self {
        Self {
            key,
            value,
            optional: false,
        }
    }

    pub fn optional(key: ArgumentType, value: ArgumentType) -> Self {
        Self {
            key,
            value,
            optional: true,
        }
    }
}

#[derive(Clone)]
pub enum TypeKind {
    Single(Scalar),
    List(Box<ArgumentType>),
    /// Fixed arity, one type per position.
    ExactList(Vec<ArgumentType>),
    Map {
        key: Box<ArgumentType>,
        value: Box<ArgumentType>,
    },
    ComplexMap(Vec<EntryType>),
    Pair {
        key: Box<ArgumentType>,
        value: Box<ArgumentType>,
    },
    Custom {
        inner: Box<ArgumentType>,
        convert: ConvertFn,
    },
    Any,
}

#[derive(Clone)]
struct Filter {
    name: String,
    predicate: PredicateFn,
}

/// How an [`Input`] becomes a [`Value`]: accepted input kind, parser, default value
/// and completion candidates.
#[derive(Clone)]
pub struct ArgumentType {
    name: String,
    default: Option<Value>,
    kind: TypeKind,
    filters: Vec<Filter>,
}

impl fmt::Debug for ArgumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentType")
            .field("name", &self.name)
            .field("default", &self.default)
            .field("filters", &self.filters.iter().map(|f| f.name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

pub fn string() -> ArgumentType {
    ArgumentType::new("string", TypeKind::Single(Scalar::String))
}

pub fn int() -> ArgumentType {
    ArgumentType::new("int", TypeKind::Single(Scalar::Int))
}

pub fn float() -> ArgumentType {
    ArgumentType::new("float", TypeKind::Single(Scalar::Float))
}

pub fn boolean() -> ArgumentType {
    ArgumentType::new("bool", TypeKind::Single(Scalar::Bool))
}

pub fn character() -> ArgumentType {
    ArgumentType::new("char", TypeKind::Single(Scalar::Char))
}

pub fn choice<S: AsRef<str>>(choices: &[S]) -> ArgumentType {
    let choices: Vec<String> = choices.iter().map(|c| c.as_ref().to_string()).collect();
    let name = format!("choice({})", choices.join("|"));
    ArgumentType::new(name, TypeKind::Single(Scalar::Choice(choices)))
}

pub fn scalar<F>(name: impl Into<String>, parser: F) -> ArgumentType
where
    F: Fn(&str) -> Option<Value> + Send + Sync + 'static,
{
    ArgumentType::new(
        name,
        TypeKind::Single(Scalar::Parsed {
            parser: Arc::new(parser),
            suggestions: vec![],
        }),
    )
}

pub fn list(element: ArgumentType) -> ArgumentType {
    ArgumentType::new(format!("list<{}>", element.name), TypeKind::List(Box::new(element)))
}

pub fn exact_list(elements: Vec<ArgumentType>) -> ArgumentType {
    let names: Vec<&str> = elements.iter().map(|e| e.name.as_str()).collect();
    ArgumentType::new(format!("tuple<{}>", names.join(",")), TypeKind::ExactList(elements))
}

pub fn map(key: ArgumentType, value: ArgumentType) -> ArgumentType {
    ArgumentType::new(
        format!("map<{},{}>", key.name, value.name),
        TypeKind::Map {
            key: Box::new(key),
            value: Box::new(value),
        },
    )
}

pub fn complex_map(entries: Vec<EntryType>) -> ArgumentType {
    let names: Vec<String> = entries
        .iter()
        .map(|e| format!("{}{}={}", e.key.name, if e.optional { "?" } else { "" }, e.value.name))
        .collect();
    ArgumentType::new(format!("{{{}}}", names.join(",")), TypeKind::ComplexMap(entries))
}

pub fn pair(key: ArgumentType, value: ArgumentType) -> ArgumentType {
    ArgumentType::new(
        format!("pair<{},{}>", key.name, value.name),
        TypeKind::Pair {
            key: Box::new(key),
            value: Box::new(value),
        },
    )
}

pub fn custom<F>(name: impl Into<String>, inner: ArgumentType, convert: F) -> ArgumentType
where
    F: Fn(Value) -> Value + Send + Sync + 'static,
{
    ArgumentType::new(
        name,
        TypeKind::Custom {
            inner: Box::new(inner),
            convert: Arc::new(convert),
        },
    )
}

pub fn any() -> ArgumentType {
    ArgumentType::new("any", TypeKind::Any)
}

fn suggest(candidates: Vec<String>, input: &Input) -> Vec<Input> {
    let prefix = input.text().unwrap_or("");
    candidates
        .into_iter()
        .filter(|c| c.starts_with(prefix))
        .map(Input::synthetic)
        .collect()
}

fn synthetic_list(items: Vec<Input>) -> Input {
    Input::list(items, Span::synthetic())
}

fn synthetic_map(entries: Vec<(Input, Input)>) -> Input {
    Input::map(entries, Span::synthetic())
}

fn empty() -> Input {
    Input::empty(Span::synthetic())
}

impl ArgumentType {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            default: None,
            kind,
            filters: vec![],
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds completion candidates to a caller-supplied scalar.
    #[must_use]
    pub fn with_suggestions<S: AsRef<str>>(mut self, values: &[S]) -> Self {
        if let TypeKind::Single(Scalar::Parsed { suggestions, .. }) = &mut self.kind {
            suggestions.extend(values.iter().map(|v| v.as_ref().to_string()));
        }
        self
    }

    /// Rejects parsed values for which `predicate` is false.
    #[must_use]
    pub fn filter<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Filter {
            name: name.into(),
            predicate: Arc::new(predicate),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// The input kind this type reads; `None` when any kind is accepted.
    pub fn input_kind(&self) -> Option<InputKind> {
        match &self.kind {
            TypeKind::Single(_) => Some(InputKind::Single),
            TypeKind::List(_) | TypeKind::ExactList(_) => Some(InputKind::List),
            TypeKind::Map { .. } | TypeKind::ComplexMap(_) | TypeKind::Pair { .. } => Some(InputKind::Map),
            TypeKind::Custom { inner, .. } => inner.input_kind(),
            TypeKind::Any => None,
        }
    }

    pub fn accepts(&self, input: &Input) -> bool {
        match &self.kind {
            TypeKind::Pair { .. } => matches!(input.kind(), InputKind::Map | InputKind::List),
            TypeKind::Custom { inner, .. } => inner.accepts(input),
            TypeKind::Any => true,
            _ => self.input_kind() == Some(input.kind()),
        }
    }

    pub fn is_boolean(&self) -> bool {
        match &self.kind {
            TypeKind::Single(Scalar::Bool) => true,
            TypeKind::Custom { inner, .. } => inner.is_boolean(),
            _ => false,
        }
    }

    /// Whether values are assembled from several tokens (list and map shapes).
    pub fn is_multiple(&self) -> bool {
        matches!(self.input_kind(), Some(InputKind::List) | Some(InputKind::Map))
    }

    /// Whether a bare token at `index` has a type. Map shapes alternate key (even
    /// index) and value (odd index).
    pub fn has_type(&self, index: usize) -> bool {
        self.type_at(index).is_some()
    }

    pub fn type_at(&self, index: usize) -> Option<&ArgumentType> {
        match &self.kind {
            TypeKind::List(element) => Some(element),
            TypeKind::ExactList(elements) => elements.get(index),
            TypeKind::Map { key, value } => Some(if index % 2 == 0 { key } else { value }),
            TypeKind::ComplexMap(entries) => entries
                .get(index / 2)
                .map(|e| if index % 2 == 0 { &e.key } else { &e.value }),
            TypeKind::Pair { key, value } => match index {
                0 => Some(key),
                1 => Some(value),
                _ => None,
            },
            TypeKind::Custom { inner, .. } => inner.type_at(index),
            TypeKind::Single(_) | TypeKind::Any => None,
        }
    }

    pub fn parse(&self, input: &Input) -> ValueOrValidation {
        if !self.accepts(input) {
            return Err(Validation::invalid(input.clone(), self.clone(), "input kind"));
        }
        let value = self.parse_kind(input)?;
        for filter in &self.filters {
            if !(filter.predicate)(&value) {
                return Err(Validation::invalid(input.clone(), self.clone(), filter.name.clone()));
            }
        }
        Ok(value)
    }

    /// Parses a literal as if it had been typed, for defaults declared as text.
    pub fn parse_text(&self, text: &str) -> ValueOrValidation {
        self.parse(&Input::synthetic(text))
    }

    fn parse_kind(&self, input: &Input) -> ValueOrValidation {
        match (&self.kind, input) {
            (TypeKind::Single(scalar), Input::Single { text, .. }) => scalar
                .parse(text)
                .ok_or_else(|| Validation::invalid(input.clone(), self.clone(), self.name.clone())),
            (TypeKind::List(element), Input::List { items, .. }) => {
                collect_values(items.iter().map(|item| element.parse(item))).map(Value::List)
            }
            (TypeKind::ExactList(elements), Input::List { items, .. }) => self.parse_exact_list(elements, input, items),
            (TypeKind::Map { key, value }, Input::Map { entries, .. }) => {
                let mut validation = Validation::new();
                let mut values = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    match (key.parse(k), value.parse(v)) {
                        (Ok(k), Ok(v)) => values.push((k, v)),
                        (k, v) => {
                            if let Err(e) = k {
                                validation.extend(e);
                            }
                            if let Err(e) = v {
                                validation.extend(e);
                            }
                        }
                    }
                }
                if validation.is_valid() {
                    Ok(Value::Map(values))
                } else {
                    Err(validation)
                }
            }
            (TypeKind::ComplexMap(types), Input::Map { entries, .. }) => self.parse_complex_map(types, input, entries),
            (TypeKind::Pair { key, value }, Input::Map { entries, .. }) if entries.len() == 1 => {
                let (k, v) = &entries[0];
                parse_pair(key, value, k, v)
            }
            (TypeKind::Pair { key, value }, Input::List { items, .. }) if items.len() == 2 => {
                parse_pair(key, value, &items[0], &items[1])
            }
            (TypeKind::Pair { .. }, _) => Err(Validation::invalid(input.clone(), self.clone(), "pair arity")),
            (TypeKind::Custom { inner, convert }, _) => inner.parse(input).map(|v| convert(v)),
            (TypeKind::Any, _) => Ok(Value::from_input(input)),
            _ => Err(Validation::invalid(input.clone(), self.clone(), "input kind")),
        }
    }

    fn parse_exact_list(&self, elements: &[ArgumentType], input: &Input, items: &[Input]) -> ValueOrValidation {
        let mut validation = Validation::new();
        let mut values = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match elements.get(i) {
                Some(element) => match element.parse(item) {
                    Ok(v) => values.push(v),
                    Err(e) => validation.extend(e),
                },
                None => validation.extend(Validation::invalid(item.clone(), self.clone(), "exact list arity")),
            }
        }
        if items.len() < elements.len() {
            validation.extend(Validation::invalid(input.clone(), self.clone(), "exact list arity"));
        }
        if validation.is_valid() {
            Ok(Value::List(values))
        } else {
            Err(validation)
        }
    }

    fn parse_complex_map(&self, types: &[EntryType], input: &Input, entries: &[(Input, Input)]) -> ValueOrValidation {
        let mut validation = Validation::new();
        let mut used = vec![false; types.len()];
        let mut values = Vec::with_capacity(entries.len());

        for (k, v) in entries {
            let slot = types
                .iter()
                .enumerate()
                .find(|(i, t)| !used[*i] && t.key.parse(k).is_ok())
                .map(|(i, _)| i);
            match slot {
                Some(i) => {
                    used[i] = true;
                    match (types[i].key.parse(k), types[i].value.parse(v)) {
                        (Ok(key), Ok(value)) => values.push((key, value)),
                        (key, value) => {
                            if let Err(e) = key {
                                validation.extend(e);
                            }
                            if let Err(e) = value {
                                validation.extend(e);
                            }
                        }
                    }
                }
                None => validation.extend(Validation::invalid(k.clone(), self.clone(), "complex map key")),
            }
        }

        for (i, entry) in types.iter().enumerate() {
            if !used[i] && !entry.optional {
                validation.extend(Validation::invalid(
                    input.clone(),
                    self.clone(),
                    format!("missing entry {}", entry.key.name),
                ));
            }
        }

        if validation.is_valid() {
            Ok(Value::Map(values))
        } else {
            Err(validation)
        }
    }

    /// Completion candidates for a (possibly partial or invalid) input.
    ///
    /// For composite types the last position is completed and the earlier
    /// positions are kept as typed.
    pub fn possibilities(&self, input: &Input) -> Vec<Input> {
        match &self.kind {
            TypeKind::Single(scalar) => match input {
                Input::Single { .. } | Input::Empty { .. } => suggest(scalar.suggestions(), input),
                _ => vec![],
            },
            TypeKind::List(element) => complete_list(input, |_, last| element.possibilities(last)),
            TypeKind::ExactList(elements) => complete_list(input, |index, last| {
                elements.get(index).map(|e| e.possibilities(last)).unwrap_or_default()
            }),
            TypeKind::Map { key, value } => complete_map(input, |_, k, v| match v {
                Some(v) => value.possibilities(v),
                None => key.possibilities(k),
            }),
            TypeKind::ComplexMap(types) => complete_map(input, |index, k, v| match v {
                Some(v) => types
                    .iter()
                    .find(|t| t.key.parse(k).is_ok())
                    .map(|t| t.value.possibilities(v))
                    .unwrap_or_default(),
                None => types.get(index).map(|t| t.key.possibilities(k)).unwrap_or_default(),
            }),
            TypeKind::Pair { key, value } => match input {
                Input::List { items, .. } if items.len() == 2 => complete_list(input, |_, last| value.possibilities(last)),
                Input::List { .. } => complete_list(input, |_, last| key.possibilities(last)),
                _ => complete_map(input, |_, k, v| match v {
                    Some(v) => value.possibilities(v),
                    None => key.possibilities(k),
                }),
            },
            TypeKind::Custom { inner, .. } => inner.possibilities(input),
            TypeKind::Any => vec![],
        }
    }
}

fn collect_values<I>(results: I) -> Result<Vec<Value>, Validation>
where
    I: Iterator<Item = ValueOrValidation>,
{
    let mut validation = Validation::new();
    let mut values = Vec::new();
    for result in results {
        match result {
            Ok(v) => values.push(v),
            Err(e) => validation.extend(e),
        }
    }
    if validation.is_valid() { Ok(values) } else { Err(validation) }
}

fn parse_pair(key: &ArgumentType, value: &ArgumentType, k: &Input, v: &Input) -> ValueOrValidation {
    match (key.parse(k), value.parse(v)) {
        (Ok(k), Ok(v)) => Ok(Value::pair(k, v)),
        (Err(a), Err(b)) => Err(a.concat(b)),
        (Err(e), _) | (_, Err(e)) => Err(e),
    }
}

/// Completes the last list element; `complete` gets the element index and the
/// partial element.
fn complete_list<F>(input: &Input, complete: F) -> Vec<Input>
where
    F: Fn(usize, &Input) -> Vec<Input>,
{
    match input {
        Input::List { items, .. } if !items.is_empty() => {
            let index = items.len() - 1;
            let head = &items[..index];
            complete(index, &items[index])
                .into_iter()
                .map(|candidate| {
                    let mut next = head.to_vec();
                    next.push(candidate);
                    synthetic_list(next)
                })
                .collect()
        }
        Input::Single { .. } => complete(0, input).into_iter().map(|c| synthetic_list(vec![c])).collect(),
        _ => complete(0, &empty()).into_iter().map(|c| synthetic_list(vec![c])).collect(),
    }
}

/// Completes the last map entry: its value when the key is present and the value
/// is being typed, otherwise its key.
fn complete_map<F>(input: &Input, complete: F) -> Vec<Input>
where
    F: Fn(usize, &Input, Option<&Input>) -> Vec<Input>,
{
    match input {
        Input::Map { entries, .. } if !entries.is_empty() => {
            let index = entries.len() - 1;
            let head = &entries[..index];
            let (k, v) = &entries[index];
            if k.is_empty_input() {
                return complete(index, k, None)
                    .into_iter()
                    .map(|candidate| {
                        let mut next = head.to_vec();
                        next.push((candidate, empty()));
                        synthetic_map(next)
                    })
                    .collect();
            }
            complete(index, k, Some(v))
                .into_iter()
                .map(|candidate| {
                    let mut next = head.to_vec();
                    next.push((k.clone(), candidate));
                    synthetic_map(next)
                })
                .collect()
        }
        _ => complete(0, &empty(), None)
            .into_iter()
            .map(|candidate| synthetic_map(vec![(candidate, empty())]))
            .collect(),
    }
}
