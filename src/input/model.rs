use std::fmt;
use std::sync::Arc;

/// Location of an [`Input`] inside the command line it was read from.
///
/// Offsets are byte offsets into `source`. A span with `start == end == 0` over an
/// empty source marks a value that was synthesized (defaults, re-spanned values)
/// rather than read from text.
#[derive(Clone, Debug)]
pub struct Span {
    source: Arc<str>,
    start: usize,
    end: usize,
}

impl Span {
    pub fn new(source: Arc<str>, start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {start} past end {end}");
        Self { source, start, end }
    }

    pub fn synthetic() -> Self {
        Self {
            source: Arc::from(""),
            start: 0,
            end: 0,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn shared_source(&self) -> Arc<str> {
        Arc::clone(&self.source)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn is_synthetic(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// The literal text covered by this span, quotes and escapes included.
    pub fn content(&self) -> &str {
        self.source.get(self.start..self.end).unwrap_or("")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputKind {
    Single,
    List,
    Map,
    Empty,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::List => write!(f, "list"),
            Self::Map => write!(f, "map"),
            Self::Empty => write!(f, "empty"),
        }
    }
}

/// A token value produced by the tokenizer.
///
/// Equality is structural and ignores spans: two inputs read from different
/// positions (or synthesized) compare equal when their values do.
#[derive(Clone, Debug)]
pub enum Input {
    /// A scalar token with escapes and quotes already resolved.
    Single { text: String, span: Span },
    /// `[a, b, ...]`
    List { items: Vec<Input>, span: Span },
    /// `{k=v, ...}`, entries kept in source order.
    Map { entries: Vec<(Input, Input)>, span: Span },
    Empty { span: Span },
}

impl Input {
    pub fn single(text: impl Into<String>, span: Span) -> Self {
        Self::Single {
            text: text.into(),
            span,
        }
    }

    /// A scalar that was not read from the command line.
    pub fn synthetic(text: impl Into<String>) -> Self {
        Self::single(text, Span::synthetic())
    }

    pub fn list(items: Vec<Input>, span: Span) -> Self {
        Self::List { items, span }
    }

    pub fn map(entries: Vec<(Input, Input)>, span: Span) -> Self {
        Self::Map { entries, span }
    }

    pub fn empty(span: Span) -> Self {
        Self::Empty { span }
    }

    pub fn kind(&self) -> InputKind {
        match self {
            Self::Single { .. } => InputKind::Single,
            Self::List { .. } => InputKind::List,
            Self::Map { .. } => InputKind::Map,
            Self::Empty { .. } => InputKind::Empty,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            Self::Single { span, .. } | Self::List { span, .. } | Self::Map { span, .. } | Self::Empty { span } => span,
        }
    }

    pub fn start(&self) -> usize {
        self.span().start()
    }

    pub fn end(&self) -> usize {
        self.span().end()
    }

    pub fn source(&self) -> &str {
        self.span().source()
    }

    pub fn content(&self) -> &str {
        self.span().content()
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Single { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&[Input]> {
        match self {
            Self::List { items, .. } => Some(items),
            _ => None,
        }
    }

    pub fn entries(&self) -> Option<&[(Input, Input)]> {
        match self {
            Self::Map { entries, .. } => Some(entries),
            _ => None,
        }
    }

    pub fn is_empty_input(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }

    /// Same value, different location.
    pub fn with_span(self, span: Span) -> Self {
        match self {
            Self::Single { text, .. } => Self::Single { text, span },
            Self::List { items, .. } => Self::List { items, span },
            Self::Map { entries, .. } => Self::Map { entries, span },
            Self::Empty { .. } => Self::Empty { span },
        }
    }

    /// Renders the value back into command-line syntax. Escaping is not applied, so
    /// only values free of separators, brackets and quotes survive a round trip.
    pub fn to_input_string(&self) -> String {
        match self {
            Self::Single { text, .. } => text.clone(),
            Self::List { items, .. } => {
                let parts: Vec<String> = items.iter().map(Input::to_input_string).collect();
                format!("[{}]", parts.join(", "))
            }
            Self::Map { entries, .. } => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}={}", k.to_input_string(), v.to_input_string()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Self::Empty { .. } => String::new(),
        }
    }
}

impl PartialEq for Input {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Single { text: a, .. }, Self::Single { text: b, .. }) => a == b,
            (Self::List { items: a, .. }, Self::List { items: b, .. }) => a == b,
            (Self::Map { entries: a, .. }, Self::Map { entries: b, .. }) => a == b,
            (Self::Empty { .. }, Self::Empty { .. }) => true,
            _ => false,
        }
    }
}

impl Eq for Input {}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_input_string())
    }
}
