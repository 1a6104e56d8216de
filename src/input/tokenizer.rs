use log::trace;
use std::sync::Arc;

use crate::cfg::syntax::Syntax;
use crate::input::cursor::CharCursor;
use crate::input::error::InputParseFail;
use crate::input::model::{Input, Span};

/// Where a scalar is being read; decides which characters end it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Context {
    Top,
    ListElement,
    MapKey,
    MapValue,
}

pub type TokenResult = Result<Input, InputParseFail>;

/// Turns a command line into [`Input`] values, one logical token at a time.
pub struct Tokenizer<'a> {
    cursor: CharCursor,
    syntax: &'a Syntax,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &str, syntax: &'a Syntax) -> Self {
        Self::from_shared(Arc::from(source), syntax)
    }

    pub fn from_shared(source: Arc<str>, syntax: &'a Syntax) -> Self {
        Self {
            cursor: CharCursor::new(source),
            syntax,
        }
    }

    /// Tokenizes only `source[start..end]`, keeping offsets relative to `source`.
    /// Used to re-read the right-hand side of `--name=value`.
    pub fn bounded(source: Arc<str>, start: usize, end: usize, syntax: &'a Syntax) -> Self {
        Self {
            cursor: CharCursor::bounded(source, start, end),
            syntax,
        }
    }

    pub fn has_more(&mut self) -> bool {
        let pos = self.cursor.pos();
        self.cursor.skip_whitespace();
        let more = self.cursor.has_next();
        self.cursor.restore(pos);
        more
    }

    /// Reads every remaining token. Stops after the first failure, which is kept as
    /// the last entry.
    pub fn tokenize_all(mut self) -> Vec<TokenResult> {
        let mut tokens = Vec::new();
        while self.has_more() {
            let token = self.next_input();
            let failed = token.is_err();
            tokens.push(token);
            if failed {
                break;
            }
        }
        trace!("tokenized {} tokens from '{}'", tokens.len(), self.cursor.source());
        tokens
    }

    pub fn next_input(&mut self) -> TokenResult {
        self.cursor.skip_whitespace();
        if !self.cursor.has_next() {
            return Err(InputParseFail::NoMoreElements {
                root: self.placeholder(),
                position: self.cursor.offset(),
            });
        }
        let input = self.element(Context::Top)?;
        trace!("token {:?} at {}..{}", input.to_input_string(), input.start(), input.end());
        Ok(input)
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(Arc::clone(self.cursor.source()), start, self.cursor.offset())
    }

    fn placeholder(&self) -> Input {
        let offset = self.cursor.offset();
        Input::empty(Span::new(Arc::clone(self.cursor.source()), offset, offset))
    }

    fn element(&mut self, context: Context) -> TokenResult {
        match self.cursor.peek() {
            Some('[') => self.list(),
            Some('{') => self.map(),
            _ => self.scalar(context),
        }
    }

    fn ends_scalar(&self, c: char, context: Context) -> bool {
        if c.is_whitespace() {
            return true;
        }
        match context {
            Context::Top => false,
            Context::ListElement => c == self.syntax.element_separator || c == ']',
            Context::MapKey => c == self.syntax.element_separator || c == '}' || self.syntax.is_key_value_separator(c),
            Context::MapValue => c == self.syntax.element_separator || c == '}',
        }
    }

    fn scalar(&mut self, context: Context) -> TokenResult {
        let start = self.cursor.offset();
        let mut text = String::new();
        let mut open_quote: Option<char> = None;

        while let Some(c) = self.cursor.peek() {
            if open_quote.is_none() && self.ends_scalar(c, context) {
                break;
            }
            self.cursor.next();
            if c == self.syntax.escape {
                // A trailing escape has nothing to protect and is kept as written.
                text.push(self.cursor.next().unwrap_or(c));
                continue;
            }
            if self.syntax.is_quote(c) {
                match open_quote {
                    None => {
                        open_quote = Some(c);
                        continue;
                    }
                    Some(q) if q == c => {
                        open_quote = None;
                        continue;
                    }
                    Some(_) => {}
                }
            }
            text.push(c);
        }

        let span = self.span_from(start);
        if let Some(q) = open_quote {
            return Err(InputParseFail::InputMalformation {
                reason: format!("unterminated quote {q}"),
                root: Input::single(text, span),
                position: self.cursor.offset(),
            });
        }
        Ok(Input::single(text, span))
    }

    fn list(&mut self) -> TokenResult {
        let start = self.cursor.offset();
        self.cursor.next();
        let mut items: Vec<Input> = Vec::new();
        let separator = self.syntax.element_separator;

        self.cursor.skip_whitespace();
        if self.cursor.peek() == Some(']') {
            self.cursor.next();
            return Ok(Input::list(items, self.span_from(start)));
        }

        loop {
            self.cursor.skip_whitespace();
            match self.cursor.peek() {
                None if items.is_empty() => {
                    return Err(InputParseFail::TokenOrElementExpected {
                        expected: vec!["]".to_string()],
                        found: None,
                        root: Input::list(items, self.span_from(start)),
                        position: self.cursor.offset(),
                    });
                }
                None | Some(']') => return Err(self.dangling_list(items, start)),
                Some(c) if c == separator => return Err(self.dangling_list(items, start)),
                _ => {}
            }

            items.push(self.element(Context::ListElement)?);

            self.cursor.skip_whitespace();
            match self.cursor.peek() {
                Some(c) if c == separator => {
                    self.cursor.next();
                }
                Some(']') => {
                    self.cursor.next();
                    return Ok(Input::list(items, self.span_from(start)));
                }
                found => {
                    return Err(InputParseFail::TokenOrElementExpected {
                        expected: vec![separator.to_string(), "]".to_string()],
                        found,
                        root: Input::list(items, self.span_from(start)),
                        position: self.cursor.offset(),
                    });
                }
            }
        }
    }

    fn dangling_list(&self, mut items: Vec<Input>, start: usize) -> InputParseFail {
        items.push(self.placeholder());
        InputParseFail::NextElementNotFound {
            root: Input::list(items, self.span_from(start)),
            position: self.cursor.offset(),
        }
    }

    fn map(&mut self) -> TokenResult {
        let start = self.cursor.offset();
        self.cursor.next();
        let mut entries: Vec<(Input, Input)> = Vec::new();
        let separator = self.syntax.element_separator;

        self.cursor.skip_whitespace();
        if self.cursor.peek() == Some('}') {
            self.cursor.next();
            return Ok(Input::map(entries, self.span_from(start)));
        }

        loop {
            self.cursor.skip_whitespace();
            match self.cursor.peek() {
                None if entries.is_empty() => {
                    return Err(InputParseFail::TokenOrElementExpected {
                        expected: vec!["}".to_string()],
                        found: None,
                        root: Input::map(entries, self.span_from(start)),
                        position: self.cursor.offset(),
                    });
                }
                None | Some('}') => return Err(self.dangling_map(entries, None, start)),
                Some(c) if c == separator || self.syntax.is_key_value_separator(c) => {
                    return Err(self.dangling_map(entries, None, start));
                }
                _ => {}
            }

            let key = self.element(Context::MapKey)?;

            self.cursor.skip_whitespace();
            match self.cursor.peek() {
                Some(c) if self.syntax.is_key_value_separator(c) => {
                    self.cursor.next();
                }
                found => {
                    let root = self.partial_map(entries, Some(key), start);
                    return Err(InputParseFail::TokenExpected {
                        expected: self.syntax.key_value_separators.iter().map(char::to_string).collect(),
                        found,
                        root,
                        position: self.cursor.offset(),
                    });
                }
            }

            self.cursor.skip_whitespace();
            match self.cursor.peek() {
                None | Some('}') => return Err(self.dangling_map(entries, Some(key), start)),
                Some(c) if c == separator => return Err(self.dangling_map(entries, Some(key), start)),
                _ => {}
            }

            let value = self.element(Context::MapValue)?;
            entries.push((key, value));

            self.cursor.skip_whitespace();
            match self.cursor.peek() {
                Some(c) if c == separator => {
                    self.cursor.next();
                }
                Some('}') => {
                    self.cursor.next();
                    return Ok(Input::map(entries, self.span_from(start)));
                }
                found => {
                    return Err(InputParseFail::TokenOrElementExpected {
                        expected: vec![separator.to_string(), "}".to_string()],
                        found,
                        root: Input::map(entries, self.span_from(start)),
                        position: self.cursor.offset(),
                    });
                }
            }
        }
    }

    /// The map read so far plus a placeholder entry for the unfinished slot.
    fn partial_map(&self, mut entries: Vec<(Input, Input)>, key: Option<Input>, start: usize) -> Input {
        let key = key.unwrap_or_else(|| self.placeholder());
        entries.push((key, self.placeholder()));
        Input::map(entries, self.span_from(start))
    }

    fn dangling_map(&self, entries: Vec<(Input, Input)>, key: Option<Input>, start: usize) -> InputParseFail {
        InputParseFail::NextElementNotFound {
            root: self.partial_map(entries, key, start),
            position: self.cursor.offset(),
        }
    }
}

/// Tokenizes a whole command line with the given syntax.
pub fn tokenize(source: &str, syntax: &Syntax) -> Vec<TokenResult> {
    Tokenizer::new(source, syntax).tokenize_all()
}
