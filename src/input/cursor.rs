use std::sync::Arc;

/// A rewindable character cursor over (a byte range of) a command line.
///
/// Positions handed out by [`CharCursor::pos`] are indices into the decoded
/// characters and can be given back to [`CharCursor::restore`]; byte offsets for
/// spans come from [`CharCursor::offset`].
#[derive(Debug, Clone)]
pub struct CharCursor {
    source: Arc<str>,
    chars: Vec<(usize, char)>,
    index: usize,
    end: usize,
}

impl CharCursor {
    pub fn new(source: Arc<str>) -> Self {
        let end = source.len();
        Self::bounded(source, 0, end)
    }

    /// Cursor over `source[start..end]`; offsets stay relative to the whole source.
    pub fn bounded(source: Arc<str>, start: usize, end: usize) -> Self {
        let end = end.min(source.len());
        let chars = source
            .char_indices()
            .filter(|(offset, _)| *offset >= start && *offset < end)
            .collect();
        Self {
            source,
            chars,
            index: 0,
            end,
        }
    }

    pub fn source(&self) -> &Arc<str> {
        &self.source
    }

    pub fn pos(&self) -> usize {
        self.index
    }

    pub fn restore(&mut self, pos: usize) {
        self.index = pos.min(self.chars.len());
    }

    pub fn has_next(&self) -> bool {
        self.index < self.chars.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.index).map(|(_, c)| *c)
    }

    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.chars.get(self.index + n).map(|(_, c)| *c)
    }

    pub fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += 1;
        Some(c)
    }

    /// Byte offset of the next unread character, or the end of the range.
    pub fn offset(&self) -> usize {
        self.chars.get(self.index).map_or(self.end, |(offset, _)| *offset)
    }

    pub fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.index += 1;
        }
    }
}
