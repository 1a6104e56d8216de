/// A restorable cursor over an already materialized sequence.
///
/// `pos`/`restore` is the only backtracking mechanism of the parser: save the
/// position, try a branch, restore on failure.
#[derive(Debug, Clone)]
pub struct StatedIterator<T> {
    items: Vec<T>,
    index: usize,
}

impl<T> StatedIterator<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, index: 0 }
    }

    pub fn pos(&self) -> usize {
        self.index
    }

    pub fn restore(&mut self, pos: usize) {
        self.index = pos.min(self.items.len());
    }

    pub fn has_next(&self) -> bool {
        self.index < self.items.len()
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.get(self.index)
    }

    pub fn next(&mut self) -> Option<&T> {
        let item = self.items.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    pub fn previous(&self) -> Option<&T> {
        self.index.checked_sub(1).and_then(|i| self.items.get(i))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore() {
        let mut it = StatedIterator::new(vec!["a", "b", "c"]);
        assert_eq!(it.next(), Some(&"a"));
        let pos = it.pos();
        assert_eq!(it.next(), Some(&"b"));
        assert_eq!(it.next(), Some(&"c"));
        assert!(it.next().is_none());
        it.restore(pos);
        assert_eq!(it.peek(), Some(&"b"));
        assert_eq!(it.previous(), Some(&"a"));
    }

    #[test]
    fn test_restore_clamps() {
        let mut it = StatedIterator::new(vec![1]);
        it.restore(10);
        assert!(!it.has_next());
        assert_eq!(it.pos(), 1);
    }
}
