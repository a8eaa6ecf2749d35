/// Bidirectional cursor over a single-pass source.
///
/// Elements are pulled from the source at most once and kept in a buffer, so
/// moving backwards (and forwards again over already seen elements) never
/// touches the source.
#[derive(Debug)]
pub struct SequenceCursor<T, I> {
    source: Option<I>,
    buffer: Vec<T>,
    index: usize,
}

impl<T: Clone, I: Iterator<Item = T>> SequenceCursor<T, I> {
    pub fn new(source: I) -> Self {
        Self {
            source: Some(source),
            buffer: Vec::new(),
            index: 0,
        }
    }

    fn pull(&mut self) -> bool {
        match self.source.as_mut().and_then(Iterator::next) {
            Some(item) => {
                self.buffer.push(item);
                true
            }
            None => {
                self.source = None;
                false
            }
        }
    }

    pub fn has_next(&mut self) -> bool {
        self.index < self.buffer.len() || self.pull()
    }

    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    /// Steps back and returns the element stepped over.
    pub fn previous(&mut self) -> Option<T> {
        self.index = self.index.checked_sub(1)?;
        self.buffer.get(self.index).cloned()
    }

    /// The element most recently handed out by `next`, without moving.
    pub fn peek_previous(&self) -> Option<&T> {
        self.index.checked_sub(1).and_then(|i| self.buffer.get(i))
    }

    /// Moves back to the start; returns the number of steps taken.
    pub fn rewind(&mut self) -> usize {
        std::mem::take(&mut self.index)
    }

    /// Moves forward up to `n` elements; returns the number actually moved.
    pub fn forward(&mut self, n: usize) -> usize {
        let mut moved = 0;
        while moved < n && self.next().is_some() {
            moved += 1;
        }
        moved
    }

    /// Number of elements before the cursor.
    pub fn position(&self) -> usize {
        self.index
    }

    /// Independent cursor at the same position. Drains the source first.
    pub fn fork(&mut self) -> Self {
        while self.pull() {}
        Self {
            source: None,
            buffer: self.buffer.clone(),
            index: self.index,
        }
    }
}

impl<T: Clone, I: Iterator<Item = T>> Iterator for SequenceCursor<T, I> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if !self.has_next() {
            return None;
        }
        let item = self.buffer.get(self.index).cloned();
        self.index += 1;
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Source that counts how often it is pulled.
    fn counted<'a>(items: &'a [u32], pulls: &'a Cell<usize>) -> impl Iterator<Item = u32> + 'a {
        items.iter().copied().inspect(move |_| pulls.set(pulls.get() + 1))
    }

    #[test]
    fn previous_replays_without_pulling() {
        let pulls = Cell::new(0);
        let mut cursor = SequenceCursor::new(counted(&[1, 2, 3], &pulls));

        assert_eq!(cursor.next(), Some(1));
        assert_eq!(cursor.next(), Some(2));
        assert_eq!(pulls.get(), 2);

        assert_eq!(cursor.previous(), Some(2));
        assert_eq!(cursor.previous(), Some(1));
        assert_eq!(cursor.previous(), None);
        assert!(!cursor.has_previous());
        assert_eq!(pulls.get(), 2);

        assert_eq!(cursor.next(), Some(1));
        assert_eq!(cursor.next(), Some(2));
        assert_eq!(pulls.get(), 2);
        assert_eq!(cursor.next(), Some(3));
        assert_eq!(pulls.get(), 3);
        assert!(!cursor.has_next());
    }

    #[test]
    fn rewind_then_replay_reproduces_sequence() {
        let mut cursor = SequenceCursor::new(vec!['a', 'b', 'c'].into_iter());
        cursor.forward(2);
        assert_eq!(cursor.rewind(), 2);
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.collect::<String>(), "abc");
    }

    #[test]
    fn forward_reports_steps_taken() {
        let mut cursor = SequenceCursor::new(1..=3);
        assert_eq!(cursor.forward(2), 2);
        assert_eq!(cursor.peek_previous(), Some(&2));
        assert_eq!(cursor.forward(5), 1);
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn fork_is_independent() {
        let mut cursor = SequenceCursor::new(1..=4);
        cursor.next();
        let mut fork = cursor.fork();

        assert_eq!(fork.position(), 1);
        assert_eq!(fork.next(), Some(2));
        assert_eq!(fork.next(), Some(3));

        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.next(), Some(2));
        assert_eq!(fork.previous(), Some(3));
    }
}
