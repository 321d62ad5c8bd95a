/// An ordered queue with a cursor on the entry currently playing.
///
/// Entries before the cursor stay in the queue as history; they are never replayed.
/// The cursor moves only forward and stops at `len()`, at which point the queue is
/// exhausted.
#[derive(Debug, Clone)]
pub struct Queue<T> {
    entries: Vec<T>,
    current_index: usize,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            current_index: 0,
        }
    }
}

impl<T> Queue<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch of entries, keeping their order. Returns the new length.
    pub fn add<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        self.entries.extend(entries);
        self.entries.len()
    }

    /// Append a single entry. Returns the new length.
    pub fn push(&mut self, entry: T) -> usize {
        self.add(std::iter::once(entry))
    }

    /// The entry under the cursor, or `None` once the queue is exhausted
    pub fn current(&self) -> Option<&T> {
        self.entries.get(self.current_index)
    }

    /// Move the cursor forward and return the new current entry.
    ///
    /// Once exhausted the cursor stays at `len()`.
    pub fn advance(&mut self) -> Option<&T> {
        if self.current_index < self.entries.len() {
            self.current_index += 1;
        }
        self.current()
    }

    /// Look at the entry after the current one without moving the cursor
    pub fn peek_next(&self) -> Option<&T> {
        self.entries.get(self.current_index + 1)
    }

    /// Total number of entries ever added, including already played ones
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_index >= self.entries.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Entries already advanced past, oldest first
    pub fn played(&self) -> &[T] {
        &self.entries[..self.current_index]
    }

    /// Entries after the current one, in play order
    pub fn upcoming(&self) -> &[T] {
        let start = (self.current_index + 1).min(self.entries.len());
        &self.entries[start..]
    }

    /// Drop every entry and rewind the cursor
    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_index = 0;
    }
}
