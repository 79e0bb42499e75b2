//! Play queue management.
//!
//! The queue is replaced wholesale whenever a new song list is played; it
//! is never merged. Navigation wraps around at both ends.

use crate::model::{Song, SongId};

/// The play queue with current position tracking.
///
/// Invariant: `position < items.len()` whenever the queue is non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Queue {
    /// All songs in the queue
    items: Vec<Song>,
    /// Index of the current song (meaningless when empty)
    position: usize,
}

impl Queue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if queue is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get queue length.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Replace the whole queue and point at `position`.
    ///
    /// Out-of-range positions fall back to the first song.
    pub fn replace(&mut self, items: Vec<Song>, position: usize) {
        self.position = if position < items.len() { position } else { 0 };
        self.items = items;
    }

    /// Clear the queue.
    pub fn clear(&mut self) {
        self.items.clear();
        self.position = 0;
    }

    /// Get all songs in the queue.
    pub fn items(&self) -> &[Song] {
        &self.items
    }

    /// Get current position.
    pub fn current_index(&self) -> Option<usize> {
        (!self.items.is_empty()).then_some(self.position)
    }

    /// Get current song.
    pub fn current(&self) -> Option<&Song> {
        self.items.get(self.position)
    }

    /// Index of the first song with `id`.
    pub fn position_of(&self, id: &SongId) -> Option<usize> {
        self.items.iter().position(|s| &s.id == id)
    }

    /// Make `index` current. Returns false if it is out of range.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if index < self.items.len() {
            self.position = index;
            true
        } else {
            false
        }
    }

    /// Advance to the next song, wrapping to the first, and return it.
    pub fn skip_forward(&mut self) -> Option<&Song> {
        if self.items.is_empty() {
            return None;
        }
        self.position = (self.position + 1) % self.items.len();
        self.current()
    }

    /// Go to the previous song, wrapping to the last, and return it.
    pub fn previous(&mut self) -> Option<&Song> {
        if self.items.is_empty() {
            return None;
        }
        let len = self.items.len();
        self.position = (self.position + len - 1) % len;
        self.current()
    }

    /// Apply `f` to every song with `id`. Returns how many were touched.
    pub fn update_where(&mut self, id: &SongId, mut f: impl FnMut(&mut Song)) -> usize {
        let mut touched = 0;
        for song in self.items.iter_mut().filter(|s| &s.id == id) {
            f(song);
            touched += 1;
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::song_with_id;

    fn abc() -> Queue {
        let mut queue = Queue::new();
        queue.replace(vec![song_with_id("a"), song_with_id("b"), song_with_id("c")], 0);
        queue
    }

    fn current_id(queue: &Queue) -> &str {
        queue.current().map(|s| s.id.as_str()).unwrap_or("")
    }

    #[test]
    fn test_empty_queue() {
        let mut queue = Queue::new();
        assert!(queue.is_empty());
        assert!(queue.current().is_none());
        assert!(queue.current_index().is_none());
        assert!(queue.skip_forward().is_none());
        assert!(queue.previous().is_none());
    }

    #[test]
    fn test_forward_wraps() {
        let mut queue = abc();
        queue.jump_to(2);
        assert_eq!(queue.skip_forward().unwrap().id.as_str(), "a");
        assert_eq!(queue.current_index(), Some(0));
    }

    #[test]
    fn test_previous_wraps() {
        let mut queue = abc();
        assert_eq!(queue.previous().unwrap().id.as_str(), "c");
        assert_eq!(queue.current_index(), Some(2));
    }

    #[test]
    fn test_replace_out_of_range_position() {
        let mut queue = Queue::new();
        queue.replace(vec![song_with_id("a")], 5);
        assert_eq!(current_id(&queue), "a");
    }

    #[test]
    fn test_jump_to_out_of_range() {
        let mut queue = abc();
        assert!(!queue.jump_to(3));
        assert_eq!(current_id(&queue), "a");
    }

    #[test]
    fn test_update_where_touches_every_match() {
        let mut queue = Queue::new();
        queue.replace(vec![song_with_id("a"), song_with_id("b"), song_with_id("a")], 1);

        let touched = queue.update_where(&SongId::new("a"), |s| s.liked = true);
        assert_eq!(touched, 2);
        assert!(queue.items()[0].liked);
        assert!(!queue.items()[1].liked);
        assert!(queue.items()[2].liked);
    }

    #[test]
    fn test_position_of() {
        let queue = abc();
        assert_eq!(queue.position_of(&SongId::new("b")), Some(1));
        assert_eq!(queue.position_of(&SongId::new("z")), None);
    }
}
