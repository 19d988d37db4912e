//! Fixed-capacity FIFO buffer of recent frame tags.

use std::collections::VecDeque;

/// Last `capacity` primary tags in arrival order. Oldest is evicted first.
#[derive(Debug, Clone)]
pub struct FrameWindow {
    tags: VecDeque<String>,
    capacity: usize,
}

impl FrameWindow {
    pub fn new(capacity: usize) -> Self {
        // A zero-capacity window would never fill; clamp to one slot.
        let capacity = capacity.max(1);
        Self {
            tags: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a tag, evicting the oldest when full.
    pub fn push(&mut self, tag: impl Into<String>) {
        if self.tags.len() == self.capacity {
            self.tags.pop_front();
        }
        self.tags.push_back(tag.into());
    }

    pub fn count(&self, tag: &str) -> usize {
        self.tags.iter().filter(|t| t.as_str() == tag).count()
    }

    pub fn is_full(&self) -> bool {
        self.tags.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_first() {
        let mut w = FrameWindow::new(3);
        for tag in ["a", "b", "c", "d"] {
            w.push(tag);
        }
        assert_eq!(w.len(), 3);
        assert_eq!(w.iter().collect::<Vec<_>>(), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut w = FrameWindow::new(10);
        for i in 0..100 {
            w.push(format!("t{}", i % 3));
            assert!(w.len() <= 10);
        }
        assert!(w.is_full());
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut w = FrameWindow::new(0);
        w.push("HELP");
        assert_eq!(w.capacity(), 1);
        assert!(w.is_full());
    }
}
