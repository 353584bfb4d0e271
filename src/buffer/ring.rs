use std::collections::VecDeque;

/// Bounded FIFO buffer. Pushing at capacity evicts the oldest entry and
/// returns it; insertion is O(1).
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be positive");
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one entry, evicting and returning the oldest when full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn push_within_capacity_evicts_nothing() {
        let mut buffer = RingBuffer::new(3);
        assert_eq!(buffer.push(1), None);
        assert_eq!(buffer.push(2), None);
        assert_eq!(buffer.push(3), None);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn push_at_capacity_evicts_oldest_first() {
        let capacity = 5;
        let mut buffer = RingBuffer::new(capacity);
        for i in 0..capacity {
            buffer.push(i);
        }

        // capacity + 1'th insert retains exactly `capacity` entries
        assert_eq!(buffer.push(capacity), Some(0));
        assert_eq!(buffer.len(), capacity);
        assert_eq!(buffer.front(), Some(&1));
    }

    #[test]
    fn pop_front_drains_in_insertion_order() {
        let mut buffer = RingBuffer::new(2);
        buffer.push("a");
        buffer.push("b");
        assert_eq!(buffer.pop_front(), Some("a"));
        assert_eq!(buffer.pop_front(), Some("b"));
        assert_eq!(buffer.pop_front(), None);
        assert!(buffer.is_empty());
    }
}
