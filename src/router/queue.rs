use std::collections::VecDeque;

/// Drop-tail FIFO holding at most `capacity` items.
///
/// An arrival that finds the queue full is handed back to the caller and counted as a drop;
/// items already queued are never evicted.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
    drop_count: u64,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            drop_count: 0,
        }
    }

    pub fn enqueue(&mut self, item: T) -> Result<(), T> {
        if self.items.len() >= self.capacity {
            self.drop_count += 1;
            return Err(item);
        }

        self.items.push_back(item);
        Ok(())
    }

    pub fn dequeue(&mut self) -> Option<T> {
        self.items.pop_front()
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

    pub fn drop_count(&self) -> u64 {
        self.drop_count
    }
}
