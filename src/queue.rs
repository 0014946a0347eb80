//! Growable circular queue
//!
//! `RingQueue` backs every buffer in the codecs: the encoder's lookahead and
//! pending literals, the history window and the decoder's recall buffer.
//! Items are addressed by logical index relative to the oldest element.
//! It grows by reallocating with 25% slack and never drops elements on its own.

use crate::{MetazipError, Result};

/// Circular FIFO buffer of `Copy` items
#[derive(Debug, Clone)]
pub struct RingQueue<T> {
    items: Vec<T>,
    start: usize,
    size: usize,
}

impl<T: Copy + Default> Default for RingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default> RingQueue<T> {
    /// Create an empty queue without allocating
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            start: 0,
            size: 0,
        }
    }

    /// Create an empty queue holding `capacity` items before it must grow
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut queue = Self::new();
        queue.reallocate(capacity)?;
        Ok(queue)
    }

    /// Number of items in the queue
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the queue holds no items
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of items the queue holds before it must grow
    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    /// Physical slot of a logical index
    fn slot(&self, index: usize) -> usize {
        let slot = self.start + index;
        if slot >= self.items.len() {
            slot - self.items.len()
        } else {
            slot
        }
    }

    /// Move the contents into a fresh allocation of `capacity` slots
    fn reallocate(&mut self, capacity: usize) -> Result<()> {
        let mut items = Vec::new();
        items
            .try_reserve_exact(capacity)
            .map_err(|_| MetazipError::OutOfMemory {
                requested: capacity,
            })?;
        items.resize(capacity, T::default());

        // Copy the two halves around the wrap point into logical order
        let head = self.size.min(self.items.len() - self.start);
        items[..head].copy_from_slice(&self.items[self.start..self.start + head]);
        items[head..self.size].copy_from_slice(&self.items[..self.size - head]);

        self.items = items;
        self.start = 0;
        Ok(())
    }

    /// Make room for `additional` more items
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let required = self
            .size
            .checked_add(additional)
            .ok_or(MetazipError::OutOfMemory {
                requested: usize::MAX,
            })?;
        if required > self.items.len() {
            let grown = required.saturating_add(required / 4);
            self.reallocate(grown)?;
        }
        Ok(())
    }

    /// Append items at the back
    pub fn add(&mut self, items: &[T]) -> Result<()> {
        self.reserve(items.len())?;

        let capacity = self.items.len();
        let tail = self.slot(self.size);
        let first = items.len().min(capacity - tail);
        self.items[tail..tail + first].copy_from_slice(&items[..first]);
        self.items[..items.len() - first].copy_from_slice(&items[first..]);
        self.size += items.len();
        Ok(())
    }

    /// Append a single item at the back
    pub fn push(&mut self, item: T) -> Result<()> {
        self.reserve(1)?;
        let tail = self.slot(self.size);
        self.items[tail] = item;
        self.size += 1;
        Ok(())
    }

    /// Copy `out.len()` items starting at logical index `at` without removing them
    ///
    /// # Panics
    ///
    /// Panics if the requested range extends past the end of the queue.
    pub fn fetch(&self, out: &mut [T], at: usize) {
        assert!(
            at + out.len() <= self.size,
            "fetch of {} items at {} from a queue of {}",
            out.len(),
            at,
            self.size
        );
        if out.is_empty() {
            return;
        }

        let capacity = self.items.len();
        let from = self.slot(at);
        let first = out.len().min(capacity - from);
        out[..first].copy_from_slice(&self.items[from..from + first]);
        let rest = out.len() - first;
        out[first..].copy_from_slice(&self.items[..rest]);
    }

    /// Copy the `out.len()` oldest items out and remove them
    ///
    /// # Panics
    ///
    /// Panics if the queue holds fewer items than requested.
    pub fn remove(&mut self, out: &mut [T]) {
        self.fetch(out, 0);
        self.skip(out.len());
    }

    /// Remove the `count` oldest items without copying them
    ///
    /// # Panics
    ///
    /// Panics if the queue holds fewer than `count` items.
    pub fn skip(&mut self, count: usize) {
        assert!(
            count <= self.size,
            "skip of {} items from a queue of {}",
            count,
            self.size
        );
        self.size -= count;
        if self.size == 0 {
            self.start = 0;
        } else {
            self.start = self.slot(count);
        }
    }

    /// Item at logical index `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn item(&self, index: usize) -> &T {
        assert!(index < self.size, "index {} out of range {}", index, self.size);
        &self.items[self.slot(index)]
    }

    /// Mutable item at logical index `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn item_mut(&mut self, index: usize) -> &mut T {
        assert!(index < self.size, "index {} out of range {}", index, self.size);
        let slot = self.slot(index);
        &mut self.items[slot]
    }

    /// Remove the most recently added item
    pub fn pop(&mut self) -> Option<T> {
        if self.size == 0 {
            return None;
        }
        let item = self.items[self.slot(self.size - 1)];
        self.size -= 1;
        if self.size == 0 {
            self.start = 0;
        }
        Some(item)
    }

    /// Remove every item, keeping the allocation
    pub fn clear(&mut self) {
        self.start = 0;
        self.size = 0;
    }

    /// Iterate over the items from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.size).map(move |index| &self.items[self.slot(index)])
    }
}
