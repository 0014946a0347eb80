//! Sliding window history with a chained hash index
//!
//! Every processed byte becomes a `HistoryEntry` in a fixed-capacity
//! `RingQueue`. Once an entry has three predecessors in the window it is keyed
//! by the hash of those four bytes and prepended to its bucket's chain.
//! Entries are addressed by absolute stream position; a position minus the
//! number of evicted entries is its index in the queue.

use crate::queue::RingQueue;
use crate::{MetazipError, Result, HASH_BYTES, HASH_TABLE_SIZE, WINDOW_SIZE};

/// Whatever refers to an entry inside its hash chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackLink {
    /// Not part of any chain (fewer than four bytes were in the window)
    #[default]
    Unlinked,
    /// Head of the bucket with this hash
    Bucket(u16),
    /// Successor of the entry at this position
    Entry(usize),
}

/// One byte of history and its chain links
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryEntry {
    /// The byte itself
    pub value: u8,
    /// Next older entry with the same hash
    pub next: Option<usize>,
    /// Link that has to be cleared when this entry is evicted
    pub back: BackLink,
}

/// Hash of four consecutive bytes
pub fn hash4(bytes: [u8; HASH_BYTES]) -> u16 {
    (u32::from_le_bytes(bytes).wrapping_mul(0x9E37_79B1) >> 16) as u16
}

/// The encoder's dictionary of recently processed bytes
#[derive(Debug)]
pub struct HistoryBuffer {
    entries: RingQueue<HistoryEntry>,
    buckets: Vec<Option<usize>>,
    evicted: usize,
    capacity: usize,
}

impl HistoryBuffer {
    /// Create a history window of the standard size
    pub fn new() -> Result<Self> {
        Self::with_capacity(WINDOW_SIZE)
    }

    /// Create a history window holding at most `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity < HASH_BYTES || capacity > WINDOW_SIZE {
            return Err(MetazipError::InvalidParameter(format!(
                "history capacity {} must lie in {}..={}",
                capacity, HASH_BYTES, WINDOW_SIZE
            )));
        }

        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(HASH_TABLE_SIZE)
            .map_err(|_| MetazipError::OutOfMemory {
                requested: HASH_TABLE_SIZE,
            })?;
        buckets.resize(HASH_TABLE_SIZE, None);

        Ok(Self {
            entries: RingQueue::with_capacity(capacity)?,
            buckets,
            evicted: 0,
            capacity,
        })
    }

    /// Number of bytes in the window
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the window is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of bytes in the window
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Absolute position of the oldest byte still in the window
    pub fn start_position(&self) -> usize {
        self.evicted
    }

    /// Absolute position the next inserted byte will take
    pub fn end_position(&self) -> usize {
        self.evicted + self.entries.len()
    }

    fn entry(&self, position: usize) -> &HistoryEntry {
        self.entries.item(position - self.evicted)
    }

    fn entry_mut(&mut self, position: usize) -> &mut HistoryEntry {
        self.entries.item_mut(position - self.evicted)
    }

    /// Byte stored at an absolute position inside the window
    pub fn byte_at(&self, position: usize) -> u8 {
        self.entry(position).value
    }

    /// Most recent position whose four-byte prefix hashed to `hash`
    pub fn chain_head(&self, hash: u16) -> Option<usize> {
        self.buckets[hash as usize]
    }

    /// Positions in the bucket for `hash`, newest first
    ///
    /// Each position is the last byte of a hashed four-byte group.
    pub fn chain(&self, hash: u16) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.chain_head(hash), move |&position| {
            self.entry(position).next
        })
    }

    /// Append a byte, evicting the oldest one when the window is full
    pub fn insert(&mut self, byte: u8) -> Result<()> {
        if self.entries.len() == self.capacity {
            self.evict_oldest()?;
        }

        let position = self.end_position();
        let mut entry = HistoryEntry {
            value: byte,
            next: None,
            back: BackLink::Unlinked,
        };

        let hash = if self.entries.len() >= HASH_BYTES - 1 {
            let hash = hash4([
                self.byte_at(position - 3),
                self.byte_at(position - 2),
                self.byte_at(position - 1),
                byte,
            ]);
            entry.next = self.buckets[hash as usize];
            entry.back = BackLink::Bucket(hash);
            Some(hash)
        } else {
            None
        };

        self.entries.push(entry)?;

        if let Some(hash) = hash {
            if let Some(previous_head) = entry.next {
                self.entry_mut(previous_head).back = BackLink::Entry(position);
            }
            self.buckets[hash as usize] = Some(position);
        }

        Ok(())
    }

    /// Append every byte of `bytes`
    pub fn insert_all(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.insert(byte)?;
        }
        Ok(())
    }

    /// Drop the oldest entry and clear whatever links to it
    fn evict_oldest(&mut self) -> Result<()> {
        let oldest = *self.entries.item(0);

        // The oldest entry is always the tail of its chain
        if oldest.next.is_some() {
            return Err(MetazipError::Internal(format!(
                "history entry {} still links to an older entry",
                self.evicted
            )));
        }

        match oldest.back {
            BackLink::Unlinked => {}
            BackLink::Bucket(hash) => self.buckets[hash as usize] = None,
            BackLink::Entry(position) => self.entry_mut(position).next = None,
        }

        self.entries.skip(1);
        self.evicted += 1;
        Ok(())
    }

    /// Empty the window and the hash index
    pub fn clear(&mut self) {
        self.entries.clear();
        self.buckets.fill(None);
        self.evicted = 0;
    }
}
