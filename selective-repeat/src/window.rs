//! Fixed-capacity circular window keyed by sequence number.
//!
//! [`SeqWindow`] backs both protocol entities:
//!
//! - the sender appends with [`push_back`](SeqWindow::push_back) and retires
//!   acknowledged packets from the head;
//! - the receiver fills arbitrary slots with [`insert`](SeqWindow::insert)
//!   and drains the contiguous prefix that starts at the head.
//!
//! ```text
//!   base                      base + len        base + capacity
//!    │                            │                   │
//!  ──┼────┬────┬────┬────┬────┬───┼───────────────────┼──▶ seq space
//!    │ s0 │ s1 │ -- │ s3 │ .. │   │     free slots    │
//! ```
//!
//! Slots past `len` are always empty; a slot inside `len` may be empty only
//! on the receiver side (a gap).

use crate::seq::{self, SeqNum};

#[derive(Debug, Clone)]
pub struct SeqWindow<T> {
    slots: Vec<Option<T>>,
    /// Physical index of the slot holding `base`.
    head: usize,
    /// Sequence number of the head slot.
    base: SeqNum,
    /// Number of positions from the head up to the furthest filled slot.
    len: usize,
}

impl<T> SeqWindow<T> {
    /// Create an empty window anchored at sequence number 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "window capacity must be at least 1");
        assert!(
            2 * capacity <= seq::SEQ_SPACE as usize,
            "window capacity must not exceed half the sequence space"
        );
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            base: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Sequence number at the head of the window.
    pub fn base(&self) -> SeqNum {
        self.base
    }

    /// Sequence number one past the furthest filled slot.
    pub fn end(&self) -> SeqNum {
        seq::add(self.base, self.len)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Distance of `seq` from the head, if it lies within capacity.
    pub fn offset_of(&self, seq: SeqNum) -> Option<usize> {
        if seq >= seq::SEQ_SPACE {
            return None;
        }
        let off = seq::offset(self.base, seq);
        (off < self.capacity()).then_some(off)
    }

    fn slot_index(&self, offset: usize) -> usize {
        (self.head + offset) % self.capacity()
    }

    /// Append `item` at the tail, returning the sequence number it occupies.
    ///
    /// Hands `item` back when the window is full.
    pub fn push_back(&mut self, item: T) -> Result<SeqNum, T> {
        if self.is_full() {
            return Err(item);
        }
        let seq = self.end();
        let idx = self.slot_index(self.len);
        self.slots[idx] = Some(item);
        self.len += 1;
        Ok(seq)
    }

    /// Store `item` in the slot `offset` positions past the head.
    ///
    /// Returns `false`, dropping `item`, if the slot is already filled or
    /// `offset` is beyond capacity.
    pub fn insert(&mut self, offset: usize, item: T) -> bool {
        if offset >= self.capacity() {
            return false;
        }
        let idx = self.slot_index(offset);
        if self.slots[idx].is_some() {
            return false;
        }
        self.slots[idx] = Some(item);
        self.len = self.len.max(offset + 1);
        true
    }

    pub fn get(&self, seq: SeqNum) -> Option<&T> {
        let off = self.offset_of(seq)?;
        self.slots[self.slot_index(off)].as_ref()
    }

    pub fn get_mut(&mut self, seq: SeqNum) -> Option<&mut T> {
        let off = self.offset_of(seq)?;
        let idx = self.slot_index(off);
        self.slots[idx].as_mut()
    }

    /// Remove items from the head while the head slot is filled and `pred`
    /// holds for it, advancing `base` by one per item.
    pub fn pop_front_while<F>(&mut self, mut pred: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        let mut popped = Vec::new();
        while self.len > 0 {
            match &self.slots[self.head] {
                Some(item) if pred(item) => {}
                _ => break,
            }
            if let Some(item) = self.slots[self.head].take() {
                popped.push(item);
            }
            self.head = (self.head + 1) % self.capacity();
            self.base = seq::next(self.base);
            self.len -= 1;
        }
        popped
    }

    /// Filled slots from head to tail, with their sequence numbers.
    pub fn iter(&self) -> impl Iterator<Item = (SeqNum, &T)> + '_ {
        (0..self.len).filter_map(move |off| {
            self.slots[self.slot_index(off)]
                .as_ref()
                .map(|item| (seq::add(self.base, off), item))
        })
    }

    /// Empty every slot and re-anchor at sequence number 0.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.head = 0;
        self.base = 0;
        self.len = 0;
    }
}
