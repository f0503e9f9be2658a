//! Memories and the per-cell memory store.
//!
//! A store is an ordered list of slots. Removing a memory tombstones its slot instead of
//! shifting the ones behind it, so a pass that walks a store by slot index can take memories
//! out, decide where they go, and put them back without its remaining indices going stale.
//! `compact` drops the tombstones once the pass is over.

use serde::{Deserialize, Serialize};

/// A stored vector plus the index of the input that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub vector: Vec<f32>,
    pub source: Option<u64>,
}

impl Memory {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            source: None,
        }
    }

    pub fn with_source(vector: Vec<f32>, source: u64) -> Self {
        Self {
            vector,
            source: Some(source),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vector.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }
}

/// One position in a store.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Occupied(Memory),
    Empty,
}

impl Slot {
    #[inline]
    pub fn memory(&self) -> Option<&Memory> {
        match self {
            Slot::Occupied(m) => Some(m),
            Slot::Empty => None,
        }
    }
}

/// Appendable memory collection with tombstoned removal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    slots: Vec<Slot>,
    live: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `memory` and returns its slot index.
    pub fn add(&mut self, memory: Memory) -> usize {
        self.slots.push(Slot::Occupied(memory));
        self.live += 1;
        self.slots.len() - 1
    }

    /// Tombstones `slot` and hands back its memory.
    /// Out-of-range or already empty slots yield `None`.
    pub fn remove_at(&mut self, slot: usize) -> Option<Memory> {
        let taken = std::mem::replace(self.slots.get_mut(slot)?, Slot::Empty);
        match taken {
            Slot::Occupied(memory) => {
                self.live -= 1;
                Some(memory)
            }
            Slot::Empty => None,
        }
    }

    /// Puts `memory` back into a tombstoned `slot`.
    ///
    /// Returns the memory unchanged if the slot is out of range or occupied, so it is never lost.
    pub fn restore(&mut self, slot: usize, memory: Memory) -> Result<(), Memory> {
        match self.slots.get_mut(slot) {
            Some(s @ Slot::Empty) => {
                *s = Slot::Occupied(memory);
                self.live += 1;
                Ok(())
            }
            _ => Err(memory),
        }
    }

    /// Removes tombstones, keeping the survivors in their relative order.
    pub fn compact(&mut self) {
        self.slots.retain(|s| matches!(s, Slot::Occupied(_)));
    }

    /// Number of live memories.
    #[inline]
    pub fn count(&self) -> usize {
        self.live
    }

    /// Number of slots, tombstones included.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&Memory> {
        self.slots.get(slot).and_then(Slot::memory)
    }

    /// Live memories in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Memory> + '_ {
        self.slots.iter().filter_map(Slot::memory)
    }

    /// Live memories with their slot indices.
    pub fn iter_slots(&self) -> impl Iterator<Item = (usize, &Memory)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.memory().map(|m| (i, m)))
    }

    /// First live memory, shown by renderers as the cell's face.
    pub fn representative(&self) -> Option<&Memory> {
        self.iter().next()
    }

    /// Drops every memory.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.live = 0;
    }
}

impl FromIterator<Memory> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = Memory>>(iter: I) -> Self {
        let mut store = MemoryStore::new();
        for memory in iter {
            store.add(memory);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_of(n: usize) -> MemoryStore {
        (0..n)
            .map(|i| Memory::with_source(vec![i as f32], i as u64))
            .collect()
    }

    fn sources(store: &MemoryStore) -> Vec<u64> {
        store.iter().filter_map(|m| m.source).collect()
    }

    #[test]
    fn removal_keeps_indices_stable_until_compaction() {
        let mut store = store_of(4);

        assert_eq!(store.remove_at(1).and_then(|m| m.source), Some(1));
        assert_eq!(store.count(), 3);
        assert_eq!(store.slot_count(), 4);
        assert_eq!(store.get(2).and_then(|m| m.source), Some(2));
        assert!(store.get(1).is_none());
        assert!(store.remove_at(1).is_none());

        store.compact();
        assert_eq!(store.slot_count(), 3);
        assert_eq!(sources(&store), vec![0, 2, 3]);
    }

    #[test]
    fn restore_refills_only_tombstones() {
        let mut store = store_of(2);
        let m = store.remove_at(0).unwrap();
        assert!(store.restore(0, m).is_ok());
        assert_eq!(store.count(), 2);

        let extra = Memory::new(vec![9.0]);
        assert_eq!(store.restore(1, extra.clone()), Err(extra.clone()));
        assert_eq!(store.restore(7, extra.clone()), Err(extra));
    }

    #[test]
    fn representative_skips_tombstones() {
        let mut store = store_of(3);
        store.remove_at(0);
        assert_eq!(store.representative().and_then(|m| m.source), Some(1));

        store.clear();
        assert!(store.representative().is_none());
        assert!(store.is_empty());
    }
}
