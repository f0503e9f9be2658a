//! A `MiniColumn` is one allocated location of the memory grid.
//!
//! Biological inspiration:
//! Cortical mini-columns are small vertical groups of neurons that respond to related stimuli,
//! and neighboring mini-columns tend to respond to similar stimuli.
//!
//! Meaning here:
//! Each mini-column holds a growing set of memory vectors and knows which other mini-columns
//! lie within the neighborhood radius. For every input it scores how strongly its memories
//! respond (activity), and that score is blended with the neighbors' scores (super-activity)
//! to decide where the input belongs. Over many epochs, similar memories end up in nearby
//! mini-columns.

use super::{activity::ActivityPair, memory::MemoryStore, topology::Coords};

/// One entry of a mini-column's neighbor list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Linear index of the neighboring mini-column in the grid.
    pub index: usize,

    /// Euclidean distance in cell units.
    pub distance: f32,

    /// Weight applied to the neighbor's positive activity.
    pub weight_pos: f32,

    /// Weight applied to the neighbor's negative activity.
    pub weight_neg: f32,
}

/// Represents a mini-column of the memory grid.
#[derive(Debug, Clone)]
pub struct MiniColumn {
    /// Position in the grid.
    pub coords: Coords,

    /// Other mini-columns within the neighborhood radius, linked once the whole grid exists.
    pub neighbors: Vec<Neighbor>,

    /// The memories this mini-column owns.
    pub store: MemoryStore,

    /// Activity against the input currently being placed. Scratch, overwritten every evaluation.
    pub activity: ActivityPair,

    /// Own activity blended with the neighbors'. Scratch.
    pub super_activity: f32,

    /// Energy of the representative memory against the neighborhood. Scratch.
    pub temp_energy: f32,
}

impl MiniColumn {
    /// Creates an unlinked mini-column with an empty store.
    pub fn new(coords: Coords) -> Self {
        Self {
            coords,
            neighbors: Vec::new(),
            store: MemoryStore::new(),
            activity: ActivityPair::default(),
            super_activity: 0.0,
            temp_energy: 0.0,
        }
    }

    /// Clears the per-epoch scratch fields.
    pub fn reset_scratch(&mut self) {
        self.activity = ActivityPair::default();
        self.super_activity = 0.0;
        self.temp_energy = 0.0;
    }
}
