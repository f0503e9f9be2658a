//! The `Grid` owns every mini-column and runs the two per-input evaluation passes.
//!
//! Construction happens in two phases: first every allocated mini-column is created, then each
//! one is linked to the mini-columns within the neighborhood radius. Linking only writes the
//! source cell's own list, so it runs in parallel like the evaluation passes.
//!
//! Evaluation of one input:
//! - Activity pass: every cell compares the input with its own memories.
//! - Super-activity pass: every cell blends its activity with its neighbors'.
//!
//! Both passes only read shared state and write one value per cell, so they fork onto the
//! rayon pool (feature `parallel`) and join before anything mutates a store.

use super::{
    activity::{self, cosine_similarity, ActivityPair, SimilarityFn},
    column::{MiniColumn, Neighbor},
    constants::Constants,
    error::{CortexError, Result},
    memory::Memory,
    super_activity,
    topology::{Coords, Topology},
    winner,
};
use rand::Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// A 2-D grid of mini-columns. Locations outside the allocated region hold `None`.
#[derive(Debug, Clone)]
pub struct Grid {
    pub(crate) topology: Topology,
    pub(crate) constants: Arc<Constants>,
    pub(crate) cells: Vec<Option<MiniColumn>>,
    pub(crate) vector_len: Option<usize>,
    pub(crate) similarity: SimilarityFn,
}

impl Grid {
    /// Builds a grid from validated constants.
    pub fn build(constants: Constants) -> Result<Self> {
        constants.validate()?;
        let topology = Topology::new(constants.width, constants.height);

        let cells: Vec<Option<MiniColumn>> = (0..topology.len())
            .map(|i| {
                let coords = topology.coordinates(i);
                (!constants.center_only || topology.in_center_disc(coords))
                    .then(|| MiniColumn::new(coords))
            })
            .collect();

        let mut grid = Self {
            topology,
            constants: Arc::new(constants),
            cells,
            vector_len: None,
            similarity: cosine_similarity,
        };
        grid.link_neighbors();

        debug!(
            width = grid.topology.width(),
            height = grid.topology.height(),
            live_cells = grid.live_cell_count(),
            links = grid.cells().map(|c| c.neighbors.len()).sum::<usize>(),
            "grid built"
        );
        Ok(grid)
    }

    /// Replaces the similarity measure used by the activity pass.
    pub fn with_similarity(mut self, similarity: SimilarityFn) -> Self {
        self.similarity = similarity;
        self
    }

    /// Links every live cell to the live cells within the radius.
    fn link_neighbors(&mut self) {
        let topology = self.topology;
        let constants = &*self.constants;
        let cells = &self.cells;

        let lists = map_cells(cells.len(), |i| {
            if cells[i].is_none() {
                return Vec::new();
            }
            topology
                .disc(i, constants.radius)
                .filter(|&(j, _)| cells[j].is_some())
                .map(|(index, distance)| {
                    let (weight_pos, weight_neg) = constants.weights_at(distance);
                    Neighbor {
                        index,
                        distance,
                        weight_pos,
                        weight_neg,
                    }
                })
                .collect()
        });

        for (cell, neighbors) in self.cells.iter_mut().zip(lists) {
            if let Some(cell) = cell {
                cell.neighbors = neighbors;
            }
        }
    }

    /// Swaps in new constants. Weight curves are re-read into the neighbor lists; the grid
    /// shape must stay the same.
    pub fn retune(&mut self, constants: Constants) -> Result<()> {
        constants.validate()?;
        if !self.constants.same_shape(&constants) {
            return Err(CortexError::ShapeChanged);
        }

        for cell in self.cells.iter_mut().flatten() {
            for n in cell.neighbors.iter_mut() {
                (n.weight_pos, n.weight_neg) = constants.weights_at(n.distance);
            }
        }
        self.constants = Arc::new(constants);
        debug!("constants retuned");
        Ok(())
    }

    /// The constants snapshot currently in force.
    pub fn constants(&self) -> &Arc<Constants> {
        &self.constants
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Length every stored vector has, once the first memory arrived.
    pub fn vector_len(&self) -> Option<usize> {
        self.vector_len
    }

    /// Rejects vectors whose length differs from the grid's. Any length passes before the
    /// first memory is stored.
    pub(crate) fn check_vector(&self, len: usize) -> Result<()> {
        match self.vector_len {
            Some(expected) if expected != len => Err(CortexError::VectorLengthMismatch {
                expected,
                found: len,
            }),
            _ => Ok(()),
        }
    }

    /// Stores `memory` in the cell at `index`, fixing the grid's vector length on first use.
    /// The length must already have passed [`Grid::check_vector`].
    pub(crate) fn store(&mut self, index: usize, memory: Memory) -> Option<(Coords, usize)> {
        let len = memory.len();
        let cell = self.cells.get_mut(index)?.as_mut()?;
        let slot = cell.store.add(memory);
        let coords = cell.coords;
        self.vector_len.get_or_insert(len);
        Some((coords, slot))
    }

    /// Runs the activity pass and then the super-activity pass for `input`.
    ///
    /// Fails without touching any cell if `input` does not match the stored vector length.
    pub fn evaluate(&mut self, input: &[f32]) -> Result<()> {
        self.check_vector(input.len())?;
        self.run_passes(input);
        Ok(())
    }

    /// [`Grid::evaluate`] for vectors already known to have the right length.
    pub(crate) fn run_passes(&mut self, input: &[f32]) {
        self.evaluate_activity(input);
        self.evaluate_super_activity();
    }

    fn evaluate_activity(&mut self, input: &[f32]) {
        let k0 = self.constants.k0;
        let similarity = self.similarity;
        let cells = &self.cells;

        let activities = map_cells(cells.len(), |i| match &cells[i] {
            Some(cell) => activity::evaluate(&cell.store, input, k0, similarity),
            None => ActivityPair::default(),
        });

        for (cell, a) in self.cells.iter_mut().zip(activities) {
            if let Some(cell) = cell {
                cell.activity = a;
            }
        }
    }

    fn evaluate_super_activity(&mut self) {
        let constants = &*self.constants;
        let cells = &self.cells;

        let scores = map_cells(cells.len(), |i| {
            super_activity::aggregate(cells, i, constants)
        });

        for (cell, s) in self.cells.iter_mut().zip(scores) {
            if let Some(cell) = cell {
                cell.super_activity = s;
            }
        }
    }

    /// Picks the winner of the last evaluation, breaking ties with `rng`.
    pub fn select_winner<R: Rng>(&self, rng: &mut R) -> Option<Coords> {
        winner::select_winner(&self.cells, rng).map(|i| self.topology.coordinates(i))
    }

    /// Appends `memory` to the cell at `coords` and returns its slot.
    pub fn insert(&mut self, coords: Coords, memory: Memory) -> Result<usize> {
        self.check_vector(memory.len())?;
        self.topology
            .index(coords)
            .and_then(|index| self.store(index, memory))
            .map(|(_, slot)| slot)
            .ok_or(CortexError::CellOutOfRange {
                x: coords.x,
                y: coords.y,
            })
    }

    /// Drops every memory and clears the scratch fields. The vector length is unlocked again.
    pub fn clear(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            cell.store.clear();
            cell.reset_scratch();
        }
        self.vector_len = None;
    }

    pub fn cell(&self, coords: Coords) -> Option<&MiniColumn> {
        self.topology
            .index(coords)
            .and_then(|i| self.cells[i].as_ref())
    }

    pub fn cell_mut(&mut self, coords: Coords) -> Option<&mut MiniColumn> {
        self.topology
            .index(coords)
            .and_then(|i| self.cells[i].as_mut())
    }

    /// Live cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &MiniColumn> + '_ {
        self.cells.iter().flatten()
    }

    pub fn live_cell_count(&self) -> usize {
        self.cells().count()
    }

    /// Total live memories across all cells.
    pub fn live_memories(&self) -> usize {
        self.cells().map(|c| c.store.count()).sum()
    }

    pub fn super_activity(&self, coords: Coords) -> Option<f32> {
        self.cell(coords).map(|c| c.super_activity)
    }

    pub fn memory_count(&self, coords: Coords) -> Option<usize> {
        self.cell(coords).map(|c| c.store.count())
    }

    /// First live memory of the cell at `coords`.
    pub fn representative(&self, coords: Coords) -> Option<&Memory> {
        self.cell(coords).and_then(|c| c.store.representative())
    }

    /// True if the cell's last super-activity reached `k4`.
    pub fn is_super_active(&self, coords: Coords) -> bool {
        self.super_activity(coords)
            .is_some_and(|s| s >= self.constants.k4)
    }

    /// Coordinates of every cell whose last super-activity reached `k4`.
    pub fn super_active_cells(&self) -> Vec<Coords> {
        let k4 = self.constants.k4;
        self.cells()
            .filter(|c| c.super_activity >= k4)
            .map(|c| c.coords)
            .collect()
    }

    /// Memory count per location, row-major. `None` marks unallocated locations.
    pub fn occupancy_map(&self) -> Vec<Option<usize>> {
        self.cells
            .iter()
            .map(|c| c.as_ref().map(|c| c.store.count()))
            .collect()
    }

    /// Last super-activity per location, row-major. `None` marks unallocated locations.
    pub fn super_activity_map(&self) -> Vec<Option<f32>> {
        self.cells
            .iter()
            .map(|c| c.as_ref().map(|c| c.super_activity))
            .collect()
    }
}

/// Builds a `width` x `height` grid with neighborhood `radius`. Shape arguments override the
/// matching fields of `constants`.
pub fn build_grid(width: usize, height: usize, radius: f32, constants: Constants) -> Result<Grid> {
    Grid::build(Constants {
        width,
        height,
        radius,
        ..constants
    })
}

/// Maps `f` over every cell index, on the rayon pool when available.
#[cfg(feature = "parallel")]
pub(crate) fn map_cells<T, F>(len: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    (0..len).into_par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn map_cells<T, F>(len: usize, f: F) -> Vec<T>
where
    F: Fn(usize) -> T,
{
    (0..len).map(f).collect()
}
