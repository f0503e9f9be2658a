//! Energy-based local search over the grid layout.
//!
//! The energy of a cell is the distance-weighted mean Euclidean distance between its
//! representative memory and the representative memories of its neighbors, with weight
//! `1 / cell distance`. Lower energy means the cell sits among similar memories.
//!
//! A swap pass visits the live cells in a freshly shuffled order. For each cell it tries
//! exchanging contents with every neighbor, measures how the energy of the two cells would
//! change, and keeps the exchange with the most negative change. Exchanges that do not lower
//! the energy are never taken.

use super::{
    activity::euclidean_distance,
    column::MiniColumn,
    grid::{map_cells, Grid},
};
use rand::{seq::SliceRandom, Rng};
use tracing::trace;

/// An exchange accepted by [`improve_cell`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Swap {
    /// Index of the cell whose contents were exchanged with the visited cell.
    pub partner: usize,

    /// Combined energy of both cells before the exchange.
    pub before: f32,

    /// Combined energy of both cells after the exchange.
    pub after: f32,
}

/// Energy of `cells[index]`. Cells without a memory, or without occupied neighbors, have energy 0.
pub fn energy(cells: &[Option<MiniColumn>], index: usize) -> f32 {
    let Some(Some(cell)) = cells.get(index) else {
        return 0.0;
    };
    let Some(own) = cell.store.representative() else {
        return 0.0;
    };

    let (sum, weight) = cell
        .neighbors
        .iter()
        .filter_map(|n| {
            let other = cells.get(n.index)?.as_ref()?.store.representative()?;
            Some((n.distance, other))
        })
        .fold((0.0f32, 0.0f32), |(sum, weight), (distance, other)| {
            let w = 1.0 / distance;
            (sum + w * euclidean_distance(&own.vector, &other.vector), weight + w)
        });

    if weight > 0.0 {
        sum / weight
    } else {
        0.0
    }
}

/// Sum of all cell energies.
pub fn total_energy(grid: &Grid) -> f32 {
    (0..grid.cells.len()).map(|i| energy(&grid.cells, i)).sum()
}

/// Recomputes every cell's `temp_energy` for display.
pub fn refresh_energy(grid: &mut Grid) {
    let cells = &grid.cells;
    let energies = map_cells(cells.len(), |i| energy(cells, i));

    for (cell, e) in grid.cells.iter_mut().zip(energies) {
        if let Some(cell) = cell {
            cell.temp_energy = e;
        }
    }
}

/// Exchanges the memory stores of two live cells.
fn swap_stores(cells: &mut [Option<MiniColumn>], a: usize, b: usize) {
    if a == b {
        return;
    }
    let (lo, hi) = (a.min(b), a.max(b));
    let (left, right) = cells.split_at_mut(hi);
    if let (Some(x), Some(y)) = (left[lo].as_mut(), right[0].as_mut()) {
        std::mem::swap(&mut x.store, &mut y.store);
    }
}

/// Tries every neighbor of `index` as an exchange partner and performs the best exchange if it
/// lowers the combined energy. Cells without neighbors never swap.
pub fn improve_cell(grid: &mut Grid, index: usize) -> Option<Swap> {
    let cell = grid.cells.get(index)?.as_ref()?;
    let candidates: Vec<usize> = cell.neighbors.iter().map(|n| n.index).collect();

    let cells = &mut grid.cells;
    let own_before = energy(cells, index);
    if let Some(cell) = cells[index].as_mut() {
        cell.temp_energy = own_before;
    }

    let mut best: Option<Swap> = None;
    for partner in candidates {
        let before = own_before + energy(cells, partner);

        swap_stores(cells, index, partner);
        let after = energy(cells, index) + energy(cells, partner);
        swap_stores(cells, index, partner);

        let delta = after - before;
        if delta < 0.0 && best.map_or(true, |b| delta < b.after - b.before) {
            best = Some(Swap {
                partner,
                before,
                after,
            });
        }
    }

    let swap = best?;
    swap_stores(cells, index, swap.partner);
    trace!(
        cell = index,
        partner = swap.partner,
        delta = swap.after - swap.before,
        "swap accepted"
    );
    Some(swap)
}

/// One pass of the local search. Returns the number of accepted swaps.
pub fn swap_pass<R: Rng>(grid: &mut Grid, rng: &mut R) -> usize {
    let mut order: Vec<usize> = grid
        .cells
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.as_ref().map(|_| i))
        .collect();
    order.shuffle(rng);

    let swaps = order
        .into_iter()
        .filter(|&i| improve_cell(grid, i).is_some())
        .count();

    refresh_energy(grid);
    swaps
}
