//! Competitive placement of memories.
//!
//! Placing a memory evaluates the whole grid against its vector and hands it to the winning
//! mini-column. The reassignment pass re-runs that competition for memories already stored:
//! each one is lifted out of its cell, the grid is evaluated without it, and it moves if some
//! other cell now wins. Lifted memories leave a tombstone so the pass can keep walking the
//! store by slot index; all stores are compacted once the pass is over.

use super::{
    driver::CancellationToken,
    error::Result,
    grid::Grid,
    memory::Memory,
    topology::Coords,
    winner::select_winner,
};
use rand::Rng;

/// Outcome of one reassignment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Memories that ended up in a different cell.
    pub changes: usize,

    /// The pass stopped early because cancellation was requested.
    pub cancelled: bool,
}

/// Places `memory` in the cell that wins the competition for its vector.
///
/// Returns the winner's coordinates, or `None` if the grid has no live cells, in which case the
/// memory is dropped and the grid's vector length stays unset. Fails only if the vector length
/// does not match the grid's.
pub fn place_memory<R: Rng>(
    grid: &mut Grid,
    memory: Memory,
    rng: &mut R,
) -> Result<Option<Coords>> {
    grid.evaluate(&memory.vector)?;

    let Some(winner) = select_winner(&grid.cells, rng) else {
        return Ok(None);
    };
    Ok(grid.store(winner, memory).map(|(coords, _)| coords))
}

/// Re-runs placement for the most recent memories of every cell.
///
/// Cells are processed in index order. Within a cell, at most `reassign_window` memories are
/// revisited, newest first. Only memories a cell held when the pass started are candidates, so
/// a memory that moved into a later cell is not revisited in the same pass. Cancellation is
/// checked before each cell; the stores are compacted whether or not the pass ran to the end.
pub fn reassign_pass<R: Rng>(
    grid: &mut Grid,
    rng: &mut R,
    cancel: &CancellationToken,
) -> PassReport {
    let window = grid.constants.reassign_window;
    let mut report = PassReport::default();
    let marks: Vec<usize> = grid
        .cells
        .iter()
        .map(|c| c.as_ref().map_or(0, |c| c.store.slot_count()))
        .collect();

    for origin in 0..grid.cells.len() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        let slots: Vec<usize> = match &grid.cells[origin] {
            Some(cell) => {
                let live: Vec<usize> = cell
                    .store
                    .iter_slots()
                    .map(|(slot, _)| slot)
                    .take_while(|&slot| slot < marks[origin])
                    .collect();
                live.into_iter().rev().take(window).collect()
            }
            None => continue,
        };

        for slot in slots {
            if reassign_one(grid, origin, slot, rng) {
                report.changes += 1;
            }
        }
    }

    for cell in grid.cells.iter_mut().flatten() {
        cell.store.compact();
    }
    report
}

/// Lifts the memory at `slot` of `origin`, re-runs the competition and moves it if another cell
/// wins. Returns true if the memory moved.
fn reassign_one<R: Rng>(grid: &mut Grid, origin: usize, slot: usize, rng: &mut R) -> bool {
    let Some(memory) = grid.cells[origin]
        .as_mut()
        .and_then(|cell| cell.store.remove_at(slot))
    else {
        return false;
    };

    grid.run_passes(&memory.vector);

    match select_winner(&grid.cells, rng) {
        Some(winner) if winner != origin => {
            if let Some(cell) = grid.cells[winner].as_mut() {
                cell.store.add(memory);
                return true;
            }
            put_back(grid, origin, slot, memory);
            false
        }
        _ => {
            put_back(grid, origin, slot, memory);
            false
        }
    }
}

fn put_back(grid: &mut Grid, origin: usize, slot: usize, memory: Memory) {
    if let Some(cell) = grid.cells[origin].as_mut() {
        if let Err(memory) = cell.store.restore(slot, memory) {
            cell.store.add(memory);
        }
    }
}
