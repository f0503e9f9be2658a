//! Winner-take-all selection over the grid's super-activity.

use super::column::MiniColumn;
use rand::Rng;

/// Returns the index of the live cell with the highest super-activity.
///
/// Cells tied at the maximum (exact equality) are collected and one is drawn uniformly from
/// `rng`. The draw only happens when there is a tie, so the caller's seed fully decides the
/// outcome. Returns `None` when the grid has no live cells.
pub fn select_winner<R: Rng>(cells: &[Option<MiniColumn>], rng: &mut R) -> Option<usize> {
    let mut best = f32::NEG_INFINITY;
    let mut tied = Vec::new();

    for (idx, cell) in cells.iter().enumerate() {
        let Some(cell) = cell else { continue };
        let s = cell.super_activity;
        if s > best {
            best = s;
            tied.clear();
            tied.push(idx);
        } else if s == best {
            tied.push(idx);
        }
    }

    match tied.len() {
        0 => None,
        1 => Some(tied[0]),
        n => Some(tied[rng.random_range(0..n)]),
    }
}
