//! Super-activity blends a mini-column's own activity with its neighbors'.
//!
//! The own term uses weight rank 0 of both curves. An empty mini-column scores itself as if it
//! held one memory at the empty-cell similarity `k2`, which lets inputs drift into unused space.
//! Empty neighbors, on the other hand, add nothing. That asymmetry shapes how the grid fills up
//! near its edges and is kept as is.

use super::{column::MiniColumn, constants::Constants};

/// Super-activity of `cells[index]`. Absent cells and out-of-range indices score 0.
///
/// Reads the neighbors' activity, so every live cell must have been evaluated against the
/// current input first.
pub fn aggregate(cells: &[Option<MiniColumn>], index: usize, constants: &Constants) -> f32 {
    let Some(Some(cell)) = cells.get(index) else {
        return 0.0;
    };

    let pk0 = constants.positive_k[0];
    let nk0 = constants.negative_k[0];

    let own = if cell.activity.count > 0 {
        pk0 * cell.activity.positive + nk0 * cell.activity.negative
    } else {
        pk0 * (constants.k2 - constants.k0)
    };

    cell.neighbors
        .iter()
        .filter_map(|n| cells.get(n.index).and_then(Option::as_ref).map(|c| (n, c)))
        .filter(|(_, c)| c.activity.count > 0)
        .fold(own, |acc, (n, c)| {
            acc + n.weight_pos * c.activity.positive + n.weight_neg * c.activity.negative
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{activity::ActivityPair, column::Neighbor, topology::Coords};

    fn cell(x: usize, activity: ActivityPair, neighbors: Vec<Neighbor>) -> Option<MiniColumn> {
        let mut c = MiniColumn::new(Coords::new(x, 0));
        c.activity = activity;
        c.neighbors = neighbors;
        Some(c)
    }

    fn link(index: usize) -> Neighbor {
        Neighbor {
            index,
            distance: 1.0,
            weight_pos: 0.5,
            weight_neg: 0.25,
        }
    }

    fn constants() -> Constants {
        let mut c = Constants::new(3, 1, 1.0);
        c.k0 = 0.2;
        c.k2 = 0.6;
        c.positive_k = vec![2.0, 0.5];
        c.negative_k = vec![1.0, 0.25];
        c
    }

    #[test]
    fn empty_self_uses_baseline() {
        let cells = vec![cell(0, ActivityPair::default(), vec![])];
        let s = aggregate(&cells, 0, &constants());
        assert!((s - 2.0 * (0.6 - 0.2)).abs() < 1e-6);
    }

    #[test]
    fn adds_weighted_neighbors_and_ignores_empty_ones() {
        let busy = ActivityPair {
            positive: 0.4,
            negative: -0.2,
            count: 2,
        };
        let cells = vec![
            cell(0, busy, vec![link(1)]),
            cell(1, busy, vec![link(0), link(2)]),
            cell(2, ActivityPair::default(), vec![link(1)]),
        ];
        let c = constants();

        let own = 2.0 * 0.4 + 1.0 * -0.2;
        let from_neighbor = 0.5 * 0.4 + 0.25 * -0.2;
        assert!((aggregate(&cells, 0, &c) - (own + from_neighbor)).abs() < 1e-6);
        assert!((aggregate(&cells, 1, &c) - (own + from_neighbor)).abs() < 1e-6);

        let baseline = 2.0 * (0.6 - 0.2);
        assert!((aggregate(&cells, 2, &c) - (baseline + from_neighbor)).abs() < 1e-6);
    }

    #[test]
    fn absent_cells_contribute_nothing() {
        let busy = ActivityPair {
            positive: 1.0,
            negative: 0.0,
            count: 1,
        };
        let cells = vec![cell(0, busy, vec![link(1)]), None];
        assert!((aggregate(&cells, 0, &constants()) - 2.0).abs() < 1e-6);
        assert_eq!(aggregate(&cells, 1, &constants()), 0.0);
    }
}
