//! The driver repeats reordering epochs until the layout settles.
//!
//! Each epoch is a synchronous parallel evaluation phase followed by a sequential mutation
//! phase, and the epoch boundary is the only place the loop yields control:
//! - staged constants from a [`Tuning`] handle are applied,
//! - the completion callback is invoked with the epoch's report,
//! - the cancellation token is checked.
//!
//! Cancellation never interrupts a mutation phase halfway. A reassignment pass notices it at the
//! next cell boundary, compacts the stores, and the loop then stops with
//! [`StopReason::Cancelled`].

use super::{
    constants::Tuning,
    energy::swap_pass,
    error::Result,
    grid::Grid,
    placement::reassign_pass,
};
use rand::Rng;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tracing::debug;

/// Cooperative cancellation flag. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Which reordering an epoch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReorderMode {
    /// Re-run the placement competition for stored memories.
    #[default]
    Reassign,

    /// Greedy pairwise swaps that lower the neighborhood energy.
    EnergySwap,
}

/// Options of one driver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub max_epochs: usize,
    pub mode: ReorderMode,
}

impl RunOptions {
    pub fn new(max_epochs: usize, mode: ReorderMode) -> Self {
        Self { max_epochs, mode }
    }
}

/// What the completion callback sees after every epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// Zero-based epoch number.
    pub epoch: usize,

    /// Memories relocated (reassign) or swaps accepted (energy) during the epoch.
    pub changes: usize,

    /// Live memories after the epoch.
    pub live_memories: usize,

    /// Wall-clock time spent in the epoch.
    pub elapsed: Duration,
}

/// Why the driver returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The change count fell below the convergence threshold.
    Converged,

    /// `max_epochs` epochs ran without converging.
    BudgetExhausted,

    /// Cancellation was requested.
    Cancelled,
}

/// Summary of a driver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Epochs that completed.
    pub epochs: usize,

    /// Change count of the last completed epoch.
    pub last_changes: Option<usize>,

    pub stop: StopReason,
}

/// Runs reordering epochs on `grid`.
///
/// `on_epoch_complete` is called exactly once per completed epoch, in order, and always before
/// the next epoch starts mutating the grid. Staged constants in `tuning` are applied at the start
/// of each epoch; a staged shape change aborts the run with a configuration error.
pub fn run_epochs<R, F>(
    grid: &mut Grid,
    options: RunOptions,
    rng: &mut R,
    cancel: &CancellationToken,
    tuning: Option<&Tuning>,
    mut on_epoch_complete: F,
) -> Result<RunOutcome>
where
    R: Rng,
    F: FnMut(&EpochReport),
{
    let mut outcome = RunOutcome {
        epochs: 0,
        last_changes: None,
        stop: StopReason::BudgetExhausted,
    };

    for epoch in 0..options.max_epochs {
        if cancel.is_cancelled() {
            outcome.stop = StopReason::Cancelled;
            break;
        }
        if let Some(constants) = tuning.and_then(Tuning::take) {
            grid.retune(constants)?;
        }

        let started = Instant::now();
        let (changes, interrupted) = match options.mode {
            ReorderMode::Reassign => {
                let pass = reassign_pass(grid, rng, cancel);
                (pass.changes, pass.cancelled)
            }
            ReorderMode::EnergySwap => (swap_pass(grid, rng), false),
        };

        let report = EpochReport {
            epoch,
            changes,
            live_memories: grid.live_memories(),
            elapsed: started.elapsed(),
        };
        debug!(
            epoch,
            changes,
            live_memories = report.live_memories,
            elapsed_ms = report.elapsed.as_secs_f64() * 1e3,
            "epoch complete"
        );

        outcome.epochs += 1;
        outcome.last_changes = Some(changes);
        on_epoch_complete(&report);

        if interrupted {
            outcome.stop = StopReason::Cancelled;
            break;
        }
        let converged = match options.mode {
            ReorderMode::Reassign => changes < grid.constants.change_threshold,
            ReorderMode::EnergySwap => changes == 0,
        };
        if converged {
            outcome.stop = StopReason::Converged;
            break;
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{constants::Constants, memory::Memory, topology::Coords};
    use rand::{rngs::StdRng, SeedableRng};

    fn filled_grid() -> Grid {
        let mut grid = Grid::build(Constants::new(3, 3, 1.5)).unwrap();
        for i in 0..9 {
            let angle = i as f32 * 0.7;
            grid.insert(
                grid.topology().coordinates(i),
                Memory::new(vec![angle.cos(), angle.sin()]),
            )
            .unwrap();
        }
        grid
    }

    #[test]
    fn zero_budget_runs_nothing() {
        let mut grid = filled_grid();
        let mut calls = 0;
        let outcome = run_epochs(
            &mut grid,
            RunOptions::new(0, ReorderMode::Reassign),
            &mut StdRng::seed_from_u64(1),
            &CancellationToken::new(),
            None,
            |_| calls += 1,
        )
        .unwrap();

        assert_eq!(calls, 0);
        assert_eq!(outcome.epochs, 0);
        assert_eq!(outcome.stop, StopReason::BudgetExhausted);
    }

    #[test]
    fn pre_cancelled_run_stops_before_the_first_epoch() {
        let mut grid = filled_grid();
        let cancel = CancellationToken::new();
        cancel.clone().cancel();

        let outcome = run_epochs(
            &mut grid,
            RunOptions::new(5, ReorderMode::EnergySwap),
            &mut StdRng::seed_from_u64(1),
            &cancel,
            None,
            |_| panic!("no epoch should complete"),
        )
        .unwrap();

        assert_eq!(outcome.stop, StopReason::Cancelled);
        assert_eq!(outcome.epochs, 0);
    }

    #[test]
    fn cancelling_from_the_callback_finishes_the_epoch_first() {
        let mut grid = filled_grid();
        let cancel = CancellationToken::new();
        let from_callback = cancel.clone();
        let mut epochs_seen = Vec::new();

        let mut c = (**grid.constants()).clone();
        c.change_threshold = 0;
        grid.retune(c).unwrap();

        let outcome = run_epochs(
            &mut grid,
            RunOptions::new(10, ReorderMode::Reassign),
            &mut StdRng::seed_from_u64(2),
            &cancel,
            None,
            |report| {
                epochs_seen.push(report.epoch);
                from_callback.cancel();
            },
        )
        .unwrap();

        assert_eq!(epochs_seen, vec![0]);
        assert_eq!(outcome.epochs, 1);
        assert_eq!(outcome.stop, StopReason::Cancelled);
        assert_eq!(grid.live_memories(), 9);
    }

    #[test]
    fn staged_constants_apply_at_the_boundary() {
        let mut grid = filled_grid();
        let tuning = Tuning::new();
        let mut c = (**grid.constants()).clone();
        c.k0 = -0.25;
        tuning.stage(c);

        run_epochs(
            &mut grid,
            RunOptions::new(1, ReorderMode::EnergySwap),
            &mut StdRng::seed_from_u64(3),
            &CancellationToken::new(),
            Some(&tuning),
            |_| {},
        )
        .unwrap();

        assert_eq!(grid.constants().k0, -0.25);
    }

    #[test]
    fn staged_shape_change_is_rejected() {
        let mut grid = filled_grid();
        let tuning = Tuning::new();
        tuning.stage(Constants::new(4, 4, 1.5));

        let result = run_epochs(
            &mut grid,
            RunOptions::new(3, ReorderMode::Reassign),
            &mut StdRng::seed_from_u64(3),
            &CancellationToken::new(),
            Some(&tuning),
            |_| {},
        );
        assert!(result.is_err());
        assert_eq!(grid.cell(Coords::new(2, 2)).map(|c| c.store.count()), Some(1));
    }
}
