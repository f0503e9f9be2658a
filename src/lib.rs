//! A self-organizing memory grid.
//!
//! Memory vectors are placed on a 2-D grid of mini-columns by winner-take-all competition over
//! neighborhood-weighted activity, and the layout is refined epoch by epoch, either by re-running
//! the competition for stored memories or by a local search that swaps neighboring contents to
//! lower a distance energy.

pub mod core;

pub use crate::core::{
    constants::{Constants, Tuning},
    driver::{
        run_epochs, CancellationToken, EpochReport, ReorderMode, RunOptions, RunOutcome,
        StopReason,
    },
    error::{CortexError, Result},
    grid::{build_grid, Grid},
    memory::{Memory, MemoryStore},
    persist::{load_grid, save_grid},
    placement::place_memory,
    topology::Coords,
};
