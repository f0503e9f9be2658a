//! Run constants shared by every activity and super-activity computation.
//!
//! Constants are built once per run and frozen into an `Arc` snapshot for each epoch, so the
//! parallel passes never observe a half-written value. A UI that wants to live-tune them stages
//! a replacement through a [`Tuning`] handle; the driver swaps it in at the next epoch boundary.

use super::error::{CortexError, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Convergence threshold on the number of relocated memories per epoch.
pub const DEFAULT_CHANGE_THRESHOLD: usize = 10;

/// How many of a cell's most recent memories a reassignment epoch revisits.
pub const DEFAULT_REASSIGN_WINDOW: usize = 16;

/// Tunable parameters of the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constants {
    /// Similarity zero-point. Similarities above it attract, below it repel.
    pub k0: f32,

    /// Similarity an empty cell pretends to hold when scoring itself.
    pub k2: f32,

    /// Super-activity level at which a cell counts as "super active" for display.
    pub k4: f32,

    /// Weights of positive activity, indexed by rounded neighbor distance.
    /// Index 0 is the cell itself.
    pub positive_k: Vec<f32>,

    /// Weights of negative activity, indexed like `positive_k`.
    pub negative_k: Vec<f32>,

    /// Grid width in cells.
    pub width: usize,

    /// Grid height in cells.
    pub height: usize,

    /// Euclidean neighborhood radius in cell units.
    pub radius: f32,

    /// Only allocate cells inside the disc inscribed in the grid.
    pub center_only: bool,

    /// Number of most-recent memories per cell revisited by one reassignment epoch.
    pub reassign_window: usize,

    /// Reassignment converges once an epoch relocates fewer memories than this.
    pub change_threshold: usize,
}

impl Constants {
    /// Reference constants for a `width` x `height` grid with the given neighborhood radius.
    pub fn new(width: usize, height: usize, radius: f32) -> Self {
        Self {
            k0: 0.3,
            k2: 0.5,
            k4: 0.0,
            positive_k: vec![1.0, 0.5, 0.25, 0.125],
            negative_k: vec![1.0, 0.5, 0.25, 0.125],
            width,
            height,
            radius,
            center_only: false,
            reassign_window: DEFAULT_REASSIGN_WINDOW,
            change_threshold: DEFAULT_CHANGE_THRESHOLD,
        }
    }

    /// Checks everything that must hold before a grid is built from these constants.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CortexError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(CortexError::InvalidRadius(self.radius));
        }
        if self.positive_k.is_empty() {
            return Err(CortexError::EmptyWeightCurve("positive_k"));
        }
        if self.negative_k.is_empty() {
            return Err(CortexError::EmptyWeightCurve("negative_k"));
        }
        Ok(())
    }

    /// Returns the (positive, negative) weights for a neighbor at `distance`.
    /// Ranks past the end of a curve weigh nothing.
    #[inline]
    pub fn weights_at(&self, distance: f32) -> (f32, f32) {
        let rank = distance.round() as usize;
        (
            self.positive_k.get(rank).copied().unwrap_or(0.0),
            self.negative_k.get(rank).copied().unwrap_or(0.0),
        )
    }

    /// True if `other` describes the same grid layout, so it can replace `self` on a live grid.
    pub fn same_shape(&self, other: &Constants) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.radius == other.radius
            && self.center_only == other.center_only
    }
}

/// Staging slot for constants edited outside the driver thread.
///
/// Cloning shares the slot. Only the last staged value before an epoch boundary is applied.
#[derive(Debug, Clone, Default)]
pub struct Tuning {
    pending: Arc<Mutex<Option<Constants>>>,
}

impl Tuning {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `constants` for the next epoch boundary, replacing any earlier staged value.
    pub fn stage(&self, constants: Constants) {
        let mut slot = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(constants);
    }

    /// Takes the staged constants, if any.
    pub fn take(&self) -> Option<Constants> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}
