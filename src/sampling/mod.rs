//! Sampling pattern generation
//!
//! - `cartesian`: Regular/random phase-encode undersampling masks
//! - `radial`: Golden-angle and linear radial trajectories, density compensation
//!
//! Both split an acquisition into time frames in acquisition order, giving
//! the per-frame masks a [`MultiFrameOperator`](crate::MultiFrameOperator)
//! consumes.

pub mod cartesian;
pub mod radial;

pub use cartesian::*;
pub use radial::*;

use std::ops::Range;

use crate::error::{ReconError, Result};

/// Split `count` items into `n_frames` contiguous, balanced ranges
pub(crate) fn frame_ranges(count: usize, n_frames: usize) -> Result<Vec<Range<usize>>> {
    if n_frames == 0 {
        return Err(ReconError::NoFrames);
    }
    Ok((0..n_frames)
        .map(|t| (t * count / n_frames)..((t + 1) * count / n_frames))
        .collect())
}
