//! Cartesian phase-encode undersampling
//!
//! Masks select whole phase-encode lines along the second image axis (y)
//! and are broadcast along the readout axis (x). A block of `n_ref` lines
//! around the k-space centre is always acquired.

use rand::Rng;
use tracing::info;

use super::frame_ranges;
use crate::acquisition::SamplingMask;
use crate::error::{ReconError, Result};
use crate::fft::idx2d;

/// How the outer phase-encode lines are chosen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UndersamplingMode {
    /// Every R-th line, as in parallel imaging
    Regular,
    /// Each line independently with probability 1/R, as in compressed sensing
    Random,
}

/// Parameters for Cartesian mask generation
#[derive(Clone, Debug, PartialEq)]
pub struct CartesianMaskParams {
    /// Desired acceleration factor R (default 4)
    pub acceleration: usize,
    /// Fully sampled centre lines (default 20)
    pub n_ref: usize,
    /// Outer line selection (default regular)
    pub mode: UndersamplingMode,
}

impl Default for CartesianMaskParams {
    fn default() -> Self {
        Self {
            acceleration: 4,
            n_ref: 20,
            mode: UndersamplingMode::Regular,
        }
    }
}

/// Select phase-encode lines out of `n_pe`
///
/// `rng` is only drawn from in random mode.
pub fn phase_encode_lines<R: Rng>(
    n_pe: usize,
    params: &CartesianMaskParams,
    rng: &mut R,
) -> Result<Vec<bool>> {
    if params.acceleration == 0 {
        return Err(ReconError::invalid("acceleration factor must be at least 1"));
    }
    if n_pe == 0 {
        return Err(ReconError::invalid("number of phase-encode lines must be positive"));
    }

    let r = params.acceleration;
    let mut lines: Vec<bool> = match params.mode {
        UndersamplingMode::Regular => (0..n_pe).map(|i| i % r == 0).collect(),
        UndersamplingMode::Random => {
            let p = 1.0 / r as f64;
            (0..n_pe).map(|_| rng.random_bool(p)).collect()
        }
    };

    let start = (n_pe / 2).saturating_sub(params.n_ref / 2);
    let end = (n_pe / 2 + params.n_ref / 2).min(n_pe);
    for line in &mut lines[start..end] {
        *line = true;
    }

    let sampled = lines.iter().filter(|&&l| l).count();
    info!(
        n_pe,
        sampled,
        effective_acceleration = n_pe as f64 / sampled.max(1) as f64,
        "generated Cartesian undersampling pattern"
    );

    Ok(lines)
}

/// Broadcast phase-encode lines over `nx` readout points into an (nx, ny) mask
pub fn lines_to_mask(nx: usize, lines: &[bool]) -> SamplingMask {
    let ny = lines.len();
    let mut sampled = vec![false; nx * ny];
    for (y, &line) in lines.iter().enumerate() {
        if line {
            for x in 0..nx {
                sampled[idx2d(x, y, nx)] = true;
            }
        }
    }
    SamplingMask::from_bools(&sampled)
}

/// Undersampling mask of an (nx, ny) image
pub fn generate_mask<R: Rng>(
    nx: usize,
    ny: usize,
    params: &CartesianMaskParams,
    rng: &mut R,
) -> Result<SamplingMask> {
    let lines = phase_encode_lines(ny, params, rng)?;
    Ok(lines_to_mask(nx, &lines))
}

/// Distribute the sampled lines over `n_frames` time frames
///
/// Lines are acquired in increasing y order and each frame receives a
/// contiguous block, so the frame masks are disjoint and their union is
/// the input pattern.
pub fn split_lines_into_frames(nx: usize, lines: &[bool], n_frames: usize) -> Result<Vec<SamplingMask>> {
    let acquired: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter_map(|(y, &l)| l.then_some(y))
        .collect();

    Ok(frame_ranges(acquired.len(), n_frames)?
        .into_iter()
        .map(|range| {
            let mut frame_lines = vec![false; lines.len()];
            for &y in &acquired[range] {
                frame_lines[y] = true;
            }
            lines_to_mask(nx, &frame_lines)
        })
        .collect())
}
