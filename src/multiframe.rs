//! Multi-frame motion-compensated forward model (Batchelor operator)
//!
//! The acquisition is split into T motion states. Frame t warps the static
//! image by its motion, encodes it with its own sampling mask, and all
//! frames are summed into one k-space:
//!
//! forward: y = sum_t E_t(W_t x)
//! adjoint: x = sum_t W_t^T E_t^H(y)
//!
//! E_t^H is the exact adjoint of E_t but W_t^T only approximates the inverse
//! warp (see [`SparseMotionMatrix`]), so the pair is an approximate adjoint
//! pair unless every motion is a permutation.
//!
//! Frames are evaluated in parallel with rayon and reduced in frame order,
//! so results do not depend on the thread count.

use num_complex::Complex64;
use rayon::prelude::*;
use tracing::debug;

use crate::acquisition::{AcquisitionOperator, LinearOperator, SamplingMask};
use crate::error::{check_len, ReconError, Result};
use crate::motion::{DisplacementField, Direction, SparseMotionMatrix};
use crate::utils::add_assign;

/// Motion state of one time frame
#[derive(Clone, Debug)]
pub enum FrameMotion {
    /// Anatomy at the reference position
    Static,
    /// Anatomy displaced by a sparse bilinear warp
    Warp(SparseMotionMatrix),
}

impl FrameMotion {
    fn apply(&self, image: &[Complex64], direction: Direction) -> Result<Vec<Complex64>> {
        match self {
            Self::Static => Ok(image.to_vec()),
            Self::Warp(matrix) => matrix.apply(image, direction),
        }
    }
}

/// One time frame: motion state plus the k-space samples acquired in it
#[derive(Clone, Debug)]
pub struct MotionFrame {
    /// Where the anatomy was during the frame
    pub motion: FrameMotion,
    /// Samples acquired during the frame
    pub mask: SamplingMask,
}

impl MotionFrame {
    /// Frame with the given motion state
    pub fn new(motion: FrameMotion, mask: SamplingMask) -> Self {
        Self { motion, mask }
    }

    /// Frame without motion
    pub fn fixed(mask: SamplingMask) -> Self {
        Self { motion: FrameMotion::Static, mask }
    }
}

/// Sum over time frames of warped, encoded images
#[derive(Clone, Debug)]
pub struct MultiFrameOperator {
    acquisition: AcquisitionOperator,
    frames: Vec<MotionFrame>,
}

impl MultiFrameOperator {
    /// Combine an acquisition model with per-frame motion and masks
    ///
    /// Fails on an empty frame list, on masks of the wrong length and on
    /// motion matrices built for a different image size.
    pub fn new(acquisition: AcquisitionOperator, frames: Vec<MotionFrame>) -> Result<Self> {
        if frames.is_empty() {
            return Err(ReconError::NoFrames);
        }
        let dims = acquisition.image_dims();
        for frame in &frames {
            check_len("frame sampling mask", acquisition.mask_len(), frame.mask.len())?;
            if let FrameMotion::Warp(m) = &frame.motion {
                if m.dims() != dims {
                    let (nx, ny) = m.dims();
                    return Err(ReconError::dimension("frame motion matrix", dims.0 * dims.1, nx * ny));
                }
            }
        }

        debug!(
            frames = frames.len(),
            moving = frames.iter().filter(|f| matches!(f.motion, FrameMotion::Warp(_))).count(),
            ncoils = acquisition.ncoils(),
            "assembled multi-frame operator"
        );

        Ok(Self { acquisition, frames })
    }

    /// Build one motion matrix per displacement field (in parallel)
    ///
    /// `fields[t]` and `masks[t]` describe frame t.
    pub fn from_displacement_fields(
        acquisition: AcquisitionOperator,
        fields: &[DisplacementField],
        masks: Vec<SamplingMask>,
    ) -> Result<Self> {
        check_len("per-frame sampling masks", fields.len(), masks.len())?;
        let matrices: Vec<SparseMotionMatrix> = fields.par_iter().map(SparseMotionMatrix::build).collect();
        let frames = matrices
            .into_iter()
            .zip(masks)
            .map(|(m, mask)| MotionFrame::new(FrameMotion::Warp(m), mask))
            .collect();
        Self::new(acquisition, frames)
    }

    /// Single motion-free frame
    pub fn single_frame(acquisition: AcquisitionOperator, mask: SamplingMask) -> Result<Self> {
        Self::new(acquisition, vec![MotionFrame::fixed(mask)])
    }

    /// Shared acquisition model
    pub fn acquisition(&self) -> &AcquisitionOperator {
        &self.acquisition
    }

    /// Time frames in acquisition order
    pub fn frames(&self) -> &[MotionFrame] {
        &self.frames
    }

    /// Number of time frames
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    /// Image dimensions (nx, ny)
    pub fn image_dims(&self) -> (usize, usize) {
        self.acquisition.image_dims()
    }

    /// Contribution of frame t alone: E_t(W_t x)
    pub fn frame_forward(&self, t: usize, image: &[Complex64]) -> Result<Vec<Complex64>> {
        let frame = self.frame(t)?;
        let warped = frame.motion.apply(image, Direction::Forward)?;
        self.acquisition.forward(&warped, &frame.mask)
    }

    /// Contribution of frame t alone: W_t^T E_t^H(y)
    pub fn frame_adjoint(&self, t: usize, kspace: &[Complex64]) -> Result<Vec<Complex64>> {
        let frame = self.frame(t)?;
        let image = self.acquisition.adjoint(kspace, &frame.mask)?;
        frame.motion.apply(&image, Direction::Transpose)
    }

    fn frame(&self, t: usize) -> Result<&MotionFrame> {
        self.frames.get(t).ok_or_else(|| {
            ReconError::invalid(format!("frame index {} out of range for {} frames", t, self.frames.len()))
        })
    }

    fn sum_frames<F>(&self, len: usize, per_frame: F) -> Result<Vec<Complex64>>
    where
        F: Fn(usize) -> Result<Vec<Complex64>> + Sync + Send,
    {
        let parts: Vec<Vec<Complex64>> = (0..self.frames.len())
            .into_par_iter()
            .map(per_frame)
            .collect::<Result<_>>()?;
        let mut acc = vec![Complex64::new(0.0, 0.0); len];
        for part in &parts {
            add_assign(&mut acc, part);
        }
        Ok(acc)
    }
}

impl LinearOperator for MultiFrameOperator {
    fn domain_len(&self) -> usize {
        let (nx, ny) = self.image_dims();
        nx * ny
    }

    fn range_len(&self) -> usize {
        self.acquisition.kspace_len()
    }

    fn forward(&self, x: &[Complex64]) -> Result<Vec<Complex64>> {
        check_len("multi-frame image", self.domain_len(), x.len())?;
        self.sum_frames(self.range_len(), |t| self.frame_forward(t, x))
    }

    fn adjoint(&self, y: &[Complex64]) -> Result<Vec<Complex64>> {
        check_len("multi-frame k-space", self.range_len(), y.len())?;
        self.sum_frames(self.domain_len(), |t| self.frame_adjoint(t, y))
    }
}
