//! Single-frame acquisition (encoding) operators
//!
//! An acquisition maps a complex image to per-coil k-space:
//! coil sensitivity weighting, a Fourier transform and a real sampling
//! weight per k-space sample. The variant is fixed at construction:
//!
//! - [`CartesianAcquisition`]: centered orthonormal 2D FFT on the image grid
//! - [`NonCartesianAcquisition`]: NUFFT onto a trajectory with optional
//!   density compensation

pub mod cartesian;
pub mod noncartesian;
pub mod nufft;

pub use cartesian::CartesianAcquisition;
pub use noncartesian::NonCartesianAcquisition;
pub use nufft::{Ndft, NonUniformFourier, Nufft2d, NufftParams, Trajectory};

use num_complex::Complex64;

use crate::error::{ReconError, Result};

/// A linear map between flat complex buffers with a matching adjoint
pub trait LinearOperator: Sync {
    /// Length of the input (image) buffer
    fn domain_len(&self) -> usize;

    /// Length of the output (k-space) buffer
    fn range_len(&self) -> usize;

    /// y = A x
    fn forward(&self, x: &[Complex64]) -> Result<Vec<Complex64>>;

    /// x = A^H y
    fn adjoint(&self, y: &[Complex64]) -> Result<Vec<Complex64>>;

    /// A^H A x
    fn normal(&self, x: &[Complex64]) -> Result<Vec<Complex64>> {
        let y = self.forward(x)?;
        self.adjoint(&y)
    }
}

/// Real per-sample weights selecting the k-space samples of one frame
///
/// Binary masks are the common case but fractional weights are allowed.
/// Cartesian masks have one entry per image pixel and are shared by all
/// coils; non-Cartesian masks have one entry per trajectory sample.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplingMask {
    weights: Vec<f64>,
}

impl SamplingMask {
    /// Wrap sample weights, rejecting non-finite values
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if let Some(pos) = weights.iter().position(|w| !w.is_finite()) {
            return Err(ReconError::invalid(format!(
                "sampling mask has non-finite weight at index {}",
                pos
            )));
        }
        Ok(Self { weights })
    }

    /// Binary mask from sampled flags
    pub fn from_bools(sampled: &[bool]) -> Self {
        Self {
            weights: sampled.iter().map(|&s| if s { 1.0 } else { 0.0 }).collect(),
        }
    }

    /// Every sample acquired with weight 1
    pub fn full(len: usize) -> Self {
        Self { weights: vec![1.0; len] }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// True if the mask has no entries
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Per-sample weights
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Number of samples with non-zero weight
    pub fn sampled_count(&self) -> usize {
        self.weights.iter().filter(|&&w| w != 0.0).count()
    }
}

/// Acquisition model of one time frame, Cartesian or non-Cartesian
#[derive(Clone, Debug)]
pub enum AcquisitionOperator {
    /// Samples on the image's own Cartesian grid
    Cartesian(CartesianAcquisition),
    /// Samples along an arbitrary trajectory
    NonCartesian(NonCartesianAcquisition),
}

impl From<CartesianAcquisition> for AcquisitionOperator {
    fn from(op: CartesianAcquisition) -> Self {
        Self::Cartesian(op)
    }
}

impl From<NonCartesianAcquisition> for AcquisitionOperator {
    fn from(op: NonCartesianAcquisition) -> Self {
        Self::NonCartesian(op)
    }
}

impl AcquisitionOperator {
    /// Image dimensions (nx, ny)
    pub fn image_dims(&self) -> (usize, usize) {
        match self {
            Self::Cartesian(op) => op.image_dims(),
            Self::NonCartesian(op) => op.image_dims(),
        }
    }

    /// Number of receiver coils
    pub fn ncoils(&self) -> usize {
        match self {
            Self::Cartesian(op) => op.ncoils(),
            Self::NonCartesian(op) => op.ncoils(),
        }
    }

    /// Length of the per-coil k-space of all coils
    pub fn kspace_len(&self) -> usize {
        match self {
            Self::Cartesian(op) => op.kspace_len(),
            Self::NonCartesian(op) => op.kspace_len(),
        }
    }

    /// Length a sampling mask must have
    pub fn mask_len(&self) -> usize {
        match self {
            Self::Cartesian(op) => op.mask_len(),
            Self::NonCartesian(op) => op.mask_len(),
        }
    }

    /// Mask acquiring every sample
    pub fn full_mask(&self) -> SamplingMask {
        SamplingMask::full(self.mask_len())
    }

    /// Image (nx * ny) to masked multi-coil k-space
    pub fn forward(&self, image: &[Complex64], mask: &SamplingMask) -> Result<Vec<Complex64>> {
        match self {
            Self::Cartesian(op) => op.forward(image, mask),
            Self::NonCartesian(op) => op.forward(image, mask),
        }
    }

    /// Masked multi-coil k-space to coil-combined image
    pub fn adjoint(&self, kspace: &[Complex64], mask: &SamplingMask) -> Result<Vec<Complex64>> {
        match self {
            Self::Cartesian(op) => op.adjoint(kspace, mask),
            Self::NonCartesian(op) => op.adjoint(kspace, mask),
        }
    }
}

/// Validate a (nx, ny, ncoils) coil map buffer
pub(crate) fn check_smaps(smaps: &[Complex64], nx: usize, ny: usize, ncoils: usize) -> Result<()> {
    if nx == 0 || ny == 0 {
        return Err(ReconError::invalid(format!(
            "image dimensions must be non-zero, got {}x{}",
            nx, ny
        )));
    }
    if ncoils == 0 {
        return Err(ReconError::invalid("at least one coil is required"));
    }
    crate::error::check_len("coil sensitivity maps", nx * ny * ncoils, smaps.len())
}
