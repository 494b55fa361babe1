//! Moco-Core: Motion-compensated MRI reconstruction
//!
//! This crate reconstructs images from undersampled k-space acquired while
//! the anatomy moved. Per-frame displacement fields become sparse bilinear
//! warps, which are combined with coil-weighted Fourier encoding into a
//! multi-frame forward model and inverted with conjugate gradient.
//!
//! All arrays are flat buffers in column-major (Fortran) order: pixel
//! (x, y) of an (nx, ny) image lives at `x + y*nx`, and extra axes
//! (displacement component, coil) are outermost.
//!
//! # Modules
//! - `fft`: Centered orthonormal 2D FFT using rustfft
//! - `motion`: Displacement fields and sparse bilinear motion operators
//! - `acquisition`: Cartesian and non-Cartesian (NUFFT) encoding
//! - `multiframe`: Multi-frame (Batchelor) forward model
//! - `solvers`: Iterative solvers (CG)
//! - `recon`: Reconstruction driver and zero-filled baseline
//! - `sampling`: Cartesian masks, radial trajectories and density compensation
//! - `utils`: Coil combination, SIMD vector kernels

// Core modules
pub mod error;
pub mod fft;

// Operator modules
pub mod motion;
pub mod acquisition;
pub mod multiframe;

// Inversion
pub mod solvers;
pub mod recon;

// Sampling patterns
pub mod sampling;

pub mod utils;

pub use acquisition::{
    AcquisitionOperator, CartesianAcquisition, LinearOperator, NonCartesianAcquisition, SamplingMask,
};
pub use error::{ReconError, Result};
pub use motion::{AffineMotion, Direction, DisplacementField, SparseMotionMatrix};
pub use multiframe::{FrameMotion, MotionFrame, MultiFrameOperator};
pub use recon::{reconstruct, reconstruct_with_progress, zero_filled, ReconParams};
pub use solvers::{CgReport, CgStatus};
