//! Motion-compensated reconstruction
//!
//! Solves E^H E x = E^H y with conjugate gradient, where E is any
//! [`LinearOperator`], typically a [`MultiFrameOperator`](crate::MultiFrameOperator).

use num_complex::Complex64;
use tracing::info;

use crate::acquisition::LinearOperator;
use crate::error::{check_len, Result};
use crate::solvers::{cg_solve_with_progress, CgReport};

/// Parameters for CG reconstruction
#[derive(Clone, Debug, PartialEq)]
pub struct ReconParams {
    /// Maximum CG iterations (default 20)
    pub max_iter: usize,
    /// Stop when the squared residual norm drops to this value (default 1e-10)
    ///
    /// Not normalized: scale it with the k-space magnitude.
    pub tol: f64,
}

impl Default for ReconParams {
    fn default() -> Self {
        Self { max_iter: 20, tol: 1e-10 }
    }
}

/// Reconstruct an image from k-space with the default progress sink
pub fn reconstruct<O>(op: &O, kspace: &[Complex64], params: &ReconParams) -> Result<CgReport>
where
    O: LinearOperator + ?Sized,
{
    reconstruct_with_progress(op, kspace, params, |_, _| {})
}

/// Reconstruct an image, calling `progress(iteration, residual_energy)`
/// after every CG iteration
pub fn reconstruct_with_progress<O, P>(
    op: &O,
    kspace: &[Complex64],
    params: &ReconParams,
    progress: P,
) -> Result<CgReport>
where
    O: LinearOperator + ?Sized,
    P: FnMut(usize, f64),
{
    check_len("reconstruction k-space", op.range_len(), kspace.len())?;

    info!(
        image_len = op.domain_len(),
        kspace_len = op.range_len(),
        max_iter = params.max_iter,
        tol = params.tol,
        "reconstructing"
    );

    let rhs = op.adjoint(kspace)?;
    cg_solve_with_progress(|p| op.normal(p), &rhs, params.tol, params.max_iter, progress)
}

/// Zero-filled baseline: the adjoint applied to the measured k-space
pub fn zero_filled<O>(op: &O, kspace: &[Complex64]) -> Result<Vec<Complex64>>
where
    O: LinearOperator + ?Sized,
{
    check_len("reconstruction k-space", op.range_len(), kspace.len())?;
    op.adjoint(kspace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{CartesianAcquisition, SamplingMask};
    use crate::multiframe::MultiFrameOperator;
    use crate::solvers::CgStatus;

    #[test]
    fn test_fully_sampled_single_coil_converges_in_one_step() {
        // E^H E = I for a fully sampled unit-coil Cartesian acquisition
        let (nx, ny) = (4, 5);
        let op = MultiFrameOperator::single_frame(
            CartesianAcquisition::single_coil(nx, ny).unwrap().into(),
            SamplingMask::full(nx * ny),
        )
        .unwrap();
        let truth: Vec<Complex64> = (0..nx * ny).map(|i| Complex64::new(i as f64, 1.0)).collect();
        let kspace = op.forward(&truth).unwrap();

        let report = reconstruct(&op, &kspace, &ReconParams::default()).unwrap();
        assert_eq!(report.status, CgStatus::Converged);
        assert_eq!(report.iterations, 1);
        for (a, b) in report.solution.iter().zip(truth.iter()) {
            assert!((a - b).norm() < 1e-10);
        }
    }

    #[test]
    fn test_weak_sampling_weights_still_reconstruct() {
        // Mask weight 1e-8 gives E^H E = 1e-16 * I
        let (nx, ny) = (4, 4);
        let op = MultiFrameOperator::single_frame(
            CartesianAcquisition::single_coil(nx, ny).unwrap().into(),
            SamplingMask::new(vec![1e-8; nx * ny]).unwrap(),
        )
        .unwrap();
        let truth: Vec<Complex64> = (0..nx * ny).map(|i| Complex64::new(1.0 + i as f64, -0.5)).collect();
        let kspace = op.forward(&truth).unwrap();

        let params = ReconParams { max_iter: 5, tol: 0.0 };
        let report = reconstruct(&op, &kspace, &params).unwrap();
        assert_ne!(report.status, CgStatus::Breakdown);
        for (a, b) in report.solution.iter().zip(truth.iter()) {
            assert!((a - b).norm() < 1e-8 * b.norm(), "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_wrong_kspace_length() {
        let op = MultiFrameOperator::single_frame(
            CartesianAcquisition::single_coil(3, 3).unwrap().into(),
            SamplingMask::full(9),
        )
        .unwrap();
        let kspace = vec![Complex64::new(0.0, 0.0); 8];
        assert!(reconstruct(&op, &kspace, &ReconParams::default()).is_err());
        assert!(zero_filled(&op, &kspace).is_err());
    }

    #[test]
    fn test_default_params() {
        let p = ReconParams::default();
        assert_eq!(p.max_iter, 20);
        assert_eq!(p.tol, 1e-10);
    }
}
