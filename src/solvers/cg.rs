//! Conjugate gradient solver
//!
//! Solves the Hermitian positive semi-definite system A x = b, where A is
//! given as a closure. For reconstruction A is the normal operator E^H E
//! and b = E^H y.
//!
//! The tolerance applies to the un-normalized residual energy
//! Re(r^H r), so it scales with the magnitude of b.
//!
//! Reference:
//! Hestenes, M.R., Stiefel, E. (1952). "Methods of conjugate gradients for
//! solving linear systems." J. Res. Natl. Bur. Stand. 49(6):409-436.

use num_complex::Complex64;
use tracing::{debug, info, warn};

use crate::error::{check_len, ReconError, Result};
use crate::utils::simd_ops::{axpy, norm_squared, real_inner, xpby};

/// Smallest Rayleigh quotient p^H A p / p^H p accepted as positive
/// curvature, relative to the largest one seen so far in the same solve
const BREAKDOWN_CURVATURE: f64 = 1e-14;

/// Why the iteration stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CgStatus {
    /// Residual energy reached the tolerance
    Converged,
    /// Iteration cap reached first
    MaxIterations,
    /// Search direction had (near) zero or non-finite curvature
    Breakdown,
}

/// Solution and diagnostics of one CG run
#[derive(Clone, Debug)]
pub struct CgReport {
    /// Last iterate
    pub solution: Vec<Complex64>,
    /// Completed iterations
    pub iterations: usize,
    /// Final Re(r^H r)
    pub residual_energy: f64,
    /// Why the iteration stopped
    pub status: CgStatus,
}

impl CgReport {
    /// True if the residual energy reached the tolerance
    pub fn converged(&self) -> bool {
        self.status == CgStatus::Converged
    }
}

/// Conjugate gradient from x = 0
///
/// # Arguments
/// * `a_op` - Closure that computes A*x
/// * `b` - Right-hand side vector
/// * `tol` - Stop when Re(r^H r) <= tol
/// * `max_iter` - Maximum iterations
///
/// Breakdown and the iteration cap are not errors; the report carries the
/// last iterate. Errors come only from `a_op` or a length mismatch.
pub fn cg_solve<F>(a_op: F, b: &[Complex64], tol: f64, max_iter: usize) -> Result<CgReport>
where
    F: FnMut(&[Complex64]) -> Result<Vec<Complex64>>,
{
    cg_solve_with_progress(a_op, b, tol, max_iter, |_, _| {})
}

/// Conjugate gradient with a progress callback
///
/// `progress(iteration, residual_energy)` is called after each iteration.
pub fn cg_solve_with_progress<F, P>(
    mut a_op: F,
    b: &[Complex64],
    tol: f64,
    max_iter: usize,
    mut progress: P,
) -> Result<CgReport>
where
    F: FnMut(&[Complex64]) -> Result<Vec<Complex64>>,
    P: FnMut(usize, f64),
{
    if tol.is_nan() || tol < 0.0 {
        return Err(ReconError::invalid(format!("CG tolerance must be non-negative, got {}", tol)));
    }

    let n = b.len();
    let mut x = vec![Complex64::new(0.0, 0.0); n];
    let mut r = b.to_vec();
    let mut p = r.clone();
    let mut rtr = norm_squared(&r);
    let mut iterations = 0;
    let mut max_curvature = 0.0f64;

    info!(n, tol, max_iter, initial_residual_energy = rtr, "starting CG");

    let status = loop {
        if rtr <= tol {
            break CgStatus::Converged;
        }
        if iterations >= max_iter {
            break CgStatus::MaxIterations;
        }

        let ap = a_op(&p)?;
        check_len("CG operator output", n, ap.len())?;

        let pap = real_inner(&p, &ap);
        let ptp = norm_squared(&p);
        if !pap.is_finite() || pap <= 0.0 || pap <= BREAKDOWN_CURVATURE * max_curvature * ptp {
            break CgStatus::Breakdown;
        }
        max_curvature = max_curvature.max(pap / ptp);

        let alpha = rtr / pap;
        if !alpha.is_finite() {
            break CgStatus::Breakdown;
        }
        axpy(&mut x, alpha, &p);
        axpy(&mut r, -alpha, &ap);

        let rtr_new = norm_squared(&r);
        let beta = rtr_new / rtr;
        rtr = rtr_new;
        xpby(&mut p, &r, beta);
        iterations += 1;

        debug!(iteration = iterations, residual_energy = rtr, alpha, beta, "CG iteration");
        progress(iterations, rtr);
    };

    match status {
        CgStatus::Converged => info!(iterations, residual_energy = rtr, "CG converged"),
        CgStatus::MaxIterations => warn!(
            iterations,
            residual_energy = rtr,
            tol,
            "CG stopped at the iteration cap before reaching tolerance"
        ),
        CgStatus::Breakdown => warn!(
            iterations,
            residual_energy = rtr,
            "CG breakdown: search direction has no positive curvature"
        ),
    }

    Ok(CgReport { solution: x, iterations, residual_energy: rtr, status })
}
