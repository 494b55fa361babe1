//! SIMD-accelerated vector kernels for the CG solver
//!
//! All CG scalars (alpha, beta, residual energy) are real, so every update
//! acts on the interleaved (re, im) representation of a complex buffer as a
//! plain real vector. When the `simd` feature is enabled the kernels use
//! 256-bit `f64x4` lanes, i.e. two complex values per step.
//!
//! All operations have scalar fallbacks when SIMD is disabled.

use num_complex::Complex64;

#[cfg(feature = "simd")]
use wide::f64x4;

/// Complex values per SIMD step
#[cfg(feature = "simd")]
pub const SIMD_WIDTH: usize = 2;

#[cfg(not(feature = "simd"))]
pub const SIMD_WIDTH: usize = 1;

#[cfg(feature = "simd")]
#[inline(always)]
fn load(a: &[Complex64], idx: usize) -> f64x4 {
    f64x4::from([a[idx].re, a[idx].im, a[idx + 1].re, a[idx + 1].im])
}

#[cfg(feature = "simd")]
#[inline(always)]
fn store(a: &mut [Complex64], idx: usize, v: f64x4) {
    let arr = v.to_array();
    a[idx] = Complex64::new(arr[0], arr[1]);
    a[idx + 1] = Complex64::new(arr[2], arr[3]);
}

// ============================================================================
// Reductions
// ============================================================================

/// Compute Re(sum(conj(a[i]) * b[i]))
#[cfg(feature = "simd")]
#[inline]
pub fn real_inner(a: &[Complex64], b: &[Complex64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let chunks = n / SIMD_WIDTH;

    let mut sum = f64x4::ZERO;
    for i in 0..chunks {
        let idx = i * SIMD_WIDTH;
        sum += load(a, idx) * load(b, idx);
    }

    let mut result = sum.reduce_add();
    for i in chunks * SIMD_WIDTH..n {
        result += a[i].re * b[i].re + a[i].im * b[i].im;
    }
    result
}

#[cfg(not(feature = "simd"))]
#[inline]
pub fn real_inner(a: &[Complex64], b: &[Complex64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(ai, bi)| ai.re * bi.re + ai.im * bi.im)
        .sum()
}

/// Compute sum(|a[i]|^2)
#[cfg(feature = "simd")]
#[inline]
pub fn norm_squared(a: &[Complex64]) -> f64 {
    let n = a.len();
    let chunks = n / SIMD_WIDTH;

    let mut sum = f64x4::ZERO;
    for i in 0..chunks {
        let va = load(a, i * SIMD_WIDTH);
        sum += va * va;
    }

    let mut result = sum.reduce_add();
    for i in chunks * SIMD_WIDTH..n {
        result += a[i].norm_sqr();
    }
    result
}

#[cfg(not(feature = "simd"))]
#[inline]
pub fn norm_squared(a: &[Complex64]) -> f64 {
    a.iter().map(|ai| ai.norm_sqr()).sum()
}

// ============================================================================
// Updates
// ============================================================================

/// Compute a[i] = a[i] + alpha * b[i] (axpy operation)
#[cfg(feature = "simd")]
#[inline]
pub fn axpy(a: &mut [Complex64], alpha: f64, b: &[Complex64]) {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let chunks = n / SIMD_WIDTH;
    let valpha = f64x4::splat(alpha);

    for i in 0..chunks {
        let idx = i * SIMD_WIDTH;
        let result = load(a, idx) + valpha * load(b, idx);
        store(a, idx, result);
    }
    for i in chunks * SIMD_WIDTH..n {
        a[i] += b[i] * alpha;
    }
}

#[cfg(not(feature = "simd"))]
#[inline]
pub fn axpy(a: &mut [Complex64], alpha: f64, b: &[Complex64]) {
    debug_assert_eq!(a.len(), b.len());
    for (ai, bi) in a.iter_mut().zip(b.iter()) {
        *ai += *bi * alpha;
    }
}

/// Compute a[i] = b[i] + beta * a[i] (used in CG for p update)
#[cfg(feature = "simd")]
#[inline]
pub fn xpby(a: &mut [Complex64], b: &[Complex64], beta: f64) {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let chunks = n / SIMD_WIDTH;
    let vbeta = f64x4::splat(beta);

    for i in 0..chunks {
        let idx = i * SIMD_WIDTH;
        let result = load(b, idx) + vbeta * load(a, idx);
        store(a, idx, result);
    }
    for i in chunks * SIMD_WIDTH..n {
        a[i] = b[i] + a[i] * beta;
    }
}

#[cfg(not(feature = "simd"))]
#[inline]
pub fn xpby(a: &mut [Complex64], b: &[Complex64], beta: f64) {
    debug_assert_eq!(a.len(), b.len());
    for (ai, bi) in a.iter_mut().zip(b.iter()) {
        *ai = *bi + *ai * beta;
    }
}

/// Compute out[i] = out[i] + a[i]
#[inline]
pub fn add_assign(out: &mut [Complex64], a: &[Complex64]) {
    debug_assert_eq!(out.len(), a.len());
    for (o, ai) in out.iter_mut().zip(a.iter()) {
        *o += *ai;
    }
}
