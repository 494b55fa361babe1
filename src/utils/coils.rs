//! Coil combination and intensity scaling
//!
//! Coil images use the same layout as the sensitivity maps:
//! index = x + y*nx + c*nx*ny.

use num_complex::Complex64;

use crate::error::{check_len, ReconError, Result};

/// Root sum-of-squares coil combination
///
/// # Arguments
/// * `coil_images` - Per-coil complex images (nx * ny * ncoils)
/// * `n_pixels` - Pixels per coil image (nx * ny)
///
/// # Returns
/// Magnitude image sqrt(sum_c |img_c|^2) of length n_pixels
pub fn rss(coil_images: &[Complex64], n_pixels: usize) -> Result<Vec<f64>> {
    if n_pixels == 0 || coil_images.len() % n_pixels != 0 {
        return Err(ReconError::invalid(format!(
            "coil buffer of {} elements is not a whole number of {}-pixel images",
            coil_images.len(),
            n_pixels
        )));
    }

    let mut out = vec![0.0; n_pixels];
    for coil in coil_images.chunks_exact(n_pixels) {
        for (o, v) in out.iter_mut().zip(coil.iter()) {
            *o += v.norm_sqr();
        }
    }
    for o in out.iter_mut() {
        *o = o.sqrt();
    }
    Ok(out)
}

/// Rescale values linearly to span a range of width (hi - lo)
///
/// Computes (x - min) * (hi - lo) / (max - min), so min(x) maps to zero
/// rather than to `lo`. A constant input maps to all zeros.
pub fn minmax_scale(x: &[f64], lo: f64, hi: f64) -> Vec<f64> {
    let min = x.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !(range > 0.0) {
        return vec![0.0; x.len()];
    }
    x.iter().map(|&v| (v - min) * (hi - lo) / range).collect()
}

/// Magnitude of a complex image
pub fn magnitude(image: &[Complex64]) -> Vec<f64> {
    image.iter().map(|c| c.norm()).collect()
}

/// Sum of |S_c|^2 over coils for each pixel
///
/// Equals the diagonal of the fully-sampled Cartesian normal operator.
pub fn sensitivity_energy(smaps: &[Complex64], n_pixels: usize, ncoils: usize) -> Result<Vec<f64>> {
    check_len("coil sensitivity maps", n_pixels * ncoils, smaps.len())?;
    let combined = rss(smaps, n_pixels)?;
    Ok(combined.into_iter().map(|v| v * v).collect())
}
