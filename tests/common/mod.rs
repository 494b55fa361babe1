//! Common test utilities for moco-core integration tests

#![allow(dead_code)]

use moco_core::fft::idx2d;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Compute RMSE between two complex images
pub fn rmse(a: &[Complex64], b: &[Complex64]) -> f64 {
    assert_eq!(a.len(), b.len());
    if a.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).norm_sqr()).sum();
    (sum_sq / a.len() as f64).sqrt()
}

/// Compute NRMSE, normalized by the RMS of the ground truth `b`
pub fn nrmse(a: &[Complex64], b: &[Complex64]) -> f64 {
    let rms_b = (b.iter().map(|v| v.norm_sqr()).sum::<f64>() / b.len() as f64).sqrt();
    if rms_b == 0.0 {
        return 0.0;
    }
    rmse(a, b) / rms_b
}

/// Compute Pearson correlation coefficient of two magnitude images
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let sum_a: f64 = a.iter().sum();
    let sum_b: f64 = b.iter().sum();
    let sum_ab: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let sum_a2: f64 = a.iter().map(|x| x * x).sum();
    let sum_b2: f64 = b.iter().map(|y| y * y).sum();

    let numerator = n * sum_ab - sum_a * sum_b;
    let denominator = ((n * sum_a2 - sum_a * sum_a) * (n * sum_b2 - sum_b * sum_b)).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

/// <a, b> = sum conj(a) * b
pub fn inner(a: &[Complex64], b: &[Complex64]) -> Complex64 {
    a.iter().zip(b.iter()).map(|(x, y)| x.conj() * y).sum()
}

/// Uniform random complex buffer in [-1, 1] + i[-1, 1]
pub fn random_complex(n: usize, seed: u64) -> Vec<Complex64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let re: f64 = rng.random::<f64>() * 2.0 - 1.0;
            let im: f64 = rng.random::<f64>() * 2.0 - 1.0;
            Complex64::new(re, im)
        })
        .collect()
}

/// Two ellipses with a smooth phase, zero on a `border`-pixel frame
pub fn ellipse_phantom(nx: usize, ny: usize, border: usize) -> Vec<Complex64> {
    let cx = nx as f64 / 2.0;
    let cy = ny as f64 / 2.0;
    let mut img = vec![Complex64::new(0.0, 0.0); nx * ny];
    for y in border..ny - border {
        for x in border..nx - border {
            let u = (x as f64 - cx) / (0.35 * nx as f64);
            let v = (y as f64 - cy) / (0.4 * ny as f64);
            let mut mag = 0.0;
            if u * u + v * v <= 1.0 {
                mag += 1.0;
            }
            let u2 = (x as f64 - cx - 0.1 * nx as f64) / (0.12 * nx as f64);
            let v2 = (y as f64 - cy) / (0.15 * ny as f64);
            if u2 * u2 + v2 * v2 <= 1.0 {
                mag += 0.5;
            }
            let phase = 0.3 * (x as f64 / nx as f64) - 0.2 * (y as f64 / ny as f64);
            img[idx2d(x, y, nx)] = Complex64::from_polar(mag, phase);
        }
    }
    img
}

/// Sum of isotropic Gaussian blobs, band-limited well inside |k| < 0.5
pub fn gaussian_phantom(nx: usize, ny: usize, sigma: f64) -> Vec<Complex64> {
    let blobs = [(0.5, 0.5, 1.0), (0.35, 0.6, 0.6), (0.65, 0.4, -0.4)];
    let mut img = vec![Complex64::new(0.0, 0.0); nx * ny];
    for y in 0..ny {
        for x in 0..nx {
            let mut v = Complex64::new(0.0, 0.0);
            for &(bx, by, amp) in &blobs {
                let dx = x as f64 - bx * nx as f64;
                let dy = y as f64 - by * ny as f64;
                let g = (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
                v += Complex64::new(amp * g, 0.3 * amp * g);
            }
            img[idx2d(x, y, nx)] = v;
        }
    }
    img
}

/// Smooth synthetic coil maps normalized to sum_c |S_c|^2 = 1 at every pixel
///
/// Coils sit on a circle around the image; each map decays with distance to
/// its coil and carries a linear phase.
pub fn normalized_coil_maps(nx: usize, ny: usize, ncoils: usize) -> Vec<Complex64> {
    let n = nx * ny;
    let mut maps = vec![Complex64::new(0.0, 0.0); n * ncoils];
    for c in 0..ncoils {
        let a = 2.0 * std::f64::consts::PI * c as f64 / ncoils as f64;
        let px = nx as f64 / 2.0 + 0.7 * nx as f64 * a.cos();
        let py = ny as f64 / 2.0 + 0.7 * ny as f64 * a.sin();
        for y in 0..ny {
            for x in 0..nx {
                let d2 = ((x as f64 - px) / nx as f64).powi(2) + ((y as f64 - py) / ny as f64).powi(2);
                let mag = (-d2).exp();
                let phase = 0.5 * a + 0.1 * x as f64;
                maps[idx2d(x, y, nx) + c * n] = Complex64::from_polar(mag, phase);
            }
        }
    }
    for i in 0..n {
        let energy: f64 = (0..ncoils).map(|c| maps[i + c * n].norm_sqr()).sum();
        let scale = 1.0 / energy.sqrt();
        for c in 0..ncoils {
            maps[i + c * n] *= scale;
        }
    }
    maps
}

/// Result of comparing a reconstruction to ground truth
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub rmse: f64,
    pub nrmse: f64,
    pub correlation: f64,
}

impl TestResult {
    pub fn new(name: &str, output: &[Complex64], ground_truth: &[Complex64]) -> Self {
        let mag_out: Vec<f64> = output.iter().map(|v| v.norm()).collect();
        let mag_gt: Vec<f64> = ground_truth.iter().map(|v| v.norm()).collect();
        TestResult {
            name: name.to_string(),
            rmse: rmse(output, ground_truth),
            nrmse: nrmse(output, ground_truth),
            correlation: correlation(&mag_out, &mag_gt),
        }
    }

    pub fn print(&self) {
        println!(
            "{:<20} RMSE={:.6}  NRMSE={:.4}  r={:.4}",
            self.name, self.rmse, self.nrmse, self.correlation
        );
    }
}
