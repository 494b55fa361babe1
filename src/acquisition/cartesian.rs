//! Cartesian multi-coil encoding
//!
//! forward: y_c = M . F(S_c . x)
//! adjoint: x = sum_c conj(S_c) . F^H(M . y_c)
//!
//! F is the centered orthonormal 2D FFT and M the (nx, ny) sampling mask
//! shared by all coils. Since M is real and diagonal the pair is an exact
//! Hermitian transpose.

use num_complex::Complex64;

use super::{check_smaps, SamplingMask};
use crate::error::{check_len, Result};
use crate::fft::Fft2d;

/// Coil maps plus a cached FFT plan for one image size
#[derive(Clone, Debug)]
pub struct CartesianAcquisition {
    nx: usize,
    ny: usize,
    ncoils: usize,
    smaps: Vec<Complex64>,
    fft: Fft2d,
}

impl CartesianAcquisition {
    /// Encoding with coil maps of shape (nx, ny, ncoils)
    pub fn new(smaps: Vec<Complex64>, nx: usize, ny: usize, ncoils: usize) -> Result<Self> {
        check_smaps(&smaps, nx, ny, ncoils)?;
        Ok(Self { nx, ny, ncoils, smaps, fft: Fft2d::new(nx, ny) })
    }

    /// Single coil with unit sensitivity
    pub fn single_coil(nx: usize, ny: usize) -> Result<Self> {
        Self::new(vec![Complex64::new(1.0, 0.0); nx * ny], nx, ny, 1)
    }

    /// Image dimensions (nx, ny)
    pub fn image_dims(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    /// Number of receiver coils
    pub fn ncoils(&self) -> usize {
        self.ncoils
    }

    /// Length of the multi-coil k-space (nx * ny * ncoils)
    pub fn kspace_len(&self) -> usize {
        self.nx * self.ny * self.ncoils
    }

    /// Length of the sampling mask, shared by all coils (nx * ny)
    pub fn mask_len(&self) -> usize {
        self.nx * self.ny
    }

    /// Sensitivity map of coil c
    pub fn smap(&self, c: usize) -> &[Complex64] {
        let n = self.nx * self.ny;
        &self.smaps[c * n..(c + 1) * n]
    }

    /// Image (nx * ny) to masked multi-coil k-space
    pub fn forward(&self, image: &[Complex64], mask: &SamplingMask) -> Result<Vec<Complex64>> {
        let n = self.nx * self.ny;
        check_len("Cartesian image", n, image.len())?;
        check_len("Cartesian mask", n, mask.len())?;

        let mut kspace = Vec::with_capacity(n * self.ncoils);
        let mut coil_image = vec![Complex64::new(0.0, 0.0); n];
        for c in 0..self.ncoils {
            for ((ci, &s), &x) in coil_image.iter_mut().zip(self.smap(c)).zip(image) {
                *ci = s * x;
            }
            let k = self.fft.fft2c(&coil_image)?;
            kspace.extend(k.into_iter().zip(mask.weights()).map(|(v, &m)| v * m));
        }
        Ok(kspace)
    }

    /// Masked multi-coil k-space to coil-combined image
    pub fn adjoint(&self, kspace: &[Complex64], mask: &SamplingMask) -> Result<Vec<Complex64>> {
        let n = self.nx * self.ny;
        check_len("Cartesian k-space", n * self.ncoils, kspace.len())?;
        check_len("Cartesian mask", n, mask.len())?;

        let mut image = vec![Complex64::new(0.0, 0.0); n];
        let mut masked = vec![Complex64::new(0.0, 0.0); n];
        for (c, coil_k) in kspace.chunks_exact(n).enumerate() {
            for ((mk, &v), &m) in masked.iter_mut().zip(coil_k).zip(mask.weights()) {
                *mk = v * m;
            }
            let coil_image = self.fft.ifft2c(&masked)?;
            for ((out, &s), v) in image.iter_mut().zip(self.smap(c)).zip(coil_image) {
                *out += s.conj() * v;
            }
        }
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smaps(nx: usize, ny: usize, ncoils: usize) -> Vec<Complex64> {
        (0..nx * ny * ncoils)
            .map(|i| Complex64::from_polar(0.5 + 0.1 * (i % 5) as f64, 0.4 * i as f64))
            .collect()
    }

    fn image(n: usize) -> Vec<Complex64> {
        (0..n).map(|i| Complex64::new((i as f64).sin(), (1.3 * i as f64).cos())).collect()
    }

    fn inner(a: &[Complex64], b: &[Complex64]) -> Complex64 {
        a.iter().zip(b).map(|(x, y)| x.conj() * y).sum()
    }

    #[test]
    fn test_adjoint_is_exact() {
        let (nx, ny, nc) = (6, 5, 3);
        let op = CartesianAcquisition::new(smaps(nx, ny, nc), nx, ny, nc).unwrap();
        let mask = SamplingMask::new((0..nx * ny).map(|i| (i % 3 != 0) as u8 as f64).collect()).unwrap();
        let x = image(nx * ny);
        let y: Vec<Complex64> = image(nx * ny * nc).into_iter().map(|v| v * 0.7).collect();

        let lhs = inner(&op.forward(&x, &mask).unwrap(), &y);
        let rhs = inner(&x, &op.adjoint(&y, &mask).unwrap());
        assert!((lhs - rhs).norm() < 1e-12 * lhs.norm().max(1.0), "{} vs {}", lhs, rhs);
    }

    #[test]
    fn test_unsampled_lines_are_zero() {
        let (nx, ny) = (4, 4);
        let op = CartesianAcquisition::single_coil(nx, ny).unwrap();
        let mut w = vec![1.0; nx * ny];
        w[5] = 0.0;
        let k = op.forward(&image(nx * ny), &SamplingMask::new(w).unwrap()).unwrap();
        assert_eq!(k[5], Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_full_mask_single_coil_roundtrip() {
        let (nx, ny) = (5, 4);
        let op = CartesianAcquisition::single_coil(nx, ny).unwrap();
        let mask = SamplingMask::full(nx * ny);
        let x = image(nx * ny);
        let back = op.adjoint(&op.forward(&x, &mask).unwrap(), &mask).unwrap();
        for (a, b) in x.iter().zip(back.iter()) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn test_dimension_checks() {
        let op = CartesianAcquisition::single_coil(3, 3).unwrap();
        assert!(op.forward(&image(8), &SamplingMask::full(9)).is_err());
        assert!(op.forward(&image(9), &SamplingMask::full(8)).is_err());
        assert!(op.adjoint(&image(10), &SamplingMask::full(9)).is_err());
        assert!(CartesianAcquisition::new(smaps(3, 3, 2), 3, 3, 1).is_err());
    }

    #[test]
    fn test_single_coil_rejects_empty_image() {
        assert!(CartesianAcquisition::single_coil(0, 4).is_err());
        assert!(CartesianAcquisition::single_coil(4, 0).is_err());
        let op = CartesianAcquisition::single_coil(1, 1).unwrap();
        assert_eq!(op.kspace_len(), 1);
    }
}
