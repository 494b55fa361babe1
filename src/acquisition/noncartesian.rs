//! Non-Cartesian multi-coil encoding
//!
//! forward: y_c = M . sqrt(D) . N(S_c . x)
//! adjoint: x = sum_c conj(S_c) . N^H(sqrt(D) . M . y_c)
//!
//! N is a [`NonUniformFourier`] transform (gridding NUFFT or exact NDFT),
//! D the density compensation and M the per-sample mask. Splitting D as
//! sqrt(D) on both sides keeps the pair a Hermitian transpose of each
//! other while the normal operator still carries the full weighting.

use num_complex::Complex64;
use std::sync::Arc;

use super::nufft::{NonUniformFourier, Nufft2d, NufftParams, Trajectory};
use super::{check_smaps, SamplingMask};
use crate::error::{check_len, ReconError, Result};

/// Coil maps, trajectory transform and density compensation
#[derive(Clone, Debug)]
pub struct NonCartesianAcquisition {
    transform: Arc<dyn NonUniformFourier>,
    ncoils: usize,
    smaps: Vec<Complex64>,
    sqrt_dcf: Vec<f64>,
}

impl NonCartesianAcquisition {
    /// Encoding through an arbitrary non-uniform transform
    ///
    /// `smaps` has shape (nx, ny, ncoils); `dcf`, if given, one non-negative
    /// weight per trajectory sample.
    pub fn new(
        transform: Arc<dyn NonUniformFourier>,
        smaps: Vec<Complex64>,
        ncoils: usize,
        dcf: Option<&[f64]>,
    ) -> Result<Self> {
        let (nx, ny) = transform.image_dims();
        check_smaps(&smaps, nx, ny, ncoils)?;

        let n_samples = transform.n_samples();
        if n_samples == 0 {
            return Err(ReconError::invalid("non-Cartesian encoding needs at least one k-space sample"));
        }
        let sqrt_dcf = match dcf {
            Some(d) => {
                check_len("density compensation", n_samples, d.len())?;
                if let Some(pos) = d.iter().position(|w| !w.is_finite() || *w < 0.0) {
                    return Err(ReconError::invalid(format!(
                        "density compensation weight {} at index {} must be finite and non-negative",
                        d[pos], pos
                    )));
                }
                d.iter().map(|w| w.sqrt()).collect()
            }
            None => vec![1.0; n_samples],
        };

        Ok(Self { transform, ncoils, smaps, sqrt_dcf })
    }

    /// Encoding with a Kaiser-Bessel gridding NUFFT planned for `trajectory`
    pub fn with_nufft(
        trajectory: &Trajectory,
        smaps: Vec<Complex64>,
        nx: usize,
        ny: usize,
        ncoils: usize,
        dcf: Option<&[f64]>,
        params: &NufftParams,
    ) -> Result<Self> {
        let nufft = Nufft2d::new(nx, ny, trajectory, params)?;
        Self::new(Arc::new(nufft), smaps, ncoils, dcf)
    }

    /// Image dimensions (nx, ny)
    pub fn image_dims(&self) -> (usize, usize) {
        self.transform.image_dims()
    }

    /// Number of receiver coils
    pub fn ncoils(&self) -> usize {
        self.ncoils
    }

    /// Trajectory samples per coil
    pub fn n_samples(&self) -> usize {
        self.transform.n_samples()
    }

    /// Length of the multi-coil k-space (n_samples * ncoils)
    pub fn kspace_len(&self) -> usize {
        self.n_samples() * self.ncoils
    }

    /// Length of the sampling mask (one weight per sample)
    pub fn mask_len(&self) -> usize {
        self.n_samples()
    }

    fn n_pixels(&self) -> usize {
        let (nx, ny) = self.image_dims();
        nx * ny
    }

    fn smap(&self, c: usize) -> &[Complex64] {
        let n = self.n_pixels();
        &self.smaps[c * n..(c + 1) * n]
    }

    /// Image (nx * ny) to masked, density-weighted multi-coil samples
    pub fn forward(&self, image: &[Complex64], mask: &SamplingMask) -> Result<Vec<Complex64>> {
        let n = self.n_pixels();
        let ns = self.n_samples();
        check_len("non-Cartesian image", n, image.len())?;
        check_len("non-Cartesian mask", ns, mask.len())?;

        let mut kspace = Vec::with_capacity(ns * self.ncoils);
        for c in 0..self.ncoils {
            let coil_image: Vec<Complex64> = self.smap(c).iter().zip(image).map(|(&s, &x)| s * x).collect();
            let samples = self.transform.forward(&coil_image)?;
            kspace.extend(
                samples
                    .into_iter()
                    .zip(self.sqrt_dcf.iter().zip(mask.weights()))
                    .map(|(v, (&d, &m))| v * (d * m)),
            );
        }
        Ok(kspace)
    }

    /// Multi-coil samples to coil-combined image
    pub fn adjoint(&self, kspace: &[Complex64], mask: &SamplingMask) -> Result<Vec<Complex64>> {
        let n = self.n_pixels();
        let ns = self.n_samples();
        check_len("non-Cartesian k-space", ns * self.ncoils, kspace.len())?;
        check_len("non-Cartesian mask", ns, mask.len())?;

        let mut image = vec![Complex64::new(0.0, 0.0); n];
        for (c, coil_k) in kspace.chunks_exact(ns).enumerate() {
            let weighted: Vec<Complex64> = coil_k
                .iter()
                .zip(self.sqrt_dcf.iter().zip(mask.weights()))
                .map(|(&v, (&d, &m))| v * (d * m))
                .collect();
            let coil_image = self.transform.adjoint(&weighted)?;
            for ((out, &s), v) in image.iter_mut().zip(self.smap(c)).zip(coil_image) {
                *out += s.conj() * v;
            }
        }
        Ok(image)
    }
}
