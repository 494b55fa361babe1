//! FFT wrapper for 2D transforms using rustfft
//!
//! Provides centered, orthonormal 2D FFT/IFFT operations compatible with
//! NumPy's `fftshift(fft2(ifftshift(x), norm='ortho'))` convention.
//! Uses Fortran (column-major) order indexing: index = x + y*nx.

use num_complex::Complex64;
use rustfft::{Fft, FftDirection, FftPlanner};
use std::sync::Arc;

use crate::error::{check_len, Result};

/// Cached 2D FFT plans for a fixed grid size
///
/// Plans are shared `Arc`s and scratch space is allocated per call, so one
/// workspace can be used from several threads at once.
#[derive(Clone)]
pub struct Fft2d {
    nx: usize,
    ny: usize,
    fft_x: Arc<dyn Fft<f64>>,
    fft_y: Arc<dyn Fft<f64>>,
    ifft_x: Arc<dyn Fft<f64>>,
    ifft_y: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for Fft2d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fft2d")
            .field("nx", &self.nx)
            .field("ny", &self.ny)
            .finish()
    }
}

impl Fft2d {
    /// Create a new FFT workspace for the given dimensions
    pub fn new(nx: usize, ny: usize) -> Self {
        let mut planner = FftPlanner::new();

        let fft_x = planner.plan_fft(nx, FftDirection::Forward);
        let fft_y = planner.plan_fft(ny, FftDirection::Forward);
        let ifft_x = planner.plan_fft(nx, FftDirection::Inverse);
        let ifft_y = planner.plan_fft(ny, FftDirection::Inverse);

        Self { nx, ny, fft_x, fft_y, ifft_x, ifft_y }
    }

    /// Grid dimensions (nx, ny)
    pub fn dims(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    /// Number of grid points
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    /// True for an empty grid
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// In-place unnormalized forward 2D FFT
    pub fn forward(&self, data: &mut [Complex64]) {
        self.process(data, &self.fft_x, &self.fft_y);
    }

    /// In-place unnormalized inverse 2D FFT (no 1/N factor)
    pub fn inverse(&self, data: &mut [Complex64]) {
        self.process(data, &self.ifft_x, &self.ifft_y);
    }

    fn process(&self, data: &mut [Complex64], along_x: &Arc<dyn Fft<f64>>, along_y: &Arc<dyn Fft<f64>>) {
        let (nx, ny) = (self.nx, self.ny);
        debug_assert_eq!(data.len(), nx * ny);
        if data.is_empty() {
            return;
        }

        let scratch_len = along_x
            .get_inplace_scratch_len()
            .max(along_y.get_inplace_scratch_len());
        let mut scratch = vec![Complex64::new(0.0, 0.0); scratch_len];

        // Transform along x-axis: contiguous columns of length nx
        along_x.process_with_scratch(data, &mut scratch);

        // Transform along y-axis (stride nx)
        let mut buffer_y = vec![Complex64::new(0.0, 0.0); ny];
        for i in 0..nx {
            for j in 0..ny {
                buffer_y[j] = data[idx2d(i, j, nx)];
            }
            along_y.process_with_scratch(&mut buffer_y, &mut scratch);
            for j in 0..ny {
                data[idx2d(i, j, nx)] = buffer_y[j];
            }
        }
    }

    /// Centered orthonormal forward FFT: fftshift(fft2(ifftshift(x))) / sqrt(N)
    pub fn fft2c(&self, image: &[Complex64]) -> Result<Vec<Complex64>> {
        check_len("fft2c input", self.len(), image.len())?;
        let mut data = ifftshift2d(image, self.nx, self.ny);
        self.forward(&mut data);
        let scale = 1.0 / (self.len() as f64).sqrt();
        for v in data.iter_mut() {
            *v *= scale;
        }
        Ok(fftshift2d(&data, self.nx, self.ny))
    }

    /// Centered orthonormal inverse FFT: fftshift(ifft2(ifftshift(k))) * sqrt(N)/N
    ///
    /// Exact adjoint (and inverse) of [`Fft2d::fft2c`].
    pub fn ifft2c(&self, kspace: &[Complex64]) -> Result<Vec<Complex64>> {
        check_len("ifft2c input", self.len(), kspace.len())?;
        let mut data = ifftshift2d(kspace, self.nx, self.ny);
        self.inverse(&mut data);
        let scale = 1.0 / (self.len() as f64).sqrt();
        for v in data.iter_mut() {
            *v *= scale;
        }
        Ok(fftshift2d(&data, self.nx, self.ny))
    }
}

/// Index into a 2D array stored in Fortran order (column-major)
/// index = x + y*nx
#[inline(always)]
pub fn idx2d(i: usize, j: usize, nx: usize) -> usize {
    i + j * nx
}

/// 2D FFT shift: swap quadrants so zero-frequency is at center
///
/// Matches numpy.fft.fftshift for 2D data in Fortran order, for odd and
/// even sizes.
pub fn fftshift2d<T: Copy + Default>(data: &[T], nx: usize, ny: usize) -> Vec<T> {
    roll2d(data, nx, ny, nx / 2, ny / 2)
}

/// 2D inverse FFT shift: undo fftshift
///
/// Matches numpy.fft.ifftshift for 2D data in Fortran order.
pub fn ifftshift2d<T: Copy + Default>(data: &[T], nx: usize, ny: usize) -> Vec<T> {
    roll2d(data, nx, ny, (nx + 1) / 2, (ny + 1) / 2)
}

fn roll2d<T: Copy + Default>(data: &[T], nx: usize, ny: usize, hx: usize, hy: usize) -> Vec<T> {
    let mut out = vec![T::default(); nx * ny];
    for j in 0..ny {
        let sj = (j + hy) % ny;
        for i in 0..nx {
            let si = (i + hx) % nx;
            out[idx2d(si, sj, nx)] = data[idx2d(i, j, nx)];
        }
    }
    out
}
