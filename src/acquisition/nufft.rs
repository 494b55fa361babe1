//! Non-uniform Fourier transforms for non-Cartesian sampling
//!
//! [`Nufft2d`] is a gridding NUFFT:
//! 1. de-apodize the image by the inverse Fourier transform of the kernel
//! 2. zero-pad onto an oversampled grid and FFT
//! 3. interpolate the grid onto each trajectory point with a Kaiser-Bessel
//!    kernel, looked up from a finely sampled table with linear interpolation
//!
//! The adjoint runs the exact transpose of those steps (spread, inverse FFT,
//! crop, de-apodize), so forward and adjoint are a consistent pair; only
//! the accuracy against the exact transform [`Ndft`] is approximate.
//!
//! Both transforms compute y(k) = sum_r x(r) exp(-i 2 pi k.(r - n/2)) / sqrt(nx*ny)
//! with k in cycles/pixel, which coincides with the centered orthonormal
//! FFT on Cartesian grid points.
//!
//! References:
//! Beatty, P.J., Nishimura, D.G., Pauly, J.M. (2005). "Rapid gridding
//! reconstruction with a minimal oversampling ratio." IEEE TMI 24(6):799-808.
//! Fessler, J.A., Sutton, B.P. (2003). "Nonuniform fast Fourier transforms
//! using min-max interpolation." IEEE TSP 51(2):560-574.

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::error::{check_len, ReconError, Result};
use crate::fft::{idx2d, Fft2d};

/// Parameters for the gridding NUFFT
#[derive(Clone, Debug, PartialEq)]
pub struct NufftParams {
    /// Grid oversampling ratio (default 2.0)
    pub oversampling: f64,
    /// Kernel support in oversampled grid points (default 6)
    pub kernel_width: usize,
    /// Table samples per grid unit (default 1024)
    pub table_oversampling: usize,
}

impl Default for NufftParams {
    fn default() -> Self {
        Self {
            oversampling: 2.0,
            kernel_width: 6,
            table_oversampling: 1024,
        }
    }
}

impl NufftParams {
    fn validate(&self) -> Result<()> {
        if !(self.oversampling > 1.0) || !self.oversampling.is_finite() {
            return Err(ReconError::invalid(format!(
                "NUFFT oversampling must be > 1, got {}",
                self.oversampling
            )));
        }
        if !(2..=16).contains(&self.kernel_width) {
            return Err(ReconError::invalid(format!(
                "NUFFT kernel width must be in 2..=16, got {}",
                self.kernel_width
            )));
        }
        if self.table_oversampling == 0 {
            return Err(ReconError::invalid("NUFFT table oversampling must be positive"));
        }
        Ok(())
    }
}

/// Non-Cartesian k-space sample locations
///
/// Stored as (n_samples, 2) in Fortran order: kx at `s`, ky at
/// `s + n_samples`, in cycles/pixel within [-0.5, 0.5].
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    n_samples: usize,
    coords: Vec<f64>,
}

impl Trajectory {
    /// Wrap a raw (n_samples, 2) buffer
    pub fn new(coords: Vec<f64>, n_samples: usize) -> Result<Self> {
        if n_samples == 0 {
            return Err(ReconError::invalid("trajectory needs at least one sample"));
        }
        check_len("trajectory", 2 * n_samples, coords.len())?;
        if let Some(pos) = coords.iter().position(|k| !k.is_finite() || k.abs() > 0.5) {
            return Err(ReconError::invalid(format!(
                "trajectory coordinate {} at index {} outside [-0.5, 0.5]",
                coords[pos], pos
            )));
        }
        Ok(Self { n_samples, coords })
    }

    /// Build from (kx, ky) points
    pub fn from_points(points: &[[f64; 2]]) -> Result<Self> {
        let n = points.len();
        let mut coords = vec![0.0; 2 * n];
        for (s, p) in points.iter().enumerate() {
            coords[s] = p[0];
            coords[s + n] = p[1];
        }
        Self::new(coords, n)
    }

    /// The Cartesian grid of an (nx, ny) image, x fastest
    ///
    /// Point (i, j) has k = ((i - nx/2)/nx, (j - ny/2)/ny), the frequency of
    /// element (i, j) of a centered FFT.
    pub fn cartesian(nx: usize, ny: usize) -> Self {
        let n = nx * ny;
        let mut coords = vec![0.0; 2 * n];
        for j in 0..ny {
            for i in 0..nx {
                let s = idx2d(i, j, nx);
                coords[s] = (i as f64 - (nx / 2) as f64) / nx as f64;
                coords[s + n] = (j as f64 - (ny / 2) as f64) / ny as f64;
            }
        }
        Self { n_samples: n, coords }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.n_samples
    }

    /// True if there are no samples
    pub fn is_empty(&self) -> bool {
        self.n_samples == 0
    }

    /// kx of sample s
    #[inline]
    pub fn kx(&self, s: usize) -> f64 {
        self.coords[s]
    }

    /// ky of sample s
    #[inline]
    pub fn ky(&self, s: usize) -> f64 {
        self.coords[s + self.n_samples]
    }

    /// Raw (n_samples, 2) buffer
    pub fn as_slice(&self) -> &[f64] {
        &self.coords
    }
}

/// Image <-> per-sample k-space transform for one coil
///
/// Implementations must make `adjoint` the conjugate transpose of
/// `forward`.
pub trait NonUniformFourier: Send + Sync + std::fmt::Debug {
    /// Image dimensions (nx, ny)
    fn image_dims(&self) -> (usize, usize);
    /// Number of k-space samples
    fn n_samples(&self) -> usize;
    /// Image (nx * ny) to samples (n_samples)
    fn forward(&self, image: &[Complex64]) -> Result<Vec<Complex64>>;
    /// Samples (n_samples) to image (nx * ny)
    fn adjoint(&self, samples: &[Complex64]) -> Result<Vec<Complex64>>;
}

// ============================================================================
// Kaiser-Bessel kernel
// ============================================================================

/// Modified Bessel function of the first kind, order 0 (power series)
fn bessel_i0(x: f64) -> f64 {
    let q = 0.25 * x * x;
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..500 {
        let kf = k as f64;
        term *= q / (kf * kf);
        sum += term;
        if term < 1e-17 * sum {
            break;
        }
    }
    sum
}

#[derive(Clone, Debug)]
struct KaiserBessel {
    width: f64,
    beta: f64,
    i0_beta: f64,
}

impl KaiserBessel {
    /// Kernel with Beatty's shape parameter for the given oversampling
    fn new(width: usize, oversampling: f64) -> Result<Self> {
        let w = width as f64;
        let b2 = (w / oversampling).powi(2) * (oversampling - 0.5).powi(2) - 0.8;
        if !(b2 > 0.0) {
            return Err(ReconError::invalid(format!(
                "kernel width {} too small for oversampling {}",
                width, oversampling
            )));
        }
        let beta = PI * b2.sqrt();
        Ok(Self { width: w, beta, i0_beta: bessel_i0(beta) })
    }

    /// Kernel value at offset d (grid units), zero outside |d| <= width/2
    fn eval(&self, d: f64) -> f64 {
        let r = 2.0 * d / self.width;
        if r.abs() > 1.0 {
            return 0.0;
        }
        bessel_i0(self.beta * (1.0 - r * r).sqrt()) / self.i0_beta
    }

    /// Continuous Fourier transform at frequency nu (cycles per grid unit)
    fn fourier(&self, nu: f64) -> f64 {
        let a = PI * self.width * nu;
        let z2 = self.beta * self.beta - a * a;
        let shape = if z2 > 0.0 {
            let z = z2.sqrt();
            if z < 1e-8 { 1.0 } else { z.sinh() / z }
        } else {
            let z = (-z2).sqrt();
            if z < 1e-8 { 1.0 } else { z.sin() / z }
        };
        self.width * shape / self.i0_beta
    }
}

/// Kernel tabulated on [-width/2, width/2] with linear interpolation
#[derive(Clone, Debug)]
struct KernelTable {
    half_width: f64,
    per_unit: f64,
    values: Vec<f64>,
}

impl KernelTable {
    fn new(kernel: &KaiserBessel, width: usize, per_unit: usize) -> Self {
        let n = width * per_unit;
        let half_width = width as f64 / 2.0;
        let values = (0..=n)
            .map(|i| kernel.eval(i as f64 / per_unit as f64 - half_width))
            .collect();
        Self { half_width, per_unit: per_unit as f64, values }
    }

    #[inline]
    fn lookup(&self, d: f64) -> f64 {
        let last = self.values.len() - 1;
        let p = (d + self.half_width) * self.per_unit;
        if !(p >= 0.0) || p > last as f64 {
            return 0.0;
        }
        let i = p.floor() as usize;
        if i >= last {
            return self.values[last];
        }
        let frac = p - i as f64;
        self.values[i] * (1.0 - frac) + self.values[i + 1] * frac
    }
}

/// Per-sample interpolation stencil along one axis
#[derive(Clone, Debug)]
struct AxisStencil {
    width: usize,
    indices: Vec<usize>,
    weights: Vec<f64>,
}

impl AxisStencil {
    fn new(coords: impl Iterator<Item = f64>, grid_len: usize, width: usize, table: &KernelTable) -> Self {
        let k = grid_len as f64;
        let half = width as f64 / 2.0;
        let mut indices = Vec::new();
        let mut weights = Vec::new();
        for kc in coords {
            let u = kc * k;
            let m0 = (u - half).floor() + 1.0;
            for j in 0..width {
                let m = m0 + j as f64;
                weights.push(table.lookup(u - m));
                indices.push(wrap(m as isize, grid_len));
            }
        }
        Self { width, indices, weights }
    }

    #[inline]
    fn stencil(&self, s: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = s * self.width..(s + 1) * self.width;
        self.indices[range.clone()]
            .iter()
            .copied()
            .zip(self.weights[range].iter().copied())
    }
}

#[inline]
fn wrap(i: isize, n: usize) -> usize {
    i.rem_euclid(n as isize) as usize
}

// ============================================================================
// Gridding NUFFT
// ============================================================================

/// Kaiser-Bessel gridding NUFFT for a fixed trajectory
#[derive(Clone, Debug)]
pub struct Nufft2d {
    nx: usize,
    ny: usize,
    grid_x: usize,
    grid_y: usize,
    fft: Fft2d,
    n_samples: usize,
    x_stencil: AxisStencil,
    y_stencil: AxisStencil,
    deapod_x: Vec<f64>,
    deapod_y: Vec<f64>,
    scale: f64,
}

impl Nufft2d {
    /// Plan a NUFFT for an (nx, ny) image and the given trajectory
    pub fn new(nx: usize, ny: usize, trajectory: &Trajectory, params: &NufftParams) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return Err(ReconError::invalid(format!(
                "NUFFT image dimensions must be non-zero, got {}x{}",
                nx, ny
            )));
        }
        params.validate()?;

        let kernel = KaiserBessel::new(params.kernel_width, params.oversampling)?;
        let table = KernelTable::new(&kernel, params.kernel_width, params.table_oversampling);

        let grid_x = ((params.oversampling * nx as f64).round() as usize).max(nx);
        let grid_y = ((params.oversampling * ny as f64).round() as usize).max(ny);

        let deapod_x = deapodization(&kernel, nx, grid_x)?;
        let deapod_y = deapodization(&kernel, ny, grid_y)?;

        let n = trajectory.len();
        let x_stencil = AxisStencil::new((0..n).map(|s| trajectory.kx(s)), grid_x, params.kernel_width, &table);
        let y_stencil = AxisStencil::new((0..n).map(|s| trajectory.ky(s)), grid_y, params.kernel_width, &table);

        Ok(Self {
            nx,
            ny,
            grid_x,
            grid_y,
            fft: Fft2d::new(grid_x, grid_y),
            n_samples: n,
            x_stencil,
            y_stencil,
            deapod_x,
            deapod_y,
            scale: 1.0 / ((nx * ny) as f64).sqrt(),
        })
    }

    /// Oversampled grid dimensions
    pub fn grid_dims(&self) -> (usize, usize) {
        (self.grid_x, self.grid_y)
    }

    /// Grid index of image pixel (x, y), image centre at grid origin
    #[inline]
    fn grid_index(&self, x: usize, y: usize) -> usize {
        let gx = wrap(x as isize - (self.nx / 2) as isize, self.grid_x);
        let gy = wrap(y as isize - (self.ny / 2) as isize, self.grid_y);
        idx2d(gx, gy, self.grid_x)
    }
}

/// Inverse kernel transform at each centered image coordinate
fn deapodization(kernel: &KaiserBessel, n: usize, grid_len: usize) -> Result<Vec<f64>> {
    (0..n)
        .map(|i| {
            let t = i as f64 - (n / 2) as f64;
            let c = kernel.fourier(t / grid_len as f64);
            if c > 0.0 && c.is_finite() {
                Ok(1.0 / c)
            } else {
                Err(ReconError::invalid(
                    "NUFFT kernel transform vanishes inside the image; increase kernel width or oversampling",
                ))
            }
        })
        .collect()
}

impl NonUniformFourier for Nufft2d {
    fn image_dims(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    fn n_samples(&self) -> usize {
        self.n_samples
    }

    fn forward(&self, image: &[Complex64]) -> Result<Vec<Complex64>> {
        check_len("NUFFT image", self.nx * self.ny, image.len())?;

        let mut grid = vec![Complex64::new(0.0, 0.0); self.grid_x * self.grid_y];
        for y in 0..self.ny {
            for x in 0..self.nx {
                grid[self.grid_index(x, y)] =
                    image[idx2d(x, y, self.nx)] * (self.deapod_x[x] * self.deapod_y[y]);
            }
        }

        self.fft.forward(&mut grid);

        let mut out = Vec::with_capacity(self.n_samples);
        for s in 0..self.n_samples {
            let mut acc = Complex64::new(0.0, 0.0);
            for (gy, wy) in self.y_stencil.stencil(s) {
                let row = gy * self.grid_x;
                for (gx, wx) in self.x_stencil.stencil(s) {
                    acc += grid[row + gx] * (wx * wy);
                }
            }
            out.push(acc * self.scale);
        }
        Ok(out)
    }

    fn adjoint(&self, samples: &[Complex64]) -> Result<Vec<Complex64>> {
        check_len("NUFFT samples", self.n_samples, samples.len())?;

        let mut grid = vec![Complex64::new(0.0, 0.0); self.grid_x * self.grid_y];
        for (s, &v) in samples.iter().enumerate() {
            for (gy, wy) in self.y_stencil.stencil(s) {
                let row = gy * self.grid_x;
                for (gx, wx) in self.x_stencil.stencil(s) {
                    grid[row + gx] += v * (wx * wy);
                }
            }
        }

        self.fft.inverse(&mut grid);

        let mut image = vec![Complex64::new(0.0, 0.0); self.nx * self.ny];
        for y in 0..self.ny {
            for x in 0..self.nx {
                image[idx2d(x, y, self.nx)] = grid[self.grid_index(x, y)]
                    * (self.deapod_x[x] * self.deapod_y[y] * self.scale);
            }
        }
        Ok(image)
    }
}

// ============================================================================
// Exact non-uniform DFT
// ============================================================================

/// Direct O(N*M) non-uniform DFT
///
/// Exact reference transform; practical for small images and trajectories.
#[derive(Clone, Debug)]
pub struct Ndft {
    nx: usize,
    ny: usize,
    trajectory: Trajectory,
}

impl Ndft {
    /// Exact transform for an (nx, ny) image
    pub fn new(nx: usize, ny: usize, trajectory: Trajectory) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return Err(ReconError::invalid(format!(
                "NDFT image dimensions must be non-zero, got {}x{}",
                nx, ny
            )));
        }
        Ok(Self { nx, ny, trajectory })
    }

    #[inline]
    fn phase(&self, s: usize, x: usize, y: usize) -> f64 {
        let tx = x as f64 - (self.nx / 2) as f64;
        let ty = y as f64 - (self.ny / 2) as f64;
        -2.0 * PI * (self.trajectory.kx(s) * tx + self.trajectory.ky(s) * ty)
    }
}

impl NonUniformFourier for Ndft {
    fn image_dims(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    fn n_samples(&self) -> usize {
        self.trajectory.len()
    }

    fn forward(&self, image: &[Complex64]) -> Result<Vec<Complex64>> {
        check_len("NDFT image", self.nx * self.ny, image.len())?;
        let scale = 1.0 / ((self.nx * self.ny) as f64).sqrt();
        Ok((0..self.trajectory.len())
            .map(|s| {
                let mut acc = Complex64::new(0.0, 0.0);
                for y in 0..self.ny {
                    for x in 0..self.nx {
                        acc += image[idx2d(x, y, self.nx)] * Complex64::from_polar(1.0, self.phase(s, x, y));
                    }
                }
                acc * scale
            })
            .collect())
    }

    fn adjoint(&self, samples: &[Complex64]) -> Result<Vec<Complex64>> {
        check_len("NDFT samples", self.trajectory.len(), samples.len())?;
        let scale = 1.0 / ((self.nx * self.ny) as f64).sqrt();
        let mut image = vec![Complex64::new(0.0, 0.0); self.nx * self.ny];
        for y in 0..self.ny {
            for x in 0..self.nx {
                let mut acc = Complex64::new(0.0, 0.0);
                for (s, &v) in samples.iter().enumerate() {
                    acc += v * Complex64::from_polar(1.0, -self.phase(s, x, y));
                }
                image[idx2d(x, y, self.nx)] = acc * scale;
            }
        }
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image(nx: usize, ny: usize) -> Vec<Complex64> {
        (0..nx * ny)
            .map(|i| Complex64::new((0.7 * i as f64).sin(), (0.3 * i as f64).cos()))
            .collect()
    }

    fn spiral_points(n: usize) -> Trajectory {
        let pts: Vec<[f64; 2]> = (0..n)
            .map(|s| {
                let r = 0.45 * s as f64 / n as f64;
                let a = 0.9 * s as f64;
                [r * a.cos(), r * a.sin()]
            })
            .collect();
        Trajectory::from_points(&pts).unwrap()
    }

    fn rel_err(a: &[Complex64], b: &[Complex64]) -> f64 {
        let num: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).norm_sqr()).sum();
        let den: f64 = b.iter().map(|y| y.norm_sqr()).sum();
        (num / den).sqrt()
    }

    fn inner(a: &[Complex64], b: &[Complex64]) -> Complex64 {
        a.iter().zip(b.iter()).map(|(x, y)| x.conj() * y).sum()
    }

    #[test]
    fn test_bessel_i0_values() {
        assert!((bessel_i0(0.0) - 1.0).abs() < 1e-15);
        // I0(1) = 1.2660658777520082
        assert!((bessel_i0(1.0) - 1.2660658777520082).abs() < 1e-13);
        // I0(5) = 27.239871823604442
        assert!((bessel_i0(5.0) - 27.239871823604442).abs() < 1e-9);
    }

    #[test]
    fn test_kernel_table_matches_kernel() {
        let kb = KaiserBessel::new(6, 2.0).unwrap();
        let table = KernelTable::new(&kb, 6, 1024);
        for &d in &[-2.9, -1.3, 0.0, 0.37, 2.5] {
            assert!((table.lookup(d) - kb.eval(d)).abs() < 1e-6, "table mismatch at {}", d);
        }
        assert_eq!(table.lookup(3.5), 0.0);
        assert!((kb.eval(0.0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_trajectory_validation() {
        assert!(Trajectory::new(vec![0.1, 0.2, 0.3], 2).is_err());
        assert!(Trajectory::from_points(&[[0.6, 0.0]]).is_err());
        assert!(Trajectory::from_points(&[[0.5, -0.5]]).is_ok());
        assert!(Trajectory::new(vec![], 0).is_err());
        assert!(Trajectory::from_points(&[]).is_err());
    }

    #[test]
    fn test_ndft_on_cartesian_grid_matches_fft2c() {
        let (nx, ny) = (6, 5);
        let image = test_image(nx, ny);
        let ndft = Ndft::new(nx, ny, Trajectory::cartesian(nx, ny)).unwrap();
        let k_ndft = ndft.forward(&image).unwrap();
        let k_fft = Fft2d::new(nx, ny).fft2c(&image).unwrap();
        assert!(rel_err(&k_ndft, &k_fft) < 1e-10);
    }

    #[test]
    fn test_nufft_matches_ndft() {
        let (nx, ny) = (8, 10);
        let image = test_image(nx, ny);
        let traj = spiral_points(40);
        let nufft = Nufft2d::new(nx, ny, &traj, &NufftParams::default()).unwrap();
        let exact = Ndft::new(nx, ny, traj).unwrap();

        let err = rel_err(&nufft.forward(&image).unwrap(), &exact.forward(&image).unwrap());
        assert!(err < 1e-3, "NUFFT forward relative error {}", err);

        let samples = exact.forward(&image).unwrap();
        let err = rel_err(&nufft.adjoint(&samples).unwrap(), &exact.adjoint(&samples).unwrap());
        assert!(err < 1e-3, "NUFFT adjoint relative error {}", err);
    }

    #[test]
    fn test_nufft_adjoint_consistency() {
        let (nx, ny) = (7, 6);
        let traj = spiral_points(25);
        let nufft = Nufft2d::new(nx, ny, &traj, &NufftParams::default()).unwrap();
        let x = test_image(nx, ny);
        let y: Vec<Complex64> = (0..25)
            .map(|s| Complex64::new((s as f64).cos(), 0.2 * s as f64))
            .collect();
        let lhs = inner(&nufft.forward(&x).unwrap(), &y);
        let rhs = inner(&x, &nufft.adjoint(&y).unwrap());
        assert!((lhs - rhs).norm() < 1e-10 * lhs.norm().max(1.0), "{} vs {}", lhs, rhs);
    }

    #[test]
    fn test_invalid_params() {
        let traj = spiral_points(4);
        let bad = NufftParams { oversampling: 1.0, ..NufftParams::default() };
        assert!(Nufft2d::new(4, 4, &traj, &bad).is_err());
        let bad = NufftParams { kernel_width: 1, ..NufftParams::default() };
        assert!(Nufft2d::new(4, 4, &traj, &bad).is_err());
        assert!(Nufft2d::new(0, 4, &traj, &NufftParams::default()).is_err());
    }
}
