//! Per-pixel 2D displacement fields
//!
//! A field of shape (nx, ny, 2) stored in Fortran order: the x-component
//! `dx` of pixel (x, y) lives at `x + y*nx` and the y-component `dy` at
//! `x + y*nx + nx*ny`. A displacement moves the sampling point of pixel
//! (x, y) to the continuous coordinate (x + dx, y + dy).

use crate::error::{check_len, ReconError, Result};
use crate::fft::idx2d;

/// Dense 2D displacement field, immutable once constructed
#[derive(Clone, Debug, PartialEq)]
pub struct DisplacementField {
    nx: usize,
    ny: usize,
    data: Vec<f64>,
}

impl DisplacementField {
    /// Wrap a raw (nx, ny, 2) buffer
    ///
    /// Fails on a length mismatch or on non-finite components.
    pub fn new(data: Vec<f64>, nx: usize, ny: usize) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return Err(ReconError::invalid(format!(
                "displacement field dimensions must be non-zero, got {}x{}",
                nx, ny
            )));
        }
        check_len("displacement field", 2 * nx * ny, data.len())?;
        if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
            return Err(ReconError::invalid(format!(
                "displacement field has non-finite component at index {}",
                pos
            )));
        }
        Ok(Self { nx, ny, data })
    }

    /// Zero displacement everywhere (identity motion)
    pub fn zeros(nx: usize, ny: usize) -> Self {
        Self { nx, ny, data: vec![0.0; 2 * nx * ny] }
    }

    /// Same displacement (dx, dy) for every pixel
    pub fn uniform(nx: usize, ny: usize, dx: f64, dy: f64) -> Result<Self> {
        Self::from_fn(nx, ny, |_, _| (dx, dy))
    }

    /// Build a field by evaluating `f(x, y) -> (dx, dy)` at every pixel
    pub fn from_fn<F>(nx: usize, ny: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> (f64, f64),
    {
        let n = nx * ny;
        let mut data = vec![0.0; 2 * n];
        for y in 0..ny {
            for x in 0..nx {
                let (dx, dy) = f(x, y);
                let idx = idx2d(x, y, nx);
                data[idx] = dx;
                data[idx + n] = dy;
            }
        }
        Self::new(data, nx, ny)
    }

    /// Dense field of an affine transform (see [`AffineMotion`])
    pub fn from_affine(nx: usize, ny: usize, motion: &AffineMotion) -> Result<Self> {
        let center = [nx as f64 / 2.0, ny as f64 / 2.0];
        Self::from_fn(nx, ny, |x, y| {
            let p = [x as f64, y as f64];
            let q = motion.map_point(p, center);
            (q[0] - p[0], q[1] - p[1])
        })
    }

    /// Field dimensions (nx, ny)
    pub fn dims(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    /// Number of pixels
    pub fn n_pixels(&self) -> usize {
        self.nx * self.ny
    }

    /// x-displacement of pixel (x, y)
    #[inline]
    pub fn dx(&self, x: usize, y: usize) -> f64 {
        self.data[idx2d(x, y, self.nx)]
    }

    /// y-displacement of pixel (x, y)
    #[inline]
    pub fn dy(&self, x: usize, y: usize) -> f64 {
        self.data[idx2d(x, y, self.nx) + self.n_pixels()]
    }

    /// Raw (nx, ny, 2) buffer
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Largest displacement magnitude in pixels
    pub fn max_magnitude(&self) -> f64 {
        let n = self.n_pixels();
        (0..n)
            .map(|i| self.data[i].hypot(self.data[i + n]))
            .fold(0.0, f64::max)
    }
}

/// In-plane affine motion parameters
///
/// A point p maps to q = T(R(Sh(S p))): scale S = diag(sx, sy), shear
/// Sh = [[1, g], [0, 1]], rotation R about the image centre by
/// `rotation_deg` (clockwise for positive angles in x-y index space),
/// then translation T.
#[derive(Clone, Debug, PartialEq)]
pub struct AffineMotion {
    /// Translation (tx, ty) in pixels
    pub translation: [f64; 2],
    /// Rotation angle in degrees
    pub rotation_deg: f64,
    /// Shear coefficient G_xy
    pub shear: f64,
    /// Scale factors (sx, sy)
    pub scale: [f64; 2],
}

impl Default for AffineMotion {
    fn default() -> Self {
        Self {
            translation: [0.0, 0.0],
            rotation_deg: 0.0,
            shear: 0.0,
            scale: [1.0, 1.0],
        }
    }
}

impl AffineMotion {
    /// Pure translation
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self { translation: [tx, ty], ..Self::default() }
    }

    /// Map a point through the transform, rotating about `center`
    pub fn map_point(&self, p: [f64; 2], center: [f64; 2]) -> [f64; 2] {
        // Scale
        let s = [p[0] * self.scale[0], p[1] * self.scale[1]];
        // Shear
        let sh = [s[0] + self.shear * s[1], s[1]];
        // Rotate about center
        let theta = -self.rotation_deg.to_radians();
        let (sin, cos) = theta.sin_cos();
        let v = [sh[0] - center[0], sh[1] - center[1]];
        let r = [
            cos * v[0] - sin * v[1] + center[0],
            sin * v[0] + cos * v[1] + center[1],
        ];
        // Translate
        [r[0] + self.translation[0], r[1] + self.translation[1]]
    }
}
