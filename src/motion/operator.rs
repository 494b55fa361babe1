//! Sparse bilinear motion operator
//!
//! Converts a per-pixel displacement field into an (N x N) sparse matrix,
//! N = nx*ny, whose row for source pixel (x, y) holds the bilinear
//! interpolation weights of the continuous target point (x + dx, y + dy).
//! Applying the matrix warps an image; applying its transpose is used as an
//! approximation of the inverse warp. It is not an exact inverse.
//!
//! Both directions are followed by a Jacobian correction: the raw result is
//! divided element-wise by the matrix (or transpose) applied to an all-ones
//! image, a division by zero yields exactly 0, and NaN results are reset
//! to 0.

use num_complex::Complex64;
use tracing::debug;

use super::field::DisplacementField;
use super::sparse::{CsrMatrix, SparseMatrixBuilder};
use crate::error::{check_len, Result};
use crate::fft::idx2d;

/// Direction in which a motion matrix is applied
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Warp by the matrix itself
    Forward,
    /// Apply the transpose (approximate inverse warp)
    Transpose,
}

/// Sparse bilinear warp built from one displacement field
///
/// Immutable after [`SparseMotionMatrix::build`]; safe to share across
/// threads.
#[derive(Clone, Debug)]
pub struct SparseMotionMatrix {
    nx: usize,
    ny: usize,
    matrix: CsrMatrix,
    /// Row sums: matrix applied to an all-ones image
    forward_norm: Vec<f64>,
    /// Column sums: transpose applied to an all-ones image
    transpose_norm: Vec<f64>,
}

impl SparseMotionMatrix {
    /// Build the bilinear interpolation matrix of a displacement field
    ///
    /// For each source pixel the four lattice neighbours of (x + dx, y + dy)
    /// receive the weights (1-wx)(1-wy), (1-wx)wy, wx(1-wy) and wx*wy, where
    /// wx, wy are the fractional parts of dx, dy. Neighbours outside
    /// [0, nx-1] x [0, ny-1] are dropped and zero weights are not stored, so
    /// a row sums to the in-bounds coverage of its stencil.
    pub fn build(field: &DisplacementField) -> Self {
        let (nx, ny) = field.dims();
        let n = nx * ny;
        let mut builder = SparseMatrixBuilder::with_capacity(n, n, 4 * n);

        for y in 0..ny {
            for x in 0..nx {
                let row = idx2d(x, y, nx);
                for (col, weight) in bilinear_stencil(x, y, field.dx(x, y), field.dy(x, y), nx, ny)
                    .into_iter()
                    .flatten()
                {
                    builder.push_in_range(row, col, weight);
                }
            }
        }

        let matrix = builder.build();
        let forward_norm = matrix.row_sums();
        let transpose_norm = matrix.col_sums();

        debug!(
            nx, ny,
            nnz = matrix.nnz(),
            max_displacement = field.max_magnitude(),
            "built sparse motion matrix"
        );

        Self { nx, ny, matrix, forward_norm, transpose_norm }
    }

    /// Image dimensions (nx, ny)
    pub fn dims(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    /// Underlying interpolation matrix (row = source, col = target)
    pub fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    /// Normalization vector used after applying in `direction`
    pub fn coverage(&self, direction: Direction) -> &[f64] {
        match direction {
            Direction::Forward => &self.forward_norm,
            Direction::Transpose => &self.transpose_norm,
        }
    }

    /// Warp a complex image (nx * ny, Fortran order)
    ///
    /// `Direction::Transpose` applies the transposed matrix, which only
    /// approximates the inverse warp. The output is divided by the coverage
    /// of the same direction; zero coverage gives exactly 0.
    pub fn apply(&self, image: &[Complex64], direction: Direction) -> Result<Vec<Complex64>> {
        check_len("motion operator image", self.nx * self.ny, image.len())?;

        let raw = match direction {
            Direction::Forward => self.matrix.mul_complex(image)?,
            Direction::Transpose => self.matrix.mul_complex_transposed(image)?,
        };

        Ok(raw
            .into_iter()
            .zip(self.coverage(direction).iter())
            .map(|(v, &norm)| normalize(v, norm))
            .collect())
    }

    /// Shorthand for `apply(image, Direction::Forward)`
    pub fn warp(&self, image: &[Complex64]) -> Result<Vec<Complex64>> {
        self.apply(image, Direction::Forward)
    }

    /// Shorthand for `apply(image, Direction::Transpose)`
    pub fn unwarp(&self, image: &[Complex64]) -> Result<Vec<Complex64>> {
        self.apply(image, Direction::Transpose)
    }
}

/// Jacobian correction of one output value
///
/// Real and imaginary parts are divided separately; zero coverage and NaN
/// results both become 0.
#[inline]
fn normalize(v: Complex64, norm: f64) -> Complex64 {
    let part = |p: f64| {
        if norm == 0.0 {
            return 0.0;
        }
        let q = p / norm;
        if q.is_nan() { 0.0 } else { q }
    };
    Complex64::new(part(v.re), part(v.im))
}

/// Bilinear stencil of source pixel (x, y) moved by (dx, dy)
///
/// Returns up to four (linear target index, weight) pairs; entries whose
/// lattice point leaves the field of view or whose weight is zero are `None`.
fn bilinear_stencil(
    x: usize,
    y: usize,
    dx: f64,
    dy: f64,
    nx: usize,
    ny: usize,
) -> [Option<(usize, f64)>; 4] {
    let tx = x as f64 + dx;
    let ty = y as f64 + dy;
    let x1 = tx.floor();
    let y1 = ty.floor();
    let x2 = (tx + 1.0).floor();
    let y2 = (ty + 1.0).floor();

    // Fractional offsets from the displacement itself (x, y are integers)
    let wx = dx - dx.floor();
    let wy = dy - dy.floor();

    let entry = |px: f64, py: f64, w: f64| -> Option<(usize, f64)> {
        let inside = px >= 0.0 && px <= (nx - 1) as f64 && py >= 0.0 && py <= (ny - 1) as f64;
        if !inside || w == 0.0 {
            return None;
        }
        Some((idx2d(px as usize, py as usize, nx), w))
    };

    [
        entry(x1, y1, (1.0 - wx) * (1.0 - wy)),
        entry(x1, y2, (1.0 - wx) * wy),
        entry(x2, y1, wx * (1.0 - wy)),
        entry(x2, y2, wx * wy),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(nx: usize, ny: usize) -> Vec<Complex64> {
        (0..nx * ny)
            .map(|i| Complex64::new(i as f64 + 1.0, 0.5 * i as f64))
            .collect()
    }

    #[test]
    fn test_identity_motion() {
        let (nx, ny) = (5, 4);
        let op = SparseMotionMatrix::build(&DisplacementField::zeros(nx, ny));
        let img = ramp(nx, ny);
        assert_eq!(op.matrix().nnz(), nx * ny);
        for dir in [Direction::Forward, Direction::Transpose] {
            let out = op.apply(&img, dir).unwrap();
            for (a, b) in img.iter().zip(out.iter()) {
                assert!((a - b).norm() < 1e-14, "{:?}: {} vs {}", dir, a, b);
            }
        }
    }

    #[test]
    fn test_interior_weights_sum_to_one() {
        let (nx, ny) = (6, 6);
        let field = DisplacementField::uniform(nx, ny, 0.3, -0.7).unwrap();
        let op = SparseMotionMatrix::build(&field);
        // Pixel (2, 3) lands at (2.3, 2.3): full stencil in bounds
        let row = idx2d(2, 3, nx);
        let entries: Vec<_> = op.matrix().row(row).collect();
        assert_eq!(entries.len(), 4);
        let sum: f64 = entries.iter().map(|&(_, w)| w).sum();
        assert!((sum - 1.0).abs() < 1e-12, "weights sum to {}", sum);
        assert!(entries.iter().all(|&(_, w)| w > 0.0));
    }

    #[test]
    fn test_out_of_view_pixel_gives_zero() {
        let (nx, ny) = (2, 3);
        let field = DisplacementField::from_fn(nx, ny, |x, y| {
            if (x, y) == (0, 1) { (-10.0, -10.0) } else { (0.0, 0.0) }
        })
        .unwrap();
        let op = SparseMotionMatrix::build(&field);
        let out = op.warp(&ramp(nx, ny)).unwrap();
        let v = out[idx2d(0, 1, nx)];
        assert_eq!(v, Complex64::new(0.0, 0.0));
        assert!(out.iter().all(|c| c.re.is_finite() && c.im.is_finite()));
    }

    #[test]
    fn test_integer_shift_is_exact() {
        let (nx, ny) = (4, 3);
        let op = SparseMotionMatrix::build(&DisplacementField::uniform(nx, ny, 1.0, 0.0).unwrap());
        let img = ramp(nx, ny);
        let out = op.warp(&img).unwrap();
        for y in 0..ny {
            for x in 0..nx - 1 {
                assert_eq!(out[idx2d(x, y, nx)], img[idx2d(x + 1, y, nx)]);
            }
            assert_eq!(out[idx2d(nx - 1, y, nx)], Complex64::new(0.0, 0.0));
        }
    }

    #[test]
    fn test_nan_input_is_zeroed() {
        let op = SparseMotionMatrix::build(&DisplacementField::zeros(2, 2));
        let mut img = ramp(2, 2);
        img[3] = Complex64::new(f64::NAN, 1.0);
        let out = op.warp(&img).unwrap();
        assert_eq!(out[3], Complex64::new(0.0, 1.0));
    }

    #[test]
    fn test_apply_rejects_wrong_shape() {
        let op = SparseMotionMatrix::build(&DisplacementField::zeros(3, 3));
        assert!(op.apply(&ramp(3, 2), Direction::Forward).is_err());
    }
}
