//! Sparse storage for real-valued interpolation matrices
//!
//! Matrices are assembled from (row, col, weight) triplets through
//! [`SparseMatrixBuilder`] (a `sprs::TriMat`) and compiled once into an
//! immutable [`CsrMatrix`]. Duplicate entries are summed during compilation.
//! The transpose is compiled to CSR as well, so both products are row
//! gathers.

use num_complex::Complex64;
use sprs::{CsMat, TriMat};

use crate::error::{check_len, ReconError, Result};

/// Triplet accumulator for a sparse matrix
#[derive(Debug)]
pub struct SparseMatrixBuilder {
    triplets: TriMat<f64>,
}

impl SparseMatrixBuilder {
    /// Empty builder for an n_rows x n_cols matrix
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self { triplets: TriMat::new((n_rows, n_cols)) }
    }

    /// Empty builder with room for `capacity` entries
    pub fn with_capacity(n_rows: usize, n_cols: usize, capacity: usize) -> Self {
        Self { triplets: TriMat::with_capacity((n_rows, n_cols), capacity) }
    }

    /// Add `weight` at (row, col)
    pub fn push(&mut self, row: usize, col: usize, weight: f64) -> Result<()> {
        let (n_rows, n_cols) = self.triplets.shape();
        if row >= n_rows || col >= n_cols {
            return Err(ReconError::invalid(format!(
                "sparse entry ({}, {}) outside {}x{} matrix",
                row, col, n_rows, n_cols
            )));
        }
        self.triplets.add_triplet(row, col, weight);
        Ok(())
    }

    /// Add an entry whose indices the caller has already bounded
    pub(crate) fn push_in_range(&mut self, row: usize, col: usize, weight: f64) {
        self.triplets.add_triplet(row, col, weight);
    }

    /// Number of triplets pushed so far
    pub fn len(&self) -> usize {
        self.triplets.nnz()
    }

    /// True if no triplet was pushed
    pub fn is_empty(&self) -> bool {
        self.triplets.nnz() == 0
    }

    /// Compile into CSR, summing duplicates
    pub fn build(self) -> CsrMatrix {
        let matrix: CsMat<f64> = self.triplets.to_csr();
        let transposed: CsMat<f64> = matrix.transpose_view().to_csr();
        CsrMatrix { matrix, transposed }
    }
}

/// Immutable real sparse matrix with its CSR transpose
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix {
    matrix: CsMat<f64>,
    transposed: CsMat<f64>,
}

impl CsrMatrix {
    /// Matrix shape (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.matrix.shape()
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// Underlying `sprs` matrix
    pub fn as_sprs(&self) -> &CsMat<f64> {
        &self.matrix
    }

    /// Iterate over (col, weight) of one row
    pub fn row(&self, r: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        row_entries(&self.matrix, r)
    }

    /// Stored weight at (row, col), zero if absent
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix.get(row, col).copied().unwrap_or(0.0)
    }

    /// A applied to an all-ones vector
    pub fn row_sums(&self) -> Vec<f64> {
        self.matrix.outer_iterator().map(|row| row.data().iter().sum()).collect()
    }

    /// A^T applied to an all-ones vector
    pub fn col_sums(&self) -> Vec<f64> {
        self.transposed.outer_iterator().map(|col| col.data().iter().sum()).collect()
    }

    /// y = A x for a real vector
    pub fn mul_vec(&self, x: &[f64]) -> Result<Vec<f64>> {
        check_len("sparse matrix operand", self.matrix.cols(), x.len())?;
        Ok(gather(&self.matrix, |c, w| w * x[c], 0.0))
    }

    /// y = A^T x for a real vector
    pub fn mul_vec_transposed(&self, x: &[f64]) -> Result<Vec<f64>> {
        check_len("sparse matrix operand", self.matrix.rows(), x.len())?;
        Ok(gather(&self.transposed, |r, w| w * x[r], 0.0))
    }

    /// y = A x for a complex vector
    ///
    /// The matrix is real, so real and imaginary parts are transformed
    /// independently.
    pub fn mul_complex(&self, x: &[Complex64]) -> Result<Vec<Complex64>> {
        check_len("sparse matrix operand", self.matrix.cols(), x.len())?;
        Ok(gather(&self.matrix, |c, w| x[c] * w, Complex64::new(0.0, 0.0)))
    }

    /// y = A^T x for a complex vector
    pub fn mul_complex_transposed(&self, x: &[Complex64]) -> Result<Vec<Complex64>> {
        check_len("sparse matrix operand", self.matrix.rows(), x.len())?;
        Ok(gather(&self.transposed, |r, w| x[r] * w, Complex64::new(0.0, 0.0)))
    }

    /// Dense row-major copy, for inspection and tests on small matrices
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let mut dense = vec![vec![0.0; self.matrix.cols()]; self.matrix.rows()];
        for (r, row) in dense.iter_mut().enumerate() {
            for (c, w) in self.row(r) {
                row[c] = w;
            }
        }
        dense
    }
}

/// (inner index, value) pairs of one outer row of a CSR matrix
fn row_entries(m: &CsMat<f64>, r: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
    let start = m.indptr().raw_storage()[r];
    let end = m.indptr().raw_storage()[r + 1];
    m.indices()[start..end]
        .iter()
        .copied()
        .zip(m.data()[start..end].iter().copied())
}

/// Row-wise accumulation sum_j term(j, w_ij)
fn gather<T, F>(m: &CsMat<f64>, term: F, zero: T) -> Vec<T>
where
    T: Copy + std::ops::Add<Output = T>,
    F: Fn(usize, f64) -> T,
{
    (0..m.rows())
        .map(|r| row_entries(m, r).fold(zero, |acc, (c, w)| acc + term(c, w)))
        .collect()
}
