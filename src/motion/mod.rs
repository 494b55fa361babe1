//! Non-rigid motion as sparse linear operators
//!
//! This module turns per-pixel displacement fields into sparse bilinear
//! warping matrices:
//! - `field`: validated (nx, ny, 2) displacement fields and affine helpers
//! - `sparse`: triplet builder and immutable CSR storage
//! - `operator`: the motion matrix with Jacobian-normalized forward and
//!   transpose application

pub mod field;
pub mod operator;
pub mod sparse;

pub use field::{AffineMotion, DisplacementField};
pub use operator::{Direction, SparseMotionMatrix};
pub use sparse::{CsrMatrix, SparseMatrixBuilder};
