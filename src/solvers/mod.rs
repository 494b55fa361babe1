//! Iterative solvers
//!
//! - `cg`: Conjugate gradient on Hermitian positive semi-definite systems

pub mod cg;

pub use cg::*;
