//! Utility functions for reconstruction
//!
//! This module provides common utility functions:
//! - Coil combination (root sum-of-squares) and intensity scaling
//! - SIMD-accelerated vector kernels (optional, with `simd` feature)

pub mod coils;
pub mod simd_ops;

pub use coils::*;
pub use simd_ops::*;
