//! Core
//!
//! Tabulated Fourier-basis BSDFs: table loading, coefficient interpolation,
//! series evaluation and importance sampling.

#[macro_use]
extern crate hexf;
#[macro_use]
extern crate log;

// Re-export.
pub mod error;
pub mod fourier;
pub mod geometry;
pub mod interpolation;
pub mod material;
pub mod pbrt;
pub mod reflection;
pub mod rng;
pub mod sampling;
pub mod spectrum;
