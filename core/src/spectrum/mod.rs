//! Spectrum

mod rgb_spectrum;

// Re-export
pub use rgb_spectrum::*;

/// The spectrum representation used by the reflection models.
pub type Spectrum = RGBSpectrum;
