//! BxDF Sample

use super::*;

/// Stores evaluation of BxDF samples.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BxDFSample {
    /// The sample value.
    pub f: Spectrum,

    /// The value of the PDF with respect to solid angle.
    pub pdf: Float,

    /// The sampled incident direction.
    pub wi: Vector3f,

    /// The type of BxDF.
    pub bxdf_type: BxDFType,

    /// Set when the sample was replaced by a cosine-weighted sample after the
    /// model's own sampler failed. Its pdf then does not match `BxDF::pdf()`.
    pub fallback: bool,
}

impl BxDFSample {
    /// Create a new `BxDFSample`.
    ///
    /// * `f`         - The sample value.
    /// * `pdf`       - The value of the PDF.
    /// * `wi`        - The sampled incident direction.
    /// * `bxdf_type` - The type of BxDF.
    pub fn new(f: Spectrum, pdf: Float, wi: Vector3f, bxdf_type: BxDFType) -> Self {
        Self {
            f,
            pdf,
            wi,
            bxdf_type,
            fallback: false,
        }
    }

    /// Marks the sample as a fallback sample.
    pub fn into_fallback(self) -> Self {
        Self {
            fallback: true,
            ..self
        }
    }
}
