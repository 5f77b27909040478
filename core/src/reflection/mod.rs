//! Reflection and surface scattering models

use crate::error::ScatterError;
use crate::geometry::*;
use crate::pbrt::*;
use crate::sampling::*;
use crate::spectrum::*;
use std::fmt;

mod bsdf_reader;
mod bxdf_sample;
mod bxdf_type;
mod common;
mod fourier_bsdf;
mod fourier_bsdf_table;
mod lambertian_reflection;

// Re-export
pub use bsdf_reader::*;
pub use bxdf_sample::*;
pub use bxdf_type::*;
pub use common::*;
pub use fourier_bsdf::*;
pub use fourier_bsdf_table::*;
pub use lambertian_reflection::*;

/// BxDF for BRDFs and BTDFs.
///
/// The models are enumerated directly so integrators can hold any of them
/// without trait objects.
#[derive(Clone)]
pub enum BxDF {
    FourierBSDF(FourierBSDF),
    LambertianReflection(LambertianReflection),
}

impl BxDF {
    /// Returns the BxDF type.
    pub fn get_type(&self) -> BxDFType {
        match self {
            BxDF::FourierBSDF(bxdf) => bxdf.get_type(),
            BxDF::LambertianReflection(bxdf) => bxdf.get_type(),
        }
    }

    /// Returns true if the reflection models match.
    ///
    /// * `t` - The reflection model to compare.
    pub fn matches_flags(&self, t: BxDFType) -> bool {
        t.contains(self.get_type())
    }

    /// Returns the value of the distribution function for the given pair of
    /// directions.
    ///
    /// * `wo` - Outgoing direction.
    /// * `wi` - Incident direction.
    pub fn f(&self, wo: &Vector3f, wi: &Vector3f) -> Spectrum {
        match self {
            BxDF::FourierBSDF(bxdf) => bxdf.f(wo, wi),
            BxDF::LambertianReflection(bxdf) => bxdf.f(wo, wi),
        }
    }

    /// Samples an incident direction for the outgoing direction and returns
    /// the value of the BxDF and the PDF for it.
    ///
    /// * `wo` - Outgoing direction.
    /// * `u`  - The 2D uniform random values.
    pub fn sample_f(&self, wo: &Vector3f, u: &Point2f) -> Result<BxDFSample, ScatterError> {
        match self {
            BxDF::FourierBSDF(bxdf) => bxdf.sample_f(wo, u),
            _ => {
                // Cosine-sample the hemisphere, flipping the direction if necessary.
                let mut wi = cosine_sample_hemisphere(u);
                if wo.z < 0.0 {
                    wi.z *= -1.0;
                }
                let pdf = self.pdf(wo, &wi);
                Ok(BxDFSample::new(self.f(wo, &wi), pdf, wi, self.get_type()))
            }
        }
    }

    /// Evaluates the PDF for the sampling method. Default is based on the
    /// cosine-weighted sampling in `BxDF::sample_f()` default implementation.
    ///
    /// * `wo` - Outgoing direction.
    /// * `wi` - Incident direction.
    pub fn pdf(&self, wo: &Vector3f, wi: &Vector3f) -> Float {
        match self {
            BxDF::FourierBSDF(bxdf) => bxdf.pdf(wo, wi),
            _ => {
                if same_hemisphere(wo, wi) {
                    abs_cos_theta(wi) * INV_PI
                } else {
                    0.0
                }
            }
        }
    }

    /// Computes the hemispherical-directional reflectance function ρ.
    ///
    /// Samples that fail with a `ScatterError` contribute zero.
    ///
    /// * `wo` - Outgoing direction.
    /// * `u`  - Samples used by Monte Carlo algorithm.
    pub fn rho_hd(&self, wo: &Vector3f, u: &[Point2f]) -> Spectrum {
        match self {
            BxDF::LambertianReflection(bxdf) => bxdf.rho_hd(wo, u),
            _ => {
                if u.is_empty() {
                    return Spectrum::ZERO;
                }

                let mut r = Spectrum::ZERO;
                for s in u {
                    // Estimate one term of `rho_hd`.
                    if let Ok(sample) = self.sample_f(wo, s) {
                        if sample.pdf > 0.0 {
                            r += sample.f * abs_cos_theta(&sample.wi) / sample.pdf;
                        }
                    }
                }
                r / u.len() as Float
            }
        }
    }

    /// Computes the hemispherical-hemispherical reflectance function ρ.
    ///
    /// Samples that fail with a `ScatterError` contribute zero.
    ///
    /// * `u1` - Samples used by Monte Carlo algorithm.
    /// * `u2` - Samples used by Monte Carlo algorithm.
    pub fn rho_hh(&self, u1: &[Point2f], u2: &[Point2f]) -> Spectrum {
        match self {
            BxDF::LambertianReflection(bxdf) => bxdf.rho_hh(u1, u2),
            _ => {
                debug_assert!(u1.len() == u2.len());
                if u1.is_empty() {
                    return Spectrum::ZERO;
                }

                let mut r = Spectrum::ZERO;
                for (s1, s2) in u1.iter().zip(u2.iter()) {
                    // Estimate one term of `rho_hh`.
                    let wo = uniform_sample_hemisphere(s1);
                    let pdfo = uniform_hemisphere_pdf();
                    if let Ok(sample) = self.sample_f(&wo, s2) {
                        let pdfi = sample.pdf;
                        if pdfi > 0.0 {
                            r += sample.f * abs_cos_theta(&sample.wi) * abs_cos_theta(&wo)
                                / (pdfo * pdfi);
                        }
                    }
                }
                r / (PI * u1.len() as Float)
            }
        }
    }
}

impl From<FourierBSDF> for BxDF {
    fn from(bxdf: FourierBSDF) -> Self {
        BxDF::FourierBSDF(bxdf)
    }
}

impl From<LambertianReflection> for BxDF {
    fn from(bxdf: LambertianReflection) -> Self {
        BxDF::LambertianReflection(bxdf)
    }
}

impl fmt::Display for BxDF {
    /// Formats the value using the given formatter.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BxDF::FourierBSDF(bxdf) => write!(f, "{}", bxdf),
            BxDF::LambertianReflection(bxdf) => write!(f, "{}", bxdf),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
