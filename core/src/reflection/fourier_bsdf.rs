//! Fourier Basis BSDF Model

use super::*;
use crate::error::{SampleFailure, ScatterError};
use crate::fourier::*;
use crate::interpolation::InterpolatedSeries;
use std::f64::consts::PI as PI_F64;
use std::fmt;
use std::sync::Arc;

/// BSDF for measured materials like metals with smooth or rough coatings and
/// fabrics which are often partially retro-reflective, tabulated as Fourier
/// series over the relative azimuth.
#[derive(Clone)]
pub struct FourierBSDF {
    /// BxDF type.
    bxdf_type: BxDFType,

    /// The BSDF data.
    bsdf_table: Arc<FourierBSDFTable>,

    /// Interpolation and sampling tunables.
    config: FourierConfig,
}

impl FourierBSDF {
    /// Creates a new instance of `FourierBSDF`.
    ///
    /// * `bsdf_table` - The BSDF data.
    /// * `config`     - Interpolation and sampling tunables.
    pub fn new(bsdf_table: Arc<FourierBSDFTable>, config: FourierConfig) -> Self {
        let mut bxdf_type = BxDFType::BSDF_REFLECTION | BxDFType::BSDF_GLOSSY;
        if bsdf_table.has_transmission() {
            bxdf_type |= BxDFType::BSDF_TRANSMISSION;
        }
        Self {
            bxdf_type,
            bsdf_table,
            config,
        }
    }

    /// Returns the BxDF type.
    pub fn get_type(&self) -> BxDFType {
        self.bxdf_type
    }

    /// Returns the BSDF data.
    pub fn table(&self) -> &Arc<FourierBSDFTable> {
        &self.bsdf_table
    }

    /// Returns the tunables.
    pub fn config(&self) -> &FourierConfig {
        &self.config
    }

    /// Returns the value of the distribution function for the given pair of
    /// directions.
    ///
    /// * `wo` - Outgoing direction.
    /// * `wi` - Incident direction.
    pub fn f(&self, wo: &Vector3f, wi: &Vector3f) -> Spectrum {
        let ak = self.coefficients(wo, wi);
        self.spectrum(&ak, cos_d_phi(wi, wo) as f64)
    }

    /// Samples an incident direction for the outgoing direction. The incident
    /// elevation is drawn from the table's elevation marginal with `u[0]` and
    /// the relative azimuth from the luminance series with `u[1]`.
    ///
    /// * `wo` - Outgoing direction.
    /// * `u`  - The 2D uniform random values.
    pub fn sample_f(&self, wo: &Vector3f, u: &Point2f) -> Result<BxDFSample, ScatterError> {
        match self.sample_series(wo, u) {
            Err(ScatterError::Sample(failure))
                if self.config.policy == ConvergencePolicy::CosineFallback =>
            {
                debug!("Fourier BSDF sampling failed ({failure}); using cosine-weighted sample");
                Ok(self.cosine_sample(wo, u))
            }
            result => result,
        }
    }

    /// Evaluates the PDF with respect to solid angle with which `sample_f()`
    /// samples `wi`.
    ///
    /// * `wo` - Outgoing direction.
    /// * `wi` - Incident direction.
    pub fn pdf(&self, wo: &Vector3f, wi: &Vector3f) -> Float {
        let ak = self.coefficients(wo, wi);
        self.series_pdf(wo, wi, &ak)
    }

    /// Samples the elevation marginal and the azimuthal series.
    ///
    /// * `wo` - Outgoing direction.
    /// * `u`  - The 2D uniform random values.
    fn sample_series(&self, wo: &Vector3f, u: &Point2f) -> Result<BxDFSample, ScatterError> {
        // Sample zenith angle component for `FourierBSDF`.
        let mu_o = cos_theta(wo);
        let (mu_i, _) = self
            .bsdf_table
            .sample_elevation(mu_o, u[0], &self.config)?;

        // Compute Fourier coefficients `ak` for `(μi, μo)`.
        let ak = self
            .bsdf_table
            .interpolate(mu_i, mu_o, self.config.weight_threshold);

        // Importance sample the luminance Fourier expansion over one half of
        // the period and mirror into the other half.
        let (u_phi, mirror) = if u[1] < 0.5 {
            (2.0 * u[1], false)
        } else {
            (2.0 * u[1] - 1.0, true)
        };
        let sample = sample_fourier(ak.luminance(), self.bsdf_table.recip(), u_phi, &self.config)
            .map_err(|failure| {
                if let SampleFailure::NoConvergence { iterations } = failure {
                    debug!("Azimuth root finder stopped after {iterations} iterations for μo = {mu_o}, μi = {mu_i}");
                }
                failure
            })?;
        let phi = if mirror {
            2.0 * PI_F64 - sample.phi
        } else {
            sample.phi
        };

        // Compute the scattered direction for `FourierBSDF`.
        let sin_2_theta_i = max(0.0, 1.0 - mu_i * mu_i);
        let sin_2_theta_o = sin_2_theta(wo);
        let (sin_phi, cos_phi) = (phi.sin() as Float, phi.cos() as Float);
        let wi = if sin_2_theta_o > 0.0 {
            let norm = (sin_2_theta_i / sin_2_theta_o).sqrt();
            Vector3f::new(
                norm * (cos_phi * wo.x - sin_phi * wo.y),
                norm * (sin_phi * wo.x + cos_phi * wo.y),
                mu_i,
            )
        } else {
            let sin_theta_i = sin_2_theta_i.sqrt();
            Vector3f::new(sin_theta_i * cos_phi, sin_theta_i * sin_phi, mu_i)
        };

        // Renormalize to remove accumulated rounding error.
        let wi = wi.normalize();

        // Evaluate value and density at the final direction so they agree
        // with `f()` and `pdf()`.
        let ak = self.coefficients(wo, &wi);
        let cos_d = cos_d_phi(&wi, wo) as f64;
        let pdf = self.series_pdf(wo, &wi, &ak);
        if !(pdf > 0.0) {
            return Err(ScatterError::Sample(SampleFailure::ZeroDensity));
        }

        Ok(BxDFSample::new(
            self.spectrum(&ak, cos_d),
            pdf,
            wi,
            self.bxdf_type,
        ))
    }

    /// Cosine-samples the hemisphere of `wo`.
    ///
    /// * `wo` - Outgoing direction.
    /// * `u`  - The 2D uniform random values.
    fn cosine_sample(&self, wo: &Vector3f, u: &Point2f) -> BxDFSample {
        let mut wi = cosine_sample_hemisphere(u);
        if wo.z < 0.0 {
            wi.z *= -1.0;
        }
        let pdf = cosine_hemisphere_pdf(abs_cos_theta(&wi));
        BxDFSample::new(self.f(wo, &wi), pdf, wi, self.bxdf_type).into_fallback()
    }

    /// Returns the interpolated coefficients for the pair of directions.
    ///
    /// * `wo` - Outgoing direction.
    /// * `wi` - Incident direction.
    fn coefficients(&self, wo: &Vector3f, wi: &Vector3f) -> InterpolatedSeries {
        self.bsdf_table.interpolate(
            cos_theta(wi),
            cos_theta(wo),
            self.config.weight_threshold,
        )
    }

    /// Returns the solid angle density for `wi` given its interpolated
    /// coefficients.
    ///
    /// * `wo` - Outgoing direction.
    /// * `wi` - Incident direction.
    /// * `ak` - Interpolated coefficients for `(wi, wo)`.
    fn series_pdf(&self, wo: &Vector3f, wi: &Vector3f, ak: &InterpolatedSeries) -> Float {
        let pdf_mu = self
            .bsdf_table
            .elevation_pdf(cos_theta(wo), cos_theta(wi), &self.config);
        if pdf_mu == 0.0 {
            return 0.0;
        }

        // The azimuth density over [0, π] covers half of the full circle.
        let cos_phi = cos_d_phi(wi, wo) as f64;
        let pdf_phi = 0.5 * fourier_pdf(ak.luminance(), cos_phi, &self.config);
        pdf_mu * pdf_phi
    }

    /// Evaluates the interpolated series and assembles the spectrum.
    ///
    /// * `ak`      - Interpolated coefficients.
    /// * `cos_phi` - Cosine of the relative azimuth.
    fn spectrum(&self, ak: &InterpolatedSeries, cos_phi: f64) -> Spectrum {
        // Evaluate Fourier expansion for angle ϕ.
        let y = fourier(ak.luminance(), cos_phi);
        if ak.n_channels() == 1 {
            Spectrum::new(max(0.0, y))
        } else {
            // Compute and return RGB colors for tabulated BSDF.
            let r = fourier(ak.channel(1), cos_phi);
            let b = fourier(ak.channel(2), cos_phi);
            let g = 1.39829 * y - 0.100913 * b - 0.297375 * r;
            Spectrum::from_rgb(&[r, g, b]).clamp_default()
        }
    }
}

impl fmt::Display for FourierBSDF {
    /// Formats the value using the given formatter.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FourierBSDF {{ bxdf_type: {}, mu_count: {}, m_max: {}, n_channels: {} }}",
            self.bxdf_type,
            self.bsdf_table.mu().len(),
            self.bsdf_table.m_max(),
            self.bsdf_table.n_channels()
        )
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
