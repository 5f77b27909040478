//! Fourier series evaluation and importance sampling
//!
//! A series `a` of order `m` describes the azimuthal dependence
//! `f(φ) = Σ_{k<m} a_k cos(kφ)` of a tabulated BSDF. Its integral over
//! `[0, φ]` is `F(φ) = a_0 φ + Σ_{k≥1} a_k sin(kφ) / k`, and `F(π) = a_0 π`.

use crate::error::SampleFailure;
use crate::pbrt::*;
use std::f64::consts::PI as PI_F64;

/// What `sample_f` does when the azimuthal root finder fails.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ConvergencePolicy {
    /// Return the failure to the caller.
    #[default]
    Report,

    /// Replace the sample with a cosine-weighted hemisphere sample carrying
    /// the cosine pdf, and flag it as a fallback.
    CosineFallback,
}

/// Tunables for interpolation and sampling of Fourier BSDFs.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FourierConfig {
    /// Grid cells with a bilinear weight below this value are skipped.
    pub weight_threshold: Float,

    /// Root finder stops once `|F(φ) - u F(π)| < tolerance * F(π)`.
    pub tolerance: f64,

    /// Root finder iteration cap.
    pub max_iterations: usize,

    /// Masses (`F(π)` or elevation marginal totals) at or below this value
    /// are treated as zero.
    pub degenerate_mass: f64,

    /// Policy for root finder failures in `sample_f`.
    pub policy: ConvergencePolicy,
}

impl Default for FourierConfig {
    fn default() -> Self {
        Self {
            weight_threshold: 1e-4,
            tolerance: 1e-6,
            max_iterations: 40,
            degenerate_mass: 1e-7,
            policy: ConvergencePolicy::Report,
        }
    }
}

impl FourierConfig {
    /// Sets the interpolation weight threshold.
    ///
    /// * `threshold` - Minimum bilinear weight.
    pub fn with_weight_threshold(mut self, threshold: Float) -> Self {
        self.weight_threshold = threshold;
        self
    }

    /// Sets the relative residual tolerance of the root finder.
    ///
    /// * `tolerance` - Relative tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the root finder iteration cap.
    ///
    /// * `max_iterations` - Maximum iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the degenerate mass threshold.
    ///
    /// * `mass` - Threshold.
    pub fn with_degenerate_mass(mut self, mass: f64) -> Self {
        self.degenerate_mass = mass;
        self
    }

    /// Sets the root finder failure policy.
    ///
    /// * `policy` - The policy.
    pub fn with_policy(mut self, policy: ConvergencePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Result of sampling an azimuth in `[0, π]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FourierSample {
    /// Sampled azimuth in `[0, π]`.
    pub phi: f64,

    /// Density `f(φ) / F(π)` over `[0, π]`, or `1/π` for the uniform
    /// fallback.
    pub pdf: Float,

    /// Series value `f(φ)` at the sample.
    pub value: Float,
}

/// Compute the BSDF value using Fourier interpolation.
///
/// Uses the recurrence `cos((k+1)φ) = 2 cos φ cos(kφ) - cos((k-1)φ)` so no
/// trigonometric function is evaluated. An empty series yields 0.
///
/// * `a`       - The weighted coefficients from a Fourier BSDF for order `m`.
/// * `cos_phi` - Cosine of the angle ΔΦ between pair of directions.
pub fn fourier(a: &[Float], cos_phi: f64) -> Float {
    let mut value = 0.0_f64;

    // Initialize cosine iterates.
    let mut cos_k_minus_one_phi = cos_phi;
    let mut cos_k_phi = 1.0_f64;
    for ak in a {
        // Add the current summand and update the cosine iterates.
        value += (*ak as f64) * cos_k_phi;
        let cos_k_plus_one_phi = 2.0_f64 * cos_phi * cos_k_phi - cos_k_minus_one_phi;
        cos_k_minus_one_phi = cos_k_phi;
        cos_k_phi = cos_k_plus_one_phi;
    }

    value as Float
}

/// Evaluates the series at an azimuth angle.
///
/// * `a`   - Series coefficients.
/// * `phi` - Relative azimuth in radians.
pub fn fourier_phi(a: &[Float], phi: f64) -> Float {
    fourier(a, phi.cos())
}

/// Returns `(F(φ), f(φ))`, the integral of the series over `[0, φ]` and its
/// derivative, with one `cos` and one `sqrt` regardless of the order.
///
/// * `a`     - Series coefficients (non-empty).
/// * `recip` - Contains 1 / k for k in [1..`a.len()`).
/// * `phi`   - Azimuth in `[0, π]`.
#[allow(non_snake_case)]
fn integrate_with_derivative(a: &[Float], recip: &[Float], phi: f64) -> (f64, f64) {
    // Initialize sine and cosine iterates.
    let cos_phi = phi.cos();
    let sin_phi = max(0.0, 1.0 - cos_phi * cos_phi).sqrt();
    let mut cos_phi_prev = cos_phi;
    let mut cos_phi_cur: f64 = 1.0;
    let mut sin_phi_prev = -sin_phi;
    let mut sin_phi_cur: f64 = 0.0;

    // Initialize `F` and `f` with the first series term.
    let mut F = a[0] as f64 * phi;
    let mut f = a[0] as f64;
    for k in 1..a.len() {
        // Compute next sine and cosine iterates.
        let sin_phi_next = 2.0 * cos_phi * sin_phi_cur - sin_phi_prev;
        let cos_phi_next = 2.0 * cos_phi * cos_phi_cur - cos_phi_prev;
        sin_phi_prev = sin_phi_cur;
        sin_phi_cur = sin_phi_next;
        cos_phi_prev = cos_phi_cur;
        cos_phi_cur = cos_phi_next;

        // Add the next series term to `F` and `f`.
        F += a[k] as f64 * recip[k] as f64 * sin_phi_next;
        f += a[k] as f64 * cos_phi_next;
    }

    (F, f)
}

/// Returns `F(φ) = a_0 φ + Σ a_k sin(kφ) / k`. An empty series yields 0.
///
/// * `a`     - Series coefficients.
/// * `recip` - Contains 1 / k for k in [1..`a.len()`).
/// * `phi`   - Azimuth in `[0, π]`.
pub fn integrate_fourier(a: &[Float], recip: &[Float], phi: f64) -> f64 {
    if a.is_empty() {
        0.0
    } else {
        integrate_with_derivative(a, recip, phi).0
    }
}

/// Returns `F(π) = a_0 π`, the mass of the series over the half period.
///
/// * `a` - Series coefficients.
#[inline]
pub fn fourier_mass(a: &[Float]) -> f64 {
    a.first().map_or(0.0, |a0| *a0 as f64 * PI_F64)
}

/// Importance samples an azimuth in `[0, π]` proportionally to the series by
/// solving `F(φ) = u F(π)` with a safeguarded Newton-bisection iteration.
///
/// If `F(π)` is at or below `config.degenerate_mass` the azimuth is sampled
/// uniformly with pdf `1/π`.
///
/// * `a`      - Series coefficients.
/// * `recip`  - Contains 1 / k for k in [1..`a.len()`).
/// * `u`      - Uniform random variate ξ in [0, 1).
/// * `config` - Tolerance and iteration cap.
#[allow(non_snake_case)]
pub fn sample_fourier(
    a: &[Float],
    recip: &[Float],
    u: Float,
    config: &FourierConfig,
) -> Result<FourierSample, SampleFailure> {
    let total = fourier_mass(a);
    if !(total > config.degenerate_mass) {
        let phi = u as f64 * PI_F64;
        return Ok(FourierSample {
            phi,
            pdf: INV_PI,
            value: fourier_phi(a, phi),
        });
    }

    let target = u as f64 * total;
    let tolerance = config.tolerance * total;

    // The root is bracketed by [0, π] since F(0) = 0 and F(π) = total.
    let mut lo = 0.0_f64;
    let mut hi = PI_F64;
    let mut phi = clamp(u as f64, 0.0, 1.0) * PI_F64;
    for _ in 0..config.max_iterations {
        let (F, f) = integrate_with_derivative(a, recip, phi);
        let residual = F - target;

        // Stop the iteration if converged.
        if abs(residual) < tolerance {
            return if f > 0.0 {
                Ok(FourierSample {
                    phi,
                    pdf: (f / total) as Float,
                    value: f as Float,
                })
            } else {
                Err(SampleFailure::ZeroDensity)
            };
        }

        // Update bisection bounds using updated ϕ.
        if residual > 0.0 {
            hi = phi;
        } else {
            lo = phi;
        }

        // Perform a Newton step given `f(ϕ)` and `F(ϕ)` and fall back to a
        // bisection step when it leaves the bracket.
        let newton = phi - residual / f;
        phi = if newton > lo && newton < hi {
            newton
        } else {
            0.5 * (lo + hi)
        };
    }

    Err(SampleFailure::NoConvergence {
        iterations: config.max_iterations,
    })
}

/// Returns the density over `[0, π]` that `sample_fourier` samples with, at
/// the azimuth whose cosine is `cos_phi`.
///
/// * `a`       - Series coefficients.
/// * `cos_phi` - Cosine of the azimuth.
/// * `config`  - Degenerate mass threshold.
pub fn fourier_pdf(a: &[Float], cos_phi: f64, config: &FourierConfig) -> Float {
    let total = fourier_mass(a);
    if !(total > config.degenerate_mass) {
        INV_PI
    } else {
        max(0.0, fourier(a, cos_phi) as f64 / total) as Float
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::*;
    use proptest::prelude::*;

    fn reciprocals(m: usize) -> Vec<Float> {
        (0..m)
            .map(|k| if k == 0 { 0.0 } else { 1.0 / k as Float })
            .collect()
    }

    fn direct_sum(a: &[Float], phi: f64) -> f64 {
        a.iter()
            .enumerate()
            .map(|(k, ak)| *ak as f64 * (k as f64 * phi).cos())
            .sum()
    }

    /// Inverts `φ + sin φ = u π` by plain bisection.
    fn reference_inverse(u: f64) -> f64 {
        let (mut lo, mut hi) = (0.0_f64, PI_F64);
        for _ in 0..200 {
            let mid = 0.5 * (lo + hi);
            if mid + mid.sin() < u * PI_F64 {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }

    #[test]
    fn empty_series_evaluates_to_zero() {
        assert_eq!(fourier(&[], 0.3), 0.0);
        assert_eq!(integrate_fourier(&[], &[], 1.0), 0.0);
        assert_eq!(fourier_mass(&[]), 0.0);
    }

    #[test]
    fn fourier_matches_direct_summation_for_all_orders() {
        let a: Vec<Float> = (0..64).map(|k| 1.0 / (1.0 + k as Float)).collect();
        for m in 0..=a.len() {
            for phi in [0.0, 0.1, 0.7, 1.5, 2.9, PI_F64] {
                let expected = direct_sum(&a[0..m], phi);
                assert!(
                    approx_eq!(f64, fourier_phi(&a[0..m], phi) as f64, expected, epsilon = 1e-4),
                    "m = {m}, phi = {phi}"
                );
            }
        }
    }

    #[test]
    fn integral_matches_closed_form() {
        let a = [0.5, 0.25, -0.125];
        let recip = reciprocals(3);
        for phi in [0.0, 0.5, 1.0, 2.0, 3.0, PI_F64] {
            let expected = 0.5 * phi + 0.25 * phi.sin() - 0.125 * (2.0 * phi).sin() / 2.0;
            assert!(approx_eq!(
                f64,
                integrate_fourier(&a, &recip, phi),
                expected,
                epsilon = 1e-7
            ));
        }
        assert!(approx_eq!(
            f64,
            integrate_fourier(&a, &recip, PI_F64),
            fourier_mass(&a),
            epsilon = 1e-7
        ));
    }

    #[test]
    fn sampler_recovers_single_term_cosine_inverse() {
        let a = [1.0, 1.0];
        let recip = reciprocals(2);
        let config = FourierConfig::default();
        for u in [0.0, 0.25, 0.5, 0.75, 0.999] {
            let s = sample_fourier(&a, &recip, u, &config).unwrap();
            let expected = reference_inverse(u as f64);
            assert!(
                approx_eq!(f64, s.phi, expected, epsilon = 1e-5),
                "u = {u}: {} != {expected}",
                s.phi
            );
            let residual = s.phi + s.phi.sin() - u as f64 * PI_F64;
            assert!(residual.abs() < 1e-6 * PI_F64);
            let pdf = (1.0 + expected.cos()) / PI_F64;
            assert!(approx_eq!(f64, s.pdf as f64, pdf, epsilon = 1e-5));
        }
    }

    #[test]
    fn constant_series_samples_uniformly() {
        let a = [2.0];
        let recip = reciprocals(1);
        let config = FourierConfig::default();
        for u in [0.0, 0.1, 0.5, 0.9] {
            let s = sample_fourier(&a, &recip, u, &config).unwrap();
            assert!(approx_eq!(f64, s.phi, u as f64 * PI_F64, epsilon = 1e-5));
            assert!(approx_eq!(Float, s.pdf, INV_PI, epsilon = 1e-6));
            assert!(approx_eq!(Float, s.value, 2.0, epsilon = 1e-6));
        }
    }

    #[test]
    fn degenerate_series_falls_back_to_uniform() {
        let a = [0.0, 0.5, 0.25];
        let recip = reciprocals(3);
        let config = FourierConfig::default();
        let s = sample_fourier(&a, &recip, 0.5, &config).unwrap();
        assert_eq!(s.pdf, INV_PI);
        assert!(approx_eq!(f64, s.phi, 0.5 * PI_F64, epsilon = 1e-6));
        assert_eq!(fourier_pdf(&a, s.phi.cos(), &config), INV_PI);

        let s = sample_fourier(&[], &[], 0.25, &config).unwrap();
        assert_eq!(s.pdf, INV_PI);
        assert_eq!(s.value, 0.0);
    }

    #[test]
    fn iteration_cap_reports_no_convergence() {
        let a = [1.0, 0.9, 0.5];
        let recip = reciprocals(3);
        let config = FourierConfig::default().with_max_iterations(0);
        assert_eq!(
            sample_fourier(&a, &recip, 0.3, &config),
            Err(SampleFailure::NoConvergence { iterations: 0 })
        );
    }

    #[test]
    fn newton_converges_well_within_cap() {
        let a = [1.0, 0.9, 0.5, 0.2];
        let recip = reciprocals(4);
        let config = FourierConfig::default().with_max_iterations(12);
        for i in 0..100 {
            let u = i as Float / 100.0;
            assert!(sample_fourier(&a, &recip, u, &config).is_ok(), "u = {u}");
        }
    }

    proptest! {
        #[test]
        fn sampled_pdf_matches_fourier_pdf(
            u in 0.0..1.0f32,
            a1 in -0.9..0.9f32,
            a2 in -0.4..0.4f32,
        ) {
            // a0 = 1 dominates so the series stays positive.
            let a = [1.0, a1 * 0.5, a2 * 0.5];
            let recip = reciprocals(3);
            let config = FourierConfig::default();
            let s = sample_fourier(&a, &recip, u, &config).unwrap();
            prop_assert!(s.phi >= 0.0 && s.phi <= PI_F64);
            prop_assert!(s.pdf > 0.0);
            let pdf = fourier_pdf(&a, s.phi.cos(), &config);
            prop_assert!(approx_eq!(Float, s.pdf, pdf, epsilon = 1e-4));
        }

        #[test]
        fn sampler_is_monotonic_in_u(u1 in 0.0..1.0f32, u2 in 0.0..1.0f32) {
            let a = [1.0, 0.6, 0.2];
            let recip = reciprocals(3);
            let config = FourierConfig::default();
            let (lo, hi) = if u1 < u2 { (u1, u2) } else { (u2, u1) };
            let s_lo = sample_fourier(&a, &recip, lo, &config).unwrap();
            let s_hi = sample_fourier(&a, &recip, hi, &config).unwrap();
            prop_assert!(s_lo.phi <= s_hi.phi + 1e-6);
        }
    }
}
