//! Check command

use super::load;
use brdf_core::error::ScatterError;
use brdf_core::fourier::FourierConfig;
use brdf_core::geometry::*;
use brdf_core::material::TableCache;
use brdf_core::pbrt::*;
use brdf_core::reflection::*;
use brdf_core::rng::RNG;
use indicatif::{ProgressBar, ProgressStyle};
use std::f64::consts::PI as PI_F64;
use std::path::Path;
use std::thread;

/// Relative tolerance between a sample's pdf and `BxDF::pdf()`.
const PDF_TOLERANCE: Float = 1e-3;

/// Midpoint quadrature nodes over incoming elevation and azimuth.
const QUADRATURE_MU: usize = 128;
const QUADRATURE_PHI: usize = 128;

/// Allowed relative bias of the albedo estimate on top of its standard error.
const ALBEDO_TOLERANCE: f64 = 0.02;

/// Results of checking one outgoing elevation.
#[derive(Clone, Debug, Default, PartialEq)]
struct NodeReport {
    /// Outgoing elevation cosine.
    mu_o: Float,

    /// Samples whose azimuth root finder failed.
    failures: usize,

    /// Samples rejected because the elevation marginal is empty.
    degenerate: usize,

    /// Cosine-weighted replacement samples.
    fallbacks: usize,

    /// Samples whose pdf disagrees with `BxDF::pdf()`.
    mismatches: usize,

    /// Monte-Carlo estimate of the directional albedo.
    estimate: f64,

    /// Standard error of `estimate`.
    std_error: f64,

    /// Quadrature value of the directional albedo.
    reference: f64,
}

impl NodeReport {
    /// Returns `true` if every pdf round trips and the estimate agrees with
    /// the quadrature.
    fn passed(&self) -> bool {
        let tolerance = 4.0 * self.std_error + ALBEDO_TOLERANCE * self.reference.abs() + 1e-4;
        self.mismatches == 0 && (self.estimate - self.reference).abs() <= tolerance
    }
}

/// Validates sampling against evaluation at every outgoing elevation of a
/// table. Fails if any elevation reports pdf mismatches or an albedo
/// estimate that disagrees with quadrature.
///
/// * `path`      - Path to the table.
/// * `samples`   - Samples per outgoing elevation.
/// * `seed`      - Random sequence seed.
/// * `n_threads` - Number of worker threads.
/// * `config`    - Interpolation and sampling tunables.
pub fn check(
    path: &Path,
    samples: usize,
    seed: u64,
    n_threads: usize,
    config: FourierConfig,
) -> Result<(), String> {
    if samples == 0 {
        return Err("samples must be at least 1".to_string());
    }

    let cache = TableCache::new();
    let material = load(&cache, path, config)?;
    let bxdf = &material.bxdf();
    let mu = material.table().mu();
    let n = mu.len();

    info!("Checking {n} outgoing elevations with {samples} samples each on {n_threads} thread(s)");

    let progress = ProgressBar::new(n as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{wide_bar}] {percent}% [{pos}/{len}] ({eta})")
            .map_err(|e| format!("Invalid progress template: {e}"))?
            .progress_chars("#>-"),
    );
    let progress = &progress;

    let mut reports = thread::scope(|scope| {
        let (tx_collector, rx_collector) = crossbeam_channel::bounded::<NodeReport>(n_threads);
        let (tx_worker, rx_worker) = crossbeam_channel::bounded::<usize>(n_threads);

        // Spawn collector thread.
        let collector = scope.spawn(move || {
            let mut reports = Vec::with_capacity(n);
            for report in rx_collector.iter() {
                progress.inc(1);
                reports.push(report);
            }
            reports
        });

        // Spawn worker threads.
        for _ in 0..n_threads {
            let rx_worker = rx_worker.clone();
            let tx_collector = tx_collector.clone();
            scope.spawn(move || {
                for o in rx_worker.iter() {
                    let report = check_node(bxdf, mu, o, samples, seed);
                    if tx_collector.send(report).is_err() {
                        break;
                    }
                }
            });
        }
        drop(rx_worker); // Drop extra since we've cloned one for each woker.
        drop(tx_collector);

        // Send work.
        for o in 0..n {
            if tx_worker.send(o).is_err() {
                break;
            }
        }
        drop(tx_worker);

        collector
            .join()
            .map_err(|_| "Collector thread panicked".to_string())
    })?;
    progress.finish_and_clear();

    reports.sort_by(|a, b| a.mu_o.total_cmp(&b.mu_o));

    println!(
        "{:>8} {:>10} {:>10} {:>10} {:>8} {:>8} {:>8} {:>8}  result",
        "μo", "estimate", "reference", "std.err", "failed", "degen.", "fallback", "pdf.err"
    );
    for r in reports.iter() {
        println!(
            "{:>8.4} {:>10.6} {:>10.6} {:>10.6} {:>8} {:>8} {:>8} {:>8}  {}",
            r.mu_o,
            r.estimate,
            r.reference,
            r.std_error,
            r.failures,
            r.degenerate,
            r.fallbacks,
            r.mismatches,
            if r.passed() { "ok" } else { "FAIL" }
        );
    }

    let failed = reports.iter().filter(|r| !r.passed()).count();
    if failed > 0 {
        Err(format!("{failed} of {n} outgoing elevations failed"))
    } else {
        Ok(())
    }
}

/// Samples and checks a single outgoing elevation.
///
/// * `bxdf`    - The scattering model.
/// * `mu`      - Elevation cosines of the table.
/// * `o`       - Index of the outgoing elevation.
/// * `samples` - Number of samples.
/// * `seed`    - Random sequence seed.
fn check_node(bxdf: &BxDF, mu: &[Float], o: usize, samples: usize, seed: u64) -> NodeReport {
    let mu_o = mu[o];
    let wo = Vector3f::new((1.0 - mu_o * mu_o).max(0.0).sqrt(), 0.0, mu_o);
    let mut rng = RNG::new(seed.wrapping_add(o as u64));

    let mut report = NodeReport {
        mu_o,
        ..NodeReport::default()
    };
    let (mut mean, mut m2) = (0.0_f64, 0.0_f64);
    for k in 0..samples {
        let u = Point2f::new(rng.uniform_float(), rng.uniform_float());
        let x = match bxdf.sample_f(&wo, &u) {
            Ok(s) => {
                if s.fallback {
                    report.fallbacks += 1;
                } else if abs(bxdf.pdf(&wo, &s.wi) - s.pdf) > PDF_TOLERANCE * max(1.0, s.pdf) {
                    report.mismatches += 1;
                }
                if s.pdf > 0.0 {
                    (s.f.y() * abs_cos_theta(&s.wi) / s.pdf) as f64
                } else {
                    0.0
                }
            }
            Err(ScatterError::Degenerate) => {
                report.degenerate += 1;
                0.0
            }
            Err(ScatterError::Sample(_)) => {
                report.failures += 1;
                0.0
            }
        };

        // Running mean and variance.
        let delta = x - mean;
        mean += delta / (k + 1) as f64;
        m2 += delta * (x - mean);
    }

    report.estimate = mean;
    report.std_error = if samples > 1 {
        (m2 / ((samples - 1) * samples) as f64).sqrt()
    } else {
        0.0
    };
    report.reference = reference_albedo(bxdf, &wo, mu[0], mu[mu.len() - 1]);
    report
}

/// Integrates `f(wo, wi) |cos θi|` over the tabulated elevation range with the
/// midpoint rule.
///
/// * `bxdf`   - The scattering model.
/// * `wo`     - Outgoing direction.
/// * `mu_min` - Smallest tabulated elevation cosine.
/// * `mu_max` - Largest tabulated elevation cosine.
fn reference_albedo(bxdf: &BxDF, wo: &Vector3f, mu_min: Float, mu_max: Float) -> f64 {
    let d_mu = (mu_max - mu_min) as f64 / QUADRATURE_MU as f64;
    let d_phi = 2.0 * PI_F64 / QUADRATURE_PHI as f64;

    let mut sum = 0.0;
    for j in 0..QUADRATURE_MU {
        let mu_i = mu_min as f64 + (j as f64 + 0.5) * d_mu;
        let sin_theta_i = (1.0 - mu_i * mu_i).max(0.0).sqrt();
        for k in 0..QUADRATURE_PHI {
            let phi = (k as f64 + 0.5) * d_phi;
            let wi = Vector3f::new(
                (sin_theta_i * phi.cos()) as Float,
                (sin_theta_i * phi.sin()) as Float,
                mu_i as Float,
            );
            sum += bxdf.f(wo, &wi).y() as f64 * mu_i.abs();
        }
    }
    sum * d_mu * d_phi
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{generate, PhongLobe};
    use brdf_core::spectrum::Spectrum;
    use float_cmp::*;

    fn lambertian() -> BxDF {
        LambertianReflection::new(Spectrum::new(0.5)).into()
    }

    #[test]
    fn report_passes_within_tolerance() {
        let report = NodeReport {
            estimate: 0.505,
            std_error: 0.001,
            reference: 0.5,
            ..NodeReport::default()
        };
        assert!(report.passed());

        let biased = NodeReport {
            estimate: 0.6,
            ..report.clone()
        };
        assert!(!biased.passed());

        let mismatched = NodeReport {
            mismatches: 1,
            ..report
        };
        assert!(!mismatched.passed());
    }

    #[test]
    fn reference_albedo_of_lambertian() {
        let wo = Vector3f::new(0.6, 0.0, 0.8);
        let albedo = reference_albedo(&lambertian(), &wo, 0.0, 1.0);
        assert!(approx_eq!(f64, albedo, 0.5, epsilon = 1e-3));
    }

    #[test]
    fn check_node_lambertian_is_consistent() {
        let mu = [0.0, 0.5, 1.0];
        let report = check_node(&lambertian(), &mu, 1, 1024, 3);
        assert_eq!(report.failures, 0);
        assert_eq!(report.degenerate, 0);
        assert_eq!(report.mismatches, 0);
        assert!(approx_eq!(f64, report.estimate, 0.5, epsilon = 1e-4));
        assert!(report.passed());
    }

    #[test]
    fn check_generated_table() {
        let path = std::env::temp_dir().join(format!("fbrdf-check-{}.bsdf", std::process::id()));
        let lobe = PhongLobe {
            exponent: 4.0,
            albedo: 0.7,
        };
        generate(&path, 8, 48, 1, 1.0, &lobe).unwrap();

        let result = check(&path, 2048, 11, 2, FourierConfig::default());
        std::fs::remove_file(&path).unwrap();
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn check_rejects_missing_file() {
        let path = std::env::temp_dir().join("fbrdf-check-missing.bsdf");
        assert!(check(&path, 16, 0, 1, FourierConfig::default()).is_err());
    }
}
