//! Generate command

use brdf_core::pbrt::*;
use brdf_core::reflection::FourierTableBuilder;
use std::f64::consts::PI as PI_F64;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Number of midpoint quadrature nodes over `[0, π]` used to project the lobe.
const PROJECTION_NODES: usize = 256;

/// Coefficients below this fraction of `|a0|` are trimmed from the tail.
const TRIM_RATIO: f64 = 1e-6;

/// Red and blue channel scale relative to luminance in RGB tables.
const RED_TINT: Float = 0.9;
const BLUE_TINT: Float = 1.1;

/// A normalized Phong lobe around the mirror direction.
///
/// `f = albedo (n + 2) / 2π max(0, μi μo - sinθi sinθo cos φ)^n`, which is
/// symmetric in the two directions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PhongLobe {
    /// Phong exponent `n`.
    pub exponent: Float,

    /// Albedo at normal incidence.
    pub albedo: Float,
}

impl PhongLobe {
    /// Returns the lobe value.
    ///
    /// * `mu_i` - Incoming elevation cosine.
    /// * `mu_o` - Outgoing elevation cosine.
    /// * `phi`  - Relative azimuth.
    pub fn eval(&self, mu_i: f64, mu_o: f64, phi: f64) -> f64 {
        let sin_i = (1.0 - mu_i * mu_i).max(0.0).sqrt();
        let sin_o = (1.0 - mu_o * mu_o).max(0.0).sqrt();
        let cos_alpha = mu_i * mu_o - sin_i * sin_o * phi.cos();
        let n = self.exponent as f64;
        self.albedo as f64 * (n + 2.0) / (2.0 * PI_F64) * cos_alpha.max(0.0).powf(n)
    }

    /// Projects the lobe onto the cosine series `Σ ak cos(kφ)` and trims the
    /// negligible tail.
    ///
    /// * `mu_i`  - Incoming elevation cosine.
    /// * `mu_o`  - Outgoing elevation cosine.
    /// * `order` - Maximum number of coefficients.
    pub fn project(&self, mu_i: f64, mu_o: f64, order: usize) -> Vec<f64> {
        let h = PI_F64 / PROJECTION_NODES as f64;
        let values: Vec<(f64, f64)> = (0..PROJECTION_NODES)
            .map(|j| {
                let phi = (j as f64 + 0.5) * h;
                (phi, self.eval(mu_i, mu_o, phi))
            })
            .collect();

        let mut ak: Vec<f64> = (0..order)
            .map(|k| {
                let scale = (if k == 0 { 1.0 } else { 2.0 }) / PI_F64;
                let sum: f64 = values.iter().map(|(phi, f)| f * (k as f64 * phi).cos()).sum();
                scale * sum * h
            })
            .collect();

        let cutoff = TRIM_RATIO * ak.first().map_or(0.0, |a0| a0.abs());
        while ak.last().map_or(false, |a| a.abs() <= cutoff) {
            ak.pop();
        }
        ak
    }
}

/// Writes a synthetic reflection-only table of a Phong lobe.
///
/// * `path`     - Output path.
/// * `mu_count` - Number of elevation cosines on `[0, 1]`.
/// * `order`    - Maximum Fourier order.
/// * `channels` - Number of channels (1 or 3).
/// * `eta`      - Relative index of refraction stored in the header.
/// * `lobe`     - The lobe to tabulate.
pub fn generate(
    path: &Path,
    mu_count: usize,
    order: usize,
    channels: usize,
    eta: Float,
    lobe: &PhongLobe,
) -> Result<(), String> {
    if mu_count < 2 {
        return Err(format!("mu-count must be at least 2, got {mu_count}"));
    }
    if channels != 1 && channels != 3 {
        return Err(format!("channels must be 1 or 3, got {channels}"));
    }
    if order == 0 {
        return Err("order must be at least 1".to_string());
    }

    let mu: Vec<Float> = (0..mu_count)
        .map(|k| k as Float / (mu_count - 1) as Float)
        .collect();
    let nodes = mu.clone();

    let table = FourierTableBuilder::new(mu, channels)
        .with_eta(eta)
        .fill(|i, o| {
            let y: Vec<Float> = lobe
                .project(nodes[i] as f64, nodes[o] as f64, order)
                .into_iter()
                .map(|a| a as Float)
                .collect();
            if channels == 1 {
                y
            } else {
                let mut cell = y.clone();
                cell.extend(y.iter().map(|a| a * RED_TINT));
                cell.extend(y.iter().map(|a| a * BLUE_TINT));
                cell
            }
        })
        .and_then(|builder| builder.build())
        .map_err(|e| format!("Unable to build table: {e}"))?;

    let file = File::create(path).map_err(|e| format!("Unable to create '{}': {e}", path.display()))?;
    let mut writer = BufWriter::new(file);
    table
        .write_to(&mut writer)
        .and_then(|_| writer.flush())
        .map_err(|e| format!("Unable to write '{}': {e}", path.display()))?;

    info!(
        "Wrote '{}': {} elevations, max order {}, {} coefficients",
        path.display(),
        mu_count,
        table.m_max(),
        table.coefficient_count()
    );
    Ok(())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use brdf_core::reflection::FourierBSDFTable;
    use float_cmp::*;

    const LOBE: PhongLobe = PhongLobe {
        exponent: 8.0,
        albedo: 0.8,
    };

    fn series(ak: &[f64], phi: f64) -> f64 {
        ak.iter().enumerate().map(|(k, a)| a * (k as f64 * phi).cos()).sum()
    }

    #[test]
    fn projection_is_reciprocal() {
        let a = LOBE.project(0.3, 0.8, 32);
        let b = LOBE.project(0.8, 0.3, 32);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!(approx_eq!(f64, *x, *y, epsilon = 1e-12));
        }
    }

    #[test]
    fn projection_reconstructs_lobe() {
        let ak = LOBE.project(0.7, 0.7, 64);
        assert!(ak[0] > 0.0);
        for phi in [0.5 * PI_F64, 0.9 * PI_F64, PI_F64] {
            let expected = LOBE.eval(0.7, 0.7, phi);
            let peak = LOBE.eval(0.7, 0.7, PI_F64);
            assert!(approx_eq!(f64, series(&ak, phi), expected, epsilon = 1e-3 * peak));
        }
    }

    #[test]
    fn projection_trims_vanishing_tail() {
        // At normal incidence the lobe does not depend on azimuth.
        let ak = LOBE.project(1.0, 0.5, 16);
        assert_eq!(ak.len(), 1);
        assert!(approx_eq!(f64, ak[0], LOBE.eval(1.0, 0.5, 0.0), epsilon = 1e-9));
    }

    #[test]
    fn generate_writes_loadable_table() {
        let path = std::env::temp_dir().join(format!("fbrdf-generate-{}.bsdf", std::process::id()));
        generate(&path, 6, 12, 3, 1.5, &LOBE).unwrap();

        let table = FourierBSDFTable::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(table.mu().len(), 6);
        assert_eq!(table.n_channels(), 3);
        assert!(table.m_max() <= 12);
        assert!(approx_eq!(Float, table.eta(), 1.5, ulps = 2));
        assert!(table.is_reflective());
        assert!(!table.has_transmission());
        assert!(table.a0(5, 5) > 0.0);
    }

    #[test]
    fn generate_rejects_bad_arguments() {
        let path = std::env::temp_dir().join("fbrdf-generate-rejected.bsdf");
        assert!(generate(&path, 1, 12, 1, 1.0, &LOBE).is_err());
        assert!(generate(&path, 4, 12, 2, 1.0, &LOBE).is_err());
        assert!(generate(&path, 4, 0, 1, 1.0, &LOBE).is_err());
        assert!(!path.exists());
    }
}
