//! Info command

use super::load;
use brdf_core::fourier::FourierConfig;
use brdf_core::geometry::*;
use brdf_core::material::TableCache;
use brdf_core::pbrt::*;
use brdf_core::rng::RNG;
use std::path::Path;

/// Outgoing elevation cosines at which the directional albedo is estimated.
const ALBEDO_MU_O: [Float; 4] = [0.2, 0.5, 0.8, 1.0];

/// Prints header metadata, per-cell statistics and directional albedo
/// estimates of a table.
///
/// * `path`    - Path to the table.
/// * `samples` - Monte-Carlo samples per albedo estimate.
/// * `config`  - Interpolation and sampling tunables.
pub fn info(path: &Path, samples: usize, config: FourierConfig) -> Result<(), String> {
    let cache = TableCache::new();
    let material = load(&cache, path, config)?;
    let table = material.table();
    let mu = table.mu();
    let n = mu.len();

    println!("File:         {}", path.display());
    println!("Elevations:   {} in [{}, {}]", n, mu[0], mu[n - 1]);
    println!("Max order:    {}", table.m_max());
    println!("Channels:     {}", table.n_channels());
    println!("Eta:          {}", table.eta());
    println!("Coefficients: {}", table.coefficient_count());
    println!(
        "Hemispheres:  {}{}",
        if table.is_reflective() { "reflection " } else { "" },
        if table.has_transmission() { "transmission" } else { "" }
    );

    let stats = CellStats::new(n, |i, o| (table.order(i, o), PI * table.a0(i, o)));
    println!(
        "Orders:       min {}, max {}, mean {:.2}",
        stats.min_order, stats.max_order, stats.mean_order
    );
    println!(
        "Cell mass:    min {:.6}, max {:.6}, {} empty cell(s)",
        stats.min_mass, stats.max_mass, stats.empty
    );

    let bxdf = material.bxdf();
    let mut rng = RNG::new(0);
    let u: Vec<Point2f> = (0..samples)
        .map(|_| Point2f::new(rng.uniform_float(), rng.uniform_float()))
        .collect();
    for mu_o in ALBEDO_MU_O.iter().filter(|m| **m >= mu[0] && **m <= mu[n - 1]) {
        let wo = Vector3f::new((1.0 - mu_o * mu_o).sqrt(), 0.0, *mu_o);
        println!("Albedo μo={mu_o:.1}: {}", bxdf.rho_hd(&wo, &u));
    }

    Ok(())
}

/// Summary statistics over all cells of a table.
#[derive(Clone, Debug, PartialEq)]
struct CellStats {
    min_order: usize,
    max_order: usize,
    mean_order: Float,
    min_mass: Float,
    max_mass: Float,
    empty: usize,
}

impl CellStats {
    /// Collects statistics from a `n x n` grid.
    ///
    /// * `n`    - Number of elevations.
    /// * `cell` - Returns the order and mass of cell `(i, o)`.
    fn new<F>(n: usize, cell: F) -> Self
    where
        F: Fn(usize, usize) -> (usize, Float),
    {
        let mut stats = Self {
            min_order: usize::MAX,
            max_order: 0,
            mean_order: 0.0,
            min_mass: INFINITY,
            max_mass: -INFINITY,
            empty: 0,
        };
        for o in 0..n {
            for i in 0..n {
                let (m, mass) = cell(i, o);
                stats.min_order = min(stats.min_order, m);
                stats.max_order = max(stats.max_order, m);
                stats.mean_order += m as Float;
                stats.min_mass = min(stats.min_mass, mass);
                stats.max_mass = max(stats.max_mass, mass);
                if m == 0 {
                    stats.empty += 1;
                }
            }
        }
        stats.mean_order /= (n * n) as Float;
        stats
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::*;

    #[test]
    fn cell_stats_summarize_grid() {
        let stats = CellStats::new(2, |i, o| (i + o, (i * 2 + o) as Float));
        assert_eq!(stats.min_order, 0);
        assert_eq!(stats.max_order, 2);
        assert!(approx_eq!(Float, stats.mean_order, 1.0, epsilon = 1e-6));
        assert_eq!(stats.min_mass, 0.0);
        assert_eq!(stats.max_mass, 3.0);
        assert_eq!(stats.empty, 1);
    }
}
