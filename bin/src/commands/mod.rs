//! Commands

mod check;
mod generate;
mod info;
mod plot;

// Re-export
pub use check::*;
pub use generate::*;
pub use info::*;
pub use plot::*;

use brdf_core::fourier::FourierConfig;
use brdf_core::material::*;
use std::path::Path;
use std::sync::Arc;

/// Loads a table as a Fourier material and returns the material.
///
/// * `cache`  - Table cache.
/// * `path`   - Path to the table.
/// * `config` - Interpolation and sampling tunables.
fn load(cache: &TableCache, path: &Path, config: FourierConfig) -> Result<Arc<FourierMaterial>, String> {
    match load_fourier_material(cache, path, config, None) {
        Ok(Material::Fourier(material)) => Ok(Arc::new(material)),
        Ok(material) => Err(format!("'{}' did not load as a Fourier material: {material}", path.display())),
        Err(e) => Err(format!("Unable to load '{}': {e}", path.display())),
    }
}
