//! Materials

use crate::error::LoadError;
use crate::fourier::FourierConfig;
use crate::pbrt::*;
use crate::reflection::*;
use crate::spectrum::*;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Caches BSDF table data by file path.
///
/// Loading happens outside the lock so distinct tables load independently. If
/// two threads race to load the same path the first table inserted wins and
/// both get it.
#[derive(Default)]
pub struct TableCache {
    tables: Mutex<HashMap<PathBuf, Arc<FourierBSDFTable>>>,
}

impl TableCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached table for `path`, loading it on first use.
    ///
    /// * `path` - Path to the Fourier BSDF data file.
    pub fn get_or_load<P: AsRef<Path>>(&self, path: P) -> Result<Arc<FourierBSDFTable>, LoadError> {
        let key = path.as_ref().to_path_buf();

        // Use preloaded BSDF data if available.
        if let Some(table) = self.lock().get(&key) {
            trace!("Using cached Fourier BSDF '{}'", key.display());
            return Ok(Arc::clone(table));
        }

        let table = Arc::new(FourierBSDFTable::from_file(&key)?);
        Ok(Arc::clone(self.lock().entry(key).or_insert(table)))
    }

    /// Returns the number of cached tables.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no table is cached.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops all cached tables. Materials keep their own references.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<FourierBSDFTable>>> {
        // The map stays consistent even if a holder panicked.
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Implements materials using measured or synthetic BSDF data that has been
/// tabulated into the directional basis.
#[derive(Clone)]
pub struct FourierMaterial {
    /// Stores the measured Fourier BSDF data.
    bsdf_table: Arc<FourierBSDFTable>,

    /// Interpolation and sampling tunables.
    config: FourierConfig,
}

impl FourierMaterial {
    /// Create a new `FourierMaterial`.
    ///
    /// * `bsdf_table` - The BSDF data.
    /// * `config`     - Interpolation and sampling tunables.
    pub fn new(bsdf_table: Arc<FourierBSDFTable>, config: FourierConfig) -> Self {
        Self { bsdf_table, config }
    }

    /// Returns the BSDF data.
    pub fn table(&self) -> &Arc<FourierBSDFTable> {
        &self.bsdf_table
    }

    /// Returns the scattering model.
    pub fn bxdf(&self) -> BxDF {
        FourierBSDF::new(Arc::clone(&self.bsdf_table), self.config).into()
    }
}

/// Implements a purely diffuse surface.
#[derive(Copy, Clone, Debug)]
pub struct MatteMaterial {
    /// Diffuse reflectance.
    kd: Spectrum,
}

impl MatteMaterial {
    /// Create a new `MatteMaterial`.
    ///
    /// * `kd` - Diffuse reflectance.
    pub fn new(kd: Spectrum) -> Self {
        Self { kd }
    }

    /// Returns the scattering model.
    pub fn bxdf(&self) -> BxDF {
        LambertianReflection::new(self.kd.clamp_default()).into()
    }
}

impl Default for MatteMaterial {
    fn default() -> Self {
        Self::new(Spectrum::new(0.5))
    }
}

/// Materials that produce a single scattering model.
#[derive(Clone)]
pub enum Material {
    Fourier(FourierMaterial),
    Matte(MatteMaterial),
}

impl Material {
    /// Returns the scattering model at a surface point.
    pub fn bxdf(&self) -> BxDF {
        match self {
            Material::Fourier(m) => m.bxdf(),
            Material::Matte(m) => m.bxdf(),
        }
    }
}

impl fmt::Display for Material {
    /// Formats the value using the given formatter.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Material::Fourier(m) => write!(
                f,
                "FourierMaterial {{ mu_count: {}, channels: {} }}",
                m.bsdf_table.mu().len(),
                m.bsdf_table.n_channels()
            ),
            Material::Matte(m) => write!(f, "MatteMaterial {{ kd: {} }}", m.kd),
        }
    }
}

/// Loads a Fourier material through the cache.
///
/// When the table cannot be loaded and a `fallback` is given, the error is
/// logged and the fallback is returned instead; without a fallback the error
/// is returned.
///
/// * `cache`    - Table cache.
/// * `path`     - Path to the Fourier BSDF data file.
/// * `config`   - Interpolation and sampling tunables.
/// * `fallback` - Material to use if loading fails.
pub fn load_fourier_material<P: AsRef<Path>>(
    cache: &TableCache,
    path: P,
    config: FourierConfig,
    fallback: Option<Material>,
) -> Result<Material, LoadError> {
    match cache.get_or_load(path.as_ref()) {
        Ok(table) => Ok(Material::Fourier(FourierMaterial::new(table, config))),
        Err(err) => match fallback {
            Some(material) => {
                warn!(
                    "Unable to load '{}': {}. Using {}.",
                    path.as_ref().display(),
                    err,
                    material
                );
                Ok(material)
            }
            None => Err(err),
        },
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector3f;
    use std::path::PathBuf;

    fn write_table(name: &str) -> PathBuf {
        let table = FourierTableBuilder::new(vec![0.0, 1.0], 1)
            .fill(|_, _| vec![1.0])
            .unwrap()
            .build()
            .unwrap();
        let path = std::env::temp_dir().join(format!("{name}-{}.bsdf", std::process::id()));
        std::fs::write(&path, table.to_bytes().unwrap()).unwrap();
        path
    }

    #[test]
    fn cache_shares_tables() {
        let path = write_table("material-cache");
        let cache = TableCache::new();
        assert!(cache.is_empty());

        let a = cache.get_or_load(&path).unwrap();
        let b = cache.get_or_load(&path).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn load_fourier_material_uses_table() {
        let path = write_table("material-load");
        let cache = TableCache::new();
        let material = load_fourier_material(&cache, &path, FourierConfig::default(), None).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(material, Material::Fourier(_)));
        assert!(matches!(material.bxdf(), BxDF::FourierBSDF(_)));
    }

    #[test]
    fn missing_table_without_fallback_is_error() {
        let cache = TableCache::new();
        let result = load_fourier_material(
            &cache,
            "/nonexistent/material.bsdf",
            FourierConfig::default(),
            None,
        );
        assert!(matches!(result, Err(LoadError::Io { .. })));
        assert!(cache.is_empty());
    }

    #[test]
    fn missing_table_uses_fallback() {
        let cache = TableCache::new();
        let fallback = Material::Matte(MatteMaterial::new(Spectrum::new(0.25)));
        let material = load_fourier_material(
            &cache,
            "/nonexistent/material.bsdf",
            FourierConfig::default(),
            Some(fallback),
        )
        .unwrap();
        assert!(matches!(material.bxdf(), BxDF::LambertianReflection(_)));
        assert!(material.to_string().starts_with("MatteMaterial"));
    }

    #[test]
    fn matte_material_clamps_reflectance() {
        let material = MatteMaterial::new(Spectrum::from_rgb(&[-0.5, 0.5, 0.2]));
        let wo = Vector3f::new(0.0, 0.6, 0.8);
        let rgb = material.bxdf().f(&wo, &wo).to_rgb();
        assert_eq!(rgb[0], 0.0);
        assert!(float_cmp::approx_eq!(Float, rgb[1], 0.5 * INV_PI, epsilon = 1e-6));
        assert!(float_cmp::approx_eq!(Float, rgb[2], 0.2 * INV_PI, epsilon = 1e-6));

        let grey = MatteMaterial::default().bxdf().f(&wo, &wo);
        assert_eq!(grey, Spectrum::new(0.5 * INV_PI));
    }

    #[test]
    fn concurrent_loads_share_one_table() {
        let path = write_table("material-threads");
        let cache = TableCache::new();
        let tables: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| cache.get_or_load(&path).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        std::fs::remove_file(&path).unwrap();

        assert_eq!(cache.len(), 1);
        let cached = cache.get_or_load(&path).unwrap();
        assert!(tables.iter().all(|t| Arc::ptr_eq(t, &cached)));
    }
}
