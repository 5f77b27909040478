//! Plot command

use super::load;
use brdf_core::fourier::FourierConfig;
use brdf_core::geometry::*;
use brdf_core::material::TableCache;
use brdf_core::pbrt::*;
use brdf_core::reflection::BxDF;
use brdf_core::spectrum::*;
use image::{ImageBuffer, ImageFormat, Rgb};
use std::path::Path;

/// Renders `f(wo, wi) |cos θi|` over the incoming hemisphere seen from above
/// and writes it as a PNG. The hemisphere is projected orthographically onto
/// the unit disk and normalized by the brightest pixel.
///
/// * `path`   - Path to the table.
/// * `out`    - Output PNG path.
/// * `mu_o`   - Outgoing elevation cosine.
/// * `size`   - Image width and height in pixels.
/// * `config` - Interpolation and sampling tunables.
pub fn plot(path: &Path, out: &Path, mu_o: Float, size: u32, config: FourierConfig) -> Result<(), String> {
    if !(-1.0..=1.0).contains(&mu_o) {
        return Err(format!("mu-o must be in [-1, 1], got {mu_o}"));
    }
    if size == 0 {
        return Err("size must be at least 1".to_string());
    }

    let cache = TableCache::new();
    let material = load(&cache, path, config)?;
    let pixels = render(&material.bxdf(), mu_o, size);

    info!("Writing image {} with resolution {size}x{size}", out.display());

    let scale = pixels.iter().fold(0.0, |m: Float, p| max(m, p.y()));
    let scale = if scale > 0.0 { 1.0 / scale } else { 0.0 };

    let imgbuf = ImageBuffer::from_fn(size, size, |x, y| {
        let rgb = (pixels[y as usize * size as usize + x as usize] * scale).to_rgb();
        Rgb([clamp_byte(rgb[0]), clamp_byte(rgb[1]), clamp_byte(rgb[2])])
    });

    // Write the output file.
    imgbuf
        .save_with_format(out, ImageFormat::Png)
        .map_err(|err| format!("Error saving output image {}: {err}.", out.display()))
}

/// Evaluates the projected cosine-weighted BSDF on a `size x size` grid in
/// row-major order. Pixels outside the unit disk are black.
///
/// * `bxdf` - The scattering model.
/// * `mu_o` - Outgoing elevation cosine.
/// * `size` - Image width and height in pixels.
fn render(bxdf: &BxDF, mu_o: Float, size: u32) -> Vec<Spectrum> {
    let wo = Vector3f::new((1.0 - mu_o * mu_o).max(0.0).sqrt(), 0.0, mu_o);
    let inv_size = 1.0 / size as Float;

    let mut pixels = Vec::with_capacity(pixel_count(size));
    for y in 0..size {
        for x in 0..size {
            let u = 2.0 * (x as Float + 0.5) * inv_size - 1.0;
            let v = 1.0 - 2.0 * (y as Float + 0.5) * inv_size;
            let r2 = u * u + v * v;
            if r2 >= 1.0 {
                pixels.push(Spectrum::ZERO);
                continue;
            }
            let wi = Vector3f::new(u, v, (1.0 - r2).sqrt());
            pixels.push(bxdf.f(&wo, &wi) * wi.z);
        }
    }
    pixels
}

/// Returns the number of pixels in a `size x size` image.
///
/// * `size` - Image width and height in pixels.
#[inline]
fn pixel_count(size: u32) -> usize {
    size as usize * size as usize
}

/// Clamp floating point value to 8-bit range [0, 255] after gamma correction.
///
/// * `v` - Value to clamp.
#[inline]
fn clamp_byte(v: Float) -> u8 {
    clamp(255.0 * gamma_correct(v) + 0.5, 0.0, 255.0) as u8
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use brdf_core::reflection::LambertianReflection;
    use float_cmp::*;

    #[test]
    fn render_lambertian_follows_cosine() {
        let bxdf: BxDF = LambertianReflection::new(Spectrum::new(1.0)).into();
        let pixels = render(&bxdf, 0.5, 9);
        assert_eq!(pixels.len(), 81);

        // Corners lie outside the disk.
        assert!(pixels[0].is_black());
        assert!(pixels[80].is_black());

        // The centre pixel looks straight down the normal.
        assert!(approx_eq!(Float, pixels[40].y(), INV_PI, epsilon = 1e-5));
        assert!(pixels[40].y() > pixels[36].y());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn pixel_count_does_not_wrap() {
        assert_eq!(pixel_count(9), 81);
        assert_eq!(pixel_count(65_536) as u64, 1 << 32);
    }

    #[test]
    fn clamp_byte_saturates() {
        assert_eq!(clamp_byte(0.0), 0);
        assert_eq!(clamp_byte(1.0), 255);
        assert_eq!(clamp_byte(4.0), 255);
        assert_eq!(clamp_byte(-1.0), 0);
    }
}
