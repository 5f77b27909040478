//! Common sampling functions.

use crate::geometry::*;
use crate::pbrt::*;
use crate::rng::*;

/// Generate 1D stratified samples.
///
/// * `rng`       - Random number generator.
/// * `n_samples` - Number of samples.
/// * `jitter`    - Jitter the samples.
pub fn stratified_sample_1d(rng: &mut RNG, n_samples: usize, jitter: bool) -> Vec<Float> {
    let inv_n_samples = 1.0 / n_samples as Float;

    (0..n_samples)
        .map(|i| {
            let delta = if jitter { rng.uniform_float() } else { 0.5 };
            min((i as Float + delta) * inv_n_samples, ONE_MINUS_EPSILON)
        })
        .collect::<Vec<Float>>()
}

/// Uniformly sample a direction on a hemisphere.
///
/// * `u` - The random sample point.
pub fn uniform_sample_hemisphere(u: &Point2f) -> Vector3f {
    let z = u[0];
    let r = max(0.0, 1.0 - z * z).sqrt();
    let phi = TWO_PI * u[1];
    Vector3f::new(r * cos(phi), r * sin(phi), z)
}

/// Returns the PDF for uniformly sampling a direction from a hemisphere.
#[inline]
pub fn uniform_hemisphere_pdf() -> Float {
    INV_TWO_PI
}

/// Sample a point on a unit disk by mapping from a unit square to the unit
/// circle. The concentric mapping takes points in [-1, 1]^2 to unit disk by
/// uniformly mapping concentric squares to concentric circles.
///
/// * `u` - The random sample point.
pub fn concentric_sample_disk(u: &Point2f) -> Point2f {
    // Map uniform random numbers to [-1,1]^2.
    let ox = 2.0 * u.x - 1.0;
    let oy = 2.0 * u.y - 1.0;

    // Handle degeneracy at the origin.
    if ox == 0.0 && oy == 0.0 {
        return Point2f::new(0.0, 0.0);
    }

    // Apply concentric mapping to point
    let (r, theta) = if abs(ox) > abs(oy) {
        (ox, PI_OVER_FOUR * (oy / ox))
    } else {
        (oy, PI_OVER_TWO - PI_OVER_FOUR * (ox / oy))
    };

    Point2f::new(r * cos(theta), r * sin(theta))
}

/// Cosine-weighted sample a direction on the hemisphere around `(0, 0, 1)`.
///
/// * `u` - The random sample point.
pub fn cosine_sample_hemisphere(u: &Point2f) -> Vector3f {
    let d = concentric_sample_disk(u);
    let z = max(0.0, 1.0 - d.x * d.x - d.y * d.y).sqrt();
    Vector3f::new(d.x, d.y, z)
}

/// Returns the PDF for cosine-weighted sampling a direction from a hemisphere.
///
/// * `cos_theta` - Cosine term of incident radiance.
#[inline]
pub fn cosine_hemisphere_pdf(cos_theta: Float) -> Float {
    cos_theta * INV_PI
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::*;
    use proptest::prelude::*;

    #[test]
    fn stratified_samples_fall_in_their_strata() {
        let mut rng = RNG::new(3);
        let n = 16;
        for (i, u) in stratified_sample_1d(&mut rng, n, true).iter().enumerate() {
            assert!(*u >= i as Float / n as Float);
            assert!(*u < (i + 1) as Float / n as Float);
        }
    }

    #[test]
    fn unjittered_samples_are_centered() {
        let mut rng = RNG::default();
        let samples = stratified_sample_1d(&mut rng, 4, false);
        assert_eq!(samples, vec![0.125, 0.375, 0.625, 0.875]);
    }

    proptest! {
        #[test]
        fn concentric_disk_sample_is_inside_unit_disk(x in 0.0..1.0f32, y in 0.0..1.0f32) {
            let d = concentric_sample_disk(&Point2f::new(x, y));
            prop_assert!(d.x * d.x + d.y * d.y <= 1.0 + 1e-5);
        }

        #[test]
        fn cosine_hemisphere_samples_are_unit_and_upper(x in 0.0..1.0f32, y in 0.0..1.0f32) {
            let w = cosine_sample_hemisphere(&Point2f::new(x, y));
            prop_assert!(w.z >= 0.0);
            prop_assert!(approx_eq!(Float, w.length(), 1.0, epsilon = 0.0001));
        }

        #[test]
        fn uniform_hemisphere_samples_are_unit(x in 0.0..1.0f32, y in 0.0..1.0f32) {
            let w = uniform_sample_hemisphere(&Point2f::new(x, y));
            prop_assert!(w.z >= 0.0);
            prop_assert!(approx_eq!(Float, w.length(), 1.0, epsilon = 0.0001));
        }
    }
}
