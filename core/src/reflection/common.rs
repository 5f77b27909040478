//! Common

use crate::geometry::Vector3f;
use crate::pbrt::*;

/// Returns the cosine of the angle θ measured from the given direction to the
/// z-axis.
///
/// * `w` - The direction vector.
#[inline]
pub fn cos_theta(w: &Vector3f) -> Float {
    w.z
}

/// Returns the absolute value of the cosine of the angle θ measured from the
/// given direction to the z-axis.
///
/// * `w` - The direction vector.
#[inline]
pub fn abs_cos_theta(w: &Vector3f) -> Float {
    abs(w.z)
}

/// Returns the square of the sine of the angle θ measured from the given
/// direction to the z-axis.
///
/// * `w` - The direction vector.
#[inline]
pub fn sin_2_theta(w: &Vector3f) -> Float {
    max(0.0, 1.0 - w.z * w.z)
}

/// Returns the cosine of the angle ΔΦ between two vector's Φ values in the
/// shading coordinate system.
///
/// The result is clamped to [-1, 1] and is 1 when either direction lies along
/// the z-axis.
///
/// * `wa` - First direction vector.
/// * `wb` - Second direction vector.
pub fn cos_d_phi(wa: &Vector3f, wb: &Vector3f) -> Float {
    let waxy = wa.x * wa.x + wa.y * wa.y;
    let wbxy = wb.x * wb.x + wb.y * wb.y;
    if waxy == 0.0 || wbxy == 0.0 {
        1.0
    } else {
        clamp(
            (wa.x * wb.x + wa.y * wb.y) / (waxy * wbxy).sqrt(),
            -1.0,
            1.0,
        )
    }
}

/// Returns `true` if two vectors are in the same hemisphere.
///
/// * `w`  - First vector.
/// * `wp` - Second vector.
#[inline]
pub fn same_hemisphere(w: &Vector3f, wp: &Vector3f) -> bool {
    w.z * wp.z > 0.0
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
    fn cos_d_phi_along_normal_is_one() {
        let n = Vector3f::new(0.0, 0.0, 1.0);
        let w = Vector3f::new(0.6, 0.0, 0.8);
        assert_eq!(cos_d_phi(&n, &w), 1.0);
        assert_eq!(cos_d_phi(&w, &n), 1.0);
    }

    #[test]
    fn cos_d_phi_opposite_azimuths() {
        let a = Vector3f::new(0.6, 0.0, 0.8);
        let b = Vector3f::new(-0.3, 0.0, 0.5);
        assert_eq!(cos_d_phi(&a, &b), -1.0);
    }

    #[test]
    fn hemisphere_checks() {
        let up = Vector3f::new(0.0, 0.6, 0.8);
        let down = Vector3f::new(0.0, 0.6, -0.8);
        assert!(same_hemisphere(&up, &up));
        assert!(!same_hemisphere(&up, &down));
        assert_eq!(abs_cos_theta(&down), 0.8);
        assert!(approx_eq!(Float, sin_2_theta(&down), 0.36, epsilon = 1e-6));
    }

    proptest! {
        #[test]
        fn cos_d_phi_matches_angle_difference(
            pa in 0.0..TWO_PI,
            pb in 0.0..TWO_PI,
            za in -0.9..0.9f32,
            zb in -0.9..0.9f32,
        ) {
            let ra = (1.0 - za * za).sqrt();
            let rb = (1.0 - zb * zb).sqrt();
            let a = Vector3f::new(ra * pa.cos(), ra * pa.sin(), za);
            let b = Vector3f::new(rb * pb.cos(), rb * pb.sin(), zb);
            prop_assert!(approx_eq!(Float, cos_d_phi(&a, &b), (pa - pb).cos(), epsilon = 1e-4));
        }
    }
}
