//! Geometry

#[cfg(test)]
#[macro_export]
macro_rules! prop_range {
    ($name: ident, $t: ty, $r: expr) => {
        prop_compose! {
            fn $name()(f in $r) -> $t {
                f
            }
        }
    };
}

#[cfg(test)]
#[macro_export]
macro_rules! prop_vector3 {
    ($name: ident, $t: ty, $xr: expr, $yr: expr, $zr: expr) => {
        prop_compose! {
            fn $name()(x in $xr, y in $yr, z in $zr) -> Vector3<$t> {
                Vector3 { x, y, z }
            }
        }
    };
}

/// Generates a strategy for unit directions in the shading frame whose
/// z-component (the elevation cosine) is drawn from the given range.
#[cfg(test)]
#[macro_export]
macro_rules! prop_direction {
    ($name: ident, $zr: expr) => {
        prop_compose! {
            fn $name()(z in $zr, phi in 0.0..$crate::pbrt::TWO_PI) -> $crate::geometry::Vector3f {
                let r = (1.0 - z * z).max(0.0).sqrt();
                $crate::geometry::Vector3f::new(r * phi.cos(), r * phi.sin(), z)
            }
        }
    };
}

mod common;
mod point2;
mod vector3;

// Re-export
pub use common::*;
pub use point2::*;
pub use vector3::*;
