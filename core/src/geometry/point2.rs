//! 2-D Points

use crate::pbrt::*;
use num_traits::Num;
use std::ops::{Index, IndexMut};

/// A 2-D point containing numeric values.
///
/// Also used to carry the pair of independent uniform random numbers that a
/// sampling routine consumes.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point2<T> {
    /// X-coordinate.
    pub x: T,

    /// Y-coordinate.
    pub y: T,
}

/// 2-D point containing `Float` values.
pub type Point2f = Point2<Float>;

impl<T: Num> Point2<T> {
    /// Creates a new 2-D point.
    ///
    /// * `x` - X-coordinate.
    /// * `y` - Y-coordinate.
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    /// Returns true if either coordinate is NaN.
    pub fn has_nans(&self) -> bool
    where
        T: num_traits::Float,
    {
        self.x.is_nan() || self.y.is_nan()
    }
}

impl<T> Index<usize> for Point2<T> {
    type Output = T;

    /// Index the point by an axis to get the immutable coordinate axis value.
    ///
    /// * `axis` -  0 for x-coordinate, any other value for y-coordinate.
    fn index(&self, axis: usize) -> &Self::Output {
        match axis {
            0 => &self.x,
            _ => &self.y,
        }
    }
}

impl<T> IndexMut<usize> for Point2<T> {
    /// Index the point by an axis to get a mutable coordinate axis value.
    ///
    /// * `axis` -  0 for x-coordinate, any other value for y-coordinate.
    fn index_mut(&mut self, axis: usize) -> &mut Self::Output {
        match axis {
            0 => &mut self.x,
            _ => &mut self.y,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_returns_coordinates() {
        let mut p = Point2f::new(0.25, 0.75);
        assert_eq!(p[0], 0.25);
        assert_eq!(p[1], 0.75);

        p[0] = 0.5;
        assert_eq!(p, Point2f::new(0.5, 0.75));
    }

    #[test]
    fn has_nans() {
        assert!(!Point2f::new(0.0, 0.0).has_nans());
        assert!(Point2f::new(f32::NAN, 0.0).has_nans());
    }
}
