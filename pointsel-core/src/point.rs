//! Point types and related functionality

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// Stable handle of a point inside the cloud that owns it.
///
/// Indices are assigned densely from zero in insertion order. Reordering the
/// selection never changes them; erasing or clearing points does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PointIndex(usize);

impl PointIndex {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The raw slot of this point in the owning cloud's attribute arrays
    pub const fn get(self) -> usize {
        self.0
    }
}

impl From<usize> for PointIndex {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl From<PointIndex> for usize {
    fn from(index: PointIndex) -> Self {
        index.0
    }
}

impl fmt::Display for PointIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Squared Euclidean distance between two points
#[inline]
pub fn squared_distance(a: &Point3f, b: &Point3f) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = a.z - b.z;
    dx * dx + dy * dy + dz * dz
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_index_roundtrip() {
        let idx = PointIndex::from(42);
        assert_eq!(idx.get(), 42);
        assert_eq!(usize::from(idx), 42);
        assert_eq!(idx.to_string(), "#42");
    }

    #[test]
    fn test_squared_distance() {
        let a = Point3f::new(1.0, 2.0, 3.0);
        let b = Point3f::new(4.0, 6.0, 3.0);
        assert_relative_eq!(squared_distance(&a, &b), 25.0);
        assert_relative_eq!(squared_distance(&a, &a), 0.0);
    }
}
