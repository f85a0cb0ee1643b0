//! Core traits for pointsel

use crate::{error::Result, point::*, point_cloud::*};

/// Trait for nearest neighbor search functionality
pub trait NearestNeighborSearch {
    /// Find up to `k` nearest neighbors to a query point as
    /// `(index, squared distance)` pairs, closest first. Equal distances are
    /// ordered by index.
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Result<Vec<(PointIndex, f32)>>;

    /// Find all points strictly closer than `radius` to the query point, in no
    /// particular order.
    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Result<Vec<PointIndex>>;
}

/// Trait for objects with a spatial extent
pub trait Bounded {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> (Point3f, Point3f);

    /// Get the center point of the object
    fn center(&self) -> Point3f {
        let (min, max) = self.bounding_box();
        Point3f::new(
            (min.x + max.x) / 2.0,
            (min.y + max.y) / 2.0,
            (min.z + max.z) / 2.0,
        )
    }

    /// Length of the bounding box diagonal
    fn diagonal_length(&self) -> f32 {
        let (min, max) = self.bounding_box();
        (max - min).norm()
    }
}

impl Bounded for PointCloud {
    fn bounding_box(&self) -> (Point3f, Point3f) {
        if self.is_empty() {
            return (Point3f::origin(), Point3f::origin());
        }

        let first_point = self.positions()[0];
        let mut min = first_point;
        let mut max = first_point;

        for p in self.iter() {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);

            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        (min, max)
    }
}
