//! Plane models and least-squares plane fitting

use nalgebra::{Matrix3, SymmetricEigen, Vector3, Vector4};
use pointsel_core::{Error, Point3f, Result, Vector3f};
use serde::{Deserialize, Serialize};

/// Ratio between the middle and largest covariance eigenvalues under which a
/// point set is treated as collinear
const COLLINEARITY_TOLERANCE: f64 = 1e-10;

/// A 3D plane model defined by the equation ax + by + cz + d = 0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneModel {
    /// Plane coefficients [a, b, c, d] where ax + by + cz + d = 0
    pub coefficients: Vector4<f32>,
}

impl PlaneModel {
    /// Create a new plane model from coefficients
    pub fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self {
            coefficients: Vector4::new(a, b, c, d),
        }
    }

    /// Least-squares plane through a set of points.
    ///
    /// The plane passes through the centroid and is orthogonal to the
    /// direction of least variance. Accumulation is done in double precision.
    /// Fails with [`Error::DegeneratePlaneFit`] for fewer than three points or
    /// when all points are collinear (or coincident).
    pub fn fit_least_squares<'a, I>(points: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Point3f>,
    {
        let points: Vec<Vector3<f64>> = points
            .into_iter()
            .map(|p| p.coords.cast::<f64>())
            .collect();
        let n = points.len();
        if n < 3 {
            return Err(Error::DegeneratePlaneFit { points: n });
        }

        let centroid = points.iter().sum::<Vector3<f64>>() / n as f64;
        let mut covariance = Matrix3::<f64>::zeros();
        for p in &points {
            let d = p - centroid;
            covariance += d * d.transpose();
        }

        let eigen = SymmetricEigen::new(covariance);
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));
        let middle = eigen.eigenvalues[order[1]];
        let largest = eigen.eigenvalues[order[2]];
        if largest <= 0.0 || middle <= largest * COLLINEARITY_TOLERANCE {
            return Err(Error::DegeneratePlaneFit { points: n });
        }

        let normal = eigen.eigenvectors.column(order[0]).normalize();
        let d = -normal.dot(&centroid);
        Ok(PlaneModel::new(
            normal.x as f32,
            normal.y as f32,
            normal.z as f32,
            d as f32,
        ))
    }

    /// Get the normal vector of the plane
    pub fn normal(&self) -> Vector3f {
        Vector3f::new(
            self.coefficients.x,
            self.coefficients.y,
            self.coefficients.z,
        )
    }

    /// Unit normal, or `None` for a plane with a vanishing normal
    pub fn unit_normal(&self) -> Option<Vector3f> {
        self.normal().try_normalize(1e-8)
    }

    /// Calculate the distance from a point to the plane
    pub fn distance_to_point(&self, point: &Point3f) -> f32 {
        self.squared_distance_to_point(point).sqrt()
    }

    /// Squared distance from a point to the plane
    pub fn squared_distance_to_point(&self, point: &Point3f) -> f32 {
        let normal = self.normal();
        let norm_squared = normal.norm_squared();

        if norm_squared < 1e-16 {
            return f32::INFINITY;
        }

        let signed = self.coefficients.x * point.x
            + self.coefficients.y * point.y
            + self.coefficients.z * point.z
            + self.coefficients.w;
        signed * signed / norm_squared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_distance_calculation() {
        // Create a plane at z=1
        let model = PlaneModel::new(0.0, 0.0, 1.0, -1.0);

        assert_relative_eq!(model.distance_to_point(&Point3f::new(0.0, 0.0, 1.0)), 0.0, epsilon = 1e-6);
        assert_relative_eq!(model.distance_to_point(&Point3f::new(3.0, 1.0, 2.0)), 1.0, epsilon = 1e-6);
        assert_relative_eq!(model.squared_distance_to_point(&Point3f::new(0.0, 0.0, -2.0)), 9.0, epsilon = 1e-5);
    }

    #[test]
    fn test_fit_tilted_plane() {
        // z = 0.5 x + 2
        let points: Vec<Point3f> = (0..5)
            .flat_map(|i| (0..5).map(move |j| (i as f32, j as f32)))
            .map(|(x, y)| Point3f::new(x, y, 0.5 * x + 2.0))
            .collect();
        let model = PlaneModel::fit_least_squares(&points).unwrap();

        for p in &points {
            assert!(model.distance_to_point(p) < 1e-4);
        }
        let n = model.unit_normal().unwrap();
        let expected = Vector3f::new(-0.5, 0.0, 1.0).normalize();
        assert_relative_eq!(n.dot(&expected).abs(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_fit_through_three_points() {
        let p = [
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(2.0, 0.0, 1.0),
            Point3f::new(0.0, 3.0, 1.0),
        ];
        let fitted = PlaneModel::fit_least_squares(&p).unwrap();
        for q in &p {
            assert!(fitted.distance_to_point(q) < 1e-6);
        }
        assert_relative_eq!(fitted.unit_normal().unwrap().z.abs(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(fitted.distance_to_point(&Point3f::new(5.0, 5.0, 3.0)), 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_fit_rejects_degenerate_input() {
        let two = [Point3f::origin(), Point3f::new(1.0, 0.0, 0.0)];
        assert_eq!(
            PlaneModel::fit_least_squares(&two),
            Err(Error::DegeneratePlaneFit { points: 2 })
        );

        let collinear: Vec<Point3f> = (0..6).map(|i| Point3f::new(i as f32, 2.0 * i as f32, 0.0)).collect();
        assert_eq!(
            PlaneModel::fit_least_squares(&collinear),
            Err(Error::DegeneratePlaneFit { points: 6 })
        );

        let coincident = vec![Point3f::new(1.0, 1.0, 1.0); 4];
        assert!(PlaneModel::fit_least_squares(&coincident).is_err());
    }
}
