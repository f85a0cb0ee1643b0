//! Predicate-based bulk selection
//!
//! Every point is tested against an "inside" predicate and the result is
//! merged with the point's current selection state. Evaluation reads a
//! snapshot of the old selection and writes a fresh mask, so the parallel and
//! serial paths give identical results.

use pointsel_core::{squared_distance, Point3f, PointCloud, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a predicate result is merged with the existing selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CombineMode {
    /// Selection becomes the predicate result
    #[default]
    Replace,
    Union,
    Intersect,
    /// Remove points matching the predicate
    Subtract,
}

impl CombineMode {
    #[inline]
    pub fn combine(self, already_selected: bool, inside: bool) -> bool {
        match self {
            CombineMode::Replace => inside,
            CombineMode::Union => already_selected || inside,
            CombineMode::Intersect => already_selected && inside,
            CombineMode::Subtract => already_selected && !inside,
        }
    }
}

/// Whether the classifier runs on the rayon pool or on the calling thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionPolicy {
    #[default]
    Parallel,
    Serial,
}

/// Axis-aligned box in the cloud's coordinate frame, bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisAlignedBox {
    pub min: Point3f,
    pub max: Point3f,
}

impl AxisAlignedBox {
    /// Box spanned by any two opposite corners
    pub fn from_corners(a: Point3f, b: Point3f) -> Self {
        Self {
            min: Point3f::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3f::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn contains(&self, p: &Point3f) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

/// Region of space that can be turned into a selection
pub enum SelectionVolume {
    Box(AxisAlignedBox),
    /// Closed ball around a center
    Sphere { center: Point3f, radius: f32 },
    /// Caller-provided test, e.g. a projected lasso
    Custom(Box<dyn Fn(&Point3f) -> bool + Send + Sync>),
}

impl SelectionVolume {
    pub fn custom<F>(inside: F) -> Self
    where
        F: Fn(&Point3f) -> bool + Send + Sync + 'static,
    {
        SelectionVolume::Custom(Box::new(inside))
    }

    pub fn contains(&self, p: &Point3f) -> bool {
        match self {
            SelectionVolume::Box(bounds) => bounds.contains(p),
            SelectionVolume::Sphere { center, radius } => squared_distance(p, center) <= radius * radius,
            SelectionVolume::Custom(inside) => inside(p),
        }
    }
}

impl From<AxisAlignedBox> for SelectionVolume {
    fn from(bounds: AxisAlignedBox) -> Self {
        SelectionVolume::Box(bounds)
    }
}

impl std::fmt::Debug for SelectionVolume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionVolume::Box(bounds) => f.debug_tuple("Box").field(bounds).finish(),
            SelectionVolume::Sphere { center, radius } => f
                .debug_struct("Sphere")
                .field("center", center)
                .field("radius", radius)
                .finish(),
            SelectionVolume::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Applies a per-point predicate to a whole cloud
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkClassifier {
    mode: CombineMode,
    policy: ExecutionPolicy,
}

impl BulkClassifier {
    pub fn new(mode: CombineMode) -> Self {
        Self {
            mode,
            policy: ExecutionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn mode(&self) -> CombineMode {
        self.mode
    }

    pub fn policy(&self) -> ExecutionPolicy {
        self.policy
    }

    /// New selection mask (addressed by point index) without committing it
    pub fn evaluate<F>(&self, cloud: &PointCloud, inside: F) -> Vec<bool>
    where
        F: Fn(&Point3f) -> bool + Sync,
    {
        let old = cloud.selection_mask();
        let mode = self.mode;
        match self.policy {
            ExecutionPolicy::Parallel => cloud
                .positions()
                .par_iter()
                .zip(old.par_iter())
                .map(|(p, &was)| mode.combine(was, inside(p)))
                .collect(),
            ExecutionPolicy::Serial => cloud
                .positions()
                .iter()
                .zip(old.iter())
                .map(|(p, &was)| mode.combine(was, inside(p)))
                .collect(),
        }
    }

    /// Classify every point and commit the combined selection.
    /// Returns the number of selected points afterwards.
    pub fn classify<F>(&self, cloud: &mut PointCloud, inside: F) -> Result<usize>
    where
        F: Fn(&Point3f) -> bool + Sync,
    {
        if cloud.is_empty() {
            return Ok(0);
        }

        let selected = self.evaluate(cloud, inside);
        cloud.repartition(&selected)?;
        debug!(
            mode = ?self.mode,
            policy = ?self.policy,
            selected = cloud.selected_count(),
            "classified point cloud"
        );
        Ok(cloud.selected_count())
    }

    /// Classify against an axis-aligned box
    pub fn classify_box(&self, cloud: &mut PointCloud, bounds: &AxisAlignedBox) -> Result<usize> {
        self.classify(cloud, |p| bounds.contains(p))
    }

    pub fn classify_volume(&self, cloud: &mut PointCloud, volume: &SelectionVolume) -> Result<usize> {
        self.classify(cloud, |p| volume.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointsel_core::PointIndex;
    use std::collections::BTreeSet;

    /// 100 points with x in [-4.95, 4.95], half of them at positive x
    fn line_cloud() -> PointCloud {
        (0..100)
            .map(|i| Point3f::new(i as f32 * 0.1 - 4.95, (i % 10) as f32, 0.0))
            .collect()
    }

    fn selected_set(cloud: &PointCloud) -> BTreeSet<usize> {
        cloud.selected_indices().iter().map(|i| i.get()).collect()
    }

    fn positive_x(p: &Point3f) -> bool {
        p.x > 0.0
    }

    /// prior selection: every third point
    fn with_prior(cloud: &mut PointCloud) -> BTreeSet<usize> {
        let mask: Vec<bool> = (0..cloud.len()).map(|i| i % 3 == 0).collect();
        cloud.repartition(&mask).unwrap();
        selected_set(cloud)
    }

    #[test]
    fn test_combine_truth_table() {
        use CombineMode::*;
        for (mode, expected) in [
            (Replace, [false, true, false, true]),
            (Union, [false, true, true, true]),
            (Intersect, [false, false, false, true]),
            (Subtract, [false, false, true, false]),
        ] {
            let got = [
                mode.combine(false, false),
                mode.combine(false, true),
                mode.combine(true, false),
                mode.combine(true, true),
            ];
            assert_eq!(got, expected, "{:?}", mode);
        }
    }

    #[test]
    fn test_replace_matches_predicate() {
        let mut cloud = line_cloud();
        with_prior(&mut cloud);
        let count = BulkClassifier::new(CombineMode::Replace)
            .classify(&mut cloud, positive_x)
            .unwrap();

        let inside: BTreeSet<usize> = (0..cloud.len())
            .filter(|&i| positive_x(cloud.point(PointIndex::new(i))))
            .collect();
        assert_eq!(count, 50);
        assert_eq!(selected_set(&cloud), inside);
    }

    #[test]
    fn test_union_contains_both_operands() {
        let mut cloud = line_cloud();
        let prior = with_prior(&mut cloud);
        BulkClassifier::new(CombineMode::Union)
            .classify(&mut cloud, positive_x)
            .unwrap();

        let result = selected_set(&cloud);
        assert!(result.is_superset(&prior));
        assert!((50..100).all(|i| result.contains(&i)));
    }

    #[test]
    fn test_intersect_within_both_operands() {
        let mut cloud = line_cloud();
        let prior = with_prior(&mut cloud);
        BulkClassifier::new(CombineMode::Intersect)
            .classify(&mut cloud, positive_x)
            .unwrap();

        let result = selected_set(&cloud);
        assert!(result.is_subset(&prior));
        assert!(result.iter().all(|&i| i >= 50));
        assert!(!result.is_empty());
    }

    #[test]
    fn test_subtract_removes_predicate_points() {
        let mut cloud = line_cloud();
        let prior = with_prior(&mut cloud);
        BulkClassifier::new(CombineMode::Subtract)
            .classify(&mut cloud, positive_x)
            .unwrap();

        let result = selected_set(&cloud);
        assert!(result.is_subset(&prior));
        assert!(result.iter().all(|&i| i < 50));
        assert_eq!(result, prior.iter().copied().filter(|&i| i < 50).collect::<BTreeSet<_>>());
    }

    #[test]
    fn test_serial_and_parallel_agree() {
        let mut cloud = line_cloud();
        with_prior(&mut cloud);
        let predicate = |p: &Point3f| (p.x * 3.0).sin() > 0.2 || p.y > 7.0;

        for mode in [CombineMode::Replace, CombineMode::Union, CombineMode::Intersect, CombineMode::Subtract] {
            let parallel = BulkClassifier::new(mode).evaluate(&cloud, predicate);
            let serial = BulkClassifier::new(mode)
                .with_policy(ExecutionPolicy::Serial)
                .evaluate(&cloud, predicate);
            assert_eq!(parallel, serial, "{:?}", mode);
        }
    }

    #[test]
    fn test_box_selection() {
        let mut cloud = line_cloud();
        let bounds = AxisAlignedBox::from_corners(Point3f::new(1.0, 5.0, 1.0), Point3f::new(-1.0, 0.0, -1.0));
        assert_eq!(bounds.min, Point3f::new(-1.0, 0.0, -1.0));

        BulkClassifier::default().classify_box(&mut cloud, &bounds).unwrap();
        for &idx in cloud.selected_indices() {
            assert!(bounds.contains(cloud.point(idx)));
        }
        for &idx in cloud.unselected_indices() {
            assert!(!bounds.contains(cloud.point(idx)));
        }
        assert!(cloud.has_selection());
    }

    #[test]
    fn test_volume_selection() {
        let mut cloud = line_cloud();
        let sphere = SelectionVolume::Sphere {
            center: Point3f::new(0.05, 0.0, 0.0),
            radius: 0.5,
        };
        // only point 50 sits at (0.05, 0, 0); its row neighbors are a unit away
        BulkClassifier::default().classify_volume(&mut cloud, &sphere).unwrap();
        assert_eq!(cloud.selected_indices(), &[PointIndex::new(50)]);

        let above = SelectionVolume::custom(|p| p.y > 8.5);
        let count = BulkClassifier::new(CombineMode::Union)
            .classify_volume(&mut cloud, &above)
            .unwrap();
        assert_eq!(count, 1 + 10);
        assert_eq!(format!("{:?}", above), "Custom(..)");
    }

    #[test]
    fn test_empty_cloud_is_noop() {
        let mut cloud = PointCloud::new();
        let count = BulkClassifier::new(CombineMode::Union)
            .classify(&mut cloud, |_| true)
            .unwrap();
        assert_eq!(count, 0);
    }
}
