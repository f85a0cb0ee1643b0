//! Point cloud store with a partitioned selection
//!
//! Coordinates and normals live in arrays addressed by [`PointIndex`] and are
//! never moved by selection changes. The selection is a permutation of those
//! indices (the position order) plus a cut: positions before the cut are
//! unselected, positions from the cut onward are selected. Iterating either
//! side is a plain slice walk.

use crate::error::{Error, Result};
use crate::point::*;
use std::ops::{Index, IndexMut};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CLOUD_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a point cloud.
///
/// Spatial indices compare clouds by identity, never by value. Cloning a
/// cloud produces a new identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloudId(u64);

impl CloudId {
    fn fresh() -> Self {
        Self(NEXT_CLOUD_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A point cloud with optional normals and a selected/unselected partition
#[derive(Debug)]
pub struct PointCloud {
    points: Vec<Point3f>,
    normals: Option<Vec<Vector3f>>,
    order: Vec<PointIndex>,
    first_selected: usize,
    id: CloudId,
    generation: u64,
}

impl PointCloud {
    /// Create a new empty point cloud
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a new point cloud with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            normals: None,
            order: Vec::with_capacity(capacity),
            first_selected: 0,
            id: CloudId::fresh(),
            generation: 0,
        }
    }

    /// Create a point cloud from a vector of points, nothing selected
    pub fn from_points(points: Vec<Point3f>) -> Self {
        let order = (0..points.len()).map(PointIndex::new).collect();
        let first_selected = points.len();
        Self {
            points,
            normals: None,
            order,
            first_selected,
            id: CloudId::fresh(),
            generation: 0,
        }
    }

    /// Create a point cloud carrying a normal attribute
    pub fn from_points_and_normals(points: Vec<Point3f>, normals: Vec<Vector3f>) -> Result<Self> {
        if points.len() != normals.len() {
            return Err(Error::InvalidParameter(format!(
                "{} points but {} normals",
                points.len(),
                normals.len()
            )));
        }
        let mut cloud = Self::from_points(points);
        cloud.normals = Some(normals);
        Ok(cloud)
    }

    /// Identity used by spatial indices to detect a different cloud
    pub fn id(&self) -> CloudId {
        self.id
    }

    /// Bumped whenever coordinates are added, removed or modified.
    /// Selection changes leave it untouched.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Get the number of points in the cloud
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Coordinates in index order
    pub fn positions(&self) -> &[Point3f] {
        &self.points
    }

    /// Get an iterator over the points in index order
    pub fn iter(&self) -> std::slice::Iter<'_, Point3f> {
        self.points.iter()
    }

    pub fn get(&self, index: PointIndex) -> Option<&Point3f> {
        self.points.get(index.get())
    }

    /// Coordinates of a point. Panics if the index does not belong to this cloud.
    pub fn point(&self, index: PointIndex) -> &Point3f {
        &self.points[index.get()]
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Declare a normal attribute, initialised to zero vectors
    pub fn add_normal_map(&mut self) {
        if self.normals.is_none() {
            self.normals = Some(vec![Vector3f::zeros(); self.points.len()]);
        }
    }

    pub fn normal(&self, index: PointIndex) -> Option<&Vector3f> {
        self.normals.as_ref().and_then(|n| n.get(index.get()))
    }

    pub fn set_normal(&mut self, index: PointIndex, normal: Vector3f) -> Result<()> {
        let len = self.points.len();
        let normals = self
            .normals
            .as_mut()
            .ok_or_else(|| Error::InvalidParameter("point cloud has no normal attribute".to_string()))?;
        let slot = normals
            .get_mut(index.get())
            .ok_or(Error::InvalidIndex { index: index.get(), len })?;
        *slot = normal;
        Ok(())
    }

    /// Add an unselected point to the cloud. Its normal, if the cloud has a
    /// normal attribute, starts as the zero vector.
    pub fn push(&mut self, point: Point3f) -> PointIndex {
        let index = PointIndex::new(self.points.len());
        self.points.push(point);
        if let Some(normals) = &mut self.normals {
            normals.push(Vector3f::zeros());
        }

        // keep the newcomer on the unselected side of the cut
        self.order.push(index);
        let last = self.order.len() - 1;
        self.order.swap(self.first_selected, last);
        self.first_selected += 1;

        self.generation += 1;
        index
    }

    /// Add an unselected point together with its normal.
    /// Declares the normal attribute if the cloud does not have one yet.
    pub fn push_with_normal(&mut self, point: Point3f, normal: Vector3f) -> PointIndex {
        self.add_normal_map();
        let index = self.push(point);
        if let Some(normals) = &mut self.normals {
            normals[index.get()] = normal;
        }
        index
    }

    /// Copy one point (and its normal when both clouds carry normals) from
    /// another cloud. The copy is unselected.
    pub fn insert_from(&mut self, other: &PointCloud, index: PointIndex) -> Result<PointIndex> {
        let point = *other.get(index).ok_or(Error::InvalidIndex {
            index: index.get(),
            len: other.len(),
        })?;
        match (self.has_normals(), other.normal(index)) {
            (true, Some(normal)) => Ok(self.push_with_normal(point, *normal)),
            _ => Ok(self.push(point)),
        }
    }

    /// Reserve capacity for additional points
    pub fn reserve(&mut self, additional: usize) {
        self.points.reserve(additional);
        self.order.reserve(additional);
        if let Some(normals) = &mut self.normals {
            normals.reserve(additional);
        }
    }

    /// Clear all points from the cloud
    pub fn clear(&mut self) {
        self.points.clear();
        self.order.clear();
        if let Some(normals) = &mut self.normals {
            normals.clear();
        }
        self.first_selected = 0;
        self.generation += 1;
    }

    /// Position order: every index exactly once, unselected ones first
    pub fn order(&self) -> &[PointIndex] {
        &self.order
    }

    /// Index stored at a position of the order
    pub fn index_at(&self, position: usize) -> PointIndex {
        self.order[position]
    }

    pub fn point_at(&self, position: usize) -> &Point3f {
        self.point(self.order[position])
    }

    /// Position of the selection cut
    pub fn first_selected(&self) -> usize {
        self.first_selected
    }

    pub fn selected_indices(&self) -> &[PointIndex] {
        &self.order[self.first_selected..]
    }

    pub fn unselected_indices(&self) -> &[PointIndex] {
        &self.order[..self.first_selected]
    }

    pub fn selected_count(&self) -> usize {
        self.order.len() - self.first_selected
    }

    pub fn has_selection(&self) -> bool {
        self.selected_count() > 0
    }

    pub fn is_selection_empty(&self) -> bool {
        !self.has_selection()
    }

    /// Linear in the number of selected points; use [`selection_mask`] for
    /// repeated lookups.
    ///
    /// [`selection_mask`]: PointCloud::selection_mask
    pub fn is_selected(&self, index: PointIndex) -> bool {
        self.selected_indices().contains(&index)
    }

    /// One flag per point, addressed by index
    pub fn selection_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.points.len()];
        for index in self.selected_indices() {
            mask[index.get()] = true;
        }
        mask
    }

    pub fn select_all(&mut self) {
        self.first_selected = 0;
    }

    pub fn clear_selection(&mut self) {
        self.first_selected = self.order.len();
    }

    /// Swap the selected and unselected sides by reversing the position order
    pub fn invert_selection(&mut self) {
        self.order.reverse();
        self.first_selected = self.order.len() - self.first_selected;
    }

    /// Reorder positions so that exactly the flagged indices are selected.
    ///
    /// `selected` is addressed by index. Relative order is preserved on both
    /// sides of the cut.
    pub fn repartition(&mut self, selected: &[bool]) -> Result<()> {
        if selected.len() != self.points.len() {
            return Err(Error::InvalidParameter(format!(
                "selection mask has {} entries for {} points",
                selected.len(),
                self.points.len()
            )));
        }

        let (mut head, tail): (Vec<PointIndex>, Vec<PointIndex>) =
            self.order.iter().partition(|idx| !selected[idx.get()]);
        self.first_selected = head.len();
        head.extend(tail);
        self.order = head;
        Ok(())
    }

    /// Remove every selected point. Remaining points get new, dense indices
    /// following their old index order. Returns the number of erased points.
    pub fn erase_selected(&mut self) -> usize {
        let erased = self.selected_count();
        if erased == 0 {
            return 0;
        }

        let selected = self.selection_mask();
        let mut remap = vec![None; self.points.len()];
        let mut next = 0;
        for (old, &is_selected) in selected.iter().enumerate() {
            if !is_selected {
                remap[old] = Some(PointIndex::new(next));
                next += 1;
            }
        }

        let mut slot = 0;
        self.points.retain(|_| {
            let kept = !selected[slot];
            slot += 1;
            kept
        });
        if let Some(normals) = &mut self.normals {
            let mut slot = 0;
            normals.retain(|_| {
                let kept = !selected[slot];
                slot += 1;
                kept
            });
        }

        self.order = self.order[..self.first_selected]
            .iter()
            .filter_map(|idx| remap[idx.get()])
            .collect();
        self.first_selected = self.order.len();
        self.generation += 1;
        erased
    }

    /// Build a new cloud holding copies of the selected points, in position
    /// order, with nothing selected
    pub fn extract_selected(&self) -> PointCloud {
        let mut cloud = PointCloud::with_capacity(self.selected_count());
        if self.has_normals() {
            cloud.add_normal_map();
        }
        for &index in self.selected_indices() {
            match self.normal(index) {
                Some(normal) => cloud.push_with_normal(self.points[index.get()], *normal),
                None => cloud.push(self.points[index.get()]),
            };
        }
        cloud
    }
}

impl Default for PointCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PointCloud {
    fn clone(&self) -> Self {
        Self {
            points: self.points.clone(),
            normals: self.normals.clone(),
            order: self.order.clone(),
            first_selected: self.first_selected,
            id: CloudId::fresh(),
            generation: 0,
        }
    }
}

impl Index<PointIndex> for PointCloud {
    type Output = Point3f;

    fn index(&self, index: PointIndex) -> &Self::Output {
        &self.points[index.get()]
    }
}

impl IndexMut<PointIndex> for PointCloud {
    fn index_mut(&mut self, index: PointIndex) -> &mut Self::Output {
        self.generation += 1;
        &mut self.points[index.get()]
    }
}

impl<'a> IntoIterator for &'a PointCloud {
    type Item = &'a Point3f;
    type IntoIter = std::slice::Iter<'a, Point3f>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl Extend<Point3f> for PointCloud {
    fn extend<I: IntoIterator<Item = Point3f>>(&mut self, iter: I) {
        for point in iter {
            self.push(point);
        }
    }
}

impl FromIterator<Point3f> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point3f>>(iter: I) -> Self {
        Self::from_points(Vec::from_iter(iter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_cloud(n: usize) -> PointCloud {
        (0..n).map(|i| Point3f::new(i as f32, 0.0, 0.0)).collect()
    }

    /// Positions before the cut report unselected, the rest selected
    fn assert_partition(cloud: &PointCloud, expected: &[bool]) {
        let k = cloud.first_selected();
        for (position, idx) in cloud.order().iter().enumerate() {
            assert_eq!(position >= k, expected[idx.get()], "position {} holds {}", position, idx);
        }
        let mut seen: Vec<usize> = cloud.order().iter().map(|i| i.get()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..cloud.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_new_cloud_has_no_selection() {
        let cloud = line_cloud(4);
        assert_eq!(cloud.len(), 4);
        assert_eq!(cloud.first_selected(), 4);
        assert!(cloud.is_selection_empty());
        assert!(!cloud.has_normals());
    }

    #[test]
    fn test_repartition_all_sizes() {
        for n in 0..12 {
            let mut cloud = line_cloud(n);
            let mask: Vec<bool> = (0..n).map(|i| i % 3 == 1).collect();
            cloud.repartition(&mask).unwrap();
            assert_partition(&cloud, &mask);
            assert_eq!(cloud.selected_count(), mask.iter().filter(|&&s| s).count());
        }
    }

    #[test]
    fn test_repartition_is_stable() {
        let mut cloud = line_cloud(6);
        cloud.repartition(&[true, false, true, false, true, false]).unwrap();
        let order: Vec<usize> = cloud.order().iter().map(|i| i.get()).collect();
        assert_eq!(order, vec![1, 3, 5, 0, 2, 4]);
        assert_eq!(cloud.first_selected(), 3);
    }

    #[test]
    fn test_repartition_rejects_wrong_mask_length() {
        let mut cloud = line_cloud(3);
        let result = cloud.repartition(&[true]);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_select_all_clear_invert() {
        let mut cloud = line_cloud(5);
        cloud.select_all();
        assert_eq!(cloud.selected_count(), 5);

        cloud.clear_selection();
        assert_eq!(cloud.selected_count(), 0);

        let mask = [true, true, false, false, false];
        cloud.repartition(&mask).unwrap();
        cloud.invert_selection();
        let inverted: Vec<bool> = mask.iter().map(|s| !s).collect();
        assert_partition(&cloud, &inverted);

        cloud.invert_selection();
        assert_partition(&cloud, &mask);
    }

    #[test]
    fn test_selection_changes_keep_generation() {
        let mut cloud = line_cloud(5);
        let generation = cloud.generation();
        cloud.select_all();
        cloud.invert_selection();
        cloud.repartition(&[true, false, true, false, true]).unwrap();
        assert_eq!(cloud.generation(), generation);

        cloud.push(Point3f::new(9.0, 9.0, 9.0));
        assert!(cloud.generation() > generation);
    }

    #[test]
    fn test_push_keeps_new_point_unselected() {
        let mut cloud = line_cloud(4);
        cloud.repartition(&[false, true, false, true]).unwrap();
        let idx = cloud.push(Point3f::new(10.0, 0.0, 0.0));
        assert_eq!(idx, PointIndex::new(4));
        assert!(!cloud.is_selected(idx));
        assert_partition(&cloud, &[false, true, false, true, false]);
    }

    #[test]
    fn test_clone_gets_new_identity() {
        let cloud = line_cloud(3);
        let copy = cloud.clone();
        assert_ne!(cloud.id(), copy.id());
        assert_eq!(cloud.positions(), copy.positions());
    }

    #[test]
    fn test_erase_selected_compacts_indices() {
        let mut cloud = line_cloud(6);
        cloud.repartition(&[false, true, false, true, true, false]).unwrap();
        let erased = cloud.erase_selected();
        assert_eq!(erased, 3);
        assert_eq!(cloud.len(), 3);
        assert!(cloud.is_selection_empty());
        let xs: Vec<f32> = cloud.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 2.0, 5.0]);
        assert_partition(&cloud, &[false, false, false]);
    }

    #[test]
    fn test_extract_selected_copies_normals() {
        let points = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(2.0, 0.0, 0.0),
        ];
        let normals = vec![Vector3f::x(), Vector3f::y(), Vector3f::z()];
        let mut cloud = PointCloud::from_points_and_normals(points, normals).unwrap();
        cloud.repartition(&[false, true, true]).unwrap();

        let extracted = cloud.extract_selected();
        assert_eq!(extracted.len(), 2);
        assert!(extracted.has_normals());
        assert!(extracted.is_selection_empty());
        assert_eq!(extracted[PointIndex::new(0)], Point3f::new(1.0, 0.0, 0.0));
        assert_eq!(extracted.normal(PointIndex::new(1)), Some(&Vector3f::z()));
    }

    #[test]
    fn test_insert_from_out_of_range() {
        let source = line_cloud(2);
        let mut target = PointCloud::new();
        let result = target.insert_from(&source, PointIndex::new(7));
        assert_eq!(result, Err(Error::InvalidIndex { index: 7, len: 2 }));
    }

    #[test]
    fn test_mismatched_normals_rejected() {
        let result = PointCloud::from_points_and_normals(vec![Point3f::origin()], vec![]);
        assert!(result.is_err());
    }
}
