//! Nearest neighbor search implementations

use pointsel_core::{
    squared_distance, CloudId, Error, NearestNeighborSearch, Point3f, PointCloud, PointIndex,
    Result,
};
use rstar::primitives::GeomWithData;
use rstar::RTree;
use std::fmt;
use tracing::{debug, warn};

/// A point coordinate cached in the tree, tagged with its cloud index
type IndexedPoint = GeomWithData<[f32; 3], usize>;

#[inline]
fn to_array(point: &Point3f) -> [f32; 3] {
    [point.x, point.y, point.z]
}

#[inline]
fn is_finite(point: &Point3f) -> bool {
    point.coords.iter().all(|c| c.is_finite())
}

/// Queries with NaN or infinite coordinates cannot be answered by the tree
fn check_query(point: &Point3f) -> Result<()> {
    if is_finite(point) {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "query point must have finite coordinates, got {:?}",
            point.coords
        )))
    }
}

/// Order by squared distance, then by index, and keep the first `k`
fn sort_and_truncate(hits: &mut Vec<(PointIndex, f32)>, k: usize) {
    hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    hits.truncate(k);
}

struct Binding {
    cloud: CloudId,
    generation: u64,
    tree: RTree<IndexedPoint>,
}

/// R*-tree over the coordinates of one bound point cloud.
///
/// The index remembers which cloud it was built from (by identity) and the
/// cloud's generation. Binding the same, unmodified cloud again is free;
/// selection reorders do not touch the generation and never force a rebuild.
#[derive(Default)]
pub struct SpatialIndex {
    binding: Option<Binding>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index and bind it to `cloud` in one step
    pub fn from_cloud(cloud: &PointCloud) -> Self {
        let mut index = Self::new();
        index.bind(cloud);
        index
    }

    /// Bind the index to `cloud`, rebuilding the tree unless it already
    /// describes this cloud. Returns `true` when a rebuild happened.
    ///
    /// Points with non-finite coordinates are left out of the tree and are
    /// never reported as neighbors.
    pub fn bind(&mut self, cloud: &PointCloud) -> bool {
        if self.is_bound_to(cloud) {
            return false;
        }

        let items: Vec<IndexedPoint> = cloud
            .iter()
            .enumerate()
            .filter(|(_, p)| is_finite(p))
            .map(|(i, p)| GeomWithData::new(to_array(p), i))
            .collect();
        let skipped = cloud.len() - items.len();
        if skipped > 0 {
            warn!(skipped, "points with non-finite coordinates left out of the spatial index");
        }
        let tree = RTree::bulk_load(items);
        debug!(
            points = cloud.len(),
            generation = cloud.generation(),
            "rebuilt spatial index"
        );

        self.binding = Some(Binding {
            cloud: cloud.id(),
            generation: cloud.generation(),
            tree,
        });
        true
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn is_bound_to(&self, cloud: &PointCloud) -> bool {
        self.binding
            .as_ref()
            .is_some_and(|b| b.cloud == cloud.id() && b.generation == cloud.generation())
    }

    /// Drop the tree and forget the bound cloud
    pub fn unbind(&mut self) {
        self.binding = None;
    }

    /// Number of indexed points (finite ones only)
    pub fn len(&self) -> usize {
        self.binding.as_ref().map_or(0, |b| b.tree.size())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn tree(&self) -> Result<&RTree<IndexedPoint>> {
        self.binding.as_ref().map(|b| &b.tree).ok_or(Error::NotBound)
    }

    /// Up to `k` `(index, squared distance)` pairs, closest first
    pub fn k_nearest(&self, query: &Point3f, k: usize) -> Result<Vec<(PointIndex, f32)>> {
        let tree = self.tree()?;
        check_query(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        // keep pulling past the k-th hit while distances tie, so the
        // index tie-break sees every candidate at the cut-off distance
        let mut hits: Vec<(PointIndex, f32)> = Vec::with_capacity(k);
        for (item, d2) in tree.nearest_neighbor_iter_with_distance_2(&to_array(query)) {
            if hits.len() >= k && d2 > hits[k - 1].1 {
                break;
            }
            hits.push((PointIndex::new(item.data), d2));
        }

        sort_and_truncate(&mut hits, k);
        Ok(hits)
    }

    /// Indices strictly closer than `radius` to `center`, unordered
    pub fn within_radius(&self, center: &Point3f, radius: f32) -> Result<Vec<PointIndex>> {
        let tree = self.tree()?;
        check_query(center)?;
        if !(radius > 0.0) {
            return Ok(Vec::new());
        }

        let radius_squared = radius * radius;
        let center = to_array(center);
        Ok(tree
            .locate_within_distance(center, radius_squared)
            .filter(|item| {
                let p = item.geom();
                let (dx, dy, dz) = (p[0] - center[0], p[1] - center[1], p[2] - center[2]);
                dx * dx + dy * dy + dz * dz < radius_squared
            })
            .map(|item| PointIndex::new(item.data))
            .collect())
    }

    /// Closest indexed point, if any
    pub fn nearest(&self, query: &Point3f) -> Result<Option<(PointIndex, f32)>> {
        Ok(self.k_nearest(query, 1)?.into_iter().next())
    }
}

impl NearestNeighborSearch for SpatialIndex {
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Result<Vec<(PointIndex, f32)>> {
        self.k_nearest(query, k)
    }

    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Result<Vec<PointIndex>> {
        self.within_radius(query, radius)
    }
}

impl fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.binding {
            Some(b) => f
                .debug_struct("SpatialIndex")
                .field("cloud", &b.cloud)
                .field("generation", &b.generation)
                .field("points", &b.tree.size())
                .finish(),
            None => f.write_str("SpatialIndex(unbound)"),
        }
    }
}

/// Simple brute force nearest neighbor search for small datasets
pub struct BruteForceSearch {
    points: Vec<Point3f>,
}

impl BruteForceSearch {
    pub fn new(points: &[Point3f]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }

    pub fn from_cloud(cloud: &PointCloud) -> Self {
        Self::new(cloud.positions())
    }
}

impl NearestNeighborSearch for BruteForceSearch {
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Result<Vec<(PointIndex, f32)>> {
        let mut distances: Vec<(PointIndex, f32)> = self
            .points
            .iter()
            .enumerate()
            .map(|(idx, point)| (PointIndex::new(idx), squared_distance(point, query)))
            .collect();

        sort_and_truncate(&mut distances, k);
        Ok(distances)
    }

    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Result<Vec<PointIndex>> {
        let radius_squared = radius * radius;
        Ok(self
            .points
            .iter()
            .enumerate()
            .filter(|(_, point)| squared_distance(point, query) < radius_squared)
            .map(|(idx, _)| PointIndex::new(idx))
            .collect())
    }
}
