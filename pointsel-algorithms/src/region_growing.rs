//! Region growing selection
//!
//! Starting from the neighborhood of a seed position, the region is grown
//! ring by ring through fixed-radius neighbor queries. A candidate joins the
//! region when it lies close to the current plane estimate and, for clouds
//! with normals, when its normal is aligned with the plane normal (front or
//! back facing). The plane is refitted from the whole region on a schedule
//! that becomes sparser as growth goes on.

use crate::nearest_neighbor::SpatialIndex;
use crate::plane::PlaneModel;
use pointsel_core::{Bounded, Error, Point3f, PointCloud, PointIndex, Result, Vector3f};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

/// Number of distinct positions in the initial support set around the seed
pub const INITIAL_SUPPORT: usize = 6;

/// Regions smaller than this keep their current plane
pub const MIN_REFIT_SUPPORT: usize = 5;

/// Lower bound for distance parameters derived from the scene size
const MIN_DERIVED_DISTANCE: f32 = 1e-5;

/// Configuration for region growing selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionGrowingConfig {
    /// Maximum distance from a candidate to the region's plane
    pub epsilon: f32,
    /// Radius of the neighborhood explored around each frontier point
    pub cluster_epsilon: f32,
    /// Maximum angle between a candidate normal and the plane normal, in degrees
    pub normal_threshold: f32,
}

impl Default for RegionGrowingConfig {
    /// Parameters for a scene with a unit bounding diagonal
    fn default() -> Self {
        Self::for_diagonal(1.0)
    }
}

impl RegionGrowingConfig {
    pub fn new(epsilon: f32, cluster_epsilon: f32, normal_threshold: f32) -> Result<Self> {
        let config = Self {
            epsilon,
            cluster_epsilon,
            normal_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    /// Distances scaled from the length of the scene's bounding diagonal:
    /// 0.5% for `epsilon`, 3% for `cluster_epsilon`, with a 20 degree
    /// normal threshold
    pub fn for_diagonal(diagonal: f32) -> Self {
        Self {
            epsilon: (0.005 * diagonal).max(MIN_DERIVED_DISTANCE),
            cluster_epsilon: (0.03 * diagonal).max(MIN_DERIVED_DISTANCE),
            normal_threshold: 20.0,
        }
    }

    /// Defaults scaled from the bounding box of `cloud`
    pub fn for_cloud(cloud: &PointCloud) -> Self {
        Self::for_diagonal(cloud.diagonal_length())
    }

    pub fn with_normal_threshold(mut self, degrees: f32) -> Self {
        self.normal_threshold = degrees;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "epsilon must be positive and finite, got {}",
                self.epsilon
            )));
        }
        if !self.cluster_epsilon.is_finite() || self.cluster_epsilon <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "cluster_epsilon must be positive and finite, got {}",
                self.cluster_epsilon
            )));
        }
        if !(0.0..=90.0).contains(&self.normal_threshold) {
            return Err(Error::InvalidParameter(format!(
                "normal_threshold must lie in [0, 90] degrees, got {}",
                self.normal_threshold
            )));
        }
        Ok(())
    }
}

/// Outcome of a region growing call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionGrowingResult {
    /// Number of points selected
    pub selected: usize,
    /// Number of expansion rounds, including the final round without growth
    pub rounds: usize,
    /// Number of successful plane refits after the initial fit
    pub refits: usize,
    /// Plane estimate at the end of growth
    pub plane: Option<PlaneModel>,
}

/// Dense refits early on, then every 10th round below 50, then every 500th
fn should_refit(round: usize) -> bool {
    round < 10 || (round < 50 && round % 10 == 0) || (round > 50 && round % 500 == 0)
}

/// Zero (or unnormalizable) normals are treated as inconsistent and reject
/// the candidate.
fn normal_is_consistent(normal: &Vector3f, plane_normal: &Vector3f, cos_threshold: f32) -> bool {
    match normal.try_normalize(f32::EPSILON) {
        Some(unit) => unit.dot(plane_normal).abs() >= cos_threshold,
        None => false,
    }
}

/// Nearest neighbors of `seed`, closest first, up to and including the hit
/// that brings the number of distinct positions to [`INITIAL_SUPPORT`].
/// Coincident points ride along with their first copy, so a stack of
/// duplicates under the seed does not starve the plane fit.
fn initial_support(cloud: &PointCloud, index: &SpatialIndex, seed: &Point3f) -> Result<Vec<PointIndex>> {
    let mut k = INITIAL_SUPPORT;
    loop {
        let hits = index.k_nearest(seed, k)?;
        let exhausted = hits.len() < k;

        let mut distinct: Vec<&Point3f> = Vec::with_capacity(INITIAL_SUPPORT);
        let mut support = Vec::with_capacity(hits.len());
        for (idx, _) in hits {
            let p = cloud.point(idx);
            if !distinct.contains(&p) {
                if distinct.len() == INITIAL_SUPPORT {
                    return Ok(support);
                }
                distinct.push(p);
            }
            support.push(idx);
        }

        if exhausted || distinct.len() == INITIAL_SUPPORT {
            return Ok(support);
        }
        k *= 2;
    }
}

/// Grow a planar region around `seed` and make it the cloud's selection.
///
/// The previous selection is replaced. An empty cloud is left untouched. If no
/// plane can be fitted through the seed's neighborhood the call fails with
/// [`Error::DegeneratePlaneFit`] and the selection is not modified.
pub fn grow_region(
    cloud: &mut PointCloud,
    index: &mut SpatialIndex,
    seed: &Point3f,
    config: &RegionGrowingConfig,
) -> Result<RegionGrowingResult> {
    config.validate()?;
    if !seed.coords.iter().all(|c| c.is_finite()) {
        return Err(Error::InvalidParameter(format!(
            "seed must have finite coordinates, got {:?}",
            seed.coords
        )));
    }
    if cloud.is_empty() {
        debug!("region growing requested on an empty cloud");
        return Ok(RegionGrowingResult::default());
    }
    index.bind(cloud);

    let cos_threshold = config.normal_threshold.to_radians().cos();
    let max_squared_distance = config.epsilon * config.epsilon;

    let mut accepted = vec![false; cloud.len()];
    let mut members: Vec<PointIndex> = Vec::new();
    let mut frontier: Vec<PointIndex> = Vec::new();
    let mut next_frontier: Vec<PointIndex> = Vec::new();

    for idx in initial_support(cloud, index, seed)? {
        accepted[idx.get()] = true;
        members.push(idx);
        frontier.push(idx);
    }

    let mut plane = PlaneModel::fit_least_squares(members.iter().map(|&i| cloud.point(i)))?;
    let mut plane_normal = plane.normal();
    let mut rounds = 0;
    let mut refits = 0;

    while !frontier.is_empty() {
        rounds += 1;

        for &current in &frontier {
            for candidate in index.within_radius(cloud.point(current), config.cluster_epsilon)? {
                if accepted[candidate.get()] {
                    continue;
                }
                if plane.squared_distance_to_point(cloud.point(candidate)) > max_squared_distance {
                    continue;
                }
                if let Some(normal) = cloud.normal(candidate) {
                    if !normal_is_consistent(normal, &plane_normal, cos_threshold) {
                        continue;
                    }
                }

                accepted[candidate.get()] = true;
                next_frontier.push(candidate);
            }
        }

        trace!(round = rounds, grown = next_frontier.len(), "region growing round");
        if next_frontier.is_empty() {
            break;
        }

        next_frontier.sort_unstable();
        members.extend_from_slice(&next_frontier);
        std::mem::swap(&mut frontier, &mut next_frontier);
        next_frontier.clear();

        if members.len() >= MIN_REFIT_SUPPORT && should_refit(rounds) {
            match PlaneModel::fit_least_squares(members.iter().map(|&i| cloud.point(i))) {
                Ok(refit) => {
                    plane = refit;
                    plane_normal = plane.normal();
                    refits += 1;
                    debug!(round = rounds, support = members.len(), "refitted region plane");
                }
                Err(err) => warn!(round = rounds, %err, "plane refit failed, keeping previous estimate"),
            }
        }
    }

    if members.is_empty() {
        cloud.clear_selection();
    } else {
        cloud.repartition(&accepted)?;
    }

    info!(
        selected = members.len(),
        rounds,
        refits,
        "region growing finished"
    );
    Ok(RegionGrowingResult {
        selected: members.len(),
        rounds,
        refits,
        plane: Some(plane),
    })
}
