//! Selection engine facade
//!
//! Owns the spatial index (rebuilt lazily for whichever cloud is passed in)
//! and the region growing parameters, and exposes the selection operations
//! as synchronous calls.

use crate::classification::{AxisAlignedBox, BulkClassifier, CombineMode, ExecutionPolicy, SelectionVolume};
use crate::nearest_neighbor::SpatialIndex;
use crate::neighborhood;
use crate::region_growing::{self, RegionGrowingConfig, RegionGrowingResult};
use pointsel_core::{Point3f, PointCloud, PointIndex, Result};

#[derive(Debug, Default)]
pub struct SelectionEngine {
    index: SpatialIndex,
    config: RegionGrowingConfig,
    policy: ExecutionPolicy,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RegionGrowingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &RegionGrowingConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RegionGrowingConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Bind the spatial index to `cloud`; free if it is already bound
    pub fn bind(&mut self, cloud: &PointCloud) -> &mut Self {
        self.index.bind(cloud);
        self
    }

    pub fn k_nearest(&self, query: &Point3f, k: usize) -> Result<Vec<(PointIndex, f32)>> {
        self.index.k_nearest(query, k)
    }

    pub fn within_radius(&self, center: &Point3f, radius: f32) -> Result<Vec<PointIndex>> {
        self.index.within_radius(center, radius)
    }

    /// The point of `cloud` closest to `query`, `None` for an empty cloud
    pub fn nearest_point(&mut self, cloud: &PointCloud, query: &Point3f) -> Result<Option<(PointIndex, Point3f)>> {
        self.index.bind(cloud);
        Ok(self
            .index
            .nearest(query)?
            .map(|(idx, _)| (idx, *cloud.point(idx))))
    }

    /// Region growing with explicit parameters (`normal_threshold` in degrees)
    pub fn grow_region(
        &mut self,
        cloud: &mut PointCloud,
        seed: &Point3f,
        epsilon: f32,
        cluster_epsilon: f32,
        normal_threshold: f32,
    ) -> Result<RegionGrowingResult> {
        let config = RegionGrowingConfig {
            epsilon,
            cluster_epsilon,
            normal_threshold,
        };
        region_growing::grow_region(cloud, &mut self.index, seed, &config)
    }

    /// Region growing with the engine's configured parameters
    pub fn grow_region_with_config(&mut self, cloud: &mut PointCloud, seed: &Point3f) -> Result<RegionGrowingResult> {
        let config = self.config;
        region_growing::grow_region(cloud, &mut self.index, seed, &config)
    }

    pub fn expand(&mut self, cloud: &mut PointCloud) -> Result<usize> {
        neighborhood::expand(cloud, &mut self.index)
    }

    pub fn reduce(&mut self, cloud: &mut PointCloud) -> Result<usize> {
        neighborhood::reduce(cloud, &mut self.index)
    }

    /// Classify every point with `inside` and merge into the selection
    pub fn classify<F>(&self, cloud: &mut PointCloud, inside: F, mode: CombineMode) -> Result<usize>
    where
        F: Fn(&Point3f) -> bool + Sync,
    {
        BulkClassifier::new(mode)
            .with_policy(self.policy)
            .classify(cloud, inside)
    }

    pub fn select_box(&self, cloud: &mut PointCloud, bounds: &AxisAlignedBox, mode: CombineMode) -> Result<usize> {
        BulkClassifier::new(mode)
            .with_policy(self.policy)
            .classify_box(cloud, bounds)
    }

    pub fn select_volume(&self, cloud: &mut PointCloud, volume: &SelectionVolume, mode: CombineMode) -> Result<usize> {
        BulkClassifier::new(mode)
            .with_policy(self.policy)
            .classify_volume(cloud, volume)
    }
}
