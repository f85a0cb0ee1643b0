//! Morphological expand/reduce of a selection over k-NN adjacency

use crate::nearest_neighbor::SpatialIndex;
use pointsel_core::{PointCloud, Result};
use tracing::debug;

/// Number of nearest neighbors (the point itself included) that a selected
/// point pulls into the selection when expanding
pub const EXPANSION_NEIGHBORS: usize = 6;

/// Dilate the selection: every selected point adds its nearest neighbors.
///
/// Returns the number of newly selected points. Nothing happens when the
/// selection is empty. Selected points with non-finite coordinates stay
/// selected but pull in nothing.
pub fn expand(cloud: &mut PointCloud, index: &mut SpatialIndex) -> Result<usize> {
    if cloud.is_selection_empty() {
        return Ok(0);
    }
    index.bind(cloud);

    let before = cloud.selected_count();
    let mut selected = cloud.selection_mask();
    for &idx in cloud.selected_indices() {
        let point = cloud.point(idx);
        // not indexed, so it has no neighbors to pull in
        if !point.coords.iter().all(|c| c.is_finite()) {
            continue;
        }
        for (neighbor, _) in index.k_nearest(point, EXPANSION_NEIGHBORS)? {
            selected[neighbor.get()] = true;
        }
    }
    cloud.repartition(&selected)?;

    let added = cloud.selected_count() - before;
    debug!(before, added, "expanded selection");
    Ok(added)
}

/// Erode the selection by dilating its complement.
///
/// Returns the number of points removed from the selection. Nothing happens
/// when the selection is empty.
pub fn reduce(cloud: &mut PointCloud, index: &mut SpatialIndex) -> Result<usize> {
    if cloud.is_selection_empty() {
        return Ok(0);
    }

    let before = cloud.selected_count();
    cloud.invert_selection();
    let expanded = expand(cloud, index);
    cloud.invert_selection();
    expanded?;

    let removed = before - cloud.selected_count();
    debug!(before, removed, "reduced selection");
    Ok(removed)
}
