//! # pointsel algorithms
//!
//! Selection algorithms over a [`pointsel_core::PointCloud`]:
//! region growing from a seed point, expand/reduce of the selection over
//! k-nearest-neighbor adjacency, and bulk classification against a per-point
//! predicate combined with the existing selection.
//!
//! ```rust
//! use pointsel_core::{PointCloud, Point3f};
//! use pointsel_algorithms::{SelectionEngine, CombineMode};
//!
//! fn main() -> pointsel_core::Result<()> {
//!     let mut cloud = PointCloud::from_points(
//!         (0..10)
//!             .flat_map(|i| (0..10).map(move |j| Point3f::new(i as f32, j as f32, 0.0)))
//!             .collect(),
//!     );
//!
//!     let mut engine = SelectionEngine::new();
//!     let result = engine.grow_region(&mut cloud, &Point3f::new(4.5, 4.5, 0.0), 0.1, 1.5, 20.0)?;
//!     assert_eq!(result.selected, 100);
//!
//!     engine.classify(&mut cloud, |p| p.x < 5.0, CombineMode::Intersect)?;
//!     assert_eq!(cloud.selected_count(), 50);
//!     Ok(())
//! }
//! ```

pub mod nearest_neighbor;
pub mod plane;
pub mod region_growing;
pub mod neighborhood;
pub mod classification;
pub mod engine;

// Re-export commonly used items
pub use nearest_neighbor::*;
pub use plane::*;
pub use region_growing::*;
pub use neighborhood::*;
pub use classification::*;
pub use engine::*;
