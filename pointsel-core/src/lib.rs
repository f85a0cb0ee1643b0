//! Core data structures and traits for pointsel
//!
//! This crate provides the point cloud store used by the selection engine:
//! points addressed by a stable [`PointIndex`], optional per-point normals,
//! and a selection expressed as a partition of the position order.

pub mod point;
pub mod point_cloud;
pub mod traits;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use traits::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix3};
