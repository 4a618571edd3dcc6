//! Spatial index: octree partitioning of bounding boxes for frustum, ray and
//! sphere selection.
//!
//! # Invariants
//! - Blocks hold handles only; the index never owns what it points at.
//! - A query returns each item at most once unless duplicates are requested.
//! - Dynamic content is part of every query result.

mod octree;

pub use octree::{Octree, OctreeBlock, OctreeConfig, OctreeEntry};

pub fn crate_info() -> &'static str {
    "vista-spatial v0.1.0"
}
