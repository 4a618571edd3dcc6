//! Shared building blocks for the vista scene core: typed handles,
//! transforms, bounding volumes, rays, frustums, observables, perf counters
//! and tag queries.
//!
//! # Invariants
//! - Handles are plain copyable integers; nothing here owns scene entities.
//! - Observable dispatch never sees a list mutated under it.

pub mod bounding;
pub mod frustum;
pub mod observable;
pub mod perf;
pub mod ray;
pub mod tags;
pub mod types;

pub use bounding::{BoundingBox, BoundingInfo, BoundingSphere};
pub use frustum::{Frustum, Plane};
pub use observable::{EventState, MASK_ALL, Observable, ObserverHandle};
pub use perf::{FrameHistory, PerfCounter};
pub use ray::{IntersectionInfo, Ray};
pub use tags::{TagQuery, TagQueryError, Tags};
pub use types::*;

pub fn crate_info() -> &'static str {
    "vista-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
