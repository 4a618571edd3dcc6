use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

use vista_common::bounding::intersects_min_max;
use vista_common::{Frustum, Ray};

/// Octree tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OctreeConfig {
    /// Entries a block may hold before it splits into eight children.
    pub max_block_capacity: usize,
    /// Depth past which blocks never split. Root blocks sit at depth 0.
    pub max_depth: usize,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_block_capacity: 64,
            max_depth: 2,
        }
    }
}

/// An item with its world-space bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeEntry<T> {
    pub item: T,
    pub min: Vec3,
    pub max: Vec3,
}

impl<T> OctreeEntry<T> {
    pub fn new(item: T, min: Vec3, max: Vec3) -> Self {
        Self { item, min, max }
    }
}

/// One cell of the tree. A block either holds entries (leaf) or eight
/// children, never both.
#[derive(Debug, Clone)]
pub struct OctreeBlock<T> {
    min: Vec3,
    max: Vec3,
    depth: usize,
    entries: Vec<OctreeEntry<T>>,
    blocks: Vec<OctreeBlock<T>>,
}

impl<T: Copy + Eq + Hash> OctreeBlock<T> {
    fn new(min: Vec3, max: Vec3, depth: usize) -> Self {
        Self {
            min,
            max,
            depth,
            entries: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn entries(&self) -> &[OctreeEntry<T>] {
        &self.entries
    }

    pub fn blocks(&self) -> &[OctreeBlock<T>] {
        &self.blocks
    }

    pub fn is_leaf(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Add an entry to every leaf its box touches. Returns true if any did.
    fn add_entry(&mut self, entry: OctreeEntry<T>, config: &OctreeConfig) -> bool {
        if !intersects_min_max(self.min, self.max, entry.min, entry.max) {
            return false;
        }
        if !self.blocks.is_empty() {
            let mut added = false;
            for block in &mut self.blocks {
                added |= block.add_entry(entry, config);
            }
            return added;
        }
        self.entries.push(entry);
        if self.entries.len() > config.max_block_capacity && self.depth < config.max_depth {
            self.create_inner_blocks(config);
        }
        true
    }

    fn create_inner_blocks(&mut self, config: &OctreeConfig) {
        self.blocks = split(self.min, self.max, self.depth + 1);
        for entry in std::mem::take(&mut self.entries) {
            for block in &mut self.blocks {
                block.add_entry(entry, config);
            }
        }
    }

    fn remove_entry(&mut self, item: T) -> bool {
        if self.blocks.is_empty() {
            let before = self.entries.len();
            self.entries.retain(|e| e.item != item);
            return self.entries.len() != before;
        }
        let mut removed = false;
        for block in &mut self.blocks {
            removed |= block.remove_entry(item);
        }
        removed
    }

    fn collect(&self, out: &mut Vec<T>, seen: &mut HashSet<T>, allow_duplicate: bool) {
        for e in &self.entries {
            if allow_duplicate || seen.insert(e.item) {
                out.push(e.item);
            }
        }
    }

    fn select(&self, frustum: &Frustum, out: &mut Vec<T>, seen: &mut HashSet<T>, dup: bool) {
        if !frustum.intersects_min_max(self.min, self.max) {
            return;
        }
        if self.blocks.is_empty() {
            self.collect(out, seen, dup);
        } else {
            for block in &self.blocks {
                block.select(frustum, out, seen, dup);
            }
        }
    }

    fn intersects(&self, center: Vec3, radius: f32, out: &mut Vec<T>, seen: &mut HashSet<T>, dup: bool) {
        let closest = center.clamp(self.min, self.max);
        if closest.distance_squared(center) > radius * radius {
            return;
        }
        if self.blocks.is_empty() {
            self.collect(out, seen, dup);
        } else {
            for block in &self.blocks {
                block.intersects(center, radius, out, seen, dup);
            }
        }
    }

    fn intersects_ray(&self, ray: &Ray, out: &mut Vec<T>, seen: &mut HashSet<T>) {
        if ray.intersects_box_min_max(self.min, self.max).is_none() {
            return;
        }
        if self.blocks.is_empty() {
            self.collect(out, seen, false);
        } else {
            for block in &self.blocks {
                block.intersects_ray(ray, out, seen);
            }
        }
    }

    fn count_blocks(&self) -> usize {
        1 + self.blocks.iter().map(|b| b.count_blocks()).sum::<usize>()
    }

    fn deepest(&self) -> usize {
        self.blocks
            .iter()
            .map(|b| b.deepest())
            .max()
            .unwrap_or(self.depth)
    }
}

fn split<T: Copy + Eq + Hash>(min: Vec3, max: Vec3, depth: usize) -> Vec<OctreeBlock<T>> {
    let half = (max - min) * 0.5;
    let mut blocks = Vec::with_capacity(8);
    for x in 0..2 {
        for y in 0..2 {
            for z in 0..2 {
                let lo = min + half * Vec3::new(x as f32, y as f32, z as f32);
                blocks.push(OctreeBlock::new(lo, lo + half, depth));
            }
        }
    }
    blocks
}

/// Spatial index over items with axis-aligned boxes.
///
/// The root is always split into eight blocks covering the world extents.
/// Items that move every frame belong in `dynamic_content`, which every
/// query returns unconditionally.
#[derive(Debug, Clone)]
pub struct Octree<T> {
    config: OctreeConfig,
    blocks: Vec<OctreeBlock<T>>,
    world_min: Vec3,
    world_max: Vec3,
    pub dynamic_content: Vec<T>,
}

impl<T: Copy + Eq + Hash> Octree<T> {
    pub fn new(config: OctreeConfig) -> Self {
        Self {
            config,
            blocks: Vec::new(),
            world_min: Vec3::ZERO,
            world_max: Vec3::ZERO,
            dynamic_content: Vec::new(),
        }
    }

    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    pub fn world_bounds(&self) -> (Vec3, Vec3) {
        (self.world_min, self.world_max)
    }

    pub fn blocks(&self) -> &[OctreeBlock<T>] {
        &self.blocks
    }

    /// Rebuild the tree over `[world_min, world_max]` from scratch.
    pub fn update(
        &mut self,
        world_min: Vec3,
        world_max: Vec3,
        entries: impl IntoIterator<Item = OctreeEntry<T>>,
    ) {
        let _span = tracing::info_span!("octree_update").entered();
        self.world_min = world_min;
        self.world_max = world_max;
        self.blocks = split(world_min, world_max, 0);
        let mut count = 0usize;
        for entry in entries {
            self.add_entry(entry);
            count += 1;
        }
        tracing::debug!(
            entries = count,
            blocks = self.block_count(),
            "octree rebuilt"
        );
    }

    /// Returns false when the entry lies outside the world extents.
    pub fn add_entry(&mut self, entry: OctreeEntry<T>) -> bool {
        let mut added = false;
        for block in &mut self.blocks {
            added |= block.add_entry(entry, &self.config);
        }
        added
    }

    /// Add an entry that lies inside the world extents to the blocks. One
    /// reaching past them goes to the dynamic content instead. Returns true
    /// when the entry landed in the blocks.
    pub fn add_entry_or_dynamic(&mut self, entry: OctreeEntry<T>) -> bool {
        let inside = entry.min.cmpge(self.world_min).all() && entry.max.cmple(self.world_max).all();
        if inside && self.add_entry(entry) {
            return true;
        }
        if !self.dynamic_content.contains(&entry.item) {
            self.dynamic_content.push(entry.item);
        }
        false
    }

    /// Remove an item from every block and from the dynamic content.
    pub fn remove_entry(&mut self, item: T) -> bool {
        let mut removed = false;
        for block in &mut self.blocks {
            removed |= block.remove_entry(item);
        }
        let before = self.dynamic_content.len();
        self.dynamic_content.retain(|d| *d != item);
        removed || before != self.dynamic_content.len()
    }

    /// Items in blocks touching the frustum, plus dynamic content.
    pub fn select(&self, frustum: &Frustum, allow_duplicate: bool) -> Vec<T> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for block in &self.blocks {
            block.select(frustum, &mut out, &mut seen, allow_duplicate);
        }
        self.append_dynamic(&mut out, &mut seen, allow_duplicate);
        out
    }

    /// Items in blocks touching the sphere, plus dynamic content.
    pub fn intersects(&self, center: Vec3, radius: f32, allow_duplicate: bool) -> Vec<T> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for block in &self.blocks {
            block.intersects(center, radius, &mut out, &mut seen, allow_duplicate);
        }
        self.append_dynamic(&mut out, &mut seen, allow_duplicate);
        out
    }

    /// Items in blocks the ray crosses, plus dynamic content.
    pub fn intersects_ray(&self, ray: &Ray) -> Vec<T> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for block in &self.blocks {
            block.intersects_ray(ray, &mut out, &mut seen);
        }
        self.append_dynamic(&mut out, &mut seen, false);
        out
    }

    fn append_dynamic(&self, out: &mut Vec<T>, seen: &mut HashSet<T>, allow_duplicate: bool) {
        for item in &self.dynamic_content {
            if allow_duplicate || seen.insert(*item) {
                out.push(*item);
            }
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.iter().map(|b| b.count_blocks()).sum()
    }

    /// Depth of the deepest block, zero for an unsplit tree.
    pub fn depth(&self) -> usize {
        self.blocks.iter().map(|b| b.deepest()).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    fn unit_entry(id: u32, at: Vec3) -> OctreeEntry<u32> {
        OctreeEntry::new(id, at - Vec3::splat(0.5), at + Vec3::splat(0.5))
    }

    fn grid(n: u32) -> Vec<OctreeEntry<u32>> {
        (0..n)
            .map(|i| {
                let x = (i % 10) as f32 * 4.0 - 18.0;
                let z = (i / 10) as f32 * 4.0 - 18.0;
                unit_entry(i, Vec3::new(x, 0.0, z))
            })
            .collect()
    }

    fn frustum_looking_down_z(eye: Vec3) -> Frustum {
        let view = Mat4::look_at_rh(eye, eye + Vec3::NEG_Z, Vec3::Y);
        let proj = Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 50.0);
        Frustum::from_matrix(&(proj * view))
    }

    #[test]
    fn root_is_split_into_eight() {
        let mut tree = Octree::new(OctreeConfig::default());
        tree.update(Vec3::splat(-20.0), Vec3::splat(20.0), grid(10));
        assert_eq!(tree.blocks().len(), 8);
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn blocks_split_past_capacity_up_to_max_depth() {
        let config = OctreeConfig {
            max_block_capacity: 2,
            max_depth: 2,
        };
        let mut tree = Octree::new(config);
        tree.update(Vec3::splat(-20.0), Vec3::splat(20.0), grid(100));
        assert_eq!(tree.depth(), 2);
        assert!(tree.block_count() > 8);
    }

    #[test]
    fn select_returns_each_item_once() {
        let mut tree = Octree::new(OctreeConfig {
            max_block_capacity: 1,
            max_depth: 3,
        });
        // Straddles every root block.
        tree.update(
            Vec3::splat(-20.0),
            Vec3::splat(20.0),
            [OctreeEntry::new(7u32, Vec3::splat(-1.0), Vec3::splat(1.0))],
        );
        let f = frustum_looking_down_z(Vec3::new(0.0, 0.0, 30.0));
        assert_eq!(tree.select(&f, false), vec![7]);
        assert!(tree.select(&f, true).len() > 1);
    }

    #[test]
    fn select_culls_blocks_outside_frustum() {
        let mut tree = Octree::new(OctreeConfig::default());
        tree.update(
            Vec3::splat(-100.0),
            Vec3::splat(100.0),
            [
                unit_entry(1, Vec3::new(-50.0, -50.0, -50.0)),
                unit_entry(2, Vec3::new(50.0, 50.0, 50.0)),
            ],
        );
        // The frustum stays inside the (-x, -y, -z) root block.
        let f = frustum_looking_down_z(Vec3::new(-50.0, -50.0, -10.0));
        let selected = tree.select(&f, false);
        assert!(selected.contains(&1));
        assert!(!selected.contains(&2));
    }

    #[test]
    fn dynamic_content_is_always_selected() {
        let mut tree = Octree::new(OctreeConfig::default());
        tree.update(Vec3::splat(-10.0), Vec3::splat(10.0), grid(0));
        tree.dynamic_content.push(42);
        let f = frustum_looking_down_z(Vec3::new(500.0, 0.0, 0.0));
        assert_eq!(tree.select(&f, false), vec![42]);
        assert_eq!(tree.intersects(Vec3::splat(900.0), 1.0, false), vec![42]);
    }

    #[test]
    fn sphere_and_ray_queries() {
        let mut tree = Octree::new(OctreeConfig {
            max_block_capacity: 1,
            max_depth: 2,
        });
        tree.update(
            Vec3::splat(-20.0),
            Vec3::splat(20.0),
            [
                unit_entry(1, Vec3::new(-15.0, -15.0, -15.0)),
                unit_entry(2, Vec3::new(15.0, 15.0, 15.0)),
            ],
        );
        let near_one = tree.intersects(Vec3::new(-15.0, -15.0, -15.0), 1.0, false);
        assert_eq!(near_one, vec![1]);

        let ray = Ray::new(Vec3::new(15.0, 15.0, 50.0), Vec3::NEG_Z);
        let hits = tree.intersects_ray(&ray);
        assert!(hits.contains(&2));
        assert!(!hits.contains(&1));
    }

    #[test]
    fn remove_entry_purges_all_blocks() {
        let mut tree = Octree::new(OctreeConfig {
            max_block_capacity: 1,
            max_depth: 2,
        });
        tree.update(
            Vec3::splat(-20.0),
            Vec3::splat(20.0),
            [OctreeEntry::new(3u32, Vec3::splat(-1.0), Vec3::splat(1.0))],
        );
        tree.dynamic_content.push(3);
        assert!(tree.remove_entry(3));
        let f = frustum_looking_down_z(Vec3::new(0.0, 0.0, 30.0));
        assert!(tree.select(&f, true).is_empty());
        assert!(!tree.remove_entry(3));
    }

    #[test]
    fn entries_outside_world_are_rejected() {
        let mut tree = Octree::new(OctreeConfig::default());
        tree.update(Vec3::splat(-1.0), Vec3::splat(1.0), grid(0));
        assert!(!tree.add_entry(unit_entry(9, Vec3::splat(50.0))));
    }

    #[test]
    fn oversized_entries_fall_back_to_dynamic_content() {
        let mut tree = Octree::new(OctreeConfig::default());
        tree.update(Vec3::splat(-10.0), Vec3::splat(10.0), grid(0));
        assert!(tree.add_entry_or_dynamic(unit_entry(1, Vec3::ZERO)));
        assert!(!tree.add_entry_or_dynamic(OctreeEntry::new(
            2,
            Vec3::splat(-50.0),
            Vec3::splat(50.0)
        )));
        assert!(!tree.add_entry_or_dynamic(OctreeEntry::new(
            2,
            Vec3::splat(-50.0),
            Vec3::splat(50.0)
        )));
        assert_eq!(tree.dynamic_content, vec![2]);

        // Looking away from every block still finds the big entry.
        let f = frustum_looking_down_z(Vec3::new(40.0, 0.0, 40.0));
        assert_eq!(tree.select(&f, false), vec![2]);
        assert!(tree.remove_entry(2));
        assert!(tree.dynamic_content.is_empty());
    }
}
