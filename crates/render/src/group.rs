use std::cmp::Ordering;

use glam::Mat4;
use vista_common::{MaterialId, MeshId};

/// Which queue of a rendering group an item lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderPass {
    #[default]
    Opaque,
    AlphaTest,
    Transparent,
}

/// A sub-mesh queued for drawing this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderItem {
    pub mesh: MeshId,
    pub sub_mesh: usize,
    pub material: Option<MaterialId>,
    pub rendering_group: u8,
    pub pass: RenderPass,
    pub alpha_index: i32,
    /// Distance from the rendering camera to the bounding center.
    pub distance: f32,
    /// False while the material is still loading; the item is skipped.
    pub ready: bool,
    pub index_start: u32,
    pub index_count: u32,
    pub world: Mat4,
}

impl RenderItem {
    pub fn new(mesh: MeshId, sub_mesh: usize) -> Self {
        Self {
            mesh,
            sub_mesh,
            material: None,
            rendering_group: 0,
            pass: RenderPass::Opaque,
            alpha_index: 0,
            distance: 0.0,
            ready: true,
            index_start: 0,
            index_count: 0,
            world: Mat4::IDENTITY,
        }
    }
}

pub type SortCompare = Box<dyn Fn(&RenderItem, &RenderItem) -> Ordering>;

/// Front to back.
pub(crate) fn front_to_back(a: &RenderItem, b: &RenderItem) -> Ordering {
    a.distance.total_cmp(&b.distance)
}

/// Alpha index first, then back to front.
pub(crate) fn transparent_default(a: &RenderItem, b: &RenderItem) -> Ordering {
    a.alpha_index
        .cmp(&b.alpha_index)
        .then_with(|| b.distance.total_cmp(&a.distance))
}

/// Three per-frame queues sharing one rendering group id.
#[derive(Default)]
pub struct RenderingGroup {
    id: u8,
    opaque: Vec<RenderItem>,
    alpha_test: Vec<RenderItem>,
    transparent: Vec<RenderItem>,
    opaque_compare: Option<SortCompare>,
    alpha_test_compare: Option<SortCompare>,
    transparent_compare: Option<SortCompare>,
}

impl std::fmt::Debug for RenderingGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderingGroup")
            .field("id", &self.id)
            .field("opaque", &self.opaque.len())
            .field("alpha_test", &self.alpha_test.len())
            .field("transparent", &self.transparent.len())
            .finish()
    }
}

impl RenderingGroup {
    pub fn new(id: u8) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn dispatch(&mut self, item: RenderItem) {
        match item.pass {
            RenderPass::Opaque => self.opaque.push(item),
            RenderPass::AlphaTest => self.alpha_test.push(item),
            RenderPass::Transparent => self.transparent.push(item),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.alpha_test.is_empty() && self.transparent.is_empty()
    }

    pub fn len(&self) -> usize {
        self.opaque.len() + self.alpha_test.len() + self.transparent.len()
    }

    pub fn opaque(&self) -> &[RenderItem] {
        &self.opaque
    }

    pub fn alpha_test(&self) -> &[RenderItem] {
        &self.alpha_test
    }

    pub fn transparent(&self) -> &[RenderItem] {
        &self.transparent
    }

    /// Replace the comparators. `None` restores the default of that queue.
    pub fn set_rendering_order(
        &mut self,
        opaque: Option<SortCompare>,
        alpha_test: Option<SortCompare>,
        transparent: Option<SortCompare>,
    ) {
        self.opaque_compare = opaque;
        self.alpha_test_compare = alpha_test;
        self.transparent_compare = transparent;
    }

    /// Sort every queue with its comparator. Sorting is stable, so equal
    /// items keep their dispatch order.
    pub fn sort(&mut self) {
        match &self.opaque_compare {
            Some(cmp) => self.opaque.sort_by(|a, b| cmp(a, b)),
            None => self.opaque.sort_by(front_to_back),
        }
        if let Some(cmp) = &self.alpha_test_compare {
            self.alpha_test.sort_by(|a, b| cmp(a, b));
        }
        match &self.transparent_compare {
            Some(cmp) => self.transparent.sort_by(|a, b| cmp(a, b)),
            None => self.transparent.sort_by(transparent_default),
        }
    }

    pub fn clear(&mut self) {
        self.opaque.clear();
        self.alpha_test.clear();
        self.transparent.clear();
    }

    pub fn purge_mesh(&mut self, mesh: MeshId) {
        self.opaque.retain(|i| i.mesh != mesh);
        self.alpha_test.retain(|i| i.mesh != mesh);
        self.transparent.retain(|i| i.mesh != mesh);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(mesh: u32, pass: RenderPass, distance: f32) -> RenderItem {
        RenderItem {
            pass,
            distance,
            ..RenderItem::new(MeshId(mesh), 0)
        }
    }

    fn meshes(items: &[RenderItem]) -> Vec<u32> {
        items.iter().map(|i| i.mesh.0).collect()
    }

    #[test]
    fn dispatch_routes_by_pass() {
        let mut g = RenderingGroup::new(0);
        g.dispatch(item(1, RenderPass::Opaque, 1.0));
        g.dispatch(item(2, RenderPass::AlphaTest, 1.0));
        g.dispatch(item(3, RenderPass::Transparent, 1.0));
        assert_eq!(g.len(), 3);
        assert_eq!(meshes(g.alpha_test()), vec![2]);
    }

    #[test]
    fn default_sorts() {
        let mut g = RenderingGroup::new(0);
        g.dispatch(item(1, RenderPass::Opaque, 9.0));
        g.dispatch(item(2, RenderPass::Opaque, 1.0));
        g.dispatch(item(3, RenderPass::AlphaTest, 9.0));
        g.dispatch(item(4, RenderPass::AlphaTest, 1.0));
        g.dispatch(item(5, RenderPass::Transparent, 1.0));
        g.dispatch(item(6, RenderPass::Transparent, 9.0));
        let mut late = item(7, RenderPass::Transparent, 20.0);
        late.alpha_index = 1;
        g.dispatch(late);
        g.sort();
        assert_eq!(meshes(g.opaque()), vec![2, 1]);
        assert_eq!(meshes(g.alpha_test()), vec![3, 4]);
        assert_eq!(meshes(g.transparent()), vec![6, 5, 7]);
    }

    #[test]
    fn custom_comparator_and_reset() {
        let mut g = RenderingGroup::new(1);
        g.dispatch(item(1, RenderPass::Opaque, 1.0));
        g.dispatch(item(2, RenderPass::Opaque, 5.0));
        g.set_rendering_order(
            Some(Box::new(|a, b| b.distance.total_cmp(&a.distance))),
            None,
            None,
        );
        g.sort();
        assert_eq!(meshes(g.opaque()), vec![2, 1]);
        g.set_rendering_order(None, None, None);
        g.sort();
        assert_eq!(meshes(g.opaque()), vec![1, 2]);
    }

    #[test]
    fn purge_and_clear() {
        let mut g = RenderingGroup::new(0);
        g.dispatch(item(1, RenderPass::Opaque, 1.0));
        g.dispatch(item(1, RenderPass::Transparent, 1.0));
        g.dispatch(item(2, RenderPass::Opaque, 1.0));
        g.purge_mesh(MeshId(1));
        assert_eq!(g.len(), 1);
        g.clear();
        assert!(g.is_empty());
    }
}
