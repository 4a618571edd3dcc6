use glam::Mat4;
use vista_common::{SceneUid, SkeletonId};

#[derive(Debug, Clone)]
pub struct Bone {
    pub id: String,
    pub name: String,
    /// Index of the parent bone inside the same skeleton.
    pub parent: Option<usize>,
    pub local: Mat4,
    absolute: Mat4,
}

impl Bone {
    pub fn new(name: impl Into<String>, parent: Option<usize>, local: Mat4) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            parent,
            local,
            absolute: local,
        }
    }

    /// Model-space matrix as of the last [`Skeleton::prepare`].
    pub fn absolute(&self) -> &Mat4 {
        &self.absolute
    }
}

#[derive(Debug, Clone)]
pub struct Skeleton {
    pub(crate) unique_id: SkeletonId,
    pub id: String,
    pub name: String,
    bones: Vec<Bone>,
    prepare_count: u64,
    pub(crate) scene_uid: Option<SceneUid>,
}

impl Skeleton {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            unique_id: SkeletonId(0),
            id: name.clone(),
            name,
            bones: Vec::new(),
            prepare_count: 0,
            scene_uid: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn unique_id(&self) -> SkeletonId {
        self.unique_id
    }

    pub fn scene_uid(&self) -> Option<SceneUid> {
        self.scene_uid
    }

    /// Append a bone. Parents must be added before their children; a bone
    /// naming a later or missing parent becomes a root.
    pub fn add_bone(&mut self, mut bone: Bone) -> usize {
        let index = self.bones.len();
        if bone.parent.is_some_and(|p| p >= index) {
            bone.parent = None;
        }
        self.bones.push(bone);
        index
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bones_mut(&mut self) -> &mut [Bone] {
        &mut self.bones
    }

    pub fn bone_by_id(&self, id: &str) -> Option<&Bone> {
        self.bones.iter().find(|b| b.id == id)
    }

    pub fn bone_by_name(&self, name: &str) -> Option<&Bone> {
        self.bones.iter().find(|b| b.name == name)
    }

    /// Recompute absolute bone matrices from the local ones.
    pub fn prepare(&mut self) {
        for i in 0..self.bones.len() {
            let parent = self.bones[i].parent.map(|p| self.bones[p].absolute);
            let bone = &mut self.bones[i];
            bone.absolute = match parent {
                Some(p) => p * bone.local,
                None => bone.local,
            };
        }
        self.prepare_count += 1;
    }

    pub fn prepare_count(&self) -> u64 {
        self.prepare_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn prepare_chains_parents() {
        let mut s = Skeleton::new("s");
        let root = s.add_bone(Bone::new(
            "root",
            None,
            Mat4::from_translation(Vec3::X),
        ));
        s.add_bone(Bone::new(
            "arm",
            Some(root),
            Mat4::from_translation(Vec3::Y),
        ));
        s.prepare();
        let arm = s.bone_by_name("arm").unwrap();
        assert_eq!(arm.absolute().w_axis.truncate(), Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(s.prepare_count(), 1);
    }

    #[test]
    fn forward_parent_becomes_root() {
        let mut s = Skeleton::new("s");
        let i = s.add_bone(Bone::new("b", Some(3), Mat4::IDENTITY));
        assert_eq!(s.bones()[i].parent, None);
    }
}
