use vista_animation::Animation;
use vista_common::{Color3, MaterialId, ProceduralTextureId, SceneUid, Tags, TextureId};
use vista_render::RenderPass;

#[derive(Debug, Clone)]
pub struct Texture {
    pub(crate) unique_id: TextureId,
    pub name: String,
    pub url: Option<String>,
    pub has_alpha: bool,
    /// False while the image is loading.
    pub ready: bool,
    pub(crate) scene_uid: Option<SceneUid>,
}

impl Texture {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            unique_id: TextureId(0),
            name: name.into(),
            url: None,
            has_alpha: false,
            ready: true,
            scene_uid: None,
        }
    }

    pub fn unique_id(&self) -> TextureId {
        self.unique_id
    }

    pub fn scene_uid(&self) -> Option<SceneUid> {
        self.scene_uid
    }
}

#[derive(Debug, Clone)]
pub struct Material {
    pub(crate) unique_id: MaterialId,
    pub id: String,
    pub name: String,
    pub diffuse_color: Color3,
    pub alpha: f32,
    /// Discard fragments below a cutoff instead of blending.
    pub alpha_test: bool,
    pub back_face_culling: bool,
    pub textures: Vec<TextureId>,
    /// False while the material itself is compiling.
    pub ready: bool,
    pub tags: Tags,
    pub animations: Vec<Animation>,
    pub(crate) scene_uid: Option<SceneUid>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            unique_id: MaterialId(0),
            id: name.clone(),
            name,
            diffuse_color: Color3::WHITE,
            alpha: 1.0,
            alpha_test: false,
            back_face_culling: true,
            textures: Vec::new(),
            ready: true,
            tags: Tags::new(),
            animations: Vec::new(),
            scene_uid: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn unique_id(&self) -> MaterialId {
        self.unique_id
    }

    pub fn scene_uid(&self) -> Option<SceneUid> {
        self.scene_uid
    }

    pub fn needs_alpha_blending(&self) -> bool {
        self.alpha < 1.0
    }

    /// Queue a sub-mesh with this material lands in, given the mesh
    /// visibility.
    pub fn render_pass(&self, mesh_visibility: f32) -> RenderPass {
        if self.needs_alpha_blending() || mesh_visibility < 1.0 {
            RenderPass::Transparent
        } else if self.alpha_test {
            RenderPass::AlphaTest
        } else {
            RenderPass::Opaque
        }
    }

    /// Ready once compiled and every texture it samples has loaded.
    pub fn is_ready(&self, textures: &[Texture]) -> bool {
        self.ready
            && self.textures.iter().all(|id| {
                textures
                    .iter()
                    .find(|t| t.unique_id == *id)
                    .is_none_or(|t| t.ready)
            })
    }
}

/// Texture regenerated by a shader every `refresh_rate` frames.
#[derive(Debug, Clone)]
pub struct ProceduralTexture {
    pub(crate) unique_id: ProceduralTextureId,
    pub name: String,
    /// 0 renders once, 1 every frame, n every n-th frame.
    pub refresh_rate: u32,
    pub is_enabled: bool,
    current_refresh_id: i64,
    render_count: u64,
    pub(crate) scene_uid: Option<SceneUid>,
}

impl ProceduralTexture {
    pub fn new(name: impl Into<String>, refresh_rate: u32) -> Self {
        Self {
            unique_id: ProceduralTextureId(0),
            name: name.into(),
            refresh_rate,
            is_enabled: true,
            current_refresh_id: -1,
            render_count: 0,
            scene_uid: None,
        }
    }

    pub fn unique_id(&self) -> ProceduralTextureId {
        self.unique_id
    }

    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    /// Advance the refresh counter; true when this frame regenerates.
    pub fn should_render(&mut self) -> bool {
        if !self.is_enabled {
            return false;
        }
        if self.current_refresh_id == -1 {
            self.current_refresh_id = 1;
            return true;
        }
        if self.refresh_rate == 0 {
            return false;
        }
        if i64::from(self.refresh_rate) == self.current_refresh_id {
            self.current_refresh_id = 1;
            return true;
        }
        self.current_refresh_id += 1;
        false
    }

    pub(crate) fn render(&mut self) {
        self.render_count += 1;
    }

    /// Force regeneration on the next frame.
    pub fn reset_refresh_counter(&mut self) {
        self.current_refresh_id = -1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_waits_for_textures() {
        let mut tex = Texture::new("t");
        tex.unique_id = TextureId(5);
        tex.ready = false;
        let mut mat = Material::new("m");
        mat.textures.push(TextureId(5));
        assert!(!mat.is_ready(std::slice::from_ref(&tex)));
        tex.ready = true;
        assert!(mat.is_ready(&[tex]));
    }

    #[test]
    fn render_pass_selection() {
        let mut mat = Material::new("m");
        assert_eq!(mat.render_pass(1.0), RenderPass::Opaque);
        assert_eq!(mat.render_pass(0.5), RenderPass::Transparent);
        mat.alpha_test = true;
        assert_eq!(mat.render_pass(1.0), RenderPass::AlphaTest);
        mat.alpha = 0.3;
        assert_eq!(mat.render_pass(1.0), RenderPass::Transparent);
    }

    #[test]
    fn refresh_rate_schedule() {
        let mut once = ProceduralTexture::new("once", 0);
        let frames: Vec<bool> = (0..4).map(|_| once.should_render()).collect();
        assert_eq!(frames, vec![true, false, false, false]);

        let mut every = ProceduralTexture::new("every", 1);
        assert!((0..4).all(|_| every.should_render()));

        let mut third = ProceduralTexture::new("third", 3);
        let frames: Vec<bool> = (0..7).map(|_| third.should_render()).collect();
        assert_eq!(frames, vec![true, false, false, true, false, false, true]);
    }
}
