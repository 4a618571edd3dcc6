use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a scene instance. Stamped on every entity the scene owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneUid(pub Uuid);

impl SceneUid {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SceneUid {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SceneUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! unique_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

unique_id!(
    /// Scene-unique handle of a mesh.
    MeshId
);
unique_id!(
    /// Scene-unique handle of a camera.
    CameraId
);
unique_id!(
    /// Scene-unique handle of a light.
    LightId
);
unique_id!(MaterialId);
unique_id!(TextureId);
unique_id!(ProceduralTextureId);
unique_id!(GeometryId);
unique_id!(SkeletonId);
unique_id!(ParticleSystemId);
unique_id!(SpriteManagerId);
unique_id!(SoundTrackId);
unique_id!(ReflectionProbeId);
unique_id!(ActionManagerId);
unique_id!(
    /// Handle of a running animation instance.
    AnimatableId
);
unique_id!(AnimationGroupId);

/// Anything an animation can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetId {
    Mesh(MeshId),
    Camera(CameraId),
    Light(LightId),
    Material(MaterialId),
}

impl From<MeshId> for TargetId {
    fn from(id: MeshId) -> Self {
        TargetId::Mesh(id)
    }
}

impl From<CameraId> for TargetId {
    fn from(id: CameraId) -> Self {
        TargetId::Camera(id)
    }
}

impl From<LightId> for TargetId {
    fn from(id: LightId) -> Self {
        TargetId::Light(id)
    }
}

impl From<MaterialId> for TargetId {
    fn from(id: MaterialId) -> Self {
        TargetId::Material(id)
    }
}

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Scale, then rotate, then translate.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Returns true when the matrix can be inverted and holds only finite values.
pub fn is_matrix_usable(m: &Mat4) -> bool {
    let det = m.determinant();
    det.is_finite() && det.abs() > f32::EPSILON * f32::EPSILON && m.is_finite()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color3 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color3 {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    pub fn to_color4(self, a: f32) -> Color4 {
        Color4::new(self.r, self.g, self.b, a)
    }
}

impl Default for Color3 {
    fn default() -> Self {
        Self::BLACK
    }
}

impl std::ops::Add for Color3 {
    type Output = Color3;
    fn add(self, o: Color3) -> Color3 {
        Color3::new(self.r + o.r, self.g + o.g, self.b + o.b)
    }
}

impl std::ops::Sub for Color3 {
    type Output = Color3;
    fn sub(self, o: Color3) -> Color3 {
        Color3::new(self.r - o.r, self.g - o.g, self.b - o.b)
    }
}

impl std::ops::Mul<f32> for Color3 {
    type Output = Color3;
    fn mul(self, s: f32) -> Color3 {
        Color3::new(self.r * s, self.g * s, self.b * s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color4 {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color4 {
    fn default() -> Self {
        Self::new(0.2, 0.2, 0.3, 1.0)
    }
}

/// Normalized viewport: every field is a fraction of the render target size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

impl Viewport {
    /// Pixel rectangle `(x, y, width, height)` for a render target of the given size.
    pub fn to_global(&self, render_width: u32, render_height: u32) -> (f32, f32, f32, f32) {
        let w = render_width as f32;
        let h = render_height as f32;
        (self.x * w, self.y * h, self.width * w, self.height * h)
    }
}
