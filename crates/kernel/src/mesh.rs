use glam::{Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use vista_animation::Animation;
use vista_common::{
    ActionManagerId, BoundingInfo, GeometryId, MaterialId, MeshId, SceneUid, SkeletonId, Tags,
    Transform, is_matrix_usable,
};

/// Vertex streams of a geometry. Triangles are counter-clockwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl VertexData {
    /// Axis-aligned cube of edge `size` centered on the origin.
    pub fn create_box(size: f32) -> Self {
        let h = size * 0.5;
        let faces = [
            (Vec3::Z, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y),
            (Vec3::X, Vec3::Y),
            (Vec3::NEG_X, Vec3::Y),
            (Vec3::Y, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::Z),
        ];
        let mut data = Self::default();
        for (normal, up) in faces {
            let side = up.cross(normal);
            let base = data.positions.len() as u32;
            let corners = [
                (normal - side - up, Vec2::new(0.0, 1.0)),
                (normal + side - up, Vec2::new(1.0, 1.0)),
                (normal + side + up, Vec2::new(1.0, 0.0)),
                (normal - side + up, Vec2::new(0.0, 0.0)),
            ];
            for (corner, uv) in corners {
                data.positions.push(corner * h);
                data.normals.push(normal);
                data.uvs.push(uv);
            }
            data.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        data
    }

    /// Quad in the XY plane facing -Z.
    pub fn create_plane(size: f32) -> Self {
        let h = size * 0.5;
        Self {
            positions: vec![
                Vec3::new(-h, -h, 0.0),
                Vec3::new(h, -h, 0.0),
                Vec3::new(h, h, 0.0),
                Vec3::new(-h, h, 0.0),
            ],
            normals: vec![Vec3::NEG_Z; 4],
            uvs: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            indices: vec![0, 2, 1, 0, 3, 2],
        }
    }

    /// Grid in the XZ plane facing +Y.
    pub fn create_ground(width: f32, height: f32, subdivisions: u32) -> Self {
        let subdivisions = subdivisions.max(1);
        let mut data = Self::default();
        for row in 0..=subdivisions {
            for col in 0..=subdivisions {
                let u = col as f32 / subdivisions as f32;
                let v = row as f32 / subdivisions as f32;
                data.positions.push(Vec3::new(
                    (u - 0.5) * width,
                    0.0,
                    (0.5 - v) * height,
                ));
                data.normals.push(Vec3::Y);
                data.uvs.push(Vec2::new(u, 1.0 - v));
            }
        }
        let stride = subdivisions + 1;
        for row in 0..subdivisions {
            for col in 0..subdivisions {
                let a = row * stride + col;
                let b = a + 1;
                let c = a + stride;
                let d = c + 1;
                data.indices.extend_from_slice(&[a, b, d, a, d, c]);
            }
        }
        data
    }

    /// UV sphere with `segments` rings.
    pub fn create_sphere(segments: u32, diameter: f32) -> Self {
        let rings = segments.max(2);
        let sectors = rings * 2;
        let radius = diameter * 0.5;
        let mut data = Self::default();
        for ring in 0..=rings {
            let theta = ring as f32 / rings as f32 * std::f32::consts::PI;
            for sector in 0..=sectors {
                let phi = sector as f32 / sectors as f32 * std::f32::consts::TAU;
                let normal = Vec3::new(
                    theta.sin() * phi.cos(),
                    theta.cos(),
                    theta.sin() * phi.sin(),
                );
                data.positions.push(normal * radius);
                data.normals.push(normal);
                data.uvs.push(Vec2::new(
                    sector as f32 / sectors as f32,
                    ring as f32 / rings as f32,
                ));
            }
        }
        let stride = sectors + 1;
        for ring in 0..rings {
            for sector in 0..sectors {
                let a = ring * stride + sector;
                let b = a + stride;
                data.indices
                    .extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }
        data
    }

    pub fn total_vertices(&self) -> usize {
        self.positions.len()
    }

    pub fn total_indices(&self) -> usize {
        self.indices.len()
    }

    pub fn bounding_info(&self) -> BoundingInfo {
        let b = vista_common::BoundingBox::from_points(&self.positions);
        BoundingInfo::new(b.minimum, b.maximum)
    }
}

/// Shared vertex data. Several meshes may reference one geometry.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub(crate) unique_id: GeometryId,
    pub id: String,
    pub vertex_data: VertexData,
    /// False until the vertex data is uploaded.
    pub ready: bool,
    pub(crate) scene_uid: Option<SceneUid>,
}

impl Geometry {
    pub fn new(id: impl Into<String>, vertex_data: VertexData) -> Self {
        Self {
            unique_id: GeometryId(0),
            id: id.into(),
            vertex_data,
            ready: true,
            scene_uid: None,
        }
    }

    pub fn unique_id(&self) -> GeometryId {
        self.unique_id
    }

    pub fn scene_uid(&self) -> Option<SceneUid> {
        self.scene_uid
    }
}

/// Index range of a mesh drawn with one material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubMesh {
    /// Overrides the mesh material when set.
    pub material: Option<MaterialId>,
    pub vertex_start: u32,
    pub vertex_count: u32,
    pub index_start: u32,
    pub index_count: u32,
}

impl SubMesh {
    pub fn new(vertex_start: u32, vertex_count: u32, index_start: u32, index_count: u32) -> Self {
        Self {
            material: None,
            vertex_start,
            vertex_count,
            index_start,
            index_count,
        }
    }
}

/// Renderable node.
#[derive(Clone)]
pub struct Mesh {
    pub(crate) unique_id: MeshId,
    /// Non-unique user id.
    pub id: String,
    pub name: String,
    pub transform: Transform,
    pub geometry: Option<GeometryId>,
    pub material: Option<MaterialId>,
    pub skeleton: Option<SkeletonId>,
    pub action_manager: Option<ActionManagerId>,
    pub sub_meshes: Vec<SubMesh>,
    pub rendering_group_id: u8,
    /// Alpha multiplier; below 1 the mesh renders as transparent.
    pub visibility: f32,
    pub is_enabled: bool,
    pub is_visible: bool,
    pub is_pickable: bool,
    pub always_select_as_active_mesh: bool,
    pub alpha_index: i32,
    pub layer_mask: u32,
    pub tags: Tags,
    pub animations: Vec<Animation>,
    world_matrix: Mat4,
    world_matrix_usable: bool,
    bounding_info: BoundingInfo,
    pub(crate) scene_uid: Option<SceneUid>,
    pub(crate) render_id: u64,
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("unique_id", &self.unique_id)
            .field("id", &self.id)
            .field("name", &self.name)
            .field("geometry", &self.geometry)
            .field("material", &self.material)
            .field("sub_meshes", &self.sub_meshes.len())
            .finish()
    }
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            unique_id: MeshId(0),
            id: name.clone(),
            name,
            transform: Transform::default(),
            geometry: None,
            material: None,
            skeleton: None,
            action_manager: None,
            sub_meshes: Vec::new(),
            rendering_group_id: 0,
            visibility: 1.0,
            is_enabled: true,
            is_visible: true,
            is_pickable: true,
            always_select_as_active_mesh: false,
            alpha_index: i32::MAX,
            layer_mask: 0x0FFF_FFFF,
            tags: Tags::new(),
            animations: Vec::new(),
            world_matrix: Mat4::IDENTITY,
            world_matrix_usable: true,
            bounding_info: BoundingInfo::default(),
            scene_uid: None,
            render_id: 0,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn unique_id(&self) -> MeshId {
        self.unique_id
    }

    pub fn scene_uid(&self) -> Option<SceneUid> {
        self.scene_uid
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
    }

    pub fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    pub fn scaling(&self) -> Vec3 {
        self.transform.scale
    }

    /// Last computed world matrix.
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// False when the last computed world matrix was degenerate.
    pub fn is_world_matrix_usable(&self) -> bool {
        self.world_matrix_usable
    }

    /// Rebuild the world matrix from the transform and move the bounding
    /// volumes with it. Returns `None` for a degenerate matrix.
    pub fn compute_world_matrix(&mut self) -> Option<Mat4> {
        let world = self.transform.matrix();
        self.world_matrix = world;
        self.world_matrix_usable = is_matrix_usable(&world);
        if !self.world_matrix_usable {
            return None;
        }
        self.bounding_info.update(&world);
        Some(world)
    }

    pub fn bounding_info(&self) -> &BoundingInfo {
        &self.bounding_info
    }

    /// Replace the local bounds; the world part follows on the next
    /// world matrix computation.
    pub fn set_bounding_info(&mut self, info: BoundingInfo) {
        self.bounding_info = info;
        if self.world_matrix_usable {
            self.bounding_info.update(&self.world_matrix);
        }
    }

    /// Material used by `sub_mesh`: its override, else the mesh material.
    pub fn sub_mesh_material(&self, sub_mesh: usize) -> Option<MaterialId> {
        self.sub_meshes
            .get(sub_mesh)
            .and_then(|s| s.material)
            .or(self.material)
    }

    pub fn total_indices(&self) -> u32 {
        self.sub_meshes.iter().map(|s| s.index_count).sum()
    }

    /// True when enabled, visible and not fully faded out.
    pub fn is_renderable(&self) -> bool {
        self.is_enabled && self.is_visible && self.visibility > 0.0
    }
}
