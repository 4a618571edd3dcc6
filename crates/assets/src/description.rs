//! Declarative JSON scene descriptions built from primitive shapes.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use vista_common::Color3;
use vista_kernel::{Camera, Light, Material, Mesh, VertexData};

use crate::container::{AssetContainer, ContainerMesh};
use crate::ImportError;

fn white() -> Color3 {
    Color3::WHITE
}

fn one() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDescription {
    pub name: String,
    #[serde(default = "white")]
    pub diffuse: Color3,
    #[serde(default = "one")]
    pub alpha: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeDescription {
    Box { size: f32 },
    Sphere { segments: u32, diameter: f32 },
    Ground { width: f32, height: f32, subdivisions: u32 },
    Plane { size: f32 },
}

impl ShapeDescription {
    fn vertex_data(&self) -> VertexData {
        match *self {
            Self::Box { size } => VertexData::create_box(size),
            Self::Sphere { segments, diameter } => VertexData::create_sphere(segments, diameter),
            Self::Ground {
                width,
                height,
                subdivisions,
            } => VertexData::create_ground(width, height, subdivisions),
            Self::Plane { size } => VertexData::create_plane(size),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshDescription {
    pub name: String,
    /// User id; defaults to the name.
    #[serde(default)]
    pub id: Option<String>,
    pub shape: ShapeDescription,
    #[serde(default)]
    pub position: Vec3,
    /// Name of a material declared in the same description.
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LightDescription {
    Point { name: String, position: Vec3 },
    Hemispheric { name: String, direction: Vec3 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDescription {
    pub name: String,
    pub position: Vec3,
    #[serde(default)]
    pub target: Vec3,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub materials: Vec<MaterialDescription>,
    #[serde(default)]
    pub meshes: Vec<MeshDescription>,
    #[serde(default)]
    pub lights: Vec<LightDescription>,
    #[serde(default)]
    pub cameras: Vec<CameraDescription>,
}

impl SceneDescription {
    pub fn from_json_str(text: &str) -> Result<Self, ImportError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ImportError> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ImportError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Build the entities. Fails when a mesh names a material that is not
    /// declared here.
    pub fn into_container(self) -> Result<AssetContainer, ImportError> {
        let mut container = AssetContainer::new();
        for desc in &self.materials {
            let mut material = Material::new(desc.name.clone());
            material.diffuse_color = desc.diffuse;
            material.alpha = desc.alpha;
            container.materials.push(material);
        }

        for desc in self.meshes {
            let material = match &desc.material {
                Some(name) => Some(
                    self.materials
                        .iter()
                        .position(|m| &m.name == name)
                        .ok_or_else(|| ImportError::UnknownMaterial {
                            mesh: desc.name.clone(),
                            material: name.clone(),
                        })?,
                ),
                None => None,
            };
            let mut mesh = Mesh::new(desc.name.clone()).with_position(desc.position);
            if let Some(id) = desc.id {
                mesh = mesh.with_id(id);
            }
            for tag in &desc.tags {
                mesh.tags.add_tags(tag);
            }
            container.meshes.push(ContainerMesh {
                material,
                ..ContainerMesh::new(mesh).with_vertex_data(desc.shape.vertex_data())
            });
        }

        container.lights = self
            .lights
            .into_iter()
            .map(|desc| match desc {
                LightDescription::Point { name, position } => Light::point(name, position),
                LightDescription::Hemispheric { name, direction } => {
                    Light::hemispheric(name, direction)
                }
            })
            .collect();
        container.cameras = self
            .cameras
            .into_iter()
            .map(|desc| Camera::new(desc.name, desc.position, desc.target))
            .collect();
        Ok(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COURTYARD: &str = r#"{
        "materials": [{ "name": "stone", "diffuse": { "r": 0.5, "g": 0.5, "b": 0.5 } }],
        "meshes": [
            { "name": "floor", "shape": { "type": "ground", "width": 10, "height": 10, "subdivisions": 2 }, "material": "stone" },
            { "name": "pillar", "id": "p1", "shape": { "type": "box", "size": 1 }, "position": [2, 0.5, 0], "tags": ["column stone"] }
        ],
        "lights": [{ "type": "hemispheric", "name": "sky", "direction": [0, 1, 0] }],
        "cameras": [{ "name": "eye", "position": [0, 5, -10] }]
    }"#;

    #[test]
    fn parses_and_builds() {
        let container = SceneDescription::from_json_str(COURTYARD)
            .unwrap()
            .into_container()
            .unwrap();
        assert_eq!(container.materials[0].alpha, 1.0);
        assert_eq!(container.meshes.len(), 2);
        assert_eq!(container.meshes[0].material, Some(0));
        let pillar = &container.meshes[1];
        assert_eq!(pillar.mesh.id, "p1");
        assert_eq!(pillar.mesh.position(), Vec3::new(2.0, 0.5, 0.0));
        assert!(pillar.mesh.tags.contains("column"));
        assert_eq!(pillar.vertex_data.as_ref().map(|d| d.total_indices()), Some(36));
        assert_eq!(container.lights.len(), 1);
        assert_eq!(container.cameras[0].target, Vec3::ZERO);
    }

    #[test]
    fn unknown_material_is_an_error() {
        let text = r#"{ "meshes": [{ "name": "m", "shape": { "type": "plane", "size": 1 }, "material": "gold" }] }"#;
        let err = SceneDescription::from_json_str(text)
            .unwrap()
            .into_container()
            .unwrap_err();
        assert!(matches!(err, ImportError::UnknownMaterial { .. }));
    }

    #[test]
    fn bad_json_is_an_error() {
        let err = SceneDescription::from_json_str("{ \"meshes\": 3 }").unwrap_err();
        assert!(matches!(err, ImportError::Json(_)));
    }

    #[test]
    fn file_round_trip() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let desc = SceneDescription::from_json_str(COURTYARD).unwrap();
        desc.save(tmp.path()).unwrap();
        assert_eq!(SceneDescription::load(tmp.path()).unwrap(), desc);
        assert!(matches!(
            SceneDescription::load(tmp.path().with_extension("missing")),
            Err(ImportError::Io(_))
        ));
    }
}
