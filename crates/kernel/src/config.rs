use std::path::Path;

use serde::{Deserialize, Serialize};
use vista_common::{Color3, Color4};
use vista_input::PointerConfig;
use vista_spatial::OctreeConfig;

/// Errors from loading or validating a [`SceneConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Scene-wide switches and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Clear color, depth and stencil once per frame before any camera.
    pub auto_clear: bool,
    pub clear_color: Color4,
    pub ambient_color: Color3,
    pub animations_enabled: bool,
    pub particles_enabled: bool,
    pub sprites_enabled: bool,
    pub skeletons_enabled: bool,
    /// Attach a built-in Euler physics engine when the scene is created.
    pub physics_enabled_by_default: bool,
    /// Pick on every pointer move even without pointer actions.
    pub constantly_update_mesh_under_pointer: bool,
    pub min_delta_time_ms: f64,
    pub max_delta_time_ms: f64,
    pub drag_movement_threshold: f32,
    pub double_click_delay_ms: f64,
    pub long_press_delay_ms: f64,
    pub octree_max_capacity: usize,
    pub octree_max_depth: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            auto_clear: true,
            clear_color: Color4::default(),
            ambient_color: Color3::BLACK,
            animations_enabled: true,
            particles_enabled: true,
            sprites_enabled: true,
            skeletons_enabled: true,
            physics_enabled_by_default: false,
            constantly_update_mesh_under_pointer: false,
            min_delta_time_ms: 1.0,
            max_delta_time_ms: 1000.0,
            drag_movement_threshold: 10.0,
            double_click_delay_ms: 300.0,
            long_press_delay_ms: 500.0,
            octree_max_capacity: 64,
            octree_max_depth: 2,
        }
    }
}

impl SceneConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file. `.yaml` and `.yml` files are read as YAML,
    /// everything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_delta_time_ms >= 0.0 && self.min_delta_time_ms <= self.max_delta_time_ms) {
            return Err(ConfigError::Invalid(format!(
                "min_delta_time_ms {} must be in [0, max_delta_time_ms {}]",
                self.min_delta_time_ms, self.max_delta_time_ms
            )));
        }
        if self.drag_movement_threshold <= 0.0 {
            return Err(ConfigError::Invalid(
                "drag_movement_threshold must be positive".into(),
            ));
        }
        if self.double_click_delay_ms <= 0.0 || self.long_press_delay_ms <= 0.0 {
            return Err(ConfigError::Invalid(
                "click delays must be positive".into(),
            ));
        }
        if self.octree_max_capacity == 0 {
            return Err(ConfigError::Invalid(
                "octree_max_capacity must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Clamp a raw frame delta into the configured range.
    pub fn clamp_delta_ms(&self, delta_ms: f64) -> f64 {
        delta_ms.clamp(self.min_delta_time_ms, self.max_delta_time_ms)
    }

    pub fn pointer_config(&self) -> PointerConfig {
        PointerConfig {
            drag_movement_threshold: self.drag_movement_threshold,
            double_click_delay_ms: self.double_click_delay_ms,
            long_press_delay_ms: self.long_press_delay_ms,
        }
    }

    pub fn octree_config(&self) -> OctreeConfig {
        OctreeConfig {
            max_block_capacity: self.octree_max_capacity,
            max_depth: self.octree_max_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let c = SceneConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.octree_max_capacity, 64);
        assert_eq!(c.pointer_config(), PointerConfig::default());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c = SceneConfig::from_json_str(r#"{ "auto_clear": false, "max_delta_time_ms": 50.0 }"#)
            .unwrap();
        assert!(!c.auto_clear);
        assert_eq!(c.max_delta_time_ms, 50.0);
        assert_eq!(c.min_delta_time_ms, 1.0);
    }

    #[test]
    fn inverted_delta_range_is_rejected() {
        let err = SceneConfig::from_json_str(r#"{ "min_delta_time_ms": 10.0, "max_delta_time_ms": 5.0 }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            SceneConfig::from_json_str("{ nope"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn clamp_delta() {
        let c = SceneConfig::default();
        assert_eq!(c.clamp_delta_ms(0.0), 1.0);
        assert_eq!(c.clamp_delta_ms(5000.0), 1000.0);
        assert_eq!(c.clamp_delta_ms(16.0), 16.0);
    }

    #[test]
    fn save_and_load_json() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let config = SceneConfig {
            octree_max_depth: 3,
            ..SceneConfig::default()
        };
        config.save(tmp.path()).unwrap();
        assert_eq!(SceneConfig::load(tmp.path()).unwrap(), config);
    }

    #[test]
    fn load_yaml_by_extension() {
        let mut tmp = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(tmp, "particles_enabled: false\nlong_press_delay_ms: 800.0").unwrap();
        let c = SceneConfig::load(tmp.path()).unwrap();
        assert!(!c.particles_enabled);
        assert_eq!(c.long_press_delay_ms, 800.0);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            SceneConfig::load("/definitely/not/here.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
