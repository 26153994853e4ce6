//! Demo configuration with built-in defaults and optional RON overrides.

use std::path::{Path, PathBuf};

use glam::{vec3, Vec3};
use serde::{Deserialize, Serialize};

/// Errors that can occur while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub spotlight: SpotlightConfig,
    pub bloom: BloomConfig,
    pub tonemap: TonemapConfig,
    pub particles: ParticleConfig,
    pub assets: AssetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

/// Free-fly camera settings. Angles are in degrees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub speed: f32,
    pub sensitivity: f32,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

/// Spotlight settings. Cutoffs are in degrees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpotlightConfig {
    pub white_intensity: Vec3,
    pub tinted_intensity: Vec3,
    pub ambient: f32,
    pub inner_cutoff: f32,
    pub outer_cutoff: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BloomConfig {
    pub enabled: bool,
    /// Variance (sigma squared) of the Gaussian kernel.
    pub variance: f32,
    /// Luminance above which a texel feeds the bloom.
    pub threshold: f32,
    /// Ping-pong buffers are the viewport divided by this in each dimension.
    pub downsample: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TonemapConfig {
    pub exposure: f32,
    pub white: f32,
    pub gamma: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParticleConfig {
    pub count: u32,
    /// Seconds a particle lives before it is re-emitted.
    pub lifetime: f32,
    pub emitter_position: Vec3,
    pub emitter_direction: Vec3,
    pub gravity: Vec3,
    pub size: f32,
    /// Fixed RNG seed. When absent the wall clock seeds the generator.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetConfig {
    pub mesh: PathBuf,
    pub albedo: PathBuf,
    pub normal: PathBuf,
    pub metallic: PathBuf,
    pub roughness: PathBuf,
    pub ambient_occlusion: PathBuf,
    pub ground_albedo: PathBuf,
    /// Directory holding `posx`, `negx`, `posy`, `negy`, `posz`, `negz` images.
    pub skybox: PathBuf,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Ember Lantern".to_string(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: vec3(0.0, 0.0, 10.0),
            yaw: -90.0,
            pitch: 0.0,
            speed: 5.0,
            sensitivity: 0.025,
            fov_y: 70.0,
            near: 0.3,
            far: 100.0,
        }
    }
}

impl Default for SpotlightConfig {
    fn default() -> Self {
        Self {
            white_intensity: Vec3::ONE,
            tinted_intensity: vec3(1.0, 0.45, 0.15),
            ambient: 0.2,
            inner_cutoff: 12.5,
            outer_cutoff: 17.5,
        }
    }
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            variance: 25.0,
            threshold: 1.7,
            downsample: 8,
        }
    }
}

impl Default for TonemapConfig {
    fn default() -> Self {
        Self {
            exposure: 0.35,
            white: 0.982,
            gamma: 2.2,
        }
    }
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 800,
            lifetime: 5.5,
            emitter_position: vec3(0.0, -9.5, -5.0),
            emitter_direction: Vec3::Y,
            gravity: vec3(0.0, 0.2, 0.0),
            size: 0.35,
            seed: None,
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            mesh: "media/revolver/revolver.obj".into(),
            albedo: "media/revolver/textures/albedo.png".into(),
            normal: "media/revolver/textures/normal.png".into(),
            metallic: "media/revolver/textures/metallic.png".into(),
            roughness: "media/revolver/textures/roughness.png".into(),
            ambient_occlusion: "media/revolver/textures/ao.png".into(),
            ground_albedo: "media/texture/ground.png".into(),
            skybox: "media/skybox".into(),
        }
    }
}

impl DemoConfig {
    /// Reads a RON file. Missing sections and fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config = ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads `path` when given, otherwise returns the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                log::info!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "(bloom: (enabled: false), tonemap: (exposure: 0.5))").unwrap();

        let config = DemoConfig::load(file.path()).unwrap();
        assert!(!config.bloom.enabled);
        assert_eq!(config.bloom.variance, 25.0);
        assert_eq!(config.tonemap.exposure, 0.5);
        assert_eq!(config.tonemap.gamma, 2.2);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn vectors_parse_as_tuples() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "(camera: (position: (1.0, 2.0, 3.0)))").unwrap();

        let config = DemoConfig::load(file.path()).unwrap();
        assert_eq!(config.camera.position, vec3(1.0, 2.0, 3.0));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "(bloom: (enabled: maybe))").unwrap();

        let err = DemoConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = DemoConfig::load(Path::new("does/not/exist.ron")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn no_path_gives_defaults() {
        let config = DemoConfig::load_or_default(None).unwrap();
        assert_eq!(config, DemoConfig::default());
        assert_eq!(config.camera.fov_y, 70.0);
        assert_eq!(config.bloom.downsample, 8);
    }
}
