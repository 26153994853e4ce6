//! Everything loaded from disk before the first frame. Each asset has a
//! built-in stand-in, so missing files degrade the scene instead of
//! aborting it.

mod images;
mod mesh;
mod obj;

use std::path::Path;

use glam::{vec3, Mat4, Quat, Vec3};
use log::{info, warn};

use crate::config::AssetConfig;

pub use self::images::{load_cube_faces, load_image, procedural_sky, ImageData, CUBE_FACES};
pub use self::mesh::{cube, plane, sky_cube_positions, MeshData, Vertex};
pub use self::obj::{load_obj, parse_obj};

pub const GROUND_SIZE: f32 = 100.0;
pub const GROUND_HEIGHT: f32 = -10.0;
const GROUND_TILE: f32 = 10.0;
const PROCEDURAL_SKY_SIZE: u32 = 64;

const DEFAULT_ALBEDO: [u8; 4] = [255, 255, 255, 255];
const DEFAULT_NORMAL: [u8; 4] = [128, 128, 255, 255];
const DEFAULT_METALLIC: [u8; 4] = [0, 0, 0, 255];
const DEFAULT_ROUGHNESS: [u8; 4] = [255, 255, 255, 255];
const DEFAULT_AMBIENT_OCCLUSION: [u8; 4] = [255, 255, 255, 255];

/// Texture set for one physically based material.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialImages {
    pub albedo: ImageData,
    pub normal: ImageData,
    pub metallic: ImageData,
    pub roughness: ImageData,
    pub ambient_occlusion: ImageData,
}

impl Default for MaterialImages {
    fn default() -> Self {
        Self {
            albedo: ImageData::solid(DEFAULT_ALBEDO),
            normal: ImageData::solid(DEFAULT_NORMAL),
            metallic: ImageData::solid(DEFAULT_METALLIC),
            roughness: ImageData::solid(DEFAULT_ROUGHNESS),
            ambient_occlusion: ImageData::solid(DEFAULT_AMBIENT_OCCLUSION),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneAssets {
    pub gun: MeshData,
    pub gun_transform: Mat4,
    pub gun_material: MaterialImages,
    pub ground: MeshData,
    pub ground_transform: Mat4,
    pub ground_material: MaterialImages,
    pub sky: [ImageData; 6],
}

impl SceneAssets {
    pub fn load(config: &AssetConfig) -> Self {
        let (gun, gun_transform) = match load_obj(&config.mesh) {
            Ok(mesh) => {
                info!(
                    "Loaded {} ({} triangles)",
                    config.mesh.display(),
                    mesh.triangle_count()
                );
                (mesh, gun_transform())
            }
            Err(err) => {
                warn!("{:#}; drawing a cube instead", err);
                (cube(1.0), Mat4::from_translation(vec3(0.0, 0.0, -5.0)))
            }
        };

        let gun_material = MaterialImages {
            albedo: load_or_default(&config.albedo, DEFAULT_ALBEDO),
            normal: load_or_default(&config.normal, DEFAULT_NORMAL),
            metallic: load_or_default(&config.metallic, DEFAULT_METALLIC),
            roughness: load_or_default(&config.roughness, DEFAULT_ROUGHNESS),
            ambient_occlusion: load_or_default(
                &config.ambient_occlusion,
                DEFAULT_AMBIENT_OCCLUSION,
            ),
        };

        let ground_material = MaterialImages {
            albedo: load_or_default(&config.ground_albedo, DEFAULT_ALBEDO),
            ..Default::default()
        };

        let sky = match load_cube_faces(&config.skybox) {
            Ok(faces) => {
                info!("Loaded sky box from {}", config.skybox.display());
                faces
            }
            Err(err) => {
                warn!("{:#}; using a procedural sky", err);
                procedural_sky(PROCEDURAL_SKY_SIZE)
            }
        };

        Self {
            gun,
            gun_transform,
            gun_material,
            ground: plane(GROUND_SIZE, GROUND_SIZE, GROUND_TILE),
            ground_transform: Mat4::from_translation(vec3(0.0, GROUND_HEIGHT, 0.0)),
            ground_material,
            sky,
        }
    }
}

/// Places the revolver model in front of the camera, barrel pointing
/// sideways.
pub fn gun_transform() -> Mat4 {
    let rotation = Quat::from_rotation_y(180f32.to_radians())
        * Quat::from_rotation_z(-90f32.to_radians());
    Mat4::from_scale_rotation_translation(Vec3::splat(0.05), rotation, vec3(0.0, 0.0, -5.0))
}

fn load_or_default(path: &Path, default: [u8; 4]) -> ImageData {
    match load_image(path) {
        Ok(image) => {
            info!("Loaded {} ({}x{})", path.display(), image.width, image.height);
            image
        }
        Err(err) => {
            warn!("{:#}; using a 1x1 default", err);
            ImageData::solid(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing() -> AssetConfig {
        AssetConfig {
            mesh: "missing/mesh.obj".into(),
            albedo: "missing/albedo.png".into(),
            normal: "missing/normal.png".into(),
            metallic: "missing/metallic.png".into(),
            roughness: "missing/roughness.png".into(),
            ambient_occlusion: "missing/ao.png".into(),
            ground_albedo: "missing/ground.png".into(),
            skybox: "missing/sky".into(),
        }
    }

    #[test]
    fn missing_files_fall_back() {
        let assets = SceneAssets::load(&missing());
        assert_eq!(assets.gun, cube(1.0));
        assert_eq!(assets.gun_material, MaterialImages::default());
        assert_eq!(assets.ground_material.albedo, ImageData::solid(DEFAULT_ALBEDO));
        assert_eq!(assets.sky[0].width, PROCEDURAL_SKY_SIZE);
    }

    #[test]
    fn mesh_file_is_used_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.obj");
        std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let config = AssetConfig {
            mesh: path,
            ..missing()
        };
        let assets = SceneAssets::load(&config);
        assert_eq!(assets.gun.triangle_count(), 1);
        assert_eq!(assets.gun_transform, gun_transform());
    }

    #[test]
    fn gun_sits_in_front_of_the_camera() {
        let origin = gun_transform().transform_point3(Vec3::ZERO);
        assert!((origin - vec3(0.0, 0.0, -5.0)).length() < 1e-6);

        // Model +X ends up along world -Y, scaled down.
        let x = gun_transform().transform_vector3(Vec3::X);
        assert!((x - vec3(0.0, -0.05, 0.0)).length() < 1e-6);
    }

    #[test]
    fn ground_is_below_the_emitter() {
        let assets = SceneAssets::load(&missing());
        let corner = assets
            .ground_transform
            .transform_point3(assets.ground.vertices[0].position);
        assert_eq!(corner.y, GROUND_HEIGHT);
    }
}
