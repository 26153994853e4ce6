use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use glam::Vec3;

/// Tightly packed 8-bit RGBA pixels, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// A 1x1 image of one color.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
        }
    }
}

pub fn load_image(path: &Path) -> Result<ImageData> {
    let image = image::open(path)
        .with_context(|| format!("failed to load image {}", path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Ok(ImageData {
        width,
        height,
        pixels: image.into_raw(),
    })
}

/// Cube map face order expected by the GPU: +X, -X, +Y, -Y, +Z, -Z.
pub const CUBE_FACES: [&str; 6] = ["posx", "negx", "posy", "negy", "posz", "negz"];
const CUBE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

fn find_face(dir: &Path, face: &str) -> Result<PathBuf> {
    CUBE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", face, ext)))
        .find(|path| path.is_file())
        .with_context(|| format!("no {} image in {}", face, dir.display()))
}

/// Loads the six faces of a sky box. All faces must be square and the
/// same size.
pub fn load_cube_faces(dir: &Path) -> Result<[ImageData; 6]> {
    let mut faces = Vec::with_capacity(CUBE_FACES.len());
    for face in CUBE_FACES {
        faces.push(load_image(&find_face(dir, face)?)?);
    }
    let size = faces[0].width;
    for (face, image) in CUBE_FACES.iter().zip(&faces) {
        ensure!(
            image.width == size && image.height == size,
            "sky box face {} is {}x{}, expected {}x{}",
            face,
            image.width,
            image.height,
            size,
            size
        );
    }
    faces
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected six sky box faces"))
}

/// Vertical gradient from a warm horizon to a dark zenith, used when no sky
/// box images are available.
pub fn procedural_sky(size: u32) -> [ImageData; 6] {
    let size = size.max(1);
    let horizon = Vec3::new(0.55, 0.42, 0.32);
    let zenith = Vec3::new(0.05, 0.07, 0.16);
    let ground = Vec3::new(0.08, 0.06, 0.05);

    let face = |index: usize| {
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            // -1 at the bottom edge of a side face, +1 at the top.
            let t = 1.0 - 2.0 * (y as f32 + 0.5) / size as f32;
            let color = match index {
                2 => zenith,
                3 => ground,
                _ if t >= 0.0 => horizon.lerp(zenith, t),
                _ => horizon.lerp(ground, -t),
            };
            let c = (color * 255.0).round();
            for _ in 0..size {
                pixels.extend_from_slice(&[c.x as u8, c.y as u8, c.z as u8, 255]);
            }
        }
        ImageData {
            width: size,
            height: size,
            pixels,
        }
    };

    [face(0), face(1), face(2), face(3), face(4), face(5)]
}
