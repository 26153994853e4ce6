use std::borrow::Cow;

use pollster::FutureExt as _;

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to compile shader {name}: {message}")]
    Compile { name: &'static str, message: String },

    #[error("failed to link pipeline {name}: {message}")]
    Link { name: &'static str, message: String },
}

/// A named WGSL source baked into the binary.
#[derive(Debug, Copy, Clone)]
pub struct ShaderSource {
    pub name: &'static str,
    pub source: &'static str,
}

macro_rules! shader_source {
    ($name:literal) => {
        ShaderSource {
            name: $name,
            source: include_str!(concat!("shaders/", $name)),
        }
    };
}

pub const FULLSCREEN: ShaderSource = shader_source!("fullscreen.wgsl");
pub const COPY: ShaderSource = shader_source!("copy.wgsl");
pub const BLOOM: ShaderSource = shader_source!("bloom.wgsl");
pub const COMPOSITE: ShaderSource = shader_source!("composite.wgsl");
pub const SKYBOX: ShaderSource = shader_source!("skybox.wgsl");
pub const PBR: ShaderSource = shader_source!("pbr.wgsl");
pub const PARTICLES: ShaderSource = shader_source!("particles.wgsl");

/// Compiles `shader`, turning validation failures into an error instead of
/// the device's default panic.
pub fn compile(device: &wgpu::Device, shader: ShaderSource) -> Result<wgpu::ShaderModule, ShaderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(&wgpu::ShaderModuleDescriptor {
        label: Some(shader.name),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(shader.source)),
    });
    match device.pop_error_scope().block_on() {
        None => Ok(module),
        Some(error) => Err(ShaderError::Compile {
            name: shader.name,
            message: error.to_string(),
        }),
    }
}

/// Runs pipeline creation inside a validation scope, so interface
/// mismatches between stages and layouts surface as [`ShaderError::Link`].
pub fn link<T>(
    device: &wgpu::Device,
    name: &'static str,
    create: impl FnOnce() -> T,
) -> Result<T, ShaderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = create();
    match device.pop_error_scope().block_on() {
        None => Ok(pipeline),
        Some(error) => Err(ShaderError::Link {
            name,
            message: error.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declares(shader: ShaderSource, entry_point: &str) -> bool {
        shader.source.contains(&format!("fn {}(", entry_point))
    }

    #[test]
    fn entry_points_exist() {
        assert!(declares(FULLSCREEN, "vs_main"));
        assert!(declares(COPY, "fs_main"));
        assert!(declares(BLOOM, "fs_bright_horizontal"));
        assert!(declares(BLOOM, "fs_vertical"));
        assert!(declares(COMPOSITE, "fs_main"));
        for shader in [SKYBOX, PBR, PARTICLES] {
            assert!(declares(shader, "vs_main"), "{}", shader.name);
            assert!(declares(shader, "fs_main"), "{}", shader.name);
        }
    }

    #[test]
    fn errors_name_the_shader() {
        let error = ShaderError::Compile {
            name: "pbr.wgsl",
            message: "unknown identifier".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "failed to compile shader pbr.wgsl: unknown identifier"
        );
    }
}
