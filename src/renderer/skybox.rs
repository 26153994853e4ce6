use std::mem::size_of;

use bytemuck::{bytes_of, cast_slice, Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::{
    assets::{sky_cube_positions, ImageData},
    camera::FlyCamera,
};

use super::{
    frame_buffers::FrameBuffers,
    samplers::Samplers,
    shader::{self, ShaderError},
    textures::Texture,
};

#[derive(Debug, Copy, Clone, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
struct SkyUniforms {
    view_projection: Mat4,
}

impl SkyUniforms {
    fn new(camera: &FlyCamera) -> Self {
        Self {
            view_projection: camera.projection_matrix() * camera.sky_view_matrix(),
        }
    }
}

/// Cube-mapped sky drawn at the far plane, following only the camera's
/// rotation.
pub struct SkyboxRenderer {
    uniform_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    _texture: Texture,
    bind_group: wgpu::BindGroup,
    render_pipeline: wgpu::RenderPipeline,
}

impl SkyboxRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        samplers: &Samplers,
        faces: &[ImageData; 6],
    ) -> Result<Self, ShaderError> {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Sky Uniform Buffer"),
            size: size_of::<SkyUniforms>() as _,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let positions = sky_cube_positions();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sky Vertex Buffer"),
            contents: cast_slice(&positions),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let texture = Texture::cube_from_images(device, queue, "Sky Texture", faces);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sky Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(size_of::<SkyUniforms>() as _),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sky Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&samplers.bilinear),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&texture.texture_view),
                },
            ],
        });

        let shader_module = shader::compile(device, shader::SKYBOX)?;

        let render_pipeline = shader::link(device, "Sky Pipeline", || {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: None,
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Sky Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader_module,
                    entry_point: "vs_main",
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: size_of::<glam::Vec3>() as _,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader_module,
                    entry_point: "fs_main",
                    targets: &[FrameBuffers::COLOR_FORMAT.into()],
                }),
                primitive: wgpu::PrimitiveState::default(),
                // Depth is 1 everywhere, so the sky only fills what stays cleared.
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: FrameBuffers::DEPTH_FORMAT,
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            })
        })?;

        Ok(Self {
            uniform_buffer,
            vertex_buffer,
            vertex_count: positions.len() as u32,
            _texture: texture,
            bind_group,
            render_pipeline,
        })
    }

    pub fn update(&self, queue: &wgpu::Queue, camera: &FlyCamera) {
        queue.write_buffer(&self.uniform_buffer, 0, bytes_of(&SkyUniforms::new(camera)));
    }

    pub fn draw<'rpass>(&'rpass self, rpass: &mut impl wgpu::util::RenderEncoder<'rpass>) {
        rpass.set_pipeline(&self.render_pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        rpass.draw(0..self.vertex_count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use crate::config::CameraConfig;

    use super::*;

    #[test]
    fn sky_ignores_camera_translation() {
        let mut camera = FlyCamera::new(&CameraConfig::default(), 16.0 / 9.0);
        let before = SkyUniforms::new(&camera);
        camera.position += vec3(40.0, -3.0, 12.0);
        let after = SkyUniforms::new(&camera);
        assert_eq!(before, after);
    }
}
