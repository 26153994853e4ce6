use std::mem::size_of;

use bytemuck::{bytes_of, cast_slice, Pod, Zeroable};
use glam::{const_vec2, Mat4, Vec2, Vec3, Vec4};
use log::info;
use wgpu::util::DeviceExt;

use crate::particles::ParticleEmitter;

use super::{
    frame_buffers::FrameBuffers,
    shader::{self, ShaderError},
};

#[derive(Debug, Copy, Clone, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
struct ParticleUniforms {
    view: Mat4,
    projection: Mat4,
    emitter: Vec4,
    gravity: Vec4,
    params: Vec4,
}

impl ParticleUniforms {
    fn new(view: Mat4, projection: Mat4, emitter: &ParticleEmitter, time: f32) -> Self {
        Self {
            view,
            projection,
            emitter: emitter.position.extend(time),
            gravity: emitter.gravity.extend(emitter.lifetime),
            params: Vec4::new(emitter.size, 0.0, 0.0, 0.0),
        }
    }
}

/// Camera-facing quads, one instance per particle, alpha blended over the
/// scene without writing depth.
pub struct ParticleRenderer {
    uniform_buffer: wgpu::Buffer,
    _vertex_buffer: wgpu::Buffer,
    _index_buffer: wgpu::Buffer,
    _velocity_buffer: wgpu::Buffer,
    _birth_time_buffer: wgpu::Buffer,

    render_bundle: wgpu::RenderBundle,
}

impl ParticleRenderer {
    const PARTICLE_VERTICES: [Vec2; 4] = [
        const_vec2!([-0.5, -0.5]),
        const_vec2!([-0.5, 0.5]),
        const_vec2!([0.5, -0.5]),
        const_vec2!([0.5, 0.5]),
    ];
    const PARTICLE_INDICES: [u16; 6] = [0, 2, 1, 1, 2, 3];

    pub fn new(device: &wgpu::Device, emitter: &ParticleEmitter) -> Result<Self, ShaderError> {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Uniform Buffer"),
            size: size_of::<ParticleUniforms>() as _,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Vertex Buffer"),
            contents: bytes_of(&Self::PARTICLE_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Index Buffer"),
            contents: bytes_of(&Self::PARTICLE_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        let velocity_buffer = Self::make_instance_buffer(
            device,
            "Particle Velocity Buffer",
            cast_slice(&emitter.initial_velocities),
        );
        let birth_time_buffer = Self::make_instance_buffer(
            device,
            "Particle Birth Time Buffer",
            cast_slice(&emitter.birth_times),
        );
        info!("Uploaded {} particles", emitter.count());

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(size_of::<ParticleUniforms>() as _),
                },
                count: None,
            }],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let render_pipeline = Self::make_render_pipeline(device, &bind_group_layout)?;

        let mut encoder =
            device.create_render_bundle_encoder(&wgpu::RenderBundleEncoderDescriptor {
                label: Some("Particle Render Bundle Encoder"),
                color_formats: &[FrameBuffers::COLOR_FORMAT],
                depth_stencil: Some(wgpu::RenderBundleDepthStencil {
                    format: FrameBuffers::DEPTH_FORMAT,
                    depth_read_only: false,
                    stencil_read_only: true,
                }),
                sample_count: 1,
                multiview: None,
            });
        encoder.set_pipeline(&render_pipeline);
        encoder.set_bind_group(0, &bind_group, &[]);
        encoder.set_vertex_buffer(0, vertex_buffer.slice(..));
        encoder.set_vertex_buffer(1, velocity_buffer.slice(..));
        encoder.set_vertex_buffer(2, birth_time_buffer.slice(..));
        encoder.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        encoder.draw_indexed(
            0..(Self::PARTICLE_INDICES.len() as _),
            0,
            0..emitter.count(),
        );
        let render_bundle = encoder.finish(&wgpu::RenderBundleDescriptor {
            label: Some("Particle Render Bundle"),
        });

        Ok(Self {
            uniform_buffer,
            _vertex_buffer: vertex_buffer,
            _index_buffer: index_buffer,
            _velocity_buffer: velocity_buffer,
            _birth_time_buffer: birth_time_buffer,
            render_bundle,
        })
    }

    fn make_instance_buffer(device: &wgpu::Device, label: &str, contents: &[u8]) -> wgpu::Buffer {
        // Zero-sized vertex buffers are rejected.
        let contents = if contents.is_empty() { &[0; 16][..] } else { contents };
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::VERTEX,
        })
    }

    fn make_render_pipeline(
        device: &wgpu::Device,
        bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Result<wgpu::RenderPipeline, ShaderError> {
        let shader_module = shader::compile(device, shader::PARTICLES)?;

        shader::link(device, "Particle Pipeline", || {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: None,
                bind_group_layouts: &[bind_group_layout],
                push_constant_ranges: &[],
            });

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Particle Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader_module,
                    entry_point: "vs_main",
                    buffers: &[
                        wgpu::VertexBufferLayout {
                            array_stride: size_of::<Vec2>() as _,
                            step_mode: wgpu::VertexStepMode::Vertex,
                            attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                        },
                        wgpu::VertexBufferLayout {
                            array_stride: size_of::<Vec3>() as _,
                            step_mode: wgpu::VertexStepMode::Instance,
                            attributes: &wgpu::vertex_attr_array![1 => Float32x3],
                        },
                        wgpu::VertexBufferLayout {
                            array_stride: size_of::<f32>() as _,
                            step_mode: wgpu::VertexStepMode::Instance,
                            attributes: &wgpu::vertex_attr_array![2 => Float32],
                        },
                    ],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader_module,
                    entry_point: "fs_main",
                    targets: &[wgpu::ColorTargetState {
                        format: FrameBuffers::COLOR_FORMAT,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    }],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: FrameBuffers::DEPTH_FORMAT,
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            })
        })
    }

    pub fn update(
        &self,
        queue: &wgpu::Queue,
        view: Mat4,
        projection: Mat4,
        emitter: &ParticleEmitter,
        time: f32,
    ) {
        let uniforms = ParticleUniforms::new(view, projection, emitter, time);
        queue.write_buffer(&self.uniform_buffer, 0, bytes_of(&uniforms));
    }

    pub fn draw<'rpass>(&'rpass self, rpass: &mut wgpu::RenderPass<'rpass>) {
        rpass.execute_bundles(std::iter::once(&self.render_bundle));
    }
}

#[cfg(test)]
mod tests {
    use glam::vec3;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    use crate::config::ParticleConfig;

    use super::*;

    #[test]
    fn uniforms_pack_time_and_lifetime() {
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        let emitter = ParticleEmitter::new(&ParticleConfig::default(), &mut rng);
        let uniforms = ParticleUniforms::new(Mat4::IDENTITY, Mat4::IDENTITY, &emitter, 3.25);

        assert_eq!(uniforms.emitter, emitter.position.extend(3.25));
        assert_eq!(uniforms.gravity.w, emitter.lifetime);
        assert_eq!(uniforms.params.x, emitter.size);
    }

    #[test]
    fn instance_attributes_are_tightly_packed() {
        let velocities = [vec3(1.0, 2.0, 3.0), vec3(4.0, 5.0, 6.0)];
        let bytes: &[u8] = cast_slice(&velocities);
        assert_eq!(bytes.len(), 2 * size_of::<Vec3>());
        assert_eq!(size_of::<Vec3>(), 12);
    }

    #[test]
    fn quad_is_centered_on_the_particle() {
        let sum = ParticleRenderer::PARTICLE_VERTICES
            .iter()
            .fold(Vec2::ZERO, |sum, corner| sum + *corner);
        assert_eq!(sum, Vec2::ZERO);
    }
}
