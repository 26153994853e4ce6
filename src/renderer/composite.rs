use std::mem::size_of;

use bytemuck::{bytes_of, Pod, Zeroable};
use glam::{const_mat3, Mat3, Vec3};

use crate::config::TonemapConfig;

use super::{
    frame_buffers::FrameBuffers,
    pass::{PassKind, Target},
    samplers::Samplers,
    shader::{self, ShaderError},
};

const RGB_TO_XYZ: Mat3 = const_mat3!([
    0.4124, 0.2126, 0.0193, //
    0.3576, 0.7152, 0.1192, //
    0.1805, 0.0722, 0.9505
]);
const XYZ_TO_RGB: Mat3 = const_mat3!([
    3.2406, -0.9689, 0.0557, //
    -1.5372, 1.8758, -0.2040, //
    -0.4986, 0.0415, 1.0570
]);

#[derive(Debug, Copy, Clone, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct CompositeUniforms {
    pub ave_lum: f32,
    pub exposure: f32,
    pub white: f32,
    pub gamma: f32,
    pub bloom_enabled: u32,
    pub apply_gamma: u32,
    _pad: [u32; 2],
}

impl CompositeUniforms {
    pub fn new(ave_lum: f32, tonemap: &TonemapConfig, bloom_enabled: bool, apply_gamma: bool) -> Self {
        Self {
            ave_lum,
            exposure: tonemap.exposure,
            white: tonemap.white,
            gamma: tonemap.gamma,
            bloom_enabled: bloom_enabled as u32,
            apply_gamma: apply_gamma as u32,
            _pad: [0; 2],
        }
    }

    /// Reinhard on luminance in xyY, as in `composite.wgsl`.
    pub fn tonemap(&self, color: Vec3) -> Vec3 {
        let xyz = RGB_TO_XYZ * color;
        let sum = xyz.x + xyz.y + xyz.z;
        if sum <= 0.0 || xyz.y <= 0.0 {
            return Vec3::ZERO;
        }
        let (x, y) = (xyz.x / sum, xyz.y / sum);

        let l = self.exposure * xyz.y / self.ave_lum;
        let l = l * (1.0 + l / (self.white * self.white)) / (1.0 + l);

        XYZ_TO_RGB * Vec3::new(l * x / y, l, l * (1.0 - x - y) / y)
    }

    /// One output pixel, as in `composite.wgsl`.
    pub fn composite(&self, hdr: Vec3, bloom: Vec3) -> Vec3 {
        let mut color = self.tonemap(hdr);
        if self.bloom_enabled != 0 {
            color += bloom;
        }
        if self.apply_gamma != 0 {
            let inv = 1.0 / self.gamma;
            color = color.max(Vec3::ZERO);
            color = Vec3::new(color.x.powf(inv), color.y.powf(inv), color.z.powf(inv));
        }
        color
    }
}

/// Surfaces that encode to sRGB on write already apply the transfer curve.
pub fn is_srgb(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::Rgba8UnormSrgb | wgpu::TextureFormat::Bgra8UnormSrgb
    )
}

pub struct CompositeRenderer {
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    render_pipeline: wgpu::RenderPipeline,
}

impl CompositeRenderer {
    pub fn new(
        device: &wgpu::Device,
        samplers: &Samplers,
        frame_buffers: &FrameBuffers,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self, ShaderError> {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Composite Uniform Buffer"),
            size: size_of::<CompositeUniforms>() as _,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Composite Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            size_of::<CompositeUniforms>() as _
                        ),
                    },
                    count: None,
                },
                sampler_entry(1),
                sampler_entry(2),
                texture_entry(3),
                texture_entry(4),
            ],
        });

        let bind_group = Self::create_bind_group(
            device,
            &bind_group_layout,
            &uniform_buffer,
            samplers,
            frame_buffers,
        );

        let vertex_shader_module = shader::compile(device, shader::FULLSCREEN)?;
        let fragment_shader_module = shader::compile(device, shader::COMPOSITE)?;

        let render_pipeline = shader::link(device, "Composite Pipeline", || {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: None,
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Composite Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex_shader_module,
                    entry_point: "vs_main",
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment_shader_module,
                    entry_point: "fs_main",
                    targets: &[surface_format.into()],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            })
        })?;

        Ok(Self {
            uniform_buffer,
            bind_group_layout,
            bind_group,
            render_pipeline,
        })
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        samplers: &Samplers,
        frame_buffers: &FrameBuffers,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(
                        samplers.get(PassKind::Composite.filter(Target::Hdr)),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(
                        samplers.get(PassKind::Composite.filter(Target::PingPong(0))),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&frame_buffers.hdr.texture_view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(
                        &frame_buffers.ping_pong[0].texture_view,
                    ),
                },
            ],
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, samplers: &Samplers, frame_buffers: &FrameBuffers) {
        self.bind_group = Self::create_bind_group(
            device,
            &self.bind_group_layout,
            &self.uniform_buffer,
            samplers,
            frame_buffers,
        );
    }

    pub fn update(&self, queue: &wgpu::Queue, uniforms: &CompositeUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytes_of(uniforms));
    }

    pub fn draw<'rpass>(&'rpass self, rpass: &mut impl wgpu::util::RenderEncoder<'rpass>) {
        rpass.set_pipeline(&self.render_pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }
}
