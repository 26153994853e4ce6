use std::{f32::consts::PI, mem::size_of};

use bytemuck::{bytes_of, Pod, Zeroable};
use glam::{vec2, Vec2};

use crate::config::BloomConfig;

use super::{
    copy::CopyRenderPass,
    frame_buffers::FrameBuffers,
    pass::{PassKind, Target},
    samplers::Samplers,
    shader::{self, ShaderError},
};

pub const BLOOM_TAPS: usize = 10;

/// Unnormalized 1-D Gaussian.
pub fn gauss(x: f32, variance: f32) -> f32 {
    (-(x * x) / (2.0 * variance)).exp() / (2.0 * PI * variance)
}

/// One side of a symmetric blur kernel; index 0 is the center tap. The full
/// kernel `w[9] .. w[1] w[0] w[1] .. w[9]` sums to one.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BloomWeights([f32; BLOOM_TAPS]);

impl BloomWeights {
    pub fn new(variance: f32) -> Self {
        // A zero or NaN variance would divide by zero.
        let variance = variance.max(f32::MIN_POSITIVE);
        let mut weights = [0.0; BLOOM_TAPS];
        for (i, weight) in weights.iter_mut().enumerate() {
            *weight = gauss(i as f32, variance);
        }
        let sum = weights[0] + 2.0 * weights[1..].iter().sum::<f32>();
        for weight in &mut weights {
            *weight /= sum;
        }
        Self(weights)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Center tap plus both mirrored sides.
    pub fn kernel_sum(&self) -> f32 {
        self.0[0] + 2.0 * self.0[1..].iter().sum::<f32>()
    }

    fn packed(&self) -> [[f32; 4]; 3] {
        let mut packed = [[0.0; 4]; 3];
        for (i, weight) in self.0.iter().enumerate() {
            packed[i / 4][i % 4] = *weight;
        }
        packed
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
struct BlurUniforms {
    weights: [[f32; 4]; 3],
    texel_size: Vec2,
    threshold: f32,
    taps: u32,
}

impl BlurUniforms {
    fn new(weights: &BloomWeights, threshold: f32, frame_buffers: &FrameBuffers) -> Self {
        let size = frame_buffers.bloom_size();
        Self {
            weights: weights.packed(),
            texel_size: vec2(1.0 / size.width as f32, 1.0 / size.height as f32),
            threshold,
            taps: BLOOM_TAPS as u32,
        }
    }
}

/// Bright-pass and separable blur into the ping-pong pair, then the copy
/// back into the first buffer for the composite.
pub struct BloomRenderer {
    weights: BloomWeights,
    threshold: f32,
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    horizontal_bind_group: wgpu::BindGroup,
    vertical_bind_group: wgpu::BindGroup,
    bright_horizontal_pipeline: wgpu::RenderPipeline,
    vertical_pipeline: wgpu::RenderPipeline,
    copy: CopyRenderPass,
}

impl BloomRenderer {
    pub fn new(
        device: &wgpu::Device,
        samplers: &Samplers,
        frame_buffers: &FrameBuffers,
        config: &BloomConfig,
    ) -> Result<Self, ShaderError> {
        let weights = BloomWeights::new(config.variance);
        log::info!("Bloom weights: {:?}", weights.as_slice());

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Blur Uniform Buffer"),
            size: size_of::<BlurUniforms>() as _,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blur Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(size_of::<BlurUniforms>() as _),
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
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let vertex_shader_module = shader::compile(device, shader::FULLSCREEN)?;
        let fragment_shader_module = shader::compile(device, shader::BLOOM)?;

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let make_pipeline = |label: &'static str, entry_point: &'static str| {
            shader::link(device, label, || {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(label),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &vertex_shader_module,
                        entry_point: "vs_main",
                        buffers: &[],
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &fragment_shader_module,
                        entry_point,
                        targets: &[FrameBuffers::BLOOM_FORMAT.into()],
                    }),
                    primitive: wgpu::PrimitiveState::default(),
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                })
            })
        };
        let bright_horizontal_pipeline =
            make_pipeline("Bright Pass Horizontal Blur Pipeline", "fs_bright_horizontal")?;
        let vertical_pipeline = make_pipeline("Vertical Blur Pipeline", "fs_vertical")?;

        let copy = CopyRenderPass::new(
            device,
            "Bloom Copy Render Pipeline",
            samplers.get(PassKind::Copy.filter(Target::PingPong(1))),
            &frame_buffers.ping_pong[1].texture_view,
            FrameBuffers::BLOOM_FORMAT,
        )?;

        let (horizontal_bind_group, vertical_bind_group) = Self::create_bind_groups(
            device,
            &bind_group_layout,
            &uniform_buffer,
            samplers,
            frame_buffers,
        );

        Ok(Self {
            weights,
            threshold: config.threshold,
            uniform_buffer,
            bind_group_layout,
            horizontal_bind_group,
            vertical_bind_group,
            bright_horizontal_pipeline,
            vertical_pipeline,
            copy,
        })
    }

    fn create_bind_groups(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        samplers: &Samplers,
        frame_buffers: &FrameBuffers,
    ) -> (wgpu::BindGroup, wgpu::BindGroup) {
        let create = |label, kind: PassKind, source: Target, src: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(samplers.get(kind.filter(source))),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(src),
                    },
                ],
            })
        };
        (
            create(
                "Bright Pass Bind Group",
                PassKind::BrightPassHorizontalBlur,
                Target::Hdr,
                &frame_buffers.hdr.texture_view,
            ),
            create(
                "Vertical Blur Bind Group",
                PassKind::VerticalBlur,
                Target::PingPong(0),
                &frame_buffers.ping_pong[0].texture_view,
            ),
        )
    }

    pub fn resize(&mut self, device: &wgpu::Device, samplers: &Samplers, frame_buffers: &FrameBuffers) {
        let (horizontal, vertical) = Self::create_bind_groups(
            device,
            &self.bind_group_layout,
            &self.uniform_buffer,
            samplers,
            frame_buffers,
        );
        self.horizontal_bind_group = horizontal;
        self.vertical_bind_group = vertical;
        self.copy.use_src_texture_view(
            device,
            samplers.get(PassKind::Copy.filter(Target::PingPong(1))),
            &frame_buffers.ping_pong[1].texture_view,
        );
    }

    pub fn update(&self, queue: &wgpu::Queue, frame_buffers: &FrameBuffers) {
        let uniforms = BlurUniforms::new(&self.weights, self.threshold, frame_buffers);
        queue.write_buffer(&self.uniform_buffer, 0, bytes_of(&uniforms));
    }

    pub fn draw_bright_horizontal<'rpass>(
        &'rpass self,
        rpass: &mut impl wgpu::util::RenderEncoder<'rpass>,
    ) {
        rpass.set_pipeline(&self.bright_horizontal_pipeline);
        rpass.set_bind_group(0, &self.horizontal_bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }

    pub fn draw_vertical<'rpass>(&'rpass self, rpass: &mut impl wgpu::util::RenderEncoder<'rpass>) {
        rpass.set_pipeline(&self.vertical_pipeline);
        rpass.set_bind_group(0, &self.vertical_bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }

    pub fn draw_copy<'rpass>(&'rpass self, rpass: &mut impl wgpu::util::RenderEncoder<'rpass>) {
        self.copy.draw(rpass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_sums_to_one_for_any_variance() {
        for variance in [0.0, 1e-3, 0.5, 1.0, 4.0, 25.0, 100.0, 1e4, 1e8] {
            let weights = BloomWeights::new(variance);
            assert!(
                (weights.kernel_sum() - 1.0).abs() < 1e-5,
                "variance {} sums to {}",
                variance,
                weights.kernel_sum()
            );
        }
    }

    #[test]
    fn weights_fall_off_from_the_center() {
        let weights = BloomWeights::new(25.0);
        for pair in weights.as_slice().windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }

    #[test]
    fn gauss_matches_the_closed_form() {
        let expected = (-4.0_f32 / 50.0).exp() / (50.0 * PI);
        assert!((gauss(2.0, 25.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn tiny_variance_collapses_to_the_center_tap() {
        let weights = BloomWeights::new(0.0);
        assert_eq!(weights.as_slice()[0], 1.0);
        assert!(weights.as_slice()[1..].iter().all(|w| *w == 0.0));
    }

    #[test]
    fn packing_keeps_tap_order() {
        let weights = BloomWeights::new(25.0);
        let packed = weights.packed();
        assert_eq!(packed[0][0], weights.as_slice()[0]);
        assert_eq!(packed[2][1], weights.as_slice()[9]);
        assert_eq!(packed[2][2], 0.0);
    }

    #[test]
    fn uniforms_fill_a_16_byte_multiple() {
        assert_eq!(size_of::<BlurUniforms>() % 16, 0);
    }
}
