mod bloom;
mod composite;
mod copy;
mod frame_buffers;
mod luminance;
mod mesh;
mod particles;
pub mod pass;
mod render_target;
mod samplers;
mod scene_pass;
pub mod shader;
mod skybox;
mod textures;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    assets::SceneAssets,
    config::{DemoConfig, TonemapConfig},
    particles::ParticleEmitter,
    scene::Scene,
    window::{HasSize, Size},
};

pub use self::{bloom::BloomWeights, composite::CompositeUniforms, luminance::log_average_luminance};

use self::{
    bloom::BloomRenderer,
    composite::{is_srgb, CompositeRenderer},
    frame_buffers::FrameBuffers,
    luminance::LuminanceReadback,
    pass::{FrameStep, PassDescriptor, PassKind, Target, Viewport, FRAME_SCHEDULE},
    samplers::Samplers,
    scene_pass::ScenePass,
};

pub struct Renderer {
    surface: wgpu::Surface,
    surface_configuration: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
    frame_buffers: FrameBuffers,
    samplers: Samplers,
    scene_pass: ScenePass,
    luminance: LuminanceReadback,
    bloom: BloomRenderer,
    composite: CompositeRenderer,
    tonemap: TonemapConfig,
}

impl Renderer {
    pub async fn new(
        window: &winit::window::Window,
        config: &DemoConfig,
        assets: &SceneAssets,
        emitter: &ParticleEmitter,
    ) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::Backends::PRIMARY);
        let surface = unsafe { instance.create_surface(window) };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No adapter found")?;
        let adapter_info = adapter.get_info();
        info!("Using {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await
            .context("No device found")?;

        let surface_format = surface
            .get_preferred_format(&adapter)
            .context("No preferred format found")?;
        let size = window.size();
        let surface_configuration = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
        };
        surface.configure(&device, &surface_configuration);
        info!("Surface format: {:?}", surface_format);

        let frame_buffers = FrameBuffers::new(
            &device,
            Size::new(surface_configuration.width, surface_configuration.height),
            config.bloom.downsample,
        );
        let samplers = Samplers::new(&device);

        let scene_pass = ScenePass::new(&device, &queue, &samplers, assets, emitter)?;
        let luminance = LuminanceReadback::new(&device, &samplers, &frame_buffers)?;
        let bloom = BloomRenderer::new(&device, &samplers, &frame_buffers, &config.bloom)?;
        let composite = CompositeRenderer::new(&device, &samplers, &frame_buffers, surface_format)?;

        Ok(Self {
            surface,
            surface_configuration,
            device,
            queue,
            frame_buffers,
            samplers,
            scene_pass,
            luminance,
            bloom,
            composite,
            tonemap: config.tonemap.clone(),
        })
    }

    pub fn size(&self) -> Size {
        self.frame_buffers.size()
    }

    /// Rebuilds every size-dependent target. Minimized windows report a
    /// zero size and are skipped.
    pub fn resize(&mut self, size: Size) {
        if size.is_empty() || size == self.size() {
            return;
        }
        self.surface_configuration.width = size.width;
        self.surface_configuration.height = size.height;
        self.surface
            .configure(&self.device, &self.surface_configuration);

        self.frame_buffers.resize(&self.device, size);
        self.luminance
            .resize(&self.device, &self.samplers, &self.frame_buffers);
        self.bloom
            .resize(&self.device, &self.samplers, &self.frame_buffers);
        self.composite
            .resize(&self.device, &self.samplers, &self.frame_buffers);
        info!(
            "Resized to {}x{}, bloom {}x{}",
            size.width,
            size.height,
            self.frame_buffers.bloom_size().width,
            self.frame_buffers.bloom_size().height
        );
    }

    pub fn render(&mut self, scene: &Scene) -> Result<()> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(surface_texture) => surface_texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface
                    .configure(&self.device, &self.surface_configuration);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Timed out waiting for the next surface texture");
                return Ok(());
            }
            Err(e) => return Err(e).context("Failed to get next surface texture"),
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.scene_pass.update(&self.queue, scene);
        self.bloom.update(&self.queue, &self.frame_buffers);

        let mut encoder = self.create_command_encoder("Frame Command Encoder");
        for step in &FRAME_SCHEDULE {
            match step {
                FrameStep::Pass(pass) => self.encode_pass(&mut encoder, pass, &surface_view)?,
                FrameStep::ComputeLuminance => {
                    self.luminance.encode(&mut encoder, &self.frame_buffers);
                    let encoder = std::mem::replace(
                        &mut encoder,
                        self.create_command_encoder("Post Processing Command Encoder"),
                    );
                    self.queue.submit(Some(encoder.finish()));

                    let ave_lum = self.luminance.read_average(&self.device)?;
                    let uniforms = CompositeUniforms::new(
                        ave_lum,
                        &self.tonemap,
                        scene.bloom_enabled,
                        !is_srgb(self.surface_configuration.format),
                    );
                    self.composite.update(&self.queue, &uniforms);
                }
            }
        }
        self.queue.submit(Some(encoder.finish()));

        surface_texture.present();
        Ok(())
    }

    fn create_command_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pass: &PassDescriptor,
        surface_view: &wgpu::TextureView,
    ) -> Result<()> {
        let view = match pass.target {
            Target::Surface => surface_view,
            target => {
                &self
                    .frame_buffers
                    .get(target)
                    .with_context(|| format!("No render target for {:?}", target))?
                    .texture_view
            }
        };
        let depth_stencil_attachment =
            pass.depth
                .then(|| wgpu::RenderPassDepthStencilAttachment {
                    view: &self.frame_buffers.depth.texture_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: false,
                    }),
                    stencil_ops: None,
                });

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.label),
            color_attachments: &[wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: pass.clear[0],
                        g: pass.clear[1],
                        b: pass.clear[2],
                        a: pass.clear[3],
                    }),
                    store: true,
                },
            }],
            depth_stencil_attachment,
        });

        let viewport = match pass.viewport {
            Viewport::Full => self.frame_buffers.size(),
            Viewport::Bloom => self.frame_buffers.bloom_size(),
        };
        rpass.set_viewport(
            0.0,
            0.0,
            viewport.width as f32,
            viewport.height as f32,
            0.0,
            1.0,
        );

        match pass.kind {
            PassKind::Scene => self.scene_pass.draw(&mut rpass),
            PassKind::BrightPassHorizontalBlur => self.bloom.draw_bright_horizontal(&mut rpass),
            PassKind::VerticalBlur => self.bloom.draw_vertical(&mut rpass),
            PassKind::Copy => self.bloom.draw_copy(&mut rpass),
            PassKind::Composite => self.composite.draw(&mut rpass),
        }
        Ok(())
    }
}
