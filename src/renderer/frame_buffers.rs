use crate::window::Size;

use super::{
    pass::Target,
    render_target::{
        RenderTarget, DEPTH_TEXTURE_FORMAT, HDR_TEXTURE_FORMAT, READBACK_TEXTURE_FORMAT,
    },
};

/// Offscreen targets for one frame. Everything but the surface lives here
/// and is rebuilt together on resize.
pub struct FrameBuffers {
    pub hdr: RenderTarget,
    pub depth: RenderTarget,
    pub readback: RenderTarget,
    pub ping_pong: [RenderTarget; 2],
    downsample: u32,
}

impl FrameBuffers {
    pub const COLOR_FORMAT: wgpu::TextureFormat = HDR_TEXTURE_FORMAT;
    pub const DEPTH_FORMAT: wgpu::TextureFormat = DEPTH_TEXTURE_FORMAT;
    pub const BLOOM_FORMAT: wgpu::TextureFormat = HDR_TEXTURE_FORMAT;

    pub fn new(device: &wgpu::Device, size: Size, downsample: u32) -> Self {
        let bloom_size = size.scaled_down(downsample);
        Self {
            hdr: RenderTarget::new(device, "HDR Color Texture", Self::COLOR_FORMAT, size),
            depth: RenderTarget::with_usage(
                device,
                "Depth Texture",
                Self::DEPTH_FORMAT,
                size,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            ),
            readback: RenderTarget::with_usage(
                device,
                "Luminance Readback Texture",
                READBACK_TEXTURE_FORMAT,
                size,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            ),
            ping_pong: [
                RenderTarget::new(device, "Bloom Ping Texture", Self::BLOOM_FORMAT, bloom_size),
                RenderTarget::new(device, "Bloom Pong Texture", Self::BLOOM_FORMAT, bloom_size),
            ],
            downsample,
        }
    }

    pub fn size(&self) -> Size {
        self.hdr.size
    }

    pub fn bloom_size(&self) -> Size {
        self.ping_pong[0].size
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: Size) {
        *self = Self::new(device, size, self.downsample);
    }

    /// Offscreen target behind a schedule slot. The surface is acquired per
    /// frame and is not owned here.
    pub fn get(&self, target: Target) -> Option<&RenderTarget> {
        match target {
            Target::Hdr => Some(&self.hdr),
            Target::PingPong(i) => self.ping_pong.get(i),
            Target::Surface => None,
        }
    }
}
