//! Scene average luminance for exposure.
//!
//! The HDR target is resampled into a 32-bit float texture, copied into a
//! mappable buffer and read back synchronously, then reduced on the CPU to a
//! log-average.

use std::num::NonZeroU32;

use anyhow::{anyhow, Context, Result};
use glam::{const_vec3, Vec3};
use log::{debug, warn};
use pollster::FutureExt as _;

use crate::window::Size;

use super::{copy::CopyRenderPass, frame_buffers::FrameBuffers, samplers::Samplers, shader::ShaderError};

/// Rec.709 luma coefficients.
pub const REC709: Vec3 = const_vec3!([0.2126, 0.7152, 0.0722]);
/// Keeps `ln` finite for black texels.
pub const LUMINANCE_EPSILON: f32 = 1e-5;

pub fn luminance(rgb: Vec3) -> f32 {
    rgb.dot(REC709)
}

/// `exp(mean(ln(l + ε)))` over the samples whose log is finite, or `None`
/// when there are none. Negative, infinite and NaN samples drop out instead
/// of poisoning the mean.
pub fn log_average_luminance(samples: impl IntoIterator<Item = f32>) -> Option<f32> {
    let (sum, count) = samples
        .into_iter()
        .map(|l| (l + LUMINANCE_EPSILON).ln())
        .filter(|log| log.is_finite())
        .fold((0.0_f64, 0_u64), |(sum, count), log| {
            (sum + log as f64, count + 1)
        });
    if count == 0 {
        return None;
    }
    let average = (sum / count as f64).exp() as f32;
    average.is_finite().then(|| average)
}

/// Log-average over tightly packed RGBA texels; alpha is ignored.
pub fn average_luminance_rgba(texels: &[f32]) -> Option<f32> {
    log_average_luminance(
        texels
            .chunks_exact(4)
            .map(|texel| luminance(Vec3::new(texel[0], texel[1], texel[2]))),
    )
}

/// The exposure average carried from frame to frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AverageLuminance(f32);

impl Default for AverageLuminance {
    fn default() -> Self {
        Self(1.0)
    }
}

impl AverageLuminance {
    /// Folds in one frame of RGBA texels. A frame with no finite sample
    /// keeps the previous value.
    pub fn update(&mut self, texels: &[f32]) -> f32 {
        match average_luminance_rgba(texels) {
            Some(average) => {
                debug!("Average luminance: {}", average);
                self.0 = average;
            }
            None => warn!("No finite luminance sample, keeping average {}", self.0),
        }
        self.0
    }
}

const TEXEL_BYTES: u32 = 16;

fn padded_bytes_per_row(width: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let unpadded = width * TEXEL_BYTES;
    (unpadded + align - 1) / align * align
}

pub struct LuminanceReadback {
    copy: CopyRenderPass,
    staging_buffer: wgpu::Buffer,
    size: Size,
    padded_bytes_per_row: u32,
    texels: Vec<f32>,
    average: AverageLuminance,
}

impl LuminanceReadback {
    pub fn new(
        device: &wgpu::Device,
        samplers: &Samplers,
        frame_buffers: &FrameBuffers,
    ) -> Result<Self, ShaderError> {
        let copy = CopyRenderPass::new(
            device,
            "Luminance Copy Render Pipeline",
            &samplers.nearest,
            &frame_buffers.hdr.texture_view,
            frame_buffers.readback.format,
        )?;
        let size = frame_buffers.size();
        let padded_bytes_per_row = padded_bytes_per_row(size.width);

        Ok(Self {
            copy,
            staging_buffer: Self::create_staging_buffer(device, size, padded_bytes_per_row),
            size,
            padded_bytes_per_row,
            texels: Vec::new(),
            average: AverageLuminance::default(),
        })
    }

    fn create_staging_buffer(
        device: &wgpu::Device,
        size: Size,
        padded_bytes_per_row: u32,
    ) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Luminance Staging Buffer"),
            size: padded_bytes_per_row as wgpu::BufferAddress * size.height as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, samplers: &Samplers, frame_buffers: &FrameBuffers) {
        self.copy
            .use_src_texture_view(device, &samplers.nearest, &frame_buffers.hdr.texture_view);
        self.size = frame_buffers.size();
        self.padded_bytes_per_row = padded_bytes_per_row(self.size.width);
        self.staging_buffer =
            Self::create_staging_buffer(device, self.size, self.padded_bytes_per_row);
    }

    /// Records the HDR resample and the texture-to-buffer copy.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, frame_buffers: &FrameBuffers) {
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Luminance Copy Render Pass"),
                color_attachments: &[wgpu::RenderPassColorAttachment {
                    view: &frame_buffers.readback.texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: true,
                    },
                }],
                depth_stencil_attachment: None,
            });
            self.copy.draw(&mut rpass);
        }

        encoder.copy_texture_to_buffer(
            frame_buffers.readback.texture.as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &self.staging_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: NonZeroU32::new(self.padded_bytes_per_row),
                    rows_per_image: NonZeroU32::new(self.size.height),
                },
            },
            self.size.into(),
        );
    }

    /// Waits for the submitted copy, then updates the average.
    pub fn read_average(&mut self, device: &wgpu::Device) -> Result<f32> {
        let slice = self.staging_buffer.slice(..);
        let mapping = slice.map_async(wgpu::MapMode::Read);
        device.poll(wgpu::Maintain::Wait);
        mapping
            .block_on()
            .map_err(|_| anyhow!("buffer mapping was rejected"))
            .context("Failed to read back the HDR target")?;

        let row_floats = (self.size.width * 4) as usize;
        let tight_bytes = (self.size.width * TEXEL_BYTES) as usize;
        self.texels.resize(row_floats * self.size.height as usize, 0.0);
        {
            let data = slice.get_mapped_range();
            let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut self.texels);
            for (row, chunk) in dst.chunks_exact_mut(tight_bytes).enumerate() {
                let start = row * self.padded_bytes_per_row as usize;
                chunk.copy_from_slice(&data[start..start + tight_bytes]);
            }
        }
        self.staging_buffer.unmap();

        Ok(self.average.update(&self.texels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_geometric_mean() {
        let samples = [0.5_f32, 2.0, 8.0, 0.125];
        let expected = (samples
            .iter()
            .map(|l| ((l + LUMINANCE_EPSILON) as f64).ln())
            .sum::<f64>()
            / samples.len() as f64)
            .exp() as f32;
        let average = log_average_luminance(samples).unwrap();
        assert!((average - expected).abs() <= expected * 1e-6);
    }

    #[test]
    fn non_finite_samples_are_excluded() {
        let uniform = vec![0.8_f32; 64];
        let mut polluted = uniform.clone();
        polluted[17] = f32::NAN;
        polluted[40] = f32::INFINITY;
        polluted.push(-3.0);

        assert_eq!(
            log_average_luminance(polluted),
            log_average_luminance(uniform)
        );
    }

    #[test]
    fn black_frame_stays_finite() {
        let average = log_average_luminance(vec![0.0; 16]).unwrap();
        assert!((average - LUMINANCE_EPSILON).abs() < 1e-9);
    }

    #[test]
    fn nothing_finite_means_no_average() {
        assert_eq!(log_average_luminance(Vec::new()), None);
        assert_eq!(log_average_luminance([f32::NAN, f32::INFINITY]), None);
    }

    #[test]
    fn rgba_uses_rec709_and_skips_alpha() {
        let texels = [1.0, 0.0, 0.0, 123.0, 0.0, 1.0, 0.0, -5.0];
        let expected = log_average_luminance([0.2126, 0.7152]).unwrap();
        assert_eq!(average_luminance_rgba(&texels), Some(expected));
    }

    #[test]
    fn unreadable_frame_keeps_the_last_average() {
        let mut average = AverageLuminance::default();
        assert_eq!(average.0, 1.0);

        let lit = [0.5_f32, 0.5, 0.5, 1.0].repeat(8);
        let expected = average_luminance_rgba(&lit).unwrap();
        assert_eq!(average.update(&lit), expected);

        let broken = [f32::NAN, f32::NAN, f32::NAN, 1.0].repeat(8);
        assert_eq!(average.update(&broken), expected);
        assert_eq!(average.0, expected);
    }

    #[test]
    fn first_unreadable_frame_uses_unit_average() {
        let mut average = AverageLuminance::default();
        assert_eq!(average.update(&[f32::INFINITY, 0.0, 0.0, 1.0]), 1.0);
        assert_eq!(average.update(&[]), 1.0);
    }

    #[test]
    fn white_has_unit_luminance() {
        assert!((luminance(Vec3::ONE) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rows_are_padded_to_the_copy_alignment() {
        assert_eq!(padded_bytes_per_row(16), 256);
        assert_eq!(padded_bytes_per_row(17), 512);
        assert_eq!(padded_bytes_per_row(1280) % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT, 0);
    }
}
