use std::num::NonZeroU32;

use crate::assets::{ImageData, MaterialImages};

use super::samplers::Samplers;

pub struct Texture {
    pub texture: wgpu::Texture,
    pub texture_view: wgpu::TextureView,
}

impl Texture {
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        image: &ImageData,
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: image.width,
                height: image.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        });
        write_layer(queue, &texture, image, 0);
        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            texture_view,
        }
    }

    /// Six square faces in +X, -X, +Y, -Y, +Z, -Z order.
    pub fn cube_from_images(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        faces: &[ImageData; 6],
    ) -> Self {
        let size = faces[0].width;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        });
        for (layer, face) in faces.iter().enumerate() {
            write_layer(queue, &texture, face, layer as u32);
        }
        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        Self {
            texture,
            texture_view,
        }
    }
}

fn write_layer(queue: &wgpu::Queue, texture: &wgpu::Texture, image: &ImageData, layer: u32) {
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
            aspect: wgpu::TextureAspect::All,
        },
        &image.pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: NonZeroU32::new(4 * image.width),
            rows_per_image: NonZeroU32::new(image.height),
        },
        wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        },
    );
}

/// GPU side of [`MaterialImages`]: five textures and a sampler in one
/// bind group.
pub struct Material {
    _textures: Vec<Texture>,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        samplers: &Samplers,
        label: &str,
        images: &MaterialImages,
    ) -> Self {
        let textures = vec![
            Texture::from_image(
                device,
                queue,
                &format!("{} Albedo", label),
                &images.albedo,
                wgpu::TextureFormat::Rgba8UnormSrgb,
            ),
            Texture::from_image(
                device,
                queue,
                &format!("{} Normal", label),
                &images.normal,
                wgpu::TextureFormat::Rgba8Unorm,
            ),
            Texture::from_image(
                device,
                queue,
                &format!("{} Metallic", label),
                &images.metallic,
                wgpu::TextureFormat::Rgba8Unorm,
            ),
            Texture::from_image(
                device,
                queue,
                &format!("{} Roughness", label),
                &images.roughness,
                wgpu::TextureFormat::Rgba8Unorm,
            ),
            Texture::from_image(
                device,
                queue,
                &format!("{} Ambient Occlusion", label),
                &images.ambient_occlusion,
                wgpu::TextureFormat::Rgba8Unorm,
            ),
        ];

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Sampler(&samplers.material),
        }];
        entries.extend(textures.iter().enumerate().map(|(i, texture)| {
            wgpu::BindGroupEntry {
                binding: i as u32 + 1,
                resource: wgpu::BindingResource::TextureView(&texture.texture_view),
            }
        }));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &entries,
        });

        Self {
            _textures: textures,
            bind_group,
        }
    }

    pub fn bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
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

        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
                texture_entry(4),
                texture_entry(5),
            ],
        })
    }
}
