use std::mem::size_of;

use bytemuck::{bytes_of, cast_slice, Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::assets::{MaterialImages, MeshData, Vertex};

use super::{
    frame_buffers::FrameBuffers,
    samplers::Samplers,
    shader::{self, ShaderError},
    textures::Material,
};

#[derive(Debug, Copy, Clone, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct ObjectUniforms {
    pub model_view: Mat4,
    pub normal_matrix: Mat4,
}

impl ObjectUniforms {
    pub fn new(view: Mat4, model: Mat4) -> Self {
        let model_view = view * model;
        Self {
            model_view,
            normal_matrix: model_view.inverse().transpose(),
        }
    }
}

/// One drawable: geometry, transform, material.
pub struct MeshObject {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    material: Material,
    model: Mat4,
}

impl MeshObject {
    pub fn update(&self, queue: &wgpu::Queue, view: Mat4) {
        let uniforms = ObjectUniforms::new(view, self.model);
        queue.write_buffer(&self.uniform_buffer, 0, bytes_of(&uniforms));
    }
}

/// Physically based shading of textured meshes under the spotlight.
pub struct MeshRenderer {
    render_pipeline: wgpu::RenderPipeline,
    object_bind_group_layout: wgpu::BindGroupLayout,
    material_bind_group_layout: wgpu::BindGroupLayout,
}

impl MeshRenderer {
    pub fn new(
        device: &wgpu::Device,
        frame_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Result<Self, ShaderError> {
        let object_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Object Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(size_of::<ObjectUniforms>() as _),
                    },
                    count: None,
                }],
            });
        let material_bind_group_layout = Material::bind_group_layout(device);

        let shader_module = shader::compile(device, shader::PBR)?;

        let render_pipeline = shader::link(device, "PBR Pipeline", || {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: None,
                bind_group_layouts: &[
                    frame_bind_group_layout,
                    &object_bind_group_layout,
                    &material_bind_group_layout,
                ],
                push_constant_ranges: &[],
            });

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("PBR Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader_module,
                    entry_point: "vs_main",
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: size_of::<Vertex>() as _,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x3,
                            1 => Float32x3,
                            2 => Float32x2
                        ],
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader_module,
                    entry_point: "fs_main",
                    targets: &[FrameBuffers::COLOR_FORMAT.into()],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: FrameBuffers::DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            })
        })?;

        Ok(Self {
            render_pipeline,
            object_bind_group_layout,
            material_bind_group_layout,
        })
    }

    pub fn create_object(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        samplers: &Samplers,
        label: &str,
        mesh: &MeshData,
        model: Mat4,
        material: &MaterialImages,
    ) -> MeshObject {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", label)),
            contents: cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", label)),
            contents: cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} Uniform Buffer", label)),
            size: size_of::<ObjectUniforms>() as _,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.object_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let material = Material::new(
            device,
            queue,
            &self.material_bind_group_layout,
            samplers,
            label,
            material,
        );

        MeshObject {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            uniform_buffer,
            bind_group,
            material,
            model,
        }
    }

    pub fn draw<'rpass>(
        &'rpass self,
        rpass: &mut impl wgpu::util::RenderEncoder<'rpass>,
        frame_bind_group: &'rpass wgpu::BindGroup,
        object: &'rpass MeshObject,
    ) {
        rpass.set_pipeline(&self.render_pipeline);
        rpass.set_bind_group(0, frame_bind_group, &[]);
        rpass.set_bind_group(1, &object.bind_group, &[]);
        rpass.set_bind_group(2, &object.material.bind_group, &[]);
        rpass.set_vertex_buffer(0, object.vertex_buffer.slice(..));
        rpass.set_index_buffer(object.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..object.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use glam::{vec3, Vec3};

    use super::*;

    #[test]
    fn normals_stay_perpendicular_under_non_uniform_scale() {
        let model = Mat4::from_scale(vec3(4.0, 1.0, 1.0));
        let uniforms = ObjectUniforms::new(Mat4::IDENTITY, model);

        // A slanted surface and its normal.
        let tangent = vec3(1.0, -1.0, 0.0);
        let normal = vec3(1.0, 1.0, 0.0);
        let t = uniforms.model_view.transform_vector3(tangent);
        let n = uniforms.normal_matrix.transform_vector3(normal);
        assert!(t.dot(n).abs() < 1e-5);
    }

    #[test]
    fn model_view_applies_model_first() {
        let view = Mat4::from_translation(vec3(0.0, 0.0, -10.0));
        let model = Mat4::from_translation(Vec3::X);
        let uniforms = ObjectUniforms::new(view, model);
        let p = uniforms.model_view.transform_point3(Vec3::ZERO);
        assert_eq!(p, vec3(1.0, 0.0, -10.0));
    }

    #[test]
    fn vertex_layout_matches_the_shader() {
        assert_eq!(size_of::<Vertex>(), 32);
    }
}
