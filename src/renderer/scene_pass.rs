use std::mem::size_of;

use bytemuck::{bytes_of, Pod, Zeroable};
use glam::{Mat4, Vec4};

use crate::{assets::SceneAssets, particles::ParticleEmitter, scene::Scene, spotlight::Spotlight};

use super::{
    mesh::{MeshObject, MeshRenderer},
    particles::ParticleRenderer,
    samplers::Samplers,
    shader::ShaderError,
    skybox::SkyboxRenderer,
};

/// Camera and spotlight, shared by every shaded mesh in the frame.
#[derive(Debug, Copy, Clone, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub light_position: Vec4,
    pub light_direction: Vec4,
    pub light_intensity: Vec4,
    pub light_cone: Vec4,
}

impl FrameUniforms {
    /// Moves the light into view space, where the mesh shader lights.
    pub fn new(view: Mat4, projection: Mat4, light: &Spotlight, ambient: f32) -> Self {
        let direction = view.transform_vector3(light.direction()).normalize_or_zero();
        Self {
            view,
            projection,
            light_position: view * light.position(),
            light_direction: direction.extend(0.0),
            light_intensity: light.intensity().extend(ambient),
            light_cone: Vec4::new(
                light.inner_cutoff().cos(),
                light.outer_cutoff().cos(),
                0.0,
                0.0,
            ),
        }
    }
}

/// Draws the sky, the ground, the particles and the gun into the HDR target.
pub struct ScenePass {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    skybox: SkyboxRenderer,
    meshes: MeshRenderer,
    ground: MeshObject,
    gun: MeshObject,
    particles: ParticleRenderer,
}

impl ScenePass {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        samplers: &Samplers,
        assets: &SceneAssets,
        emitter: &ParticleEmitter,
    ) -> Result<Self, ShaderError> {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: size_of::<FrameUniforms>() as _,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(size_of::<FrameUniforms>() as _),
                },
                count: None,
            }],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let skybox = SkyboxRenderer::new(device, queue, samplers, &assets.sky)?;
        let meshes = MeshRenderer::new(device, &bind_group_layout)?;
        let ground = meshes.create_object(
            device,
            queue,
            samplers,
            "Ground",
            &assets.ground,
            assets.ground_transform,
            &assets.ground_material,
        );
        let gun = meshes.create_object(
            device,
            queue,
            samplers,
            "Gun",
            &assets.gun,
            assets.gun_transform,
            &assets.gun_material,
        );
        let particles = ParticleRenderer::new(device, emitter)?;

        Ok(Self {
            uniform_buffer,
            bind_group,
            skybox,
            meshes,
            ground,
            gun,
            particles,
        })
    }

    pub fn update(&self, queue: &wgpu::Queue, scene: &Scene) {
        let view = scene.camera.view_matrix();
        let projection = scene.camera.projection_matrix();

        let uniforms = FrameUniforms::new(view, projection, &scene.spotlight, scene.ambient);
        queue.write_buffer(&self.uniform_buffer, 0, bytes_of(&uniforms));

        self.ground.update(queue, view);
        self.gun.update(queue, view);
        self.skybox.update(queue, &scene.camera);
        self.particles
            .update(queue, view, projection, &scene.emitter, scene.time);
    }

    pub fn draw<'rpass>(&'rpass self, rpass: &mut wgpu::RenderPass<'rpass>) {
        self.skybox.draw(rpass);
        self.meshes.draw(rpass, &self.bind_group, &self.ground);
        self.particles.draw(rpass);
        self.meshes.draw(rpass, &self.bind_group, &self.gun);
    }
}

#[cfg(test)]
mod tests {
    use glam::{vec3, Vec3};

    use super::*;

    fn light() -> Spotlight {
        Spotlight::new(
            vec3(0.0, 0.0, 10.0).extend(1.0),
            -Vec3::Z,
            vec3(1.0, 0.45, 0.15),
            12.5,
            17.5,
        )
    }

    #[test]
    fn flashlight_sits_at_the_view_origin() {
        let light = light();
        let view = Mat4::look_at_rh(vec3(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let uniforms = FrameUniforms::new(view, Mat4::IDENTITY, &light, 0.2);

        assert!(uniforms.light_position.truncate().length() < 1e-5);
        assert_eq!(uniforms.light_position.w, 1.0);
        assert!((uniforms.light_direction - Vec4::new(0.0, 0.0, -1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn cone_is_stored_as_cosines() {
        let uniforms = FrameUniforms::new(Mat4::IDENTITY, Mat4::IDENTITY, &light(), 0.2);
        assert!((uniforms.light_cone.x - 12.5_f32.to_radians().cos()).abs() < 1e-6);
        assert!((uniforms.light_cone.y - 17.5_f32.to_radians().cos()).abs() < 1e-6);
        assert!(uniforms.light_cone.x > uniforms.light_cone.y);
    }

    #[test]
    fn ambient_rides_in_the_intensity_w() {
        let uniforms = FrameUniforms::new(Mat4::IDENTITY, Mat4::IDENTITY, &light(), 0.2);
        assert_eq!(uniforms.light_intensity, Vec4::new(1.0, 0.45, 0.15, 0.2));
    }

    #[test]
    fn uniforms_match_the_shader_layout() {
        assert_eq!(size_of::<FrameUniforms>(), 2 * 64 + 4 * 16);
    }
}
