use std::f32::consts::{PI, TAU};

use glam::Vec3;
use log::{debug, info};
use winit::event::{MouseButton, VirtualKeyCode};

use crate::{
    camera::{FlyCamera, Movement},
    config::DemoConfig,
    input::InputState,
    particles::ParticleEmitter,
    spotlight::Spotlight,
};

const ROTATION_SPEED: f32 = PI / 8.0;

/// Everything the renderer needs to draw one frame, advanced once per
/// update by the host loop.
#[derive(Debug, Clone)]
pub struct Scene {
    pub camera: FlyCamera,
    pub spotlight: Spotlight,
    pub ambient: f32,
    pub emitter: ParticleEmitter,
    pub bloom_enabled: bool,
    pub white_light: bool,
    /// Seconds since the first update; drives the particle shader.
    pub time: f32,
    /// Turntable angle in radians, kept in `[0, 2π)`.
    pub angle: f32,
    prev_time: Option<f32>,
    white_intensity: Vec3,
    tinted_intensity: Vec3,
    right_clicked_last_frame: bool,
}

impl Scene {
    pub fn new(config: &DemoConfig, aspect_ratio: f32, emitter: ParticleEmitter) -> Self {
        let camera = FlyCamera::new(&config.camera, aspect_ratio);
        let spotlight = Spotlight::new(
            camera.position.extend(1.0),
            camera.forward(),
            config.spotlight.white_intensity,
            config.spotlight.inner_cutoff,
            config.spotlight.outer_cutoff,
        );

        Self {
            camera,
            spotlight,
            ambient: config.spotlight.ambient,
            emitter,
            bloom_enabled: config.bloom.enabled,
            white_light: true,
            time: 0.0,
            angle: 0.0,
            prev_time: None,
            white_intensity: config.spotlight.white_intensity,
            tinted_intensity: config.spotlight.tinted_intensity,
            right_clicked_last_frame: false,
        }
    }

    /// Advances the scene to absolute time `t` in seconds.
    pub fn update(&mut self, t: f32, input: &InputState) {
        // No previous frame on the first update, so nothing jumps at startup.
        let dt = self.prev_time.map_or(0.0, |prev| (t - prev).max(0.0));
        self.prev_time = Some(t);
        self.time += dt;

        self.angle = (self.angle + ROTATION_SPEED * dt).rem_euclid(TAU);

        self.camera.translate(movement_from(input), dt);
        if let Some(cursor) = input.cursor() {
            self.camera.look(cursor);
        }

        if input.was_pressed(VirtualKeyCode::Key1) {
            self.white_light = !self.white_light;
            info!(
                "Spotlight tint: {}",
                if self.white_light { "white" } else { "colored" }
            );
        }
        if input.was_pressed(VirtualKeyCode::Key2) {
            self.bloom_enabled = !self.bloom_enabled;
            info!("Bloom enabled: {}", self.bloom_enabled);
        }

        self.handle_mouse_buttons(input);

        self.spotlight.set_position(self.camera.position.extend(1.0));
        self.spotlight.set_direction(self.camera.forward());
        self.spotlight.set_intensity(if self.white_light {
            self.white_intensity
        } else {
            self.tinted_intensity
        });
    }

    // Placeholders: nothing is bound to the mouse buttons yet.
    fn handle_mouse_buttons(&mut self, input: &InputState) {
        if input.was_clicked(MouseButton::Left) {
            debug!("Fire");
        }
        let right_held = input.is_button_held(MouseButton::Right);
        if right_held && !self.right_clicked_last_frame {
            debug!("Toggle");
        }
        self.right_clicked_last_frame = right_held;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.camera.aspect_ratio = aspect_ratio;
    }
}

fn movement_from(input: &InputState) -> Movement {
    Movement {
        forward: input.is_held(VirtualKeyCode::W),
        backward: input.is_held(VirtualKeyCode::S),
        left: input.is_held(VirtualKeyCode::A),
        right: input.is_held(VirtualKeyCode::D),
        up: input.is_held(VirtualKeyCode::Space),
        down: input.is_held(VirtualKeyCode::LControl),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;
    use winit::event::ElementState;

    use super::*;

    fn scene() -> Scene {
        let config = DemoConfig::default();
        let emitter = ParticleEmitter::new(&config.particles, &mut Pcg64Mcg::seed_from_u64(1));
        Scene::new(&config, 16.0 / 9.0, emitter)
    }

    #[test]
    fn first_update_has_zero_delta() {
        let mut scene = scene();
        let mut input = InputState::new();
        input.on_key(VirtualKeyCode::W, ElementState::Pressed);

        let start = scene.camera.position;
        scene.update(12.5, &input);
        assert_eq!(scene.camera.position, start);
        assert_eq!(scene.time, 0.0);

        scene.update(13.0, &input);
        assert!((scene.time - 0.5).abs() < 1e-6);
        assert!((scene.camera.position - start).length() > 0.0);
    }

    #[test]
    fn angle_wraps() {
        let mut scene = scene();
        let input = InputState::new();
        scene.update(0.0, &input);
        scene.update(17.0, &input);
        assert!(scene.angle >= 0.0 && scene.angle < TAU);
        assert!((scene.angle - (ROTATION_SPEED * 17.0 - TAU)).abs() < 1e-4);
    }

    #[test]
    fn digit_keys_toggle_once_per_press() {
        let mut scene = scene();
        let mut input = InputState::new();
        input.on_key(VirtualKeyCode::Key2, ElementState::Pressed);
        input.on_key(VirtualKeyCode::Key1, ElementState::Pressed);

        scene.update(0.0, &input);
        assert!(!scene.bloom_enabled);
        assert!(!scene.white_light);
        assert_eq!(scene.spotlight.intensity(), scene.tinted_intensity);

        input.end_frame();
        scene.update(0.1, &input);
        assert!(!scene.bloom_enabled);
        assert!(!scene.white_light);
    }

    #[test]
    fn spotlight_follows_the_camera() {
        let mut scene = scene();
        let mut input = InputState::new();
        input.on_mouse_motion((0.0, 0.0));
        scene.update(0.0, &input);
        input.on_mouse_motion((400.0, -200.0));
        scene.update(0.016, &input);

        assert_eq!(scene.spotlight.position(), scene.camera.position.extend(1.0));
        assert!((scene.spotlight.direction() - scene.camera.forward()).length() < 1e-6);
        assert!(scene.camera.pitch() > 0.0);
    }
}
