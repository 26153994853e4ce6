use glam::{DVec2, Mat4, Vec2, Vec3};

use crate::config::CameraConfig;

/// Pitch stays inside this many degrees of the horizon so the forward vector
/// never lines up with `up`.
pub const PITCH_LIMIT: f32 = 89.0;

/// Directions requested for one update. Opposing directions cancel out.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Movement {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

/// First-person free-fly camera. Yaw and pitch are in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct FlyCamera {
    pub position: Vec3,
    forward: Vec3,
    pub up: Vec3,
    yaw: f32,
    pitch: f32,
    pub speed: f32,
    pub sensitivity: f32,
    last_cursor: Option<DVec2>,
    pub fov_y: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl FlyCamera {
    pub fn new(config: &CameraConfig, aspect_ratio: f32) -> Self {
        let mut camera = Self {
            position: config.position,
            forward: -Vec3::Z,
            up: Vec3::Y,
            yaw: config.yaw,
            pitch: config.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            speed: config.speed,
            sensitivity: config.sensitivity,
            last_cursor: None,
            fov_y: config.fov_y,
            aspect_ratio,
            near: config.near,
            far: config.far,
        };
        camera.update_forward();
        camera
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Moves along the requested directions at `speed` units per second.
    pub fn translate(&mut self, movement: Movement, dt: f32) {
        let right = self.forward.cross(self.up).normalize();
        let mut strafe = Vec3::ZERO;
        if movement.forward {
            strafe += self.forward;
        }
        if movement.backward {
            strafe -= self.forward;
        }
        if movement.right {
            strafe += right;
        }
        if movement.left {
            strafe -= right;
        }
        if movement.up {
            strafe += self.up;
        }
        if movement.down {
            strafe -= self.up;
        }
        self.position += strafe.normalize_or_zero() * self.speed * dt;
    }

    /// Turns towards the cursor. The first sample only records the position
    /// so a cursor entering the window does not snap the view.
    pub fn look(&mut self, cursor: DVec2) {
        let last = self.last_cursor.replace(cursor).unwrap_or(cursor);
        // Screen y grows downwards, pitch grows upwards. Differences stay f64.
        let (dx, dy) = (cursor.x - last.x, last.y - cursor.y);
        let offset = Vec2::new(dx as f32, dy as f32) * self.sensitivity;
        self.rotate(offset.x, offset.y);
    }

    pub fn rotate(&mut self, yaw_degrees: f32, pitch_degrees: f32) {
        self.yaw += yaw_degrees;
        self.pitch = (self.pitch + pitch_degrees).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_forward();
    }

    fn update_forward(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.forward = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward, self.up)
    }

    /// View matrix without translation, so the sky box stays at infinity.
    pub fn sky_view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(Vec3::ZERO, self.forward, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y.to_radians(), self.aspect_ratio, self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;

    fn camera() -> FlyCamera {
        FlyCamera::new(&CameraConfig::default(), 16.0 / 9.0)
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = camera();
        assert!((camera.forward() - -Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn pitch_is_clamped_for_any_input() {
        let mut camera = camera();
        for i in 0..1000 {
            camera.look(DVec2::new(0.0, -1e7 * i as f64));
        }
        assert_eq!(camera.pitch(), PITCH_LIMIT);

        camera.rotate(0.0, -1e9);
        assert_eq!(camera.pitch(), -PITCH_LIMIT);
        assert!((camera.forward().length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn first_cursor_sample_does_not_turn() {
        let mut camera = camera();
        camera.look(DVec2::new(640.0, 360.0));
        assert_eq!(camera.yaw(), -90.0);
        assert_eq!(camera.pitch(), 0.0);

        camera.look(DVec2::new(680.0, 320.0));
        assert!((camera.yaw() - (-90.0 + 40.0 * 0.025)).abs() < 1e-5);
        assert!((camera.pitch() - 40.0 * 0.025).abs() < 1e-5);
    }

    #[test]
    fn small_moves_far_from_the_origin_still_turn() {
        let mut camera = camera();
        camera.look(DVec2::new(1e9, -1e9));
        camera.look(DVec2::new(1e9 + 1.0, -1e9));
        assert!((camera.yaw() - (-90.0 + 0.025)).abs() < 1e-5);
        assert_eq!(camera.pitch(), 0.0);
    }

    #[test]
    fn diagonal_movement_is_not_faster() {
        let mut straight = camera();
        straight.translate(
            Movement {
                forward: true,
                ..Default::default()
            },
            1.0,
        );

        let mut diagonal = camera();
        diagonal.translate(
            Movement {
                forward: true,
                right: true,
                up: true,
                ..Default::default()
            },
            1.0,
        );

        let start = CameraConfig::default().position;
        let a = (straight.position - start).length();
        let b = (diagonal.position - start).length();
        assert!((a - 5.0).abs() < 1e-5);
        assert!((a - b).abs() < 1e-5);
    }

    #[test]
    fn opposing_keys_cancel() {
        let mut camera = camera();
        let start = camera.position;
        camera.translate(
            Movement {
                left: true,
                right: true,
                ..Default::default()
            },
            1.0,
        );
        assert_eq!(camera.position, start);
    }

    #[test]
    fn strafe_right_is_positive_x_when_facing_negative_z() {
        let mut camera = camera();
        camera.translate(
            Movement {
                right: true,
                ..Default::default()
            },
            0.5,
        );
        assert!((camera.position - vec3(2.5, 0.0, 10.0)).length() < 1e-5);
    }

    #[test]
    fn sky_view_ignores_translation() {
        let mut camera = camera();
        let before = camera.sky_view_matrix();
        camera.position = vec3(100.0, -3.0, 42.0);
        assert_eq!(camera.sky_view_matrix(), before);
    }
}
