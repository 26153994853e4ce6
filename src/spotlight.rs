use glam::{Mat4, Vec3, Vec4};
use log::warn;

/// A single cone light. Cutoff angles are taken in degrees and stored in
/// radians; the inner cone is lit at full intensity and the light fades to
/// zero at the outer cone. Nothing enforces `inner <= outer`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Spotlight {
    position: Vec4,
    direction: Vec3,
    intensity: Vec3,
    inner_cutoff: f32,
    outer_cutoff: f32,
}

impl Default for Spotlight {
    fn default() -> Self {
        Self {
            position: Vec4::W,
            direction: Vec3::Z,
            intensity: Vec3::ONE,
            inner_cutoff: 0.98,
            outer_cutoff: 0.96,
        }
    }
}

impl Spotlight {
    const SHADOW_FOV_Y_DEGREES: f32 = 50.0;
    const SHADOW_NEAR: f32 = 1.0;
    const SHADOW_FAR: f32 = 25.0;

    pub fn new(
        position: Vec4,
        direction: Vec3,
        intensity: Vec3,
        inner_degrees: f32,
        outer_degrees: f32,
    ) -> Self {
        let mut light = Self {
            position,
            intensity,
            ..Default::default()
        };
        light.set_direction(direction);
        light.set_inner_cutoff(inner_degrees);
        light.set_outer_cutoff(outer_degrees);
        light
    }

    pub fn position(&self) -> Vec4 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec4) {
        self.position = position;
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Stores the normalized direction. A zero vector has no direction and
    /// leaves the previous one in place.
    pub fn set_direction(&mut self, direction: Vec3) {
        match direction.try_normalize() {
            Some(direction) => self.direction = direction,
            None => warn!("Ignoring degenerate spotlight direction {:?}", direction),
        }
    }

    pub fn intensity(&self) -> Vec3 {
        self.intensity
    }

    pub fn set_intensity(&mut self, intensity: Vec3) {
        self.intensity = intensity;
    }

    /// Inner cone half-angle in radians.
    pub fn inner_cutoff(&self) -> f32 {
        self.inner_cutoff
    }

    pub fn set_inner_cutoff(&mut self, degrees: f32) {
        self.inner_cutoff = degrees.to_radians();
    }

    /// Outer cone half-angle in radians.
    pub fn outer_cutoff(&self) -> f32 {
        self.outer_cutoff
    }

    pub fn set_outer_cutoff(&mut self, degrees: f32) {
        self.outer_cutoff = degrees.to_radians();
    }

    /// View from the light looking along its direction.
    pub fn view_matrix(&self) -> Mat4 {
        let eye = self.position.truncate();
        Mat4::look_at_rh(eye, eye + self.direction, Vec3::Y)
    }

    /// Perspective frustum for a shadow map rendered from the light.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            Self::SHADOW_FOV_Y_DEGREES.to_radians(),
            1.0,
            Self::SHADOW_NEAR,
            Self::SHADOW_FAR,
        )
    }
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;

    #[test]
    fn direction_is_unit_after_every_set() {
        let mut light = Spotlight::default();
        for dir in [
            vec3(10.0, 0.0, 0.0),
            vec3(0.001, -0.002, 0.0005),
            vec3(-3.0, 4.0, 12.0),
            vec3(1e6, 1e6, -1e6),
        ] {
            light.set_direction(dir);
            assert!((light.direction().length() - 1.0).abs() < 1e-5, "{:?}", dir);
            assert!(light.direction().dot(dir) > 0.0);
        }
    }

    #[test]
    fn zero_direction_keeps_previous() {
        let mut light = Spotlight::default();
        light.set_direction(vec3(0.0, -2.0, 0.0));
        light.set_direction(Vec3::ZERO);
        assert_eq!(light.direction(), vec3(0.0, -1.0, 0.0));
    }

    #[test]
    fn cutoffs_are_stored_in_radians() {
        let light = Spotlight::new(Vec4::W, Vec3::Z, Vec3::ONE, 15.0, 30.0);
        assert!((light.inner_cutoff() - 15f32.to_radians()).abs() < 1e-6);
        assert!((light.outer_cutoff() - std::f32::consts::FRAC_PI_6).abs() < 1e-6);
    }

    #[test]
    fn inverted_cutoffs_are_accepted() {
        let light = Spotlight::new(Vec4::W, Vec3::Z, Vec3::ONE, 40.0, 10.0);
        assert!(light.inner_cutoff() > light.outer_cutoff());
    }

    #[test]
    fn view_matrix_looks_along_direction() {
        let mut light = Spotlight::default();
        light.set_position(vec3(0.0, 5.0, 0.0).extend(1.0));
        light.set_direction(vec3(0.0, 0.0, -1.0));

        let ahead = light.view_matrix().transform_point3(vec3(0.0, 5.0, -3.0));
        assert!((ahead - vec3(0.0, 0.0, -3.0)).length() < 1e-5);
    }

    #[test]
    fn projection_maps_near_plane_to_zero_depth() {
        let light = Spotlight::default();
        let clip = light.projection_matrix() * vec3(0.0, 0.0, -1.0).extend(1.0);
        assert!((clip.z / clip.w).abs() < 1e-5);
    }
}
