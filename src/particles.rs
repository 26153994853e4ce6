//! One-time emitter setup for the instanced fire/smoke particles.
//!
//! Particles carry no per-frame state. Each instance owns an initial velocity
//! and a birth time, both generated here once and uploaded as per-instance
//! vertex attributes; the vertex shader rebuilds the current position from
//! the elapsed time in closed form. [`particle_state`] is the same evaluation
//! on the CPU.

use std::f32::consts::{PI, TAU};

use glam::{Mat3, Vec3};
use rand::Rng;

use crate::config::ParticleConfig;

const MAX_CONE_ANGLE: f32 = PI / 20.0;
const MIN_SPEED: f32 = 1.25;
const MAX_SPEED: f32 = 1.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleEmitter {
    pub position: Vec3,
    pub direction: Vec3,
    pub gravity: Vec3,
    pub lifetime: f32,
    pub size: f32,
    pub initial_velocities: Vec<Vec3>,
    pub birth_times: Vec<f32>,
}

impl ParticleEmitter {
    pub fn new(config: &ParticleConfig, rng: &mut impl Rng) -> Self {
        let direction = config.emitter_direction.try_normalize().unwrap_or(Vec3::Y);
        Self {
            position: config.emitter_position,
            direction,
            gravity: config.gravity,
            lifetime: config.lifetime,
            size: config.size,
            initial_velocities: initial_velocities(rng, config.count as usize, direction),
            birth_times: birth_times(config.count as usize, config.lifetime),
        }
    }

    pub fn count(&self) -> u32 {
        self.initial_velocities.len() as u32
    }
}

/// Orthonormal basis whose second column is `dir`.
pub fn emitter_basis(dir: Vec3) -> Mat3 {
    let v = dir;
    let mut n = Vec3::X.cross(v);
    if n.length() < 1e-5 {
        n = Vec3::Y.cross(v);
    }
    let u = v.cross(n);
    Mat3::from_cols(u.normalize(), v.normalize(), n.normalize())
}

/// Random velocities inside a narrow cone around `dir`.
pub fn initial_velocities(rng: &mut impl Rng, count: usize, dir: Vec3) -> Vec<Vec3> {
    let basis = emitter_basis(dir);
    (0..count)
        .map(|_| {
            let theta = lerp(0.0, MAX_CONE_ANGLE, rng.gen::<f32>());
            let phi = lerp(0.0, TAU, rng.gen::<f32>());
            let local = Vec3::new(
                theta.sin() * phi.cos(),
                theta.cos(),
                theta.sin() * phi.sin(),
            );
            let speed = lerp(MIN_SPEED, MAX_SPEED, rng.gen::<f32>());
            (basis * local).normalize() * speed
        })
        .collect()
}

/// Birth times spread evenly over one lifetime so the emitter never bursts.
pub fn birth_times(count: usize, lifetime: f32) -> Vec<f32> {
    if count == 0 {
        return Vec::new();
    }
    let rate = lifetime / count as f32;
    (0..count).map(|i| i as f32 * rate).collect()
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ParticleState {
    pub position: Vec3,
    pub age: f32,
    /// Fades linearly from 1 at birth to 0 at the end of the lifetime.
    pub opacity: f32,
}

/// Position of one particle at simulation time `time`, or `None` before it
/// is first born.
pub fn particle_state(
    emitter: &ParticleEmitter,
    initial_velocity: Vec3,
    birth_time: f32,
    time: f32,
) -> Option<ParticleState> {
    if time < birth_time || emitter.lifetime <= 0.0 {
        return None;
    }
    let age = (time - birth_time).rem_euclid(emitter.lifetime);
    Some(ParticleState {
        position: emitter.position + initial_velocity * age + 0.5 * emitter.gravity * age * age,
        age,
        opacity: 1.0 - age / emitter.lifetime,
    })
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use glam::vec3;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    fn emitter(count: u32) -> ParticleEmitter {
        let config = ParticleConfig {
            count,
            ..Default::default()
        };
        ParticleEmitter::new(&config, &mut Pcg64Mcg::seed_from_u64(7))
    }

    #[test]
    fn birth_times_are_evenly_spaced() {
        let lifetime = 5.5;
        let count = 800;
        let times = birth_times(count, lifetime);
        assert_eq!(times.len(), count);
        assert_eq!(times[0], 0.0);
        let step = lifetime / count as f32;
        for pair in times.windows(2) {
            assert!(pair[1] > pair[0]);
            assert!((pair[1] - pair[0] - step).abs() < 1e-5);
        }
    }

    #[test]
    fn no_particles_no_birth_times() {
        assert!(birth_times(0, 3.0).is_empty());
    }

    #[test]
    fn velocities_stay_inside_the_cone() {
        let dir = vec3(0.3, 1.0, -0.2).normalize();
        let mut rng = Pcg64Mcg::seed_from_u64(42);
        for v in initial_velocities(&mut rng, 2000, dir) {
            let speed = v.length();
            assert!((MIN_SPEED - 1e-4..=MAX_SPEED + 1e-4).contains(&speed));
            let angle = v.normalize().dot(dir).clamp(-1.0, 1.0).acos();
            assert!(angle <= MAX_CONE_ANGLE + 1e-3, "angle {}", angle);
        }
    }

    #[test]
    fn basis_is_orthonormal_for_axis_aligned_directions() {
        for dir in [Vec3::X, Vec3::Y, Vec3::Z, -Vec3::X] {
            let basis = emitter_basis(dir);
            assert!((basis.y_axis - dir).length() < 1e-6);
            assert!(basis.x_axis.dot(basis.y_axis).abs() < 1e-6);
            assert!(basis.y_axis.dot(basis.z_axis).abs() < 1e-6);
            assert!(basis.x_axis.dot(basis.z_axis).abs() < 1e-6);
        }
    }

    #[test]
    fn emitter_generates_parallel_arrays() {
        let emitter = emitter(64);
        assert_eq!(emitter.count(), 64);
        assert_eq!(emitter.birth_times.len(), 64);
    }

    #[test]
    fn same_seed_same_velocities() {
        let a = emitter(16);
        let b = emitter(16);
        assert_eq!(a.initial_velocities, b.initial_velocities);
    }

    #[test]
    fn unborn_particles_are_hidden() {
        let emitter = emitter(4);
        assert!(particle_state(&emitter, Vec3::Y, 2.0, 1.0).is_none());
    }

    #[test]
    fn particles_restart_after_their_lifetime() {
        let emitter = emitter(4);
        let v = vec3(0.0, 1.5, 0.0);
        let first = particle_state(&emitter, v, 1.0, 2.0).unwrap();
        let again = particle_state(&emitter, v, 1.0, 2.0 + emitter.lifetime).unwrap();
        assert!((first.position - again.position).length() < 1e-4);
        assert!((first.age - 1.0).abs() < 1e-5);
        assert!((first.opacity - (1.0 - 1.0 / emitter.lifetime)).abs() < 1e-5);
    }

    #[test]
    fn position_follows_constant_acceleration() {
        let emitter = emitter(4);
        let v = vec3(0.1, 1.25, 0.0);
        let state = particle_state(&emitter, v, 0.0, 2.0).unwrap();
        let expected = emitter.position + v * 2.0 + 0.5 * emitter.gravity * 4.0;
        assert!((state.position - expected).length() < 1e-5);
        assert_eq!(particle_state(&emitter, v, 0.0, 0.0).unwrap().position, emitter.position);
    }
}
