use bytemuck::{Pod, Zeroable};
use glam::{vec2, vec3, Vec2, Vec3};

#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

/// Indexed triangle list ready for upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Horizontal square centered on the origin, facing +Y. UVs repeat once
/// per `tile` world units.
pub fn plane(width: f32, depth: f32, tile: f32) -> MeshData {
    let (hw, hd) = (width * 0.5, depth * 0.5);
    let (u, v) = (width / tile, depth / tile);
    let corner = |x: f32, z: f32, uv: Vec2| Vertex {
        position: vec3(x, 0.0, z),
        normal: Vec3::Y,
        uv,
    };
    MeshData {
        vertices: vec![
            corner(-hw, hd, vec2(0.0, 0.0)),
            corner(hw, hd, vec2(u, 0.0)),
            corner(hw, -hd, vec2(u, v)),
            corner(-hw, -hd, vec2(0.0, v)),
        ],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

/// Unit-sized cube with per-face normals, counter-clockwise from outside.
pub fn cube(size: f32) -> MeshData {
    let h = size * 0.5;
    // (normal, up) for each face; right = up x normal.
    let faces = [
        (Vec3::X, Vec3::Y),
        (-Vec3::X, Vec3::Y),
        (Vec3::Y, -Vec3::Z),
        (-Vec3::Y, Vec3::Z),
        (Vec3::Z, Vec3::Y),
        (-Vec3::Z, Vec3::Y),
    ];

    let mut mesh = MeshData::default();
    for (normal, up) in faces {
        let right = up.cross(normal);
        let base = mesh.vertices.len() as u32;
        for (s, t) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            mesh.vertices.push(Vertex {
                position: (normal + right * s + up * t) * h,
                normal,
                uv: vec2((s + 1.0) * 0.5, (1.0 - t) * 0.5),
            });
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

/// Corners of the sky box, 36 positions for a non-indexed draw. Only the
/// direction from the center matters.
pub fn sky_cube_positions() -> Vec<Vec3> {
    let mesh = cube(2.0);
    mesh.indices
        .iter()
        .map(|&i| mesh.vertices[i as usize].position)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn winding_matches_normals(mesh: &MeshData) -> bool {
        mesh.indices.chunks_exact(3).all(|tri| {
            let [a, b, c] = [0, 1, 2].map(|i| mesh.vertices[tri[i] as usize]);
            let face = (b.position - a.position).cross(c.position - a.position);
            face.dot(a.normal) > 0.0
        })
    }

    #[test]
    fn plane_faces_up() {
        let mesh = plane(100.0, 100.0, 10.0);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(winding_matches_normals(&mesh));
        assert!(mesh.vertices.iter().any(|v| v.uv == vec2(10.0, 10.0)));
    }

    #[test]
    fn cube_is_closed_and_outward() {
        let mesh = cube(1.0);
        assert_eq!(mesh.triangle_count(), 12);
        assert!(winding_matches_normals(&mesh));
        for v in &mesh.vertices {
            assert!((v.position.abs().max_element() - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn sky_cube_is_unindexed() {
        let positions = sky_cube_positions();
        assert_eq!(positions.len(), 36);
        assert!(positions.iter().all(|p| p.abs().max_element() == 1.0));
    }
}
