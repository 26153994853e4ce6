//! Minimal Wavefront OBJ reader: positions, texture coordinates, normals and
//! polygonal faces. Materials, groups and smoothing are ignored.

use std::{collections::HashMap, path::Path};

use anyhow::{anyhow, Context, Result};
use glam::{vec2, Vec2, Vec3};

use super::mesh::{MeshData, Vertex};

pub fn load_obj(path: &Path) -> Result<MeshData> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_obj(&data).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_obj(data: &str) -> Result<MeshData> {
    let mut positions = Vec::new();
    let mut uvs = Vec::new();
    let mut normals = Vec::new();
    let mut faces: Vec<[Corner; 3]> = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let tag = match parts.next() {
            Some(tag) => tag,
            None => continue,
        };
        match tag {
            "v" => positions.push(
                parse_vec3(parts)
                    .with_context(|| format!("invalid vertex on line {}", line_no + 1))?,
            ),
            "vt" => uvs.push(
                parse_uv(parts)
                    .with_context(|| format!("invalid texture coordinate on line {}", line_no + 1))?,
            ),
            "vn" => normals.push(
                parse_vec3(parts)
                    .with_context(|| format!("invalid normal on line {}", line_no + 1))?,
            ),
            "f" => {
                let polygon = parse_face(parts)
                    .with_context(|| format!("invalid face on line {}", line_no + 1))?;
                for i in 1..polygon.len() - 1 {
                    faces.push([polygon[0], polygon[i], polygon[i + 1]]);
                }
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(anyhow!("OBJ file does not define any vertices"));
    }

    build_mesh(&positions, &uvs, &normals, &faces)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Corner {
    v: i32,
    vt: i32,
    vn: i32,
}

fn parse_component(part: Option<&str>) -> Result<f32> {
    Ok(part
        .ok_or_else(|| anyhow!("missing vector component"))?
        .parse::<f32>()?)
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let x = parse_component(parts.next())?;
    let y = parse_component(parts.next())?;
    let z = parse_component(parts.next())?;
    Ok(Vec3::new(x, y, z))
}

fn parse_uv<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec2> {
    let u = parse_component(parts.next())?;
    // `vt u` alone is legal.
    let v = parts.next().map(str::parse::<f32>).transpose()?.unwrap_or(0.0);
    // OBJ puts v = 0 at the bottom of the image; textures are sampled top down.
    Ok(vec2(u, 1.0 - v))
}

fn parse_index(segment: Option<&str>) -> Result<i32> {
    match segment {
        None | Some("") => Ok(0),
        Some(s) => Ok(s.parse::<i32>()?),
    }
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<Corner>> {
    let mut corners = Vec::new();
    for part in parts {
        let mut segments = part.split('/');
        let v = segments
            .next()
            .ok_or_else(|| anyhow!("missing vertex index"))?
            .parse::<i32>()?;
        let vt = parse_index(segments.next())?;
        let vn = parse_index(segments.next())?;
        corners.push(Corner { v, vt, vn });
    }
    if corners.len() < 3 {
        return Err(anyhow!("faces must reference at least 3 vertices"));
    }
    Ok(corners)
}

/// Resolves a 1-based or negative (relative) OBJ index.
fn fix_index(index: i32, len: usize) -> Option<usize> {
    if index > 0 {
        let zero_based = index as usize - 1;
        (zero_based < len).then(|| zero_based)
    } else if index < 0 {
        let back = index.unsigned_abs() as usize;
        (back <= len).then(|| len - back)
    } else {
        None
    }
}

fn build_mesh(
    positions: &[Vec3],
    uvs: &[Vec2],
    normals: &[Vec3],
    faces: &[[Corner; 3]],
) -> Result<MeshData> {
    let mut lookup: HashMap<(usize, Option<usize>, Option<usize>), u32> = HashMap::new();
    let mut mesh = MeshData::default();
    let mut missing_normals = false;

    for face in faces {
        for corner in face {
            let position = fix_index(corner.v, positions.len())
                .ok_or_else(|| anyhow!("vertex index {} out of range", corner.v))?;
            let uv = fix_index(corner.vt, uvs.len());
            let normal = fix_index(corner.vn, normals.len());
            missing_normals |= normal.is_none();

            let next_index = mesh.vertices.len() as u32;
            let index = *lookup.entry((position, uv, normal)).or_insert_with(|| {
                mesh.vertices.push(Vertex {
                    position: positions[position],
                    normal: normal.map(|i| normals[i]).unwrap_or(Vec3::ZERO),
                    uv: uv.map(|i| uvs[i]).unwrap_or(Vec2::ZERO),
                });
                next_index
            });
            mesh.indices.push(index);
        }
    }

    if missing_normals {
        compute_normals(&mut mesh);
    }
    Ok(mesh)
}

/// Area-weighted vertex normals for vertices the file left without one.
fn compute_normals(mesh: &mut MeshData) {
    let mut accum = vec![Vec3::ZERO; mesh.vertices.len()];
    for tri in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let p0 = mesh.vertices[a].position;
        let normal = (mesh.vertices[b].position - p0).cross(mesh.vertices[c].position - p0);
        for i in [a, b, c] {
            accum[i] += normal;
        }
    }
    for (vertex, normal) in mesh.vertices.iter_mut().zip(accum) {
        if vertex.normal == Vec3::ZERO {
            vertex.normal = normal.normalize_or_zero();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
# unit quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn quads_are_triangulated() {
        let mesh = parse_obj(QUAD).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, [0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.vertices[0].normal, Vec3::Z);
    }

    #[test]
    fn texture_v_is_flipped() {
        let mesh = parse_obj(QUAD).unwrap();
        assert_eq!(mesh.vertices[0].uv, vec2(0.0, 1.0));
        assert_eq!(mesh.vertices[2].uv, vec2(1.0, 0.0));
    }

    #[test]
    fn missing_normals_are_generated() {
        let mesh = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        for vertex in &mesh.vertices {
            assert!((vertex.normal - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn negative_indices_are_relative() {
        let mesh = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n").unwrap();
        assert_eq!(mesh.vertices[2].position, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn out_of_range_index_fails() {
        assert!(parse_obj("v 0 0 0\nf 1 2 3\n").is_err());
    }

    #[test]
    fn empty_file_fails() {
        assert!(parse_obj("# nothing\n").is_err());
    }

    #[test]
    fn bad_number_reports_line() {
        let err = parse_obj("v 0 0 0\nv 1 x 0\n").unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }
}
