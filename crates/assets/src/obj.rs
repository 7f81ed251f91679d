use std::collections::HashMap;

use glam::Vec3;

use crate::AssetError;
use crate::mesh::{MeshData, MeshVertex};

/// Parse Wavefront OBJ text into an indexed triangle mesh.
///
/// Reads `v`, `vn` and `f` records; everything else (texture coordinates,
/// groups, materials) is skipped. Polygons are fan-triangulated, negative
/// indices count back from the end, and vertices without a normal get
/// smooth normals computed from the faces around them.
pub fn parse_obj(data: &str) -> Result<MeshData, AssetError> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut triangles: Vec<[FaceIndex; 3]> = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let line_no = line_no + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        match tag {
            "v" => positions.push(parse_vec3(parts).map_err(|m| parse_error(line_no, m))?),
            "vn" => normals.push(parse_vec3(parts).map_err(|m| parse_error(line_no, m))?),
            "f" => {
                let polygon = parse_face(parts).map_err(|m| parse_error(line_no, m))?;
                for i in 1..polygon.len() - 1 {
                    triangles.push([polygon[0], polygon[i], polygon[i + 1]]);
                }
            }
            _ => {}
        }
    }

    if positions.is_empty() || triangles.is_empty() {
        return Err(AssetError::Empty);
    }

    let (mut mesh, missing_normals) = build_mesh(&positions, &normals, &triangles)?;
    if missing_normals {
        compute_normals(&mut mesh);
    }
    Ok(mesh)
}

fn parse_error(line: usize, message: String) -> AssetError {
    AssetError::Parse { line, message }
}

#[derive(Debug, Clone, Copy)]
struct FaceIndex {
    position: i32,
    normal: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey {
    position: usize,
    normal: Option<usize>,
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3, String> {
    let mut next = || -> Result<f32, String> {
        let token = parts.next().ok_or("missing vector component")?;
        token
            .parse::<f32>()
            .map_err(|e| format!("bad component `{token}`: {e}"))
    };
    Ok(Vec3::new(next()?, next()?, next()?))
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<FaceIndex>, String> {
    let mut polygon = Vec::new();
    for part in parts {
        let mut segments = part.split('/');
        let position = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or("missing vertex index")?;
        let position = position
            .parse::<i32>()
            .map_err(|e| format!("bad vertex index `{position}`: {e}"))?;
        // v/vt/vn; the texture coordinate is ignored.
        let normal = segments
            .nth(1)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<i32>())
            .transpose()
            .map_err(|e| format!("bad normal index in `{part}`: {e}"))?
            .unwrap_or(0);
        polygon.push(FaceIndex { position, normal });
    }
    if polygon.len() < 3 {
        return Err(format!(
            "face references {} vertices, need at least 3",
            polygon.len()
        ));
    }
    Ok(polygon)
}

/// One-based OBJ index (negative counts from the end) to a zero-based one.
fn resolve_index(index: i32, len: usize) -> Option<usize> {
    if index > 0 {
        let zero_based = index as usize - 1;
        (zero_based < len).then_some(zero_based)
    } else if index < 0 {
        let back = index.unsigned_abs() as usize;
        (back <= len).then(|| len - back)
    } else {
        None
    }
}

fn build_mesh(
    positions: &[Vec3],
    normals: &[Vec3],
    triangles: &[[FaceIndex; 3]],
) -> Result<(MeshData, bool), AssetError> {
    let mut lookup: HashMap<VertexKey, u32> = HashMap::new();
    let mut mesh = MeshData::default();
    let mut missing_normals = false;

    for triangle in triangles {
        for corner in triangle {
            let position = resolve_index(corner.position, positions.len()).ok_or(
                AssetError::IndexOutOfRange {
                    index: corner.position,
                    len: positions.len(),
                },
            )?;
            let normal = resolve_index(corner.normal, normals.len());
            missing_normals |= normal.is_none();

            let key = VertexKey { position, normal };
            let next = mesh.vertices.len() as u32;
            let index = *lookup.entry(key).or_insert_with(|| {
                let n = normal.map(|i| normals[i]).unwrap_or(Vec3::ZERO);
                mesh.vertices.push(MeshVertex::new(positions[position], n));
                next
            });
            mesh.indices.push(index);
        }
    }

    Ok((mesh, missing_normals))
}

/// Area-weighted smooth normals for vertices that have none.
fn compute_normals(mesh: &mut MeshData) {
    let mut accum = vec![Vec3::ZERO; mesh.vertices.len()];

    for triangle in mesh.indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        let p0 = Vec3::from_array(mesh.vertices[i0].position);
        let p1 = Vec3::from_array(mesh.vertices[i1].position);
        let p2 = Vec3::from_array(mesh.vertices[i2].position);
        let face = (p1 - p0).cross(p2 - p0);
        accum[i0] += face;
        accum[i1] += face;
        accum[i2] += face;
    }

    for (vertex, normal) in mesh.vertices.iter_mut().zip(accum) {
        if vertex.normal == [0.0; 3] {
            vertex.normal = normal.normalize_or_zero().to_array();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_triangle() {
        let obj = "\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices.len(), 3);
    }

    #[test]
    fn computes_missing_normals() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = parse_obj(obj).unwrap();
        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn keeps_explicit_normals() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 -1\nf 1//1 2//1 3//1\n";
        let mesh = parse_obj(obj).unwrap();
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, -1.0]));
    }

    #[test]
    fn quad_is_fan_triangulated() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1/1/1 2/2/1 3/3/1 4/4/1\nvn 0 0 1\n";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn negative_indices_count_from_end() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.vertices[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[2].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn shared_corners_are_deduplicated() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3\nf 1 3 4\n";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
    }

    #[test]
    fn ignores_unknown_records() {
        let obj = "mtllib a.mtl\no thing\nv 0 0 0\nvt 0 0\nv 1 0 0\nv 0 1 0\nusemtl red\ns off\nf 1/1 2/1 3/1\n";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn bad_vertex_reports_line() {
        let obj = "v 0 0 0\nv 1 zero 0\n";
        match parse_obj(obj) {
            Err(AssetError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn two_vertex_face_is_rejected() {
        let obj = "v 0 0 0\nv 1 0 0\nf 1 2\n";
        assert!(matches!(
            parse_obj(obj),
            Err(AssetError::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 7\n";
        assert!(matches!(
            parse_obj(obj),
            Err(AssetError::IndexOutOfRange { index: 7, len: 3 })
        ));
    }

    #[test]
    fn file_without_faces_is_empty() {
        assert!(matches!(parse_obj("v 0 0 0\n"), Err(AssetError::Empty)));
        assert!(matches!(parse_obj("# nothing\n"), Err(AssetError::Empty)));
    }
}
