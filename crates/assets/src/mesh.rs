use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Interleaved vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }
}

/// Indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.vertices.iter().map(|v| Vec3::from_array(v.position));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    /// Axis-aligned box of the given half extent, with flat face normals.
    pub fn cube(half_extent: f32) -> Self {
        let p = half_extent;
        let faces: [(Vec3, [Vec3; 4]); 6] = [
            (
                Vec3::Z,
                [
                    Vec3::new(-p, -p, p),
                    Vec3::new(p, -p, p),
                    Vec3::new(p, p, p),
                    Vec3::new(-p, p, p),
                ],
            ),
            (
                Vec3::NEG_Z,
                [
                    Vec3::new(p, -p, -p),
                    Vec3::new(-p, -p, -p),
                    Vec3::new(-p, p, -p),
                    Vec3::new(p, p, -p),
                ],
            ),
            (
                Vec3::X,
                [
                    Vec3::new(p, -p, p),
                    Vec3::new(p, -p, -p),
                    Vec3::new(p, p, -p),
                    Vec3::new(p, p, p),
                ],
            ),
            (
                Vec3::NEG_X,
                [
                    Vec3::new(-p, -p, -p),
                    Vec3::new(-p, -p, p),
                    Vec3::new(-p, p, p),
                    Vec3::new(-p, p, -p),
                ],
            ),
            (
                Vec3::Y,
                [
                    Vec3::new(-p, p, p),
                    Vec3::new(p, p, p),
                    Vec3::new(p, p, -p),
                    Vec3::new(-p, p, -p),
                ],
            ),
            (
                Vec3::NEG_Y,
                [
                    Vec3::new(-p, -p, -p),
                    Vec3::new(p, -p, -p),
                    Vec3::new(p, -p, p),
                    Vec3::new(-p, -p, p),
                ],
            ),
        ];

        let mut mesh = MeshData::default();
        for (normal, corners) in faces {
            let base = mesh.vertices.len() as u32;
            mesh.vertices
                .extend(corners.iter().map(|&c| MeshVertex::new(c, normal)));
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        mesh
    }

    /// Two triangles covering clip space, facing +Z.
    pub fn screen_quad() -> Self {
        let corners = [
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ];
        Self {
            vertices: corners
                .iter()
                .map(|&c| MeshVertex::new(c, Vec3::Z))
                .collect(),
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }
}
