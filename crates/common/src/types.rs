use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Identifies a mesh in the mesh library. Several placements may share one mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshHandle(pub u32);

/// Direction of a discrete camera move, relative to the camera's own basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

impl MoveDirection {
    pub const ALL: [MoveDirection; 6] = [
        MoveDirection::Forward,
        MoveDirection::Backward,
        MoveDirection::Left,
        MoveDirection::Right,
        MoveDirection::Up,
        MoveDirection::Down,
    ];

    /// The direction that undoes this one.
    pub fn opposite(self) -> Self {
        match self {
            MoveDirection::Forward => MoveDirection::Backward,
            MoveDirection::Backward => MoveDirection::Forward,
            MoveDirection::Left => MoveDirection::Right,
            MoveDirection::Right => MoveDirection::Left,
            MoveDirection::Up => MoveDirection::Down,
            MoveDirection::Down => MoveDirection::Up,
        }
    }
}

/// How the lit pass rasterizes triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
    Point,
}

/// A rotation of `degrees` about a fixed axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRotation {
    pub degrees: f32,
    pub axis: Vec3,
}

impl AxisRotation {
    pub const fn x(degrees: f32) -> Self {
        Self {
            degrees,
            axis: Vec3::X,
        }
    }

    pub const fn y(degrees: f32) -> Self {
        Self {
            degrees,
            axis: Vec3::Y,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_axis_angle(self.axis, self.degrees.to_radians())
    }
}

/// Fixed local transform of a scene object: rotations applied in order,
/// then a translation, then a scale.
///
/// The scene rotation is composed on top of this by [`Placement::model`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub rotations: &'static [AxisRotation],
    pub translation: Vec3,
    pub scale: Vec3,
}

impl Placement {
    pub const fn new(rotations: &'static [AxisRotation], translation: Vec3, scale: f32) -> Self {
        Self {
            rotations,
            translation,
            scale: Vec3::splat(scale),
        }
    }

    /// `R_0 · R_1 · … · T · S`.
    pub fn local_transform(&self) -> Mat4 {
        let rotation = self
            .rotations
            .iter()
            .fold(Mat4::IDENTITY, |acc, r| acc * r.matrix());
        rotation * Mat4::from_translation(self.translation) * Mat4::from_scale(self.scale)
    }

    /// Model transform under the shared scene rotation (degrees about world Y).
    pub fn model(&self, scene_angle: f32) -> Mat4 {
        scene_rotation(scene_angle) * self.local_transform()
    }
}

/// Rotation shared by every object in the room, in degrees about world Y.
pub fn scene_rotation(angle_degrees: f32) -> Mat4 {
    Mat4::from_rotation_y(angle_degrees.to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_involution() {
        for dir in MoveDirection::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_ne!(dir.opposite(), dir);
        }
    }

    #[test]
    fn placement_without_rotation_is_translate_scale() {
        let p = Placement::new(&[], Vec3::new(1.0, 2.0, 3.0), 0.5);
        let m = p.local_transform();
        let origin = m.transform_point3(Vec3::ZERO);
        let unit_x = m.transform_point3(Vec3::X);
        assert!(origin.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));
        assert!(unit_x.abs_diff_eq(Vec3::new(1.5, 2.0, 3.0), 1e-6));
    }

    #[test]
    fn scene_rotation_is_applied_last() {
        const ROT: &[AxisRotation] = &[];
        let p = Placement::new(ROT, Vec3::new(1.0, 0.0, 0.0), 1.0);
        let moved = p.model(90.0).transform_point3(Vec3::ZERO);
        // +90 degrees about Y takes +X to -Z.
        assert!(moved.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-6));
    }

    #[test]
    fn fixed_rotations_apply_before_translation() {
        const ROT: &[AxisRotation] = &[AxisRotation::y(90.0)];
        let p = Placement::new(ROT, Vec3::new(1.0, 0.0, 0.0), 1.0);
        let moved = p.local_transform().transform_point3(Vec3::ZERO);
        assert!(moved.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-6));
    }
}
