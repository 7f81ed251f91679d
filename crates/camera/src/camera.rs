use glam::{Mat4, Vec3};
use roomview_common::MoveDirection;
use serde::{Deserialize, Serialize};

/// Squared length under which `cross(front, world_up)` is treated as degenerate.
const DEGENERATE_EPSILON: f32 = 1e-12;

/// Fly-through camera with an explicit orthonormal basis.
///
/// The world-up reference is captured at construction and never changes, so
/// `rotate` re-derives `right` and `up` against a fixed axis and the camera
/// cannot accumulate roll.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    front: Vec3,
    right: Vec3,
    up: Vec3,
    world_up: Vec3,
}

/// Snapshot of a camera's position and basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vec3,
    pub front: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl Camera {
    /// Build a camera at `position` looking at `target`.
    ///
    /// `up` is stored as given and also becomes the world-up reference used by
    /// every later [`Camera::rotate`].
    pub fn new(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let front = (target - position).normalize();
        let right = front.cross(up).normalize();
        Self {
            position,
            front,
            right,
            up,
            world_up: up,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn world_up(&self) -> Vec3 {
        self.world_up
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position,
            front: self.front,
            right: self.right,
            up: self.up,
        }
    }

    /// Translate along the current basis. No bounds are applied.
    pub fn move_by(&mut self, direction: MoveDirection, speed: f32) {
        match direction {
            MoveDirection::Forward => self.position += speed * self.front,
            MoveDirection::Backward => self.position -= speed * self.front,
            MoveDirection::Left => self.position -= speed * self.right,
            MoveDirection::Right => self.position += speed * self.right,
            MoveDirection::Up => self.position += speed * self.up,
            MoveDirection::Down => self.position -= speed * self.up,
        }
    }

    /// Point the camera along the spherical direction `(pitch, yaw)`, both in degrees.
    ///
    /// Yaw is measured from +X towards +Z, pitch from the XZ plane towards +Y.
    /// A front (nearly) parallel to world-up is not guarded against: the
    /// basis becomes low-precision or NaN, and a warning is logged.
    pub fn rotate(&mut self, pitch: f32, yaw: f32) {
        let (pitch, yaw) = (pitch.to_radians(), yaw.to_radians());
        let front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        );
        self.front = front.normalize();

        let side = self.front.cross(self.world_up);
        if side.length_squared() < DEGENERATE_EPSILON {
            tracing::warn!(
                front = ?self.front,
                world_up = ?self.world_up,
                "camera front is parallel to world up; basis is degenerate"
            );
        }
        self.right = side.normalize();
        self.up = self.right.cross(self.front).normalize();
    }

    /// Right-handed look-at transform from the current pose.
    pub fn view_transform(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn fixture() -> Camera {
        Camera::new(
            Vec3::new(0.0, 0.0, 3.0),
            Vec3::new(0.0, 0.0, -10.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
    }

    fn assert_orthonormal(cam: &Camera) {
        let (f, r, u) = (cam.front(), cam.right(), cam.up());
        assert!(f.dot(r).abs() < EPS, "front.right = {}", f.dot(r));
        assert!(f.dot(u).abs() < EPS, "front.up = {}", f.dot(u));
        assert!(r.dot(u).abs() < EPS, "right.up = {}", r.dot(u));
        assert!((f.length() - 1.0).abs() < EPS);
        assert!((r.length() - 1.0).abs() < EPS);
        assert!((u.length() - 1.0).abs() < EPS);
    }

    #[test]
    fn initial_basis_matches_cross_product_order() {
        let cam = fixture();
        assert!(cam.front().abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), EPS));
        let expected_right = Vec3::new(0.0, 0.0, -1.0).cross(Vec3::Y).normalize();
        assert!(cam.right().abs_diff_eq(expected_right, EPS));
        assert!(cam.right().abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), EPS));
        assert_eq!(cam.up(), Vec3::Y);
        assert_eq!(cam.world_up(), Vec3::Y);
    }

    #[test]
    fn forward_step_from_fixture() {
        let mut cam = fixture();
        cam.move_by(MoveDirection::Forward, 0.05);
        assert!(cam.position().abs_diff_eq(Vec3::new(0.0, 0.0, 2.95), EPS));
    }

    #[test]
    fn every_direction_round_trips() {
        for dir in MoveDirection::ALL {
            let mut cam = fixture();
            cam.rotate(12.0, -70.0);
            let start = cam.position();
            cam.move_by(dir, 0.37);
            assert!(!cam.position().abs_diff_eq(start, 1e-3));
            cam.move_by(dir.opposite(), 0.37);
            assert!(cam.position().abs_diff_eq(start, EPS), "{dir:?}");
        }
    }

    #[test]
    fn move_does_not_touch_orientation() {
        let mut cam = fixture();
        let before = cam.pose();
        cam.move_by(MoveDirection::Up, 2.0);
        cam.move_by(MoveDirection::Left, 1.0);
        let after = cam.pose();
        assert_eq!(before.front, after.front);
        assert_eq!(before.right, after.right);
        assert_eq!(before.up, after.up);
    }

    #[test]
    fn orthonormal_after_mixed_sequence() {
        let mut cam = fixture();
        assert_orthonormal(&cam);
        let steps = [
            (10.0, -90.0),
            (45.0, 0.0),
            (-60.0, 135.0),
            (89.0, 270.0),
            (-89.0, -720.0),
            (0.5, 33.3),
        ];
        for (i, (pitch, yaw)) in steps.into_iter().enumerate() {
            cam.rotate(pitch, yaw);
            assert_orthonormal(&cam);
            cam.move_by(MoveDirection::ALL[i % 6], 0.2);
            assert_orthonormal(&cam);
        }
    }

    #[test]
    fn rotate_keeps_right_horizontal() {
        let mut cam = fixture();
        for yaw in [-90.0, -45.0, 10.0, 170.0] {
            cam.rotate(30.0, yaw);
            assert!(cam.right().dot(cam.world_up()).abs() < EPS);
        }
    }

    #[test]
    fn rotate_is_deterministic() {
        let mut a = fixture();
        let mut b = fixture();
        a.rotate(20.0, -110.0);
        b.rotate(20.0, -110.0);
        assert_eq!(a.pose(), b.pose());

        // Absolute angles: repeating the call changes nothing.
        a.rotate(20.0, -110.0);
        assert_eq!(a.pose(), b.pose());
    }

    #[test]
    fn rotate_to_initial_angles_restores_front() {
        let mut cam = fixture();
        cam.rotate(0.0, -90.0);
        assert!(cam.front().abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), EPS));
        assert!(cam.right().abs_diff_eq(Vec3::X, EPS));
        assert!(cam.up().abs_diff_eq(Vec3::Y, EPS));
    }

    #[test]
    fn view_transform_is_stable_between_updates() {
        let mut cam = fixture();
        cam.rotate(5.0, -80.0);
        let a = cam.view_transform();
        let b = cam.view_transform();
        assert_eq!(a, b);
    }

    #[test]
    fn view_transform_maps_position_to_origin() {
        let cam = fixture();
        let view = cam.view_transform();
        let eye = view.transform_point3(cam.position());
        assert!(eye.abs_diff_eq(Vec3::ZERO, EPS));
        // A point straight ahead lands on the -Z axis in eye space.
        let ahead = view.transform_point3(cam.position() + cam.front() * 2.0);
        assert!(ahead.abs_diff_eq(Vec3::new(0.0, 0.0, -2.0), EPS));
    }

    #[test]
    fn degenerate_rotation_is_not_clamped() {
        let mut cam = fixture();
        cam.rotate(90.0, 0.0);
        // cos(90 degrees) is not exactly zero in f32, so front is only nearly
        // vertical; the basis is still produced without clamping.
        assert!(cam.front().y > 0.999);
        assert!(cam.front().is_finite());
        assert!(cam.right().is_finite());
    }
}
