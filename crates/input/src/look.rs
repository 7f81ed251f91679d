use glam::{Vec2, Vec3};

use crate::intent::Intent;

/// Largest pitch a drag can reach, in degrees.
pub const PITCH_LIMIT: f32 = 89.0;

/// Turns mouse-drag deltas into absolute look angles.
///
/// The camera itself accepts any pitch; clamping happens here so a drag can
/// never push the front onto the world-up axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAccumulator {
    pitch: f32,
    yaw: f32,
    sensitivity: f32,
}

impl LookAccumulator {
    /// Start from the angles of an existing front vector.
    pub fn from_front(front: Vec3, sensitivity: f32) -> Self {
        let front = front.normalize();
        Self {
            pitch: front.y.clamp(-1.0, 1.0).asin().to_degrees(),
            yaw: front.z.atan2(front.x).to_degrees(),
            sensitivity,
        }
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Apply a drag in screen pixels (y grows downward). Returns `None` for a
    /// zero delta so an idle mouse leaves the camera untouched.
    pub fn apply(&mut self, delta: Vec2) -> Option<Intent> {
        if delta == Vec2::ZERO {
            return None;
        }
        self.yaw += delta.x * self.sensitivity;
        self.pitch = (self.pitch - delta.y * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        Some(Intent::Rotate {
            pitch: self.pitch,
            yaw: self.yaw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_angles_follow_front() {
        let look = LookAccumulator::from_front(Vec3::new(0.0, 0.0, -1.0), 0.1);
        assert!((look.yaw() + 90.0).abs() < 1e-4);
        assert!(look.pitch().abs() < 1e-4);
    }

    #[test]
    fn idle_mouse_produces_nothing() {
        let mut look = LookAccumulator::from_front(Vec3::new(0.0, 0.0, -1.0), 0.1);
        assert_eq!(look.apply(Vec2::ZERO), None);
    }

    #[test]
    fn horizontal_drag_changes_yaw_only() {
        let mut look = LookAccumulator::from_front(Vec3::new(0.0, 0.0, -1.0), 0.1);
        let Some(Intent::Rotate { pitch, yaw }) = look.apply(Vec2::new(100.0, 0.0)) else {
            panic!("expected a rotate intent");
        };
        assert!((yaw + 80.0).abs() < 1e-4);
        assert!(pitch.abs() < 1e-4);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut look = LookAccumulator::from_front(Vec3::new(0.0, 0.0, -1.0), 1.0);
        look.apply(Vec2::new(0.0, -500.0));
        assert_eq!(look.pitch(), PITCH_LIMIT);
        look.apply(Vec2::new(0.0, 1000.0));
        assert_eq!(look.pitch(), -PITCH_LIMIT);
    }
}
