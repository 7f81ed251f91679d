use glam::{Mat4, Vec3};
use roomview_common::scene_rotation;

/// Floor lamp.
pub const POINT_LIGHT_POSITION: Vec3 = Vec3::new(-0.919999, 0.45, -0.54);
/// Desk lamp.
pub const SPOT_LIGHT_POSITION: Vec3 = Vec3::new(0.62, 1.09, 1.12);
/// Spot direction, passed through unchanged.
pub const SPOT_LIGHT_DIRECTION: Vec3 = Vec3::new(0.0, -10.0, 0.0);

/// Point and spot light positions for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomLights {
    pub point_world: Vec3,
    pub spot_world: Vec3,
    pub point_eye: Vec3,
    pub spot_eye: Vec3,
    pub spot_direction: Vec3,
}

impl RoomLights {
    /// Lamps turn with the room, then go to eye space through `view`.
    pub fn compute(scene_angle: f32, view: Mat4) -> Self {
        let rotation = scene_rotation(scene_angle);
        let point_world = rotation.transform_point3(POINT_LIGHT_POSITION);
        let spot_world = rotation.transform_point3(SPOT_LIGHT_POSITION);
        Self {
            point_world,
            spot_world,
            point_eye: view.transform_point3(point_world),
            spot_eye: view.transform_point3(spot_world),
            spot_direction: SPOT_LIGHT_DIRECTION,
        }
    }
}
