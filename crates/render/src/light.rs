use glam::{Mat3, Mat4, Vec3};

/// Half-width of the orthographic light frustum on X and Y.
pub const LIGHT_HALF_EXTENT: f32 = 1.0;
pub const LIGHT_NEAR: f32 = 0.1;
pub const LIGHT_FAR: f32 = 10.0;

/// The single shadow-casting directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction towards the light, also used as the light's eye position.
    pub direction: Vec3,
    /// Applied to `direction` before use.
    pub rotation: Mat4,
    pub color: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, 1.0, 3.0),
            rotation: Mat4::IDENTITY,
            color: Vec3::ONE,
        }
    }
}

impl DirectionalLight {
    pub fn light_space(&self) -> Mat4 {
        light_space_transform(self.direction, self.rotation)
    }

    /// Light direction in eye space for the given camera view.
    pub fn eye_direction(&self, view: Mat4) -> Vec3 {
        Mat3::from_mat4(view * self.rotation).inverse().transpose() * self.direction
    }
}

/// World space to the light's clip space.
///
/// The light looks from `rotation * direction` at the origin with +Y up,
/// through an orthographic box of ±1 on X/Y and [0.1, 10] in depth. The
/// result does not depend on the camera.
pub fn light_space_transform(direction: Vec3, rotation: Mat4) -> Mat4 {
    let eye = (rotation * direction.extend(1.0)).truncate();
    let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
    let projection = Mat4::orthographic_rh(
        -LIGHT_HALF_EXTENT,
        LIGHT_HALF_EXTENT,
        -LIGHT_HALF_EXTENT,
        LIGHT_HALF_EXTENT,
        LIGHT_NEAR,
        LIGHT_FAR,
    );
    projection * view
}
