use glam::{Mat3, Mat4};

use crate::backend::{Geometry, Program, RenderBackend, UniformValue, uniform};

/// View matrix with its translation removed, so the sky stays at infinity.
pub fn skybox_view(view: Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(view))
}

/// Draws the background cube after the lit pass, at the far plane.
#[derive(Debug, Default)]
pub struct SkyboxStage;

impl SkyboxStage {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, backend: &mut dyn RenderBackend, view: Mat4, projection: Mat4) {
        let _span = tracing::debug_span!("skybox").entered();
        backend.use_program(Program::Skybox);
        backend.set_uniform(uniform::VIEW, UniformValue::Mat4(skybox_view(view)));
        backend.set_uniform(uniform::PROJECTION, UniformValue::Mat4(projection));
        backend.draw(Geometry::Skybox);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingBackend;
    use glam::Vec3;

    #[test]
    fn translation_is_stripped() {
        let view = Mat4::look_at_rh(Vec3::new(4.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y);
        let sky = skybox_view(view);
        assert!(sky.transform_point3(Vec3::ZERO).abs_diff_eq(Vec3::ZERO, 1e-6));
        assert!(
            sky.transform_vector3(Vec3::X)
                .abs_diff_eq(view.transform_vector3(Vec3::X), 1e-6)
        );
    }

    #[test]
    fn skybox_draw_has_view_and_projection() {
        let mut backend = RecordingBackend::new();
        backend.begin_frame(0);
        SkyboxStage::new().render(&mut backend, Mat4::IDENTITY, Mat4::IDENTITY);
        backend.end_frame();
        assert!(backend.drain_errors().is_empty());
        assert_eq!(backend.draws().len(), 1);
        assert_eq!(backend.draws()[0].geometry, Geometry::Skybox);
    }
}
