use glam::{Mat3, Mat4, Vec3, Vec4};
use roomview_common::PolygonMode;

use crate::backend::{
    Clear, Geometry, ObjectDraw, Program, RenderBackend, TextureSource, UniformValue, slot,
    uniform,
};
use crate::shadow::PopulatedShadowMap;

/// Perspective projection used by the lit pass and the skybox.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub const FOV_Y_DEGREES: f32 = 45.0;
    pub const NEAR: f32 = 0.1;
    pub const FAR: f32 = 20.0;

    /// 45 degree vertical field of view over a `width` x `height` window.
    pub fn for_window(width: u32, height: u32) -> Self {
        Self {
            fov_y_degrees: Self::FOV_Y_DEGREES,
            aspect: width as f32 / height.max(1) as f32,
            near: Self::NEAR,
            far: Self::FAR,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }
}

/// Inverse-transpose of the upper 3x3 of `view * model`.
pub fn normal_matrix(view: Mat4, model: Mat4) -> Mat3 {
    Mat3::from_mat4(view * model).inverse().transpose()
}

/// Per-frame inputs of the lit pass, all already in the spaces the shader
/// expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LitFrame {
    pub view: Mat4,
    pub projection: Mat4,
    pub light_space: Mat4,
    /// Directional light direction in eye space.
    pub light_dir_eye: Vec3,
    pub light_color: Vec3,
    pub spot_light_dir: Vec3,
    pub point_light_pos_eye: Vec3,
    pub spot_light_pos_eye: Vec3,
    /// Each component is 0 or 1; the shader dims ambient and directional
    /// terms when set.
    pub night: Vec3,
    pub clear_color: Vec4,
    pub polygon_mode: PolygonMode,
}

/// Second pass: shades every object with the shadow map from the first.
#[derive(Debug, Default)]
pub struct LitShadingStage;

impl LitShadingStage {
    pub fn new() -> Self {
        Self
    }

    /// Shade all `draws`. Returns the number of draws issued.
    pub fn render(
        &self,
        backend: &mut dyn RenderBackend,
        shadow: PopulatedShadowMap,
        frame: &LitFrame,
        draws: &[ObjectDraw],
    ) -> usize {
        let _span =
            tracing::debug_span!("lit_pass", frame = shadow.frame(), draws = draws.len()).entered();

        backend.clear(Clear::color_and_depth(frame.clear_color));
        backend.use_program(Program::Lit);
        backend.set_polygon_mode(frame.polygon_mode);

        backend.set_uniform(uniform::VIEW, UniformValue::Mat4(frame.view));
        backend.set_uniform(uniform::PROJECTION, UniformValue::Mat4(frame.projection));
        backend.set_uniform(uniform::LIGHT_SPACE, UniformValue::Mat4(frame.light_space));
        backend.set_uniform(uniform::LIGHT_DIR, UniformValue::Vec3(frame.light_dir_eye));
        backend.set_uniform(uniform::LIGHT_COLOR, UniformValue::Vec3(frame.light_color));
        backend.set_uniform(uniform::SPOT_LIGHT_DIR, UniformValue::Vec3(frame.spot_light_dir));
        backend.set_uniform(
            uniform::POINT_LIGHT_POS_EYE,
            UniformValue::Vec3(frame.point_light_pos_eye),
        );
        backend.set_uniform(
            uniform::SPOT_LIGHT_POS_EYE,
            UniformValue::Vec3(frame.spot_light_pos_eye),
        );
        backend.set_uniform(uniform::NIGHT, UniformValue::Vec3(frame.night));
        backend.bind_texture(slot::SHADOW_MAP, TextureSource::ShadowMap);

        for draw in draws {
            backend.set_uniform(uniform::MODEL, UniformValue::Mat4(draw.model));
            backend.set_uniform(
                uniform::NORMAL_MATRIX,
                UniformValue::Mat3(normal_matrix(frame.view, draw.model)),
            );
            backend.set_uniform(uniform::ALBEDO, UniformValue::Vec3(draw.albedo));
            backend.draw(Geometry::Mesh(draw.mesh));
        }

        if frame.polygon_mode != PolygonMode::Fill {
            backend.set_polygon_mode(PolygonMode::Fill);
        }
        draws.len()
    }

    /// Show the raw shadow map on a full-screen quad instead of the lit
    /// scene. The depth buffer is cleared with the colour buffer so a later
    /// pass never tests against stale depth.
    pub fn render_depth_view(
        &self,
        backend: &mut dyn RenderBackend,
        shadow: PopulatedShadowMap,
        clear_color: Vec4,
    ) -> usize {
        let _span = tracing::debug_span!("depth_view", frame = shadow.frame()).entered();

        backend.clear(Clear::color_and_depth(clear_color));
        backend.use_program(Program::DepthView);
        backend.bind_texture(slot::DEPTH_MAP, TextureSource::ShadowMap);
        backend.draw(Geometry::ScreenQuad);
        1
    }
}
