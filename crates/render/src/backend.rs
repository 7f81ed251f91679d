use glam::{Mat3, Mat4, Vec3, Vec4};
use roomview_common::{MeshHandle, PolygonMode};

use crate::error::RenderError;
use crate::shadow::ShadowMapSpec;

/// Uniform names shared by every program and backend.
pub mod uniform {
    pub const MODEL: &str = "model";
    pub const VIEW: &str = "view";
    pub const PROJECTION: &str = "projection";
    pub const NORMAL_MATRIX: &str = "normalMatrix";
    pub const LIGHT_SPACE: &str = "lightSpaceTrMatrix";
    pub const LIGHT_DIR: &str = "lightDir";
    pub const LIGHT_COLOR: &str = "lightColor";
    pub const SPOT_LIGHT_DIR: &str = "spotLightDir";
    pub const POINT_LIGHT_POS_EYE: &str = "pointLightPosEye";
    pub const SPOT_LIGHT_POS_EYE: &str = "spotLightPosEye";
    pub const NIGHT: &str = "night";
    pub const ALBEDO: &str = "albedo";
}

/// Texture slot names.
pub mod slot {
    pub const SHADOW_MAP: &str = "shadowMap";
    pub const DEPTH_MAP: &str = "depthMap";
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Mat3(Mat3),
    Vec3(Vec3),
    Vec4(Vec4),
}

/// The programs a backend must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Program {
    /// Depth-only pass into the shadow map.
    Depth,
    /// Directional + point + spot lighting with shadow lookup.
    Lit,
    /// Full-screen visualisation of the shadow map. Depth testing off.
    DepthView,
    /// Background drawn behind everything at the far plane.
    Skybox,
}

impl Program {
    pub fn name(self) -> &'static str {
        match self {
            Program::Depth => "depth",
            Program::Lit => "lit",
            Program::DepthView => "depth_view",
            Program::Skybox => "skybox",
        }
    }

    /// Uniforms that must be set after `use_program` and before any draw.
    pub fn required_uniforms(self) -> &'static [&'static str] {
        use uniform::*;
        match self {
            Program::Depth => &[LIGHT_SPACE, MODEL],
            Program::Lit => &[
                MODEL,
                VIEW,
                PROJECTION,
                NORMAL_MATRIX,
                LIGHT_SPACE,
                LIGHT_DIR,
                LIGHT_COLOR,
                SPOT_LIGHT_DIR,
                POINT_LIGHT_POS_EYE,
                SPOT_LIGHT_POS_EYE,
                NIGHT,
                ALBEDO,
            ],
            Program::DepthView => &[],
            Program::Skybox => &[VIEW, PROJECTION],
        }
    }

    pub fn required_textures(self) -> &'static [&'static str] {
        match self {
            Program::Lit => &[slot::SHADOW_MAP],
            Program::DepthView => &[slot::DEPTH_MAP],
            Program::Depth | Program::Skybox => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    Shadow,
    Screen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn sized(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Which buffers of the bound target to clear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clear {
    /// Colour to clear to, if the colour buffer is cleared.
    pub color: Option<Vec4>,
    /// Clears depth to 1.0.
    pub depth: bool,
}

impl Clear {
    pub const DEPTH: Clear = Clear {
        color: None,
        depth: true,
    };

    pub const fn color_and_depth(color: Vec4) -> Self {
        Self {
            color: Some(color),
            depth: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSource {
    ShadowMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    Mesh(MeshHandle),
    ScreenQuad,
    Skybox,
}

/// One placed object for a frame: which mesh, where, and its flat colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectDraw {
    pub mesh: MeshHandle,
    pub model: Mat4,
    pub albedo: Vec3,
}

/// A shader sink driven by named uniforms.
///
/// Calls are stateful in the order issued: a draw uses the most recently
/// bound target, viewport, program, uniforms and textures. Uniform values
/// set before `use_program` do not carry over to the new program.
pub trait RenderBackend {
    /// Create the shadow-map target. Called once at startup.
    fn allocate_shadow_map(&mut self, spec: &ShadowMapSpec) -> Result<(), RenderError>;

    fn begin_frame(&mut self, frame: u64);
    fn end_frame(&mut self);

    fn bind_target(&mut self, target: RenderTarget);
    fn set_viewport(&mut self, viewport: Viewport);
    fn clear(&mut self, clear: Clear);
    fn use_program(&mut self, program: Program);
    fn set_uniform(&mut self, name: &'static str, value: UniformValue);
    fn bind_texture(&mut self, slot: &'static str, source: TextureSource);
    fn set_polygon_mode(&mut self, mode: PolygonMode);
    fn draw(&mut self, geometry: Geometry);

    /// Diagnostics collected since the last call.
    fn drain_errors(&mut self) -> Vec<String>;
}
