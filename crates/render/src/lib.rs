//! Shadow-mapped rendering passes over a renderer-agnostic backend.
//!
//! # Invariants
//! - The lit pass only samples a shadow map written earlier in the same
//!   frame: it consumes the [`PopulatedShadowMap`] the depth pass returns.
//! - The light-space transform depends only on the light, never the camera.
//! - Programs see uniforms by name; a draw never happens before its
//!   program's required uniforms are set in that pass.
//!
//! [`RecordingBackend`] implements [`RenderBackend`] without a GPU and
//! checks those contracts. The wgpu implementation lives in
//! `roomview-render-wgpu`.

mod backend;
mod error;
mod light;
mod lit;
mod recording;
mod shadow;
mod skybox;

pub use backend::{
    Clear, Geometry, ObjectDraw, Program, RenderBackend, RenderTarget, TextureSource,
    UniformValue, Viewport, slot, uniform,
};
pub use error::RenderError;
pub use light::{
    DirectionalLight, LIGHT_FAR, LIGHT_HALF_EXTENT, LIGHT_NEAR, light_space_transform,
};
pub use lit::{LitFrame, LitShadingStage, Projection, normal_matrix};
pub use recording::{RecordedDraw, RecordedEvent, RecordingBackend};
pub use shadow::{DEFAULT_SHADOW_MAP_SIZE, PopulatedShadowMap, ShadowMapSpec, ShadowMapStage};
pub use skybox::{SkyboxStage, skybox_view};
