//! The room scene: what is drawn where, and the frame loop that draws it.
//!
//! [`SceneDriver`] owns the camera, scene toggles and animations, and runs
//! one frame at a time against any [`RenderBackend`](roomview_render::RenderBackend).
//! Platform code feeds it a [`FrameInput`](roomview_input::FrameInput) per
//! frame and presents whatever the backend produced.
//!
//! # Invariants
//! - Input is applied before anything is drawn; animations advance once,
//!   after drawing.
//! - The scene angle rotates every placement and both lamps together.
//! - A frame either runs the lit pass plus skybox or the depth-map view,
//!   never both.

mod animation;
mod config;
mod driver;
mod layout;
mod lights;
mod probe;

pub use animation::{BalloonBob, BobPhase, FlightPhase, IntroFlythrough, IntroPhase, PlaneFlight};
pub use config::{ConfigError, ViewerConfig};
pub use driver::{FrameReport, LitPath, SceneDriver, SceneState};
pub use layout::{
    BALLOON_ALBEDO, BALLOON_SCALE, DRAW_ORDER, DrawSlot, MESH_CATALOG, MeshAsset, SceneObject,
    WOODEN_PLANE_ALBEDO, WOODEN_PLANE_SCALE, load_catalog, mesh, proxy_half_extent,
};
pub use lights::{POINT_LIGHT_POSITION, RoomLights, SPOT_LIGHT_DIRECTION, SPOT_LIGHT_POSITION};
pub use probe::TuningProbe;
