//! Shared value types for the room viewer.

mod types;

pub use types::{AxisRotation, MeshHandle, MoveDirection, Placement, PolygonMode, scene_rotation};
