//! Fly-through camera for the room viewer.
//!
//! # Invariants
//! - `front`, `right` and `up` are mutually orthonormal after every update.
//! - The world-up reference is owned by the instance and fixed at construction.
//! - `view_transform` is a pure function of the current pose.

mod camera;

pub use camera::{Camera, CameraPose};
