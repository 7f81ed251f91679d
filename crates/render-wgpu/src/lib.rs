//! wgpu render backend for the room viewer.
//!
//! [`GpuBackend`] implements [`RenderBackend`](roomview_render::RenderBackend):
//! the pass layer drives it exactly as it drives the recording backend, and
//! the platform layer supplies the swapchain view for each frame.
//!
//! # Invariants
//! - All passes of a frame go into one command encoder, in call order, so
//!   the lit pass samples the depth written earlier in the same frame.
//! - Meshes are addressed by handle; a draw of an unknown handle is
//!   reported and skipped.
//! - Device errors never panic; they surface through `drain_errors`.

mod gpu;
mod shaders;

pub use gpu::GpuBackend;
