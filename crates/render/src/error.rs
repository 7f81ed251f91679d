use roomview_common::MeshHandle;
use thiserror::Error;

/// Errors surfaced by render backends at setup time.
///
/// Per-frame problems are not errors: backends collect them as diagnostics
/// and hand them out through `RenderBackend::drain_errors`.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("shadow map allocation failed ({size}x{size}): {reason}")]
    ShadowMapAllocation { size: u32, reason: String },

    #[error("unknown mesh handle {0:?}")]
    UnknownMesh(MeshHandle),

    #[error("mesh upload failed for {handle:?}: {reason}")]
    MeshUpload { handle: MeshHandle, reason: String },
}
