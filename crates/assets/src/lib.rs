//! Mesh assets: OBJ parsing and a handle-indexed mesh library.
//!
//! The renderer consumes meshes by [`MeshHandle`](roomview_common::MeshHandle),
//! never by file path. Files that cannot be loaded are replaced by proxy
//! cubes so the scene keeps its layout.

mod library;
mod mesh;
mod obj;

use std::path::PathBuf;

pub use library::{MeshLibrary, MeshSource};
pub use mesh::{MeshData, MeshVertex};
pub use obj::parse_obj;

/// Errors from asset loading.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("OBJ parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("face index {index} out of range for {len} entries")]
    IndexOutOfRange { index: i32, len: usize },
    #[error("mesh has no triangles")]
    Empty,
}
