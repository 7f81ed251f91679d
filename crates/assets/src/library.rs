use std::collections::BTreeMap;
use std::path::Path;

use roomview_common::MeshHandle;

use crate::AssetError;
use crate::mesh::MeshData;
use crate::obj::parse_obj;

/// Where a library entry came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshSource {
    File,
    /// The file was missing or unreadable; a cube stands in for it.
    Proxy { reason: String },
}

#[derive(Debug, Clone)]
struct Entry {
    mesh: MeshData,
    source: MeshSource,
}

/// Meshes by handle. The renderer only ever sees handles.
#[derive(Debug, Clone, Default)]
pub struct MeshLibrary {
    entries: BTreeMap<MeshHandle, Entry>,
}

impl MeshLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse one OBJ file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<MeshData, AssetError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse_obj(&text)
    }

    pub fn insert(&mut self, handle: MeshHandle, mesh: MeshData) {
        self.entries.insert(
            handle,
            Entry {
                mesh,
                source: MeshSource::File,
            },
        );
    }

    /// Load `root/relative` into `handle`, substituting a cube of
    /// `proxy_half_extent` when the file cannot be used. Never fails.
    pub fn load_or_proxy(
        &mut self,
        handle: MeshHandle,
        root: &Path,
        relative: &str,
        proxy_half_extent: f32,
    ) -> &MeshSource {
        let path = root.join(relative);
        let entry = match Self::load_file(&path) {
            Ok(mesh) => {
                tracing::debug!(
                    ?handle,
                    path = %path.display(),
                    triangles = mesh.triangle_count(),
                    "mesh loaded"
                );
                Entry {
                    mesh,
                    source: MeshSource::File,
                }
            }
            Err(err) => {
                tracing::warn!(?handle, path = %path.display(), %err, "using proxy mesh");
                Entry {
                    mesh: MeshData::cube(proxy_half_extent),
                    source: MeshSource::Proxy {
                        reason: err.to_string(),
                    },
                }
            }
        };
        self.entries.insert(handle, entry);
        &self.entries[&handle].source
    }

    pub fn get(&self, handle: MeshHandle) -> Option<&MeshData> {
        self.entries.get(&handle).map(|e| &e.mesh)
    }

    pub fn source(&self, handle: MeshHandle) -> Option<&MeshSource> {
        self.entries.get(&handle).map(|e| &e.source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeshHandle, &MeshData)> {
        self.entries.iter().map(|(h, e)| (*h, &e.mesh))
    }

    pub fn handles(&self) -> impl Iterator<Item = MeshHandle> + '_ {
        self.entries.keys().copied()
    }

    pub fn proxy_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e.source, MeshSource::Proxy { .. }))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
