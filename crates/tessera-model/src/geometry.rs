use std::sync::Arc;

use tessera_texture::Texture;

use crate::mesh::Mesh;

/// One decoded texture shared by every mesh that references `name`.
#[derive(Debug, Clone)]
pub struct TextureEntry {
    pub name: String,
    pub texture: Arc<Texture>,
}

/// Flattened, renderer ready result of an import or a cache load.
#[derive(Debug, Clone, Default)]
pub struct ModelGeometry {
    meshes: Vec<Mesh>,
    texture_storage: Vec<TextureEntry>,
}

impl ModelGeometry {
    pub fn new(meshes: Vec<Mesh>, texture_storage: Vec<TextureEntry>) -> Self {
        Self {
            meshes,
            texture_storage,
        }
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn texture_storage(&self) -> &[TextureEntry] {
        &self.texture_storage
    }

    /// First storage slot whose name equals `name`.
    pub fn texture_index(&self, name: &str) -> Option<usize> {
        self.texture_storage.iter().position(|entry| entry.name == name)
    }

    pub fn num_vertices(&self) -> usize {
        self.meshes.iter().map(|mesh| mesh.vertices.len()).sum()
    }

    pub fn num_triangles(&self) -> usize {
        self.meshes.iter().map(Mesh::num_triangles).sum()
    }
}
