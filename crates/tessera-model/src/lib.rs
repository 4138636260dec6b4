pub mod cache;
pub mod error;
pub mod flatten;
pub mod geometry;
pub mod gltf_importer;
pub mod material;
pub mod mesh;
pub mod mesh_builder;
pub mod reader;
pub mod scene;
pub mod texture_resolver;

#[cfg(test)]
mod test_utils;

pub use error::ModelError;
pub use flatten::ImportOptions;
pub use geometry::{ModelGeometry, TextureEntry};
pub use gltf_importer::GltfImporter;
pub use mesh::{Mesh, MeshTexture, Vertex};
pub use reader::ModelReader;
pub use scene::{Scene, SceneImporter};
