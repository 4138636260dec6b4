use std::path::{Path, PathBuf};

use anyhow::Result;
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Node of the imported hierarchy. Nodes live in [`Scene::nodes`] and refer to each other by
/// index, `parent` is -1 for the root.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub local_transform: Mat4,
    pub parent: i32,
    pub children: Vec<usize>,
    pub meshes: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub tex_coords: Option<Vec<Vec2>>,
    pub tangents: Option<Vec<Vec3>>,
    pub faces: Vec<[u32; 3]>,
    pub material: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
    Specular,
    Normal,
}

/// Texture references and flat color attributes of one material channel.
#[derive(Debug, Clone, Default)]
pub struct MaterialChannel {
    pub textures: Vec<String>,
    pub color4: Option<Vec4>,
    pub color3: Option<Vec3>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneMaterial {
    pub name: String,
    pub opacity: Option<f32>,
    pub diffuse: MaterialChannel,
    pub specular: MaterialChannel,
    pub normal: MaterialChannel,
}

impl SceneMaterial {
    pub fn channel(&self, kind: TextureKind) -> &MaterialChannel {
        match kind {
            TextureKind::Diffuse => &self.diffuse,
            TextureKind::Specular => &self.specular,
            TextureKind::Normal => &self.normal,
        }
    }
}

/// Texture bytes stored inside the model file. A `height` of 0 means `data` is a compressed
/// image of `width` bytes, anything else is raw texels.
#[derive(Debug, Clone)]
pub struct EmbeddedTexture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format_hint: String,
    pub data: Vec<u8>,
}

impl EmbeddedTexture {
    pub fn is_compressed(&self) -> bool {
        self.height == 0
    }
}

/// Everything an importer extracted from a model file, before flattening.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub nodes: Vec<Node>,
    pub root: Option<usize>,
    pub incomplete: bool,
    pub meshes: Vec<SceneMesh>,
    pub materials: Vec<SceneMaterial>,
    pub embedded_textures: Vec<EmbeddedTexture>,
    pub base_dir: PathBuf,
}

impl Scene {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    /// Appends a node below `parent`. The first node added without a parent becomes the root.
    pub fn add_node(&mut self, name: &str, local_transform: Mat4, parent: Option<usize>) -> usize {
        let node_idx = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_owned(),
            local_transform,
            parent: parent.map_or(-1, |parent| parent as i32),
            children: vec![],
            meshes: vec![],
        });

        match parent {
            Some(parent) => self.nodes[parent].children.push(node_idx),
            None => {
                self.root.get_or_insert(node_idx);
            }
        }

        node_idx
    }

    pub fn add_mesh(&mut self, mesh: SceneMesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn add_material(&mut self, material: SceneMaterial) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Looks up embedded data by the name the importer stored it under.
    pub fn embedded_texture(&self, name: &str) -> Option<&EmbeddedTexture> {
        self.embedded_textures
            .iter()
            .find(|texture| texture.name == name)
    }
}

/// Parses a model file into a [`Scene`].
pub trait SceneImporter {
    fn supports_extension(&self, extension: &str) -> bool;

    fn import(&self, path: &Path) -> Result<Scene>;
}
