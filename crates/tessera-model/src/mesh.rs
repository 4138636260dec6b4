use std::sync::Arc;

use glam::Vec3;
use tessera_texture::Texture;

/// Sampler names follow the shader convention `texture_diffuseN`, `texture_specularN` and
/// `texture_normalN`. Flat materials use the `color_*` names.
pub mod texture_type {
    pub const TEXTURE_DIFFUSE: &str = "texture_diffuse";
    pub const TEXTURE_SPECULAR: &str = "texture_specular";
    pub const TEXTURE_NORMAL: &str = "texture_normal";
    pub const COLOR_DIFFUSE: &str = "color_diffuse";
    pub const COLOR_SPECULAR: &str = "color_specular";
}

/// Vertex layout shared by the renderer and the model cache.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub location: [f32; 4],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
    pub tangent: [f32; 3],
}

/// How one material channel of a mesh is drawn: either a sampled texture or a flat color.
#[derive(Debug, Clone)]
pub struct MeshTexture {
    ty: String,
    use_forced_color: bool,
    color: Vec3,
    texture: Option<Arc<Texture>>,
}

impl MeshTexture {
    pub fn sampled(ty: &str, texture: Arc<Texture>) -> Self {
        Self {
            ty: ty.to_owned(),
            use_forced_color: false,
            color: Vec3::ZERO,
            texture: Some(texture),
        }
    }

    pub fn flat_color(ty: &str, color: Vec3) -> Self {
        Self {
            ty: ty.to_owned(),
            use_forced_color: false,
            color,
            texture: None,
        }
    }

    /// Placeholder the renderer draws in a highly visible color.
    pub fn forced_color() -> Self {
        Self {
            ty: texture_type::COLOR_DIFFUSE.to_owned(),
            use_forced_color: true,
            color: Vec3::ZERO,
            texture: None,
        }
    }

    pub(crate) fn from_parts(
        ty: String,
        use_forced_color: bool,
        color: Vec3,
        texture: Option<Arc<Texture>>,
    ) -> Self {
        debug_assert!(!(use_forced_color && texture.is_some()));

        Self {
            ty,
            use_forced_color,
            color,
            texture,
        }
    }

    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub fn has_texture(&self) -> bool {
        self.texture.is_some()
    }

    pub fn use_forced_color(&self) -> bool {
        self.use_forced_color
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn texture(&self) -> Option<&Arc<Texture>> {
        self.texture.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub textures: Vec<MeshTexture>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>, textures: Vec<MeshTexture>) -> Self {
        Mesh {
            vertices,
            indices,
            textures,
        }
    }

    /// A mesh without any material representation has nothing to draw.
    pub fn is_invisible(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }
}
