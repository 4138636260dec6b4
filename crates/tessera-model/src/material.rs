use glam::{Vec3, Vec4, Vec4Swizzles};
use tessera_texture::{TextureDecoder, TextureLoadError};

use crate::{
    geometry::TextureEntry,
    mesh::{texture_type, MeshTexture},
    scene::{MaterialChannel, Scene, SceneMaterial, TextureKind},
    texture_resolver::load_material_textures,
};

/// Channels are resolved in this order, a failing channel skips the ones after it.
pub const CHANNEL_ORDER: [TextureKind; 3] =
    [TextureKind::Diffuse, TextureKind::Specular, TextureKind::Normal];

const BLACK_EPSILON: f32 = 10e-3;

impl TextureKind {
    pub fn texture_type(&self) -> &'static str {
        match self {
            Self::Diffuse => texture_type::TEXTURE_DIFFUSE,
            Self::Specular => texture_type::TEXTURE_SPECULAR,
            Self::Normal => texture_type::TEXTURE_NORMAL,
        }
    }

    /// Name used when the channel falls back to a flat color, normals have no such fallback.
    pub fn color_type(&self) -> Option<&'static str> {
        match self {
            Self::Diffuse => Some(texture_type::COLOR_DIFFUSE),
            Self::Specular => Some(texture_type::COLOR_SPECULAR),
            Self::Normal => None,
        }
    }
}

/// Appends the textures or flat colors of `material` to `mesh_textures`.
///
/// Returns the load error of the first channel that failed. Whatever was collected up to and
/// including that channel's forced color stays on the mesh.
pub fn resolve_material<D: TextureDecoder + ?Sized>(
    scene: &Scene,
    material: &SceneMaterial,
    decoder: &D,
    mesh_textures: &mut Vec<MeshTexture>,
    texture_storage: &mut Vec<TextureEntry>,
) -> Result<(), TextureLoadError> {
    for kind in CHANNEL_ORDER {
        let channel = material.channel(kind);

        if !channel.textures.is_empty() {
            load_material_textures(
                scene,
                &channel.textures,
                kind.texture_type(),
                decoder,
                mesh_textures,
                texture_storage,
            )?;
        } else if let (Some(ty), Some(color)) = (kind.color_type(), flat_color(kind, channel)) {
            mesh_textures.push(MeshTexture::flat_color(ty, color));
        }
    }

    Ok(())
}

fn flat_color(kind: TextureKind, channel: &MaterialChannel) -> Option<Vec3> {
    match kind {
        TextureKind::Diffuse => match channel.color4 {
            Some(color) => visible(color),
            None => channel.color3,
        },
        TextureKind::Specular => match channel.color4.filter(|color| !is_black(color.xyz())) {
            Some(color) => visible(color),
            None => channel.color3.filter(|color| !is_black(*color)),
        },
        TextureKind::Normal => None,
    }
}

fn visible(color: Vec4) -> Option<Vec3> {
    (color.w != 0.0).then(|| color.xyz())
}

fn is_black(color: Vec3) -> bool {
    color.abs().max_element() < BLACK_EPSILON
}
