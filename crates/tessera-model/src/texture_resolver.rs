use std::sync::Arc;

use tessera_texture::{Texture, TextureDecoder, TextureLoadError};

use crate::{geometry::TextureEntry, mesh::MeshTexture, scene::Scene};

/// Resolves every texture referenced by one material channel into `mesh_textures`.
///
/// References already present on the mesh are skipped, references already decoded for
/// another mesh are shared from `texture_storage`. Only new, visible textures are decoded
/// and added to the storage. The first texture that fails to load is replaced by a forced
/// color and ends the whole channel; its error is returned so the caller can stop too.
pub fn load_material_textures<D: TextureDecoder + ?Sized>(
    scene: &Scene,
    references: &[String],
    ty: &str,
    decoder: &D,
    mesh_textures: &mut Vec<MeshTexture>,
    texture_storage: &mut Vec<TextureEntry>,
) -> Result<(), TextureLoadError> {
    tessera_profiling::profile_function!();

    for reference in references {
        let already_on_mesh = mesh_textures
            .iter()
            .filter_map(MeshTexture::texture)
            .any(|texture| texture.name() == reference);
        if already_on_mesh {
            continue;
        }

        if let Some(entry) = texture_storage.iter().find(|entry| entry.name == *reference) {
            mesh_textures.push(MeshTexture::sampled(ty, entry.texture.clone()));
            continue;
        }

        let mut texture = match load_texture(scene, reference, decoder) {
            Ok(texture) => texture,
            Err(err) => {
                log::warn!("{err}: replacing '{reference}' with forced color.");
                mesh_textures.push(MeshTexture::forced_color());
                return Err(err);
            }
        };
        texture.set_name(reference);

        if texture.is_fully_transparent() {
            log::debug!("Texture '{reference}' is fully transparent, skipping it.");
            continue;
        }

        let texture = Arc::new(texture);
        mesh_textures.push(MeshTexture::sampled(ty, texture.clone()));
        texture_storage.push(TextureEntry {
            name: reference.clone(),
            texture,
        });
    }

    Ok(())
}

fn load_texture<D: TextureDecoder + ?Sized>(
    scene: &Scene,
    reference: &str,
    decoder: &D,
) -> Result<Texture, TextureLoadError> {
    match scene.embedded_texture(reference) {
        Some(embedded) if embedded.is_compressed() => {
            decoder.decode_memory(&embedded.data, &embedded.format_hint)
        }
        Some(embedded) => Err(TextureLoadError::UncompressedEmbedded {
            name: embedded.name.clone(),
        }),
        None => decoder.decode_file(&scene.base_dir.join(reference)),
    }
}
