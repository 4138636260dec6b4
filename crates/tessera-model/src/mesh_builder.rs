use glam::{Mat4, Vec2, Vec3};
use tessera_texture::TextureDecoder;

use crate::{
    geometry::TextureEntry,
    material::resolve_material,
    mesh::{Mesh, Vertex},
    scene::{Scene, SceneMaterial, SceneMesh},
};

/// Bakes `transform` into the vertices of `mesh` and resolves its material.
///
/// A material with an opacity of exactly zero yields a mesh without textures, leaving it to
/// the caller to drop or force it.
pub fn build_mesh<D: TextureDecoder + ?Sized>(
    scene: &Scene,
    mesh: &SceneMesh,
    material: &SceneMaterial,
    transform: &Mat4,
    decoder: &D,
    texture_storage: &mut Vec<TextureEntry>,
) -> Mesh {
    tessera_profiling::profile_function!();

    let vertices = build_vertices(mesh, transform);
    let indices: Vec<u32> = mesh.faces.iter().flatten().copied().collect();
    let mut textures = vec![];

    if material.opacity == Some(0.0) {
        return Mesh::new(vertices, indices, textures);
    }

    if let Err(err) = resolve_material(scene, material, decoder, &mut textures, texture_storage) {
        log::debug!(
            "Material '{}' of mesh '{}' finished early: {err}",
            material.name,
            mesh.name
        );
    }

    textures.shrink_to_fit();
    Mesh::new(vertices, indices, textures)
}

fn build_vertices(mesh: &SceneMesh, transform: &Mat4) -> Vec<Vertex> {
    let attribute_at = |attribute: &Option<Vec<Vec3>>, i: usize| {
        attribute
            .as_ref()
            .and_then(|values| values.get(i))
            .copied()
            .unwrap_or(Vec3::ZERO)
    };

    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, position)| {
            let tex_coord = mesh
                .tex_coords
                .as_ref()
                .and_then(|tex_coords| tex_coords.get(i))
                .copied()
                .unwrap_or(Vec2::ZERO);

            Vertex {
                location: (*transform * position.extend(1.0)).to_array(),
                normal: attribute_at(&mesh.normals, i).to_array(),
                tex_coord: tex_coord.to_array(),
                tangent: attribute_at(&mesh.tangents, i).to_array(),
            }
        })
        .collect()
}
