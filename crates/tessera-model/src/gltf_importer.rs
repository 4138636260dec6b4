use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use glam::{Mat4, Vec2, Vec3, Vec4, Vec4Swizzles};
use gltf::material::AlphaMode;

use crate::scene::{
    EmbeddedTexture, MaterialChannel, Scene, SceneImporter, SceneMaterial, SceneMesh,
};

/// Reads `.gltf` and `.glb` files, including their external or embedded buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfImporter;

impl SceneImporter for GltfImporter {
    fn supports_extension(&self, extension: &str) -> bool {
        extension.eq_ignore_ascii_case("gltf") || extension.eq_ignore_ascii_case("glb")
    }

    fn import(&self, path: &Path) -> Result<Scene> {
        tessera_profiling::profile_function!();

        let gltf::Gltf { document, blob } = gltf::Gltf::open(path)?;
        let base_dir = path.parent().unwrap_or(Path::new(""));
        let buffers = gltf::import_buffers(&document, Some(base_dir), blob)?;

        let mut scene = Scene::new(base_dir);
        scene.embedded_textures = process_embedded_images(&document, &buffers)?;

        for material in document.materials() {
            scene.add_material(process_material(&material));
        }
        let default_material = scene.add_material(SceneMaterial {
            name: "Default".to_owned(),
            opacity: None,
            diffuse: MaterialChannel {
                color4: Some(Vec4::ONE),
                ..Default::default()
            },
            ..Default::default()
        });

        let mut mesh_primitives = vec![vec![]; document.meshes().len()];
        for mesh in document.meshes() {
            mesh_primitives[mesh.index()] =
                process_mesh(&mesh, &buffers, default_material, &mut scene)?;
        }

        let root = scene.add_node("Root", Mat4::IDENTITY, None);
        match document.default_scene().or_else(|| document.scenes().next()) {
            Some(gltf_scene) => {
                let mut visited = vec![false; document.nodes().len()];
                for node in gltf_scene.nodes() {
                    process_nodes_recursive(
                        &node,
                        root,
                        &mesh_primitives,
                        &mut visited,
                        &mut scene,
                    )?;
                }
            }
            None => scene.incomplete = true,
        }

        Ok(scene)
    }
}

/// Collects every image stored inside the file, either in a buffer view or as a base64 data
/// uri, as a compressed [`EmbeddedTexture`] named after its image index.
fn process_embedded_images(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<EmbeddedTexture>> {
    let mut embedded_textures = vec![];

    for image in document.images() {
        let (data, mime_type) = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let buffer = buffers.get(view.buffer().index()).ok_or_else(|| {
                    anyhow!("Image {} points at a missing buffer", image.index())
                })?;
                let data = buffer
                    .get(view.offset()..view.offset() + view.length())
                    .ok_or_else(|| anyhow!("Image {} lies outside of its buffer", image.index()))?;

                (data.to_vec(), mime_type)
            }
            gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
                decode_data_uri(uri).with_context(|| format!("Image {}", image.index()))?
            }
            gltf::image::Source::Uri { .. } => continue,
        };

        embedded_textures.push(EmbeddedTexture {
            name: embedded_name(image.index()),
            width: data.len() as u32,
            height: 0,
            format_hint: mime_type.rsplit('/').next().unwrap_or_default().to_owned(),
            data,
        });
    }

    Ok(embedded_textures)
}

/// Splits `data:<mime>;base64,<payload>` into the decoded payload and its mime type.
fn decode_data_uri(uri: &str) -> Result<(Vec<u8>, &str)> {
    let (header, payload) = uri
        .strip_prefix("data:")
        .and_then(|uri| uri.split_once(','))
        .ok_or_else(|| anyhow!("Data uri has no payload"))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| anyhow!("Data uri payload is not base64 encoded"))?;

    Ok((STANDARD.decode(payload)?, mime_type))
}

fn embedded_name(image_idx: usize) -> String {
    format!("*{image_idx}")
}

fn texture_reference(texture: &gltf::Texture) -> String {
    let image = texture.source();
    match image.source() {
        gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => uri.to_owned(),
        _ => embedded_name(image.index()),
    }
}

fn process_material(material: &gltf::Material) -> SceneMaterial {
    let pbr = material.pbr_metallic_roughness();
    let base_color = Vec4::from(pbr.base_color_factor());

    let mut scene_material = SceneMaterial {
        name: material.name().unwrap_or("Unnamed").to_owned(),
        opacity: (material.alpha_mode() != AlphaMode::Opaque).then_some(base_color.w),
        ..Default::default()
    };

    scene_material.diffuse.color4 = Some(base_color);
    if let Some(tex) = pbr.base_color_texture() {
        scene_material.diffuse.textures.push(texture_reference(&tex.texture()));
    }

    if let Some(specular) = material.specular() {
        scene_material.specular.color3 = Some(Vec3::from(specular.specular_color_factor()));
        if let Some(tex) = specular.specular_color_texture() {
            scene_material.specular.textures.push(texture_reference(&tex.texture()));
        }
    }

    if let Some(tex) = material.normal_texture() {
        scene_material.normal.textures.push(texture_reference(&tex.texture()));
    }

    scene_material
}

/// Adds one [`SceneMesh`] per triangle primitive and returns their indices.
fn process_mesh(
    mesh: &gltf::Mesh,
    buffers: &[gltf::buffer::Data],
    default_material: usize,
    scene: &mut Scene,
) -> Result<Vec<usize>> {
    let mesh_name = mesh.name().unwrap_or("Unnamed");
    let mut scene_meshes = vec![];

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "Primitive {} of mesh '{mesh_name}' is not made of triangles, skipping it.",
                primitive.index()
            );
            continue;
        }

        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

        let positions: Vec<Vec3> = reader
            .read_positions()
            .ok_or_else(|| anyhow!("Mesh '{mesh_name}' has a primitive without positions"))?
            .map(Vec3::from)
            .collect();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        if let Some(index) = indices.iter().find(|&&index| index as usize >= positions.len()) {
            bail!("Mesh '{mesh_name}' references vertex {index} out of range");
        }

        let scene_mesh = SceneMesh {
            name: format!("{mesh_name}#{}", primitive.index()),
            normals: reader
                .read_normals()
                .map(|normals| normals.map(Vec3::from).collect()),
            tex_coords: reader
                .read_tex_coords(0)
                .map(|tex_coords| tex_coords.into_f32().map(Vec2::from).collect()),
            tangents: reader
                .read_tangents()
                .map(|tangents| tangents.map(|tangent| Vec4::from(tangent).xyz()).collect()),
            faces: indices
                .chunks_exact(3)
                .map(|face| [face[0], face[1], face[2]])
                .collect(),
            material: primitive.material().index().unwrap_or(default_material),
            positions,
        };

        scene_meshes.push(scene.add_mesh(scene_mesh));
    }

    Ok(scene_meshes)
}

fn process_nodes_recursive(
    node: &gltf::Node,
    parent: usize,
    mesh_primitives: &[Vec<usize>],
    visited: &mut [bool],
    scene: &mut Scene,
) -> Result<()> {
    if std::mem::replace(&mut visited[node.index()], true) {
        bail!("Node {} appears more than once in the hierarchy", node.index());
    }

    let node_idx = scene.add_node(
        node.name().unwrap_or("Unnamed"),
        Mat4::from_cols_array_2d(&node.transform().matrix()),
        Some(parent),
    );
    if let Some(mesh) = node.mesh() {
        scene.nodes[node_idx].meshes = mesh_primitives[mesh.index()].clone();
    }

    for child in node.children() {
        process_nodes_recursive(&child, node_idx, mesh_primitives, visited, scene)?;
    }

    Ok(())
}
