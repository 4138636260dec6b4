use glam::Mat4;
use tessera_texture::TextureDecoder;

use crate::{
    geometry::{ModelGeometry, TextureEntry},
    mesh::{Mesh, MeshTexture},
    mesh_builder::build_mesh,
    scene::Scene,
};

/// What to do with meshes that end up without any material representation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Keep invisible meshes, drawn with a forced color.
    pub force_render_invisible: bool,
    /// Log the name of every invisible mesh that gets dropped.
    pub notify_invisible_dropped: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum FlattenError {
    #[error("scene is incomplete")]
    Incomplete,

    #[error("scene has no root node")]
    Rootless,

    #[error("node index {0} is out of range")]
    NodeOutOfRange(usize),

    #[error("node {0} is reachable more than once")]
    NodeRevisited(usize),

    #[error("mesh index {mesh} of node '{node}' is out of range")]
    MeshOutOfRange { node: String, mesh: usize },

    #[error("material index {material} of mesh '{mesh}' is out of range")]
    MaterialOutOfRange { mesh: String, material: usize },
}

/// Walks the node hierarchy depth first and produces one mesh per node mesh reference, with
/// the accumulated node transforms applied to the vertices.
pub fn flatten_scene<D: TextureDecoder + ?Sized>(
    scene: &Scene,
    decoder: &D,
    options: ImportOptions,
) -> Result<ModelGeometry, FlattenError> {
    tessera_profiling::profile_function!();

    if scene.incomplete {
        return Err(FlattenError::Incomplete);
    }
    let root = scene.root.ok_or(FlattenError::Rootless)?;

    let mut meshes = Vec::with_capacity(scene.meshes.len());
    let mut texture_storage = Vec::with_capacity(scene.embedded_textures.len());
    let mut visited = vec![false; scene.nodes.len()];

    process_node_recursive(
        scene,
        root,
        &Mat4::IDENTITY,
        decoder,
        options,
        &mut meshes,
        &mut texture_storage,
        &mut visited,
    )?;

    Ok(ModelGeometry::new(meshes, texture_storage))
}

#[allow(clippy::too_many_arguments)]
fn process_node_recursive<D: TextureDecoder + ?Sized>(
    scene: &Scene,
    node_idx: usize,
    parent_transform: &Mat4,
    decoder: &D,
    options: ImportOptions,
    meshes: &mut Vec<Mesh>,
    texture_storage: &mut Vec<TextureEntry>,
    visited: &mut [bool],
) -> Result<(), FlattenError> {
    let node = scene
        .nodes
        .get(node_idx)
        .ok_or(FlattenError::NodeOutOfRange(node_idx))?;
    if std::mem::replace(&mut visited[node_idx], true) {
        return Err(FlattenError::NodeRevisited(node_idx));
    }

    let global_transform = *parent_transform * node.local_transform;

    for &mesh_idx in &node.meshes {
        let source = scene
            .meshes
            .get(mesh_idx)
            .ok_or_else(|| FlattenError::MeshOutOfRange {
                node: node.name.clone(),
                mesh: mesh_idx,
            })?;
        let material = scene.materials.get(source.material).ok_or_else(|| {
            FlattenError::MaterialOutOfRange {
                mesh: source.name.clone(),
                material: source.material,
            }
        })?;

        let mut mesh = build_mesh(
            scene,
            source,
            material,
            &global_transform,
            decoder,
            texture_storage,
        );

        if mesh.is_invisible() {
            if options.force_render_invisible {
                mesh.textures.push(MeshTexture::forced_color());
            } else {
                if options.notify_invisible_dropped {
                    log::info!("Invisible mesh '{}' dropped", source.name);
                }
                continue;
            }
        }

        meshes.push(mesh);
    }

    for &child_idx in &node.children {
        process_node_recursive(
            scene,
            child_idx,
            &global_transform,
            decoder,
            options,
            meshes,
            texture_storage,
            visited,
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::{Vec3, Vec4};

    use super::*;
    use crate::{
        mesh::texture_type,
        scene::SceneMaterial,
        test_utils::{names, textured_material, triangle, TestDecoder},
    };

    fn flatten(scene: &Scene, options: ImportOptions) -> ModelGeometry {
        flatten_scene(scene, &TestDecoder::default(), options).unwrap()
    }

    fn invisible_scene() -> Scene {
        let mut scene = Scene::new("models");
        let visible = scene.add_material(textured_material("wood", &["wood.png"]));
        let hidden = scene.add_material(SceneMaterial {
            name: "hidden".to_owned(),
            opacity: Some(0.0),
            ..Default::default()
        });
        let root = scene.add_node("root", Mat4::IDENTITY, None);
        let a = scene.add_mesh(triangle("a", visible));
        let b = scene.add_mesh(triangle("b", hidden));
        let c = scene.add_mesh(triangle("c", visible));
        scene.nodes[root].meshes = vec![a, b, c];
        scene
    }

    #[test]
    fn child_inherits_parent_transform() {
        let mut scene = Scene::new("models");
        let material = scene.add_material(textured_material("wood", &["wood.png"]));
        let root = scene.add_node("root", Mat4::IDENTITY, None);
        let child = scene.add_node("child", Mat4::from_translation(Vec3::X), Some(root));
        scene.nodes[root].meshes = vec![scene.add_mesh(triangle("root_mesh", material))];
        scene.nodes[child].meshes = vec![scene.add_mesh(triangle("child_mesh", material))];

        let decoder = TestDecoder::default();
        let geometry = flatten_scene(&scene, &decoder, ImportOptions::default()).unwrap();

        assert_eq!(geometry.meshes().len(), 2);
        assert_eq!(names(geometry.texture_storage()), vec!["wood.png"]);
        assert_eq!(decoder.num_calls(), 1);

        let storage_texture = &geometry.texture_storage()[0].texture;
        for mesh in geometry.meshes() {
            assert_eq!(mesh.textures.len(), 1);
            assert!(Arc::ptr_eq(mesh.textures[0].texture().unwrap(), storage_texture));
        }

        let (root_mesh, child_mesh) = (&geometry.meshes()[0], &geometry.meshes()[1]);
        for (root_vertex, child_vertex) in root_mesh.vertices.iter().zip(&child_mesh.vertices) {
            let offset = Vec4::from(child_vertex.location) - Vec4::from(root_vertex.location);
            assert_eq!(offset, Vec4::new(1.0, 0.0, 0.0, 0.0));
        }
        assert_eq!(root_mesh.vertices[1].location, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn transforms_compose_parent_first() {
        let mut scene = Scene::new("models");
        let material = scene.add_material(textured_material("wood", &["wood.png"]));
        let root = scene.add_node("root", Mat4::from_scale(Vec3::splat(2.0)), None);
        let child = scene.add_node("child", Mat4::from_translation(Vec3::X), Some(root));
        scene.nodes[child].meshes = vec![scene.add_mesh(triangle("mesh", material))];

        let geometry = flatten(&scene, ImportOptions::default());

        let origin = geometry.meshes()[0].vertices[0].location;
        assert_eq!(origin, [2.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn traversal_is_depth_first() {
        let mut scene = Scene::new("models");
        let material = scene.add_material(textured_material("wood", &["wood.png"]));
        let root = scene.add_node("root", Mat4::IDENTITY, None);
        let left = scene.add_node("left", Mat4::IDENTITY, Some(root));
        let left_leaf = scene.add_node("left_leaf", Mat4::IDENTITY, Some(left));
        let right = scene.add_node("right", Mat4::IDENTITY, Some(root));
        for (node, z) in [(root, 0.0), (left, 1.0), (left_leaf, 2.0), (right, 3.0)] {
            let mut mesh = triangle("mesh", material);
            mesh.positions.iter_mut().for_each(|p| p.z = z);
            scene.nodes[node].meshes = vec![scene.add_mesh(mesh)];
        }

        let geometry = flatten(&scene, ImportOptions::default());

        let order: Vec<f32> = geometry
            .meshes()
            .iter()
            .map(|mesh| mesh.vertices[0].location[2])
            .collect();
        assert_eq!(order, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn invisible_meshes_are_dropped_by_default() {
        let geometry = flatten(
            &invisible_scene(),
            ImportOptions {
                force_render_invisible: false,
                notify_invisible_dropped: true,
            },
        );

        assert_eq!(geometry.meshes().len(), 2);
        assert!(geometry.meshes().iter().all(|mesh| !mesh.is_invisible()));
    }

    #[test]
    fn invisible_meshes_can_be_forced() {
        let geometry = flatten(
            &invisible_scene(),
            ImportOptions {
                force_render_invisible: true,
                notify_invisible_dropped: false,
            },
        );

        assert_eq!(geometry.meshes().len(), 3);
        let forced = &geometry.meshes()[1].textures;
        assert_eq!(forced.len(), 1);
        assert!(forced[0].use_forced_color());
        assert!(!forced[0].has_texture());
        assert_eq!(forced[0].ty(), texture_type::COLOR_DIFFUSE);
    }

    #[test]
    fn same_mesh_on_two_nodes_is_built_twice() {
        let mut scene = Scene::new("models");
        let material = scene.add_material(textured_material("wood", &["wood.png"]));
        let mesh = scene.add_mesh(triangle("shared", material));
        let root = scene.add_node("root", Mat4::IDENTITY, None);
        let child = scene.add_node("child", Mat4::from_translation(Vec3::Y), Some(root));
        scene.nodes[root].meshes = vec![mesh];
        scene.nodes[child].meshes = vec![mesh];

        let geometry = flatten(&scene, ImportOptions::default());

        assert_eq!(geometry.meshes().len(), 2);
        assert_eq!(geometry.texture_storage().len(), 1);
        assert_eq!(geometry.meshes()[1].vertices[0].location, [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn rootless_and_incomplete_scenes_fail() {
        let scene = Scene::new("models");
        assert!(matches!(
            flatten_scene(&scene, &TestDecoder::default(), ImportOptions::default()),
            Err(FlattenError::Rootless)
        ));

        let mut scene = invisible_scene();
        scene.incomplete = true;
        assert!(matches!(
            flatten_scene(&scene, &TestDecoder::default(), ImportOptions::default()),
            Err(FlattenError::Incomplete)
        ));
    }

    #[test]
    fn malformed_arena_is_rejected() {
        let mut scene = invisible_scene();
        scene.nodes[0].meshes.push(42);
        assert!(matches!(
            flatten_scene(&scene, &TestDecoder::default(), ImportOptions::default()),
            Err(FlattenError::MeshOutOfRange { mesh: 42, .. })
        ));

        let mut scene = invisible_scene();
        scene.nodes[0].children.push(0);
        assert!(matches!(
            flatten_scene(&scene, &TestDecoder::default(), ImportOptions::default()),
            Err(FlattenError::NodeRevisited(0))
        ));

        let mut scene = invisible_scene();
        scene.meshes[0].material = 9;
        assert!(matches!(
            flatten_scene(&scene, &TestDecoder::default(), ImportOptions::default()),
            Err(FlattenError::MaterialOutOfRange { material: 9, .. })
        ));
    }
}
