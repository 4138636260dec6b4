use std::{
    cell::RefCell,
    env, fs,
    path::{Path, PathBuf},
};

use glam::{Vec2, Vec3};
use tessera_texture::{
    internal_format, DataType, Texture, TextureCreateDesc, TextureDecoder, TextureFormat,
    TextureLoadError,
};

use crate::{
    geometry::TextureEntry,
    scene::{SceneMaterial, SceneMesh},
};

/// Decoder that never touches the filesystem. File names steer the outcome: `missing*`
/// fails to decode, `*.xyz` has no decoder, `clear*` is fully transparent.
#[derive(Default)]
pub struct TestDecoder {
    file_calls: RefCell<Vec<PathBuf>>,
    memory_calls: RefCell<Vec<String>>,
}

impl TestDecoder {
    pub fn file_calls(&self) -> Vec<PathBuf> {
        self.file_calls.borrow().clone()
    }

    pub fn memory_calls(&self) -> Vec<String> {
        self.memory_calls.borrow().clone()
    }

    pub fn num_calls(&self) -> usize {
        self.file_calls.borrow().len() + self.memory_calls.borrow().len()
    }
}

impl TextureDecoder for TestDecoder {
    fn decode_memory(&self, _data: &[u8], format_hint: &str) -> Result<Texture, TextureLoadError> {
        self.memory_calls.borrow_mut().push(format_hint.to_owned());
        Ok(rgba_texture(2, 2, 255))
    }

    fn decode_file(&self, path: &Path) -> Result<Texture, TextureLoadError> {
        self.file_calls.borrow_mut().push(path.to_owned());

        let file = path.display().to_string();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();

        if path.extension().is_some_and(|extension| extension == "xyz") {
            Err(TextureLoadError::MissingDecoder {
                file,
                extension: "xyz".to_owned(),
            })
        } else if file_name.starts_with("missing") {
            Err(TextureLoadError::DecodeFailed {
                file,
                message: "file not found".to_owned(),
            })
        } else if file_name.starts_with("clear") {
            Ok(rgba_texture(2, 2, 0))
        } else {
            Ok(rgba_texture(2, 2, 255))
        }
    }
}

pub fn rgba_texture(width: u32, height: u32, alpha: u8) -> Texture {
    let data = [64, 128, 192, alpha].repeat((width * height) as usize);
    Texture::new(TextureCreateDesc {
        name: None,
        width,
        height,
        depth: 1,
        format: TextureFormat::Rgba,
        internal_format: internal_format::RGBA8,
        data_type: DataType::UnsignedByte,
        data: data.into_boxed_slice(),
    })
}

pub fn names(storage: &[TextureEntry]) -> Vec<&str> {
    storage.iter().map(|entry| entry.name.as_str()).collect()
}

/// Unit triangle in the XY plane with normals and texture coordinates.
pub fn triangle(name: &str, material: usize) -> SceneMesh {
    SceneMesh {
        name: name.to_owned(),
        positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        normals: Some(vec![Vec3::Z; 3]),
        tex_coords: Some(vec![Vec2::ZERO, Vec2::X, Vec2::Y]),
        tangents: None,
        faces: vec![[0, 1, 2]],
        material,
    }
}

pub fn textured_material(name: &str, diffuse: &[&str]) -> SceneMaterial {
    let mut material = SceneMaterial {
        name: name.to_owned(),
        ..Default::default()
    };
    material.diffuse.textures = diffuse.iter().map(|name| (*name).to_owned()).collect();
    material
}

// Three vec3 positions (0,0,0) (1,0,0) (0,1,0), then u16 indices 0 1 2 and padding.
const TRIANGLE_BUFFER: &str = concat!(
    "data:application/octet-stream;base64,",
    "AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAA="
);

/// Writes a glTF file with a `parent` node and a `child` translated by (1, 0, 0), both drawing
/// the same triangle. `extra` is appended to the top level object, `mesh_extra` to the primitive.
pub fn write_gltf(file_name: &str, extra: &str, mesh_extra: &str) -> PathBuf {
    let json = format!(
        r#"{{
            "asset": {{ "version": "2.0" }},
            "scene": 0,
            "scenes": [{{ "nodes": [0] }}],
            "nodes": [
                {{ "name": "parent", "mesh": 0, "children": [1] }},
                {{ "name": "child", "mesh": 0, "translation": [1.0, 0.0, 0.0] }}
            ],
            "meshes": [{{
                "name": "tri",
                "primitives": [{{
                    "attributes": {{ "POSITION": 0 }},
                    "indices": 1{mesh_extra}
                }}]
            }}],
            "accessors": [
                {{
                    "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                    "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
                }},
                {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
            ],
            "bufferViews": [
                {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
                {{ "buffer": 0, "byteOffset": 36, "byteLength": 6 }}
            ],
            "buffers": [{{ "byteLength": 44, "uri": "{TRIANGLE_BUFFER}" }}]{extra}
        }}"#
    );

    let path = env::temp_dir().join(format!("tessera-gltf-{}-{file_name}", std::process::id()));
    fs::write(&path, json).unwrap();
    path
}
