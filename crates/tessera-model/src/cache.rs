use std::{
    io::{self, Read, Write},
    mem::size_of,
    sync::Arc,
};

use glam::{UVec3, Vec3};
use tessera_texture::{expected_data_size, DataType, Texture, TextureCreateDesc, TextureFormat};

use crate::{
    geometry::{ModelGeometry, TextureEntry},
    mesh::{Mesh, MeshTexture, Vertex},
};

pub const CURRENT_CACHE_VERSION: i8 = 1;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The bytes do not describe a valid cache.
    #[error("{0}")]
    Corrupt(String),

    /// The geometry cannot be represented in the cache.
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Serializes `geometry` into `writer`. Nothing is written when the geometry is rejected.
pub fn write_cache<W: Write>(mut writer: W, geometry: &ModelGeometry) -> Result<(), CacheError> {
    let bytes = encode(geometry)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

pub fn read_cache<R: Read>(reader: R) -> Result<ModelGeometry, CacheError> {
    tessera_profiling::profile_function!();

    let mut reader = CacheReader { inner: reader };

    let version = reader.read_i8()?;
    if version != CURRENT_CACHE_VERSION {
        return Err(CacheError::Corrupt(format!(
            "The format of the cached file has changed \
             (version {version}, expected {CURRENT_CACHE_VERSION})"
        )));
    }

    let num_entries = reader.read_count("texture entries", true)?;
    if num_entries == 0 {
        log::info!("No texture entries were loaded");
    }
    let mut texture_storage = Vec::with_capacity(num_entries.min(1024));
    for _ in 0..num_entries {
        texture_storage.push(reader.read_texture_entry()?);
    }

    let num_meshes = reader.read_count("meshes", false)?;
    let mut meshes = Vec::with_capacity(num_meshes.min(1024));
    for _ in 0..num_meshes {
        meshes.push(reader.read_mesh(&texture_storage)?);
    }

    Ok(ModelGeometry::new(meshes, texture_storage))
}

pub fn encode(geometry: &ModelGeometry) -> Result<Vec<u8>, CacheError> {
    tessera_profiling::profile_function!();

    let mut writer = CacheWriter { bytes: vec![] };
    writer.write_i8(CURRENT_CACHE_VERSION);

    let texture_storage = geometry.texture_storage();
    if texture_storage.is_empty() {
        log::info!("No texture entries were written");
    }
    writer.write_count(texture_storage.len(), "texture entries", true)?;
    for entry in texture_storage {
        writer.write_texture_entry(entry)?;
    }

    writer.write_count(geometry.meshes().len(), "meshes", false)?;
    for mesh in geometry.meshes() {
        writer.write_mesh(mesh, geometry)?;
    }

    Ok(writer.bytes)
}

pub fn decode(bytes: &[u8]) -> Result<ModelGeometry, CacheError> {
    read_cache(bytes)
}

struct CacheWriter {
    bytes: Vec<u8>,
}

impl CacheWriter {
    fn write_i8(&mut self, value: i8) {
        self.bytes.extend_from_slice(&value.to_ne_bytes());
    }

    fn write_i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_ne_bytes());
    }

    fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_ne_bytes());
    }

    fn write_f32(&mut self, value: f32) {
        self.bytes.extend_from_slice(&value.to_ne_bytes());
    }

    fn write_bool(&mut self, value: bool) {
        self.bytes.push(value as u8);
    }

    fn write_count(
        &mut self,
        count: usize,
        what: &str,
        allow_zero: bool,
    ) -> Result<(), CacheError> {
        if count == 0 && !allow_zero {
            return Err(CacheError::Invalid(format!("No {what} to write")));
        }
        let count = i32::try_from(count)
            .map_err(|_| CacheError::Invalid(format!("Too many {what} ({count})")))?;
        self.write_i32(count);
        Ok(())
    }

    fn write_string(&mut self, value: &str, what: &str) -> Result<(), CacheError> {
        self.write_count(value.len(), what, false)?;
        self.bytes.extend_from_slice(value.as_bytes());
        Ok(())
    }

    fn write_dimension(&mut self, value: u32) -> Result<(), CacheError> {
        let value = i32::try_from(value)
            .map_err(|_| CacheError::Invalid(format!("Texture dimension {value} is too large")))?;
        self.write_i32(value);
        Ok(())
    }

    fn write_texture_entry(&mut self, entry: &TextureEntry) -> Result<(), CacheError> {
        let texture = &entry.texture;

        self.write_string(&entry.name, "texture name bytes")?;
        self.write_dimension(texture.width())?;
        self.write_dimension(texture.height())?;
        self.write_dimension(texture.depth())?;
        self.bytes.extend_from_slice(&texture.format().code());
        self.write_u32(texture.internal_format());
        self.bytes.extend_from_slice(&texture.data_type().code());

        self.write_count(texture.data().len(), "pixel bytes", false)?;
        self.bytes.extend_from_slice(texture.data());
        Ok(())
    }

    fn write_mesh(&mut self, mesh: &Mesh, geometry: &ModelGeometry) -> Result<(), CacheError> {
        self.write_count(mesh.vertices.len(), "vertices", false)?;
        self.bytes.extend_from_slice(bytemuck::cast_slice(&mesh.vertices));

        self.write_count(mesh.indices.len(), "indices", false)?;
        self.bytes.extend_from_slice(bytemuck::cast_slice(&mesh.indices));

        self.write_count(mesh.textures.len(), "mesh textures", false)?;
        for mesh_texture in &mesh.textures {
            self.write_string(mesh_texture.ty(), "texture type bytes")?;
            self.write_bool(mesh_texture.has_texture());
            self.write_bool(mesh_texture.use_forced_color());
            for component in mesh_texture.color().to_array() {
                self.write_f32(component);
            }

            if let Some(texture) = mesh_texture.texture() {
                let index = geometry.texture_index(texture.name()).ok_or_else(|| {
                    CacheError::Invalid(format!(
                        "Texture '{}' is not part of the texture storage",
                        texture.name()
                    ))
                })?;
                self.write_u32(index as u32);
            }
        }

        Ok(())
    }
}

struct CacheReader<R> {
    inner: R,
}

impl<R: Read> CacheReader<R> {
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CacheError> {
        let mut bytes = [0; N];
        self.inner.read_exact(&mut bytes).map_err(eof_as_corrupt)?;
        Ok(bytes)
    }

    /// Reads exactly `len` bytes without trusting `len` for the allocation up front.
    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, CacheError> {
        let mut bytes = vec![];
        self.inner
            .by_ref()
            .take(len as u64)
            .read_to_end(&mut bytes)?;
        if bytes.len() != len {
            return Err(unexpected_end());
        }
        Ok(bytes)
    }

    fn read_i8(&mut self) -> Result<i8, CacheError> {
        Ok(i8::from_ne_bytes(self.read_array()?))
    }

    fn read_i32(&mut self) -> Result<i32, CacheError> {
        Ok(i32::from_ne_bytes(self.read_array()?))
    }

    fn read_u32(&mut self) -> Result<u32, CacheError> {
        Ok(u32::from_ne_bytes(self.read_array()?))
    }

    fn read_f32(&mut self) -> Result<f32, CacheError> {
        Ok(f32::from_ne_bytes(self.read_array()?))
    }

    fn read_bool(&mut self) -> Result<bool, CacheError> {
        match self.read_array::<1>()? {
            [0] => Ok(false),
            [1] => Ok(true),
            [other] => Err(CacheError::Corrupt(format!("Invalid boolean byte {other}"))),
        }
    }

    fn read_count(&mut self, what: &str, allow_zero: bool) -> Result<usize, CacheError> {
        let count = self.read_i32()?;
        if count < 0 {
            return Err(CacheError::Corrupt(format!("Negative number of {what} ({count})")));
        }
        if count == 0 && !allow_zero {
            return Err(CacheError::Corrupt(format!("No {what} were loaded")));
        }
        Ok(count as usize)
    }

    fn read_string(&mut self, what: &str) -> Result<String, CacheError> {
        let len = self.read_count(what, false)?;
        String::from_utf8(self.read_bytes(len)?)
            .map_err(|_| CacheError::Corrupt(format!("Invalid UTF-8 in {what}")))
    }

    fn read_dimension(&mut self) -> Result<u32, CacheError> {
        let value = self.read_i32()?;
        u32::try_from(value)
            .map_err(|_| CacheError::Corrupt(format!("Negative texture dimension {value}")))
    }

    fn read_texture_entry(&mut self) -> Result<TextureEntry, CacheError> {
        let name = self.read_string("texture name bytes")?;
        let width = self.read_dimension()?;
        let height = self.read_dimension()?;
        let depth = self.read_dimension()?;

        let format_code = self.read_array()?;
        let format = TextureFormat::from_code(&format_code).ok_or_else(|| {
            CacheError::Corrupt(format!(
                "Unknown texture format '{}'",
                String::from_utf8_lossy(&format_code)
            ))
        })?;
        let internal_format = self.read_u32()?;
        let data_type_code = self.read_array()?;
        let data_type = DataType::from_code(&data_type_code).ok_or_else(|| {
            CacheError::Corrupt(format!(
                "Unknown texture data type '{}'",
                String::from_utf8_lossy(&data_type_code)
            ))
        })?;

        let num_bytes = self.read_count("pixel bytes", false)?;
        let expected = expected_data_size(UVec3::new(width, height, depth), format, data_type);
        if num_bytes != expected {
            return Err(CacheError::Corrupt(format!(
                "Texture '{name}' holds {num_bytes} pixel bytes, its dimensions require {expected}"
            )));
        }
        let data = self.read_bytes(num_bytes)?;

        let texture = Texture::new(TextureCreateDesc {
            name: Some(name.clone()),
            width,
            height,
            depth,
            format,
            internal_format,
            data_type,
            data: data.into_boxed_slice(),
        });

        Ok(TextureEntry {
            name,
            texture: Arc::new(texture),
        })
    }

    fn read_mesh(&mut self, texture_storage: &[TextureEntry]) -> Result<Mesh, CacheError> {
        let num_vertices = self.read_count("vertices", false)?;
        let vertex_bytes = self.read_bytes(byte_len::<Vertex>(num_vertices)?)?;
        let vertices: Vec<Vertex> = bytemuck::pod_collect_to_vec(&vertex_bytes);

        let num_indices = self.read_count("indices", false)?;
        let index_bytes = self.read_bytes(byte_len::<u32>(num_indices)?)?;
        let indices: Vec<u32> = bytemuck::pod_collect_to_vec(&index_bytes);

        let num_textures = self.read_count("mesh textures", false)?;
        let mut textures = Vec::with_capacity(num_textures.min(16));
        for _ in 0..num_textures {
            textures.push(self.read_mesh_texture(texture_storage)?);
        }

        Ok(Mesh::new(vertices, indices, textures))
    }

    fn read_mesh_texture(
        &mut self,
        texture_storage: &[TextureEntry],
    ) -> Result<MeshTexture, CacheError> {
        let ty = self.read_string("texture type bytes")?;
        let has_texture = self.read_bool()?;
        let use_forced_color = self.read_bool()?;
        if has_texture && use_forced_color {
            return Err(CacheError::Corrupt(format!(
                "Texture '{ty}' is both sampled and forced color"
            )));
        }
        let color = Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?);

        let texture = if has_texture {
            let index = self.read_u32()? as usize;
            let entry = texture_storage.get(index).ok_or_else(|| {
                CacheError::Corrupt("Texture index is outside of texture storage".to_owned())
            })?;
            Some(entry.texture.clone())
        } else {
            None
        };

        Ok(MeshTexture::from_parts(ty, use_forced_color, color, texture))
    }
}

fn byte_len<T>(count: usize) -> Result<usize, CacheError> {
    count
        .checked_mul(size_of::<T>())
        .ok_or_else(|| CacheError::Corrupt(format!("Record count {count} is too large")))
}

fn unexpected_end() -> CacheError {
    CacheError::Corrupt("Unexpected end of cache".to_owned())
}

fn eof_as_corrupt(err: io::Error) -> CacheError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        unexpected_end()
    } else {
        CacheError::Io(err)
    }
}
