use std::{
    fs::{self, File},
    io::BufReader,
    path::Path,
};

use tessera_texture::{ImageDecoder, TextureDecoder};

use crate::{
    cache::{self, CacheError},
    error::ModelError,
    flatten::{flatten_scene, ImportOptions},
    geometry::ModelGeometry,
    gltf_importer::GltfImporter,
    scene::SceneImporter,
};

/// Model file extensions the import pipeline is meant to handle. Which of them actually load
/// depends on the [`SceneImporter`] in use.
pub const SUPPORTED_EXTENSIONS: [&str; 22] = [
    "fbx", "dae", "gltf", "glb", "blend", "3ds", "ase", "obj", "ifc", "xgl", "zgl", "ply", "dxf",
    "lwo", "lws", "lxo", "stl", "x", "ac", "ms3d", "cob", "scn",
];

/// Entry point for importing model files and for reading and writing their binary cache.
pub struct ModelReader<I = GltfImporter, D = ImageDecoder> {
    importer: I,
    decoder: D,
}

impl ModelReader {
    pub fn new() -> Self {
        Self::with(GltfImporter, ImageDecoder)
    }
}

impl Default for ModelReader {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: SceneImporter, D: TextureDecoder> ModelReader<I, D> {
    pub fn with(importer: I, decoder: D) -> Self {
        Self { importer, decoder }
    }

    pub fn importer(&self) -> &I {
        &self.importer
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn supported_extensions(&self) -> &'static [&'static str] {
        &SUPPORTED_EXTENSIONS
    }

    pub fn load_model(
        &self,
        path: impl AsRef<Path>,
        force_render_invisible: bool,
        notify_invisible_dropped: bool,
    ) -> Result<ModelGeometry, ModelError> {
        self.load_model_with_options(
            path,
            ImportOptions {
                force_render_invisible,
                notify_invisible_dropped,
            },
        )
    }

    pub fn load_model_with_options(
        &self,
        path: impl AsRef<Path>,
        options: ImportOptions,
    ) -> Result<ModelGeometry, ModelError> {
        tessera_profiling::profile_function!();

        let path = path.as_ref();
        let import_error = |message: String| ModelError::Import {
            path: path.to_owned(),
            message,
        };

        let scene = self
            .importer
            .import(path)
            .map_err(|err| import_error(format!("{err:#}")))?;
        let geometry = flatten_scene(&scene, &self.decoder, options)
            .map_err(|err| import_error(err.to_string()))?;

        log::debug!(
            "Imported '{}': {} meshes, {} textures, {} triangles",
            path.display(),
            geometry.meshes().len(),
            geometry.texture_storage().len(),
            geometry.num_triangles()
        );
        Ok(geometry)
    }

    pub fn load_cached_file(&self, path: impl AsRef<Path>) -> Result<ModelGeometry, ModelError> {
        tessera_profiling::profile_function!();

        let path = path.as_ref();
        let file = File::open(path).map_err(|err| ModelError::CacheRead {
            path: path.to_owned(),
            message: err.to_string(),
        })?;

        let geometry = cache::read_cache(BufReader::new(file)).map_err(|err| match err {
            CacheError::Corrupt(message) | CacheError::Invalid(message) => {
                ModelError::CacheCorruption {
                    path: path.to_owned(),
                    message,
                }
            }
            CacheError::Io(err) => ModelError::CacheRead {
                path: path.to_owned(),
                message: err.to_string(),
            },
        })?;

        log::debug!(
            "Loaded cache '{}': {} meshes, {} textures",
            path.display(),
            geometry.meshes().len(),
            geometry.texture_storage().len()
        );
        Ok(geometry)
    }

    /// Writes `geometry` to `path`. The file is left untouched when the geometry cannot be
    /// cached.
    pub fn save_cached_file(
        &self,
        path: impl AsRef<Path>,
        geometry: &ModelGeometry,
    ) -> Result<(), ModelError> {
        tessera_profiling::profile_function!();

        let path = path.as_ref();
        let write_error = |message: String| ModelError::CacheWrite {
            path: path.to_owned(),
            message,
        };

        let bytes = cache::encode(geometry).map_err(|err| write_error(err.to_string()))?;
        fs::write(path, &bytes).map_err(|err| write_error(err.to_string()))?;

        log::debug!("Wrote cache '{}' ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}
