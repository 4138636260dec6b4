use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tessera_model::{ImportOptions, ModelError, ModelGeometry, ModelReader};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Collect profiler scopes while running
    #[arg(long, default_value_t = false)]
    profile: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a model file, going through a binary cache when one is given
    Import {
        model: PathBuf,

        /// Cache file to load from, or to write after importing
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Keep meshes without any material, drawn in a forced color
        #[arg(long, default_value_t = false)]
        force_render_invisible: bool,

        /// Log every invisible mesh that gets dropped
        #[arg(long, default_value_t = false)]
        notify_invisible_dropped: bool,
    },

    /// Print the contents of a cache file
    Inspect { cache: PathBuf },
}

pub fn internal_main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    tessera_profiling::set_enabled(args.profile);

    let reader = ModelReader::new();
    let geometry = match args.command {
        Command::Import {
            model,
            cache,
            force_render_invisible,
            notify_invisible_dropped,
        } => {
            let options = ImportOptions {
                force_render_invisible,
                notify_invisible_dropped,
            };

            match cache {
                Some(cache) => load_or_import(&reader, &model, &cache, options)?,
                None => reader.load_model_with_options(&model, options)?,
            }
        }
        Command::Inspect { cache } => reader.load_cached_file(&cache)?,
    };

    print_summary(&geometry);
    tessera_profiling::new_frame();

    Ok(())
}

/// Loads `cache` when it holds a valid model, otherwise imports `model` and (re)writes the
/// cache. A corrupt cache is deleted before importing.
fn load_or_import(
    reader: &ModelReader,
    model: &Path,
    cache: &Path,
    options: ImportOptions,
) -> Result<ModelGeometry> {
    tessera_profiling::profile_function!();

    if cache.exists() {
        match reader.load_cached_file(cache) {
            Ok(geometry) => {
                log::info!("Loaded '{}' from cache.", model.display());
                return Ok(geometry);
            }
            Err(err @ ModelError::CacheCorruption { .. }) => {
                log::warn!("{err}, discarding it.");
                fs::remove_file(cache)?;
            }
            Err(err) => return Err(err.into()),
        }
    }

    let geometry = reader.load_model_with_options(model, options)?;
    match reader.save_cached_file(cache, &geometry) {
        Ok(()) => log::info!("Wrote cache '{}'.", cache.display()),
        Err(err) => log::warn!("{err}"),
    }

    Ok(geometry)
}

fn print_summary(geometry: &ModelGeometry) {
    println!(
        "{} meshes, {} vertices, {} triangles, {} textures",
        geometry.meshes().len(),
        geometry.num_vertices(),
        geometry.num_triangles(),
        geometry.texture_storage().len()
    );

    for entry in geometry.texture_storage() {
        let texture = &entry.texture;
        println!(
            "  {} {}x{}x{} {:?} {:?}",
            entry.name,
            texture.width(),
            texture.height(),
            texture.depth(),
            texture.format(),
            texture.data_type()
        );
    }

    for (i, mesh) in geometry.meshes().iter().enumerate() {
        let types: Vec<_> = mesh.textures.iter().map(|texture| texture.ty()).collect();
        println!(
            "  mesh {i}: {} vertices, {} triangles, [{}]",
            mesh.vertices.len(),
            mesh.num_triangles(),
            types.join(", ")
        );
    }
}
