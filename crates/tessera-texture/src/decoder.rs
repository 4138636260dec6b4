use std::path::Path;

use image::{DynamicImage, ImageError, ImageFormat};

use crate::{internal_format, DataType, Texture, TextureCreateDesc, TextureFormat};

/// Recoverable reasons a texture could not be turned into pixels.
#[derive(Debug, thiserror::Error)]
pub enum TextureLoadError {
    #[error("no decoder available for extension '{extension}' of '{file}'")]
    MissingDecoder { file: String, extension: String },

    #[error("failed to decode '{file}': {message}")]
    DecodeFailed { file: String, message: String },

    #[error("uncompressed embedded texture '{name}' is not supported")]
    UncompressedEmbedded { name: String },
}

/// Turns encoded image bytes into a [`Texture`].
pub trait TextureDecoder {
    /// Decodes an in-memory image. `format_hint` is a file extension such as `png`, or empty.
    fn decode_memory(&self, data: &[u8], format_hint: &str) -> Result<Texture, TextureLoadError>;

    fn decode_file(&self, path: &Path) -> Result<Texture, TextureLoadError>;
}

/// [`TextureDecoder`] backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

impl TextureDecoder for ImageDecoder {
    fn decode_memory(&self, data: &[u8], format_hint: &str) -> Result<Texture, TextureLoadError> {
        tessera_profiling::profile_function!();

        let hint = format_hint.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        let format = if hint.is_empty() {
            image::guess_format(data).map_err(|_| TextureLoadError::MissingDecoder {
                file: "<embedded>".to_owned(),
                extension: String::new(),
            })?
        } else {
            ImageFormat::from_extension(hint).ok_or_else(|| TextureLoadError::MissingDecoder {
                file: "<embedded>".to_owned(),
                extension: hint.to_owned(),
            })?
        };

        decode(data, format, "<embedded>", hint)
    }

    fn decode_file(&self, path: &Path) -> Result<Texture, TextureLoadError> {
        tessera_profiling::profile_function!();

        let file = path.display().to_string();
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default()
            .to_owned();

        let format = ImageFormat::from_extension(&extension).ok_or_else(|| {
            TextureLoadError::MissingDecoder {
                file: file.clone(),
                extension: extension.clone(),
            }
        })?;

        let data = std::fs::read(path).map_err(|err| TextureLoadError::DecodeFailed {
            file: file.clone(),
            message: err.to_string(),
        })?;

        decode(&data, format, &file, &extension)
    }
}

fn decode(
    data: &[u8],
    format: ImageFormat,
    file: &str,
    extension: &str,
) -> Result<Texture, TextureLoadError> {
    let image = image::load_from_memory_with_format(data, format).map_err(|err| match err {
        ImageError::Unsupported(_) => TextureLoadError::MissingDecoder {
            file: file.to_owned(),
            extension: extension.to_owned(),
        },
        err => TextureLoadError::DecodeFailed {
            file: file.to_owned(),
            message: err.to_string(),
        },
    })?;

    Ok(texture_from_image(image))
}

fn texture_from_image(image: DynamicImage) -> Texture {
    let (width, height) = (image.width(), image.height());
    let (format, internal_format, data_type, data): (_, _, _, Vec<u8>) = match image {
        DynamicImage::ImageLuma8(image) => (
            TextureFormat::Red,
            internal_format::R8,
            DataType::UnsignedByte,
            image.into_raw(),
        ),
        DynamicImage::ImageLumaA8(image) => (
            TextureFormat::Rg,
            internal_format::RG8,
            DataType::UnsignedByte,
            image.into_raw(),
        ),
        DynamicImage::ImageRgb8(image) => (
            TextureFormat::Rgb,
            internal_format::RGB8,
            DataType::UnsignedByte,
            image.into_raw(),
        ),
        DynamicImage::ImageRgba8(image) => (
            TextureFormat::Rgba,
            internal_format::RGBA8,
            DataType::UnsignedByte,
            image.into_raw(),
        ),
        DynamicImage::ImageRgb32F(image) => (
            TextureFormat::Rgb,
            internal_format::RGB32F,
            DataType::Float,
            bytemuck::cast_slice(&image.into_raw()).to_vec(),
        ),
        DynamicImage::ImageRgba32F(image) => (
            TextureFormat::Rgba,
            internal_format::RGBA32F,
            DataType::Float,
            bytemuck::cast_slice(&image.into_raw()).to_vec(),
        ),
        image => (
            TextureFormat::Rgba,
            internal_format::RGBA8,
            DataType::UnsignedByte,
            image.to_rgba8().into_raw(),
        ),
    };

    Texture::new(TextureCreateDesc {
        name: None,
        width,
        height,
        depth: 1,
        format,
        internal_format,
        data_type,
        data: data.into_boxed_slice(),
    })
}
