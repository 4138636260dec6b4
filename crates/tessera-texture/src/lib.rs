use glam::UVec3;

mod decoder;
pub use decoder::{ImageDecoder, TextureDecoder, TextureLoadError};

/// Raw internal format values as understood by the graphics backend.
pub mod internal_format {
    pub const R8: u32 = 0x8229;
    pub const RG8: u32 = 0x822B;
    pub const RGB8: u32 = 0x8051;
    pub const RGBA8: u32 = 0x8058;
    pub const RGB32F: u32 = 0x8815;
    pub const RGBA32F: u32 = 0x8814;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Red,
    Rg,
    Rgb,
    Bgr,
    Rgba,
    Bgra,
    DepthComponent,
}

impl TextureFormat {
    pub fn num_channels(&self) -> usize {
        match self {
            Self::Red | Self::DepthComponent => 1,
            Self::Rg => 2,
            Self::Rgb | Self::Bgr => 3,
            Self::Rgba | Self::Bgra => 4,
        }
    }

    /// Channel holding alpha, for formats that carry one.
    pub fn alpha_channel(&self) -> Option<usize> {
        match self {
            Self::Rgba | Self::Bgra => Some(3),
            _ => None,
        }
    }

    /// Four character, space padded tag used by the model cache.
    pub fn code(&self) -> [u8; 4] {
        match self {
            Self::Red => *b"Red ",
            Self::Rg => *b"RG  ",
            Self::Rgb => *b"RGB ",
            Self::Bgr => *b"BGR ",
            Self::Rgba => *b"RGBA",
            Self::Bgra => *b"BGRA",
            Self::DepthComponent => *b"Dept",
        }
    }

    pub fn from_code(code: &[u8; 4]) -> Option<Self> {
        match code {
            b"Red " => Some(Self::Red),
            b"RG  " => Some(Self::Rg),
            b"RGB " => Some(Self::Rgb),
            b"BGR " => Some(Self::Bgr),
            b"RGBA" => Some(Self::Rgba),
            b"BGRA" => Some(Self::Bgra),
            b"Dept" => Some(Self::DepthComponent),
            _ => None,
        }
    }
}

/// Component type of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Float,
    Double,
}

impl DataType {
    pub fn size(&self) -> usize {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort => 2,
            Self::Int | Self::UnsignedInt | Self::Float => 4,
            Self::Double => 8,
        }
    }

    pub fn code(&self) -> [u8; 4] {
        match self {
            Self::Byte => *b"byte",
            Self::UnsignedByte => *b"ubyt",
            Self::Short => *b"shor",
            Self::UnsignedShort => *b"usho",
            Self::Int => *b"int ",
            Self::UnsignedInt => *b"uint",
            Self::Float => *b"floa",
            Self::Double => *b"doub",
        }
    }

    pub fn from_code(code: &[u8; 4]) -> Option<Self> {
        match code {
            b"byte" => Some(Self::Byte),
            b"ubyt" => Some(Self::UnsignedByte),
            b"shor" => Some(Self::Short),
            b"usho" => Some(Self::UnsignedShort),
            b"int " => Some(Self::Int),
            b"uint" => Some(Self::UnsignedInt),
            b"floa" => Some(Self::Float),
            b"doub" => Some(Self::Double),
            _ => None,
        }
    }

    /// Reads one component, normalizing integer types into [-1, 1] or [0, 1].
    /// `bytes` must hold exactly [`DataType::size`] bytes.
    pub fn read(&self, bytes: &[u8]) -> f32 {
        match self {
            Self::Byte => bytemuck::pod_read_unaligned::<i8>(bytes) as f32 / i8::MAX as f32,
            Self::UnsignedByte => bytes[0] as f32 / u8::MAX as f32,
            Self::Short => bytemuck::pod_read_unaligned::<i16>(bytes) as f32 / i16::MAX as f32,
            Self::UnsignedShort => {
                bytemuck::pod_read_unaligned::<u16>(bytes) as f32 / u16::MAX as f32
            }
            Self::Int => {
                (bytemuck::pod_read_unaligned::<i32>(bytes) as f64 / i32::MAX as f64) as f32
            }
            Self::UnsignedInt => {
                (bytemuck::pod_read_unaligned::<u32>(bytes) as f64 / u32::MAX as f64) as f32
            }
            Self::Float => bytemuck::pod_read_unaligned::<f32>(bytes),
            Self::Double => bytemuck::pod_read_unaligned::<f64>(bytes) as f32,
        }
    }
}

pub struct TextureCreateDesc {
    pub name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: TextureFormat,
    pub internal_format: u32,
    pub data_type: DataType,
    pub data: Box<[u8]>,
}

/// CPU side pixel buffer. Uploading it is up to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    name: String,
    width: u32,
    height: u32,
    depth: u32,
    format: TextureFormat,
    internal_format: u32,
    data_type: DataType,
    data: Box<[u8]>,
}

impl Texture {
    pub fn new(create_desc: TextureCreateDesc) -> Self {
        let texture = Self {
            name: create_desc.name.unwrap_or_default(),
            width: create_desc.width,
            height: create_desc.height,
            depth: create_desc.depth,
            format: create_desc.format,
            internal_format: create_desc.internal_format,
            data_type: create_desc.data_type,
            data: create_desc.data,
        };
        debug_assert_eq!(texture.data.len(), texture.expected_data_size());

        texture
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        name.clone_into(&mut self.name);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn dimensions(&self) -> UVec3 {
        UVec3::new(self.width, self.height, self.depth)
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn internal_format(&self) -> u32 {
        self.internal_format
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Size in bytes of one texel.
    pub fn stride(&self) -> usize {
        self.format.num_channels() * self.data_type.size()
    }

    pub fn expected_data_size(&self) -> usize {
        expected_data_size(self.dimensions(), self.format, self.data_type)
    }

    /// Alpha of the texel at (`x`, `y`) in the first depth slice, 1.0 for formats without alpha.
    pub fn texel_alpha(&self, x: u32, y: u32) -> f32 {
        let Some(channel) = self.format.alpha_channel() else {
            return 1.0;
        };

        let component_size = self.data_type.size();
        let offset = (y as usize * self.width as usize + x as usize) * self.stride()
            + channel * component_size;
        self.data_type.read(&self.data[offset..offset + component_size])
    }

    /// True when every texel has zero alpha. Stops at the first visible texel.
    pub fn is_fully_transparent(&self) -> bool {
        tessera_profiling::profile_function!();

        if self.format.alpha_channel().is_none() {
            return false;
        }

        for x in 0..self.width {
            for y in 0..self.height {
                if self.texel_alpha(x, y) != 0.0 {
                    return false;
                }
            }
        }
        true
    }
}

pub fn expected_data_size(dimensions: UVec3, format: TextureFormat, data_type: DataType) -> usize {
    dimensions.x as usize
        * dimensions.y as usize
        * dimensions.z as usize
        * format.num_channels()
        * data_type.size()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba8(width: u32, height: u32, data: Vec<u8>) -> Texture {
        Texture::new(TextureCreateDesc {
            name: Some("test.png".to_owned()),
            width,
            height,
            depth: 1,
            format: TextureFormat::Rgba,
            internal_format: internal_format::RGBA8,
            data_type: DataType::UnsignedByte,
            data: data.into_boxed_slice(),
        })
    }

    #[test]
    fn format_codes_are_space_padded() {
        assert_eq!(&TextureFormat::Rg.code(), b"RG  ");
        assert_eq!(&TextureFormat::Red.code(), b"Red ");
        assert_eq!(&DataType::Int.code(), b"int ");
    }

    #[test]
    fn codes_map_back() {
        for format in [
            TextureFormat::Red,
            TextureFormat::Rg,
            TextureFormat::Rgb,
            TextureFormat::Bgr,
            TextureFormat::Rgba,
            TextureFormat::Bgra,
            TextureFormat::DepthComponent,
        ] {
            assert_eq!(TextureFormat::from_code(&format.code()), Some(format));
        }
        assert_eq!(TextureFormat::from_code(b"rgba"), None);
        assert_eq!(DataType::from_code(b"floa"), Some(DataType::Float));
        assert_eq!(DataType::from_code(b"half"), None);
    }

    #[test]
    fn transparent_texture_is_detected() {
        let texture = rgba8(2, 2, vec![255, 0, 0, 0].repeat(4));
        assert!(texture.is_fully_transparent());
    }

    #[test]
    fn single_visible_texel_is_enough() {
        let mut data = vec![0u8; 16];
        data[15] = 1;
        let texture = rgba8(2, 2, data);
        assert!(!texture.is_fully_transparent());
        assert_eq!(texture.texel_alpha(0, 0), 0.0);
        assert!(texture.texel_alpha(1, 1) > 0.0);
    }

    #[test]
    fn formats_without_alpha_are_opaque() {
        let texture = Texture::new(TextureCreateDesc {
            name: None,
            width: 1,
            height: 1,
            depth: 1,
            format: TextureFormat::Rgb,
            internal_format: internal_format::RGB8,
            data_type: DataType::UnsignedByte,
            data: vec![0, 0, 0].into_boxed_slice(),
        });
        assert!(!texture.is_fully_transparent());
        assert_eq!(texture.texel_alpha(0, 0), 1.0);
        assert_eq!(texture.name(), "");
    }

    #[test]
    fn float_alpha_is_read_natively() {
        let texels: Vec<f32> = vec![1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 0.5];
        let texture = Texture::new(TextureCreateDesc {
            name: None,
            width: 2,
            height: 1,
            depth: 1,
            format: TextureFormat::Rgba,
            internal_format: internal_format::RGBA32F,
            data_type: DataType::Float,
            data: bytemuck::cast_slice(&texels).to_vec().into_boxed_slice(),
        });
        assert_eq!(texture.texel_alpha(0, 0), 0.0);
        assert_eq!(texture.texel_alpha(1, 0), 0.5);
        assert_eq!(texture.expected_data_size(), 32);
    }
}
