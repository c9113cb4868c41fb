use image::ImageFormat;

use crate::decoder::{Decoder, DecoderRegistry};
use crate::error::AssetError;
use crate::gpu::{GpuDevice, GpuId, GpuTextureFormat, GpuUploader, TextureDescriptor};
use crate::handle::Handle;
use crate::kind::{AssetKind, PayloadBuilder};
use crate::path::VirtualPath;

/// Textures under `textures/`.
pub struct Texture;

/// Pixel format of a decoded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
    Rgb8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::Rgb8 => 3,
        }
    }
}

/// Decoded pixels, not yet on the GPU.
#[derive(Debug, Clone)]
pub struct TextureRecord {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub format: TextureFormat,
}

/// An uploaded texture.
#[derive(Debug, Clone, PartialEq)]
pub struct TexturePayload {
    pub id: GpuId,
    pub width: u32,
    pub height: u32,
    pub format: GpuTextureFormat,
}

impl AssetKind for Texture {
    type Record = TextureRecord;
    type Payload = TexturePayload;

    const NAMESPACE: &'static str = "textures";
    const DEFAULT_EXTENSION: &'static str = "png";

    fn validate(record: &TextureRecord) -> Result<(), String> {
        if record.width == 0 || record.height == 0 {
            return Err(format!(
                "texture has zero size ({}x{})",
                record.width, record.height
            ));
        }
        let expected =
            record.width as usize * record.height as usize * record.format.bytes_per_pixel();
        if record.data.len() != expected {
            return Err(format!(
                "expected {} bytes of {:?} pixels, got {}",
                expected,
                record.format,
                record.data.len()
            ));
        }
        Ok(())
    }

    fn is_ready(payload: &TexturePayload) -> bool {
        payload.id.is_valid()
    }

    fn register_default_decoders(registry: &mut DecoderRegistry<Self>) {
        registry.register(&["png"], ImageDecoder::new(ImageFormat::Png));
        registry.register(&["bmp"], ImageDecoder::new(ImageFormat::Bmp));
        registry.register(&["jpg", "jpeg"], ImageDecoder::new(ImageFormat::Jpeg));
        registry.register(&["tga"], ImageDecoder::new(ImageFormat::Tga));
    }
}

/// Decodes image files through the `image` crate into RGBA8 records.
#[derive(Debug, Clone, Copy)]
pub struct ImageDecoder {
    format: ImageFormat,
}

impl ImageDecoder {
    pub fn new(format: ImageFormat) -> Self {
        Self { format }
    }
}

impl Decoder<Texture> for ImageDecoder {
    fn decode(&self, path: &VirtualPath, bytes: &[u8]) -> Result<TextureRecord, AssetError> {
        let img = image::load_from_memory_with_format(bytes, self.format)
            .map_err(|e| AssetError::format(path, e))?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(TextureRecord {
            width,
            height,
            data: rgba.into_raw(),
            format: TextureFormat::Rgba8,
        })
    }
}

impl<G: GpuDevice> PayloadBuilder<Texture> for GpuUploader<G> {
    fn build(&mut self, _path: &VirtualPath, record: TextureRecord) -> Result<TexturePayload, AssetError> {
        let data = match record.format {
            TextureFormat::Rgba8 => record.data,
            TextureFormat::Rgb8 => {
                // Convert RGB to RGBA.
                let mut rgba = Vec::with_capacity(record.data.len() / 3 * 4);
                for chunk in record.data.chunks(3) {
                    rgba.extend_from_slice(chunk);
                    rgba.push(255);
                }
                rgba
            }
        };

        let desc = TextureDescriptor {
            width: record.width,
            height: record.height,
            format: GpuTextureFormat::Rgba8Srgb,
        };
        let id = self.gpu().create_texture(&desc, &data)?;

        Ok(TexturePayload {
            id,
            width: desc.width,
            height: desc.height,
            format: desc.format,
        })
    }

    fn release(&mut self, payload: TexturePayload) -> Result<(), AssetError> {
        self.gpu().destroy(payload.id)?;
        Ok(())
    }
}

impl Handle<Texture> {
    pub fn texture_id(&self) -> Result<GpuId, AssetError> {
        self.read(|t| t.id)
    }

    pub fn width(&self) -> Result<u32, AssetError> {
        self.read(|t| t.width)
    }

    pub fn height(&self) -> Result<u32, AssetError> {
        self.read(|t| t.height)
    }

    pub fn dimensions(&self) -> Result<(u32, u32), AssetError> {
        self.read(|t| (t.width, t.height))
    }
}
