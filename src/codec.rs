//! Codec adapter boundary.
//!
//! The engine only ever talks to a [`Codec`]: bytes in a known
//! [`SourceFormat`] become a [`RawImage`], and a [`RawImage`] becomes WebP
//! bytes. [`ImageWebpCodec`] is the default backend, built on the `image`
//! decoders and libwebp through the `webp` crate.

use image::DynamicImage;
use webp::Encoder;

use crate::error::{ConvertError, Result};
use crate::format::SourceFormat;

/// WebP maximum dimensions are 16383x16383
pub const MAX_WEBP_DIMENSION: u32 = 16383;

/// Channel layout of a [`RawImage`] buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb,
    Rgba,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

/// Decoded, row-major 8-bit pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    width: u32,
    height: u32,
    layout: PixelLayout,
    data: Vec<u8>,
}

impl RawImage {
    /// Wrap a pixel buffer. Fails unless both axes are non-zero and
    /// `data.len() == width * height * channels`.
    pub fn new(width: u32, height: u32, layout: PixelLayout, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ConvertError::InvalidDimensions { width, height });
        }

        let expected = width as usize * height as usize * layout.channels();
        if data.len() != expected {
            return Err(ConvertError::decode(format!(
                "Pixel buffer holds {} bytes, expected {expected} for {width}x{height} {layout:?}",
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            layout,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Convert an `image` crate image, keeping alpha only when present.
    pub fn from_dynamic(img: DynamicImage) -> Result<Self> {
        let (width, height) = (img.width(), img.height());
        if img.color().has_alpha() {
            Self::new(width, height, PixelLayout::Rgba, img.into_rgba8().into_raw())
        } else {
            Self::new(width, height, PixelLayout::Rgb, img.into_rgb8().into_raw())
        }
    }
}

/// How the encoder should treat `quality`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    Lossy,
    Lossless,
}

/// Decode and encode capability the engine is generic over.
pub trait Codec: Send + Sync {
    fn decode(&self, bytes: &[u8], format: SourceFormat) -> Result<RawImage>;

    /// `quality` is 0-100; lossless encoders may ignore it.
    fn encode(&self, image: &RawImage, quality: u8, mode: EncodeMode) -> Result<Vec<u8>>;
}

/// Default backend: `image` for decoding, libwebp for encoding
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageWebpCodec;

impl Codec for ImageWebpCodec {
    fn decode(&self, bytes: &[u8], format: SourceFormat) -> Result<RawImage> {
        let img = image::load_from_memory_with_format(bytes, format.image_format())
            .map_err(|e| ConvertError::decode(format!("{format}: {e}")))?;
        RawImage::from_dynamic(img)
    }

    fn encode(&self, image: &RawImage, quality: u8, mode: EncodeMode) -> Result<Vec<u8>> {
        let (width, height) = image.dimensions();
        if width > MAX_WEBP_DIMENSION || height > MAX_WEBP_DIMENSION {
            return Err(ConvertError::encode(format!(
                "{width}x{height} exceeds the WebP limit of {MAX_WEBP_DIMENSION}px per side"
            )));
        }

        let encoder = match image.layout() {
            PixelLayout::Rgb => Encoder::from_rgb(image.as_bytes(), width, height),
            PixelLayout::Rgba => Encoder::from_rgba(image.as_bytes(), width, height),
        };

        let lossless = mode == EncodeMode::Lossless;
        let webp_data = encoder
            .encode_simple(lossless, f32::from(quality.min(100)))
            .map_err(|e| ConvertError::encode(format!("libwebp rejected {width}x{height}: {e:?}")))?;

        Ok(webp_data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_image_enforces_buffer_length() {
        assert!(RawImage::new(2, 2, PixelLayout::Rgba, vec![0; 16]).is_ok());
        assert!(matches!(
            RawImage::new(2, 2, PixelLayout::Rgb, vec![0; 16]),
            Err(ConvertError::DecodeFailed(_))
        ));
        assert!(matches!(
            RawImage::new(0, 2, PixelLayout::Rgb, vec![]),
            Err(ConvertError::InvalidDimensions { width: 0, height: 2 })
        ));
    }

    #[test]
    fn from_dynamic_keeps_alpha_only_when_present() {
        let rgb = DynamicImage::new_rgb8(3, 2);
        let raw = RawImage::from_dynamic(rgb).unwrap();
        assert_eq!(raw.layout(), PixelLayout::Rgb);
        assert_eq!(raw.as_bytes().len(), 3 * 2 * 3);

        let rgba = DynamicImage::new_rgba8(3, 2);
        let raw = RawImage::from_dynamic(rgba).unwrap();
        assert_eq!(raw.layout(), PixelLayout::Rgba);
        assert_eq!(raw.channels(), 4);
    }

    #[test]
    fn decode_garbage_fails() {
        let err = ImageWebpCodec
            .decode(b"definitely not a png", SourceFormat::Png)
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::DecodeFailed);
    }

    #[test]
    fn encode_produces_riff_container() {
        let raw = RawImage::new(4, 4, PixelLayout::Rgb, vec![128; 48]).unwrap();
        let webp = ImageWebpCodec.encode(&raw, 80, EncodeMode::Lossy).unwrap();
        assert_eq!(&webp[0..4], b"RIFF");
        assert_eq!(&webp[8..12], b"WEBP");
    }

    #[test]
    fn encode_rejects_oversized_images() {
        let width = MAX_WEBP_DIMENSION + 1;
        let raw = RawImage::new(width, 1, PixelLayout::Rgb, vec![0; width as usize * 3]).unwrap();
        let err = ImageWebpCodec.encode(&raw, 80, EncodeMode::Lossy).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::EncodeFailed);
    }
}
