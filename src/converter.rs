use std::path::Path;

use crate::codec::{Codec, EncodeMode, ImageWebpCodec};
use crate::config::ConversionOptions;
use crate::error::{ConvertError, Result};
use crate::format::SourceFormat;
use crate::resize::resize;
use crate::CompressionMode;

/// Decode → resize → WebP encode, over any [`Codec`] backend.
///
/// Holds no mutable state, so one converter is shared by every worker in a
/// batch.
#[derive(Debug, Clone)]
pub struct ImageConverter<C = ImageWebpCodec> {
    codec: C,
    options: ConversionOptions,
}

impl ImageConverter<ImageWebpCodec> {
    pub fn new(options: ConversionOptions) -> Self {
        Self::with_codec(ImageWebpCodec, options)
    }
}

impl<C: Codec> ImageConverter<C> {
    pub fn with_codec(codec: C, options: ConversionOptions) -> Self {
        Self { codec, options }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Convert an in-memory image of a known format to WebP bytes.
    pub fn convert(&self, bytes: &[u8], format: SourceFormat) -> Result<Vec<u8>> {
        let image = self.codec.decode(bytes, format)?;
        let image = resize(
            image,
            self.options.dimensions,
            self.options.maintain_aspect_ratio,
        )?;

        let mode = self.encode_mode(format);
        self.codec.encode(&image, self.options.quality, mode)
    }

    /// Convert bytes whose format is identified from their signature.
    pub fn convert_sniffed(&self, bytes: &[u8]) -> Result<(SourceFormat, Vec<u8>)> {
        let format = SourceFormat::sniff(bytes)
            .ok_or_else(|| ConvertError::decode("Unrecognised image signature"))?;
        let webp = self.convert(bytes, format)?;
        Ok((format, webp))
    }

    /// Read and convert a single file. Fails with `NotFound` if `path` is absent.
    pub fn convert_file(&self, path: &Path) -> Result<Vec<u8>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConvertError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConvertError::io(path, e)),
        };

        self.convert_sniffed(&bytes).map(|(_, webp)| webp)
    }

    fn encode_mode(&self, format: SourceFormat) -> EncodeMode {
        match self.options.mode {
            CompressionMode::Lossy => EncodeMode::Lossy,
            CompressionMode::Lossless => EncodeMode::Lossless,
            // Quick decision based on the source format only
            CompressionMode::Auto if format.prefers_lossless() => EncodeMode::Lossless,
            CompressionMode::Auto => EncodeMode::Lossy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{PixelLayout, RawImage};
    use std::sync::Mutex;

    /// Records what the engine asked the backend to do.
    #[derive(Default)]
    struct RecordingCodec {
        encoded: Mutex<Vec<((u32, u32), u8, EncodeMode)>>,
    }

    impl Codec for RecordingCodec {
        fn decode(&self, bytes: &[u8], _format: SourceFormat) -> Result<RawImage> {
            if bytes.is_empty() {
                return Err(ConvertError::decode("empty"));
            }
            RawImage::new(40, 20, PixelLayout::Rgb, vec![10; 40 * 20 * 3])
        }

        fn encode(&self, image: &RawImage, quality: u8, mode: EncodeMode) -> Result<Vec<u8>> {
            self.encoded
                .lock()
                .unwrap()
                .push((image.dimensions(), quality, mode));
            Ok(b"RIFF".to_vec())
        }
    }

    #[test]
    fn applies_resize_before_encoding() {
        let options = ConversionOptions::new()
            .with_quality(55)
            .with_dimensions(10, 10)
            .with_maintain_aspect_ratio(true);
        let converter = ImageConverter::with_codec(RecordingCodec::default(), options);

        converter.convert(b"img", SourceFormat::Jpeg).unwrap();

        let calls = converter.codec.encoded.lock().unwrap();
        assert_eq!(calls.as_slice(), &[((10, 5), 55, EncodeMode::Lossy)]);
    }

    #[test]
    fn auto_mode_picks_lossless_for_png() {
        let options = ConversionOptions::new().with_mode(CompressionMode::Auto);
        let converter = ImageConverter::with_codec(RecordingCodec::default(), options);

        converter.convert(b"img", SourceFormat::Png).unwrap();
        converter.convert(b"img", SourceFormat::Jpeg).unwrap();

        let calls = converter.codec.encoded.lock().unwrap();
        assert_eq!(calls[0].2, EncodeMode::Lossless);
        assert_eq!(calls[1].2, EncodeMode::Lossy);
    }

    #[test]
    fn decode_errors_propagate_unchanged() {
        let converter = ImageConverter::with_codec(RecordingCodec::default(), ConversionOptions::new());
        let err = converter.convert(b"", SourceFormat::Png).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::DecodeFailed);
        assert!(converter.codec.encoded.lock().unwrap().is_empty());
    }

    #[test]
    fn invalid_target_fails_before_encoding() {
        let options = ConversionOptions::new().with_dimensions(0, 100);
        let converter = ImageConverter::with_codec(RecordingCodec::default(), options);
        let err = converter.convert(b"img", SourceFormat::Png).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidDimensions);
    }

    #[test]
    fn unknown_signature_is_a_decode_failure() {
        let converter = ImageConverter::new(ConversionOptions::new());
        let err = converter.convert_sniffed(b"plain text file").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::DecodeFailed);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let converter = ImageConverter::new(ConversionOptions::new());
        let err = converter.convert_file(&dir.path().join("gone.png")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }
}
