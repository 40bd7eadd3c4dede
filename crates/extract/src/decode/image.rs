use super::{Decoded, Decoder};
use crate::error::{ErrorKind, Result};
use crate::models::extension_of;
use exn::{OptionExt, ResultExt};
use image::{ImageFormat, ImageReader};
use serde_json::json;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::instrument;

const NOTE: &str = "OCR is not configured; only image headers were read";

fn expected_format(extension: &str) -> Option<ImageFormat> {
    Some(match extension {
        ".png" => ImageFormat::Png,
        ".jpg" | ".jpeg" | ".jpe" | ".jif" | ".jfif" => ImageFormat::Jpeg,
        ".gif" => ImageFormat::Gif,
        ".bmp" => ImageFormat::Bmp,
        ".tif" | ".tiff" => ImageFormat::Tiff,
        ".webp" => ImageFormat::WebP,
        ".ico" => ImageFormat::Ico,
        _ => return None,
    })
}

fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Gif => "gif",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Tiff => "tiff",
        ImageFormat::WebP => "webp",
        ImageFormat::Ico => "ico",
        _ => "image",
    }
}

/// Raster images: format and dimensions from the header.
///
/// The format is sniffed from the bytes and must agree with the extension.
/// Pixel data is never decoded.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageDecoder;

impl Decoder for ImageDecoder {
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    fn decode(&self, path: &Path) -> Result<Decoded> {
        let extension = extension_of(path);
        let expected = expected_format(&extension)
            .ok_or_raise(|| ErrorKind::Decode(format!("no image format for extension {extension:?}")))?;
        let bytes = fs::read(path).or_raise(|| ErrorKind::Io)?;
        let reader = ImageReader::new(Cursor::new(bytes.as_slice())).with_guessed_format().or_raise(|| ErrorKind::Io)?;
        if reader.format() != Some(expected) {
            exn::bail!(ErrorKind::Signature(format_name(expected)));
        }
        let dimensions = match reader.into_dimensions() {
            Ok(dimensions) => Some(dimensions),
            Err(err) => {
                tracing::debug!(error = %err, "image header is incomplete");
                None
            },
        };
        Ok(Decoded::partial(
            json!({
                "format": format_name(expected),
                "width": dimensions.map(|(w, _)| w),
                "height": dimensions.map(|(_, h)| h),
                "size_bytes": bytes.len(),
                "ocr_text": null,
                "note": NOTE,
            }),
            NOTE,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use image::{DynamicImage, RgbImage};
    use rstest::rstest;
    use tempfile::TempDir;

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    fn decode(name: &str, bytes: &[u8]) -> Result<Decoded> {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(name);
        fs::write(&path, bytes).unwrap();
        ImageDecoder.decode(&path)
    }

    #[rstest]
    #[case("pixel.png", ImageFormat::Png, "png")]
    #[case("photo.JPG", ImageFormat::Jpeg, "jpeg")]
    #[case("scan.bmp", ImageFormat::Bmp, "bmp")]
    fn reads_dimensions(#[case] name: &str, #[case] format: ImageFormat, #[case] expected: &str) {
        let decoded = decode(name, &encoded(64, 48, format)).unwrap();
        assert_eq!(decoded.status, Status::Partial);
        assert_eq!(decoded.content["format"], expected);
        assert_eq!(decoded.content["width"], 64);
        assert_eq!(decoded.content["height"], 48);
        assert!(decoded.content["ocr_text"].is_null());
    }

    #[test]
    fn mismatched_signature_is_error() {
        let err = decode("fake.png", &encoded(4, 4, ImageFormat::Jpeg)).unwrap_err();
        assert_eq!(*err, ErrorKind::Signature("png"));
        let err = decode("fake.gif", b"plain text, not an image").unwrap_err();
        assert_eq!(*err, ErrorKind::Signature("gif"));
    }

    #[test]
    fn incomplete_header_has_null_dimensions() {
        let decoded = decode("stub.png", &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();
        assert_eq!(decoded.content["format"], "png");
        assert!(decoded.content["width"].is_null());
        assert_eq!(decoded.content["size_bytes"], 8);
    }
}
