//! PNG encoding through the `image` crate

use gfxdev_core::{ExportError, ImageView, Result, RgbImage};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};

use crate::Exporter;

/// Encode any supported pixel view as PNG
///
/// Opaque images are written as RGB, anything carrying alpha as RGBA.
/// Gray and gray-alpha views are widened to color first.
pub fn encode_png(view: &ImageView<'_>) -> Result<Vec<u8>> {
    if view.is_empty() {
        return Err(ExportError::EncodingFailed(format!(
            "cannot encode an empty {}x{} image",
            view.width(),
            view.height()
        ))
        .into());
    }

    let alpha = view.has_alpha();
    let channels = if alpha { 4 } else { 3 };
    let mut packed = Vec::with_capacity(view.width() as usize * view.height() as usize * channels);
    for y in 0..view.height() {
        for x in 0..view.width() {
            let px = view.rgba(x, y);
            packed.extend_from_slice(&px[..channels]);
        }
    }
    let color = if alpha {
        ExtendedColorType::Rgba8
    } else {
        ExtendedColorType::Rgb8
    };

    let mut png = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut png, CompressionType::Default, FilterType::Sub);
    encoder
        .write_image(&packed, view.width(), view.height(), color)
        .map_err(|e| ExportError::EncodingFailed(format!("PNG encoding failed: {e}")))?;
    Ok(png)
}

/// Writes snapshots as PNG files
#[derive(Debug, Default, Clone, Copy)]
pub struct PngExporter;

impl PngExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for PngExporter {
    fn name(&self) -> &'static str {
        "png"
    }

    fn export(&self, image: &RgbImage) -> Result<Vec<u8>> {
        encode_png(&image.view())
    }

    fn extension(&self) -> &'static str {
        "png"
    }

    fn mime_type(&self) -> &'static str {
        "image/png"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn test_png_signature_and_size() {
        let image = RgbImage::new(vec![255, 0, 0, 0, 0, 255], 2, 1, 3).unwrap();
        let png = PngExporter::new().export(&image).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory_with_format(&png, image::ImageFormat::Png).unwrap();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.get_pixel(1, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_alpha_is_kept() {
        let image = RgbImage::new(vec![10, 20, 30, 128], 1, 1, 4).unwrap();
        let png = encode_png(&image.view()).unwrap();
        let decoded = image::load_from_memory_with_format(&png, image::ImageFormat::Png).unwrap();
        assert_eq!(decoded.get_pixel(0, 0).0, [10, 20, 30, 128]);
    }

    #[test]
    fn test_gray_widened() {
        let image = RgbImage::new(vec![0, 200], 2, 1, 1).unwrap();
        let png = encode_png(&image.view()).unwrap();
        let decoded = image::load_from_memory_with_format(&png, image::ImageFormat::Png).unwrap();
        assert_eq!(decoded.get_pixel(1, 0).0, [200, 200, 200, 255]);
    }
}
