//! Export: snapshots out to files
//!
//! Image surfaces hand back [`RgbImage`] snapshots. The exporters here turn
//! those into bytes a file viewer understands: PNG through the `image`
//! crate, or the minimal PNM family for anything that only reads raw
//! pixels.

use std::io::Write;
use std::path::Path;

use gfxdev_core::{ExportError, Result, RgbImage};

pub mod png;

pub use png::{encode_png, PngExporter};

/// Turns an image snapshot into file bytes
pub trait Exporter {
    fn name(&self) -> &'static str;

    /// Encode the whole image
    fn export(&self, image: &RgbImage) -> Result<Vec<u8>>;

    /// File extension, without the dot
    fn extension(&self) -> &'static str;

    fn mime_type(&self) -> &'static str;
}

/// Encode `image` and write it to `path`
pub fn write_file(exporter: &dyn Exporter, image: &RgbImage, path: &Path) -> Result<()> {
    let bytes = exporter.export(image)?;
    std::fs::write(path, &bytes)
        .map_err(|e| ExportError::WriteFailed(format!("{}: {e}", path.display())))?;
    log::info!(
        "Wrote {}x{} {} ({} bytes) to {}",
        image.width(),
        image.height(),
        exporter.name(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

/// Exporter for a format name as typed on a command line
pub fn exporter_for(format: &str) -> Result<Box<dyn Exporter>> {
    match format.to_ascii_lowercase().as_str() {
        "png" => Ok(Box::new(PngExporter::new())),
        "ppm" => Ok(Box::new(PnmExporter::ppm())),
        "pgm" => Ok(Box::new(PnmExporter::pgm())),
        "pbm" => Ok(Box::new(PnmExporter::pbm())),
        other => Err(ExportError::FormatNotSupported(other.to_string()).into()),
    }
}

/// Which member of the PNM family to write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PnmFormat {
    /// 1 bit per pixel, set bits are black
    Pbm,
    /// 8-bit gray
    Pgm,
    /// 8-bit RGB
    Ppm,
}

/// Binary PNM writer (P4, P5, P6)
#[derive(Debug, Clone, Copy)]
pub struct PnmExporter {
    format: PnmFormat,
}

impl PnmExporter {
    pub fn new(format: PnmFormat) -> Self {
        Self { format }
    }

    pub fn ppm() -> Self {
        Self::new(PnmFormat::Ppm)
    }

    pub fn pgm() -> Self {
        Self::new(PnmFormat::Pgm)
    }

    pub fn pbm() -> Self {
        Self::new(PnmFormat::Pbm)
    }

    pub fn format(&self) -> PnmFormat {
        self.format
    }
}

impl Default for PnmExporter {
    fn default() -> Self {
        Self::ppm()
    }
}

/// Rec. 601 luma of an RGB triple
fn gray(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

impl Exporter for PnmExporter {
    fn name(&self) -> &'static str {
        self.extension()
    }

    fn export(&self, image: &RgbImage) -> Result<Vec<u8>> {
        let view = image.view();
        let (w, h) = (view.width(), view.height());
        let mut out = Vec::new();
        match self.format {
            PnmFormat::Ppm => {
                write!(out, "P6\n{w} {h}\n255\n")?;
                for y in 0..h {
                    for x in 0..w {
                        let [r, g, b, _] = view.rgba(x, y);
                        out.extend_from_slice(&[r, g, b]);
                    }
                }
            },
            PnmFormat::Pgm => {
                write!(out, "P5\n{w} {h}\n255\n")?;
                for y in 0..h {
                    for x in 0..w {
                        let [r, g, b, _] = view.rgba(x, y);
                        out.push(gray(r, g, b));
                    }
                }
            },
            PnmFormat::Pbm => {
                write!(out, "P4\n{w} {h}\n")?;
                let row_bytes = (w as usize).div_ceil(8);
                for y in 0..h {
                    let mut row = vec![0u8; row_bytes];
                    for x in 0..w {
                        let [r, g, b, _] = view.rgba(x, y);
                        if gray(r, g, b) <= 127 {
                            row[x as usize / 8] |= 0x80 >> (x % 8);
                        }
                    }
                    out.extend_from_slice(&row);
                }
            },
        }
        Ok(out)
    }

    fn extension(&self) -> &'static str {
        match self.format {
            PnmFormat::Pbm => "pbm",
            PnmFormat::Pgm => "pgm",
            PnmFormat::Ppm => "ppm",
        }
    }

    fn mime_type(&self) -> &'static str {
        match self.format {
            PnmFormat::Pbm => "image/x-portable-bitmap",
            PnmFormat::Pgm => "image/x-portable-graymap",
            PnmFormat::Ppm => "image/x-portable-pixmap",
        }
    }
}
