//! PDF Backend: print jobs that end up as PDF 1.4 files
//!
//! [`PdfSurface`] follows the same page protocol as the PostScript
//! surface. Push it current, bracket each page with
//! [`begin_page`](PdfSurface::begin_page) and
//! [`end_page`](PdfSurface::end_page), then [`finish`](PdfSurface::finish).
//!
//! Content streams stay uncompressed so the output can be read and diffed;
//! image data is deflated.

use std::any::Any;
use std::path::Path;

use gfxdev_core::{ExportError, RenderError, Result, Surface, SurfaceDevice};

pub mod driver;
pub mod writer;

pub use driver::PdfDriver;

/// A print job writing PDF
#[derive(Debug)]
pub struct PdfSurface {
    surface: Surface,
}

impl PdfSurface {
    /// Document with `width × height` point pages
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height }.into());
        }
        let driver = PdfDriver::new(width as f64, height as f64);
        Ok(Self {
            surface: Surface::new(Box::new(driver), 1.0),
        })
    }

    pub fn driver(&self) -> Result<&PdfDriver> {
        self.surface
            .driver_as::<PdfDriver>()
            .ok_or_else(|| lost_driver().into())
    }

    fn driver_mut(&mut self) -> Result<&mut PdfDriver> {
        self.surface
            .driver_as_mut::<PdfDriver>()
            .ok_or_else(|| lost_driver().into())
    }

    pub fn pages(&self) -> u32 {
        self.driver().map(|d| d.pages()).unwrap_or(0)
    }

    pub fn begin_page(&mut self) -> Result<()> {
        self.driver_mut()?.begin_page();
        self.surface.activate();
        Ok(())
    }

    pub fn end_page(&mut self) -> Result<()> {
        self.driver_mut()?.end_page();
        Ok(())
    }

    /// Close the open page and return the file contents
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        let driver = self.driver_mut()?;
        driver.end_page();
        Ok(driver.document())
    }

    /// Finish and write the file to `path`
    pub fn write_to(&mut self, path: &Path) -> Result<()> {
        let pdf = self.finish()?;
        std::fs::write(path, &pdf)
            .map_err(|e| ExportError::WriteFailed(format!("{}: {e}", path.display())))?;
        log::info!(
            "Wrote {} page(s) of PDF ({} bytes) to {}",
            self.pages().max(1),
            pdf.len(),
            path.display()
        );
        Ok(())
    }
}

fn lost_driver() -> RenderError {
    RenderError::Backend("PDF surface lost its driver".into())
}

impl SurfaceDevice for PdfSurface {
    fn surface(&self) -> &Surface {
        &self.surface
    }

    fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
