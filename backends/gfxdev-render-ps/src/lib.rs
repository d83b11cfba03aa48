//! PostScript Backend: printing without a printer
//!
//! A [`PostScriptSurface`] is what a print job draws on. Push it current,
//! call [`begin_page`](PostScriptSurface::begin_page), let the widgets
//! draw themselves, [`end_page`](PostScriptSurface::end_page), repeat.
//! The result is PostScript Level 2 text any printer or viewer accepts.
//!
//! Encapsulated PostScript is the same output restricted to one page with
//! an exact bounding box, for embedding into other documents.
//!
//! Printers get fresh image data every time: nothing is cached between
//! jobs, so the default crop-and-draw path serves cached images too.

use std::any::Any;
use std::path::Path;

use gfxdev_core::{ExportError, RenderError, Result, Surface, SurfaceDevice};

pub mod driver;

pub use driver::{escape_string, DocumentKind, PostScriptDriver};

/// US Letter in points
pub const LETTER: (u32, u32) = (612, 792);
/// ISO A4 in points
pub const A4: (u32, u32) = (595, 842);

/// A print job writing PostScript
#[derive(Debug)]
pub struct PostScriptSurface {
    surface: Surface,
}

impl PostScriptSurface {
    /// Multi-page document with `width × height` point pages
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::with_kind(width, height, DocumentKind::PostScript)
    }

    /// Single-page EPS with a `width × height` bounding box
    pub fn eps(width: u32, height: u32) -> Result<Self> {
        Self::with_kind(width, height, DocumentKind::Eps)
    }

    fn with_kind(width: u32, height: u32, kind: DocumentKind) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height }.into());
        }
        let driver = PostScriptDriver::new(width as f64, height as f64, kind);
        Ok(Self {
            surface: Surface::new(Box::new(driver), 1.0),
        })
    }

    pub fn driver(&self) -> Result<&PostScriptDriver> {
        self.surface
            .driver_as::<PostScriptDriver>()
            .ok_or_else(|| lost_driver().into())
    }

    fn driver_mut(&mut self) -> Result<&mut PostScriptDriver> {
        self.surface
            .driver_as_mut::<PostScriptDriver>()
            .ok_or_else(|| lost_driver().into())
    }

    pub fn pages(&self) -> u32 {
        self.driver().map(|d| d.pages()).unwrap_or(0)
    }

    /// Start the next page; EPS allows only one
    pub fn begin_page(&mut self) -> Result<()> {
        let driver = self.driver_mut()?;
        if driver.kind() == DocumentKind::Eps && driver.pages() > 0 {
            return Err(RenderError::Backend("EPS output holds a single page".into()).into());
        }
        driver.begin_page();
        // The new page starts without a clip; re-apply the current one
        self.surface.activate();
        Ok(())
    }

    pub fn end_page(&mut self) -> Result<()> {
        self.driver_mut()?.end_page();
        Ok(())
    }

    /// Close the open page and return the document
    pub fn finish(&mut self) -> Result<String> {
        let driver = self.driver_mut()?;
        driver.end_page();
        Ok(driver.document())
    }

    /// Finish and write the document to `path`
    pub fn write_to(&mut self, path: &Path) -> Result<()> {
        let ps = self.finish()?;
        std::fs::write(path, ps.as_bytes())
            .map_err(|e| ExportError::WriteFailed(format!("{}: {e}", path.display())))?;
        log::info!(
            "Wrote {} page(s) of PostScript ({} bytes) to {}",
            self.pages(),
            ps.len(),
            path.display()
        );
        Ok(())
    }
}

fn lost_driver() -> RenderError {
    RenderError::Backend("PostScript surface lost its driver".into())
}

impl SurfaceDevice for PostScriptSurface {
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
