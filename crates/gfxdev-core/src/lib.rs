//! Gfxdev Core: one drawing API, many targets
//!
//! Widget code draws rectangles, polygons, text and images. Where the ink
//! lands (a window, an offscreen pixel buffer, a printer page, an SVG or
//! PDF file) is decided elsewhere, by whichever surface is current.
//!
//! ## The Pieces
//!
//! 1. **[`GraphicsDriver`]** - Turns device-space primitives into native
//!    output. One implementation per backend.
//! 2. **[`DrawState`]** - Color, line style, font, and the clip, origin and
//!    matrix stacks. Owned by a surface, lent to its driver on every call.
//! 3. **[`Surface`]** - A driver plus its state, and the drawing API widget
//!    code calls. Degenerate input stops here as a no-op.
//! 4. **[`RenderContext`]** - Knows which surface is current and keeps a
//!    bounded stack of earlier ones for nested redirection.
//!
//! ## Draw Something
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use gfxdev_core::{Color, RenderContext, Surface, SurfaceRef};
//! use gfxdev_core::record::RecordingDriver;
//!
//! let target: SurfaceRef = Rc::new(RefCell::new(Surface::new(
//!     Box::new(RecordingDriver::new()),
//!     1.0,
//! )));
//!
//! let mut ctx = RenderContext::new();
//! ctx.set_current(&target)?;
//! ctx.draw(|s| {
//!     s.set_color(Color::RED);
//!     s.push_clip(10, 10, 20, 20);
//!     s.rectf(0, 0, 100, 100);
//!     s.pop_clip()
//! })??;
//! # Ok::<(), gfxdev_core::GfxError>(())
//! ```
//!
//! Backends live in their own crates: raster pixel buffers, tiny-skia
//! compositing, SVG, PostScript and PDF.

pub mod clip;
pub mod color;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod font;
pub mod geometry;
pub mod image;
pub mod matrix;
pub mod path;
pub mod record;
pub mod state;
pub mod style;
pub mod surface;

pub use color::{Color, Palette};
pub use config::{ContextConfig, OverflowPolicy};
pub use context::{RenderContext, SurfaceRef};
pub use driver::{Features, GraphicsDriver, TextRun};
pub use error::{
    ExportError, FontError, GfxError, RenderError, Result, SurfaceError,
};
pub use font::{Align, FontFace, FontId, FontRegistry, OutlineSink};
pub use geometry::{ClipBox, Num, Point, Rect, RectF};
pub use image::{Bitmap, ImageCache, ImageId, ImageView, Pixmap, RgbImage};
pub use matrix::Matrix;
pub use state::{DrawState, FillRule};
pub use style::{Cap, Dash, Join, LineStyle};
pub use surface::{Surface, SurfaceDevice};
