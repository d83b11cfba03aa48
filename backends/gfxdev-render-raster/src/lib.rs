//! Raster Backend: pixels the way window systems paint them
//!
//! No anti-aliasing, no subpixel tricks. A pixel is painted when its
//! center is covered, thin lines are Bresenham, colors may snap to a
//! 256-entry palette. Widget code that looks right on X11 or GDI looks
//! right here.
//!
//! ## The Modules
//!
//! - `edge` and `scan_converter`: polygons to horizontal spans
//! - `buffer`: the RGBA [`Offscreen`] with damage tracking
//! - `driver`: [`RasterDriver`], the graphics driver itself
//! - `text`: glyph outlines flattened for the scan converter
//! - `image_surface`: [`ImageSurface`], snapshots, masks and detaching
//! - `window`: [`WindowSurface`] and the [`Presenter`] seam
//!
//! ```rust
//! use gfxdev_core::{Color, SurfaceDevice};
//! use gfxdev_render_raster::ImageSurface;
//!
//! let mut offscreen = ImageSurface::new(16, 16, false, 1.0)?;
//! offscreen.surface_mut().set_color(Color::RED);
//! offscreen.surface_mut().rectf(0, 0, 16, 16);
//! let snapshot = offscreen.image()?;
//! assert_eq!(snapshot.pixel(8, 8), Color::RED);
//! # Ok::<(), gfxdev_core::GfxError>(())
//! ```

pub mod buffer;
pub mod driver;
pub mod edge;
pub mod image_surface;
pub mod scan_converter;
pub mod text;
pub mod window;

pub use buffer::Offscreen;
pub use driver::{PixelMode, RasterDriver};
pub use image_surface::{copy_offscreen, ImageSurface};
pub use window::{FrameCapture, Presenter, WindowSurface};
