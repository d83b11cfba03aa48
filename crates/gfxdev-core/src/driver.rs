//! The graphics driver contract
//!
//! A driver turns device-space primitives into its backend's native
//! operations. By the time a call reaches a driver the surface has already
//! rejected degenerate input, applied the matrix, origin and scale, and
//! skipped anything the clip rules out entirely. What is left for the
//! driver is to honor the clip in `DrawState` precisely and to paint.
//!
//! Drivers keep no drawing state of their own beyond backend resources
//! (pixel buffers, output streams, image caches). Color, line style and
//! font are read from the `DrawState` passed into each call.

use std::any::Any;

use bitflags::bitflags;

use crate::font::FontId;
use crate::geometry::{Point, Rect, RectF};
use crate::image::{Bitmap, ImageId, ImageView, RgbImage};
use crate::state::{DrawState, FillRule};

bitflags! {
    /// What kind of target a driver renders to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Features: u32 {
        /// An on-screen window of the native window system
        const NATIVE = 1;
        /// A printer or print-like page stream
        const PRINTER = 2;
        /// Output is resolution independent
        const VECTOR = 4;
        /// Edges are anti-aliased
        const ANTIALIAS = 8;
    }
}

/// A string placed in device space
#[derive(Debug, Clone, Copy)]
pub struct TextRun<'a> {
    pub text: &'a str,
    /// Baseline start in device pixels
    pub x: f64,
    pub y: f64,
    /// Counter-clockwise rotation around `(x, y)` in degrees
    pub angle: f64,
    pub font: FontId,
    /// Font size in device pixels
    pub size: f64,
    /// Characters were reversed for right-to-left display
    pub rtl: bool,
}

/// Backend-specific translator from uniform drawing calls to native output
pub trait GraphicsDriver: Any {
    /// Short backend name, for logs
    fn name(&self) -> &'static str;

    fn features(&self) -> Features;

    fn has_feature(&self, mask: Features) -> bool {
        self.features().intersects(mask)
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// The owning surface became the current drawing target
    fn activate(&mut self, _state: &DrawState) {}

    /// The owning surface stops being the current drawing target
    fn deactivate(&mut self) {}

    /// The clip region in `state` was pushed or popped
    fn clip_changed(&mut self, _state: &DrawState) {}

    /// Fill an axis-aligned rectangle
    fn fill_rect(&mut self, state: &DrawState, rect: RectF);

    /// Stroke a polyline with the current line style
    fn stroke_polyline(&mut self, state: &DrawState, points: &[Point], closed: bool);

    /// Fill one or more contours in a single pass
    fn fill_polygon(&mut self, state: &DrawState, contours: &[Vec<Point>], rule: FillRule);

    /// Paint one logical unit at each point; points are top-left corners
    fn draw_points(&mut self, state: &DrawState, points: &[Point]) {
        let size = state.scale();
        for p in points {
            self.fill_rect(state, RectF::new(p.x, p.y, size, size));
        }
    }

    fn draw_text(&mut self, state: &DrawState, run: &TextRun<'_>);

    /// Draw pixels scaled into `dst`
    fn draw_image(&mut self, state: &DrawState, image: &ImageView<'_>, dst: RectF);

    /// Draw an image that may be drawn again, cropped to `src`
    ///
    /// Drivers with a native image representation convert `image` once and
    /// keep it until `uncache_image` or until the image's pixels change.
    fn draw_cached(&mut self, state: &DrawState, image: &RgbImage, src: Rect, dst: RectF) {
        let view = image.view().crop(src);
        if !view.is_empty() {
            self.draw_image(state, &view, dst);
        }
    }

    /// Release any cached representation of `id`
    fn uncache_image(&mut self, _id: ImageId) {}

    /// Paint the set bits of `bitmap` in the current color
    fn draw_bitmap(&mut self, state: &DrawState, bitmap: &Bitmap, dst: RectF) {
        let rgba = bitmap.to_rgba(state.color());
        if let Ok(view) = ImageView::new(&rgba, bitmap.width(), bitmap.height(), 4, None) {
            self.draw_image(state, &view, dst);
        }
    }

    /// Push pending output to the backend
    fn flush(&mut self) {}
}

impl dyn GraphicsDriver {
    /// Downcast to a concrete driver
    pub fn downcast_ref<T: GraphicsDriver>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: GraphicsDriver>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}
