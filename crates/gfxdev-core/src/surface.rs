//! Surfaces: a driver plus the state it draws with
//!
//! [`Surface`] is the drawing API widget code talks to. It owns exactly one
//! driver and one [`DrawState`], rejects degenerate input, maps logical
//! coordinates to device space and trims what the clip rules out, then
//! hands device-space primitives to the driver.
//!
//! [`SurfaceDevice`] is what a rendering target implements so that a
//! [`RenderContext`](crate::context::RenderContext) can make it current.
//!
//! ## Coordinates
//!
//! Points, lines, rectangles, text positions and clip regions go through
//! the origin stack and the scale factor only. Vertex paths and circles
//! additionally go through the vertex matrix first. Fills cover the pixels
//! whose centers fall inside the shape; strokes run through pixel centers,
//! so a one-unit line at integer `y` covers exactly row `y`.

use std::any::Any;
use std::sync::Arc;

use crate::color::Color;
use crate::driver::{Features, GraphicsDriver, TextRun};
use crate::error::{RenderError, Result};
use crate::font::{Align, FontId, FontRegistry};
use crate::geometry::{ClipBox, Point, Rect, RectF};
use crate::image::{Bitmap, ImageView, Pixmap, RgbImage};
use crate::matrix::Matrix;
use crate::path::{
    arc_points, cubic_points, segments_for_cubic, segments_for_radius, PathKind,
};
use crate::state::{DrawState, FillRule};
use crate::style::{Dash, LineStyle};

/// Largest row band [`Surface::draw_image_cb`] gathers before drawing it
pub const IMAGE_BAND_BYTES: usize = 1 << 20;

/// A rendering target's driver and drawing state
pub struct Surface {
    driver: Box<dyn GraphicsDriver>,
    state: DrawState,
}

impl Surface {
    /// Bind `driver` to a fresh draw state at `scale` device pixels per unit
    pub fn new(driver: Box<dyn GraphicsDriver>, scale: f64) -> Self {
        log::debug!("Creating surface for {} driver at scale {scale}", driver.name());
        Self {
            driver,
            state: DrawState::new(scale),
        }
    }

    pub fn driver(&self) -> &dyn GraphicsDriver {
        self.driver.as_ref()
    }

    pub fn driver_mut(&mut self) -> &mut dyn GraphicsDriver {
        self.driver.as_mut()
    }

    /// The driver as its concrete type
    pub fn driver_as<T: GraphicsDriver>(&self) -> Option<&T> {
        self.driver.as_any().downcast_ref::<T>()
    }

    pub fn driver_as_mut<T: GraphicsDriver>(&mut self) -> Option<&mut T> {
        self.driver.as_any_mut().downcast_mut::<T>()
    }

    pub fn state(&self) -> &DrawState {
        &self.state
    }

    pub fn has_feature(&self, mask: Features) -> bool {
        self.driver.has_feature(mask)
    }

    pub fn scale_factor(&self) -> f64 {
        self.state.scale
    }

    /// Replace the font registry used for measuring and drawing text
    pub fn set_fonts(&mut self, fonts: Arc<FontRegistry>) {
        self.state.fonts = fonts;
    }

    /// Tell the driver its surface became current
    pub fn activate(&mut self) {
        self.driver.activate(&self.state);
    }

    /// Tell the driver its surface is no longer current
    pub fn deactivate(&mut self) {
        self.driver.deactivate();
    }

    pub fn flush(&mut self) {
        self.driver.flush();
    }

    /// True when a device-space box can touch the clip region at all
    fn visible(&self, bounds: RectF) -> bool {
        match self.state.device_clip() {
            None => true,
            Some(clip) => !clip.intersect(&bounds).is_empty(),
        }
    }

    /// Stroke bounds, grown by half the line width and one pixel
    fn stroke_visible(&self, points: &[Point]) -> bool {
        let pad = self.state.device_line_width() / 2.0 + 1.0;
        self.visible(bounds_of(points, pad))
    }

    /// Pixel-center point that ignores the vertex matrix
    fn center_point(&self, x: f64, y: f64) -> Point {
        self.state.to_device_point(x + 0.5, y + 0.5)
    }

    fn stroke(&mut self, points: &[Point], closed: bool) {
        if points.is_empty() || !self.stroke_visible(points) {
            return;
        }
        self.driver.stroke_polyline(&self.state, points, closed);
    }

    fn fill(&mut self, contours: &[Vec<Point>], rule: FillRule) {
        let contours: Vec<Vec<Point>> = contours
            .iter()
            .filter(|c| c.len() >= 3)
            .cloned()
            .collect();
        if contours.is_empty() {
            return;
        }
        let all: Vec<Point> = contours.iter().flatten().copied().collect();
        if !self.visible(bounds_of(&all, 0.0)) {
            return;
        }
        self.driver.fill_polygon(&self.state, &contours, rule);
    }

    // ---------------------------------------------------------------
    // Color and line state
    // ---------------------------------------------------------------

    pub fn set_color(&mut self, color: Color) {
        self.state.color = color;
    }

    /// Select a palette entry
    pub fn set_color_index(&mut self, index: u8) {
        self.state.color = self.state.palette.get(index);
    }

    pub fn set_color_rgb(&mut self, r: u8, g: u8, b: u8) {
        self.state.color = Color::rgb(r, g, b);
    }

    pub fn color(&self) -> Color {
        self.state.color
    }

    /// Reassign one palette entry for later `set_color_index` calls
    pub fn set_palette_entry(&mut self, index: u8, color: Color) {
        self.state.palette.set(index, color);
    }

    pub fn set_line_style(&mut self, style: LineStyle) {
        self.state.line_style = style;
    }

    pub fn line_style(&self) -> &LineStyle {
        &self.state.line_style
    }

    /// Rule used by `end_complex_polygon`
    pub fn set_fill_rule(&mut self, rule: FillRule) {
        self.state.fill_rule = rule;
    }

    // ---------------------------------------------------------------
    // Primitive shapes
    // ---------------------------------------------------------------

    /// One logical pixel at `(x, y)`; like `rect`, ignores the vertex matrix
    pub fn point(&mut self, x: i32, y: i32) {
        let p = self.state.to_device_point(x as f64, y as f64);
        let size = self.state.scale;
        if !self.visible(RectF::new(p.x, p.y, size, size)) {
            return;
        }
        self.driver.draw_points(&self.state, &[p]);
    }

    pub fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        let points = [
            self.center_point(x0 as f64, y0 as f64),
            self.center_point(x1 as f64, y1 as f64),
        ];
        self.stroke(&points, false);
    }

    /// Two connected segments
    pub fn line3(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, x2: i32, y2: i32) {
        let points = [
            self.center_point(x0 as f64, y0 as f64),
            self.center_point(x1 as f64, y1 as f64),
            self.center_point(x2 as f64, y2 as f64),
        ];
        self.stroke(&points, false);
    }

    /// Horizontal line from `x` to `x1` inclusive
    pub fn xyline(&mut self, x: i32, y: i32, x1: i32) {
        self.line(x, y, x1, y);
    }

    /// Vertical line from `y` to `y1` inclusive
    pub fn yxline(&mut self, x: i32, y: i32, y1: i32) {
        self.line(x, y, x, y1);
    }

    /// Rectangle outline covering the pixels `x..x+w`, `y..y+h`
    pub fn rect(&mut self, x: i32, y: i32, w: i32, h: i32) {
        if w <= 0 || h <= 0 {
            return;
        }
        let (x0, y0) = (x as f64, y as f64);
        let (x1, y1) = (x0 + (w - 1) as f64, y0 + (h - 1) as f64);
        let points = [
            self.center_point(x0, y0),
            self.center_point(x1, y0),
            self.center_point(x1, y1),
            self.center_point(x0, y1),
        ];
        self.stroke(&points, true);
    }

    pub fn rectf(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.rectf_f(x as f64, y as f64, w as f64, h as f64);
    }

    /// Filled rectangle at fractional logical coordinates
    pub fn rectf_f(&mut self, x: f64, y: f64, w: f64, h: f64) {
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let rect = self.state.to_device_rect(x, y, w, h);
        let rect = match self.state.device_clip() {
            Some(clip) => clip.intersect(&rect),
            None => rect,
        };
        if rect.is_empty() {
            return;
        }
        self.driver.fill_rect(&self.state, rect);
    }

    /// Fill with an explicit color; the color stays current afterwards
    #[allow(clippy::too_many_arguments)]
    pub fn rectf_rgb(&mut self, x: i32, y: i32, w: i32, h: i32, r: u8, g: u8, b: u8) {
        self.set_color_rgb(r, g, b);
        self.rectf(x, y, w, h);
    }

    /// Closed outline through three points
    pub fn loop3(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, x2: i32, y2: i32) {
        let points = [
            self.center_point(x0 as f64, y0 as f64),
            self.center_point(x1 as f64, y1 as f64),
            self.center_point(x2 as f64, y2 as f64),
        ];
        self.stroke(&points, true);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn loop4(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        x3: i32,
        y3: i32,
    ) {
        let points = [
            self.center_point(x0 as f64, y0 as f64),
            self.center_point(x1 as f64, y1 as f64),
            self.center_point(x2 as f64, y2 as f64),
            self.center_point(x3 as f64, y3 as f64),
        ];
        self.stroke(&points, true);
    }

    /// Filled triangle
    pub fn polygon3(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, x2: i32, y2: i32) {
        let contour = vec![
            self.state.to_device_point(x0 as f64, y0 as f64),
            self.state.to_device_point(x1 as f64, y1 as f64),
            self.state.to_device_point(x2 as f64, y2 as f64),
        ];
        self.fill(&[contour], FillRule::NonZero);
    }

    /// Filled quadrilateral
    #[allow(clippy::too_many_arguments)]
    pub fn polygon4(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        x3: i32,
        y3: i32,
    ) {
        let contour = vec![
            self.state.to_device_point(x0 as f64, y0 as f64),
            self.state.to_device_point(x1 as f64, y1 as f64),
            self.state.to_device_point(x2 as f64, y2 as f64),
            self.state.to_device_point(x3 as f64, y3 as f64),
        ];
        self.fill(&[contour], FillRule::NonZero);
    }

    fn device_segments(&self, rx: f64, ry: f64, sweep: f64) -> usize {
        segments_for_radius(rx.max(ry) * self.state.scale, sweep)
    }

    /// Outline of the elliptical arc inscribed in the box
    ///
    /// Angles in degrees, counter-clockwise from three o'clock.
    pub fn arc(&mut self, x: i32, y: i32, w: i32, h: i32, a1: f64, a2: f64) {
        if w <= 0 || h <= 0 {
            return;
        }
        let rx = (w - 1) as f64 / 2.0;
        let ry = (h - 1) as f64 / 2.0;
        let cx = x as f64 + rx;
        let cy = y as f64 + ry;
        let n = self.device_segments(rx, ry, a2 - a1);
        let points: Vec<Point> = arc_points(cx, cy, rx, ry, a1, a2, n)
            .into_iter()
            .map(|p| self.center_point(p.x, p.y))
            .collect();
        let closed = (a2 - a1).abs() >= 360.0;
        self.stroke(&points, closed);
    }

    /// Filled slice of the ellipse inscribed in the box
    pub fn pie(&mut self, x: i32, y: i32, w: i32, h: i32, a1: f64, a2: f64) {
        if w <= 0 || h <= 0 {
            return;
        }
        let rx = w as f64 / 2.0;
        let ry = h as f64 / 2.0;
        let cx = x as f64 + rx;
        let cy = y as f64 + ry;
        let n = self.device_segments(rx, ry, a2 - a1);
        let mut contour: Vec<Point> = arc_points(cx, cy, rx, ry, a1, a2, n)
            .into_iter()
            .map(|p| self.state.to_device_point(p.x, p.y))
            .collect();
        if (a2 - a1).abs() < 360.0 {
            contour.push(self.state.to_device_point(cx, cy));
        }
        self.fill(&[contour], FillRule::NonZero);
    }

    /// Ellipse outline inscribed in the box
    pub fn ellipse(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.arc(x, y, w, h, 0.0, 360.0);
    }

    /// Filled ellipse inscribed in the box
    pub fn filled_ellipse(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.pie(x, y, w, h, 0.0, 360.0);
    }

    /// Circle outline around `(x, y)`, through the vertex matrix
    pub fn circle(&mut self, x: f64, y: f64, r: f64) {
        if r <= 0.0 {
            return;
        }
        let scale = self.state.matrix.current().mean_scale() * self.state.scale;
        let n = segments_for_radius(r * scale, 360.0);
        let points: Vec<Point> = arc_points(x, y, r, r, 0.0, 360.0, n)
            .into_iter()
            .map(|p| self.state.stroke_vertex(p.x, p.y))
            .collect();
        self.stroke(&points, true);
    }

    fn rounded_outline(x: f64, y: f64, w: f64, h: f64, r: f64, n: usize) -> Vec<Point> {
        let r = r.min(w / 2.0).min(h / 2.0).max(0.0);
        let corners = [
            (x + w - r, y + r, 0.0),
            (x + r, y + r, 90.0),
            (x + r, y + h - r, 180.0),
            (x + w - r, y + h - r, 270.0),
        ];
        let mut points = Vec::new();
        for (cx, cy, start) in corners {
            points.extend(arc_points(cx, cy, r, r, start, start + 90.0, n));
        }
        points.dedup();
        points
    }

    /// Rectangle outline with corners of radius `r`
    pub fn rounded_rect(&mut self, x: i32, y: i32, w: i32, h: i32, r: i32) {
        if w <= 0 || h <= 0 {
            return;
        }
        let n = self.device_segments(r as f64, r as f64, 90.0);
        let outline = Self::rounded_outline(
            x as f64,
            y as f64,
            (w - 1) as f64,
            (h - 1) as f64,
            r as f64,
            n,
        );
        let points: Vec<Point> = outline
            .into_iter()
            .map(|p| self.center_point(p.x, p.y))
            .collect();
        self.stroke(&points, true);
    }

    /// Filled rectangle with corners of radius `r`
    pub fn rounded_rectf(&mut self, x: i32, y: i32, w: i32, h: i32, r: i32) {
        if w <= 0 || h <= 0 {
            return;
        }
        let n = self.device_segments(r as f64, r as f64, 90.0);
        let outline =
            Self::rounded_outline(x as f64, y as f64, w as f64, h as f64, r as f64, n);
        let contour: Vec<Point> = outline
            .into_iter()
            .map(|p| self.state.to_device_point(p.x, p.y))
            .collect();
        self.fill(&[contour], FillRule::NonZero);
    }

    /// Dotted outline for keyboard focus; line style is left unchanged
    pub fn focus_rect(&mut self, x: i32, y: i32, w: i32, h: i32) {
        let saved = self.state.line_style.clone();
        self.state.line_style = LineStyle::default().with_dash(Dash::Dot);
        self.rect(x, y, w, h);
        self.state.line_style = saved;
    }

    // ---------------------------------------------------------------
    // Vertex paths
    // ---------------------------------------------------------------

    pub fn begin_points(&mut self) {
        self.state.path.begin(PathKind::Points);
    }

    pub fn begin_line(&mut self) {
        self.state.path.begin(PathKind::Line);
    }

    pub fn begin_loop(&mut self) {
        self.state.path.begin(PathKind::Loop);
    }

    pub fn begin_polygon(&mut self) {
        self.state.path.begin(PathKind::Polygon);
    }

    /// Start a polygon whose contours are separated by [`gap`](Self::gap)
    pub fn begin_complex_polygon(&mut self) {
        self.state.path.begin(PathKind::ComplexPolygon);
    }

    /// Add a vertex, transformed by the current matrix
    pub fn vertex(&mut self, x: f64, y: f64) {
        let p = self.state.matrix_vertex(x, y);
        self.state.path.add(p);
    }

    /// Cubic Bézier from `(x0, y0)` through two control points to `(x3, y3)`
    #[allow(clippy::too_many_arguments)]
    pub fn curve(
        &mut self,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x3: f64,
        y3: f64,
    ) {
        let p0 = self.state.matrix_vertex(x0, y0);
        let p1 = self.state.matrix_vertex(x1, y1);
        let p2 = self.state.matrix_vertex(x2, y2);
        let p3 = self.state.matrix_vertex(x3, y3);
        let s = self.state.scale;
        let scaled = |p: Point| Point::new(p.x * s, p.y * s);
        let n = segments_for_cubic(scaled(p0), scaled(p1), scaled(p2), scaled(p3));
        for p in cubic_points(p0, p1, p2, p3, n) {
            self.state.path.add(p);
        }
    }

    /// Circular arc around `(x, y)` added to the path
    pub fn arc_vertices(&mut self, x: f64, y: f64, r: f64, start: f64, end: f64) {
        let scale = self.state.matrix.current().mean_scale() * self.state.scale;
        let n = segments_for_radius(r * scale, end - start);
        for p in arc_points(x, y, r, r, start, end, n) {
            let p = self.state.matrix_vertex(p.x, p.y);
            self.state.path.add(p);
        }
    }

    /// Full circle added to the path as its own contour
    pub fn circle_vertices(&mut self, x: f64, y: f64, r: f64) {
        self.arc_vertices(x, y, r, 0.0, 360.0);
    }

    /// Close the current contour of a complex polygon and start another
    pub fn gap(&mut self) {
        self.state.path.gap();
    }

    fn finish_path(&mut self, kind: PathKind, centered: bool) -> Vec<Vec<Point>> {
        let contours = self.state.path.finish(kind).unwrap_or_default();
        let offset = if centered { 0.5 } else { 0.0 };
        contours
            .into_iter()
            .map(|c| {
                c.into_iter()
                    .map(|p| self.state.to_device_point(p.x + offset, p.y + offset))
                    .collect()
            })
            .collect()
    }

    pub fn end_points(&mut self) {
        let points: Vec<Point> = self
            .finish_path(PathKind::Points, false)
            .into_iter()
            .flatten()
            .collect();
        if points.is_empty() {
            return;
        }
        self.driver.draw_points(&self.state, &points);
    }

    pub fn end_line(&mut self) {
        for contour in self.finish_path(PathKind::Line, true) {
            if contour.len() >= 2 {
                self.stroke(&contour, false);
            }
        }
    }

    pub fn end_loop(&mut self) {
        for contour in self.finish_path(PathKind::Loop, true) {
            if contour.len() >= 2 {
                self.stroke(&contour, true);
            }
        }
    }

    pub fn end_polygon(&mut self) {
        let contours = self.finish_path(PathKind::Polygon, false);
        for contour in contours {
            self.fill(&[contour], FillRule::NonZero);
        }
    }

    /// Fill every contour in one pass with the current fill rule
    pub fn end_complex_polygon(&mut self) {
        let contours = self.finish_path(PathKind::ComplexPolygon, false);
        let rule = self.state.fill_rule;
        self.fill(&contours, rule);
    }

    // ---------------------------------------------------------------
    // Vertex matrix
    // ---------------------------------------------------------------

    pub fn push_matrix(&mut self) {
        self.state.matrix.push();
    }

    pub fn pop_matrix(&mut self) -> Result<()> {
        self.state.matrix.pop()
    }

    pub fn mult_matrix(&mut self, a: f64, b: f64, c: f64, d: f64, x: f64, y: f64) {
        self.state.matrix.mult(&Matrix::new(a, b, c, d, x, y));
    }

    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.state.matrix.mult(&Matrix::scaling(sx, sy));
    }

    pub fn translate_matrix(&mut self, x: f64, y: f64) {
        self.state.matrix.mult(&Matrix::translation(x, y));
    }

    /// Rotate by `degrees`, counter-clockwise
    pub fn rotate(&mut self, degrees: f64) {
        self.state.matrix.mult(&Matrix::rotation(degrees));
    }

    pub fn transform_x(&self, x: f64, y: f64) -> f64 {
        self.state.matrix_vertex(x, y).x
    }

    pub fn transform_y(&self, x: f64, y: f64) -> f64 {
        self.state.matrix_vertex(x, y).y
    }

    // ---------------------------------------------------------------
    // Clipping
    // ---------------------------------------------------------------

    /// Intersect the clip region with a rectangle, saving the old one
    pub fn push_clip(&mut self, x: i32, y: i32, w: i32, h: i32) {
        let (ox, oy) = self.state.origin();
        self.state.clip.push(Rect::new(x, y, w, h).offset(ox, oy));
        self.driver.clip_changed(&self.state);
    }

    /// Temporarily lift all clipping
    pub fn push_no_clip(&mut self) {
        self.state.clip.push_none();
        self.driver.clip_changed(&self.state);
    }

    pub fn pop_clip(&mut self) -> Result<()> {
        self.state.clip.pop()?;
        self.driver.clip_changed(&self.state);
        Ok(())
    }

    /// Classify a rectangle against the clip region
    ///
    /// The carried rectangle is in the caller's coordinates.
    pub fn clip_box(&self, x: i32, y: i32, w: i32, h: i32) -> ClipBox {
        let (ox, oy) = self.state.origin();
        let (bx, by) = (ox.saturating_neg(), oy.saturating_neg());
        match self.state.clip.clip_box(Rect::new(x, y, w, h).offset(ox, oy)) {
            ClipBox::Outside => ClipBox::Outside,
            ClipBox::Inside(r) => ClipBox::Inside(r.offset(bx, by)),
            ClipBox::Partial(r) => ClipBox::Partial(r.offset(bx, by)),
        }
    }

    /// False only when the rectangle is certainly invisible
    pub fn not_clipped(&self, x: i32, y: i32, w: i32, h: i32) -> bool {
        !matches!(self.clip_box(x, y, w, h), ClipBox::Outside)
    }

    /// Current clip region, origin applied; `None` when unclipped
    pub fn clip_region(&self) -> Option<Rect> {
        self.state.clip.top()
    }

    /// Run `f` with an extra clip rectangle pushed
    pub fn with_clip<R>(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        f: impl FnOnce(&mut Surface) -> R,
    ) -> R {
        self.push_clip(x, y, w, h);
        let result = f(self);
        // A balanced closure leaves our own entry on top
        if let Err(e) = self.pop_clip() {
            log::warn!("Unbalanced clip stack inside with_clip: {e}");
        }
        result
    }

    // ---------------------------------------------------------------
    // Translation
    // ---------------------------------------------------------------

    /// Move the origin by `(dx, dy)`
    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.state.origin.translate(dx, dy);
    }

    /// Undo the most recent `translate`
    pub fn untranslate(&mut self) -> Result<()> {
        self.state.origin.untranslate()
    }

    pub fn origin(&self) -> (i32, i32) {
        self.state.origin()
    }

    // ---------------------------------------------------------------
    // Text
    // ---------------------------------------------------------------

    pub fn set_font(&mut self, font: FontId, size: f64) {
        self.state.font = font;
        self.state.font_size = size.max(0.0);
    }

    pub fn font(&self) -> FontId {
        self.state.font
    }

    pub fn size(&self) -> f64 {
        self.state.font_size
    }

    /// Advance width of `text` in logical units
    pub fn width(&self, text: &str) -> f64 {
        self.state.text_width(text)
    }

    /// Line height of the current font
    pub fn height(&self) -> f64 {
        self.state.text_height()
    }

    pub fn descent(&self) -> f64 {
        self.state.text_descent()
    }

    /// Width and height of possibly multi-line text
    pub fn measure(&self, text: &str) -> (f64, f64) {
        if text.is_empty() {
            return (0.0, 0.0);
        }
        let lines: Vec<&str> = text.split('\n').collect();
        let width = lines
            .iter()
            .map(|line| self.width(line))
            .fold(0.0_f64, f64::max);
        (width, lines.len() as f64 * self.height())
    }

    fn text_run(&mut self, text: &str, x: f64, y: f64, angle: f64, rtl: bool) {
        if text.is_empty() || self.state.font_size <= 0.0 {
            return;
        }
        if angle == 0.0 {
            let face = self.state.face();
            let ascent = face.ascent(self.state.font_size);
            let bounds = self.state.to_device_rect(
                x,
                y - ascent,
                self.width(text),
                self.height(),
            );
            if !self.visible(bounds) {
                return;
            }
        }
        let origin = self.state.to_device_point(x, y);
        let run = TextRun {
            text,
            x: origin.x,
            y: origin.y,
            angle,
            font: self.state.font,
            size: self.state.device_font_size(),
            rtl,
        };
        self.driver.draw_text(&self.state, &run);
    }

    /// Draw `text` with its baseline starting at `(x, y)`
    pub fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        self.text_run(text, x as f64, y as f64, 0.0, false);
    }

    /// Draw `text` rotated counter-clockwise by `angle` degrees around `(x, y)`
    pub fn draw_text_rotated(&mut self, angle: f64, text: &str, x: i32, y: i32) {
        self.text_run(text, x as f64, y as f64, angle, false);
    }

    /// Right-to-left text: characters reversed, ending at `x`
    pub fn rtl_draw(&mut self, text: &str, x: i32, y: i32) {
        if text.is_empty() {
            return;
        }
        let reversed: String = text.chars().rev().collect();
        let start = x as f64 - self.width(text);
        self.text_run(&reversed, start, y as f64, 0.0, true);
    }

    /// Lay out multi-line text inside a box
    ///
    /// Lines split at `'\n'`. Without horizontal or vertical bits the block
    /// is centered; `Align::CLIP` clips the text to the box.
    pub fn draw_text_aligned(&mut self, text: &str, x: i32, y: i32, w: i32, h: i32, align: Align) {
        if text.is_empty() {
            return;
        }
        if align.contains(Align::CLIP) {
            if w <= 0 || h <= 0 {
                return;
            }
            self.with_clip(x, y, w, h, |s| s.layout_text(text, x, y, w, h, align));
        } else {
            self.layout_text(text, x, y, w, h, align);
        }
    }

    fn layout_text(&mut self, text: &str, x: i32, y: i32, w: i32, h: i32, align: Align) {
        let line_height = self.height();
        let ascent = line_height - self.descent();
        let lines: Vec<&str> = text.split('\n').collect();
        let total = lines.len() as f64 * line_height;
        let (x, y, w, h) = (x as f64, y as f64, w as f64, h as f64);

        let top = if align.contains(Align::TOP) {
            y
        } else if align.contains(Align::BOTTOM) {
            y + h - total
        } else {
            y + (h - total) / 2.0
        };

        for (i, line) in lines.iter().enumerate() {
            let lw = self.width(line);
            let lx = if align.contains(Align::LEFT) {
                x
            } else if align.contains(Align::RIGHT) {
                x + w - lw
            } else {
                x + (w - lw) / 2.0
            };
            let baseline = top + i as f64 * line_height + ascent;
            self.text_run(line, lx.round(), baseline.round(), 0.0, false);
        }
    }

    // ---------------------------------------------------------------
    // Images
    // ---------------------------------------------------------------

    fn image_dst(&self, x: f64, y: f64, w: f64, h: f64) -> Option<RectF> {
        if w <= 0.0 || h <= 0.0 {
            return None;
        }
        let dst = self.state.to_device_rect(x, y, w, h);
        self.visible(dst).then_some(dst)
    }

    /// Draw raw pixels scaled into the box
    pub fn draw_image(&mut self, image: &ImageView<'_>, x: i32, y: i32, w: i32, h: i32) {
        if image.is_empty() {
            return;
        }
        if let Some(dst) = self.image_dst(x as f64, y as f64, w as f64, h as f64) {
            self.driver.draw_image(&self.state, image, dst);
        }
    }

    /// Draw a single-channel gray image at its natural size
    pub fn draw_image_mono(&mut self, data: &[u8], x: i32, y: i32, w: i32, h: i32) {
        if w <= 0 || h <= 0 {
            return;
        }
        match ImageView::new(data, w as u32, h as u32, 1, None) {
            Ok(view) => self.draw_image(&view, x, y, w, h),
            Err(e) => log::warn!("draw_image_mono skipped: {e}"),
        }
    }

    /// Draw an image whose rows are produced on demand
    ///
    /// `rows` is called as `rows(x, y, width, buffer)` and must fill
    /// `buffer` (`width × depth` bytes) with pixels `x..x+width` of image
    /// row `y`. Only the part inside the clip region is requested, and rows
    /// are gathered in bands of at most [`IMAGE_BAND_BYTES`], each drawn as
    /// its own strip.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_image_cb<F>(
        &mut self,
        mut rows: F,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        depth: u8,
    ) -> Result<()>
    where
        F: FnMut(u32, u32, u32, &mut [u8]),
    {
        if w <= 0 || h <= 0 {
            return Ok(());
        }
        if !(1..=4).contains(&depth) {
            log::warn!("draw_image_cb skipped: unsupported depth {depth}");
            return Ok(());
        }
        let Some(vis) = self.clip_box(x, y, w, h).visible() else {
            return Ok(());
        };
        let (vw, vh) = (vis.w as usize, vis.h as usize);
        let row_len = vw
            .checked_mul(depth as usize)
            .ok_or(RenderError::AllocationFailed { bytes: usize::MAX })?;
        let band_rows = (IMAGE_BAND_BYTES / row_len).clamp(1, vh);
        let band_len = row_len
            .checked_mul(band_rows)
            .ok_or(RenderError::AllocationFailed { bytes: usize::MAX })?;
        let mut data = Vec::new();
        data.try_reserve_exact(band_len)
            .map_err(|_| RenderError::AllocationFailed { bytes: band_len })?;
        data.resize(band_len, 0);

        let src_x = vis.x.saturating_sub(x).max(0) as u32;
        let src_y = vis.y.saturating_sub(y).max(0) as u32;
        let mut done = 0;
        while done < vh {
            let count = band_rows.min(vh - done);
            let band = &mut data[..count * row_len];
            for (i, chunk) in band.chunks_mut(row_len).enumerate() {
                rows(src_x, src_y + (done + i) as u32, vw as u32, chunk);
            }
            let view = ImageView::new(band, vw as u32, count as u32, depth, None)?;
            let band_y = vis.y.saturating_add(done as i32);
            self.draw_image(&view, vis.x, band_y, vis.w, count as i32);
            done += count;
        }
        Ok(())
    }

    /// Draw `src` of a cacheable image scaled into `dst`
    pub fn draw_rgb_region(&mut self, image: &RgbImage, src: Rect, dst: Rect) {
        if src.is_empty() {
            return;
        }
        if let Some(dst) = self.image_dst(dst.x as f64, dst.y as f64, dst.w as f64, dst.h as f64)
        {
            self.driver.draw_cached(&self.state, image, src, dst);
        }
    }

    /// Draw a whole image at its display size
    pub fn draw_rgb(&mut self, image: &RgbImage, x: i32, y: i32) {
        let src = Rect::new(0, 0, image.width() as i32, image.height() as i32);
        let dst = Rect::new(
            x,
            y,
            image.display_width() as i32,
            image.display_height() as i32,
        );
        self.draw_rgb_region(image, src, dst);
    }

    /// Paint the set bits of a bitmap in the current color
    pub fn draw_bitmap(&mut self, bitmap: &Bitmap, x: i32, y: i32, w: i32, h: i32) {
        if bitmap.width() == 0 || bitmap.height() == 0 {
            return;
        }
        if let Some(dst) = self.image_dst(x as f64, y as f64, w as f64, h as f64) {
            self.driver.draw_bitmap(&self.state, bitmap, dst);
        }
    }

    /// Draw an indexed-color image at its natural size
    pub fn draw_pixmap(&mut self, pixmap: &Pixmap, x: i32, y: i32) {
        self.draw_rgb(pixmap.rgb(), x, y);
    }

    /// Release the driver's cached copy of `image`
    pub fn uncache(&mut self, image: &RgbImage) {
        self.driver.uncache_image(image.id());
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("driver", &self.driver.name())
            .field("scale", &self.state.scale)
            .finish()
    }
}

/// Bounding box of `points`, grown by `pad` on each side
fn bounds_of(points: &[Point], pad: f64) -> RectF {
    let mut x0 = f64::INFINITY;
    let mut y0 = f64::INFINITY;
    let mut x1 = f64::NEG_INFINITY;
    let mut y1 = f64::NEG_INFINITY;
    for p in points {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    if x0 > x1 {
        return RectF::default();
    }
    RectF::new(x0 - pad, y0 - pad, x1 - x0 + 2.0 * pad, y1 - y0 + 2.0 * pad)
}

/// A rendering target that can be made current
///
/// The default hooks forward to the driver. Implementors override them to
/// bind or flush native resources, and must still call through to the
/// surface.
pub trait SurfaceDevice: Any {
    fn surface(&self) -> &Surface;

    fn surface_mut(&mut self) -> &mut Surface;

    /// Called after this device became current
    fn set_current_hook(&mut self) {
        self.surface_mut().activate();
    }

    /// Called when another device replaces this one as current
    fn end_current(&mut self) {
        self.surface_mut().deactivate();
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl SurfaceDevice for Surface {
    fn surface(&self) -> &Surface {
        self
    }

    fn surface_mut(&mut self) -> &mut Surface {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DrawCommand, RecordingDriver};

    fn surface() -> Surface {
        Surface::new(Box::new(RecordingDriver::new()), 1.0)
    }

    fn commands(s: &Surface) -> Vec<DrawCommand> {
        s.driver_as::<RecordingDriver>()
            .map(|d| d.commands().to_vec())
            .unwrap_or_default()
    }

    #[test]
    fn test_degenerate_rects_are_noops() {
        let mut s = surface();
        s.rectf(0, 0, 0, 10);
        s.rectf(0, 0, 10, -1);
        s.rect(0, 0, 0, 0);
        s.arc(0, 0, 0, 5, 0.0, 90.0);
        s.pie(0, 0, 5, 0, 0.0, 90.0);
        s.rounded_rectf(0, 0, -4, 4, 2);
        s.draw_text("", 10, 10);
        s.draw_image_mono(&[], 0, 0, 0, 0);
        assert!(commands(&s).is_empty());
    }

    #[test]
    fn test_rectf_applies_origin_and_scale() {
        let mut s = Surface::new(Box::new(RecordingDriver::new()), 2.0);
        s.translate(5, 5);
        s.rectf(1, 2, 3, 4);
        assert_eq!(
            commands(&s),
            vec![DrawCommand::FillRect {
                rect: RectF::new(12.0, 14.0, 6.0, 8.0),
                color: Color::BLACK,
            }]
        );
    }

    #[test]
    fn test_rectf_outside_clip_skipped() {
        let mut s = surface();
        s.push_clip(0, 0, 10, 10);
        s.rectf(20, 20, 5, 5);
        s.rectf(5, 5, 10, 10);
        let cmds = commands(&s);
        // ClipChanged + one trimmed fill
        assert_eq!(cmds.len(), 2);
        assert_eq!(
            cmds[1],
            DrawCommand::FillRect {
                rect: RectF::new(5.0, 5.0, 5.0, 5.0),
                color: Color::BLACK,
            }
        );
    }

    #[test]
    fn test_color_persists() {
        let mut s = surface();
        s.set_color(Color::RED);
        s.rectf(0, 0, 1, 1);
        s.rectf(1, 1, 1, 1);
        for cmd in commands(&s) {
            if let DrawCommand::FillRect { color, .. } = cmd {
                assert_eq!(color, Color::RED);
            }
        }
        s.rectf_rgb(0, 0, 1, 1, 0, 0, 255);
        assert_eq!(s.color(), Color::BLUE);
    }

    #[test]
    fn test_color_index_uses_palette() {
        let mut s = surface();
        s.set_color_index(crate::color::index::RED);
        assert_eq!(s.color(), Color::RED);
        s.set_palette_entry(20, Color::rgb(1, 2, 3));
        s.set_color_index(20);
        assert_eq!(s.color(), Color::rgb(1, 2, 3));
    }

    #[test]
    fn test_complex_polygon_single_call() {
        let mut s = surface();
        s.begin_complex_polygon();
        s.vertex(0.0, 0.0);
        s.vertex(10.0, 0.0);
        s.vertex(10.0, 10.0);
        s.vertex(0.0, 10.0);
        s.gap();
        s.vertex(3.0, 3.0);
        s.vertex(7.0, 3.0);
        s.vertex(7.0, 7.0);
        s.vertex(3.0, 7.0);
        s.end_complex_polygon();
        let cmds = commands(&s);
        assert_eq!(cmds.len(), 1);
        match &cmds[0] {
            DrawCommand::FillPolygon { contours, rule, .. } => {
                assert_eq!(contours.len(), 2);
                assert_eq!(*rule, FillRule::EvenOdd);
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_matrix_applies_to_vertices_only() {
        let mut s = surface();
        s.push_matrix();
        s.translate_matrix(100.0, 0.0);
        s.begin_polygon();
        s.vertex(0.0, 0.0);
        s.vertex(1.0, 0.0);
        s.vertex(1.0, 1.0);
        s.end_polygon();
        s.rectf(0, 0, 1, 1);
        s.point(2, 3);
        s.pop_matrix().unwrap();
        let cmds = commands(&s);
        match &cmds[0] {
            DrawCommand::FillPolygon { contours, .. } => {
                assert_eq!(contours[0][0], Point::new(100.0, 0.0));
            },
            other => panic!("unexpected command {other:?}"),
        }
        assert!(matches!(
            cmds[1],
            DrawCommand::FillRect { rect, .. } if rect == RectF::new(0.0, 0.0, 1.0, 1.0)
        ));
        match &cmds[2] {
            DrawCommand::Points { points, .. } => {
                assert_eq!(points, &vec![Point::new(2.0, 3.0)]);
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_far_off_screen_geometry_saturates() {
        let mut s = surface();
        s.rect(i32::MAX - 10, 0, 100, 5);
        match &commands(&s)[0] {
            DrawCommand::StrokePolyline { points, .. } => {
                assert_eq!(points[1].x, i32::MAX as f64 + 89.5);
            },
            other => panic!("unexpected command {other:?}"),
        }

        s.translate(i32::MAX - 5, 0);
        s.push_clip(10, 0, 5, 5);
        assert_eq!(s.clip_region().map(|r| r.x), Some(i32::MAX));
        assert_eq!(s.clip_box(10, 0, 5, 5), ClipBox::Outside);
        assert!(!s.not_clipped(10, 0, 5, 5));
        s.pop_clip().unwrap();
        s.untranslate().unwrap();

        s.translate(i32::MAX - 20, 0);
        s.push_clip(0, 0, 10, 10);
        assert_eq!(
            s.clip_box(5, 0, 100, 5),
            ClipBox::Partial(Rect::new(5, 0, 5, 5))
        );
        s.pop_clip().unwrap();
        s.untranslate().unwrap();
        assert_eq!(s.origin(), (0, 0));
    }

    #[test]
    fn test_line_through_pixel_centers() {
        let mut s = surface();
        s.line(0, 0, 4, 0);
        assert_eq!(
            commands(&s),
            vec![DrawCommand::StrokePolyline {
                points: vec![Point::new(0.5, 0.5), Point::new(4.5, 0.5)],
                closed: false,
                color: Color::BLACK,
                width: 1.0,
            }]
        );
    }

    #[test]
    fn test_rtl_text_reversed_and_ends_at_x() {
        let mut s = surface();
        s.set_font(FontId::Courier, 10.0);
        s.rtl_draw("abc", 30, 20);
        match &commands(&s)[0] {
            DrawCommand::Text { text, x, rtl, .. } => {
                assert_eq!(text, "cba");
                assert!((x - 12.0).abs() < 1e-9);
                assert!(*rtl);
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_measure_multiline() {
        let mut s = surface();
        s.set_font(FontId::Courier, 10.0);
        let (w, h) = s.measure("ab\nabcd");
        assert!((w - 24.0).abs() < 1e-9);
        assert!((h - 20.0).abs() < 1e-9);
        assert_eq!(s.measure(""), (0.0, 0.0));
    }

    #[test]
    fn test_aligned_text_clip_is_balanced() {
        let mut s = surface();
        s.draw_text_aligned("hi\nthere", 0, 0, 100, 50, Align::LEFT | Align::CLIP);
        assert_eq!(s.clip_region(), None);
        let texts: Vec<String> = commands(&s)
            .into_iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, x, .. } => {
                    assert_eq!(x, 0.0);
                    Some(text)
                },
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["hi".to_string(), "there".to_string()]);
    }

    #[test]
    fn test_image_cb_collects_rows() {
        let mut s = surface();
        s.draw_image_cb(
            |_, y, w, buf| {
                assert_eq!(buf.len(), w as usize);
                buf.fill(y as u8);
            },
            0,
            0,
            3,
            2,
            1,
        )
        .unwrap();
        assert!(matches!(
            commands(&s)[0],
            DrawCommand::Image { width: 3, height: 2, depth: 1, .. }
        ));
    }

    fn image_commands(s: &Surface) -> Vec<(u32, u32, RectF)> {
        commands(s)
            .into_iter()
            .filter_map(|c| match c {
                DrawCommand::Image { width, height, dst, .. } => Some((width, height, dst)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_image_cb_requests_only_visible_rows() {
        let mut s = surface();
        s.push_clip(0, 0, 10, 10);
        let mut calls = Vec::new();
        s.draw_image_cb(
            |x, y, w, buf| {
                calls.push((x, y, w));
                buf.fill(0x80);
            },
            -5,
            -2,
            100_000,
            100_000,
            3,
        )
        .unwrap();
        assert_eq!(calls.len(), 10);
        assert_eq!(calls[0], (5, 2, 10));
        assert_eq!(calls[9], (5, 11, 10));
        assert_eq!(
            image_commands(&s),
            vec![(10, 10, RectF::new(0.0, 0.0, 10.0, 10.0))]
        );
    }

    #[test]
    fn test_image_cb_draws_in_bands() {
        let mut s = surface();
        let mut next_row = 0;
        s.draw_image_cb(
            |x, y, w, buf| {
                assert_eq!((x, y, w), (0, next_row, 1024));
                assert_eq!(buf.len(), 4096);
                next_row += 1;
            },
            0,
            0,
            1024,
            300,
            4,
        )
        .unwrap();
        assert_eq!(next_row, 300);
        assert_eq!(
            image_commands(&s),
            vec![
                (1024, 256, RectF::new(0.0, 0.0, 1024.0, 256.0)),
                (1024, 44, RectF::new(0.0, 256.0, 1024.0, 44.0)),
            ]
        );
    }

    #[test]
    fn test_image_cb_fully_clipped_requests_nothing() {
        let mut s = surface();
        s.push_clip(0, 0, 10, 10);
        let mut called = false;
        s.draw_image_cb(|_, _, _, _| called = true, 50, 50, 100_000, 100_000, 3)
            .unwrap();
        assert!(!called);
        assert!(image_commands(&s).is_empty());
    }

    #[test]
    fn test_draw_rgb_uses_display_size() {
        let mut s = surface();
        let image = RgbImage::new(vec![0; 4 * 4 * 3], 4, 4, 3)
            .unwrap()
            .with_display_size(2, 2);
        s.draw_rgb(&image, 1, 1);
        s.uncache(&image);
        let cmds = commands(&s);
        assert_eq!(
            cmds[0],
            DrawCommand::Cached {
                id: image.id(),
                src: Rect::new(0, 0, 4, 4),
                dst: RectF::new(1.0, 1.0, 2.0, 2.0),
            }
        );
        assert_eq!(cmds[1], DrawCommand::Uncache(image.id()));
    }

    #[test]
    fn test_focus_rect_restores_style() {
        let mut s = surface();
        s.set_line_style(LineStyle::solid(3.0));
        s.focus_rect(0, 0, 10, 10);
        assert_eq!(s.line_style(), &LineStyle::solid(3.0));
    }
}
