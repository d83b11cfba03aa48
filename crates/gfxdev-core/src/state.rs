//! Mutable drawing state owned by a surface
//!
//! Color, line style, font and the coordinate stacks all live here rather
//! than inside the driver. A driver receives `&DrawState` on every call and
//! reads whatever it needs; the state survives redirection untouched
//! because nothing but its own surface ever mutates it.

use std::sync::Arc;

use crate::clip::{ClipStack, OriginStack};
use crate::color::{Color, Palette};
use crate::font::{FontFace, FontId, FontRegistry};
use crate::geometry::{Point, Rect, RectF};
use crate::matrix::MatrixStack;
use crate::path::VertexPath;
use crate::style::LineStyle;

/// Rule deciding which regions of a self-intersecting polygon are inside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    NonZero,
    #[default]
    EvenOdd,
}

/// Everything a driver needs to know about the current drawing state
#[derive(Debug, Clone)]
pub struct DrawState {
    pub(crate) color: Color,
    pub(crate) line_style: LineStyle,
    pub(crate) font: FontId,
    pub(crate) font_size: f64,
    pub(crate) fonts: Arc<FontRegistry>,
    pub(crate) palette: Palette,
    pub(crate) clip: ClipStack,
    pub(crate) origin: OriginStack,
    pub(crate) matrix: MatrixStack,
    pub(crate) path: VertexPath,
    pub(crate) fill_rule: FillRule,
    pub(crate) scale: f64,
}

/// Font size used until `set_font` is called
pub const DEFAULT_FONT_SIZE: f64 = 14.0;

impl DrawState {
    /// Fresh state at `scale` device pixels per logical unit
    pub fn new(scale: f64) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            log::warn!("Invalid display scale {scale}, using 1.0");
            1.0
        };
        Self {
            color: Color::BLACK,
            line_style: LineStyle::default(),
            font: FontId::Helvetica,
            font_size: DEFAULT_FONT_SIZE,
            fonts: Arc::new(FontRegistry::new()),
            palette: Palette::new(),
            clip: ClipStack::new(),
            origin: OriginStack::new(),
            matrix: MatrixStack::new(),
            path: VertexPath::new(),
            fill_rule: FillRule::default(),
            scale,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn line_style(&self) -> &LineStyle {
        &self.line_style
    }

    pub fn font(&self) -> FontId {
        self.font
    }

    /// Font size in logical units
    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    /// Face for the current font slot
    pub fn face(&self) -> Arc<dyn FontFace> {
        self.fonts.face(self.font)
    }

    pub fn fonts(&self) -> &Arc<FontRegistry> {
        &self.fonts
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }

    /// Device pixels per logical unit
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn origin(&self) -> (i32, i32) {
        self.origin.origin()
    }

    pub fn clip_stack(&self) -> &ClipStack {
        &self.clip
    }

    /// Current clip in device space; `None` when unclipped
    pub fn device_clip(&self) -> Option<RectF> {
        self.clip.top().map(|r| self.scale_rect(r))
    }

    /// Integer device-pixel clip, for raster targets
    pub fn device_clip_pixels(&self) -> Option<Rect> {
        self.device_clip().map(|r| {
            let (x0, y0, x1, y1) = r.pixel_bounds();
            Rect::new(x0 as i32, y0 as i32, (x1 - x0) as i32, (y1 - y0) as i32)
        })
    }

    /// Stroke width in device pixels
    pub fn device_line_width(&self) -> f64 {
        self.line_style.effective_width() as f64 * self.scale
    }

    /// Font size in device pixels
    pub fn device_font_size(&self) -> f64 {
        self.font_size * self.scale
    }

    fn scale_rect(&self, r: Rect) -> RectF {
        RectF::new(
            r.x as f64 * self.scale,
            r.y as f64 * self.scale,
            r.w as f64 * self.scale,
            r.h as f64 * self.scale,
        )
    }

    /// Logical rectangle to device space, through the origin only
    pub fn to_device_rect(&self, x: f64, y: f64, w: f64, h: f64) -> RectF {
        let (ox, oy) = self.origin();
        RectF::new(
            (x + ox as f64) * self.scale,
            (y + oy as f64) * self.scale,
            w * self.scale,
            h * self.scale,
        )
    }

    /// Logical point to device space, through the origin only
    pub fn to_device_point(&self, x: f64, y: f64) -> Point {
        let (ox, oy) = self.origin();
        Point::new((x + ox as f64) * self.scale, (y + oy as f64) * self.scale)
    }

    /// Logical vertex to device space: matrix, then origin, then scale
    pub fn transform_vertex(&self, x: f64, y: f64) -> Point {
        let p = self.matrix.current().transform(Point::new(x, y));
        self.to_device_point(p.x, p.y)
    }

    /// Logical vertex to the pixel-center convention used by strokes
    ///
    /// A one-unit line drawn at integer `y` covers device row `y` rather
    /// than straddling two rows.
    pub fn stroke_vertex(&self, x: f64, y: f64) -> Point {
        let p = self.matrix.current().transform(Point::new(x, y));
        self.to_device_point(p.x + 0.5, p.y + 0.5)
    }

    /// Apply the matrix only, leaving origin and scale for later
    pub fn matrix_vertex(&self, x: f64, y: f64) -> Point {
        self.matrix.current().transform(Point::new(x, y))
    }

    /// Horizontal advance of `text` in logical units
    pub fn text_width(&self, text: &str) -> f64 {
        let face = self.face();
        text.chars().map(|ch| face.advance(ch, self.font_size)).sum()
    }

    /// Line height in logical units
    pub fn text_height(&self) -> f64 {
        let face = self.face();
        face.ascent(self.font_size) + face.descent(self.font_size)
    }

    pub fn text_descent(&self) -> f64 {
        self.face().descent(self.font_size)
    }
}

impl Default for DrawState {
    fn default() -> Self {
        Self::new(1.0)
    }
}
