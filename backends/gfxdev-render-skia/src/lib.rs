//! Skia Backend: anti-aliased compositing through tiny-skia
//!
//! Where the raster backend paints what X11 would, this one paints what a
//! Cairo-style compositor would: anti-aliased edges, real stroke joins,
//! bilinear image scaling and alpha blending everywhere. Widget code does
//! not change; it just looks smoother.
//!
//! ## How Calls Map
//!
//! - Rectangles and polygons become `tiny_skia::Path` fills
//! - Strokes go through `tiny_skia::Stroke` with caps, joins and dashes
//! - Text outlines are traced into a `kurbo::BezPath`, then filled
//! - Images become pattern shaders scaled into the destination
//! - The clip rectangle becomes a `tiny_skia::Mask`, rebuilt only when it
//!   changes

use std::any::Any;

use gfxdev_core::image::ImageCache;
use gfxdev_core::{
    Cap, Color, DrawState, Features, FillRule, GraphicsDriver, ImageId, ImageView, Join,
    OutlineSink, Point, Rect, RectF, RenderError, Result, RgbImage, Surface, SurfaceDevice,
    TextRun,
};
use kurbo::{Affine, BezPath, PathEl};
use tiny_skia::{
    FilterQuality, IntSize, LineCap, LineJoin, Mask, Paint, PathBuilder, Pattern, Pixmap,
    SpreadMode, Stroke, StrokeDash, Transform,
};

/// Miter limit handed to tiny-skia strokes
const MITER_LIMIT: f32 = 4.0;

/// Anti-aliased driver drawing into a `tiny_skia::Pixmap`
pub struct SkiaDriver {
    pixmap: Pixmap,
    /// Clip mask and the device rectangle it was built from
    clip: Option<(RectF, Mask)>,
    cache: ImageCache<Option<Pixmap>>,
}

impl SkiaDriver {
    /// Driver over a white `width × height` canvas
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let mut pixmap = Pixmap::new(width, height)
            .ok_or(RenderError::InvalidDimensions { width, height })?;
        pixmap.fill(tiny_skia::Color::WHITE);
        log::debug!("Skia canvas {width}x{height}");
        Ok(Self {
            pixmap,
            clip: None,
            cache: ImageCache::new(),
        })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Un-premultiplied color of one pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some(Color::rgba(c.red(), c.green(), c.blue(), c.alpha()))
    }

    /// RGB snapshot, alpha dropped
    pub fn image(&self) -> Result<RgbImage> {
        let mut data = Vec::with_capacity(self.pixmap.pixels().len() * 3);
        for px in self.pixmap.pixels() {
            let c = px.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue()]);
        }
        RgbImage::new(data, self.pixmap.width(), self.pixmap.height(), 3)
    }

    pub fn cached_images(&self) -> usize {
        self.cache.len()
    }

    /// Bring the clip mask in line with `state`
    fn sync_clip(&mut self, state: &DrawState) {
        let wanted = state.device_clip();
        match (wanted, &self.clip) {
            (None, None) => {},
            (Some(r), Some((built, _))) if *built == r => {},
            (None, Some(_)) => self.clip = None,
            (Some(r), _) => {
                self.clip = build_mask(self.pixmap.width(), self.pixmap.height(), r)
                    .map(|mask| (r, mask));
            },
        }
    }

    /// Sync the clip mask; false when the clip hides everything
    fn ready(&mut self, state: &DrawState) -> bool {
        self.sync_clip(state);
        !matches!(state.device_clip(), Some(r) if r.is_empty())
    }
}

impl std::fmt::Debug for SkiaDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkiaDriver")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .field("clip", &self.clip.as_ref().map(|(r, _)| *r))
            .finish()
    }
}

fn build_mask(width: u32, height: u32, clip: RectF) -> Option<Mask> {
    let mut mask = Mask::new(width, height)?;
    let rect = tiny_skia::Rect::from_xywh(
        clip.x as f32,
        clip.y as f32,
        clip.w as f32,
        clip.h as f32,
    )?;
    let path = PathBuilder::from_rect(rect);
    // Pixel-aligned clips stay crisp
    mask.fill_path(&path, tiny_skia::FillRule::Winding, false, Transform::identity());
    Some(mask)
}

fn solid_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

fn skia_fill_rule(rule: FillRule) -> tiny_skia::FillRule {
    match rule {
        FillRule::NonZero => tiny_skia::FillRule::Winding,
        FillRule::EvenOdd => tiny_skia::FillRule::EvenOdd,
    }
}

fn polyline_path(points: &[Point], closed: bool) -> Option<tiny_skia::Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x as f32, first.y as f32);
    if rest.is_empty() {
        // A zero-length segment still gets caps
        pb.line_to(first.x as f32, first.y as f32);
    }
    for p in rest {
        pb.line_to(p.x as f32, p.y as f32);
    }
    if closed {
        pb.close();
    }
    pb.finish()
}

fn contours_path(contours: &[Vec<Point>]) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for contour in contours {
        let Some((first, rest)) = contour.split_first() else {
            continue;
        };
        pb.move_to(first.x as f32, first.y as f32);
        for p in rest {
            pb.line_to(p.x as f32, p.y as f32);
        }
        pb.close();
    }
    pb.finish()
}

/// Convert a kurbo path, the way glyph outlines arrive
fn bez_to_skia(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for element in path.elements() {
        match *element {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

fn stroke_for(state: &DrawState) -> Stroke {
    let width = state.device_line_width();
    let style = state.line_style();
    let pattern: Vec<f32> = style
        .dash_pattern(width)
        .into_iter()
        .map(|v| v as f32)
        .collect();
    Stroke {
        width: width as f32,
        miter_limit: MITER_LIMIT,
        line_cap: match style.cap {
            Cap::Flat => LineCap::Butt,
            Cap::Round => LineCap::Round,
            Cap::Square => LineCap::Square,
        },
        line_join: match style.join {
            Join::Miter => LineJoin::Miter,
            Join::Round => LineJoin::Round,
            Join::Bevel => LineJoin::Bevel,
        },
        dash: if pattern.is_empty() {
            None
        } else {
            StrokeDash::new(pattern, 0.0)
        },
    }
}

/// Premultiplied pixmap from any supported image depth
fn to_pixmap(image: &ImageView<'_>) -> Option<Pixmap> {
    let size = IntSize::from_wh(image.width(), image.height())?;
    let mut data = Vec::with_capacity(image.width() as usize * image.height() as usize * 4);
    for y in 0..image.height() {
        for x in 0..image.width() {
            let [r, g, b, a] = image.rgba(x, y);
            let pm = |c: u8| ((c as u32 * a as u32 + 127) / 255) as u8;
            data.extend_from_slice(&[pm(r), pm(g), pm(b), a]);
        }
    }
    Pixmap::from_vec(data, size)
}

/// Paint `src` of `source` into `dst` through a scaling pattern
fn paint_pattern(
    target: &mut Pixmap,
    mask: Option<&Mask>,
    source: &Pixmap,
    src: Rect,
    dst: RectF,
) {
    let Some(rect) =
        tiny_skia::Rect::from_xywh(dst.x as f32, dst.y as f32, dst.w as f32, dst.h as f32)
    else {
        return;
    };
    let sx = dst.w / src.w as f64;
    let sy = dst.h / src.h as f64;
    let transform = Transform::from_row(
        sx as f32,
        0.0,
        0.0,
        sy as f32,
        (dst.x - src.x as f64 * sx) as f32,
        (dst.y - src.y as f64 * sy) as f32,
    );
    let quality = if (sx - 1.0).abs() < 1e-9 && (sy - 1.0).abs() < 1e-9 {
        FilterQuality::Nearest
    } else {
        FilterQuality::Bilinear
    };
    let paint = Paint {
        shader: Pattern::new(source.as_ref(), SpreadMode::Pad, quality, 1.0, transform),
        anti_alias: false,
        ..Paint::default()
    };
    target.fill_rect(rect, &paint, Transform::identity(), mask);
}

/// Glyph outlines into a kurbo path, shifted by the pen position
struct BezSink<'a> {
    path: &'a mut BezPath,
    dx: f64,
}

impl OutlineSink for BezSink<'_> {
    fn move_to(&mut self, x: f64, y: f64) {
        self.path.move_to((x + self.dx, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.path.line_to((x + self.dx, y));
    }

    fn quad_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        self.path.quad_to((cx + self.dx, cy), (x + self.dx, y));
    }

    fn cubic_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
        self.path
            .curve_to((c1x + self.dx, c1y), (c2x + self.dx, c2y), (x + self.dx, y));
    }

    fn close(&mut self) {
        self.path.close_path();
    }
}

impl GraphicsDriver for SkiaDriver {
    fn name(&self) -> &'static str {
        "skia"
    }

    fn features(&self) -> Features {
        Features::ANTIALIAS
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn activate(&mut self, state: &DrawState) {
        self.sync_clip(state);
    }

    fn clip_changed(&mut self, state: &DrawState) {
        self.sync_clip(state);
    }

    fn fill_rect(&mut self, state: &DrawState, rect: RectF) {
        if !self.ready(state) {
            return;
        }
        let Some(r) =
            tiny_skia::Rect::from_xywh(rect.x as f32, rect.y as f32, rect.w as f32, rect.h as f32)
        else {
            return;
        };
        let mask = self.clip.as_ref().map(|(_, m)| m);
        self.pixmap
            .fill_rect(r, &solid_paint(state.color()), Transform::identity(), mask);
    }

    fn stroke_polyline(&mut self, state: &DrawState, points: &[Point], closed: bool) {
        if !self.ready(state) {
            return;
        }
        let Some(path) = polyline_path(points, closed) else {
            return;
        };
        let stroke = stroke_for(state);
        let mask = self.clip.as_ref().map(|(_, m)| m);
        self.pixmap.stroke_path(
            &path,
            &solid_paint(state.color()),
            &stroke,
            Transform::identity(),
            mask,
        );
    }

    fn fill_polygon(&mut self, state: &DrawState, contours: &[Vec<Point>], rule: FillRule) {
        if !self.ready(state) {
            return;
        }
        let Some(path) = contours_path(contours) else {
            return;
        };
        let mask = self.clip.as_ref().map(|(_, m)| m);
        self.pixmap.fill_path(
            &path,
            &solid_paint(state.color()),
            skia_fill_rule(rule),
            Transform::identity(),
            mask,
        );
    }

    fn draw_text(&mut self, state: &DrawState, run: &TextRun<'_>) {
        if !self.ready(state) {
            return;
        }
        let face = state.fonts().face(run.font);
        let ascent = face.ascent(run.size);
        let mut outline = BezPath::new();
        let mut pen = 0.0;
        for ch in run.text.chars() {
            let advance = face.advance(ch, run.size);
            let mut sink = BezSink {
                path: &mut outline,
                dx: pen,
            };
            if !face.outline(ch, run.size, &mut sink) && !ch.is_whitespace() {
                let block = kurbo::Rect::new(
                    pen + 0.1 * advance,
                    -0.7 * ascent,
                    pen + 0.9 * advance,
                    0.0,
                );
                outline.extend(kurbo::Shape::path_elements(&block, 0.1));
            }
            pen += advance;
        }

        // Counter-clockwise on screen is a negative rotation in y-down space
        let placement = Affine::translate((run.x, run.y)) * Affine::rotate(-run.angle.to_radians());
        outline.apply_affine(placement);
        let Some(path) = bez_to_skia(&outline) else {
            return;
        };
        let mask = self.clip.as_ref().map(|(_, m)| m);
        self.pixmap.fill_path(
            &path,
            &solid_paint(state.color()),
            tiny_skia::FillRule::Winding,
            Transform::identity(),
            mask,
        );
    }

    fn draw_image(&mut self, state: &DrawState, image: &ImageView<'_>, dst: RectF) {
        if !self.ready(state) {
            return;
        }
        let Some(source) = to_pixmap(image) else {
            return;
        };
        let src = Rect::new(0, 0, image.width() as i32, image.height() as i32);
        let mask = self.clip.as_ref().map(|(_, m)| m);
        paint_pattern(&mut self.pixmap, mask, &source, src, dst);
    }

    fn draw_cached(&mut self, state: &DrawState, image: &RgbImage, src: Rect, dst: RectF) {
        if !self.ready(state) {
            return;
        }
        let bounds = Rect::new(0, 0, image.width() as i32, image.height() as i32);
        let src = bounds.intersect(&src);
        if src.is_empty() {
            return;
        }
        let Self {
            pixmap,
            clip,
            cache,
        } = self;
        let source = cache.get_or_insert_with(image, |img| to_pixmap(&img.view()));
        if let Some(source) = source {
            let mask = clip.as_ref().map(|(_, m)| m);
            paint_pattern(pixmap, mask, source, src, dst);
        }
    }

    fn uncache_image(&mut self, id: ImageId) {
        if self.cache.remove(id) {
            log::debug!("Released cached pixmap for image {}", id.get());
        }
    }
}

/// An anti-aliased in-memory surface
#[derive(Debug)]
pub struct SkiaSurface {
    surface: Surface,
    logical: (u32, u32),
}

impl SkiaSurface {
    /// `width × height` logical units at `scale` device pixels per unit
    pub fn new(width: u32, height: u32, scale: f64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height }.into());
        }
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        let driver = SkiaDriver::new(
            (width as f64 * scale).ceil() as u32,
            (height as f64 * scale).ceil() as u32,
        )?;
        Ok(Self {
            surface: Surface::new(Box::new(driver), scale),
            logical: (width, height),
        })
    }

    pub fn width(&self) -> u32 {
        self.logical.0
    }

    pub fn height(&self) -> u32 {
        self.logical.1
    }

    pub fn driver(&self) -> Result<&SkiaDriver> {
        self.surface
            .driver_as::<SkiaDriver>()
            .ok_or_else(|| RenderError::Backend("skia surface lost its driver".into()).into())
    }

    /// Device-resolution snapshot tagged with the logical size
    pub fn image(&self) -> Result<RgbImage> {
        let (w, h) = self.logical;
        Ok(self.driver()?.image()?.with_display_size(w, h))
    }
}

impl SurfaceDevice for SkiaSurface {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(w: u32, h: u32) -> Surface {
        Surface::new(Box::new(SkiaDriver::new(w, h).unwrap()), 1.0)
    }

    fn pixel(s: &Surface, x: u32, y: u32) -> Color {
        s.driver_as::<SkiaDriver>().unwrap().pixel(x, y).unwrap()
    }

    #[test]
    fn test_fill_rect_solid_inside() {
        let mut s = surface(20, 20);
        s.set_color(Color::RED);
        s.rectf(5, 5, 10, 10);
        assert_eq!(pixel(&s, 10, 10), Color::RED);
        assert_eq!(pixel(&s, 2, 2), Color::WHITE);
    }

    #[test]
    fn test_clip_mask_limits_fill() {
        let mut s = surface(20, 20);
        s.set_color(Color::BLUE);
        s.push_clip(0, 0, 10, 20);
        s.rectf(0, 0, 20, 20);
        s.pop_clip().unwrap();
        assert_eq!(pixel(&s, 5, 5), Color::BLUE);
        assert_eq!(pixel(&s, 15, 5), Color::WHITE);
    }

    #[test]
    fn test_empty_clip_draws_nothing() {
        let mut s = surface(10, 10);
        s.push_clip(0, 0, 5, 5);
        s.push_clip(6, 6, 2, 2);
        s.set_color(Color::BLACK);
        s.rectf_f(0.0, 0.0, 10.0, 10.0);
        s.draw_text("x", 1, 8);
        s.pop_clip().unwrap();
        s.pop_clip().unwrap();
        assert_eq!(pixel(&s, 5, 5), Color::WHITE);
    }

    #[test]
    fn test_diagonal_edge_is_antialiased() {
        let mut s = surface(20, 20);
        s.set_color(Color::BLACK);
        s.polygon3(0, 0, 20, 0, 0, 20);
        let blended = (0..20u32)
            .flat_map(|y| (0..20u32).map(move |x| (x, y)))
            .map(|(x, y)| pixel(&s, x, y))
            .filter(|c| c.r > 0 && c.r < 255)
            .count();
        assert!(blended > 0);
    }

    #[test]
    fn test_even_odd_hole() {
        let mut s = surface(20, 20);
        s.set_color(Color::BLACK);
        s.begin_complex_polygon();
        for (x, y) in [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)] {
            s.vertex(x, y);
        }
        s.gap();
        for (x, y) in [(3.0, 3.0), (7.0, 3.0), (7.0, 7.0), (3.0, 7.0)] {
            s.vertex(x, y);
        }
        s.end_complex_polygon();
        assert_eq!(pixel(&s, 5, 5), Color::WHITE);
        assert_eq!(pixel(&s, 1, 1), Color::BLACK);
    }

    #[test]
    fn test_image_cached_once() {
        let mut s = surface(10, 10);
        let image = RgbImage::new(vec![0, 0, 255].repeat(4), 2, 2, 3).unwrap();
        s.draw_rgb(&image, 0, 0);
        s.draw_rgb(&image, 5, 5);
        let driver = s.driver_as::<SkiaDriver>().unwrap();
        assert_eq!(driver.cached_images(), 1);
        assert_eq!(pixel(&s, 6, 6), Color::BLUE);
    }

    #[test]
    fn test_reports_antialias_only() {
        let s = surface(1, 1);
        assert!(s.has_feature(Features::ANTIALIAS));
        assert!(!s.has_feature(Features::NATIVE | Features::PRINTER | Features::VECTOR));
    }
}
