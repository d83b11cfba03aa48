//! The software raster driver
//!
//! Paints into an [`Offscreen`] buffer with no anti-aliasing: a pixel is
//! painted when its center is covered. This reproduces what X11 and GDI
//! give a widget toolkit, which is what widget code is tuned against.
//!
//! ## Strokes
//!
//! Lines one device pixel wide or thinner go through Bresenham and touch
//! both end pixels. Wider lines are built from one quad per segment plus
//! cap and join pieces, all filled together with the non-zero rule so
//! overlaps never double-paint a translucent color.

use gfxdev_core::image::ImageCache;
use gfxdev_core::path::segments_for_radius;
use gfxdev_core::style::dash_polyline;
use gfxdev_core::{
    Cap, Color, DrawState, Features, FillRule, GraphicsDriver, ImageId, ImageView, Join,
    OutlineSink, Palette, Point, Rect, RectF, Result, RgbImage, TextRun,
};

use crate::buffer::Offscreen;
use crate::scan_converter::ScanConverter;
use crate::text::GlyphPath;

/// Miter joins longer than this many half-widths fall back to bevels
const MITER_LIMIT: f64 = 4.0;

/// How colors reach the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelMode {
    /// Every RGB value is stored as requested
    #[default]
    TrueColor,
    /// Colors snap to the nearest palette entry, like an 8-bit visual
    Indexed8,
}

/// Driver painting into an RGBA pixel buffer
pub struct RasterDriver {
    buffer: Offscreen,
    mode: PixelMode,
    cache: ImageCache<Vec<u8>>,
    features: Features,
}

impl RasterDriver {
    /// Driver over a fresh white buffer of `width × height` device pixels
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self::with_buffer(Offscreen::new(width, height)?))
    }

    pub fn with_buffer(buffer: Offscreen) -> Self {
        Self {
            buffer,
            mode: PixelMode::TrueColor,
            cache: ImageCache::new(),
            features: Features::empty(),
        }
    }

    pub fn with_mode(mut self, mode: PixelMode) -> Self {
        self.mode = mode;
        self
    }

    /// Advertise extra features, e.g. `NATIVE` for window back buffers
    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    pub fn mode(&self) -> PixelMode {
        self.mode
    }

    pub fn buffer(&self) -> &Offscreen {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut Offscreen {
        &mut self.buffer
    }

    /// Take the buffer out, leaving an empty one behind
    pub fn take_buffer(&mut self) -> Offscreen {
        self.cache.clear();
        std::mem::take(&mut self.buffer)
    }

    /// Number of images held in the native cache
    pub fn cached_images(&self) -> usize {
        self.cache.len()
    }

    /// Pixels this call may touch
    fn clip(&self, state: &DrawState) -> Rect {
        let bounds = self.buffer.bounds();
        match state.device_clip_pixels() {
            Some(clip) => bounds.intersect(&clip),
            None => bounds,
        }
    }

    fn paint_color(&self, state: &DrawState) -> Color {
        match self.mode {
            PixelMode::TrueColor => state.color(),
            PixelMode::Indexed8 => state.palette().approximate(state.color()),
        }
    }

    fn fill_contours(&mut self, clip: Rect, contours: &[Vec<Point>], rule: FillRule, color: Color) {
        let mut sc = ScanConverter::new(clip);
        sc.set_fill_rule(rule);
        for contour in contours {
            sc.add_contour(contour);
        }
        let buffer = &mut self.buffer;
        sc.spans(|y, x0, x1| buffer.fill_span(y, x0, x1, color));
    }

    fn plot(&mut self, clip: Rect, x: i32, y: i32, color: Color) {
        if clip.contains(x, y) {
            self.buffer.fill_span(y, x, x + 1, color);
        }
    }

    /// Bresenham between pixel-center points, both ends inclusive unless
    /// skipped
    ///
    /// The segment is cut to the clip (plus a one-pixel margin) first, so the
    /// work done is bounded by the clip and not by the segment length.
    fn thin_line(
        &mut self,
        clip: Rect,
        a: Point,
        b: Point,
        (skip_first, skip_last): (bool, bool),
        color: Color,
    ) {
        let margin = RectF::new(
            clip.x as f64 - 1.0,
            clip.y as f64 - 1.0,
            clip.w as f64 + 2.0,
            clip.h as f64 + 2.0,
        );
        let Some((a, b, cut_first, cut_last)) = clip_segment(a, b, margin) else {
            return;
        };
        let (skip_first, skip_last) = (skip_first && !cut_first, skip_last && !cut_last);
        let (mut x0, mut y0) = (a.x.floor() as i64, a.y.floor() as i64);
        let (x1, y1) = (b.x.floor() as i64, b.y.floor() as i64);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut first = true;

        let limit = (dx - dy) as usize + 1;
        for _ in 0..limit {
            let at_end = x0 == x1 && y0 == y1;
            if !(first && skip_first) && !(at_end && skip_last) {
                self.plot(clip, x0 as i32, y0 as i32, color);
            }
            first = false;
            if at_end {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Dash pieces leave out their last pixel so the gaps stay visible
    fn thin_polyline(&mut self, clip: Rect, points: &[Point], dashed: bool, color: Color) {
        match points {
            [] => {},
            [p] => self.plot(clip, p.x.floor() as i32, p.y.floor() as i32, color),
            _ => {
                let last = points.len() - 2;
                for (i, pair) in points.windows(2).enumerate() {
                    let skip = (i > 0, dashed && i == last);
                    self.thin_line(clip, pair[0], pair[1], skip, color);
                }
            },
        }
    }
}

impl std::fmt::Debug for RasterDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterDriver")
            .field("buffer", &self.buffer)
            .field("mode", &self.mode)
            .field("cached_images", &self.cache.len())
            .finish()
    }
}

/// Liang-Barsky: the part of `a..b` inside `bounds`
///
/// Also reports whether each end was moved.
fn clip_segment(a: Point, b: Point, bounds: RectF) -> Option<(Point, Point, bool, bool)> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    let edges = [
        (-dx, a.x - bounds.x),
        (dx, bounds.right() - a.x),
        (-dy, a.y - bounds.y),
        (dy, bounds.bottom() - a.y),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }
    let at = |t: f64| Point::new(a.x + t * dx, a.y + t * dy);
    let start = if t0 > 0.0 { at(t0) } else { a };
    let end = if t1 < 1.0 { at(t1) } else { b };
    Some((start, end, t0 > 0.0, t1 < 1.0))
}

/// Twice the signed area; positive for one winding direction
fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum()
}

/// Give every piece the same winding so non-zero filling unions them
fn oriented(mut points: Vec<Point>) -> Vec<Point> {
    if signed_area(&points) < 0.0 {
        points.reverse();
    }
    points
}

fn disc(center: Point, radius: f64) -> Vec<Point> {
    let n = segments_for_radius(radius, 360.0);
    (0..n)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / n as f64;
            Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect()
}

/// Unit direction and length of `a → b`
fn direction(a: Point, b: Point) -> Option<(Point, f64)> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len = (dx * dx + dy * dy).sqrt();
    (len > 1e-9).then(|| (Point::new(dx / len, dy / len), len))
}

fn offset(p: Point, d: Point, k: f64) -> Point {
    Point::new(p.x + d.x * k, p.y + d.y * k)
}

/// Polygon pieces covering a wide stroke of one connected polyline
fn wide_stroke(points: &[Point], closed: bool, hw: f64, cap: Cap, join: Join) -> Vec<Vec<Point>> {
    let mut pieces = Vec::new();
    let mut pts: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if pts.last().map_or(true, |&q: &Point| direction(q, p).is_some()) {
            pts.push(p);
        }
    }
    if closed && pts.len() > 2 {
        if let (Some(&first), Some(&last)) = (pts.first(), pts.last()) {
            if direction(last, first).is_none() {
                pts.pop();
            }
        }
    }

    if pts.len() == 1 {
        let p = pts[0];
        match cap {
            Cap::Round => pieces.push(disc(p, hw)),
            Cap::Square => pieces.push(vec![
                Point::new(p.x - hw, p.y - hw),
                Point::new(p.x + hw, p.y - hw),
                Point::new(p.x + hw, p.y + hw),
                Point::new(p.x - hw, p.y + hw),
            ]),
            Cap::Flat => {},
        }
        return pieces;
    }
    if pts.len() < 2 {
        return pieces;
    }

    let closed = closed && pts.len() > 2;
    let mut segments: Vec<(Point, Point)> = pts.windows(2).map(|w| (w[0], w[1])).collect();
    if closed {
        segments.push((pts[pts.len() - 1], pts[0]));
    }

    if !closed && cap == Cap::Square {
        let last = segments.len() - 1;
        if let Some((d, _)) = direction(segments[0].0, segments[0].1) {
            segments[0].0 = offset(segments[0].0, d, -hw);
        }
        if let Some((d, _)) = direction(segments[last].0, segments[last].1) {
            segments[last].1 = offset(segments[last].1, d, hw);
        }
    }

    for &(a, b) in &segments {
        let Some((d, _)) = direction(a, b) else {
            continue;
        };
        let n = Point::new(-d.y * hw, d.x * hw);
        pieces.push(vec![
            Point::new(a.x + n.x, a.y + n.y),
            Point::new(b.x + n.x, b.y + n.y),
            Point::new(b.x - n.x, b.y - n.y),
            Point::new(a.x - n.x, a.y - n.y),
        ]);
    }

    if !closed && cap == Cap::Round {
        pieces.push(disc(pts[0], hw));
        pieces.push(disc(pts[pts.len() - 1], hw));
    }

    // Joins sit where one segment ends and the next begins
    let joints = if closed { segments.len() } else { segments.len() - 1 };
    for i in 0..joints {
        let (a, v) = segments[i];
        let (_, c) = segments[(i + 1) % segments.len()];
        if let Some(piece) = join_piece(a, v, c, hw, join) {
            pieces.push(piece);
        }
    }

    pieces
}

/// Fill for the outer gap where `a → v` turns into `v → c`
fn join_piece(a: Point, v: Point, c: Point, hw: f64, join: Join) -> Option<Vec<Point>> {
    let (d1, _) = direction(a, v)?;
    let (d2, _) = direction(v, c)?;
    let cross = d1.x * d2.y - d1.y * d2.x;
    if cross.abs() < 1e-9 {
        return None;
    }
    if join == Join::Round {
        return Some(disc(v, hw));
    }

    // The outer side is opposite to the turn
    let side = if cross > 0.0 { -1.0 } else { 1.0 };
    let n1 = Point::new(-d1.y * side, d1.x * side);
    let n2 = Point::new(-d2.y * side, d2.x * side);
    let p1 = offset(v, n1, hw);
    let p2 = offset(v, n2, hw);

    if join == Join::Miter {
        let m = Point::new(n1.x + n2.x, n1.y + n2.y);
        let m_len = (m.x * m.x + m.y * m.y).sqrt();
        if m_len > 1e-9 {
            let m = Point::new(m.x / m_len, m.y / m_len);
            let cos_half = m.x * n1.x + m.y * n1.y;
            if cos_half > 1.0 / MITER_LIMIT {
                let tip = offset(v, m, hw / cos_half);
                return Some(vec![v, p1, tip, p2]);
            }
        }
    }
    Some(vec![v, p1, p2])
}

/// Nearest-neighbor copy of `image` scaled into `dst`
fn blit(
    buffer: &mut Offscreen,
    clip: Rect,
    palette: Option<&Palette>,
    image: &ImageView<'_>,
    dst: RectF,
) {
    if image.is_empty() || dst.is_empty() {
        return;
    }
    let (x0, y0, x1, y1) = dst.pixel_bounds();
    let x0 = x0.max(clip.x as i64);
    let y0 = y0.max(clip.y as i64);
    let x1 = x1.min(clip.right() as i64);
    let y1 = y1.min(clip.bottom() as i64);
    let (iw, ih) = (image.width() as f64, image.height() as f64);

    for py in y0..y1 {
        let sy = ((py as f64 + 0.5 - dst.y) * ih / dst.h).floor();
        let sy = sy.clamp(0.0, ih - 1.0) as u32;
        for px in x0..x1 {
            let sx = ((px as f64 + 0.5 - dst.x) * iw / dst.w).floor();
            let sx = sx.clamp(0.0, iw - 1.0) as u32;
            let mut src = image.rgba(sx, sy);
            if let Some(palette) = palette {
                let c = palette.approximate(Color::rgba(src[0], src[1], src[2], src[3]));
                src = [c.r, c.g, c.b, c.a];
            }
            buffer.blend_pixel(px as i32, py as i32, src);
        }
    }
}

impl GraphicsDriver for RasterDriver {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn features(&self) -> Features {
        self.features
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn activate(&mut self, _state: &DrawState) {
        log::trace!(
            "Raster target {}x{} active",
            self.buffer.width(),
            self.buffer.height()
        );
    }

    fn fill_rect(&mut self, state: &DrawState, rect: RectF) {
        let clip = self.clip(state);
        let color = self.paint_color(state);
        let (x0, y0, x1, y1) = rect.pixel_bounds();
        let x0 = x0.max(clip.x as i64) as i32;
        let x1 = x1.min(clip.right() as i64) as i32;
        let y0 = y0.max(clip.y as i64) as i32;
        let y1 = y1.min(clip.bottom() as i64) as i32;
        for y in y0..y1 {
            self.buffer.fill_span(y, x0, x1, color);
        }
    }

    fn stroke_polyline(&mut self, state: &DrawState, points: &[Point], closed: bool) {
        let clip = self.clip(state);
        if clip.is_empty() {
            return;
        }
        let color = self.paint_color(state);
        let width = state.device_line_width();
        let style = state.line_style();
        let pattern = style.dash_pattern(width);

        let mut path = points.to_vec();
        let dashed = !pattern.is_empty();
        if closed && dashed {
            if let Some(&first) = points.first() {
                path.push(first);
            }
        }
        let pieces = dash_polyline(&path, &pattern);

        if width <= 1.0 {
            for piece in &pieces {
                if closed && !dashed && piece.len() > 2 {
                    let mut ring = piece.clone();
                    ring.push(piece[0]);
                    self.thin_polyline(clip, &ring, false, color);
                } else {
                    self.thin_polyline(clip, piece, dashed, color);
                }
            }
            return;
        }

        let hw = width / 2.0;
        let contours: Vec<Vec<Point>> = pieces
            .iter()
            .flat_map(|piece| wide_stroke(piece, closed && !dashed, hw, style.cap, style.join))
            .map(oriented)
            .collect();
        self.fill_contours(clip, &contours, FillRule::NonZero, color);
    }

    fn fill_polygon(&mut self, state: &DrawState, contours: &[Vec<Point>], rule: FillRule) {
        let clip = self.clip(state);
        let color = self.paint_color(state);
        self.fill_contours(clip, contours, rule, color);
    }

    fn draw_text(&mut self, state: &DrawState, run: &TextRun<'_>) {
        let clip = self.clip(state);
        if clip.is_empty() {
            return;
        }
        let face = state.fonts().face(run.font);
        let color = self.paint_color(state);
        let mut path = GlyphPath::new(Point::new(run.x, run.y), run.angle);
        let ascent = face.ascent(run.size);

        let mut pen = 0.0;
        for ch in run.text.chars() {
            let advance = face.advance(ch, run.size);
            path.set_pen(pen);
            if !face.outline(ch, run.size, &mut path) && !ch.is_whitespace() {
                // No outlines available: a solid block per character
                path.move_to(0.1 * advance, 0.0);
                path.line_to(0.9 * advance, 0.0);
                path.line_to(0.9 * advance, -0.7 * ascent);
                path.line_to(0.1 * advance, -0.7 * ascent);
                path.close();
            }
            pen += advance;
        }
        let contours = path.into_contours();
        self.fill_contours(clip, &contours, FillRule::NonZero, color);
    }

    fn draw_image(&mut self, state: &DrawState, image: &ImageView<'_>, dst: RectF) {
        let clip = self.clip(state);
        let palette = (self.mode == PixelMode::Indexed8).then(|| state.palette());
        blit(&mut self.buffer, clip, palette, image, dst);
    }

    fn draw_cached(&mut self, state: &DrawState, image: &RgbImage, src: Rect, dst: RectF) {
        let clip = self.clip(state);
        let palette = (self.mode == PixelMode::Indexed8).then(|| state.palette());
        let Self { cache, buffer, .. } = self;
        let rgba = cache.get_or_insert_with(image, |img| img.view().to_rgba_vec());
        match ImageView::new(rgba, image.width(), image.height(), 4, None) {
            Ok(view) => {
                let view = view.crop(src);
                blit(buffer, clip, palette, &view, dst);
            },
            Err(e) => log::warn!("Cached image {} unusable: {e}", image.id().get()),
        }
    }

    fn uncache_image(&mut self, id: ImageId) {
        if self.cache.remove(id) {
            log::debug!("Released cached image {}", id.get());
        }
    }
}
