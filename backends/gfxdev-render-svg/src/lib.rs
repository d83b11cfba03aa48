//! SVG Backend: drawing calls that scale forever
//!
//! Every primitive becomes one SVG element, so the file stays as editable as
//! the widget code that produced it. Clip rectangles become `<clipPath>`
//! groups, images are embedded as base64 PNG, and images drawn through the
//! cache are stored once in `<defs>` and referenced by `<use>` after that.
//!
//! Text is emitted as real glyph paths when the font can supply outlines,
//! and as a `<text>` element naming the font family when it cannot.

use std::any::Any;
use std::fmt::Write as FmtWrite;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use gfxdev_core::image::ImageCache;
use gfxdev_core::{
    Cap, Color, DrawState, ExportError, Features, FillRule, GraphicsDriver, ImageId, ImageView,
    Join, Num, OutlineSink, Point, Rect, RectF, RenderError, Result, RgbImage, Surface,
    SurfaceDevice, TextRun,
};
use gfxdev_export::encode_png;

/// Escape text for element content and attribute values
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn paint_attr(name: &str, color: Color) -> String {
    let mut attr = format!(r#"{name}="{}""#, color.to_css_hex());
    if !color.is_opaque() {
        let _ = write!(attr, r#" {name}-opacity="{}""#, Num(color.a as f64 / 255.0));
    }
    attr
}

/// SVG path data for a set of closed contours
fn contour_data(contours: &[Vec<Point>]) -> String {
    let mut d = String::new();
    for contour in contours {
        let Some((first, rest)) = contour.split_first() else {
            continue;
        };
        let _ = write!(d, "M{},{}", Num(first.x), Num(first.y));
        for p in rest {
            let _ = write!(d, "L{},{}", Num(p.x), Num(p.y));
        }
        d.push('Z');
    }
    d
}

/// Glyph outlines as SVG path commands, moved to the pen position
struct SvgPathSink<'a> {
    d: &'a mut String,
    dx: f64,
    dy: f64,
}

impl OutlineSink for SvgPathSink<'_> {
    fn move_to(&mut self, x: f64, y: f64) {
        let _ = write!(self.d, "M{},{}", Num(x + self.dx), Num(y + self.dy));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        let _ = write!(self.d, "L{},{}", Num(x + self.dx), Num(y + self.dy));
    }

    fn quad_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        let (dx, dy) = (self.dx, self.dy);
        let _ = write!(
            self.d,
            "Q{},{} {},{}",
            Num(cx + dx),
            Num(cy + dy),
            Num(x + dx),
            Num(y + dy)
        );
    }

    fn cubic_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
        let (dx, dy) = (self.dx, self.dy);
        let _ = write!(
            self.d,
            "C{},{} {},{} {},{}",
            Num(c1x + dx),
            Num(c1y + dy),
            Num(c2x + dx),
            Num(c2y + dy),
            Num(x + dx),
            Num(y + dy)
        );
    }

    fn close(&mut self) {
        self.d.push('Z');
    }
}

/// Driver writing SVG elements into an in-memory document
#[derive(Debug)]
pub struct SvgDriver {
    width: f64,
    height: f64,
    defs: String,
    body: String,
    /// Clip of the currently open `<g clip-path>` group
    open_clip: Option<RectF>,
    clip_ids: u32,
    /// Cached images map to the id of their `<defs>` entry
    cache: ImageCache<Option<String>>,
    image_ids: u32,
}

impl SvgDriver {
    /// Document of `width × height` device units
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            defs: String::new(),
            body: String::new(),
            open_clip: None,
            clip_ids: 0,
            cache: ImageCache::new(),
            image_ids: 0,
        }
    }

    /// The complete document as it stands
    ///
    /// Open clip groups are closed in the output only, so drawing can
    /// continue afterwards.
    pub fn document(&self) -> String {
        let mut svg = String::with_capacity(self.defs.len() + self.body.len() + 256);
        svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" version="1.1" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = Num(self.width),
            h = Num(self.height),
        );
        if !self.defs.is_empty() {
            svg.push_str("<defs>\n");
            svg.push_str(&self.defs);
            svg.push_str("</defs>\n");
        }
        svg.push_str(&self.body);
        if self.open_clip.is_some() {
            svg.push_str("</g>\n");
        }
        svg.push_str("</svg>\n");
        svg
    }

    pub fn cached_images(&self) -> usize {
        self.cache.len()
    }

    /// Open, close or switch the clip group to match `state`
    fn sync_clip(&mut self, state: &DrawState) {
        let wanted = state.device_clip();
        if wanted == self.open_clip {
            return;
        }
        if self.open_clip.take().is_some() {
            self.body.push_str("</g>\n");
        }
        if let Some(clip) = wanted {
            if clip.is_empty() {
                return;
            }
            self.clip_ids += 1;
            let id = self.clip_ids;
            let _ = writeln!(
                self.defs,
                r#"<clipPath id="clip{id}"><rect x="{}" y="{}" width="{}" height="{}"/></clipPath>"#,
                Num(clip.x),
                Num(clip.y),
                Num(clip.w),
                Num(clip.h)
            );
            let _ = writeln!(self.body, r#"<g clip-path="url(#clip{id})">"#);
            self.open_clip = Some(clip);
        }
    }

    /// Sync the clip group; false when the clip hides everything
    fn ready(&mut self, state: &DrawState) -> bool {
        self.sync_clip(state);
        !matches!(state.device_clip(), Some(r) if r.is_empty())
    }

    fn stroke_attrs(state: &DrawState) -> String {
        let width = state.device_line_width();
        let style = state.line_style();
        let mut attrs = format!(
            r#"fill="none" {} stroke-width="{}""#,
            paint_attr("stroke", state.color()),
            Num(width)
        );
        attrs.push_str(match style.cap {
            Cap::Flat => "",
            Cap::Round => r#" stroke-linecap="round""#,
            Cap::Square => r#" stroke-linecap="square""#,
        });
        attrs.push_str(match style.join {
            Join::Miter => r#" stroke-miterlimit="4""#,
            Join::Round => r#" stroke-linejoin="round""#,
            Join::Bevel => r#" stroke-linejoin="bevel""#,
        });
        let pattern = style.dash_pattern(width);
        if !pattern.is_empty() {
            let dashes: Vec<String> = pattern.iter().map(|v| Num(*v).to_string()).collect();
            let _ = write!(attrs, r#" stroke-dasharray="{}""#, dashes.join(","));
        }
        attrs
    }

    fn data_uri(image: &ImageView<'_>) -> Option<String> {
        match encode_png(image) {
            Ok(png) => Some(format!("data:image/png;base64,{}", STANDARD.encode(png))),
            Err(e) => {
                log::warn!("SVG image skipped: {e}");
                None
            },
        }
    }

    /// Store `image` in `<defs>` and return its id
    fn define_image(defs: &mut String, next_id: &mut u32, image: &RgbImage) -> Option<String> {
        let uri = Self::data_uri(&image.view())?;
        *next_id += 1;
        let id = format!("img{next_id}");
        let _ = writeln!(
            defs,
            r#"<image id="{id}" width="{}" height="{}" xlink:href="{uri}"/>"#,
            image.width(),
            image.height()
        );
        log::debug!("Defined SVG image {id} for image {}", image.id().get());
        Some(id)
    }
}

impl GraphicsDriver for SvgDriver {
    fn name(&self) -> &'static str {
        "svg"
    }

    fn features(&self) -> Features {
        Features::VECTOR
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
        let _ = writeln!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" {}/>"#,
            Num(rect.x),
            Num(rect.y),
            Num(rect.w),
            Num(rect.h),
            paint_attr("fill", state.color())
        );
    }

    fn stroke_polyline(&mut self, state: &DrawState, points: &[Point], closed: bool) {
        if !self.ready(state) || points.is_empty() {
            return;
        }
        let mut coords = String::new();
        for (i, p) in points.iter().enumerate() {
            if i > 0 {
                coords.push(' ');
            }
            let _ = write!(coords, "{},{}", Num(p.x), Num(p.y));
        }
        if points.len() == 1 {
            // Let the cap draw a dot
            let _ = write!(coords, " {},{}", Num(points[0].x), Num(points[0].y));
        }
        let element = if closed { "polygon" } else { "polyline" };
        let _ = writeln!(
            self.body,
            r#"<{element} points="{coords}" {}/>"#,
            Self::stroke_attrs(state)
        );
    }

    fn fill_polygon(&mut self, state: &DrawState, contours: &[Vec<Point>], rule: FillRule) {
        if !self.ready(state) {
            return;
        }
        let d = contour_data(contours);
        if d.is_empty() {
            return;
        }
        let rule = match rule {
            FillRule::NonZero => "nonzero",
            FillRule::EvenOdd => "evenodd",
        };
        let _ = writeln!(
            self.body,
            r#"<path d="{d}" fill-rule="{rule}" {}/>"#,
            paint_attr("fill", state.color())
        );
    }

    fn draw_text(&mut self, state: &DrawState, run: &TextRun<'_>) {
        if !self.ready(state) {
            return;
        }
        let transform = if run.angle != 0.0 {
            format!(
                r#" transform="rotate({} {} {})""#,
                Num(-run.angle),
                Num(run.x),
                Num(run.y)
            )
        } else {
            String::new()
        };

        let face = state.fonts().face(run.font);
        let mut d = String::new();
        let mut pen = 0.0;
        let mut outlined = true;
        for ch in run.text.chars() {
            let mut sink = SvgPathSink {
                d: &mut d,
                dx: run.x + pen,
                dy: run.y,
            };
            if !face.outline(ch, run.size, &mut sink) && !ch.is_whitespace() {
                outlined = false;
                break;
            }
            pen += face.advance(ch, run.size);
        }

        if outlined {
            if !d.is_empty() {
                let _ = writeln!(
                    self.body,
                    r#"<path d="{d}" {}{transform}/>"#,
                    paint_attr("fill", state.color())
                );
            }
            return;
        }

        let font = run.font;
        let mut style = String::new();
        if font.is_bold() {
            style.push_str(r#" font-weight="bold""#);
        }
        if font.is_italic() {
            style.push_str(r#" font-style="italic""#);
        }
        let _ = writeln!(
            self.body,
            r#"<text x="{}" y="{}" font-family="{}" font-size="{}"{style} {}{transform} xml:space="preserve">{}</text>"#,
            Num(run.x),
            Num(run.y),
            escape(font.css_family()),
            Num(run.size),
            paint_attr("fill", state.color()),
            escape(run.text)
        );
    }

    fn draw_image(&mut self, state: &DrawState, image: &ImageView<'_>, dst: RectF) {
        if !self.ready(state) {
            return;
        }
        let Some(uri) = Self::data_uri(image) else {
            return;
        };
        let _ = writeln!(
            self.body,
            r#"<image x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="none" xlink:href="{uri}"/>"#,
            Num(dst.x),
            Num(dst.y),
            Num(dst.w),
            Num(dst.h)
        );
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
            defs,
            cache,
            image_ids,
            body,
            ..
        } = self;
        let id = cache.get_or_insert_with(image, |img| Self::define_image(defs, image_ids, img));
        let Some(id) = id else {
            return;
        };
        // A nested viewport crops to `src` and scales it onto `dst`
        let _ = writeln!(
            body,
            r##"<svg x="{}" y="{}" width="{}" height="{}" viewBox="{} {} {} {}" preserveAspectRatio="none"><use xlink:href="#{id}"/></svg>"##,
            Num(dst.x),
            Num(dst.y),
            Num(dst.w),
            Num(dst.h),
            src.x,
            src.y,
            src.w,
            src.h
        );
    }

    fn uncache_image(&mut self, id: ImageId) {
        if self.cache.remove(id) {
            log::debug!("SVG image {} will be re-embedded on next use", id.get());
        }
    }
}

/// A surface that records into an SVG document
#[derive(Debug)]
pub struct SvgSurface {
    surface: Surface,
}

impl SvgSurface {
    /// Document of `width × height` logical units
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height }.into());
        }
        let driver = SvgDriver::new(width as f64, height as f64);
        Ok(Self {
            surface: Surface::new(Box::new(driver), 1.0),
        })
    }

    pub fn driver(&self) -> Result<&SvgDriver> {
        self.surface
            .driver_as::<SvgDriver>()
            .ok_or_else(|| RenderError::Backend("SVG surface lost its driver".into()).into())
    }

    /// The document drawn so far
    pub fn finish(&self) -> Result<String> {
        Ok(self.driver()?.document())
    }

    /// Write the document to `path`
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let svg = self.finish()?;
        std::fs::write(path, svg.as_bytes())
            .map_err(|e| ExportError::WriteFailed(format!("{}: {e}", path.display())))?;
        log::info!("Wrote SVG ({} bytes) to {}", svg.len(), path.display());
        Ok(())
    }
}

impl SurfaceDevice for SvgSurface {
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

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"a<b & "c""#), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_paint_attr_opacity() {
        assert_eq!(paint_attr("fill", Color::RED), r##"fill="#ff0000""##);
        assert!(paint_attr("fill", Color::rgba(0, 0, 0, 128)).contains(r#"fill-opacity="0.502""#));
    }

    #[test]
    fn test_contour_data() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
        ];
        assert_eq!(contour_data(&[square, Vec::new()]), "M0,0L2,0L2,2Z");
    }

    #[test]
    fn test_empty_document_is_well_formed() {
        let doc = SvgDriver::new(10.0, 20.0).document();
        assert!(doc.contains(r#"width="10" height="20" viewBox="0 0 10 20""#));
        assert!(!doc.contains("<defs>"));
        assert!(doc.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_vector_feature() {
        let driver = SvgDriver::new(1.0, 1.0);
        assert!(driver.has_feature(Features::VECTOR));
        assert!(!driver.has_feature(Features::PRINTER));
    }
}
