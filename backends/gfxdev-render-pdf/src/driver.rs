//! The PDF driver: content stream operators plus shared resources
//!
//! Every page's content starts with `1 0 0 -1 0 H cm`, so device
//! coordinates are written as they come. Fonts are the standard 14 Type 1
//! faces and need no embedding. Images become `/FlateDecode` XObjects with
//! an `/SMask` for alpha; cached images are written once per document and
//! referenced from every page that draws them.

use std::any::Any;
use std::fmt::Write as FmtWrite;

use gfxdev_core::image::ImageCache;
use gfxdev_core::{
    Cap, DrawState, Features, FillRule, FontId, GraphicsDriver, ImageId, ImageView, Join, Num,
    Point, Rect, RectF, Result, RgbImage, TextRun,
};

use crate::writer::{deflate, PdfWriter};

/// One image XObject, already compressed
#[derive(Debug)]
struct PdfImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

impl PdfImage {
    fn from_view(view: &ImageView<'_>) -> Result<Self> {
        let (w, h) = (view.width(), view.height());
        let mut rgb = Vec::with_capacity(w as usize * h as usize * 3);
        let mut alpha = Vec::with_capacity(w as usize * h as usize);
        for y in 0..h {
            for x in 0..w {
                let [r, g, b, a] = view.rgba(x, y);
                rgb.extend_from_slice(&[r, g, b]);
                alpha.push(a);
            }
        }
        let alpha = if alpha.iter().any(|&a| a < 255) {
            Some(deflate(&alpha)?)
        } else {
            None
        };
        Ok(Self {
            width: w,
            height: h,
            rgb: deflate(&rgb)?,
            alpha,
        })
    }
}

/// Escape a string for a PDF `( )` literal in WinAnsi encoding
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            },
            ' '..='~' => out.push(ch),
            c if (0xA0..=0xFF).contains(&(c as u32)) => {
                let _ = write!(out, "\\{:03o}", c as u32);
            },
            _ => out.push('?'),
        }
    }
    out
}

/// Writes a PDF document into memory
#[derive(Debug)]
pub struct PdfDriver {
    width: f64,
    height: f64,
    /// Content streams of finished pages
    pages: Vec<String>,
    content: String,
    in_page: bool,
    open_clip: Option<RectF>,
    fonts: Vec<FontId>,
    images: Vec<PdfImage>,
    /// Cached images map to their index in `images`
    cache: ImageCache<Option<usize>>,
}

impl PdfDriver {
    /// Pages of `width × height` points
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            pages: Vec::new(),
            content: String::new(),
            in_page: false,
            open_clip: None,
            fonts: Vec::new(),
            images: Vec::new(),
            cache: ImageCache::new(),
        }
    }

    /// Finished pages plus the open one
    pub fn pages(&self) -> u32 {
        (self.pages.len() + usize::from(self.in_page)) as u32
    }

    pub fn in_page(&self) -> bool {
        self.in_page
    }

    /// Image XObjects written so far
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn begin_page(&mut self) {
        if self.in_page {
            self.end_page();
        }
        self.content.clear();
        let _ = writeln!(self.content, "q\n1 0 0 -1 0 {} cm", Num(self.height));
        self.in_page = true;
        self.open_clip = None;
        log::debug!("PDF page {} started", self.pages.len() + 1);
    }

    pub fn end_page(&mut self) {
        if !self.in_page {
            return;
        }
        let mut content = std::mem::take(&mut self.content);
        if self.open_clip.take().is_some() {
            content.push_str("Q\n");
        }
        content.push_str("Q\n");
        self.pages.push(content);
        self.in_page = false;
    }

    /// Assemble the file; an open page is included as if ended
    ///
    /// A document nobody drew on still gets one blank page.
    pub fn document(&self) -> Vec<u8> {
        let mut contents: Vec<String> = self.pages.clone();
        if self.in_page {
            let mut open = self.content.clone();
            if self.open_clip.is_some() {
                open.push_str("Q\n");
            }
            open.push_str("Q\n");
            contents.push(open);
        }
        if contents.is_empty() {
            contents.push(String::new());
        }

        let mut writer = PdfWriter::new();

        let mut font_refs = String::new();
        for (i, font) in self.fonts.iter().enumerate() {
            let encoding = match font {
                FontId::Symbol | FontId::ZapfDingbats => "",
                _ => " /Encoding /WinAnsiEncoding",
            };
            let id = writer.object(&format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{}{encoding} >>",
                font.postscript_name()
            ));
            let _ = write!(font_refs, " /F{} {id} 0 R", i + 1);
        }

        let mut image_refs = String::new();
        for (i, image) in self.images.iter().enumerate() {
            let smask = image.alpha.as_ref().map(|alpha| {
                writer.stream(
                    &format!(
                        "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode",
                        image.width, image.height
                    ),
                    alpha,
                )
            });
            let smask = smask.map(|id| format!(" /SMask {id} 0 R")).unwrap_or_default();
            let id = writer.stream(
                &format!(
                    "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode{smask}",
                    image.width, image.height
                ),
                &image.rgb,
            );
            let _ = write!(image_refs, " /Im{} {id} 0 R", i + 1);
        }

        let resources = writer.object(&format!(
            "<< /ProcSet [/PDF /Text /ImageC] /Font <<{font_refs} >> /XObject <<{image_refs} >> >>"
        ));

        // Each page is a content stream plus a page object; the page tree follows
        let pages_id = writer.next_id() + 2 * contents.len();
        let mut kids = Vec::with_capacity(contents.len());
        for content in &contents {
            let stream = writer.stream("", content.as_bytes());
            let page = writer.object(&format!(
                "<< /Type /Page /Parent {pages_id} 0 R /MediaBox [0 0 {} {}] /Resources {resources} 0 R /Contents {stream} 0 R >>",
                Num(self.width),
                Num(self.height)
            ));
            kids.push(format!("{page} 0 R"));
        }
        writer.object(&format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            kids.len()
        ));
        let catalog = writer.object(&format!("<< /Type /Catalog /Pages {pages_id} 0 R >>"));
        writer.finish(catalog)
    }

    fn ensure_page(&mut self) {
        if !self.in_page {
            log::debug!("Drawing outside begin_page; starting a page implicitly");
            self.begin_page();
        }
    }

    fn sync_clip(&mut self, state: &DrawState) {
        let wanted = state.device_clip();
        if wanted == self.open_clip {
            return;
        }
        if self.open_clip.take().is_some() {
            self.content.push_str("Q\n");
        }
        if let Some(clip) = wanted.filter(|c| !c.is_empty()) {
            let _ = writeln!(
                self.content,
                "q\n{} {} {} {} re W n",
                Num(clip.x),
                Num(clip.y),
                Num(clip.w),
                Num(clip.h)
            );
            self.open_clip = Some(clip);
        }
    }

    fn ready(&mut self, state: &DrawState) -> bool {
        self.ensure_page();
        self.sync_clip(state);
        !matches!(state.device_clip(), Some(r) if r.is_empty())
    }

    /// Color operator, `rg` for fills and `RG` for strokes
    fn color(&mut self, state: &DrawState, op: &str) {
        let (r, g, b) = state.color().to_unit_rgb();
        let _ = writeln!(self.content, "{} {} {} {op}", Num(r), Num(g), Num(b));
    }

    fn path(&mut self, points: &[Point], close: bool) {
        for (i, p) in points.iter().enumerate() {
            let op = if i == 0 { "m" } else { "l" };
            let _ = writeln!(self.content, "{} {} {op}", Num(p.x), Num(p.y));
        }
        if close {
            self.content.push_str("h\n");
        }
    }

    fn font_resource(&mut self, font: FontId) -> usize {
        match self.fonts.iter().position(|f| *f == font) {
            Some(i) => i + 1,
            None => {
                self.fonts.push(font);
                self.fonts.len()
            },
        }
    }

    /// Paint XObject `index` (0-based) so that its pixel `src` lands on `dst`
    fn place_image(&mut self, index: usize, full: (u32, u32), src: Rect, dst: RectF) {
        let sx = dst.w / src.w as f64;
        let sy = dst.h / src.h as f64;
        let w = full.0 as f64 * sx;
        let h = full.1 as f64 * sy;
        let x = dst.x - src.x as f64 * sx;
        let y = dst.y - src.y as f64 * sy;
        self.content.push_str("q\n");
        if src != Rect::new(0, 0, full.0 as i32, full.1 as i32) {
            let _ = writeln!(
                self.content,
                "{} {} {} {} re W n",
                Num(dst.x),
                Num(dst.y),
                Num(dst.w),
                Num(dst.h)
            );
        }
        // Image space has its first row at the top of the unit square
        let _ = writeln!(
            self.content,
            "{} 0 0 {} {} {} cm\n/Im{} Do\nQ",
            Num(w),
            Num(-h),
            Num(x),
            Num(y + h),
            index + 1
        );
    }

    fn add_image(&mut self, view: &ImageView<'_>) -> Option<usize> {
        match PdfImage::from_view(view) {
            Ok(image) => {
                self.images.push(image);
                Some(self.images.len() - 1)
            },
            Err(e) => {
                log::warn!("PDF image skipped: {e}");
                None
            },
        }
    }
}

impl GraphicsDriver for PdfDriver {
    fn name(&self) -> &'static str {
        "pdf"
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
        if self.in_page {
            self.sync_clip(state);
        }
    }

    fn clip_changed(&mut self, state: &DrawState) {
        if self.in_page {
            self.sync_clip(state);
        }
    }

    fn fill_rect(&mut self, state: &DrawState, rect: RectF) {
        if !self.ready(state) {
            return;
        }
        self.color(state, "rg");
        let _ = writeln!(
            self.content,
            "{} {} {} {} re f",
            Num(rect.x),
            Num(rect.y),
            Num(rect.w),
            Num(rect.h)
        );
    }

    fn stroke_polyline(&mut self, state: &DrawState, points: &[Point], closed: bool) {
        if !self.ready(state) || points.is_empty() {
            return;
        }
        let width = state.device_line_width();
        let style = state.line_style();
        let cap = match style.cap {
            Cap::Flat => 0,
            Cap::Round => 1,
            Cap::Square => 2,
        };
        let join = match style.join {
            Join::Miter => 0,
            Join::Round => 1,
            Join::Bevel => 2,
        };
        let dashes: Vec<String> = style
            .dash_pattern(width)
            .iter()
            .map(|v| Num(*v).to_string())
            .collect();
        self.color(state, "RG");
        let _ = writeln!(
            self.content,
            "{} w {cap} J {join} j 4 M [{}] 0 d",
            Num(width),
            dashes.join(" ")
        );
        if let [only] = points {
            self.path(&[*only, *only], false);
        } else {
            self.path(points, closed);
        }
        self.content.push_str("S\n");
    }

    fn fill_polygon(&mut self, state: &DrawState, contours: &[Vec<Point>], rule: FillRule) {
        if !self.ready(state) {
            return;
        }
        self.color(state, "rg");
        for contour in contours {
            self.path(contour, true);
        }
        self.content.push_str(match rule {
            FillRule::NonZero => "f\n",
            FillRule::EvenOdd => "f*\n",
        });
    }

    fn draw_text(&mut self, state: &DrawState, run: &TextRun<'_>) {
        if !self.ready(state) {
            return;
        }
        let font = self.font_resource(run.font);
        self.color(state, "rg");
        let _ = writeln!(
            self.content,
            "q\n1 0 0 -1 {} {} cm",
            Num(run.x),
            Num(run.y)
        );
        if run.angle != 0.0 {
            let (sin, cos) = run.angle.to_radians().sin_cos();
            let _ = writeln!(
                self.content,
                "{} {} {} {} 0 0 cm",
                Num(cos),
                Num(sin),
                Num(-sin),
                Num(cos)
            );
        }
        let _ = writeln!(
            self.content,
            "BT\n/F{font} {} Tf\n0 0 Td\n({}) Tj\nET\nQ",
            Num(run.size),
            escape_text(run.text)
        );
    }

    fn draw_image(&mut self, state: &DrawState, image: &ImageView<'_>, dst: RectF) {
        if !self.ready(state) {
            return;
        }
        let (w, h) = (image.width(), image.height());
        if let Some(index) = self.add_image(image) {
            self.place_image(index, (w, h), Rect::new(0, 0, w as i32, h as i32), dst);
        }
    }

    fn draw_cached(&mut self, state: &DrawState, image: &RgbImage, src: Rect, dst: RectF) {
        if !self.ready(state) {
            return;
        }
        let full = (image.width(), image.height());
        let src = Rect::new(0, 0, full.0 as i32, full.1 as i32).intersect(&src);
        if src.is_empty() {
            return;
        }
        let Self { cache, images, .. } = self;
        let index = *cache.get_or_insert_with(image, |img| {
            match PdfImage::from_view(&img.view()) {
                Ok(converted) => {
                    images.push(converted);
                    log::debug!("Image {} written as XObject {}", img.id().get(), images.len());
                    Some(images.len() - 1)
                },
                Err(e) => {
                    log::warn!("PDF image skipped: {e}");
                    None
                },
            }
        });
        if let Some(index) = index {
            self.place_image(index, full, src, dst);
        }
    }

    fn uncache_image(&mut self, id: ImageId) {
        // The XObject stays in the file; later draws write a fresh one
        self.cache.remove(id);
    }
}
