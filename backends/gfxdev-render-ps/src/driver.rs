//! The PostScript driver: one operator sequence per drawing call
//!
//! Each page sets up a y-down coordinate system once (`0 H translate
//! 1 -1 scale`), so device coordinates go out unchanged. Clip rectangles
//! live in their own `gsave`/`grestore` level; color, line and font state
//! are re-emitted with every primitive because a clip change discards them.

use std::any::Any;
use std::fmt::Write as FmtWrite;

use gfxdev_core::{
    Bitmap, Cap, Color, DrawState, Features, FillRule, GraphicsDriver, ImageView, Join, Num,
    Point, RectF, TextRun,
};

/// Characters per line of ASCIIHex image data
const HEX_LINE: usize = 78;

/// Plain multi-page PostScript or single-page Encapsulated PostScript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PostScript,
    Eps,
}

/// Writes PostScript Level 2 into memory
#[derive(Debug)]
pub struct PostScriptDriver {
    width: f64,
    height: f64,
    kind: DocumentKind,
    body: String,
    pages: u32,
    in_page: bool,
    /// Clip of the open `gsave ... rectclip` level
    open_clip: Option<RectF>,
}

impl PostScriptDriver {
    /// Pages of `width × height` points
    pub fn new(width: f64, height: f64, kind: DocumentKind) -> Self {
        Self {
            width,
            height,
            kind,
            body: String::new(),
            pages: 0,
            in_page: false,
            open_clip: None,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn in_page(&self) -> bool {
        self.in_page
    }

    /// Start a page, closing the current one first
    pub fn begin_page(&mut self) {
        if self.in_page {
            self.end_page();
        }
        self.pages += 1;
        let n = self.pages;
        let _ = write!(
            self.body,
            "%%Page: {n} {n}\n%%BeginPageSetup\ngsave\n0 {} translate 1 -1 scale\n%%EndPageSetup\n",
            Num(self.height)
        );
        self.in_page = true;
        self.open_clip = None;
        log::debug!("PostScript page {n} started");
    }

    pub fn end_page(&mut self) {
        if !self.in_page {
            return;
        }
        if self.open_clip.take().is_some() {
            self.body.push_str("grestore\n");
        }
        self.body.push_str("grestore\nshowpage\n");
        self.in_page = false;
    }

    /// The full document; an open page is closed in the output only
    pub fn document(&self) -> String {
        let mut ps = String::with_capacity(self.body.len() + 512);
        match self.kind {
            DocumentKind::PostScript => ps.push_str("%!PS-Adobe-3.0\n"),
            DocumentKind::Eps => ps.push_str("%!PS-Adobe-3.0 EPSF-3.0\n"),
        }
        let _ = write!(
            ps,
            "%%Creator: gfxdev\n%%BoundingBox: 0 0 {} {}\n%%HiResBoundingBox: 0 0 {} {}\n%%LanguageLevel: 2\n%%Pages: {}\n%%EndComments\n",
            self.width.ceil(),
            self.height.ceil(),
            Num(self.width),
            Num(self.height),
            self.pages
        );
        ps.push_str(&self.body);
        if self.in_page {
            if self.open_clip.is_some() {
                ps.push_str("grestore\n");
            }
            ps.push_str("grestore\nshowpage\n");
        }
        ps.push_str("%%Trailer\n%%EOF\n");
        ps
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
            self.body.push_str("grestore\n");
        }
        if let Some(clip) = wanted.filter(|c| !c.is_empty()) {
            let _ = writeln!(
                self.body,
                "gsave\n{} {} {} {} rectclip",
                Num(clip.x),
                Num(clip.y),
                Num(clip.w),
                Num(clip.h)
            );
            self.open_clip = Some(clip);
        }
    }

    /// Open a page and sync the clip; false when the clip hides everything
    fn ready(&mut self, state: &DrawState) -> bool {
        self.ensure_page();
        self.sync_clip(state);
        !matches!(state.device_clip(), Some(r) if r.is_empty())
    }

    fn set_color(&mut self, color: Color) {
        let (r, g, b) = color.to_unit_rgb();
        let _ = writeln!(self.body, "{} {} {} setrgbcolor", Num(r), Num(g), Num(b));
    }

    fn set_line(&mut self, state: &DrawState) {
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
        let _ = writeln!(
            self.body,
            "{} setlinewidth {cap} setlinecap {join} setlinejoin 4 setmiterlimit [{}] 0 setdash",
            Num(width),
            dashes.join(" ")
        );
    }

    fn path(&mut self, points: &[Point], close: bool) {
        for (i, p) in points.iter().enumerate() {
            let op = if i == 0 { "moveto" } else { "lineto" };
            let _ = writeln!(self.body, "{} {} {op}", Num(p.x), Num(p.y));
        }
        if close {
            self.body.push_str("closepath\n");
        }
    }

    /// Hex-encoded data followed by the ASCIIHex end marker
    fn hex_data(&mut self, bytes: impl IntoIterator<Item = u8>) {
        let mut column = 0;
        for byte in bytes {
            let _ = write!(self.body, "{byte:02x}");
            column += 2;
            if column >= HEX_LINE {
                self.body.push('\n');
                column = 0;
            }
        }
        self.body.push_str(">\n");
    }

    /// Place the unit square onto `dst`
    fn image_placement(&mut self, dst: RectF) {
        let _ = writeln!(
            self.body,
            "gsave\n{} {} translate {} {} scale",
            Num(dst.x),
            Num(dst.y),
            Num(dst.w),
            Num(dst.h)
        );
    }
}

/// Escape a string for a PostScript `( )` literal
///
/// Characters beyond Latin-1 have no glyph in the standard encodings and
/// come out as `?`.
pub fn escape_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            },
            ' '..='~' => out.push(ch),
            c if (c as u32) < 256 => {
                let _ = write!(out, "\\{:03o}", c as u32);
            },
            _ => out.push('?'),
        }
    }
    out
}

impl GraphicsDriver for PostScriptDriver {
    fn name(&self) -> &'static str {
        "postscript"
    }

    fn features(&self) -> Features {
        Features::PRINTER | Features::VECTOR
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
        self.set_color(state.color());
        let _ = writeln!(
            self.body,
            "{} {} {} {} rectfill",
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
        self.set_color(state.color());
        self.set_line(state);
        self.body.push_str("newpath\n");
        if let [only] = points {
            self.path(&[*only, *only], false);
        } else {
            self.path(points, closed);
        }
        self.body.push_str("stroke\n");
    }

    fn fill_polygon(&mut self, state: &DrawState, contours: &[Vec<Point>], rule: FillRule) {
        if !self.ready(state) {
            return;
        }
        self.set_color(state.color());
        self.body.push_str("newpath\n");
        for contour in contours {
            self.path(contour, true);
        }
        self.body.push_str(match rule {
            FillRule::NonZero => "fill\n",
            FillRule::EvenOdd => "eofill\n",
        });
    }

    fn draw_text(&mut self, state: &DrawState, run: &TextRun<'_>) {
        if !self.ready(state) {
            return;
        }
        self.set_color(state.color());
        // Text needs y up again, locally
        let _ = writeln!(
            self.body,
            "gsave\n/{} findfont {} scalefont setfont\n{} {} translate 1 -1 scale {} rotate\n0 0 moveto ({}) show\ngrestore",
            run.font.postscript_name(),
            Num(run.size),
            Num(run.x),
            Num(run.y),
            Num(run.angle),
            escape_string(run.text)
        );
    }

    fn draw_image(&mut self, state: &DrawState, image: &ImageView<'_>, dst: RectF) {
        if !self.ready(state) {
            return;
        }
        let (w, h) = (image.width(), image.height());
        self.image_placement(dst);
        let _ = writeln!(
            self.body,
            "{w} {h} 8 [{w} 0 0 {h} 0 0] currentfile /ASCIIHexDecode filter false 3 colorimage"
        );
        // No transparency in Level 2: composite onto white paper
        let mut rgb = Vec::with_capacity(w as usize * h as usize * 3);
        for y in 0..h {
            for x in 0..w {
                let [r, g, b, a] = image.rgba(x, y);
                let over_white =
                    |c: u8| ((c as u32 * a as u32 + 255 * (255 - a as u32) + 127) / 255) as u8;
                rgb.extend_from_slice(&[over_white(r), over_white(g), over_white(b)]);
            }
        }
        self.hex_data(rgb);
        self.body.push_str("grestore\n");
    }

    fn draw_bitmap(&mut self, state: &DrawState, bitmap: &Bitmap, dst: RectF) {
        if !self.ready(state) {
            return;
        }
        let (w, h) = (bitmap.width(), bitmap.height());
        self.set_color(state.color());
        self.image_placement(dst);
        let _ = writeln!(
            self.body,
            "{w} {h} true [{w} 0 0 {h} 0 0] currentfile /ASCIIHexDecode filter imagemask"
        );
        // imagemask wants the leftmost pixel in the high bit
        let row_bytes = (w as usize).div_ceil(8);
        let mut bits = Vec::with_capacity(row_bytes * h as usize);
        for y in 0..h {
            let mut row = vec![0u8; row_bytes];
            for x in 0..w {
                if bitmap.is_set(x, y) {
                    row[x as usize / 8] |= 0x80 >> (x % 8);
                }
            }
            bits.extend_from_slice(&row);
        }
        self.hex_data(bits);
        self.body.push_str("grestore\n");
    }
}
