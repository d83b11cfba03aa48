//! The demo scene: a small dialog drawn through the public drawing API
//!
//! Everything a toolkit widget would do shows up once: filled and stroked
//! shapes, text in boxes, a clipped list, nested origins, a complex polygon
//! and an icon rendered offscreen first and then drawn as a cached image.

use std::sync::Arc;

use gfxdev_core::{
    Align, Color, Dash, FillRule, FontId, FontRegistry, LineStyle, Result, RgbImage, Surface,
    SurfaceDevice,
};
use gfxdev_render_raster::ImageSurface;

const FACE: Color = Color::rgb(0xd4, 0xd0, 0xc8);
const TITLE: Color = Color::rgb(0x1c, 0x3c, 0x8c);
const SHADOW: Color = Color::rgb(0x80, 0x80, 0x80);

/// Draws a warning icon into an offscreen surface and snapshots it
pub fn render_icon(size: u32) -> Result<RgbImage> {
    let mut offscreen = ImageSurface::new(size, size, false, 1.0)?;
    {
        let s = offscreen.surface_mut();
        let n = size as i32;
        s.set_color(FACE);
        s.rectf(0, 0, n, n);
        s.set_color(Color::rgb(0xf0, 0xc0, 0x20));
        s.begin_polygon();
        s.vertex(n as f64 / 2.0, 1.0);
        s.vertex(n as f64 - 1.0, n as f64 - 2.0);
        s.vertex(1.0, n as f64 - 2.0);
        s.end_polygon();
        s.set_color(Color::BLACK);
        s.rectf(n / 2 - 1, n / 4, 3, n / 2 - 2);
        s.rectf(n / 2 - 1, n * 3 / 4, 3, 3);
    }
    offscreen.image()
}

/// Parameters of one rendering of the dialog
#[derive(Debug, Clone)]
pub struct Scene {
    pub title: String,
    pub width: i32,
    pub height: i32,
    pub fonts: Option<Arc<FontRegistry>>,
    pub icon: Option<RgbImage>,
}

impl Scene {
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width: width as i32,
            height: height as i32,
            fonts: None,
            icon: None,
        }
    }

    pub fn with_fonts(mut self, fonts: Arc<FontRegistry>) -> Self {
        self.fonts = Some(fonts);
        self
    }

    pub fn with_icon(mut self, icon: RgbImage) -> Self {
        self.icon = Some(icon);
        self
    }

    /// Draw page `page` (0-based) of the dialog onto `s`
    pub fn draw(&self, s: &mut Surface, page: u32) -> Result<()> {
        if let Some(fonts) = &self.fonts {
            s.set_fonts(fonts.clone());
        }
        let (w, h) = (self.width, self.height);

        s.set_color(FACE);
        s.rectf(0, 0, w, h);
        self.title_bar(s);

        if let Some(icon) = &self.icon {
            s.draw_rgb(icon, 12, 36);
        }
        s.set_color(Color::BLACK);
        s.set_font(FontId::Helvetica, 12.0);
        let message = if page == 0 {
            "The document has unsaved changes.\nSave them before closing?".to_string()
        } else {
            format!("Page {}", page + 1)
        };
        s.draw_text_aligned(&message, 56, 36, w - 68, 36, Align::LEFT | Align::TOP);

        self.list_box(s, 12, 80, w - 24, h - 124)?;
        self.badge(s, w - 44, 80);

        s.set_color(SHADOW);
        s.set_line_style(LineStyle::solid(1.0).with_dash(Dash::Dot));
        s.xyline(12, h - 36, w - 12);
        s.set_line_style(LineStyle::default());

        // Buttons are laid out relative to the button row
        s.translate(w - 172, h - 30);
        self.button(s, 0, 0, 76, 22, "Save", true);
        self.button(s, 84, 0, 76, 22, "Discard", false);
        s.untranslate()?;
        Ok(())
    }

    fn title_bar(&self, s: &mut Surface) {
        s.set_color(TITLE);
        s.rectf(0, 0, self.width, 24);
        s.set_color(Color::WHITE);
        s.set_font(FontId::HelveticaBold, 13.0);
        s.draw_text_aligned(&self.title, 8, 0, self.width - 40, 24, Align::LEFT | Align::CLIP);
        // Close box
        s.rectf(self.width - 20, 6, 12, 12);
        s.set_color(TITLE);
        s.line(self.width - 18, 8, self.width - 11, 15);
        s.line(self.width - 11, 8, self.width - 18, 15);
    }

    /// A list whose rows overflow the box and get clipped
    fn list_box(&self, s: &mut Surface, x: i32, y: i32, w: i32, h: i32) -> Result<()> {
        if w <= 0 || h <= 0 {
            return Ok(());
        }
        s.set_color(Color::WHITE);
        s.rectf(x, y, w, h);
        s.set_color(SHADOW);
        s.rect(x, y, w, h);

        s.push_clip(x + 1, y + 1, w - 2, h - 2);
        s.set_font(FontId::Courier, 11.0);
        for row in 0..12 {
            let row_y = y + 2 + row * 16;
            if row == 1 {
                s.set_color(TITLE);
                s.rectf(x + 1, row_y, w - 2, 16);
                s.set_color(Color::WHITE);
            } else {
                s.set_color(Color::BLACK);
            }
            s.draw_text(&format!("report-{:02}.txt", row + 1), x + 6, row_y + 12);
        }
        s.pop_clip()
    }

    /// A star drawn as one even-odd complex polygon, so its core stays open
    fn badge(&self, s: &mut Surface, cx: i32, cy: i32) {
        let (cx, cy, r) = (cx as f64 + 14.0, cy as f64 + 14.0, 12.0);
        s.set_color(Color::rgb(0x20, 0x90, 0x40));
        s.set_fill_rule(FillRule::EvenOdd);
        s.begin_complex_polygon();
        for i in 0..5 {
            let angle = (i as f64 * 144.0 - 90.0).to_radians();
            s.vertex(cx + r * angle.cos(), cy + r * angle.sin());
        }
        s.end_complex_polygon();
    }

    #[allow(clippy::too_many_arguments)]
    fn button(&self, s: &mut Surface, x: i32, y: i32, w: i32, h: i32, label: &str, default: bool) {
        s.set_color(Color::WHITE);
        s.rounded_rectf(x, y, w, h, 4);
        s.set_color(SHADOW);
        s.rounded_rect(x, y, w, h, 4);
        s.set_color(Color::BLACK);
        s.set_font(FontId::Helvetica, 12.0);
        s.draw_text_aligned(label, x, y, w, h, Align::CENTER);
        if default {
            s.focus_rect(x + 3, y + 3, w - 6, h - 6);
        }
    }
}
