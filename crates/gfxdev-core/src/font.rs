//! Fonts: faces, the registry, and text alignment flags
//!
//! The core never parses font files. A [`FontFace`] hands out metrics and,
//! when it can, glyph outlines; vector drivers only need the family name and
//! style, raster drivers need the outlines. [`BuiltinFace`] is the
//! metrics-only fallback every registry starts with.

use std::collections::HashMap;
use std::sync::Arc;

use bitflags::bitflags;

/// The sixteen standard font slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontId {
    Helvetica,
    HelveticaBold,
    HelveticaItalic,
    HelveticaBoldItalic,
    Courier,
    CourierBold,
    CourierItalic,
    CourierBoldItalic,
    Times,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Symbol,
    Screen,
    ScreenBold,
    ZapfDingbats,
}

impl FontId {
    pub const ALL: [FontId; 16] = [
        FontId::Helvetica,
        FontId::HelveticaBold,
        FontId::HelveticaItalic,
        FontId::HelveticaBoldItalic,
        FontId::Courier,
        FontId::CourierBold,
        FontId::CourierItalic,
        FontId::CourierBoldItalic,
        FontId::Times,
        FontId::TimesBold,
        FontId::TimesItalic,
        FontId::TimesBoldItalic,
        FontId::Symbol,
        FontId::Screen,
        FontId::ScreenBold,
        FontId::ZapfDingbats,
    ];

    /// Generic family, as understood by SVG/CSS
    pub fn css_family(&self) -> &'static str {
        match self {
            FontId::Helvetica
            | FontId::HelveticaBold
            | FontId::HelveticaItalic
            | FontId::HelveticaBoldItalic => "Helvetica, Arial, sans-serif",
            FontId::Courier
            | FontId::CourierBold
            | FontId::CourierItalic
            | FontId::CourierBoldItalic
            | FontId::Screen
            | FontId::ScreenBold => "Courier, monospace",
            FontId::Times | FontId::TimesBold | FontId::TimesItalic | FontId::TimesBoldItalic => {
                "Times, serif"
            },
            FontId::Symbol => "Symbol",
            FontId::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Standard PostScript / PDF base font name
    pub fn postscript_name(&self) -> &'static str {
        match self {
            FontId::Helvetica => "Helvetica",
            FontId::HelveticaBold => "Helvetica-Bold",
            FontId::HelveticaItalic => "Helvetica-Oblique",
            FontId::HelveticaBoldItalic => "Helvetica-BoldOblique",
            FontId::Courier | FontId::Screen => "Courier",
            FontId::CourierBold | FontId::ScreenBold => "Courier-Bold",
            FontId::CourierItalic => "Courier-Oblique",
            FontId::CourierBoldItalic => "Courier-BoldOblique",
            FontId::Times => "Times-Roman",
            FontId::TimesBold => "Times-Bold",
            FontId::TimesItalic => "Times-Italic",
            FontId::TimesBoldItalic => "Times-BoldItalic",
            FontId::Symbol => "Symbol",
            FontId::ZapfDingbats => "ZapfDingbats",
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(
            self,
            FontId::HelveticaBold
                | FontId::HelveticaBoldItalic
                | FontId::CourierBold
                | FontId::CourierBoldItalic
                | FontId::TimesBold
                | FontId::TimesBoldItalic
                | FontId::ScreenBold
        )
    }

    pub fn is_italic(&self) -> bool {
        matches!(
            self,
            FontId::HelveticaItalic
                | FontId::HelveticaBoldItalic
                | FontId::CourierItalic
                | FontId::CourierBoldItalic
                | FontId::TimesItalic
                | FontId::TimesBoldItalic
        )
    }

    pub fn is_monospace(&self) -> bool {
        matches!(
            self,
            FontId::Courier
                | FontId::CourierBold
                | FontId::CourierItalic
                | FontId::CourierBoldItalic
                | FontId::Screen
                | FontId::ScreenBold
        )
    }
}

/// Receives glyph outlines in y-down pixel space, baseline origin at (0, 0)
pub trait OutlineSink {
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn quad_to(&mut self, cx: f64, cy: f64, x: f64, y: f64);
    fn cubic_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64);
    fn close(&mut self);
}

/// Metrics and outlines for one face
pub trait FontFace {
    /// Human-readable face name, for logs
    fn name(&self) -> &str;

    /// Horizontal advance of `ch` at `size` pixels
    fn advance(&self, ch: char, size: f64) -> f64;

    /// Distance from baseline to the top of the line box
    fn ascent(&self, size: f64) -> f64;

    /// Distance from baseline to the bottom of the line box (positive)
    fn descent(&self, size: f64) -> f64;

    /// Trace the outline of `ch` into `sink`; false when the face has none
    fn outline(&self, _ch: char, _size: f64, _sink: &mut dyn OutlineSink) -> bool {
        false
    }
}

/// Metrics-only face used until real fonts are registered
///
/// Monospace slots advance 0.6 em per character; proportional slots use a
/// coarse per-class width so measured strings come out plausible.
#[derive(Debug, Clone)]
pub struct BuiltinFace {
    id: FontId,
}

impl BuiltinFace {
    pub fn new(id: FontId) -> Self {
        Self { id }
    }
}

impl FontFace for BuiltinFace {
    fn name(&self) -> &str {
        self.id.postscript_name()
    }

    fn advance(&self, ch: char, size: f64) -> f64 {
        if self.id.is_monospace() {
            return 0.6 * size;
        }
        let em = match ch {
            'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' => 0.28,
            ' ' | 'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' => 0.33,
            'm' | 'w' | 'M' | 'W' => 0.83,
            'A'..='Z' => 0.67,
            _ => 0.56,
        };
        if self.id.is_bold() {
            em * size * 1.05
        } else {
            em * size
        }
    }

    fn ascent(&self, size: f64) -> f64 {
        0.78 * size
    }

    fn descent(&self, size: f64) -> f64 {
        0.22 * size
    }
}

/// Faces by slot
///
/// Shared between surfaces through an `Arc`; swapping the registry of one
/// surface never affects another.
#[derive(Clone)]
pub struct FontRegistry {
    faces: HashMap<FontId, Arc<dyn FontFace>>,
}

impl FontRegistry {
    /// Registry with a [`BuiltinFace`] in every slot
    pub fn new() -> Self {
        let faces = FontId::ALL
            .iter()
            .map(|&id| (id, Arc::new(BuiltinFace::new(id)) as Arc<dyn FontFace>))
            .collect();
        Self { faces }
    }

    /// Put a face into a slot
    pub fn register(&mut self, id: FontId, face: Arc<dyn FontFace>) {
        log::debug!("Registering font face '{}' as {:?}", face.name(), id);
        self.faces.insert(id, face);
    }

    pub fn face(&self, id: FontId) -> Arc<dyn FontFace> {
        match self.faces.get(&id) {
            Some(face) => face.clone(),
            None => Arc::new(BuiltinFace::new(id)),
        }
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FontRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontRegistry")
            .field("faces", &self.faces.len())
            .finish()
    }
}

bitflags! {
    /// Placement of text inside a box
    ///
    /// No horizontal or vertical bit means centered on that axis.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Align: u32 {
        const CENTER = 0;
        const TOP = 1;
        const BOTTOM = 2;
        const LEFT = 4;
        const RIGHT = 8;
        const INSIDE = 16;
        const CLIP = 64;
    }
}

impl Default for Align {
    fn default() -> Self {
        Align::CENTER
    }
}
