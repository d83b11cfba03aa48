//! Font Database: real outlines for the standard font slots
//!
//! The core ships metrics-only faces. This crate loads TrueType and
//! OpenType files into [`OutlineFace`]s that measure with the font's own
//! advances and trace glyph outlines for the raster drivers.
//!
//! ## Memory Management
//!
//! A face owns its file bytes and parses a `FontRef` on demand, so there
//! are no self-referential structs and collections (TTC) work by index.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gfxdev_core::{FontError, FontFace, FontId, FontRegistry, OutlineSink, Result};
use read_fonts::FileRef;
use skrifa::instance::{LocationRef, Size};
use skrifa::outline::{DrawSettings, OutlinePen};
use skrifa::raw::TableProvider;
use skrifa::string::StringId;
use skrifa::{FontRef, GlyphId, MetadataProvider};

/// Number of faces in a font file: 1 for plain fonts, n for collections
pub fn face_count(data: &[u8]) -> Result<u32> {
    match FileRef::new(data).map_err(|_| FontError::InvalidData)? {
        FileRef::Font(_) => Ok(1),
        FileRef::Collection(collection) => Ok(collection.len()),
    }
}

/// One face of a font file
pub struct OutlineFace {
    name: String,
    data: Vec<u8>,
    face_index: u32,
    units_per_em: u16,
    /// Typographic ascender in font units
    ascent: i16,
    /// Typographic descender in font units, positive below the baseline
    descent: i16,
}

impl OutlineFace {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_index(path, 0)
    }

    /// Open face `face_index` of a file (for TTC collections)
    pub fn from_file_index(path: impl AsRef<Path>, face_index: u32) -> Result<Self> {
        let path = path.as_ref();
        let data =
            fs::read(path).map_err(|_| FontError::FileNotFound(path.display().to_string()))?;
        Self::from_data_index(data, face_index)
    }

    pub fn from_data(data: Vec<u8>) -> Result<Self> {
        Self::from_data_index(data, 0)
    }

    pub fn from_data_index(data: Vec<u8>, face_index: u32) -> Result<Self> {
        let font = FontRef::from_index(&data, face_index).map_err(|_| FontError::InvalidData)?;

        let units_per_em = font.head().map(|head| head.units_per_em()).unwrap_or(1000);
        // OS/2 typo metrics first, hhea when the font has no OS/2 table
        let (ascent, descent) = font
            .os2()
            .ok()
            .map(|os2| (os2.s_typo_ascender(), os2.s_typo_descender()))
            .or_else(|| {
                font.hhea()
                    .ok()
                    .map(|hhea| (hhea.ascender().to_i16(), hhea.descender().to_i16()))
            })
            .unwrap_or((800, -200));

        let name = font
            .localized_strings(StringId::FAMILY_NAME)
            .english_or_first()
            .map(|s| s.chars().collect::<String>())
            .unwrap_or_else(|| format!("face {face_index}"));
        log::debug!("Loaded font face '{name}' ({units_per_em} units/em)");

        Ok(Self {
            name,
            data,
            face_index,
            units_per_em,
            ascent,
            descent: descent.saturating_neg(),
        })
    }

    pub fn face_index(&self) -> u32 {
        self.face_index
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    fn font_ref(&self) -> Option<FontRef<'_>> {
        FontRef::from_index(&self.data, self.face_index).ok()
    }

    pub fn glyph_id(&self, ch: char) -> Option<GlyphId> {
        self.font_ref()?.charmap().map(ch)
    }

    fn units_to_pixels(&self, units: i16, size: f64) -> f64 {
        units as f64 * size / self.units_per_em.max(1) as f64
    }
}

impl FontFace for OutlineFace {
    fn name(&self) -> &str {
        &self.name
    }

    fn advance(&self, ch: char, size: f64) -> f64 {
        let advance = self.font_ref().and_then(|font| {
            let gid = font.charmap().map(ch)?;
            font.glyph_metrics(Size::new(size as f32), LocationRef::default())
                .advance_width(gid)
        });
        match advance {
            Some(width) => width as f64,
            // Missing glyphs are drawn as boxes half an em wide
            None => 0.5 * size,
        }
    }

    fn ascent(&self, size: f64) -> f64 {
        self.units_to_pixels(self.ascent, size)
    }

    fn descent(&self, size: f64) -> f64 {
        self.units_to_pixels(self.descent, size)
    }

    fn outline(&self, ch: char, size: f64, sink: &mut dyn OutlineSink) -> bool {
        let Some(font) = self.font_ref() else {
            return false;
        };
        let Some(glyph) = font
            .charmap()
            .map(ch)
            .and_then(|gid| font.outline_glyphs().get(gid))
        else {
            return false;
        };
        let settings = DrawSettings::unhinted(Size::new(size as f32), LocationRef::default());
        let mut pen = SinkPen { sink };
        match glyph.draw(settings, &mut pen) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Outline of {ch:?} in '{}' failed: {e}", self.name);
                false
            },
        }
    }
}

impl std::fmt::Debug for OutlineFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlineFace")
            .field("name", &self.name)
            .field("face_index", &self.face_index)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Forwards skrifa's y-up pen calls to a y-down sink
struct SinkPen<'a> {
    sink: &'a mut dyn OutlineSink,
}

impl OutlinePen for SinkPen<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        self.sink.move_to(x as f64, -y as f64);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.sink.line_to(x as f64, -y as f64);
    }

    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        self.sink
            .quad_to(cx as f64, -cy as f64, x as f64, -y as f64);
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.sink.cubic_to(
            cx0 as f64,
            -cy0 as f64,
            cx1 as f64,
            -cy1 as f64,
            x as f64,
            -y as f64,
        );
    }

    fn close(&mut self) {
        self.sink.close();
    }
}

/// Loaded faces, deduplicated by path
#[derive(Debug, Default)]
pub struct FontDatabase {
    path_cache: HashMap<PathBuf, Arc<OutlineFace>>,
}

impl FontDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a font file; the same path is only read once
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Arc<OutlineFace>> {
        let path = path.as_ref();
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if let Some(face) = self.path_cache.get(&key) {
            return Ok(face.clone());
        }
        let face = Arc::new(OutlineFace::from_file(path)?);
        self.path_cache.insert(key, face.clone());
        Ok(face)
    }

    /// Load `path` and put it into slot `id` of `registry`
    pub fn assign(
        &mut self,
        registry: &mut FontRegistry,
        id: FontId,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let face = self.load(path)?;
        registry.register(id, face);
        Ok(())
    }

    /// Registry with `path` in every slot
    ///
    /// Handy when a single family is all there is; bold and italic slots
    /// render in the regular style.
    pub fn registry_with(&mut self, path: impl AsRef<Path>) -> Result<FontRegistry> {
        let face = self.load(path)?;
        let mut registry = FontRegistry::new();
        for id in FontId::ALL {
            registry.register(id, face.clone());
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.path_cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path_cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.path_cache.clear();
    }
}
