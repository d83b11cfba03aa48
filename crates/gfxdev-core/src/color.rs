//! Colors and the 256-entry indexed palette
//!
//! The palette layout is the classic toolkit color map:
//!
//! - `0..16`   system colors (foreground, background, selection, ...)
//! - `16..32`  free slots, black until assigned
//! - `32..56`  a 24-step gray ramp, black to white
//! - `56..256` a 5 × 8 × 5 (red × green × blue) color cube
//!
//! Backends that can only show a limited palette map every requested RGB
//! value to its nearest entry. Running out of colors never fails.

/// Simple RGBA color that works everywhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Decode `0xRRGGBB`
    pub const fn from_hex(rgb: u32) -> Self {
        Self::rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// `#rrggbb`, as used by SVG and CSS
    pub fn to_css_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Components scaled to `0.0..=1.0`, for PostScript and PDF operators
    pub fn to_unit_rgb(&self) -> (f64, f64, f64) {
        (
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        )
    }

    /// Perceptual gray level used for masks and gray exports
    pub fn luminance(&self) -> u8 {
        ((77 * self.r as u32 + 150 * self.g as u32 + 29 * self.b as u32) >> 8) as u8
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Number of palette entries
pub const PALETTE_SIZE: usize = 256;

/// First gray ramp index
pub const GRAY_RAMP: u8 = 32;
/// Number of gray ramp steps
pub const NUM_GRAY: u8 = 24;
/// First color cube index
pub const COLOR_CUBE: u8 = 56;
pub const NUM_RED: u8 = 5;
pub const NUM_GREEN: u8 = 8;
pub const NUM_BLUE: u8 = 5;

/// Well-known palette indices
pub mod index {
    pub const FOREGROUND: u8 = 0;
    pub const BACKGROUND2: u8 = 7;
    pub const INACTIVE: u8 = 8;
    pub const SELECTION: u8 = 15;
    pub const GRAY0: u8 = 32;
    pub const DARK3: u8 = 39;
    pub const DARK2: u8 = 45;
    pub const DARK1: u8 = 47;
    pub const BACKGROUND: u8 = 49;
    pub const LIGHT1: u8 = 50;
    pub const LIGHT2: u8 = 52;
    pub const LIGHT3: u8 = 54;
    pub const BLACK: u8 = 56;
    pub const GREEN: u8 = 63;
    pub const RED: u8 = 88;
    pub const YELLOW: u8 = 95;
    pub const BLUE: u8 = 216;
    pub const CYAN: u8 = 223;
    pub const MAGENTA: u8 = 248;
    pub const WHITE: u8 = 255;
}

/// Palette index of a color cube entry
///
/// `r` in `0..5`, `g` in `0..8`, `b` in `0..5`; out-of-range components
/// are clamped.
pub fn color_cube(r: u8, g: u8, b: u8) -> u8 {
    let r = r.min(NUM_RED - 1);
    let g = g.min(NUM_GREEN - 1);
    let b = b.min(NUM_BLUE - 1);
    (b * NUM_RED + r) * NUM_GREEN + g + COLOR_CUBE
}

/// Palette index of a gray ramp step (`0..24`)
pub fn gray_ramp(level: u8) -> u8 {
    level.min(NUM_GRAY - 1) + GRAY_RAMP
}

/// The indexed color map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [Color; PALETTE_SIZE],
}

impl Palette {
    /// The default map
    pub fn new() -> Self {
        let mut entries = [Color::BLACK; PALETTE_SIZE];

        // System colors: black, red, green, yellow, blue, magenta, cyan, white,
        // then the inactive gray and the darker variants, selection last.
        const SYSTEM: [u32; 16] = [
            0x000000, 0xff0000, 0x00ff00, 0xffff00, 0x0000ff, 0xff00ff, 0x00ffff, 0xffffff,
            0x555555, 0xc67171, 0x71c671, 0x8e8e38, 0x7171c6, 0x8e388e, 0x388e8e, 0x000080,
        ];
        for (slot, rgb) in entries.iter_mut().zip(SYSTEM) {
            *slot = Color::from_hex(rgb);
        }

        for i in 0..NUM_GRAY {
            let level = (i as u32 * 255 / (NUM_GRAY as u32 - 1)) as u8;
            entries[(GRAY_RAMP + i) as usize] = Color::rgb(level, level, level);
        }

        for b in 0..NUM_BLUE {
            for r in 0..NUM_RED {
                for g in 0..NUM_GREEN {
                    let color = Color::rgb(
                        (r as u32 * 255 / (NUM_RED as u32 - 1)) as u8,
                        (g as u32 * 255 / (NUM_GREEN as u32 - 1)) as u8,
                        (b as u32 * 255 / (NUM_BLUE as u32 - 1)) as u8,
                    );
                    entries[color_cube(r, g, b) as usize] = color;
                }
            }
        }

        Self { entries }
    }

    pub fn get(&self, index: u8) -> Color {
        self.entries[index as usize]
    }

    /// Reassign one entry
    pub fn set(&mut self, index: u8, color: Color) {
        self.entries[index as usize] = Color::rgb(color.r, color.g, color.b);
    }

    /// Entry closest to `color` by squared RGB distance
    ///
    /// Ties go to the lowest index, so the result is stable.
    pub fn nearest(&self, color: Color) -> u8 {
        let mut best = 0usize;
        let mut best_distance = u32::MAX;
        for (i, entry) in self.entries.iter().enumerate() {
            let dr = entry.r as i32 - color.r as i32;
            let dg = entry.g as i32 - color.g as i32;
            let db = entry.b as i32 - color.b as i32;
            let distance = (dr * dr + dg * dg + db * db) as u32;
            if distance < best_distance {
                best = i;
                best_distance = distance;
                if distance == 0 {
                    break;
                }
            }
        }
        best as u8
    }

    /// Snap a color onto the palette, keeping its alpha
    pub fn approximate(&self, color: Color) -> Color {
        let entry = self.get(self.nearest(color));
        Color::rgba(entry.r, entry.g, entry.b, color.a)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}
