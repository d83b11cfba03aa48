//! Offscreen pixel buffers
//!
//! An [`Offscreen`] is a plain RGBA8 buffer, row-major with no padding. It
//! tracks the rectangle touched since the last [`Offscreen::take_damage`]
//! so window surfaces only present what changed.

use gfxdev_core::{Color, GfxError, ImageView, Rect, RenderError, Result, RgbImage};

/// Bytes per pixel in every offscreen buffer
pub const BYTES_PER_PIXEL: usize = 4;

/// RGBA8 pixel buffer
#[derive(Clone)]
pub struct Offscreen {
    width: u32,
    height: u32,
    data: Vec<u8>,
    damage: Option<Rect>,
}

fn buffer_len(width: u32, height: u32) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidDimensions { width, height }.into());
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
        .ok_or_else(|| {
            GfxError::from(RenderError::AllocationFailed { bytes: usize::MAX })
        })
}

impl Offscreen {
    /// Opaque white buffer
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::with_color(width, height, Color::WHITE)
    }

    /// Buffer filled with `color`
    ///
    /// Fails instead of aborting when the allocation cannot be satisfied.
    pub fn with_color(width: u32, height: u32, color: Color) -> Result<Self> {
        let len = buffer_len(width, height)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| RenderError::AllocationFailed { bytes: len })?;
        let px = [color.r, color.g, color.b, color.a];
        for _ in 0..len / BYTES_PER_PIXEL {
            data.extend_from_slice(&px);
        }
        log::debug!("Allocated {width}x{height} offscreen ({len} bytes)");
        Ok(Self {
            width,
            height,
            data,
            damage: None,
        })
    }

    /// Wrap existing RGBA pixels
    pub fn from_rgba(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = buffer_len(width, height)?;
        if data.len() != expected {
            return Err(RenderError::BufferTooSmall {
                expected,
                actual: data.len(),
            }
            .into());
        }
        Ok(Self {
            width,
            height,
            data,
            damage: None,
        })
    }

    /// Copy of the buffer that reports allocation failure
    pub fn try_clone(&self) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(self.data.len())
            .map_err(|_| RenderError::AllocationFailed {
                bytes: self.data.len(),
            })?;
        data.extend_from_slice(&self.data);
        Ok(Self {
            width: self.width,
            height: self.height,
            data,
            damage: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        self.damage = Some(self.bounds());
        &mut self.data
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    /// Pixel at (x, y); transparent outside the buffer
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        if x >= self.width || y >= self.height {
            return Color::TRANSPARENT;
        }
        let i = self.index(x, y);
        Color::rgba(
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        )
    }

    fn mark(&mut self, r: Rect) {
        if r.is_empty() {
            return;
        }
        self.damage = Some(match self.damage {
            None => r,
            Some(d) => {
                let x0 = d.x.min(r.x);
                let y0 = d.y.min(r.y);
                let x1 = d.right().max(r.right());
                let y1 = d.bottom().max(r.bottom());
                Rect::new(x0, y0, x1 - x0, y1 - y0)
            },
        });
    }

    /// Overwrite every pixel
    pub fn fill(&mut self, color: Color) {
        let px = [color.r, color.g, color.b, color.a];
        for chunk in self.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            chunk.copy_from_slice(&px);
        }
        self.damage = Some(self.bounds());
    }

    /// Paint `x0..x1` on row `y`, blending when `color` is translucent
    ///
    /// The span is clamped to the buffer.
    pub fn fill_span(&mut self, y: i32, x0: i32, x1: i32, color: Color) {
        if y < 0 || y >= self.height as i32 {
            return;
        }
        let x0 = x0.max(0);
        let x1 = x1.min(self.width as i32);
        if x0 >= x1 || color.a == 0 {
            return;
        }
        let start = self.index(x0 as u32, y as u32);
        let end = self.index(x1 as u32 - 1, y as u32) + BYTES_PER_PIXEL;
        let row = &mut self.data[start..end];
        if color.is_opaque() {
            let px = [color.r, color.g, color.b, 255];
            for chunk in row.chunks_exact_mut(BYTES_PER_PIXEL) {
                chunk.copy_from_slice(&px);
            }
        } else {
            for chunk in row.chunks_exact_mut(BYTES_PER_PIXEL) {
                blend_into(chunk, [color.r, color.g, color.b, color.a]);
            }
        }
        self.mark(Rect::new(x0, y, x1 - x0, 1));
    }

    /// Composite one RGBA source pixel over (x, y)
    pub fn blend_pixel(&mut self, x: i32, y: i32, src: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 || src[3] == 0 {
            return;
        }
        let i = self.index(x as u32, y as u32);
        let px = &mut self.data[i..i + BYTES_PER_PIXEL];
        if src[3] == 255 {
            px.copy_from_slice(&src);
        } else {
            blend_into(px, src);
        }
        self.mark(Rect::new(x, y, 1, 1));
    }

    /// Borrow as a depth-4 image view
    pub fn view(&self) -> Result<ImageView<'_>> {
        ImageView::new(&self.data, self.width, self.height, 4, None)
    }

    /// Depth-3 copy with alpha dropped
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        let mut rgb = Vec::new();
        let len = self.width as usize * self.height as usize * 3;
        rgb.try_reserve_exact(len)
            .map_err(|_| RenderError::AllocationFailed { bytes: len })?;
        for px in self.data.chunks_exact(BYTES_PER_PIXEL) {
            rgb.extend_from_slice(&px[..3]);
        }
        RgbImage::new(rgb, self.width, self.height, 3)
    }

    /// Region touched since the last call, if any
    pub fn damage(&self) -> Option<Rect> {
        self.damage
    }

    pub fn take_damage(&mut self) -> Option<Rect> {
        self.damage.take()
    }
}

impl Default for Offscreen {
    /// A zero-size placeholder, left behind by a detached buffer
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Vec::new(),
            damage: None,
        }
    }
}

impl std::fmt::Debug for Offscreen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Offscreen")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("damage", &self.damage)
            .finish()
    }
}

/// Source-over for 8-bit straight alpha
#[inline]
pub(crate) fn blend_into(dst: &mut [u8], src: [u8; 4]) {
    let a = src[3] as u32;
    let inv = 255 - a;
    for c in 0..3 {
        dst[c] = ((src[c] as u32 * a + dst[c] as u32 * inv + 127) / 255) as u8;
    }
    dst[3] = (a + dst[3] as u32 * inv / 255) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_opaque_white() {
        let buf = Offscreen::new(3, 2).unwrap();
        assert_eq!(buf.pixels().len(), 24);
        assert_eq!(buf.pixel(2, 1), Color::WHITE);
        assert_eq!(buf.damage(), None);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(
            Offscreen::new(0, 10),
            Err(GfxError::Render(RenderError::InvalidDimensions { width: 0, height: 10 }))
        ));
    }

    #[test]
    fn test_huge_size_fails_cleanly() {
        assert!(matches!(
            Offscreen::new(u32::MAX, u32::MAX),
            Err(GfxError::Render(RenderError::AllocationFailed { .. }))
        ));
    }

    #[test]
    fn test_fill_span_clamps_and_tracks_damage() {
        let mut buf = Offscreen::new(10, 10).unwrap();
        buf.fill_span(3, -5, 4, Color::RED);
        assert_eq!(buf.pixel(0, 3), Color::RED);
        assert_eq!(buf.pixel(3, 3), Color::RED);
        assert_eq!(buf.pixel(4, 3), Color::WHITE);
        buf.fill_span(5, 8, 20, Color::BLUE);
        assert_eq!(buf.take_damage(), Some(Rect::new(0, 3, 10, 3)));
        assert_eq!(buf.take_damage(), None);
    }

    #[test]
    fn test_translucent_span_blends() {
        let mut buf = Offscreen::with_color(1, 1, Color::BLACK).unwrap();
        buf.fill_span(0, 0, 1, Color::rgba(255, 255, 255, 128));
        let px = buf.pixel(0, 0);
        assert_eq!(px.r, 128);
        assert_eq!(px.a, 255);
    }

    #[test]
    fn test_rgb_image_drops_alpha() {
        let buf = Offscreen::with_color(2, 2, Color::rgb(1, 2, 3)).unwrap();
        let img = buf.to_rgb_image().unwrap();
        assert_eq!(img.depth(), 3);
        assert_eq!(&img.pixels()[..3], &[1, 2, 3]);
    }

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(Offscreen::from_rgba(vec![0; 15], 2, 2).is_err());
        assert!(Offscreen::from_rgba(vec![0; 16], 2, 2).is_ok());
    }
}
