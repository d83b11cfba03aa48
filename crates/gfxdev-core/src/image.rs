//! Pixel images handed to drivers, and the driver-side image cache
//!
//! Decoders live outside the core; they produce an [`RgbImage`] from raw
//! pixels. Drivers may convert an image once into a native representation
//! and keep it in an [`ImageCache`]. Every image carries an id and a
//! generation counter. Touching the pixels bumps the generation, which
//! invalidates any cached copy explicitly: a cache hit is only ever served
//! for the exact pixels that were cached.

use std::cell::OnceCell;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;

use crate::color::Color;
use crate::error::{RenderError, Result};
use crate::geometry::Rect;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique image identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(u64);

impl ImageId {
    fn next() -> Self {
        ImageId(NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Bytes needed for `height` rows of `width` pixels at `depth` with `stride`
fn required_len(width: u32, height: u32, depth: u8, stride: usize) -> usize {
    if width == 0 || height == 0 {
        return 0;
    }
    stride * (height as usize - 1) + width as usize * depth as usize
}

fn check_depth(depth: u8) -> Result<()> {
    if (1..=4).contains(&depth) {
        Ok(())
    } else {
        Err(RenderError::UnsupportedDepth(depth).into())
    }
}

/// Borrowed pixel rows
///
/// `depth` is bytes per pixel: 1 gray, 2 gray + alpha, 3 RGB, 4 RGBA.
/// `stride` is bytes from one row to the next and may exceed
/// `width × depth`.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    depth: u8,
    stride: usize,
}

impl<'a> ImageView<'a> {
    /// View over `data`; `stride` defaults to `width × depth`
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        depth: u8,
        stride: Option<usize>,
    ) -> Result<Self> {
        check_depth(depth)?;
        let stride = stride.unwrap_or(width as usize * depth as usize);
        if stride < width as usize * depth as usize {
            return Err(RenderError::BufferTooSmall {
                expected: width as usize * depth as usize,
                actual: stride,
            }
            .into());
        }
        let expected = required_len(width, height, depth, stride);
        if data.len() < expected {
            return Err(RenderError::BufferTooSmall {
                expected,
                actual: data.len(),
            }
            .into());
        }
        Ok(Self {
            data,
            width,
            height,
            depth,
            stride,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Raw bytes of row `y`, exactly `width × depth` long
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * self.depth as usize]
    }

    /// Pixel at (x, y) expanded to RGBA
    pub fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        let i = y as usize * self.stride + x as usize * self.depth as usize;
        let p = &self.data[i..i + self.depth as usize];
        match self.depth {
            1 => [p[0], p[0], p[0], 255],
            2 => [p[0], p[0], p[0], p[1]],
            3 => [p[0], p[1], p[2], 255],
            _ => [p[0], p[1], p[2], p[3]],
        }
    }

    /// Sub-rectangle sharing the same rows; clamped to the image
    pub fn crop(&self, src: Rect) -> ImageView<'a> {
        let bounds = Rect::new(0, 0, self.width as i32, self.height as i32);
        let r = bounds.intersect(&src);
        if r.is_empty() {
            return ImageView {
                data: &[],
                width: 0,
                height: 0,
                depth: self.depth,
                stride: self.stride,
            };
        }
        let start = r.y as usize * self.stride + r.x as usize * self.depth as usize;
        ImageView {
            data: &self.data[start..],
            width: r.w as u32,
            height: r.h as u32,
            depth: self.depth,
            stride: self.stride,
        }
    }

    /// Tightly packed RGBA copy
    pub fn to_rgba_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                out.extend_from_slice(&self.rgba(x, y));
            }
        }
        out
    }

    pub fn has_alpha(&self) -> bool {
        self.depth == 2 || self.depth == 4
    }
}

/// An owned, decoded image
///
/// `display_size` is the logical size the image should occupy when drawn;
/// it differs from the pixel size for HiDPI snapshots.
#[derive(Debug)]
pub struct RgbImage {
    id: ImageId,
    generation: u64,
    data: Vec<u8>,
    width: u32,
    height: u32,
    depth: u8,
    stride: usize,
    display_size: (u32, u32),
}

impl RgbImage {
    /// Take ownership of tightly packed pixels
    pub fn new(data: Vec<u8>, width: u32, height: u32, depth: u8) -> Result<Self> {
        Self::with_stride(data, width, height, depth, width as usize * depth as usize)
    }

    /// Take ownership of pixels with padded rows
    pub fn with_stride(
        data: Vec<u8>,
        width: u32,
        height: u32,
        depth: u8,
        stride: usize,
    ) -> Result<Self> {
        // Validates depth, stride and length
        ImageView::new(&data, width, height, depth, Some(stride))?;
        Ok(Self {
            id: ImageId::next(),
            generation: 0,
            data,
            width,
            height,
            depth,
            stride,
            display_size: (width, height),
        })
    }

    /// Tag the logical size this image is drawn at
    pub fn with_display_size(mut self, width: u32, height: u32) -> Self {
        self.display_size = (width, height);
        self
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    /// Bumped whenever the pixels may have changed
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn display_width(&self) -> u32 {
        self.display_size.0
    }

    pub fn display_height(&self) -> u32 {
        self.display_size.1
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Mutable pixels; invalidates every cached copy of this image
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        self.generation += 1;
        &mut self.data
    }

    pub fn view(&self) -> ImageView<'_> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            depth: self.depth,
            stride: self.stride,
        }
    }

    /// Pixel at (x, y) as a color
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        let [r, g, b, a] = self.view().rgba(x, y);
        Color::rgba(r, g, b, a)
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.data
    }
}

impl Clone for RgbImage {
    /// A clone is a new image: it gets its own id so caches never confuse
    /// the two once either one is modified.
    fn clone(&self) -> Self {
        Self {
            id: ImageId::next(),
            generation: 0,
            data: self.data.clone(),
            width: self.width,
            height: self.height,
            depth: self.depth,
            stride: self.stride,
            display_size: self.display_size,
        }
    }
}

/// A 1-bit mask; set bits paint in the current color
///
/// Rows are padded to whole bytes, least significant bit first (XBM order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Bitmap {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = Self::row_bytes(width) * height as usize;
        if data.len() < expected {
            return Err(RenderError::BufferTooSmall {
                expected,
                actual: data.len(),
            }
            .into());
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    fn row_bytes(width: u32) -> usize {
        (width as usize + 7) / 8
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        let byte = self.data[y as usize * Self::row_bytes(self.width) + x as usize / 8];
        byte & (1 << (x % 8)) != 0
    }

    /// RGBA rendition: `color` where set, transparent elsewhere
    pub fn to_rgba(&self, color: Color) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.is_set(x, y) {
                    out.extend_from_slice(&[color.r, color.g, color.b, color.a]);
                } else {
                    out.extend_from_slice(&[0, 0, 0, 0]);
                }
            }
        }
        out
    }
}

/// An indexed-color image
///
/// Converted to RGBA once, on first draw; the conversion is then cached by
/// drivers like any other [`RgbImage`].
#[derive(Debug)]
pub struct Pixmap {
    width: u32,
    height: u32,
    palette: Vec<Color>,
    indices: Vec<u8>,
    transparent: Option<u8>,
    rgb: OnceCell<RgbImage>,
}

impl Pixmap {
    pub fn new(
        width: u32,
        height: u32,
        palette: Vec<Color>,
        indices: Vec<u8>,
        transparent: Option<u8>,
    ) -> Result<Self> {
        let expected = width as usize * height as usize;
        if indices.len() < expected {
            return Err(RenderError::BufferTooSmall {
                expected,
                actual: indices.len(),
            }
            .into());
        }
        Ok(Self {
            width,
            height,
            palette,
            indices,
            transparent,
            rgb: OnceCell::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Replace one palette entry; drops the converted image
    pub fn set_color(&mut self, index: u8, color: Color) {
        if let Some(slot) = self.palette.get_mut(index as usize) {
            *slot = color;
            self.rgb = OnceCell::new();
        }
    }

    /// RGBA rendition, built on first use
    pub fn rgb(&self) -> &RgbImage {
        self.rgb.get_or_init(|| {
            let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 4);
            for &i in &self.indices[..self.width as usize * self.height as usize] {
                if Some(i) == self.transparent {
                    data.extend_from_slice(&[0, 0, 0, 0]);
                } else {
                    let c = self.palette.get(i as usize).copied().unwrap_or(Color::BLACK);
                    data.extend_from_slice(&[c.r, c.g, c.b, c.a]);
                }
            }
            RgbImage {
                id: ImageId::next(),
                generation: 0,
                data,
                width: self.width,
                height: self.height,
                depth: 4,
                stride: self.width as usize * 4,
                display_size: (self.width, self.height),
            }
        })
    }
}

/// Default number of cached images per driver
pub const DEFAULT_IMAGE_CACHE_CAPACITY: usize = 64;

/// Driver-side cache of native image representations
///
/// Keyed by [`ImageId`] and guarded by the generation, so a modified image
/// is re-converted rather than served stale. Least recently used entries
/// are evicted past capacity.
#[derive(Debug)]
pub struct ImageCache<T> {
    entries: LruCache<ImageId, (u64, T)>,
}

impl<T> ImageCache<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_IMAGE_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Cached representation of `image`, converting it on a miss
    pub fn get_or_insert_with<F>(&mut self, image: &RgbImage, convert: F) -> &T
    where
        F: FnOnce(&RgbImage) -> T,
    {
        let fresh = matches!(
            self.entries.peek(&image.id()),
            Some((generation, _)) if *generation == image.generation()
        );
        if !fresh && self.entries.pop(&image.id()).is_some() {
            log::debug!(
                "Image {} changed (generation {}), re-caching",
                image.id().get(),
                image.generation()
            );
        }
        &self
            .entries
            .get_or_insert(image.id(), || (image.generation(), convert(image)))
            .1
    }

    /// Whether a fresh entry exists for `image`
    pub fn contains(&self, image: &RgbImage) -> bool {
        matches!(
            self.entries.peek(&image.id()),
            Some((generation, _)) if *generation == image.generation()
        )
    }

    /// Drop the entry for `id`; true if one existed
    pub fn remove(&mut self, id: ImageId) -> bool {
        self.entries.pop(&id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for ImageCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
