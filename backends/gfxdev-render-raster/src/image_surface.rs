//! Image surfaces: drawing into memory and reading it back
//!
//! An [`ImageSurface`] is a [`Surface`] over a [`RasterDriver`]. Push it
//! current, draw, pop it, then take a snapshot with
//! [`ImageSurface::image`] or hand the pixels over for good with
//! [`ImageSurface::into_offscreen`]. Snapshots own their pixels, so drawing
//! afterwards never changes an image that was already taken.
//!
//! ## HiDPI
//!
//! A `high_res` surface allocates `ceil(w × scale)` by `ceil(h × scale)`
//! device pixels while widget code keeps using logical coordinates.
//! [`ImageSurface::image`] box-filters back to the logical size;
//! [`ImageSurface::highres_image`] keeps every pixel and tags the image
//! with the logical size it should be drawn at.
//!
//! ## Masks
//!
//! [`ImageSurface::mask`] freezes the current contents as a background.
//! Later drawing lands on top, and the next snapshot blends the two per
//! pixel: white mask areas show the new drawing, black areas the
//! background.

use std::any::Any;

use gfxdev_core::{
    GfxError, Rect, RenderError, Result, RgbImage, Surface, SurfaceDevice,
};

use crate::buffer::{Offscreen, BYTES_PER_PIXEL};
use crate::driver::RasterDriver;

/// A surface that renders into an in-memory pixel buffer
#[derive(Debug)]
pub struct ImageSurface {
    surface: Surface,
    logical: (u32, u32),
    high_res: bool,
    background: Option<Offscreen>,
    mask: Option<RgbImage>,
}

fn lost_driver() -> GfxError {
    RenderError::Backend("image surface has no raster driver".into()).into()
}

impl ImageSurface {
    /// Allocate a `width × height` surface
    ///
    /// With `high_res` the buffer is `display_scale` times denser than the
    /// logical size; otherwise `display_scale` is ignored.
    pub fn new(width: u32, height: u32, high_res: bool, display_scale: f64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height }.into());
        }
        let scale = if high_res && display_scale.is_finite() && display_scale > 0.0 {
            display_scale
        } else {
            1.0
        };
        let device_w = (width as f64 * scale).ceil();
        let device_h = (height as f64 * scale).ceil();
        if device_w > u32::MAX as f64 || device_h > u32::MAX as f64 {
            return Err(RenderError::InvalidDimensions { width, height }.into());
        }
        let driver = RasterDriver::new(device_w as u32, device_h as u32)?;
        log::debug!(
            "Image surface {width}x{height} at scale {scale} ({}x{} device pixels)",
            device_w,
            device_h
        );
        Ok(Self {
            surface: Surface::new(Box::new(driver), scale),
            logical: (width, height),
            high_res: scale != 1.0,
            background: None,
            mask: None,
        })
    }

    /// Draw into an existing buffer; get it back with `into_offscreen`
    pub fn from_offscreen(buffer: Offscreen) -> Self {
        let logical = (buffer.width(), buffer.height());
        Self {
            surface: Surface::new(Box::new(RasterDriver::with_buffer(buffer)), 1.0),
            logical,
            high_res: false,
            background: None,
            mask: None,
        }
    }

    /// Logical width
    pub fn width(&self) -> u32 {
        self.logical.0
    }

    /// Logical height
    pub fn height(&self) -> u32 {
        self.logical.1
    }

    pub fn is_high_res(&self) -> bool {
        self.high_res
    }

    pub fn scale_factor(&self) -> f64 {
        self.surface.scale_factor()
    }

    fn raster(&self) -> Result<&RasterDriver> {
        self.surface.driver_as::<RasterDriver>().ok_or_else(lost_driver)
    }

    fn raster_mut(&mut self) -> Result<&mut RasterDriver> {
        self.surface
            .driver_as_mut::<RasterDriver>()
            .ok_or_else(lost_driver)
    }

    /// The device-resolution buffer, with no pending mask applied
    pub fn offscreen(&self) -> Result<&Offscreen> {
        Ok(self.raster()?.buffer())
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.surface.translate(dx, dy);
    }

    pub fn untranslate(&mut self) -> Result<()> {
        self.surface.untranslate()
    }

    pub fn origin(&self) -> (i32, i32) {
        self.surface.origin()
    }

    /// Snapshot at logical size, RGB
    pub fn image(&mut self) -> Result<RgbImage> {
        self.resolve_mask()?;
        let (w, h) = self.logical;
        let buffer = self.raster()?.buffer();
        if (buffer.width(), buffer.height()) == (w, h) {
            return buffer.to_rgb_image();
        }
        RgbImage::new(box_filter(buffer, w, h), w, h, 3)
    }

    /// Snapshot at device resolution, tagged with the logical size
    pub fn highres_image(&mut self) -> Result<RgbImage> {
        self.resolve_mask()?;
        let (w, h) = self.logical;
        Ok(self.raster()?.buffer().to_rgb_image()?.with_display_size(w, h))
    }

    /// Start shaping: current contents become the background
    ///
    /// A pending mask is applied first.
    pub fn mask(&mut self, mask: &RgbImage) -> Result<()> {
        if mask.width() == 0 || mask.height() == 0 {
            return Ok(());
        }
        self.resolve_mask()?;
        self.background = Some(self.raster()?.buffer().try_clone()?);
        self.mask = Some(mask.clone());
        Ok(())
    }

    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    /// Blend the primary buffer over the background through the mask
    fn resolve_mask(&mut self) -> Result<()> {
        let (Some(background), Some(mask)) = (self.background.take(), self.mask.take()) else {
            return Ok(());
        };
        let buffer = self.raster_mut()?.buffer_mut();
        let (bw, bh) = (buffer.width() as u64, buffer.height() as u64);
        let (mw, mh) = (mask.width() as u64, mask.height() as u64);
        let pixels = buffer.pixels_mut();
        let back = background.pixels();

        for y in 0..bh {
            let my = (y * mh / bh) as u32;
            for x in 0..bw {
                let mx = (x * mw / bw) as u32;
                let m = mask.view().rgba(mx, my);
                let a = (77 * m[0] as u32 + 150 * m[1] as u32 + 29 * m[2] as u32) >> 8;
                let i = ((y * bw + x) as usize) * BYTES_PER_PIXEL;
                for c in 0..3 {
                    let fg = pixels[i + c] as u32;
                    let bg = back[i + c] as u32;
                    pixels[i + c] = ((fg * a + bg * (255 - a) + 127) / 255) as u8;
                }
                pixels[i + 3] = 255;
            }
        }
        log::debug!("Applied {mw}x{mh} mask to {bw}x{bh} image surface");
        Ok(())
    }

    /// Draw the current contents onto another surface at `(x, y)`
    ///
    /// The image keeps its logical size, whatever the target's scale.
    pub fn draw_onto(&mut self, target: &mut Surface, x: i32, y: i32) -> Result<()> {
        let image = self.highres_image()?;
        target.draw_rgb(&image, x, y);
        // One-shot snapshot: nothing will draw it again
        target.uncache(&image);
        Ok(())
    }

    /// Detach the buffer and discard the surface
    pub fn into_offscreen(mut self) -> Result<Offscreen> {
        self.resolve_mask()?;
        Ok(self.raster_mut()?.take_buffer())
    }
}

impl SurfaceDevice for ImageSurface {
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

/// Average device pixels down to `w × h`, RGB
fn box_filter(buffer: &Offscreen, w: u32, h: u32) -> Vec<u8> {
    let (bw, bh) = (buffer.width() as u64, buffer.height() as u64);
    let src = buffer.pixels();
    let mut out = Vec::with_capacity(w as usize * h as usize * 3);
    for ly in 0..h as u64 {
        let y0 = ly * bh / h as u64;
        let y1 = ((ly + 1) * bh / h as u64).max(y0 + 1).min(bh);
        for lx in 0..w as u64 {
            let x0 = lx * bw / w as u64;
            let x1 = ((lx + 1) * bw / w as u64).max(x0 + 1).min(bw);
            let mut sum = [0u64; 3];
            for y in y0..y1 {
                for x in x0..x1 {
                    let i = ((y * bw + x) as usize) * BYTES_PER_PIXEL;
                    for c in 0..3 {
                        sum[c] += src[i + c] as u64;
                    }
                }
            }
            let n = (y1 - y0) * (x1 - x0);
            for c in sum {
                out.push(((c + n / 2) / n) as u8);
            }
        }
    }
    out
}

/// Draw a region of an offscreen buffer onto `target` at `(x, y)`
///
/// `w × h` pixels are read from `(src_x, src_y)`, clamped to the buffer.
#[allow(clippy::too_many_arguments)]
pub fn copy_offscreen(
    target: &mut Surface,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    src: &Offscreen,
    src_x: i32,
    src_y: i32,
) -> Result<()> {
    if w <= 0 || h <= 0 {
        return Ok(());
    }
    let view = src.view()?.crop(Rect::new(src_x, src_y, w, h));
    if view.is_empty() {
        return Ok(());
    }
    target.draw_image(&view, x, y, view.width() as i32, view.height() as i32);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gfxdev_core::Color;

    #[test]
    fn test_zero_size_is_an_error() {
        assert!(matches!(
            ImageSurface::new(0, 5, false, 1.0),
            Err(GfxError::Render(RenderError::InvalidDimensions { .. }))
        ));
    }

    #[test]
    fn test_high_res_allocates_device_pixels() {
        let s = ImageSurface::new(10, 7, true, 1.5).unwrap();
        let buf = s.offscreen().unwrap();
        assert_eq!((buf.width(), buf.height()), (15, 11));
        assert_eq!((s.width(), s.height()), (10, 7));
        assert!(s.is_high_res());
    }

    #[test]
    fn test_scale_ignored_without_high_res() {
        let s = ImageSurface::new(10, 7, false, 2.0).unwrap();
        assert_eq!(s.offscreen().unwrap().width(), 10);
        assert_eq!(s.scale_factor(), 1.0);
    }

    #[test]
    fn test_high_res_image_downsamples() {
        let mut s = ImageSurface::new(4, 4, true, 2.0).unwrap();
        s.surface_mut().set_color(Color::BLUE);
        s.surface_mut().rectf(0, 0, 2, 4);
        let img = s.image().unwrap();
        assert_eq!((img.width(), img.height()), (4, 4));
        assert_eq!(img.pixel(1, 1), Color::BLUE);
        assert_eq!(img.pixel(2, 1), Color::WHITE);

        let hi = s.highres_image().unwrap();
        assert_eq!((hi.width(), hi.height()), (8, 8));
        assert_eq!((hi.display_width(), hi.display_height()), (4, 4));
    }

    #[test]
    fn test_mask_blends_foreground_over_background() {
        let mut s = ImageSurface::new(2, 1, false, 1.0).unwrap();
        s.surface_mut().set_color(Color::BLACK);
        s.surface_mut().rectf(0, 0, 2, 1);
        // Left half of the mask white, right half black
        let mask = RgbImage::new(vec![255, 255, 255, 0, 0, 0], 2, 1, 3).unwrap();
        s.mask(&mask).unwrap();
        s.surface_mut().set_color(Color::RED);
        s.surface_mut().rectf(0, 0, 2, 1);

        let img = s.image().unwrap();
        assert_eq!(img.pixel(0, 0), Color::RED);
        assert_eq!(img.pixel(1, 0), Color::BLACK);
        assert!(!s.has_mask());
    }

    #[test]
    fn test_mid_gray_mask_is_half_blend() {
        let mut s = ImageSurface::new(1, 1, false, 1.0).unwrap();
        s.surface_mut().set_color(Color::BLACK);
        s.surface_mut().rectf(0, 0, 1, 1);
        let mask = RgbImage::new(vec![128, 128, 128], 1, 1, 3).unwrap();
        s.mask(&mask).unwrap();
        s.surface_mut().set_color(Color::WHITE);
        s.surface_mut().rectf(0, 0, 1, 1);
        let px = s.image().unwrap().pixel(0, 0);
        // a = (256 × 128) >> 8 = 128
        assert_eq!(px.r, ((255 * 128 + 127) / 255) as u8);
    }

    #[test]
    fn test_from_offscreen_round_trip() {
        let buffer = Offscreen::with_color(3, 3, Color::GREEN).unwrap();
        let mut s = ImageSurface::from_offscreen(buffer);
        s.surface_mut().set_color(Color::RED);
        s.surface_mut().point(1, 1);
        let buffer = s.into_offscreen().unwrap();
        assert_eq!(buffer.pixel(0, 0), Color::GREEN);
        assert_eq!(buffer.pixel(1, 1), Color::RED);
    }

    #[test]
    fn test_copy_offscreen_crops_source() {
        let mut src = Offscreen::with_color(4, 4, Color::WHITE).unwrap();
        src.fill_span(1, 1, 2, Color::RED);
        let mut target = ImageSurface::new(8, 8, false, 1.0).unwrap();
        copy_offscreen(target.surface_mut(), 5, 5, 2, 2, &src, 1, 1).unwrap();
        let buf = target.offscreen().unwrap();
        assert_eq!(buf.pixel(5, 5), Color::RED);
        assert_eq!(buf.pixel(6, 6), Color::WHITE);
        assert_eq!(buf.pixel(4, 4), Color::WHITE);
    }
}
