//! Window surfaces: a back buffer plus whatever puts it on screen
//!
//! The window system itself is out of reach here. A [`Presenter`] stands in
//! for it: it is re-bound every time the window becomes current and gets
//! the damaged part of the back buffer when another surface takes over.

use std::any::Any;

use gfxdev_core::{Features, Rect, Result, Surface, SurfaceDevice};

use crate::buffer::Offscreen;
use crate::driver::RasterDriver;

/// Puts a back buffer on screen
pub trait Presenter {
    /// Re-acquire the native drawing context before a paint
    fn bind(&mut self) {}

    /// Show the `damage` rectangle of `buffer`
    fn present(&mut self, buffer: &Offscreen, damage: Rect);
}

/// A native on-screen surface
#[derive(Debug)]
pub struct WindowSurface<P: Presenter + 'static> {
    surface: Surface,
    presenter: P,
    frames: u64,
}

impl<P: Presenter + 'static> WindowSurface<P> {
    /// Window of `width × height` logical units at `scale`
    pub fn new(presenter: P, width: u32, height: u32, scale: f64) -> Result<Self> {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        let device_w = (width as f64 * scale).ceil() as u32;
        let device_h = (height as f64 * scale).ceil() as u32;
        let driver = RasterDriver::new(device_w, device_h)?.with_features(Features::NATIVE);
        Ok(Self {
            surface: Surface::new(Box::new(driver), scale),
            presenter,
            frames: 0,
        })
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Number of times damage was presented
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Present pending damage now
    pub fn present(&mut self) {
        let Self {
            surface,
            presenter,
            frames,
        } = self;
        surface.flush();
        if let Some(driver) = surface.driver_as_mut::<RasterDriver>() {
            if let Some(damage) = driver.buffer_mut().take_damage() {
                presenter.present(driver.buffer(), damage);
                *frames += 1;
                log::trace!("Presented frame {frames} ({damage:?})");
            }
        }
    }
}

impl<P: Presenter + 'static> SurfaceDevice for WindowSurface<P> {
    fn surface(&self) -> &Surface {
        &self.surface
    }

    fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    fn set_current_hook(&mut self) {
        self.presenter.bind();
        self.surface.activate();
    }

    fn end_current(&mut self) {
        self.present();
        self.surface.deactivate();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Presenter that keeps a copy of every presented frame in memory
///
/// Useful headless: tests and the command line tool read the last frame
/// back instead of looking at a screen.
#[derive(Debug, Default)]
pub struct FrameCapture {
    binds: u32,
    damage: Vec<Rect>,
    last: Option<Offscreen>,
}

impl FrameCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binds(&self) -> u32 {
        self.binds
    }

    /// Damage rectangles in presentation order
    pub fn damage(&self) -> &[Rect] {
        &self.damage
    }

    pub fn last_frame(&self) -> Option<&Offscreen> {
        self.last.as_ref()
    }
}

impl Presenter for FrameCapture {
    fn bind(&mut self) {
        self.binds += 1;
    }

    fn present(&mut self, buffer: &Offscreen, damage: Rect) {
        self.damage.push(damage);
        match buffer.try_clone() {
            Ok(frame) => self.last = Some(frame),
            Err(e) => log::warn!("Frame capture skipped: {e}"),
        }
    }
}
