//! The render context: which surface is current, and how to get back
//!
//! Exactly one surface receives drawing at a time. [`RenderContext`] holds
//! that choice explicitly instead of in a global, together with a bounded
//! stack of earlier choices so drawing can be redirected and restored:
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use gfxdev_core::context::{RenderContext, SurfaceRef};
//! use gfxdev_core::record::RecordingDriver;
//! use gfxdev_core::Surface;
//!
//! let window: SurfaceRef = Rc::new(RefCell::new(Surface::new(Box::new(RecordingDriver::new()), 1.0)));
//! let offscreen: SurfaceRef = Rc::new(RefCell::new(Surface::new(Box::new(RecordingDriver::new()), 1.0)));
//!
//! let mut ctx = RenderContext::new();
//! ctx.set_current(&window)?;
//! ctx.push_current(&offscreen)?;
//! ctx.draw(|s| s.rectf(0, 0, 10, 10))?;
//! ctx.pop_current()?;
//! assert!(ctx.is_current(&window));
//! # Ok::<(), gfxdev_core::GfxError>(())
//! ```
//!
//! The context only keeps weak references. A surface dropped by its owner
//! while current simply stops being current; drawing then fails with
//! `NoCurrentSurface` until another surface is made current.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::config::{ContextConfig, OverflowPolicy};
use crate::error::{Result, SurfaceError};
use crate::surface::{Surface, SurfaceDevice};

/// Shared handle to any rendering target
pub type SurfaceRef = Rc<RefCell<dyn SurfaceDevice>>;

type WeakSurface = Weak<RefCell<dyn SurfaceDevice>>;

fn same_surface(a: &SurfaceRef, b: &SurfaceRef) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

/// Current-surface tracking with nested redirection
#[derive(Debug)]
pub struct RenderContext {
    config: ContextConfig,
    current: Option<WeakSurface>,
    stack: Vec<Option<WeakSurface>>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::with_config(ContextConfig::default())
    }

    pub fn with_config(config: ContextConfig) -> Self {
        let capacity = config.stack_capacity.max(1);
        Self {
            config: ContextConfig {
                stack_capacity: capacity,
                ..config
            },
            current: None,
            stack: Vec::with_capacity(capacity),
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Maximum number of saved surfaces
    pub fn capacity(&self) -> usize {
        self.config.stack_capacity
    }

    /// Number of saved surfaces
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The current surface, if it is still alive
    pub fn current(&self) -> Option<SurfaceRef> {
        self.current.as_ref()?.upgrade()
    }

    pub fn is_current(&self, surface: &SurfaceRef) -> bool {
        self.current()
            .is_some_and(|current| same_surface(&current, surface))
    }

    /// Make `surface` the drawing target
    ///
    /// The previous target gets `end_current`, then `surface` gets its
    /// `set_current_hook`. Making the current surface current again only
    /// re-runs the hook. Nothing changes if `surface` is borrowed.
    pub fn set_current(&mut self, surface: &SurfaceRef) -> Result<()> {
        if self.is_current(surface) {
            let mut device = surface.try_borrow_mut().map_err(|_| SurfaceError::Busy)?;
            device.set_current_hook();
            return Ok(());
        }

        let mut next = surface.try_borrow_mut().map_err(|_| {
            log::warn!("set_current: surface is busy drawing");
            SurfaceError::Busy
        })?;

        if let Some(previous) = self.current() {
            match previous.try_borrow_mut() {
                Ok(mut previous) => previous.end_current(),
                Err(_) => log::warn!("set_current: previous surface busy, end_current skipped"),
            };
        }

        self.current = Some(Rc::downgrade(surface));
        next.set_current_hook();
        log::debug!("Current surface: {:?}", next.surface());
        Ok(())
    }

    /// Save the current target and redirect drawing to `surface`
    ///
    /// A full stack refuses the push: the error is logged per the overflow
    /// policy and returned, and the current surface stays current.
    pub fn push_current(&mut self, surface: &SurfaceRef) -> Result<()> {
        let capacity = self.capacity();
        if self.stack.len() >= capacity {
            match self.config.overflow_policy {
                OverflowPolicy::Warn => {
                    log::warn!("push_current: surface stack full (capacity {capacity}), push ignored")
                },
                OverflowPolicy::Strict => {
                    log::error!("push_current: surface stack full (capacity {capacity}), push ignored")
                },
            }
            return Err(SurfaceError::StackOverflow { capacity }.into());
        }

        let saved = self.current.clone();
        self.set_current(surface)?;
        self.stack.push(saved);
        Ok(())
    }

    /// Restore the target that was current before the last push
    pub fn pop_current(&mut self) -> Result<()> {
        let Some(saved) = self.stack.pop() else {
            log::warn!("pop_current: surface stack is empty");
            return Err(SurfaceError::StackUnderflow.into());
        };

        match saved.and_then(|weak| weak.upgrade()) {
            Some(previous) => {
                if let Err(e) = self.set_current(&previous) {
                    // Keep the entry so a later pop can retry
                    self.stack.push(Some(Rc::downgrade(&previous)));
                    return Err(e);
                }
                Ok(())
            },
            None => {
                log::debug!("pop_current: previous surface is gone, nothing is current");
                self.end_current();
                Ok(())
            },
        }
    }

    /// Stop drawing anywhere
    pub fn end_current(&mut self) {
        if let Some(current) = self.current() {
            match current.try_borrow_mut() {
                Ok(mut device) => device.end_current(),
                Err(_) => log::warn!("end_current: surface busy, hook skipped"),
            };
        }
        self.current = None;
    }

    /// Run `f` against the current surface
    pub fn draw<R>(&self, f: impl FnOnce(&mut Surface) -> R) -> Result<R> {
        let Some(current) = self.current() else {
            log::warn!("draw: no current surface");
            return Err(SurfaceError::NoCurrentSurface.into());
        };
        let mut device = current.try_borrow_mut().map_err(|_| {
            log::warn!("draw: current surface is already drawing");
            SurfaceError::Busy
        })?;
        Ok(f(device.surface_mut()))
    }

    /// Push `surface`, run `f` on it, pop again
    pub fn draw_into<R>(
        &mut self,
        surface: &SurfaceRef,
        f: impl FnOnce(&mut Surface) -> R,
    ) -> Result<R> {
        self.push_current(surface)?;
        let result = self.draw(f);
        self.pop_current()?;
        result
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}
