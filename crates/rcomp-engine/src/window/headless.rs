use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::engine::{CompositingEngine, SurfaceId};
use crate::time::VblankPacer;

use super::{DisplayRegion, LayerGuard, Window};

/// Off-screen window backed by an engine surface.
///
/// The display surface is the window's inner area plus a border on every
/// side, so presenting exercises the border offset.
#[derive(Debug)]
pub struct HeadlessWindow {
    width: u32,
    height: u32,
    border: u32,
    display: Option<SurfaceId>,
    layer: Arc<Mutex<()>>,
    pacer: VblankPacer,
}

impl HeadlessWindow {
    /// Allocates the display surface; `None` when the engine is out of memory.
    pub fn new<E: CompositingEngine>(engine: &mut E, width: u32, height: u32) -> Option<Self> {
        Self::with_border(engine, width, height, 0)
    }

    pub fn with_border<E: CompositingEngine>(
        engine: &mut E,
        width: u32,
        height: u32,
        border: u32,
    ) -> Option<Self> {
        let display = engine.allocate_surface(width + 2 * border, height + 2 * border, 32)?;
        log::debug!("headless window {width}x{height} (border {border}) on {display:?}");
        Some(Self {
            width,
            height,
            border,
            display: Some(display),
            layer: Arc::new(Mutex::new(())),
            pacer: VblankPacer::new(0),
        })
    }

    /// Resizes the window, reallocating the display surface.
    ///
    /// The renderer must be told separately (`Renderer::window_resized`).
    pub fn resize<E: CompositingEngine>(&mut self, engine: &mut E, width: u32, height: u32) {
        if let Some(old) = self.display.take() {
            engine.free_surface(old);
        }
        self.width = width;
        self.height = height;
        self.display =
            engine.allocate_surface(width + 2 * self.border, height + 2 * self.border, 32);
        if self.display.is_none() {
            log::warn!("headless window: display surface allocation failed at {width}x{height}");
        }
    }

    /// Paces `wait_vblank` at `hz`; zero disables waiting.
    pub fn set_refresh_rate(&mut self, hz: u32) {
        self.pacer = VblankPacer::new(hz);
    }

    pub fn set_vblank_interval(&mut self, interval: Duration) {
        self.pacer = VblankPacer::with_interval(interval);
    }

    /// Number of vertical blanks waited for so far.
    pub fn vblanks(&self) -> u64 {
        self.pacer.frame_index()
    }

    pub fn border(&self) -> u32 {
        self.border
    }

    pub fn display_surface(&self) -> Option<SurfaceId> {
        self.display
    }

    /// Shared handle to the layer lock, for code that serializes against present.
    pub fn layer_handle(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.layer)
    }

    pub fn free<E: CompositingEngine>(mut self, engine: &mut E) {
        if let Some(display) = self.display.take() {
            engine.free_surface(display);
        }
    }
}

impl Window for HeadlessWindow {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn display(&self) -> Option<DisplayRegion> {
        self.display.map(|surface| DisplayRegion {
            surface,
            x: self.border as i32,
            y: self.border as i32,
            width: self.width,
            height: self.height,
        })
    }

    fn wait_vblank(&mut self) {
        self.pacer.wait();
    }

    fn lock_layer(&self) -> LayerGuard<'_> {
        // A panic while presenting leaves no layer state to repair.
        LayerGuard::new(self.layer.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SoftwareEngine;

    #[test]
    fn display_region_sits_inside_border() {
        let mut e = SoftwareEngine::new();
        let w = HeadlessWindow::with_border(&mut e, 10, 8, 2).unwrap();
        let region = w.display().unwrap();
        assert_eq!((region.x, region.y), (2, 2));
        assert_eq!(e.surface_size(region.surface), Some((14, 12)));
    }

    #[test]
    fn layer_lock_is_exclusive() {
        let mut e = SoftwareEngine::new();
        let w = HeadlessWindow::new(&mut e, 4, 4).unwrap();
        let handle = w.layer_handle();
        let guard = w.lock_layer();
        assert!(handle.try_lock().is_err());
        drop(guard);
        assert!(handle.try_lock().is_ok());
    }

    #[test]
    fn resize_reallocates_display() {
        let mut e = SoftwareEngine::new();
        let mut w = HeadlessWindow::new(&mut e, 4, 4).unwrap();
        let before = w.display_surface().unwrap();
        w.resize(&mut e, 6, 3);
        assert_eq!(w.size(), (6, 3));
        assert!(e.surface_size(before).is_none());
        assert_eq!(e.surface_size(w.display_surface().unwrap()), Some((6, 3)));
    }
}
