//! Display collaborator.
//!
//! A window exposes the display surface `present` blits onto, a vertical
//! blank wait and an exclusive layer lock held for the duration of the blit.

mod headless;

use std::sync::MutexGuard;

use crate::engine::SurfaceId;

pub use headless::HeadlessWindow;

/// Where the window's visible pixels live on the display surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DisplayRegion {
    pub surface: SurfaceId,
    /// Border origin; the inner area starts here.
    pub x: i32,
    pub y: i32,
    /// Inner area size.
    pub width: u32,
    pub height: u32,
}

/// Exclusive hold on a window layer. Released on drop.
#[derive(Debug)]
pub struct LayerGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl<'a> LayerGuard<'a> {
    pub fn new(guard: MutexGuard<'a, ()>) -> Self {
        Self { _guard: guard }
    }
}

pub trait Window {
    /// Client size in pixels; render targets are allocated at this size.
    fn size(&self) -> (u32, u32);

    /// Display surface region, or `None` while the window is not mapped.
    fn display(&self) -> Option<DisplayRegion>;

    /// Blocks until the next vertical blank.
    fn wait_vblank(&mut self);

    fn lock_layer(&self) -> LayerGuard<'_>;
}
