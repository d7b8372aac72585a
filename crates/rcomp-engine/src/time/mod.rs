//! Time subsystem.
//!
//! Vertical-blank pacing for windows that present with vsync enabled.

mod vblank;

pub use vblank::VblankPacer;
