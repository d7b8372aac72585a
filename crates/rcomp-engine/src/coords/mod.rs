//! Coordinate, rectangle and color types shared by the command queue,
//! the processor and the compositing engine.
//!
//! Canonical space:
//! - target pixels
//! - origin top-left
//! - +X right, +Y down
//!
//! Float types (`FPoint`, `FRect`) carry caller input; integer types
//! (`Point`, `Rect`) carry clip, viewport and rasterized primitives.

mod color;
mod point;
mod rect;

pub use color::{ColorF, Rgba8};
pub use point::{FPoint, Point};
pub use rect::{FRect, Rect};
