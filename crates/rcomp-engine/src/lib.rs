//! rcomp engine crate.
//!
//! Turns queued 2D render commands into a small number of calls on a
//! compositing engine, tracking clip/viewport state and texture modulation
//! on the way.

pub mod config;
pub mod coords;
pub mod engine;
pub mod error;
pub mod logging;
pub mod render;
pub mod scene;
pub mod time;
pub mod window;

pub use config::RendererConfig;
pub use error::{RenderError, Result};
pub use render::Renderer;
