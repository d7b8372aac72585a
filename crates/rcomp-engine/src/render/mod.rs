//! Batched 2D rendering over a compositing engine.
//!
//! Pipeline per frame:
//! - `Renderer::run_command_queue` activates the target (lazy allocation)
//! - the processor walks the queue, tracking clip/viewport state
//! - copies are coalesced into batches and composited with shared quad indices
//! - `Renderer::present` blits the window target onto the display surface

mod batch;
mod blend;
mod clip;
mod modulation;
mod pixels;
mod processor;
mod renderer;
mod texture;
mod vertex;

pub use batch::{Batch, coalesce};
pub use blend::{BlendMode, CompositeParams, ScaleMode};
pub use clip::{ClipState, ClipTracker};
pub use modulation::{Modulation, modulate_pixel};
pub use pixels::PixelBuffer;
pub use processor::FrameStats;
pub use renderer::{Renderer, TextureLock};
pub use texture::{ModulationStats, PixelFormat, TextureId};
pub(crate) use texture::NO_TINT;
pub use vertex::{FlipMode, QuadTransform, build_quad, quad_indices};
