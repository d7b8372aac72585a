//! Render command queue types.
//!
//! Responsibilities:
//! - store commands in submission order (contiguous `Vec`, cursor iteration)
//! - own the per-frame vertex arena the commands reference by range
//! - build quad vertices at queue time so the processor only batches and dispatches

mod cmd;
mod list;

pub use cmd::{CommandKind, DrawParams, RenderCommand, VertexRange};
pub use list::{CommandList, GeometryInput, Indices, VertexArena};
