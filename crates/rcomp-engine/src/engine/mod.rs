//! Compositing engine contract.
//!
//! The renderer never touches pixels of GPU-resident surfaces directly. It
//! asks an engine to allocate surfaces, composite textured triangles,
//! fill rectangles, blit and lock. Two implementations live here:
//! - `SoftwareEngine`: CPU rasterizer over ARGB8888 buffers
//! - `RecordingEngine`: wraps another engine and records every call

mod raster;
mod recording;
mod software;

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::coords::Rect;

pub use recording::{EngineCall, RecordingEngine};
pub use software::SoftwareEngine;

/// Hard per-call quad limit of the engine.
///
/// Indexed composite requests above `2 * MAX_QUADS` triangles are rejected;
/// some drivers stage vertex data on the stack and lock up past this.
pub const MAX_QUADS: usize = 1000;

/// Opaque surface handle issued by an engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u32);

impl SurfaceId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Vertex layout consumed by `composite`: position plus texel-space (s, t)
/// and a homogeneous `w` that is always 1.0.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub s: f32,
    pub t: f32,
    pub w: f32,
}

impl Vertex {
    #[inline]
    pub const fn new(x: f32, y: f32, s: f32, t: f32) -> Self {
        Self { x, y, s, t, w: 1.0 }
    }
}

/// Porter-Duff style operator applied per pixel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CompositeOp {
    /// Destination is replaced by the source.
    Src,
    /// Source alpha-blended over the destination.
    SrcOverDest,
    /// Additive, saturating.
    Plus,
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct CompositeFlags: u32 {
        /// Fail instead of falling back to a CPU path.
        const HARDWARE_ONLY      = 1 << 0;
        /// Treat destination alpha as opaque.
        const IGNORE_DEST_ALPHA  = 1 << 1;
        /// Treat source alpha as opaque.
        const SRC_ALPHA_OVERRIDE = 1 << 2;
        /// Bilinear source filtering.
        const SRC_FILTER         = 1 << 3;
    }
}

/// One compositing call: `triangles` textured triangles from `src` onto `dst`.
///
/// With `indices`, triangle `i` uses `vertices[indices[3i..3i + 3]]`;
/// without, it uses `vertices[3i..3i + 3]`.
#[derive(Debug, Clone)]
pub struct CompositeRequest<'a> {
    pub op: CompositeOp,
    pub src: SurfaceId,
    pub dst: SurfaceId,
    /// Multiplier applied to source alpha, `[0, 1]`.
    pub src_alpha: f32,
    pub dst_alpha: f32,
    /// Destination clip; nothing outside it is written.
    pub clip: Rect,
    pub flags: CompositeFlags,
    pub vertices: &'a [Vertex],
    pub indices: Option<&'a [u16]>,
    pub triangles: usize,
}

/// Pixel access granted by `lock`. Valid until the borrow ends; callers
/// pair every successful `lock` with `unlock`.
#[derive(Debug)]
pub struct LockedPixels<'a> {
    pub bytes: &'a mut [u8],
    pub pitch: usize,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown surface {0:?}")]
    InvalidSurface(SurfaceId),

    #[error("surface {0:?} is locked")]
    SurfaceLocked(SurfaceId),

    #[error("{requested} triangles requested, at most {max} per call")]
    TooManyPrimitives { requested: usize, max: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("engine rejected the call with code {0}")]
    Rejected(i32),
}

/// Behavioral contract of the compositing engine.
///
/// Surfaces are 32-bit ARGB. Calls are synchronous and non-reentrant.
pub trait CompositingEngine {
    /// Allocates a zero-filled surface; `None` when memory is exhausted or
    /// the depth is unsupported.
    fn allocate_surface(&mut self, width: u32, height: u32, depth: u32) -> Option<SurfaceId>;

    /// Releases a surface. Unknown handles are ignored.
    fn free_surface(&mut self, surface: SurfaceId);

    fn surface_size(&self, surface: SurfaceId) -> Option<(u32, u32)>;

    fn composite(&mut self, request: &CompositeRequest<'_>) -> Result<(), EngineError>;

    /// Copies `src_rect` of `src` to `(dst_x, dst_y)` on `dst`, clipped to both surfaces.
    fn blit(
        &mut self,
        src: SurfaceId,
        dst: SurfaceId,
        src_rect: Rect,
        dst_x: i32,
        dst_y: i32,
    ) -> Result<(), EngineError>;

    fn lock(&mut self, surface: SurfaceId) -> Result<LockedPixels<'_>, EngineError>;

    fn unlock(&mut self, surface: SurfaceId);

    /// Writes `argb` to every pixel of `rect` (clipped to the surface), no blending.
    fn fill_rect(&mut self, dst: SurfaceId, rect: Rect, argb: u32) -> Result<(), EngineError>;

    /// Copies caller ARGB8888 rows into `rect` of `dst`.
    fn write_pixels(
        &mut self,
        dst: SurfaceId,
        rect: Rect,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<(), EngineError>;

    /// Copies `rect` of `src` into caller ARGB8888 rows.
    fn read_pixels(
        &mut self,
        src: SurfaceId,
        rect: Rect,
        out: &mut [u8],
        pitch: usize,
    ) -> Result<(), EngineError>;
}
