use thiserror::Error;

use crate::engine::EngineError;
use crate::render::{PixelFormat, TextureId};

/// Errors reported by the renderer API.
///
/// `EngineFailure` raised while processing a command queue is not returned
/// here: the processor logs it (rate-limited) and moves on to the next
/// command. It is returned only by direct calls such as `update_texture` or
/// `present`.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("out of memory while allocating {what}")]
    OutOfMemory { what: &'static str },

    #[error("unsupported texture format {0:?} (only ARGB8888 is supported)")]
    UnsupportedFormat(PixelFormat),

    #[error("compositing engine failure: {0}")]
    EngineFailure(#[from] EngineError),

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),

    #[error("invalid or destroyed texture {0:?}")]
    InvalidTexture(TextureId),

    #[error("texture {0:?} is locked")]
    TextureLocked(TextureId),

    #[error("renderer has no render target")]
    NoRenderTarget,

    #[error("rectangle lies outside the surface")]
    InvalidRect,

    #[error("invalid geometry: {0}")]
    InvalidGeometry(&'static str),
}

impl RenderError {
    #[inline]
    pub(crate) const fn oom(what: &'static str) -> Self {
        RenderError::OutOfMemory { what }
    }
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
