//! Blend mode → compositing operator and flag mapping.

use serde::{Deserialize, Serialize};

use crate::engine::{CompositeFlags, CompositeOp};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// Source replaces destination.
    None,
    #[default]
    Blend,
    Add,
    /// Multiplicative; drawn as `Blend` since the engine has no multiply operator.
    Mod,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    Nearest,
    #[default]
    Linear,
}

impl BlendMode {
    #[inline]
    pub fn composite_op(self) -> CompositeOp {
        match self {
            BlendMode::None => CompositeOp::Src,
            BlendMode::Blend | BlendMode::Mod => CompositeOp::SrcOverDest,
            BlendMode::Add => CompositeOp::Plus,
        }
    }

    /// Flags for primitives drawn from the solid-color surface.
    #[inline]
    pub fn base_flags(self) -> CompositeFlags {
        let mut flags = CompositeFlags::HARDWARE_ONLY | CompositeFlags::IGNORE_DEST_ALPHA;
        if self == BlendMode::None {
            flags |= CompositeFlags::SRC_ALPHA_OVERRIDE;
        }
        flags
    }

    /// Flags for texture draws.
    ///
    /// Source alpha is only forced opaque for `None` while drawing to the
    /// window target; a texture target keeps the copied alpha.
    #[inline]
    pub fn composite_flags(self, scale: ScaleMode, target_is_texture: bool) -> CompositeFlags {
        let mut flags = CompositeFlags::HARDWARE_ONLY | CompositeFlags::IGNORE_DEST_ALPHA;
        if self == BlendMode::None && !target_is_texture {
            flags |= CompositeFlags::SRC_ALPHA_OVERRIDE;
        }
        if scale != ScaleMode::Nearest {
            flags |= CompositeFlags::SRC_FILTER;
        }
        flags
    }
}

/// Everything the engine needs besides geometry to composite a texture draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CompositeParams {
    pub op: CompositeOp,
    pub src_alpha: f32,
    pub dst_alpha: f32,
    pub flags: CompositeFlags,
}

impl CompositeParams {
    /// `alpha` is the draw alpha in `[0, 1]`; ignored for `BlendMode::None`.
    pub fn new(mode: BlendMode, scale: ScaleMode, target_is_texture: bool, alpha: f32) -> Self {
        Self {
            op: mode.composite_op(),
            src_alpha: if mode == BlendMode::None { 1.0 } else { alpha },
            dst_alpha: 1.0,
            flags: mode.composite_flags(scale, target_is_texture),
        }
    }
}
