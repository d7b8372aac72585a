use crate::coords::{Rect, Rgba8};
use crate::render::{BlendMode, TextureId};

/// Discriminant of a `RenderCommand`, used for batching decisions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CommandKind {
    NoOp,
    Clear,
    SetViewport,
    SetClipRect,
    DrawPoints,
    DrawLines,
    FillRects,
    Copy,
    CopyEx,
    Geometry,
}

/// Slice of one of the `VertexArena` buffers.
///
/// Which buffer depends on the command: points for `DrawPoints`/`DrawLines`,
/// rects for `FillRects`, vertices for `Copy`/`CopyEx`/`Geometry`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct VertexRange {
    pub offset: usize,
    pub count: usize,
}

impl VertexRange {
    #[inline]
    pub const fn new(offset: usize, count: usize) -> Self {
        Self { offset, count }
    }

    #[inline]
    pub const fn end(self) -> usize {
        self.offset + self.count
    }
}

/// Shared payload of draw commands.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawParams {
    pub color: Rgba8,
    pub blend: BlendMode,
    pub range: VertexRange,
    pub texture: Option<TextureId>,
    /// Texture color modulation captured when the copy was queued.
    pub tint: [f32; 3],
}

impl DrawParams {
    /// Copy commands carry four vertices per quad.
    #[inline]
    pub fn quads(&self) -> usize {
        self.range.count / 4
    }

    /// Same texture, blend mode, tint and all four color channels.
    #[inline]
    pub fn batches_with(&self, other: &DrawParams) -> bool {
        self.texture == other.texture
            && self.blend == other.blend
            && self.color == other.color
            && self.tint == other.tint
    }
}

/// One queued command. Immutable once queued.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RenderCommand {
    NoOp,
    Clear { color: Rgba8 },
    SetViewport { rect: Rect },
    SetClipRect { rect: Rect, enabled: bool },
    DrawPoints(DrawParams),
    DrawLines(DrawParams),
    FillRects(DrawParams),
    Copy(DrawParams),
    CopyEx(DrawParams),
    Geometry {
        draw: DrawParams,
        /// Caller supplied per-vertex colors; not representable, ignored.
        vertex_colors: bool,
    },
}

impl RenderCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            RenderCommand::NoOp => CommandKind::NoOp,
            RenderCommand::Clear { .. } => CommandKind::Clear,
            RenderCommand::SetViewport { .. } => CommandKind::SetViewport,
            RenderCommand::SetClipRect { .. } => CommandKind::SetClipRect,
            RenderCommand::DrawPoints(_) => CommandKind::DrawPoints,
            RenderCommand::DrawLines(_) => CommandKind::DrawLines,
            RenderCommand::FillRects(_) => CommandKind::FillRects,
            RenderCommand::Copy(_) => CommandKind::Copy,
            RenderCommand::CopyEx(_) => CommandKind::CopyEx,
            RenderCommand::Geometry { .. } => CommandKind::Geometry,
        }
    }

    /// Draw payload, for draw commands.
    pub fn draw(&self) -> Option<&DrawParams> {
        match self {
            RenderCommand::DrawPoints(d)
            | RenderCommand::DrawLines(d)
            | RenderCommand::FillRects(d)
            | RenderCommand::Copy(d)
            | RenderCommand::CopyEx(d) => Some(d),
            RenderCommand::Geometry { draw, .. } => Some(draw),
            _ => None,
        }
    }
}
