use crate::coords::{ColorF, FPoint, FRect, Point, Rect, Rgba8};
use crate::engine::Vertex;
use crate::error::{RenderError, Result};
use crate::render::{BlendMode, NO_TINT, QuadTransform, TextureId, build_quad};

use super::{DrawParams, RenderCommand, VertexRange};

/// Per-frame vertex storage referenced by command ranges.
///
/// Append-only while a frame is recorded; `clear` keeps capacity.
#[derive(Debug, Default, Clone)]
pub struct VertexArena {
    vertices: Vec<Vertex>,
    points: Vec<Point>,
    rects: Vec<Rect>,
}

impl VertexArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.points.clear();
        self.rects.clear();
    }

    /// `None` if the range lies outside the buffer.
    #[inline]
    pub fn vertices(&self, range: VertexRange) -> Option<&[Vertex]> {
        self.vertices.get(range.offset..range.end())
    }

    #[inline]
    pub fn points(&self, range: VertexRange) -> Option<&[Point]> {
        self.points.get(range.offset..range.end())
    }

    #[inline]
    pub fn rects(&self, range: VertexRange) -> Option<&[Rect]> {
        self.rects.get(range.offset..range.end())
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn push_vertices(&mut self, vertices: impl ExactSizeIterator<Item = Vertex>) -> Result<VertexRange> {
        let offset = self.vertices.len();
        let count = vertices.len();
        self.vertices
            .try_reserve(count)
            .map_err(|_| RenderError::oom("vertex arena"))?;
        self.vertices.extend(vertices);
        Ok(VertexRange::new(offset, count))
    }

    fn push_points(&mut self, points: &[FPoint]) -> Result<VertexRange> {
        let offset = self.points.len();
        self.points
            .try_reserve(points.len())
            .map_err(|_| RenderError::oom("point arena"))?;
        self.points.extend(points.iter().map(|p| p.truncate()));
        Ok(VertexRange::new(offset, points.len()))
    }

    fn push_rects(&mut self, rects: &[FRect]) -> Result<VertexRange> {
        let offset = self.rects.len();
        self.rects
            .try_reserve(rects.len())
            .map_err(|_| RenderError::oom("rect arena"))?;
        self.rects.extend(rects.iter().map(|r| r.to_fill_rect()));
        Ok(VertexRange::new(offset, rects.len()))
    }
}

/// Index buffer accepted by `CommandList::push_geometry`.
#[derive(Debug, Copy, Clone)]
pub enum Indices<'a> {
    U8(&'a [u8]),
    U16(&'a [u16]),
    U32(&'a [u32]),
}

impl Indices<'_> {
    fn len(&self) -> usize {
        match self {
            Indices::U8(i) => i.len(),
            Indices::U16(i) => i.len(),
            Indices::U32(i) => i.len(),
        }
    }

    fn get(&self, n: usize) -> usize {
        match self {
            Indices::U8(i) => i[n] as usize,
            Indices::U16(i) => i[n] as usize,
            Indices::U32(i) => i[n] as usize,
        }
    }
}

/// Caller-supplied triangle geometry.
///
/// `uvs` are normalized (`0..=1` spans the texture); positions are in target
/// pixels before `scale` is applied.
#[derive(Debug, Copy, Clone)]
pub struct GeometryInput<'a> {
    pub positions: &'a [FPoint],
    pub uvs: &'a [FPoint],
    pub colors: Option<&'a [ColorF]>,
    pub indices: Option<Indices<'a>>,
    pub scale: FPoint,
}

impl<'a> GeometryInput<'a> {
    pub fn new(positions: &'a [FPoint], uvs: &'a [FPoint]) -> Self {
        Self {
            positions,
            uvs,
            colors: None,
            indices: None,
            scale: FPoint::new(1.0, 1.0),
        }
    }
}

/// Recorded command queue for a frame.
///
/// Commands keep submission order; the processor walks them with a cursor.
#[derive(Debug, Default, Clone)]
pub struct CommandList {
    commands: Vec<RenderCommand>,
    arena: VertexArena,
}

impl CommandList {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops recorded commands and vertex data, keeping capacity.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.arena.clear();
    }

    #[inline]
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    #[inline]
    pub fn arena(&self) -> &VertexArena {
        &self.arena
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Appends a prebuilt command. Its range must refer to this list's arena.
    pub fn push(&mut self, cmd: RenderCommand) {
        self.commands.push(cmd);
    }

    pub fn push_no_op(&mut self) {
        self.commands.push(RenderCommand::NoOp);
    }

    pub fn push_clear(&mut self, color: ColorF) {
        self.commands.push(RenderCommand::Clear {
            color: Rgba8::from_f32(color),
        });
    }

    pub fn push_viewport(&mut self, rect: Rect) {
        self.commands.push(RenderCommand::SetViewport { rect });
    }

    /// `rect` is relative to the viewport origin. Ignored when `enabled` is false.
    pub fn push_clip_rect(&mut self, rect: Rect, enabled: bool) {
        self.commands
            .push(RenderCommand::SetClipRect { rect, enabled });
    }

    /// Points are snapped to whole pixels (truncation).
    pub fn push_points(&mut self, points: &[FPoint], color: ColorF, blend: BlendMode) -> Result<()> {
        let range = self.arena.push_points(points)?;
        self.commands
            .push(RenderCommand::DrawPoints(Self::params(color, blend, range, None)));
        Ok(())
    }

    /// Polyline through `points`.
    pub fn push_lines(&mut self, points: &[FPoint], color: ColorF, blend: BlendMode) -> Result<()> {
        let range = self.arena.push_points(points)?;
        self.commands
            .push(RenderCommand::DrawLines(Self::params(color, blend, range, None)));
        Ok(())
    }

    pub fn push_fill_rects(&mut self, rects: &[FRect], color: ColorF, blend: BlendMode) -> Result<()> {
        let range = self.arena.push_rects(rects)?;
        self.commands
            .push(RenderCommand::FillRects(Self::params(color, blend, range, None)));
        Ok(())
    }

    /// Copies `src` (texels) of `texture` to `dst` (target pixels), untinted.
    ///
    /// `Renderer::queue_copy` records the texture's color modulation instead.
    pub fn push_copy(
        &mut self,
        texture: TextureId,
        color: ColorF,
        blend: BlendMode,
        src: FRect,
        dst: FRect,
    ) -> Result<()> {
        self.push_tinted_copy(texture, NO_TINT, color, blend, src, dst, None)
    }

    /// Like `push_copy` with rotation, flip and scale. `transform.center` is
    /// relative to the `dst` origin.
    pub fn push_copy_ex(
        &mut self,
        texture: TextureId,
        color: ColorF,
        blend: BlendMode,
        src: FRect,
        dst: FRect,
        transform: &QuadTransform,
    ) -> Result<()> {
        self.push_tinted_copy(texture, NO_TINT, color, blend, src, dst, Some(transform))
    }

    /// Queues a copy drawn with `tint` applied to the texture's RGB.
    ///
    /// A `transform` makes it a `CopyEx`. Copies with different tints never
    /// share a batch.
    #[allow(clippy::too_many_arguments)]
    pub fn push_tinted_copy(
        &mut self,
        texture: TextureId,
        tint: [f32; 3],
        color: ColorF,
        blend: BlendMode,
        src: FRect,
        dst: FRect,
        transform: Option<&QuadTransform>,
    ) -> Result<()> {
        let xf = transform.map_or_else(QuadTransform::default, |t| QuadTransform {
            center: dst.origin() + t.center,
            ..*t
        });
        let quad = build_quad(src, dst, &xf);
        let range = self.arena.push_vertices(quad.into_iter())?;
        let draw = DrawParams {
            tint,
            ..Self::params(color, blend, range, Some(texture))
        };
        self.commands.push(match transform {
            Some(_) => RenderCommand::CopyEx(draw),
            None => RenderCommand::Copy(draw),
        });
        Ok(())
    }

    /// Queues textured triangles, expanding `indices` into a flat vertex list.
    ///
    /// Untextured geometry is rejected with `UnsupportedFeature`. Per-vertex
    /// colors are accepted but ignored when drawing.
    pub fn push_geometry(
        &mut self,
        texture: Option<TextureId>,
        color: ColorF,
        blend: BlendMode,
        input: &GeometryInput<'_>,
    ) -> Result<()> {
        let Some(texture) = texture else {
            return Err(RenderError::UnsupportedFeature("untextured geometry"));
        };
        if input.uvs.len() < input.positions.len() {
            return Err(RenderError::InvalidGeometry("fewer uvs than positions"));
        }

        let count = input
            .indices
            .as_ref()
            .map_or(input.positions.len(), Indices::len);
        if count % 3 != 0 {
            return Err(RenderError::InvalidGeometry("vertex count is not a multiple of 3"));
        }
        if let Some(indices) = &input.indices {
            if (0..count).any(|n| indices.get(n) >= input.positions.len()) {
                return Err(RenderError::InvalidGeometry("index out of range"));
            }
        }

        let scale = input.scale;
        let vertices = (0..count).map(|n| {
            let j = input.indices.as_ref().map_or(n, |i| i.get(n));
            let p = input.positions[j];
            let uv = input.uvs[j];
            Vertex::new(p.x * scale.x, p.y * scale.y, uv.x, uv.y)
        });
        let range = self.arena.push_vertices(vertices)?;

        self.commands.push(RenderCommand::Geometry {
            draw: Self::params(color, blend, range, Some(texture)),
            vertex_colors: input.colors.is_some(),
        });
        Ok(())
    }

    fn params(
        color: ColorF,
        blend: BlendMode,
        range: VertexRange,
        texture: Option<TextureId>,
    ) -> DrawParams {
        DrawParams {
            color: Rgba8::from_f32(color),
            blend,
            range,
            texture,
            tint: NO_TINT,
        }
    }
}
