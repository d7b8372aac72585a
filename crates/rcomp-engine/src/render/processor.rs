//! Walks one command queue against the current target.

use crate::coords::{FRect, Point, Rect, Rgba8};
use crate::engine::{CompositeRequest, CompositingEngine, SurfaceId, Vertex};
use crate::error::{RenderError, Result};
use crate::logging::Diagnostics;
use crate::scene::{DrawParams, RenderCommand, VertexArena};

use super::batch::{self, Batch};
use super::blend::{BlendMode, CompositeParams};
use super::clip::ClipTracker;
use super::modulation;
use super::texture::TextureStore;
use super::vertex::{QuadTransform, build_quad, quad_indices};

/// Counters for one `run_command_queue` call.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub commands: usize,
    /// Composite calls issued, including failed ones.
    pub composite_calls: usize,
    pub failed_calls: usize,
    /// Opaque rect fills (clear and `BlendMode::None` primitives).
    pub fills: usize,
    /// Commands dropped for referencing missing data or a locked texture.
    pub skipped: usize,
}

const SOLID_SRC: FRect = FRect::new(0.0, 0.0, 1.0, 1.0);

/// Per-run view of the renderer state.
pub(crate) struct Processor<'a, E: CompositingEngine> {
    pub engine: &'a mut E,
    pub textures: &'a mut TextureStore,
    pub clip: &'a mut ClipTracker,
    pub diagnostics: &'a mut Diagnostics,
    pub scratch: &'a mut Vec<Vertex>,
    pub rects: &'a mut Vec<Rect>,
    pub target: SurfaceId,
    pub target_is_texture: bool,
    pub solid: SurfaceId,
    /// ARGB currently stored in `solid`.
    pub solid_color: &'a mut Option<u32>,
    pub max_quads: usize,
}

impl<E: CompositingEngine> Processor<'_, E> {
    /// Executes `commands` in order.
    ///
    /// Engine failures are reported through diagnostics and the walk
    /// continues. Only out-of-memory while modulating a texture aborts.
    pub fn run(mut self, commands: &[RenderCommand], arena: &VertexArena) -> Result<FrameStats> {
        let mut stats = FrameStats {
            commands: commands.len(),
            ..FrameStats::default()
        };

        let mut cursor = 0;
        while cursor < commands.len() {
            let mut next = cursor + 1;

            match &commands[cursor] {
                RenderCommand::NoOp => {}
                RenderCommand::Clear { color } => {
                    let bounds = self.clip.bounds();
                    self.fill(&mut stats, "clear", bounds, color.to_argb());
                }
                RenderCommand::SetViewport { rect } => {
                    self.clip.set_viewport(*rect);
                }
                RenderCommand::SetClipRect { rect, enabled } => {
                    self.clip.set_clip_rect(*rect, *enabled);
                }
                RenderCommand::DrawPoints(draw) => match arena.points(draw.range) {
                    Some(points) => {
                        let offset = self.clip.viewport_offset();
                        self.rects.clear();
                        self.rects.extend(
                            points
                                .iter()
                                .map(|p| Rect::new(p.x + offset.x, p.y + offset.y, 1, 1)),
                        );
                        self.draw_rects(&mut stats, draw);
                    }
                    None => skip(&mut stats, "points", draw),
                },
                RenderCommand::DrawLines(draw) => match arena.points(draw.range) {
                    Some(points) => {
                        let offset = self.clip.viewport_offset();
                        self.rects.clear();
                        polyline_rects(points, offset, self.rects);
                        self.draw_rects(&mut stats, draw);
                    }
                    None => skip(&mut stats, "lines", draw),
                },
                RenderCommand::FillRects(draw) => match arena.rects(draw.range) {
                    Some(rects) => {
                        let offset = self.clip.viewport_offset();
                        self.rects.clear();
                        self.rects
                            .extend(rects.iter().map(|r| r.offset(offset.x, offset.y)));
                        self.draw_rects(&mut stats, draw);
                    }
                    None => skip(&mut stats, "fill rects", draw),
                },
                RenderCommand::Copy(_) | RenderCommand::CopyEx(_) => {
                    if let Some(batch) = batch::coalesce(commands, cursor, self.max_quads) {
                        self.draw_copies(&mut stats, commands, arena, batch)?;
                        next = batch.end;
                    }
                }
                RenderCommand::Geometry {
                    draw,
                    vertex_colors,
                } => {
                    if *vertex_colors {
                        self.diagnostics.unsupported("per-vertex color");
                    }
                    self.draw_geometry(&mut stats, arena, draw);
                }
            }

            cursor = next;
        }

        Ok(stats)
    }

    // ── primitives ────────────────────────────────────────────────────────

    /// Draws `self.rects` (target space) with the command color and blend.
    fn draw_rects(&mut self, stats: &mut FrameStats, draw: &DrawParams) {
        if self.rects.is_empty() {
            return;
        }

        if draw.blend == BlendMode::None {
            let clip = self.clip.clip_rect();
            let argb = draw.color.to_argb();
            let rects = std::mem::take(self.rects);
            for r in &rects {
                let r = r.intersection(clip);
                if !r.is_empty() {
                    self.fill(stats, "fill", r, argb);
                }
            }
            *self.rects = rects;
            return;
        }

        if draw.blend == BlendMode::Mod {
            self.diagnostics.unsupported("blend-mod");
        }
        if !self.set_solid_color(draw.color) {
            return;
        }

        let clip = self.clip.clip_rect();
        let flags = draw.blend.base_flags();
        for chunk in self.rects.chunks(self.max_quads) {
            self.scratch.clear();
            for r in chunk {
                self.scratch.extend(build_quad(
                    SOLID_SRC,
                    r.to_frect(),
                    &QuadTransform::default(),
                ));
            }

            let request = CompositeRequest {
                op: draw.blend.composite_op(),
                src: self.solid,
                dst: self.target,
                src_alpha: 1.0,
                dst_alpha: 1.0,
                clip,
                flags,
                vertices: self.scratch.as_slice(),
                indices: Some(quad_indices(chunk.len())),
                triangles: chunk.len() * 2,
            };
            submit(self.engine, self.diagnostics, stats, "composite solid", &request);
        }
    }

    fn set_solid_color(&mut self, color: Rgba8) -> bool {
        let argb = color.to_argb();
        if *self.solid_color == Some(argb) {
            return true;
        }

        let locked = match self.engine.lock(self.solid) {
            Ok(locked) => locked,
            Err(e) => {
                *self.solid_color = None;
                self.diagnostics.engine_failure("lock solid color", &e);
                return false;
            }
        };
        if let Some(px) = locked.bytes.get_mut(..4) {
            px.copy_from_slice(&argb.to_ne_bytes());
        }
        self.engine.unlock(self.solid);
        *self.solid_color = Some(argb);
        true
    }

    fn fill(&mut self, stats: &mut FrameStats, context: &str, rect: Rect, argb: u32) {
        stats.fills += 1;
        if let Err(e) = self.engine.fill_rect(self.target, rect, argb) {
            self.diagnostics.engine_failure(context, &e);
        }
    }

    // ── textures ──────────────────────────────────────────────────────────

    fn draw_copies(
        &mut self,
        stats: &mut FrameStats,
        commands: &[RenderCommand],
        arena: &VertexArena,
        batch: Batch,
    ) -> Result<()> {
        let Some(first) = commands[batch.start].draw() else {
            return Ok(());
        };
        let Some(id) = first.texture else {
            stats.skipped += batch.len();
            return Ok(());
        };
        let Some(tex) = self.textures.get_mut(id) else {
            log::warn!("copy from destroyed texture {id:?} skipped");
            stats.skipped += batch.len();
            return Ok(());
        };
        if tex.locked.is_some() {
            log::warn!("copy from locked texture {id:?} skipped");
            stats.skipped += batch.len();
            return Ok(());
        }

        // Recomputing happens before any composite of this batch is issued;
        // earlier batches were already composited with their own tint.
        match modulation::enable_modulation(self.engine, tex, first.tint) {
            Ok(_) => {}
            Err(RenderError::EngineFailure(e)) => {
                self.diagnostics.engine_failure("modulate texture", &e);
                stats.skipped += batch.len();
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        if first.blend == BlendMode::Mod {
            self.diagnostics.unsupported("blend-mod");
        }

        let params = CompositeParams::new(
            first.blend,
            tex.scale_mode,
            self.target_is_texture,
            f32::from(first.color.a) / 255.0,
        );
        let src = tex.source_surface(first.tint);

        let offset = self.clip.viewport_offset();
        self.scratch.clear();
        for cmd in &commands[batch.start..batch.end] {
            let Some(draw) = cmd.draw() else { continue };
            let whole = draw.quads() * 4;
            match arena.vertices(draw.range) {
                Some(v) => self.scratch.extend(v[..whole].iter().map(|v| shifted(*v, offset))),
                None => skip(stats, "copy", draw),
            }
        }

        let clip = self.clip.clip_rect();
        let quads = self.scratch.len() / 4;
        let mut start = 0;
        while start < quads {
            let n = (quads - start).min(self.max_quads);
            let request = CompositeRequest {
                op: params.op,
                src,
                dst: self.target,
                src_alpha: params.src_alpha,
                dst_alpha: params.dst_alpha,
                clip,
                flags: params.flags,
                vertices: &self.scratch[start * 4..(start + n) * 4],
                indices: Some(quad_indices(n)),
                triangles: n * 2,
            };
            submit(self.engine, self.diagnostics, stats, "composite copy", &request);
            start += n;
        }
        Ok(())
    }

    /// Non-indexed triangles sampled from the texture's primary surface.
    fn draw_geometry(&mut self, stats: &mut FrameStats, arena: &VertexArena, draw: &DrawParams) {
        let Some(vertices) = arena.vertices(draw.range) else {
            skip(stats, "geometry", draw);
            return;
        };
        let Some(tex) = draw.texture.and_then(|id| self.textures.get(id)) else {
            skip(stats, "geometry", draw);
            return;
        };
        if tex.locked.is_some() {
            skip(stats, "geometry", draw);
            return;
        }

        let triangles = vertices.len() / 3;
        if triangles == 0 {
            return;
        }
        if draw.blend == BlendMode::Mod {
            self.diagnostics.unsupported("blend-mod");
        }

        let params = CompositeParams::new(draw.blend, tex.scale_mode, self.target_is_texture, 1.0);
        let (w, h) = (tex.width as f32, tex.height as f32);
        let src = tex.surface;

        let offset = self.clip.viewport_offset();
        self.scratch.clear();
        self.scratch.extend(vertices[..triangles * 3].iter().map(|v| {
            let v = shifted(*v, offset);
            Vertex::new(v.x, v.y, v.s * w, v.t * h)
        }));

        let request = CompositeRequest {
            op: params.op,
            src,
            dst: self.target,
            src_alpha: params.src_alpha,
            dst_alpha: params.dst_alpha,
            clip: self.clip.clip_rect(),
            flags: params.flags,
            vertices: self.scratch.as_slice(),
            indices: None,
            triangles,
        };
        submit(self.engine, self.diagnostics, stats, "composite geometry", &request);
    }
}

fn submit<E: CompositingEngine>(
    engine: &mut E,
    diagnostics: &mut Diagnostics,
    stats: &mut FrameStats,
    context: &str,
    request: &CompositeRequest<'_>,
) -> bool {
    stats.composite_calls += 1;
    match engine.composite(request) {
        Ok(()) => true,
        Err(e) => {
            stats.failed_calls += 1;
            diagnostics.engine_failure(context, &e);
            false
        }
    }
}

fn skip(stats: &mut FrameStats, what: &str, draw: &DrawParams) {
    log::warn!("{what} command skipped: range {:?} or texture {:?} unusable", draw.range, draw.texture);
    stats.skipped += 1;
}

#[inline]
fn shifted(v: Vertex, offset: Point) -> Vertex {
    if offset == Point::default() {
        return v;
    }
    Vertex {
        x: v.x + offset.x as f32,
        y: v.y + offset.y as f32,
        ..v
    }
}

/// Rasterizes a polyline into rects.
///
/// Each segment excludes its end point except the last, so shared joints
/// are drawn once. Axis-aligned segments become a single rect.
fn polyline_rects(points: &[Point], offset: Point, out: &mut Vec<Rect>) {
    let shift = |p: &Point| p.offset(offset.x, offset.y);

    match points {
        [] => {}
        [p] => {
            let p = shift(p);
            out.push(Rect::new(p.x, p.y, 1, 1));
        }
        _ => {
            let segments = points.len() - 1;
            for (i, pair) in points.windows(2).enumerate() {
                let (a, b) = (shift(&pair[0]), shift(&pair[1]));
                segment_rects(a, b, i + 1 == segments, out);
            }
        }
    }
}

fn segment_rects(a: Point, b: Point, include_end: bool, out: &mut Vec<Rect>) {
    if a == b {
        if include_end {
            out.push(Rect::new(a.x, a.y, 1, 1));
        }
        return;
    }

    let trim = i32::from(!include_end);
    if a.y == b.y {
        let len = (b.x - a.x).abs() + 1 - trim;
        let x = if b.x > a.x { a.x } else { a.x - len + 1 };
        out.push(Rect::new(x, a.y, len, 1));
        return;
    }
    if a.x == b.x {
        let len = (b.y - a.y).abs() + 1 - trim;
        let y = if b.y > a.y { a.y } else { a.y - len + 1 };
        out.push(Rect::new(a.x, y, 1, len));
        return;
    }

    // Bresenham over all octants.
    let dx = (b.x - a.x).abs();
    let dy = -(b.y - a.y).abs();
    let sx = if a.x < b.x { 1 } else { -1 };
    let sy = if a.y < b.y { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (a.x, a.y);

    loop {
        let at_end = x == b.x && y == b.y;
        if at_end && !include_end {
            break;
        }
        out.push(Rect::new(x, y, 1, 1));
        if at_end {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rects(points: &[Point]) -> Vec<Rect> {
        let mut out = Vec::new();
        polyline_rects(points, Point::default(), &mut out);
        out
    }

    #[test]
    fn horizontal_segment_collapses_to_one_rect() {
        assert_eq!(
            rects(&[Point::new(5, 2), Point::new(1, 2)]),
            vec![Rect::new(1, 2, 5, 1)]
        );
    }

    #[test]
    fn vertical_segment_collapses_to_one_rect() {
        assert_eq!(
            rects(&[Point::new(3, 1), Point::new(3, 4)]),
            vec![Rect::new(3, 1, 1, 4)]
        );
    }

    #[test]
    fn joints_are_not_drawn_twice() {
        let out = rects(&[Point::new(0, 0), Point::new(3, 0), Point::new(3, 3)]);
        assert_eq!(out, vec![Rect::new(0, 0, 3, 1), Rect::new(3, 0, 1, 4)]);
    }

    #[test]
    fn diagonal_uses_bresenham_inclusive_end() {
        let out = rects(&[Point::new(0, 0), Point::new(3, 3)]);
        let cells: Vec<(i32, i32)> = out.iter().map(|r| (r.x, r.y)).collect();
        assert_eq!(cells, vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn shallow_line_covers_every_column() {
        let out = rects(&[Point::new(0, 0), Point::new(6, 2)]);
        assert_eq!(out.len(), 7);
        assert_eq!((out[6].x, out[6].y), (6, 2));
    }

    #[test]
    fn single_point_and_offset() {
        let mut out = Vec::new();
        polyline_rects(&[Point::new(1, 1)], Point::new(10, 20), &mut out);
        assert_eq!(out, vec![Rect::new(11, 21, 1, 1)]);
    }
}
