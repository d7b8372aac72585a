use crate::coords::Rect;

use super::raster::{self, PixelOp, Sampler};
use super::{
    CompositeFlags, CompositeRequest, CompositingEngine, EngineError, LockedPixels, MAX_QUADS,
    SurfaceId,
};

const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug)]
struct SoftSurface {
    width: u32,
    height: u32,
    /// ARGB8888, one `u32` per pixel, row-major with no padding.
    pixels: Vec<u32>,
    locked: bool,
}

impl SoftSurface {
    #[inline]
    fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    #[inline]
    fn byte_len(&self) -> usize {
        self.pixels.len() * BYTES_PER_PIXEL
    }
}

/// CPU compositing engine over ARGB8888 pixel buffers.
///
/// Surface handles are never reused, so a stale handle reports
/// `InvalidSurface` instead of aliasing a newer surface.
#[derive(Debug, Default)]
pub struct SoftwareEngine {
    surfaces: Vec<Option<SoftSurface>>,
    /// Upper bound on live surface bytes; `None` = unlimited.
    budget: Option<usize>,
    allocated_bytes: usize,
}

impl SoftwareEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that refuses allocations once `bytes` of surface memory are live.
    pub fn with_budget(bytes: usize) -> Self {
        Self {
            budget: Some(bytes),
            ..Self::default()
        }
    }

    pub fn set_budget(&mut self, bytes: Option<usize>) {
        self.budget = bytes;
    }

    pub fn live_surfaces(&self) -> usize {
        self.surfaces.iter().filter(|s| s.is_some()).count()
    }

    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    /// Reads one ARGB pixel; `None` when the surface or coordinate is invalid.
    pub fn pixel(&self, surface: SurfaceId, x: i32, y: i32) -> Option<u32> {
        let s = self.get(surface).ok()?;
        if !s.bounds().contains_point(x, y) {
            return None;
        }
        Some(s.pixels[y as usize * s.width as usize + x as usize])
    }

    /// Whole-surface pixel view, row-major ARGB.
    pub fn pixels(&self, surface: SurfaceId) -> Option<&[u32]> {
        self.get(surface).ok().map(|s| s.pixels.as_slice())
    }

    pub fn is_locked(&self, surface: SurfaceId) -> bool {
        self.get(surface).map(|s| s.locked).unwrap_or(false)
    }

    fn get(&self, id: SurfaceId) -> Result<&SoftSurface, EngineError> {
        self.surfaces
            .get(id.raw() as usize)
            .and_then(Option::as_ref)
            .ok_or(EngineError::InvalidSurface(id))
    }

    fn get_mut(&mut self, id: SurfaceId) -> Result<&mut SoftSurface, EngineError> {
        self.surfaces
            .get_mut(id.raw() as usize)
            .and_then(Option::as_mut)
            .ok_or(EngineError::InvalidSurface(id))
    }

    /// Borrows `src` shared and `dst` exclusively; they must differ.
    fn pair_mut(
        &mut self,
        src: SurfaceId,
        dst: SurfaceId,
    ) -> Result<(&SoftSurface, &mut SoftSurface), EngineError> {
        if src == dst {
            return Err(EngineError::InvalidParameter("source and destination alias"));
        }
        self.get(src)?;
        self.get(dst)?;

        let (si, di) = (src.raw() as usize, dst.raw() as usize);
        let (s, d) = if si < di {
            let (lo, hi) = self.surfaces.split_at_mut(di);
            (&lo[si], &mut hi[0])
        } else {
            let (lo, hi) = self.surfaces.split_at_mut(si);
            (&hi[0], &mut lo[di])
        };

        match (s.as_ref(), d.as_mut()) {
            (Some(s), Some(d)) => Ok((s, d)),
            (None, _) => Err(EngineError::InvalidSurface(src)),
            (_, None) => Err(EngineError::InvalidSurface(dst)),
        }
    }

    fn check_rows(rect: Rect, len: usize, pitch: usize) -> Result<(), EngineError> {
        let row_bytes = rect.w as usize * BYTES_PER_PIXEL;
        if pitch < row_bytes {
            return Err(EngineError::InvalidParameter("pitch shorter than a row"));
        }
        let needed = (rect.h as usize - 1) * pitch + row_bytes;
        if len < needed {
            return Err(EngineError::InvalidParameter("pixel buffer too small"));
        }
        Ok(())
    }
}

impl CompositingEngine for SoftwareEngine {
    fn allocate_surface(&mut self, width: u32, height: u32, depth: u32) -> Option<SurfaceId> {
        if depth != 32 || width == 0 || height == 0 {
            log::debug!("refusing surface {width}x{height}x{depth}");
            return None;
        }

        let count = (width as usize).checked_mul(height as usize)?;
        let bytes = count.checked_mul(BYTES_PER_PIXEL)?;
        if let Some(budget) = self.budget {
            if self.allocated_bytes + bytes > budget {
                log::debug!("surface {width}x{height} exceeds budget ({budget} bytes)");
                return None;
            }
        }

        let mut pixels = Vec::new();
        pixels.try_reserve_exact(count).ok()?;
        pixels.resize(count, 0);

        let id = SurfaceId::from_raw(self.surfaces.len() as u32);
        self.surfaces.push(Some(SoftSurface {
            width,
            height,
            pixels,
            locked: false,
        }));
        self.allocated_bytes += bytes;
        Some(id)
    }

    fn free_surface(&mut self, surface: SurfaceId) {
        if let Some(slot) = self.surfaces.get_mut(surface.raw() as usize) {
            if let Some(s) = slot.take() {
                self.allocated_bytes -= s.byte_len();
            }
        }
    }

    fn surface_size(&self, surface: SurfaceId) -> Option<(u32, u32)> {
        self.get(surface).ok().map(|s| (s.width, s.height))
    }

    fn composite(&mut self, request: &CompositeRequest<'_>) -> Result<(), EngineError> {
        let vertex_count = request.vertices.len();
        let corners = request.triangles * 3;

        if let Some(indices) = request.indices {
            if request.triangles > 2 * MAX_QUADS {
                return Err(EngineError::TooManyPrimitives {
                    requested: request.triangles,
                    max: 2 * MAX_QUADS,
                });
            }
            if indices.len() < corners {
                return Err(EngineError::InvalidParameter("index array too short"));
            }
            if indices[..corners].iter().any(|&i| i as usize >= vertex_count) {
                return Err(EngineError::InvalidParameter("index out of range"));
            }
        } else if vertex_count < corners {
            return Err(EngineError::InvalidParameter("vertex array too short"));
        }

        let (src, dst) = self.pair_mut(request.src, request.dst)?;
        if src.locked {
            return Err(EngineError::SurfaceLocked(request.src));
        }
        if dst.locked {
            return Err(EngineError::SurfaceLocked(request.dst));
        }

        let clip = request.clip.intersection(dst.bounds());
        if clip.is_empty() {
            return Ok(());
        }

        let sampler = Sampler {
            pixels: &src.pixels,
            width: src.width,
            height: src.height,
            filter: request.flags.contains(CompositeFlags::SRC_FILTER),
        };
        let pixel_op = PixelOp::new(request.op, request.src_alpha, request.flags);

        for tri in 0..request.triangles {
            let corner = |k: usize| match request.indices {
                Some(indices) => request.vertices[indices[tri * 3 + k] as usize],
                None => request.vertices[tri * 3 + k],
            };
            raster::fill_triangle(
                &mut dst.pixels,
                dst.width,
                clip,
                [corner(0), corner(1), corner(2)],
                &sampler,
                pixel_op,
            );
        }

        Ok(())
    }

    fn blit(
        &mut self,
        src: SurfaceId,
        dst: SurfaceId,
        src_rect: Rect,
        dst_x: i32,
        dst_y: i32,
    ) -> Result<(), EngineError> {
        let (s, d) = self.pair_mut(src, dst)?;
        if d.locked {
            return Err(EngineError::SurfaceLocked(dst));
        }

        // Clip against the source, then map into destination space and clip again.
        let from = src_rect.intersection(s.bounds());
        let to = from
            .offset(dst_x - src_rect.x, dst_y - src_rect.y)
            .intersection(d.bounds());
        if to.is_empty() {
            return Ok(());
        }

        let sx0 = to.x - (dst_x - src_rect.x);
        let sy0 = to.y - (dst_y - src_rect.y);
        let w = to.w as usize;
        for row in 0..to.h {
            let s_off = (sy0 + row) as usize * s.width as usize + sx0 as usize;
            let d_off = (to.y + row) as usize * d.width as usize + to.x as usize;
            d.pixels[d_off..d_off + w].copy_from_slice(&s.pixels[s_off..s_off + w]);
        }
        Ok(())
    }

    fn lock(&mut self, surface: SurfaceId) -> Result<LockedPixels<'_>, EngineError> {
        let s = self.get_mut(surface)?;
        if s.locked {
            return Err(EngineError::SurfaceLocked(surface));
        }
        s.locked = true;
        Ok(LockedPixels {
            pitch: s.width as usize * BYTES_PER_PIXEL,
            width: s.width,
            height: s.height,
            bytes: bytemuck::cast_slice_mut(s.pixels.as_mut_slice()),
        })
    }

    fn unlock(&mut self, surface: SurfaceId) {
        if let Ok(s) = self.get_mut(surface) {
            s.locked = false;
        }
    }

    fn fill_rect(&mut self, dst: SurfaceId, rect: Rect, argb: u32) -> Result<(), EngineError> {
        let d = self.get_mut(dst)?;
        if d.locked {
            return Err(EngineError::SurfaceLocked(dst));
        }
        let r = rect.intersection(d.bounds());
        if r.is_empty() {
            return Ok(());
        }
        for y in r.y..r.bottom() {
            let off = y as usize * d.width as usize;
            d.pixels[off + r.x as usize..off + r.right() as usize].fill(argb);
        }
        Ok(())
    }

    fn write_pixels(
        &mut self,
        dst: SurfaceId,
        rect: Rect,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<(), EngineError> {
        let d = self.get_mut(dst)?;
        if d.locked {
            return Err(EngineError::SurfaceLocked(dst));
        }
        if rect.is_empty() || !d.bounds().contains_rect(rect) {
            return Err(EngineError::InvalidParameter("rect outside destination"));
        }
        Self::check_rows(rect, pixels.len(), pitch)?;

        for row in 0..rect.h as usize {
            let src_row = &pixels[row * pitch..row * pitch + rect.w as usize * BYTES_PER_PIXEL];
            let off = (rect.y as usize + row) * d.width as usize + rect.x as usize;
            for (px, bytes) in d.pixels[off..off + rect.w as usize]
                .iter_mut()
                .zip(src_row.chunks_exact(BYTES_PER_PIXEL))
            {
                *px = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
        }
        Ok(())
    }

    fn read_pixels(
        &mut self,
        src: SurfaceId,
        rect: Rect,
        out: &mut [u8],
        pitch: usize,
    ) -> Result<(), EngineError> {
        let s = self.get(src)?;
        if rect.is_empty() || !s.bounds().contains_rect(rect) {
            return Err(EngineError::InvalidParameter("rect outside source"));
        }
        Self::check_rows(rect, out.len(), pitch)?;

        for row in 0..rect.h as usize {
            let off = (rect.y as usize + row) * s.width as usize + rect.x as usize;
            let dst_row = &mut out[row * pitch..row * pitch + rect.w as usize * BYTES_PER_PIXEL];
            for (bytes, px) in dst_row
                .chunks_exact_mut(BYTES_PER_PIXEL)
                .zip(&s.pixels[off..off + rect.w as usize])
            {
                bytes.copy_from_slice(&px.to_ne_bytes());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CompositeOp, Vertex};

    fn engine_with(w: u32, h: u32) -> (SoftwareEngine, SurfaceId) {
        let mut e = SoftwareEngine::new();
        let s = e.allocate_surface(w, h, 32).unwrap();
        (e, s)
    }

    #[test]
    fn new_surfaces_are_zero_filled() {
        let (e, s) = engine_with(3, 2);
        assert!(e.pixels(s).unwrap().iter().all(|&p| p == 0));
    }

    #[test]
    fn rejects_non_32_bit_depth() {
        let mut e = SoftwareEngine::new();
        assert!(e.allocate_surface(4, 4, 16).is_none());
    }

    #[test]
    fn budget_refuses_and_free_returns_memory() {
        let mut e = SoftwareEngine::with_budget(64);
        let a = e.allocate_surface(4, 4, 32).unwrap();
        assert!(e.allocate_surface(1, 1, 32).is_none());
        e.free_surface(a);
        assert_eq!(e.allocated_bytes(), 0);
        assert!(e.allocate_surface(1, 1, 32).is_some());
    }

    #[test]
    fn handles_are_not_reused() {
        let mut e = SoftwareEngine::new();
        let a = e.allocate_surface(1, 1, 32).unwrap();
        e.free_surface(a);
        let b = e.allocate_surface(1, 1, 32).unwrap();
        assert_ne!(a, b);
        assert!(e.surface_size(a).is_none());
    }

    #[test]
    fn fill_rect_is_clipped_to_surface() {
        let (mut e, s) = engine_with(4, 4);
        e.fill_rect(s, Rect::new(2, 2, 10, 10), 0xFF00_00FF).unwrap();
        assert_eq!(e.pixel(s, 3, 3), Some(0xFF00_00FF));
        assert_eq!(e.pixel(s, 1, 1), Some(0));
    }

    #[test]
    fn write_then_read_region() {
        let (mut e, s) = engine_with(4, 4);
        let src: Vec<u8> = [0x11u32, 0x22, 0x33, 0x44]
            .iter()
            .flat_map(|p| p.to_ne_bytes())
            .collect();
        e.write_pixels(s, Rect::new(1, 1, 2, 2), &src, 8).unwrap();
        assert_eq!(e.pixel(s, 2, 2), Some(0x44));

        let mut out = vec![0u8; 16];
        e.read_pixels(s, Rect::new(1, 1, 2, 2), &mut out, 8).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn lock_is_exclusive_and_blocks_composite() {
        let mut e = SoftwareEngine::new();
        let src = e.allocate_surface(1, 1, 32).unwrap();
        let dst = e.allocate_surface(2, 2, 32).unwrap();
        {
            let locked = e.lock(src).unwrap();
            assert_eq!(locked.pitch, 4);
            locked.bytes.copy_from_slice(&0xFFFF_FFFFu32.to_ne_bytes());
        }
        assert!(matches!(e.lock(src), Err(EngineError::SurfaceLocked(_))));

        let verts = [
            Vertex::new(0.0, 0.0, 0.0, 0.0),
            Vertex::new(0.0, 2.0, 0.0, 1.0),
            Vertex::new(2.0, 2.0, 1.0, 1.0),
        ];
        let req = CompositeRequest {
            op: CompositeOp::Src,
            src,
            dst,
            src_alpha: 1.0,
            dst_alpha: 1.0,
            clip: Rect::new(0, 0, 2, 2),
            flags: CompositeFlags::empty(),
            vertices: &verts,
            indices: None,
            triangles: 1,
        };
        assert_eq!(e.composite(&req), Err(EngineError::SurfaceLocked(src)));
        e.unlock(src);
        assert_eq!(e.composite(&req), Ok(()));
        assert_eq!(e.pixel(dst, 0, 1), Some(0xFFFF_FFFF));
    }

    #[test]
    fn composite_rejects_oversized_indexed_call() {
        let mut e = SoftwareEngine::new();
        let src = e.allocate_surface(1, 1, 32).unwrap();
        let dst = e.allocate_surface(1, 1, 32).unwrap();
        let req = CompositeRequest {
            op: CompositeOp::Src,
            src,
            dst,
            src_alpha: 1.0,
            dst_alpha: 1.0,
            clip: Rect::new(0, 0, 1, 1),
            flags: CompositeFlags::empty(),
            vertices: &[],
            indices: Some(&[]),
            triangles: 2 * MAX_QUADS + 2,
        };
        assert!(matches!(
            e.composite(&req),
            Err(EngineError::TooManyPrimitives { .. })
        ));
    }

    #[test]
    fn blit_offsets_and_clips() {
        let mut e = SoftwareEngine::new();
        let src = e.allocate_surface(2, 2, 32).unwrap();
        let dst = e.allocate_surface(3, 3, 32).unwrap();
        e.fill_rect(src, Rect::new(0, 0, 2, 2), 0xFF12_3456).unwrap();
        e.blit(src, dst, Rect::new(0, 0, 2, 2), 2, 2).unwrap();
        assert_eq!(e.pixel(dst, 2, 2), Some(0xFF12_3456));
        assert_eq!(e.pixel(dst, 1, 1), Some(0));
    }
}
