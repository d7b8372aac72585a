use crate::coords::Rect;

use super::{
    CompositeFlags, CompositeOp, CompositeRequest, CompositingEngine, EngineError, LockedPixels,
    SoftwareEngine, SurfaceId,
};

/// One call observed by `RecordingEngine`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Allocate {
        width: u32,
        height: u32,
        surface: Option<SurfaceId>,
    },
    Free(SurfaceId),
    Composite {
        op: CompositeOp,
        src: SurfaceId,
        dst: SurfaceId,
        triangles: usize,
        indexed: bool,
        flags: CompositeFlags,
        clip: Rect,
        src_alpha: f32,
    },
    Blit {
        src: SurfaceId,
        dst: SurfaceId,
        src_rect: Rect,
        dst_x: i32,
        dst_y: i32,
    },
    Lock(SurfaceId),
    Unlock(SurfaceId),
    FillRect {
        dst: SurfaceId,
        rect: Rect,
        argb: u32,
    },
    WritePixels {
        dst: SurfaceId,
        rect: Rect,
    },
    ReadPixels {
        src: SurfaceId,
        rect: Rect,
    },
}

/// Engine wrapper that records every call before forwarding it.
///
/// Used by tests to assert call counts, parameters and ordering. It can also
/// inject composite failures to exercise the non-fatal failure path.
#[derive(Debug, Default)]
pub struct RecordingEngine<E = SoftwareEngine> {
    inner: E,
    calls: Vec<EngineCall>,
    fail_composites: usize,
}

impl<E: CompositingEngine> RecordingEngine<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            calls: Vec::new(),
            fail_composites: 0,
        }
    }

    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<EngineCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Recorded composite calls as `(triangles, flags)` pairs, in order.
    pub fn composite_calls(&self) -> Vec<(usize, CompositeFlags)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::Composite {
                    triangles, flags, ..
                } => Some((*triangles, *flags)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Makes the next `n` composite calls fail with `EngineError::Rejected`.
    /// Failed calls are still recorded.
    pub fn fail_next_composites(&mut self, n: usize) {
        self.fail_composites = n;
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.inner
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: CompositingEngine> CompositingEngine for RecordingEngine<E> {
    fn allocate_surface(&mut self, width: u32, height: u32, depth: u32) -> Option<SurfaceId> {
        let surface = self.inner.allocate_surface(width, height, depth);
        self.calls.push(EngineCall::Allocate {
            width,
            height,
            surface,
        });
        surface
    }

    fn free_surface(&mut self, surface: SurfaceId) {
        self.calls.push(EngineCall::Free(surface));
        self.inner.free_surface(surface);
    }

    fn surface_size(&self, surface: SurfaceId) -> Option<(u32, u32)> {
        self.inner.surface_size(surface)
    }

    fn composite(&mut self, request: &CompositeRequest<'_>) -> Result<(), EngineError> {
        self.calls.push(EngineCall::Composite {
            op: request.op,
            src: request.src,
            dst: request.dst,
            triangles: request.triangles,
            indexed: request.indices.is_some(),
            flags: request.flags,
            clip: request.clip,
            src_alpha: request.src_alpha,
        });
        if self.fail_composites > 0 {
            self.fail_composites -= 1;
            return Err(EngineError::Rejected(-1));
        }
        self.inner.composite(request)
    }

    fn blit(
        &mut self,
        src: SurfaceId,
        dst: SurfaceId,
        src_rect: Rect,
        dst_x: i32,
        dst_y: i32,
    ) -> Result<(), EngineError> {
        self.calls.push(EngineCall::Blit {
            src,
            dst,
            src_rect,
            dst_x,
            dst_y,
        });
        self.inner.blit(src, dst, src_rect, dst_x, dst_y)
    }

    fn lock(&mut self, surface: SurfaceId) -> Result<LockedPixels<'_>, EngineError> {
        self.calls.push(EngineCall::Lock(surface));
        self.inner.lock(surface)
    }

    fn unlock(&mut self, surface: SurfaceId) {
        self.calls.push(EngineCall::Unlock(surface));
        self.inner.unlock(surface);
    }

    fn fill_rect(&mut self, dst: SurfaceId, rect: Rect, argb: u32) -> Result<(), EngineError> {
        self.calls.push(EngineCall::FillRect { dst, rect, argb });
        self.inner.fill_rect(dst, rect, argb)
    }

    fn write_pixels(
        &mut self,
        dst: SurfaceId,
        rect: Rect,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<(), EngineError> {
        self.calls.push(EngineCall::WritePixels { dst, rect });
        self.inner.write_pixels(dst, rect, pixels, pitch)
    }

    fn read_pixels(
        &mut self,
        src: SurfaceId,
        rect: Rect,
        out: &mut [u8],
        pitch: usize,
    ) -> Result<(), EngineError> {
        self.calls.push(EngineCall::ReadPixels { src, rect });
        self.inner.read_pixels(src, rect, out, pitch)
    }
}
