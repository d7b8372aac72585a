//! CPU triangle rasterization and per-pixel compositing for `SoftwareEngine`.

use crate::coords::Rect;

use super::{CompositeFlags, CompositeOp, Vertex};

/// Read-only view of a source surface.
pub(super) struct Sampler<'a> {
    pub pixels: &'a [u32],
    pub width: u32,
    pub height: u32,
    pub filter: bool,
}

impl Sampler<'_> {
    /// Samples at texel-space `(s, t)`; texel centers sit at `+0.5`.
    #[inline]
    pub fn sample(&self, s: f32, t: f32) -> u32 {
        if self.filter {
            self.sample_bilinear(s, t)
        } else {
            self.texel(s.floor() as i32, t.floor() as i32)
        }
    }

    /// Edge-clamped texel fetch.
    #[inline]
    fn texel(&self, x: i32, y: i32) -> u32 {
        let x = x.clamp(0, self.width as i32 - 1) as usize;
        let y = y.clamp(0, self.height as i32 - 1) as usize;
        self.pixels[y * self.width as usize + x]
    }

    fn sample_bilinear(&self, s: f32, t: f32) -> u32 {
        let u = s - 0.5;
        let v = t - 0.5;
        let x0 = u.floor();
        let y0 = v.floor();
        let fx = u - x0;
        let fy = v - y0;
        let (x0, y0) = (x0 as i32, y0 as i32);

        let c00 = self.texel(x0, y0);
        let c10 = self.texel(x0 + 1, y0);
        let c01 = self.texel(x0, y0 + 1);
        let c11 = self.texel(x0 + 1, y0 + 1);

        let mut out = 0u32;
        for shift in [0u32, 8, 16, 24] {
            let ch = |c: u32| ((c >> shift) & 0xFF) as f32;
            let top = ch(c00) + (ch(c10) - ch(c00)) * fx;
            let bottom = ch(c01) + (ch(c11) - ch(c01)) * fx;
            let value = (top + (bottom - top) * fy).round().clamp(0.0, 255.0) as u32;
            out |= value << shift;
        }
        out
    }
}

/// Per-pixel compositing state derived from a request.
#[derive(Debug, Copy, Clone)]
pub(super) struct PixelOp {
    op: CompositeOp,
    /// Source alpha multiplier scaled to `0..=255`.
    alpha_mul: u32,
    override_src_alpha: bool,
    ignore_dst_alpha: bool,
}

impl PixelOp {
    pub fn new(op: CompositeOp, src_alpha: f32, flags: CompositeFlags) -> Self {
        Self {
            op,
            alpha_mul: (src_alpha.clamp(0.0, 1.0) * 255.0).round() as u32,
            override_src_alpha: flags.contains(CompositeFlags::SRC_ALPHA_OVERRIDE),
            ignore_dst_alpha: flags.contains(CompositeFlags::IGNORE_DEST_ALPHA),
        }
    }

    #[inline]
    pub fn apply(self, dst: u32, src: u32) -> u32 {
        let sa = if self.override_src_alpha { 255 } else { src >> 24 };
        let a = div255(sa * self.alpha_mul);
        let da = if self.ignore_dst_alpha { 255 } else { dst >> 24 };

        match self.op {
            CompositeOp::Src => (a << 24) | (src & 0x00FF_FFFF),
            CompositeOp::SrcOverDest => {
                let inv = 255 - a;
                let out_a = a + div255(da * inv);
                let mut out = out_a << 24;
                for shift in [0u32, 8, 16] {
                    let sc = (src >> shift) & 0xFF;
                    let dc = (dst >> shift) & 0xFF;
                    out |= div255(sc * a + dc * inv) << shift;
                }
                out
            }
            CompositeOp::Plus => {
                let out_a = (da + a).min(255);
                let mut out = out_a << 24;
                for shift in [0u32, 8, 16] {
                    let sc = (src >> shift) & 0xFF;
                    let dc = (dst >> shift) & 0xFF;
                    out |= (dc + div255(sc * a)).min(255) << shift;
                }
                out
            }
        }
    }
}

/// Rounded `x / 255` for `x <= 255 * 255`.
#[inline]
fn div255(x: u32) -> u32 {
    (x + 127) / 255
}

#[inline]
fn edge(a: &Vertex, b: &Vertex, px: f32, py: f32) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

/// Top-left rule on the orientation-normalized edge `a -> b`: of two
/// triangles sharing an edge exactly one owns pixels centered on it.
#[inline]
fn owns_edge(a: &Vertex, b: &Vertex, sign: f32) -> bool {
    let dx = (b.x - a.x) * sign;
    let dy = (b.y - a.y) * sign;
    dy < 0.0 || (dy == 0.0 && dx > 0.0)
}

#[inline]
fn covered(w: f32, owns: bool) -> bool {
    w > 0.0 || (w == 0.0 && owns)
}

/// Rasterizes one textured triangle into `dst` (row-major, `dst_width`
/// pixels per row), sampling at pixel centers and writing only inside `clip`.
///
/// `clip` must already be intersected with the destination bounds.
pub(super) fn fill_triangle(
    dst: &mut [u32],
    dst_width: u32,
    clip: Rect,
    tri: [Vertex; 3],
    sampler: &Sampler<'_>,
    pixel_op: PixelOp,
) {
    let [v0, v1, v2] = tri;

    let area = edge(&v0, &v1, v2.x, v2.y);
    if area == 0.0 || !area.is_finite() {
        return;
    }
    let sign = area.signum();
    let inv_area = 1.0 / area.abs();

    let own0 = owns_edge(&v1, &v2, sign);
    let own1 = owns_edge(&v2, &v0, sign);
    let own2 = owns_edge(&v0, &v1, sign);

    let min_x = (v0.x.min(v1.x).min(v2.x).floor() as i32).max(clip.x);
    let max_x = (v0.x.max(v1.x).max(v2.x).ceil() as i32).min(clip.right());
    let min_y = (v0.y.min(v1.y).min(v2.y).floor() as i32).max(clip.y);
    let max_y = (v0.y.max(v1.y).max(v2.y).ceil() as i32).min(clip.bottom());
    if min_x >= max_x || min_y >= max_y {
        return;
    }

    let row = dst_width as usize;
    for y in min_y..max_y {
        let py = y as f32 + 0.5;
        for x in min_x..max_x {
            let px = x as f32 + 0.5;
            let w0 = edge(&v1, &v2, px, py) * sign;
            let w1 = edge(&v2, &v0, px, py) * sign;
            let w2 = edge(&v0, &v1, px, py) * sign;
            if !(covered(w0, own0) && covered(w1, own1) && covered(w2, own2)) {
                continue;
            }

            let (b0, b1, b2) = (w0 * inv_area, w1 * inv_area, w2 * inv_area);
            let s = v0.s * b0 + v1.s * b1 + v2.s * b2;
            let t = v0.t * b0 + v1.t * b1 + v2.t * b2;

            let idx = y as usize * row + x as usize;
            dst[idx] = pixel_op.apply(dst[idx], sampler.sample(s, t));
        }
    }
}
