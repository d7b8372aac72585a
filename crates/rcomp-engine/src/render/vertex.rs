//! Quad vertex construction for copy commands.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::coords::{FPoint, FRect};
use crate::engine::{MAX_QUADS, Vertex};

// ── index table ───────────────────────────────────────────────────────────

/// Indices for `MAX_QUADS` quads laid out as `(v0, v1, v2)` + `(v2, v3, v0)`.
///
/// Built once per process and shared read-only by every renderer.
static QUAD_INDICES: Lazy<Vec<u16>> = Lazy::new(|| {
    (0..MAX_QUADS as u16)
        .flat_map(|q| {
            let v = q * 4;
            [v, v + 1, v + 2, v + 2, v + 3, v]
        })
        .collect()
});

/// Index slice covering the first `quads` quads (capped at `MAX_QUADS`).
#[inline]
pub fn quad_indices(quads: usize) -> &'static [u16] {
    &QUAD_INDICES[..quads.min(MAX_QUADS) * 6]
}

// ── transform ─────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipMode {
    #[default]
    None,
    Horizontal,
    Vertical,
}

/// Rotation (degrees, clockwise with +Y down), flip and scale for one quad.
///
/// `center` is in destination space here; `CommandList::push_copy_ex`
/// takes it relative to the destination rect.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QuadTransform {
    pub angle: f64,
    pub center: FPoint,
    pub flip: FlipMode,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Default for QuadTransform {
    fn default() -> Self {
        Self {
            angle: 0.0,
            center: FPoint::zero(),
            flip: FlipMode::None,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

// ── builder ───────────────────────────────────────────────────────────────

/// Builds the four vertices of a textured quad.
///
/// ```text
/// v0-v3
/// | \ |
/// v1-v2
/// ```
///
/// Rotation about `center` is applied first, then scaling about the origin.
pub fn build_quad(src: FRect, dst: FRect, xf: &QuadTransform) -> [Vertex; 4] {
    let mut left = src.x;
    let mut right = src.x + src.w;
    let mut top = src.y;
    let mut bottom = src.y + src.h;

    match xf.flip {
        FlipMode::None => {}
        FlipMode::Horizontal => std::mem::swap(&mut left, &mut right),
        FlipMode::Vertical => std::mem::swap(&mut top, &mut bottom),
    }

    let x0 = dst.x;
    let y0 = dst.y;
    let x1 = dst.x + dst.w;
    let y1 = dst.y + dst.h;

    let mut quad = [
        Vertex::new(x0, y0, left, top),
        Vertex::new(x0, y1, left, bottom),
        Vertex::new(x1, y1, right, bottom),
        Vertex::new(x1, y0, right, top),
    ];

    if xf.angle != 0.0 {
        rotate(&mut quad, xf.angle, xf.center);
    }

    if xf.scale_x != 1.0 || xf.scale_y != 1.0 {
        for v in &mut quad {
            v.x *= xf.scale_x;
            v.y *= xf.scale_y;
        }
    }

    quad
}

fn rotate(quad: &mut [Vertex; 4], angle: f64, center: FPoint) {
    let rad = angle.to_radians();
    let (sin, cos) = (rad.sin() as f32, rad.cos() as f32);

    for v in quad {
        let x = v.x - center.x;
        let y = v.y - center.y;
        v.x = x * cos - y * sin + center.x;
        v.y = x * sin + y * cos + center.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: FRect = FRect::new(1.0, 2.0, 3.0, 4.0);
    const DST: FRect = FRect::new(10.0, 20.0, 30.0, 40.0);

    fn positions(q: &[Vertex; 4]) -> [(f32, f32); 4] {
        q.map(|v| (v.x, v.y))
    }

    fn uvs(q: &[Vertex; 4]) -> [(f32, f32); 4] {
        q.map(|v| (v.s, v.t))
    }

    // ── layout ────────────────────────────────────────────────────────────

    #[test]
    fn plain_quad_layout() {
        let q = build_quad(SRC, DST, &QuadTransform::default());
        assert_eq!(
            positions(&q),
            [(10.0, 20.0), (10.0, 60.0), (40.0, 60.0), (40.0, 20.0)]
        );
        assert_eq!(uvs(&q), [(1.0, 2.0), (1.0, 6.0), (4.0, 6.0), (4.0, 2.0)]);
        assert!(q.iter().all(|v| v.w == 1.0));
    }

    #[test]
    fn zero_angle_matches_unrotated_positions() {
        let xf = QuadTransform {
            angle: 0.0,
            center: FPoint::new(25.0, 40.0),
            ..QuadTransform::default()
        };
        let plain = build_quad(SRC, DST, &QuadTransform::default());
        assert_eq!(positions(&build_quad(SRC, DST, &xf)), positions(&plain));
    }

    // ── flips ─────────────────────────────────────────────────────────────

    #[test]
    fn horizontal_flip_swaps_left_right_only() {
        let plain = build_quad(SRC, DST, &QuadTransform::default());
        let xf = QuadTransform {
            flip: FlipMode::Horizontal,
            ..QuadTransform::default()
        };
        let flipped = build_quad(SRC, DST, &xf);
        assert_eq!(positions(&flipped), positions(&plain));
        assert_eq!(
            uvs(&flipped),
            [(4.0, 2.0), (4.0, 6.0), (1.0, 6.0), (1.0, 2.0)]
        );
    }

    #[test]
    fn vertical_flip_swaps_top_bottom_only() {
        let plain = build_quad(SRC, DST, &QuadTransform::default());
        let xf = QuadTransform {
            flip: FlipMode::Vertical,
            ..QuadTransform::default()
        };
        let flipped = build_quad(SRC, DST, &xf);
        assert_eq!(positions(&flipped), positions(&plain));
        assert_eq!(
            uvs(&flipped),
            [(1.0, 6.0), (1.0, 2.0), (4.0, 2.0), (4.0, 6.0)]
        );
    }

    // ── rotation & scale ──────────────────────────────────────────────────

    #[test]
    fn quarter_turn_about_center() {
        let dst = FRect::new(0.0, 0.0, 2.0, 2.0);
        let xf = QuadTransform {
            angle: 90.0,
            center: FPoint::new(1.0, 1.0),
            ..QuadTransform::default()
        };
        let q = build_quad(SRC, dst, &xf);
        // Clockwise on screen: top-left moves to top-right.
        assert!((q[0].x - 2.0).abs() < 1e-5 && q[0].y.abs() < 1e-5);
        assert_eq!(uvs(&q), uvs(&build_quad(SRC, dst, &QuadTransform::default())));
    }

    #[test]
    fn scale_applies_after_rotation() {
        let dst = FRect::new(0.0, 0.0, 2.0, 2.0);
        let xf = QuadTransform {
            angle: 90.0,
            center: FPoint::new(1.0, 1.0),
            scale_x: 3.0,
            scale_y: 0.5,
            ..QuadTransform::default()
        };
        let q = build_quad(SRC, dst, &xf);
        assert!((q[0].x - 6.0).abs() < 1e-5 && q[0].y.abs() < 1e-5);
    }

    // ── indices ───────────────────────────────────────────────────────────

    #[test]
    fn index_table_pattern() {
        assert_eq!(quad_indices(2), &[0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
        assert_eq!(quad_indices(MAX_QUADS + 5).len(), 6 * MAX_QUADS);
    }
}
