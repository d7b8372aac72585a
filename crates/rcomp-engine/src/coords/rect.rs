use super::FPoint;

/// Integer rectangle in target pixels (top-left origin).
///
/// Used for viewport, clip rect, target bounds and rasterized fills.
/// A rectangle with `w <= 0` or `h <= 0` is empty.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    #[inline]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle at the origin covering `width × height`.
    #[inline]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    #[inline]
    pub const fn right(self) -> i32 {
        self.x + self.w
    }

    #[inline]
    pub const fn bottom(self) -> i32 {
        self.y + self.h
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    #[inline]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.w, self.h)
    }

    /// Overlap of both rectangles; `Rect::default()` when they do not overlap.
    #[inline]
    pub fn intersection(self, other: Rect) -> Rect {
        if self.is_empty() || other.is_empty() {
            return Rect::default();
        }

        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());

        if x1 <= x0 || y1 <= y0 {
            Rect::default()
        } else {
            Rect::new(x0, y0, x1 - x0, y1 - y0)
        }
    }

    /// Empty rectangles are contained in everything.
    #[inline]
    pub fn contains_rect(self, other: Rect) -> bool {
        other.is_empty()
            || (other.x >= self.x
                && other.y >= self.y
                && other.right() <= self.right()
                && other.bottom() <= self.bottom())
    }

    /// Half-open containment: [min, max).
    #[inline]
    pub fn contains_point(self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    #[inline]
    pub fn to_frect(self) -> FRect {
        FRect::new(self.x as f32, self.y as f32, self.w as f32, self.h as f32)
    }
}

/// Float rectangle as supplied by callers (source/destination rects).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl FRect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn origin(self) -> FPoint {
        FPoint::new(self.x, self.y)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.w.is_finite() && self.h.is_finite()
    }

    /// Normalizes the rectangle so width/height are non-negative.
    #[inline]
    pub fn normalized(self) -> Self {
        let mut r = self;
        if r.w < 0.0 {
            r.x += r.w;
            r.w = -r.w;
        }
        if r.h < 0.0 {
            r.y += r.h;
            r.h = -r.h;
        }
        r
    }

    /// Snaps to whole pixels the way queued fill rects are: every field is
    /// truncated toward zero and the size is at least one pixel.
    #[inline]
    pub fn to_fill_rect(self) -> Rect {
        Rect::new(
            self.x as i32,
            self.y as i32,
            (self.w as i32).max(1),
            (self.h as i32).max(1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: i32, y: i32, w: i32, h: i32) -> Rect {
        Rect::new(x, y, w, h)
    }

    // ── intersection ──────────────────────────────────────────────────────

    #[test]
    fn intersection_overlapping() {
        let a = r(0, 0, 10, 10);
        let b = r(5, 5, 10, 10);
        assert_eq!(a.intersection(b), r(5, 5, 5, 5));
    }

    #[test]
    fn intersection_contained() {
        let outer = r(0, 0, 100, 100);
        let inner = r(10, 10, 20, 20);
        assert_eq!(outer.intersection(inner), inner);
        assert_eq!(inner.intersection(outer), inner);
    }

    #[test]
    fn intersection_touching_edge_is_empty() {
        let a = r(0, 0, 10, 10);
        let b = r(10, 0, 10, 10);
        assert!(a.intersection(b).is_empty());
    }

    #[test]
    fn intersection_with_empty_is_empty() {
        assert_eq!(r(0, 0, 10, 10).intersection(r(3, 3, 0, 4)), Rect::default());
    }

    // ── containment ───────────────────────────────────────────────────────

    #[test]
    fn contains_rect_edges_inclusive() {
        let outer = r(0, 0, 10, 10);
        assert!(outer.contains_rect(r(0, 0, 10, 10)));
        assert!(!outer.contains_rect(r(1, 0, 10, 10)));
        assert!(outer.contains_rect(Rect::default()));
    }

    #[test]
    fn contains_point_bottom_right_exclusive() {
        let rect = r(0, 0, 10, 10);
        assert!(rect.contains_point(0, 0));
        assert!(rect.contains_point(9, 9));
        assert!(!rect.contains_point(10, 10));
    }

    // ── FRect ─────────────────────────────────────────────────────────────

    #[test]
    fn normalized_negative_width() {
        let n = FRect::new(10.0, 0.0, -4.0, 5.0).normalized();
        assert_eq!(n, FRect::new(6.0, 0.0, 4.0, 5.0));
    }

    #[test]
    fn fill_rect_truncates_and_keeps_one_pixel() {
        assert_eq!(FRect::new(1.9, 2.2, 0.4, 3.7).to_fill_rect(), r(1, 2, 1, 3));
    }
}
