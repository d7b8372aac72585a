use core::ops::{Add, Sub};

/// 2D point in target pixels (float).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FPoint {
    pub x: f32,
    pub y: f32,
}

impl FPoint {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Truncates toward zero, matching how queued points are snapped to pixels.
    #[inline]
    pub fn truncate(self) -> Point {
        Point::new(self.x as i32, self.y as i32)
    }
}

impl Add for FPoint {
    type Output = FPoint;
    #[inline]
    fn add(self, rhs: FPoint) -> FPoint {
        FPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for FPoint {
    type Output = FPoint;
    #[inline]
    fn sub(self, rhs: FPoint) -> FPoint {
        FPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Integer pixel position.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}
