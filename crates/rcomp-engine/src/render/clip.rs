//! Clip rect / viewport tracking across a command queue.

use crate::coords::{Point, Rect};

/// Snapshot of the tracked clip state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClipState {
    pub viewport: Rect,
    /// Effective clip in target pixels; always inside `viewport` and the target.
    pub clip_rect: Rect,
    pub clip_enabled: bool,
}

/// Maintains `clip_rect` as the intersection of the latest viewport, clip
/// rect and target bounds.
///
/// A request that leaves the effective state unchanged is a no-op.
#[derive(Debug, Clone)]
pub struct ClipTracker {
    bounds: Rect,
    state: ClipState,
}

impl ClipTracker {
    /// Tracker for a target of `bounds`: full viewport, clipping disabled.
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            state: ClipState {
                viewport: bounds,
                clip_rect: bounds,
                clip_enabled: false,
            },
        }
    }

    /// Rebinds to a new target, discarding viewport and clip.
    pub fn reset(&mut self, bounds: Rect) {
        *self = Self::new(bounds);
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[inline]
    pub fn state(&self) -> ClipState {
        self.state
    }

    #[inline]
    pub fn clip_rect(&self) -> Rect {
        self.state.clip_rect
    }

    /// Offset applied to point, rect and vertex positions.
    #[inline]
    pub fn viewport_offset(&self) -> Point {
        Point::new(self.state.viewport.x, self.state.viewport.y)
    }

    /// Returns `false` when `rect` is already the viewport.
    pub fn set_viewport(&mut self, rect: Rect) -> bool {
        if rect == self.state.viewport {
            return false;
        }

        self.state.viewport = rect;
        if !self.state.clip_enabled {
            self.state.clip_rect = self.bounds;
        }
        self.state.clip_rect = self.constrain(self.state.clip_rect);
        debug_assert!(self.holds_invariant());
        true
    }

    /// `rect` is relative to the viewport origin and ignored when disabling.
    /// Returns `false` when the effective clip would not change.
    pub fn set_clip_rect(&mut self, rect: Rect, enabled: bool) -> bool {
        let vp = self.state.viewport;
        let clip_rect = if enabled {
            self.constrain(rect.offset(vp.x, vp.y))
        } else {
            self.constrain(self.bounds)
        };
        if enabled == self.state.clip_enabled && clip_rect == self.state.clip_rect {
            return false;
        }

        self.state.clip_enabled = enabled;
        self.state.clip_rect = clip_rect;
        debug_assert!(self.holds_invariant());
        true
    }

    /// `clip_rect ⊆ viewport` and `clip_rect ⊆ bounds`.
    pub fn holds_invariant(&self) -> bool {
        self.state.viewport.contains_rect(self.state.clip_rect)
            && self.bounds.contains_rect(self.state.clip_rect)
    }

    fn constrain(&self, rect: Rect) -> Rect {
        rect.intersection(self.state.viewport)
            .intersection(self.bounds)
    }
}
