use std::time::{Duration, Instant};

/// Simulated vertical-blank clock.
///
/// `wait` blocks until the next refresh boundary, then advances it by one
/// interval. Boundaries missed while the caller was busy are skipped rather
/// than replayed.
#[derive(Debug, Clone)]
pub struct VblankPacer {
    interval: Duration,
    next: Instant,
    frame_index: u64,
}

impl VblankPacer {
    /// Pacer for a display refreshing at `hz`. Zero disables waiting.
    pub fn new(hz: u32) -> Self {
        let interval = if hz == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / hz
        };
        Self::with_interval(interval)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now() + interval,
            frame_index: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of completed waits.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Resets the boundary baseline to now.
    pub fn reset(&mut self) {
        self.next = Instant::now() + self.interval;
    }

    /// Blocks until the next vertical blank.
    pub fn wait(&mut self) {
        self.frame_index = self.frame_index.wrapping_add(1);
        if self.interval.is_zero() {
            return;
        }

        let now = Instant::now();
        if now < self.next {
            std::thread::sleep(self.next - now);
            self.next += self.interval;
        } else {
            // Late: realign to the first boundary after now.
            let behind = now.saturating_duration_since(self.next);
            let skipped = (behind.as_nanos() / self.interval.as_nanos()) as u32 + 1;
            self.next += self.interval * skipped;
        }
    }
}

impl Default for VblankPacer {
    fn default() -> Self {
        Self::new(60)
    }
}
