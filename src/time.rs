//! Frame-rate measurement.
//!
//! [`FrameClock`] counts frames (or ticks, in headless runs) and refreshes a
//! rate estimate at a fixed interval, so the window title and the headless
//! log line update smoothly instead of every frame.
//!
//! # Example
//!
//! ```
//! use physarum::time::FrameClock;
//!
//! let mut clock = FrameClock::new();
//! clock.frame();
//! assert_eq!(clock.frames(), 1);
//! ```

use std::time::{Duration, Instant};

/// Counts frames and estimates frames per second.
#[derive(Debug)]
pub struct FrameClock {
    start: Instant,
    frames: u64,
    rate: f32,
    /// Frame count at the last rate update.
    window_frames: u64,
    window_start: Instant,
    interval: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_interval(Duration::from_millis(500))
    }

    /// Clock whose rate estimate refreshes every `interval`.
    pub fn with_interval(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            frames: 0,
            rate: 0.0,
            window_frames: 0,
            window_start: now,
            interval,
        }
    }

    /// Record one frame. Returns the new rate when the estimate refreshed.
    pub fn frame(&mut self) -> Option<f32> {
        self.frame_at(Instant::now())
    }

    fn frame_at(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let window = now.duration_since(self.window_start);
        if window < self.interval {
            return None;
        }
        let counted = self.frames - self.window_frames;
        self.rate = counted as f32 / window.as_secs_f32().max(f32::EPSILON);
        self.window_frames = self.frames;
        self.window_start = now;
        Some(self.rate)
    }

    /// Latest rate estimate (0 until the first interval has passed).
    #[inline]
    pub fn fps(&self) -> f32 {
        self.rate
    }

    /// Frames recorded since creation.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Wall time since creation.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Window title showing the current rate.
    pub fn title(&self, name: &str) -> String {
        format!("{} | fps: {:.1}", name, self.rate)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_new() {
        let clock = FrameClock::new();
        assert_eq!(clock.frames(), 0);
        assert_eq!(clock.fps(), 0.0);
    }

    #[test]
    fn test_rate_refreshes_after_interval() {
        let mut clock = FrameClock::with_interval(Duration::from_secs(1));
        let t0 = clock.window_start;
        for i in 1..10 {
            assert_eq!(clock.frame_at(t0 + Duration::from_millis(i * 100)), None);
        }
        let rate = clock.frame_at(t0 + Duration::from_secs(1)).unwrap();
        assert!((rate - 10.0).abs() < 1e-3);
        assert_eq!(clock.frames(), 10);
    }

    #[test]
    fn test_title_format() {
        let mut clock = FrameClock::with_interval(Duration::from_secs(2));
        let t0 = clock.window_start;
        for i in 1..=120 {
            clock.frame_at(t0 + Duration::from_millis(i * 1000 / 60));
        }
        assert_eq!(clock.title("physarum"), "physarum | fps: 60.0");
    }
}
