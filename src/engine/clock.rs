//! Frame timing.

use std::time::Instant;

/// Elapsed time and per-frame delta from host timestamps.
///
/// Timestamps are seconds on any monotonic timeline. A timestamp earlier
/// than the previous one yields a zero delta and leaves elapsed time where
/// it was.
#[derive(Debug, Clone)]
pub struct FrameClock {
    first_frame_delta: f64,
    start: Option<f64>,
    previous: f64,
    ticks: u64,
}

impl FrameClock {
    /// `first_frame_delta` is reported by the first tick, which has no
    /// previous sample to measure against.
    pub fn new(first_frame_delta: f64) -> Self {
        let first_frame_delta = if first_frame_delta.is_finite() {
            first_frame_delta.max(0.0)
        } else {
            0.0
        };
        Self {
            first_frame_delta,
            start: None,
            previous: 0.0,
            ticks: 0,
        }
    }

    /// Record a frame at `now` and return the delta since the previous one.
    pub fn tick(&mut self, now: f64) -> f64 {
        if !now.is_finite() {
            return 0.0;
        }
        self.ticks += 1;
        if self.start.is_none() {
            self.start = Some(now);
            self.previous = now;
            return self.first_frame_delta;
        }
        let delta = (now - self.previous).max(0.0);
        self.previous = self.previous.max(now);
        delta
    }

    /// Seconds between the first tick and the latest one.
    pub fn elapsed(&self) -> f64 {
        self.start.map_or(0.0, |start| self.previous - start)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Wall-clock timestamps in seconds since construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }

    pub fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_reports_configured_delta() {
        let mut clock = FrameClock::new(0.0);
        assert_eq!(clock.tick(12.5), 0.0);
        assert_eq!(clock.elapsed(), 0.0);

        let mut clock = FrameClock::new(1.0 / 60.0);
        assert_eq!(clock.tick(3.0), 1.0 / 60.0);
    }

    #[test]
    fn test_delta_and_elapsed() {
        let mut clock = FrameClock::default();
        clock.tick(1.0);
        assert_eq!(clock.tick(1.25), 0.25);
        assert_eq!(clock.tick(2.0), 0.75);
        assert_eq!(clock.elapsed(), 1.0);
        assert_eq!(clock.ticks(), 3);
    }

    #[test]
    fn test_backwards_and_non_finite_timestamps() {
        let mut clock = FrameClock::default();
        clock.tick(5.0);
        clock.tick(6.0);
        assert_eq!(clock.tick(4.0), 0.0);
        assert_eq!(clock.elapsed(), 1.0);
        assert_eq!(clock.tick(f64::NAN), 0.0);
        // Measured from the latest good sample, not the bogus one.
        assert_eq!(clock.tick(6.5), 0.5);
    }

    #[test]
    fn test_negative_first_frame_delta_clamped() {
        let mut clock = FrameClock::new(-1.0);
        assert_eq!(clock.tick(0.0), 0.0);
    }

    #[test]
    fn test_monotonic_clock_never_goes_back() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
