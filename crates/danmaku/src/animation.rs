//! Frame-driven linear animation.
//!
//! The host calls into the engine once per frame with a monotonic timestamp.
//! [`FrameClock`] turns those timestamps into deltas and every in-flight element
//! owns a [`LinearAnimation`] record that is advanced by that delta.

use std::time::Duration;

/// Converts monotonic frame timestamps into per-frame deltas.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    last: Option<Duration>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame at `now` and return the time since the previous frame.
    ///
    /// The first frame yields a zero delta. Timestamps that go backwards are
    /// treated as zero progress.
    pub fn delta(&mut self, now: Duration) -> Duration {
        match self.last {
            None => {
                self.last = Some(now);
                Duration::ZERO
            }
            Some(last) if now > last => {
                self.last = Some(now);
                now - last
            }
            Some(_) => Duration::ZERO,
        }
    }

    /// Timestamp of the most recent frame, if any.
    pub fn last(&self) -> Option<Duration> {
        self.last
    }
}

/// Outcome of advancing an animation by one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Animation still in progress, at the given value.
    Running(i32),
    /// Animation reached its end value on this frame.
    Finished(i32),
}

/// Linear integer interpolation from `from` to `to` over `duration`.
///
/// The animation starts on the first frame it sees, so time spent between
/// registration and the next frame does not count against it.
#[derive(Debug, Clone)]
pub struct LinearAnimation {
    from: i32,
    to: i32,
    duration: Duration,
    elapsed: Duration,
    started: bool,
}

impl LinearAnimation {
    pub fn new(from: i32, to: i32, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
            started: false,
        }
    }

    /// Advance by `dt` and report the new value.
    pub fn advance(&mut self, dt: Duration) -> Step {
        if self.started {
            self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
        } else {
            self.started = true;
        }

        let value = self.value();
        if self.is_finished() {
            Step::Finished(value)
        } else {
            Step::Running(value)
        }
    }

    /// Fraction of the duration that has elapsed, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    /// Current value. The offset from `from` truncates toward zero.
    pub fn value(&self) -> i32 {
        if self.duration.is_zero() {
            return self.to;
        }
        let span = i128::from(self.to) - i128::from(self.from);
        let offset = span * self.elapsed.as_nanos() as i128 / self.duration.as_nanos() as i128;
        (i128::from(self.from) + offset) as i32
    }

    pub fn is_finished(&self) -> bool {
        self.started && self.elapsed >= self.duration
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn end(&self) -> i32 {
        self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_frame_clock_deltas() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.delta(ms(100)), Duration::ZERO);
        assert_eq!(clock.delta(ms(116)), ms(16));
        // Going backwards is ignored
        assert_eq!(clock.delta(ms(50)), Duration::ZERO);
        assert_eq!(clock.delta(ms(132)), ms(16));
        assert_eq!(clock.last(), Some(ms(132)));
    }

    #[test]
    fn test_linear_progress() {
        let mut anim = LinearAnimation::new(1920, -80, ms(10_000));

        // First frame only starts the animation
        assert_eq!(anim.advance(ms(500)), Step::Running(1920));
        assert_eq!(anim.advance(ms(5_000)), Step::Running(920));
        assert_eq!(anim.advance(ms(2_500)), Step::Running(420));
        assert_eq!(anim.advance(ms(2_500)), Step::Finished(-80));
        assert!(anim.is_finished());
    }

    #[test]
    fn test_overshoot_clamps_to_end() {
        let mut anim = LinearAnimation::new(100, 0, ms(1_000));
        anim.advance(Duration::ZERO);
        assert_eq!(anim.advance(ms(5_000)), Step::Finished(0));
        assert_eq!(anim.fraction(), 1.0);
    }

    #[test]
    fn test_zero_duration_finishes_on_first_frame() {
        let mut anim = LinearAnimation::new(10, -10, Duration::ZERO);
        assert!(!anim.is_finished());
        assert_eq!(anim.advance(Duration::ZERO), Step::Finished(-10));
    }

    #[test]
    fn test_constant_speed() {
        let mut anim = LinearAnimation::new(1000, 0, ms(1_000));
        anim.advance(Duration::ZERO);

        let mut previous = anim.value();
        for _ in 0..9 {
            let Step::Running(value) = anim.advance(ms(100)) else {
                panic!("finished early");
            };
            assert_eq!(previous - value, 100);
            previous = value;
        }
    }
}
