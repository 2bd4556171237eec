//! Animation clock with time dilation
//!
//! Maps a simulated date range onto a wall-clock animation length. The
//! clock only tracks "now"; satellite state is re-derived from it each tick.

use chrono::{DateTime, TimeZone, Utc};

use crate::TimeScale;

const MIN_SPEED: f64 = 0.01;
const MAX_SPEED: f64 = 1000.0;

/// Direction of a discontinuous jump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockJump {
    None,
    Forward,
    /// Scrubbed backwards: every satellite needs a full re-evaluation
    Rewind,
}

/// Simulated-time playback clock
#[derive(Debug, Clone)]
pub struct AnimationClock {
    start_ms: f64,
    end_ms: f64,
    /// Wall-clock length of a full playback at speed 1
    animation_ms: f64,
    current_ms: f64,
    speed: f64,
    playing: bool,
}

impl AnimationClock {
    /// Clock over `[start, end]` that plays in `animation` wall time
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, animation: std::time::Duration) -> Self {
        Self::from_millis(
            start.timestamp_millis() as f64,
            end.timestamp_millis() as f64,
            animation.as_secs_f64() * 1000.0,
        )
    }

    pub fn from_millis(start_ms: f64, end_ms: f64, animation_ms: f64) -> Self {
        let end_ms = end_ms.max(start_ms);
        Self {
            start_ms,
            end_ms,
            animation_ms: animation_ms.max(1.0),
            current_ms: start_ms,
            speed: 1.0,
            playing: false,
        }
    }

    /// Base screen-to-simulated ratio (speed 1).
    ///
    /// Hold/fade/reveal durations stay tied to this ratio so speed changes
    /// don't stretch them.
    pub fn time_scale(&self) -> TimeScale {
        TimeScale::new(self.end_ms - self.start_ms, self.animation_ms)
    }

    pub fn current_ms(&self) -> f64 {
        self.current_ms
    }

    /// Current simulated time, clamped to the range `DateTime` can hold
    pub fn current(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.current_ms as i64)
            .single()
            .unwrap_or(if self.current_ms > 0.0 {
                DateTime::<Utc>::MAX_UTC
            } else {
                DateTime::<Utc>::MIN_UTC
            })
    }

    pub fn start_ms(&self) -> f64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> f64 {
        self.end_ms
    }

    pub fn play(&mut self) {
        if self.is_finished() {
            self.current_ms = self.start_ms;
        }
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_finished(&self) -> bool {
        self.current_ms >= self.end_ms
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Playback multiplier, clamped to [0.01, 1000]
    pub fn set_speed(&mut self, speed: f64) {
        if speed.is_finite() {
            self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        }
    }

    /// Advance by real elapsed milliseconds. Stops at the end of the range.
    pub fn tick(&mut self, real_dt_ms: f64) -> f64 {
        if !self.playing || !real_dt_ms.is_finite() || real_dt_ms <= 0.0 {
            return self.current_ms;
        }

        let step = self.time_scale().screen_to_sim(real_dt_ms) * self.speed;
        self.current_ms = (self.current_ms + step).min(self.end_ms);
        if self.is_finished() {
            self.playing = false;
        }
        self.current_ms
    }

    /// Jump to an absolute simulated time (clamped to the range)
    pub fn seek(&mut self, t_ms: f64) -> ClockJump {
        if t_ms.is_nan() {
            return ClockJump::None;
        }
        let target = t_ms.clamp(self.start_ms, self.end_ms);
        let jump = if target < self.current_ms {
            ClockJump::Rewind
        } else if target > self.current_ms {
            ClockJump::Forward
        } else {
            ClockJump::None
        };
        self.current_ms = target;
        jump
    }

    /// Jump to a fraction of the range
    pub fn seek_fraction(&mut self, fraction: f64) -> ClockJump {
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        self.seek(self.start_ms + (self.end_ms - self.start_ms) * fraction)
    }

    pub fn restart(&mut self) -> ClockJump {
        self.seek(self.start_ms)
    }

    /// Position in the range, [0, 1]
    pub fn progress(&self) -> f64 {
        let span = self.end_ms - self.start_ms;
        if span <= 0.0 {
            1.0
        } else {
            ((self.current_ms - self.start_ms) / span).clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MS_PER_DAY;

    fn clock() -> AnimationClock {
        // 100 simulated days in 10 seconds: 10 days per screen second
        AnimationClock::from_millis(0.0, 100.0 * MS_PER_DAY, 10_000.0)
    }

    #[test]
    fn test_current_clamps_out_of_range() {
        let c = AnimationClock::from_millis(1e300, 2e300, 1000.0);
        assert_eq!(c.current(), DateTime::<Utc>::MAX_UTC);
        let c = AnimationClock::from_millis(-1e300, 0.0, 1000.0);
        assert_eq!(c.current(), DateTime::<Utc>::MIN_UTC);
        assert_eq!(c.current(), c.current());

        let c = clock();
        assert_eq!(c.current(), Utc.timestamp_millis_opt(0).unwrap());
    }

    #[test]
    fn test_paused_clock_does_not_move() {
        let mut c = clock();
        assert_eq!(c.tick(1000.0), 0.0);
        c.play();
        assert_eq!(c.tick(1000.0), 10.0 * MS_PER_DAY);
    }

    #[test]
    fn test_speed_multiplies_rate() {
        let mut c = clock();
        c.play();
        c.set_speed(2.0);
        c.tick(500.0);
        assert_eq!(c.current_ms(), 10.0 * MS_PER_DAY);
        // Scale ignores speed
        assert_eq!(c.time_scale().screen_to_sim(1000.0), 10.0 * MS_PER_DAY);
    }

    #[test]
    fn test_stops_at_end() {
        let mut c = clock();
        c.play();
        c.tick(60_000.0);
        assert!(c.is_finished());
        assert!(!c.is_playing());
        assert_eq!(c.progress(), 1.0);
        // Play again restarts
        c.play();
        assert_eq!(c.current_ms(), 0.0);
    }

    #[test]
    fn test_seek_reports_direction() {
        let mut c = clock();
        assert_eq!(c.seek_fraction(0.5), ClockJump::Forward);
        assert_eq!(c.seek_fraction(0.25), ClockJump::Rewind);
        assert_eq!(c.seek_fraction(0.25), ClockJump::None);
        assert_eq!(c.seek(f64::NAN), ClockJump::None);
        assert_eq!(c.seek(-5.0), ClockJump::Rewind);
        assert_eq!(c.current_ms(), 0.0);
    }

    #[test]
    fn test_negative_dt_ignored() {
        let mut c = clock();
        c.play();
        c.tick(1000.0);
        let before = c.current_ms();
        c.tick(-1000.0);
        assert_eq!(c.current_ms(), before);
    }
}
