//! Satellite Lifecycle State Machine
//!
//! Per satellite, per animation tick:
//!
//! ```text
//! pending -> launching -> active -> decommissioning -> decommissioned
//!            |ascent|hold|fade|
//!                   |--orbit reveal--|
//! ```
//!
//! State is a pure function of `(t, record, config)`. Nothing is carried
//! between ticks, so a scrub backwards simply re-evaluates every record.
//!
//! Durations mix simulated days (ascent, decommission) and screen-time
//! milliseconds (hold, fade, orbit reveal). Screen time is converted to
//! simulated time through [`TimeScale`].

use std::path::Path;

use orbital_mechanics::OrbitType;
use satellite_catalog::SatelliteRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod clock;
pub mod snapshot;

pub use clock::{AnimationClock, ClockJump};
pub use snapshot::{classify_catalog, LifecycleEngine, LifecycleSnapshot, VisibleSatellite};

pub const MS_PER_DAY: f64 = 86_400_000.0;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid lifecycle config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("Invalid duration for {0}: {1}")]
    InvalidDuration(&'static str, f64),
}

pub type Result<T> = std::result::Result<T, LifecycleError>;

/// Lifecycle phases, totally ordered by time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    /// Before launch
    Pending,
    /// Ascent, hold and fade of the launch track
    Launching,
    /// On orbit
    Active,
    /// Fading toward the decommission colour
    Decommissioning,
    /// Gone
    Decommissioned,
}

impl LifecyclePhase {
    pub const ALL: [LifecyclePhase; 5] = [
        LifecyclePhase::Pending,
        LifecyclePhase::Launching,
        LifecyclePhase::Active,
        LifecyclePhase::Decommissioning,
        LifecyclePhase::Decommissioned,
    ];

    /// Member of the active render set
    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Launching | Self::Active | Self::Decommissioning)
    }
}

/// Conversion between screen milliseconds and simulated milliseconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeScale {
    pub sim_ms_per_screen_ms: f64,
}

impl TimeScale {
    /// `simulated_ms / animation_ms`; degenerate inputs fall back to the default
    pub fn new(simulated_ms: f64, animation_ms: f64) -> Self {
        let ratio = simulated_ms / animation_ms;
        if ratio.is_finite() && ratio > 0.0 {
            Self { sim_ms_per_screen_ms: ratio }
        } else {
            Self::default()
        }
    }

    #[inline]
    pub fn screen_to_sim(&self, screen_ms: f64) -> f64 {
        screen_ms * self.sim_ms_per_screen_ms
    }
}

impl Default for TimeScale {
    /// One simulated day per screen second
    fn default() -> Self {
        Self {
            sim_ms_per_screen_ms: MS_PER_DAY / 1000.0,
        }
    }
}

/// Duration constants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Ascent duration for an orbit at the LEO reference altitude (simulated days)
    pub leo_launch_days: f64,
    /// Ascent duration at or above the max launch altitude (simulated days)
    pub max_launch_days: f64,
    pub leo_reference_altitude_km: f64,
    pub max_launch_altitude_km: f64,
    /// Launch track held at full opacity after insertion (screen ms)
    pub hold_screen_ms: f64,
    /// Launch track fade-out (screen ms)
    pub fade_screen_ms: f64,
    /// Orbit ellipse reveal after insertion (screen ms)
    pub orbit_reveal_screen_ms: f64,
    /// Decommission colour shift (simulated days)
    pub decom_days: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            leo_launch_days: 2.0,
            max_launch_days: 6.0,
            leo_reference_altitude_km: 400.0,
            max_launch_altitude_km: 35_786.0,
            hold_screen_ms: 1500.0,
            fade_screen_ms: 1000.0,
            orbit_reveal_screen_ms: 2000.0,
            decom_days: 7.0,
        }
    }
}

impl LifecycleConfig {
    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("leo_launch_days", self.leo_launch_days),
            ("max_launch_days", self.max_launch_days),
            ("hold_screen_ms", self.hold_screen_ms),
            ("fade_screen_ms", self.fade_screen_ms),
            ("orbit_reveal_screen_ms", self.orbit_reveal_screen_ms),
            ("decom_days", self.decom_days),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(LifecycleError::InvalidDuration(name, value));
            }
        }
        if self.max_launch_altitude_km <= self.leo_reference_altitude_km {
            return Err(LifecycleError::InvalidDuration(
                "max_launch_altitude_km",
                self.max_launch_altitude_km,
            ));
        }
        Ok(())
    }

    /// Ascent duration in simulated days.
    ///
    /// Linear in target altitude between the LEO reference and the max
    /// launch altitude. Escape trajectories take the max.
    pub fn ascent_days(&self, orbit_type: OrbitType, target_altitude_km: f64) -> f64 {
        if orbit_type == OrbitType::Escape || !target_altitude_km.is_finite() {
            return self.max_launch_days;
        }
        let span = self.max_launch_altitude_km - self.leo_reference_altitude_km;
        let t = ((target_altitude_km - self.leo_reference_altitude_km) / span).clamp(0.0, 1.0);
        self.leo_launch_days + (self.max_launch_days - self.leo_launch_days) * t
    }

    /// Absolute timeline (Unix ms) for one record
    pub fn timeline(&self, record: &SatelliteRecord, scale: &TimeScale) -> Timeline {
        let input = record.orbit_input();
        let launch = record.launch_ms();
        let ascent = self.ascent_days(record.orbit_type, input.target_altitude_km()) * MS_PER_DAY;
        let hold = scale.screen_to_sim(self.hold_screen_ms);
        let fade = scale.screen_to_sim(self.fade_screen_ms);

        Timeline {
            launch,
            ascent,
            hold,
            fade,
            insertion: launch + ascent,
            launch_window_end: launch + ascent + hold + fade,
            orbit_reveal: scale.screen_to_sim(self.orbit_reveal_screen_ms),
            decom_start: record.end_ms(),
            decom_window: self.decom_days * MS_PER_DAY,
        }
    }
}

/// One record's phase boundaries in simulated Unix milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    pub launch: f64,
    pub ascent: f64,
    pub hold: f64,
    pub fade: f64,
    pub insertion: f64,
    pub launch_window_end: f64,
    pub orbit_reveal: f64,
    /// `+inf` when the satellite is still active
    pub decom_start: f64,
    pub decom_window: f64,
}

/// `num / den` clamped to [0, 1]; a zero-length span counts as complete
#[inline]
fn fraction(num: f64, den: f64) -> f64 {
    if den <= 0.0 {
        if num >= 0.0 { 1.0 } else { 0.0 }
    } else {
        (num / den).clamp(0.0, 1.0)
    }
}

/// Lifecycle state plus continuous progress values, all in [0, 1]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LifecycleState {
    pub phase: LifecyclePhase,
    /// Ascent reveal
    pub launch_progress: f64,
    /// Launch track opacity (1 through ascent and hold, ramps to 0 over fade)
    pub launch_opacity: f64,
    /// Orbit ellipse reveal, starts at insertion
    pub orbit_progress: f64,
    /// Shift toward the decommission colour
    pub decom_progress: f64,
}

impl LifecycleState {
    pub const PENDING: LifecycleState = LifecycleState {
        phase: LifecyclePhase::Pending,
        launch_progress: 0.0,
        launch_opacity: 0.0,
        orbit_progress: 0.0,
        decom_progress: 0.0,
    };

    pub const DECOMMISSIONED: LifecycleState = LifecycleState {
        phase: LifecyclePhase::Decommissioned,
        launch_progress: 1.0,
        launch_opacity: 0.0,
        orbit_progress: 1.0,
        decom_progress: 1.0,
    };

    /// Derive the state at simulated time `t_ms` from scratch
    pub fn at(timeline: &Timeline, t_ms: f64) -> Self {
        if t_ms.is_nan() || t_ms < timeline.launch {
            return Self::PENDING;
        }

        let decom_elapsed = t_ms - timeline.decom_start;
        if decom_elapsed >= timeline.decom_window {
            return Self::DECOMMISSIONED;
        }

        let elapsed = t_ms - timeline.launch;
        let (launch_progress, launch_opacity) = if elapsed < timeline.ascent {
            (fraction(elapsed, timeline.ascent), 1.0)
        } else if elapsed < timeline.ascent + timeline.hold {
            (1.0, 1.0)
        } else {
            let fade_elapsed = elapsed - timeline.ascent - timeline.hold;
            (1.0, 1.0 - fraction(fade_elapsed, timeline.fade))
        };

        // Runs from insertion regardless of the phase label: the orbit
        // starts drawing while the launch track is still holding/fading
        let orbit_progress = if t_ms < timeline.insertion {
            0.0
        } else {
            fraction(t_ms - timeline.insertion, timeline.orbit_reveal)
        };

        let (phase, decom_progress) = if decom_elapsed >= 0.0 {
            (
                LifecyclePhase::Decommissioning,
                fraction(decom_elapsed, timeline.decom_window),
            )
        } else if t_ms < timeline.launch_window_end {
            (LifecyclePhase::Launching, 0.0)
        } else {
            (LifecyclePhase::Active, 0.0)
        };

        Self {
            phase,
            launch_progress,
            launch_opacity,
            orbit_progress,
            decom_progress,
        }
    }

    /// Evaluate a record at `t_ms`
    pub fn evaluate(
        record: &SatelliteRecord,
        t_ms: f64,
        config: &LifecycleConfig,
        scale: &TimeScale,
    ) -> Self {
        Self::at(&config.timeline(record, scale), t_ms)
    }

    /// Member of the active render set
    pub fn is_visible(&self) -> bool {
        self.phase.is_visible()
    }

    /// Member of the orbiting render set (ellipse drawn)
    pub fn is_orbiting(&self) -> bool {
        match self.phase {
            LifecyclePhase::Active | LifecyclePhase::Decommissioning => true,
            LifecyclePhase::Launching => self.orbit_progress > 0.0,
            _ => false,
        }
    }

    /// Launch track still drawn
    pub fn shows_ascent(&self) -> bool {
        self.is_visible() && self.launch_opacity > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn starlink(end: Option<chrono::DateTime<Utc>>) -> SatelliteRecord {
        SatelliteRecord::new("2024-040A", "STARLINK", t0(), end, 400.0, 400.0, 53.0, 28.5, -80.6)
    }

    fn at(record: &SatelliteRecord, offset: Duration) -> LifecycleState {
        let t = (t0() + offset).timestamp_millis() as f64;
        LifecycleState::evaluate(record, t, &LifecycleConfig::default(), &TimeScale::default())
    }

    #[test]
    fn test_scenario_pending_launching_active() {
        let sat = starlink(None);

        let before = at(&sat, Duration::milliseconds(-1));
        assert_eq!(before.phase, LifecyclePhase::Pending);

        // Launch instant is the first tick of the launch
        let start = at(&sat, Duration::zero());
        assert_eq!(start.phase, LifecyclePhase::Launching);
        assert_eq!(start.launch_progress, 0.0);

        let mid = at(&sat, Duration::days(1));
        assert_eq!(mid.phase, LifecyclePhase::Launching);
        assert!(mid.launch_progress > 0.0 && mid.launch_progress < 1.0);
        assert_eq!(mid.launch_opacity, 1.0);
        assert_eq!(mid.orbit_progress, 0.0);

        let later = at(&sat, Duration::days(10));
        assert_eq!(later.phase, LifecyclePhase::Active);
        assert_eq!(later.orbit_progress, 1.0);
        assert_eq!(later.launch_opacity, 0.0);
    }

    #[test]
    fn test_scenario_decommissioned() {
        let end = t0() + Duration::days(400);
        let sat = starlink(Some(end));

        let decaying = at(&sat, Duration::days(403));
        assert_eq!(decaying.phase, LifecyclePhase::Decommissioning);
        assert!(decaying.decom_progress > 0.0 && decaying.decom_progress < 1.0);

        let gone = at(&sat, Duration::days(408));
        assert_eq!(gone.phase, LifecyclePhase::Decommissioned);
        assert_eq!(gone.decom_progress, 1.0);
        assert_eq!(gone.orbit_progress, 1.0);
    }

    #[test]
    fn test_orbit_overlaps_hold_and_fade() {
        let sat = starlink(None);
        // Default scale: hold = 1.5 days, fade = 1 day, reveal = 2 days
        let hold = at(&sat, Duration::hours(2 * 24 + 12));
        assert_eq!(hold.phase, LifecyclePhase::Launching);
        assert_eq!(hold.launch_opacity, 1.0);
        assert!(hold.orbit_progress > 0.0);
        assert!(hold.is_orbiting());

        let fade = at(&sat, Duration::hours(4 * 24));
        assert_eq!(fade.phase, LifecyclePhase::Launching);
        assert!(fade.launch_opacity > 0.0 && fade.launch_opacity < 1.0);
        assert!(fade.orbit_progress > hold.orbit_progress);
    }

    #[test]
    fn test_ascent_duration_curve() {
        let config = LifecycleConfig::default();
        assert_eq!(config.ascent_days(OrbitType::Leo, 400.0), 2.0);
        assert_eq!(config.ascent_days(OrbitType::Leo, 200.0), 2.0);
        assert_eq!(config.ascent_days(OrbitType::Geo, 35_786.0), 6.0);
        assert_eq!(config.ascent_days(OrbitType::Heo, 60_000.0), 6.0);
        assert_eq!(config.ascent_days(OrbitType::Escape, 500.0), 6.0);
        let mid = config.ascent_days(OrbitType::Meo, (400.0 + 35_786.0) / 2.0);
        assert!((mid - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_end_inside_launch_window() {
        let end = t0() + Duration::hours(12);
        let sat = starlink(Some(end));
        let s = at(&sat, Duration::days(1));
        assert_eq!(s.phase, LifecyclePhase::Decommissioning);
        assert!(s.is_visible());
        assert!(s.is_orbiting());
    }

    #[test]
    fn test_visibility_sets() {
        assert!(!LifecycleState::PENDING.is_visible());
        assert!(!LifecycleState::DECOMMISSIONED.is_visible());
        assert!(!LifecycleState::DECOMMISSIONED.is_orbiting());

        let launching = LifecycleState {
            phase: LifecyclePhase::Launching,
            launch_progress: 0.5,
            launch_opacity: 1.0,
            orbit_progress: 0.0,
            decom_progress: 0.0,
        };
        assert!(launching.is_visible());
        assert!(!launching.is_orbiting());
        assert!(launching.shows_ascent());
    }

    #[test]
    fn test_phase_order() {
        assert!(LifecyclePhase::Pending < LifecyclePhase::Launching);
        assert!(LifecyclePhase::Launching < LifecyclePhase::Active);
        assert!(LifecyclePhase::Active < LifecyclePhase::Decommissioning);
        assert!(LifecyclePhase::Decommissioning < LifecyclePhase::Decommissioned);
    }

    #[test]
    fn test_nan_time_is_pending() {
        let sat = starlink(None);
        let s = LifecycleState::evaluate(
            &sat,
            f64::NAN,
            &LifecycleConfig::default(),
            &TimeScale::default(),
        );
        assert_eq!(s, LifecycleState::PENDING);
    }

    #[test]
    fn test_time_scale() {
        let scale = TimeScale::new(10.0 * MS_PER_DAY, 10_000.0);
        assert_eq!(scale.screen_to_sim(1000.0), MS_PER_DAY);
        assert_eq!(TimeScale::new(1.0, 0.0), TimeScale::default());
        assert_eq!(TimeScale::new(-1.0, 10.0), TimeScale::default());
    }

    #[test]
    fn test_config_from_json() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"decom_days": 3.5, "hold_screen_ms": 0}}"#).unwrap();
        let config = LifecycleConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.decom_days, 3.5);
        assert_eq!(config.hold_screen_ms, 0.0);
        assert_eq!(config.leo_launch_days, 2.0);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, r#"{{"fade_screen_ms": -1}}"#).unwrap();
        assert!(matches!(
            LifecycleConfig::from_json_file(bad.path()),
            Err(LifecycleError::InvalidDuration("fade_screen_ms", _))
        ));
    }
}
