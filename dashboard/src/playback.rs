//! Frame loop
//!
//! One frame: advance the clock, classify the whole catalog, push the
//! snapshot into the render sync. Nothing carries over between frames except
//! the drawables themselves.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use geometry_pipeline::{GeometryCache, PipelineStatus};
use render_sync::{FrameStats, RecordingBackend, RenderConfig, RenderSync};
use satellite_catalog::SatelliteRecord;
use satellite_lifecycle::{
    AnimationClock, ClockJump, LifecycleEngine, LifecyclePhase, LifecycleSnapshot,
};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PlaybackOptions {
    pub fps: u32,
    pub max_frames: Option<u64>,
    /// Full passes over the date range; each extra pass starts with a rewind
    pub loops: u32,
    /// Pace frames on a wall-clock interval instead of running flat out
    pub realtime: bool,
    pub speed: f64,
    pub render: RenderConfig,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            fps: 60,
            max_frames: None,
            loops: 1,
            realtime: false,
            speed: 1.0,
            render: RenderConfig::default(),
        }
    }
}

/// Totals over a whole playback
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlaybackReport {
    pub frames: u64,
    pub rewinds: u32,
    pub final_time: Option<DateTime<Utc>>,
    pub peak_visible: usize,
    pub peak_launching: usize,
    pub lines_created: usize,
    pub lines_disposed: usize,
    pub fallbacks: usize,
    pub deferred: usize,
    pub draw_range_changes: usize,
    pub uploads: usize,
    pub uploaded_bytes: usize,
    pub live_lines: usize,
    pub final_phases: BTreeMap<LifecyclePhase, usize>,
    pub pipeline: Option<PipelineStatus>,
}

impl PlaybackReport {
    fn record_frame(&mut self, stats: &FrameStats, snapshot: &LifecycleSnapshot) {
        self.frames += 1;
        self.peak_visible = self.peak_visible.max(stats.visible);
        self.peak_launching = self.peak_launching.max(snapshot.launching());
        self.lines_created += stats.created;
        self.lines_disposed += stats.disposed;
        self.fallbacks += stats.fallbacks;
        self.deferred += stats.deferred;
        self.draw_range_changes += stats.draw_range_changes;
    }
}

/// Drive `clock` to the end of its range (or the frame limit)
pub async fn run(
    records: &[SatelliteRecord],
    engine: &LifecycleEngine,
    clock: &mut AnimationClock,
    cache: &GeometryCache,
    options: &PlaybackOptions,
) -> Result<PlaybackReport> {
    let mut backend = RecordingBackend::new();
    let mut sync = RenderSync::new(options.render.clone());
    let mut snapshot = LifecycleSnapshot::default();
    let mut report = PlaybackReport::default();

    let fps = options.fps.max(1);
    let frame_ms = 1000.0 / fps as f64;
    let log_every = fps as u64 * 5;
    let mut ticker = options.realtime.then(|| {
        let mut interval = tokio::time::interval(Duration::from_secs_f64(frame_ms / 1000.0));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });
    let mut loops_left = options.loops.max(1);

    clock.set_speed(options.speed);
    clock.play();

    loop {
        if options.max_frames.is_some_and(|limit| report.frames >= limit) {
            info!("Frame limit reached");
            break;
        }
        match ticker.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            // Lets the pipeline driver land its result between frames
            None => tokio::task::yield_now().await,
        }

        clock.tick(frame_ms);
        engine.classify_into(records, clock.current_ms(), &mut snapshot);
        let stats = sync.sync_frame(&snapshot, records, cache, &mut backend)?;
        report.record_frame(&stats, &snapshot);

        if report.frames % log_every == 0 {
            let status = cache.status();
            info!(
                "{} | {:5.1}% | visible {:5} launching {:3} | geometry {}",
                clock.current().format("%Y-%m-%d"),
                clock.progress() * 100.0,
                stats.visible,
                snapshot.launching(),
                status
                    .fraction()
                    .map(|f| format!("{:.0}%", f * 100.0))
                    .unwrap_or_else(|| "fallback".to_string()),
            );
        }

        if clock.is_finished() {
            loops_left -= 1;
            if loops_left == 0 {
                break;
            }
            if clock.restart() == ClockJump::Rewind {
                report.rewinds += 1;
                debug!("Rewinding to {}", clock.current());
            }
            clock.play();
        }
    }

    report.final_time = Some(clock.current());
    report.final_phases = snapshot.phase_counts.clone();
    report.uploads = backend.uploads;
    report.uploaded_bytes = backend.uploaded_floats * std::mem::size_of::<f32>();
    report.live_lines = backend.live_lines();
    report.pipeline = Some(cache.status());
    Ok(report)
}
