//! Launch/Orbit Dashboard
//!
//! Plays a satellite catalog back headlessly: loads the catalog, starts the
//! geometry worker in the background and drives the lifecycle clock and the
//! render sync against a recording backend.
//!
//! Usage:
//!   dashboard --catalog data/sample_catalog.json --animation-secs 60 --fps 60
//!             [--timing timing.json] [--no-worker] [--realtime] [--report out.json]

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use geometry_pipeline::{GeometryCache, PipelineConfig};
use orbital_mechanics::DEFAULT_SEGMENTS;
use render_sync::RenderConfig;
use satellite_catalog::load_catalog;
use satellite_lifecycle::{AnimationClock, LifecycleConfig, LifecycleEngine, MS_PER_DAY};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod playback;

use playback::PlaybackOptions;

#[derive(Parser, Debug)]
#[command(
    name = "dashboard",
    about = "Headless launch/orbit playback of a satellite catalog"
)]
struct Args {
    /// Catalog JSON (array of satellite rows)
    #[arg(short, long, env = "DASHBOARD_CATALOG", default_value = "data/sample_catalog.json")]
    catalog: PathBuf,

    /// Lifecycle timing overrides (JSON, missing fields keep defaults)
    #[arg(short, long, env = "DASHBOARD_TIMING")]
    timing: Option<PathBuf>,

    /// Wall-clock length of a full playback at speed 1
    #[arg(short, long, default_value_t = 120.0, value_parser = positive_finite)]
    animation_secs: f64,

    /// Playback speed multiplier
    #[arg(long, default_value_t = 1.0, value_parser = positive_finite)]
    speed: f64,

    /// Frames per second
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
    fps: u32,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Passes over the date range
    #[arg(long, default_value_t = 1)]
    loops: u32,

    /// Segments per orbit/ascent track
    #[arg(long, default_value_t = DEFAULT_SEGMENTS)]
    segments: usize,

    /// Synchronous kernel calls allowed per frame on cache misses
    #[arg(long, default_value_t = 4)]
    max_fallbacks: usize,

    /// Start with the orbit ellipse layer hidden
    #[arg(long)]
    hide_orbits: bool,

    /// Skip the background worker; every track comes from the fallback path
    #[arg(long)]
    no_worker: bool,

    /// Pace frames in real time
    #[arg(long)]
    realtime: bool,

    /// Write the playback report as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn positive_finite(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{}: {}", s, e))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{} is not a positive finite number", s))
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "dashboard=debug,geometry_pipeline=debug,render_sync=debug,info"
    } else {
        "dashboard=info,geometry_pipeline=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    info!("{}", "=".repeat(60));
    info!("Launch/Orbit Dashboard");
    info!("{}", "=".repeat(60));

    let catalog = load_catalog(&args.catalog)
        .with_context(|| format!("loading catalog {}", args.catalog.display()))?;
    let summary = catalog.summary();
    info!(
        "Catalog: {} satellites ({} skipped, {} still active)",
        summary.total, summary.skipped, summary.still_active
    );
    for (orbit, count) in &summary.by_orbit {
        info!("  {}: {}", orbit, count);
    }

    let timing = match &args.timing {
        Some(path) => LifecycleConfig::from_json_file(path)
            .with_context(|| format!("loading timing {}", path.display()))?,
        None => LifecycleConfig::default(),
    };

    let (first, last) = catalog
        .time_span()
        .context("catalog has no launch dates")?;
    // Run past the last event so late launches finish and late ends fade out
    let tail_ms = (timing.max_launch_days + timing.decom_days) * MS_PER_DAY;
    let end = last + chrono::Duration::milliseconds(tail_ms.ceil() as i64);
    let mut clock = AnimationClock::new(
        first,
        end,
        std::time::Duration::from_secs_f64(args.animation_secs),
    );
    info!(
        "Playing {} to {} in {:.0}s",
        first.format("%Y-%m-%d"),
        end.format("%Y-%m-%d"),
        args.animation_secs
    );

    let engine = LifecycleEngine::new(timing, clock.time_scale());
    let cache = GeometryCache::new(PipelineConfig {
        worker_enabled: !args.no_worker,
        segments: args.segments,
        ..PipelineConfig::default()
    });

    // Playback starts right away; early frames run on the fallback path
    let pending = match cache.request(catalog.orbit_inputs()) {
        Ok(pending) => Some(tokio::spawn(pending)),
        Err(e) => {
            warn!("Geometry pipeline not started: {}", e);
            None
        }
    };

    let mut status = cache.subscribe();
    let watcher = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow().clone();
            tracing::debug!("Pipeline status: {:?}", current);
        }
    });

    let options = PlaybackOptions {
        fps: args.fps,
        max_frames: args.max_frames,
        loops: args.loops,
        realtime: args.realtime,
        speed: args.speed,
        render: RenderConfig {
            max_fallbacks_per_frame: args.max_fallbacks,
            show_orbits: !args.hide_orbits,
            ..RenderConfig::default()
        },
    };
    let report = playback::run(catalog.records(), &engine, &mut clock, &cache, &options).await?;

    if let Some(handle) = pending {
        if handle.is_finished() {
            match handle.await? {
                Ok(count) => info!("Geometry pipeline produced {} tracks", count),
                Err(e) => warn!("Geometry pipeline failed: {}", e),
            }
        } else {
            info!("Playback ended before the geometry pipeline finished");
        }
    }
    watcher.abort();

    info!("{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    info!("Frames: {} ({} rewinds)", report.frames, report.rewinds);
    info!("Peak visible: {} (peak launching {})", report.peak_visible, report.peak_launching);
    info!(
        "Lines: {} created, {} disposed, {} live",
        report.lines_created, report.lines_disposed, report.live_lines
    );
    info!(
        "Uploads: {} ({:.1} KiB), draw-range updates: {}",
        report.uploads,
        report.uploaded_bytes as f64 / 1024.0,
        report.draw_range_changes
    );
    info!("Fallbacks: {} (deferred {})", report.fallbacks, report.deferred);

    if let Some(path) = &args.report {
        info!("Writing report to {:?}", path);
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &report)?;
    }

    Ok(())
}
