//! Render Synchronization
//!
//! Keeps one persistent line per satellite track and drives it from the
//! lifecycle snapshot each frame:
//! - buffers are uploaded once, sized to the full track
//! - reveal is a draw-count change, never a buffer write
//! - material follows `launch_opacity` / `decom_progress`
//! - satellites leaving the render set are disposed the same frame
//!
//! Geometry comes from the [`GeometryCache`] when it has the id, otherwise
//! from a synchronous kernel call capped per frame.

use std::collections::HashMap;

use geometry_pipeline::GeometryCache;
use orbital_mechanics::{generate_ascent_into, generate_orbit_into, OrbitScratch};
use satellite_catalog::{Rgb, SatelliteRecord};
use satellite_lifecycle::LifecycleSnapshot;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod backend;

pub use backend::{RecordedLine, RecordingBackend, RenderBackend};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Snapshot index {index} out of range for a catalog of {len}")]
    CatalogMismatch { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Render sync settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Target colour at `decom_progress = 1`
    pub decom_color: Rgb,
    /// Synchronous kernel calls allowed per frame on cache misses
    pub max_fallbacks_per_frame: usize,
    /// Orbit ellipse layer shown
    pub show_orbits: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            decom_color: Rgb::new(0x44, 0x44, 0x44),
            max_fallbacks_per_frame: 4,
            show_orbits: true,
        }
    }
}

/// Points drawn for a reveal fraction: `min(total, max(2, ceil(p * total)))`
pub fn draw_range(progress: f64, total: usize) -> usize {
    let p = if progress.is_finite() { progress.clamp(0.0, 1.0) } else { 0.0 };
    let count = (p * total as f64).ceil() as usize;
    count.max(2).min(total)
}

/// Per-frame counters
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct FrameStats {
    pub visible: usize,
    /// Lines uploaded this frame
    pub created: usize,
    /// Lines disposed this frame
    pub disposed: usize,
    /// Synchronous kernel calls
    pub fallbacks: usize,
    /// Cache misses pushed to a later frame by the fallback budget
    pub deferred: usize,
    pub draw_range_changes: usize,
}

/// One uploaded track
#[derive(Debug, Clone, Copy)]
pub struct LineDrawable<H> {
    handle: H,
    total_points: usize,
    draw_count: usize,
}

impl<H: Copy> LineDrawable<H> {
    fn upload<B>(backend: &mut B, positions: &[f32], total_points: usize, color: Rgb) -> Self
    where
        B: RenderBackend<Handle = H>,
    {
        let handle = backend.create_line(positions, total_points, color);
        backend.attach(handle);
        Self {
            handle,
            total_points,
            draw_count: total_points,
        }
    }

    /// Apply a reveal fraction; returns whether the draw count changed
    fn reveal<B>(&mut self, backend: &mut B, progress: f64) -> bool
    where
        B: RenderBackend<Handle = H>,
    {
        let count = draw_range(progress, self.total_points);
        if count == self.draw_count {
            return false;
        }
        backend.set_draw_range(self.handle, count);
        self.draw_count = count;
        true
    }

    fn release<B>(self, backend: &mut B)
    where
        B: RenderBackend<Handle = H>,
    {
        backend.detach(self.handle);
        backend.dispose(self.handle);
    }

    pub fn handle(&self) -> H {
        self.handle
    }

    pub fn total_points(&self) -> usize {
        self.total_points
    }

    pub fn draw_count(&self) -> usize {
        self.draw_count
    }
}

/// Lines owned by one satellite
#[derive(Debug, Clone)]
pub struct SatelliteDrawables<H> {
    ascent: Option<LineDrawable<H>>,
    orbit: Option<LineDrawable<H>>,
    last_frame: u64,
}

impl<H: Copy> SatelliteDrawables<H> {
    fn new() -> Self {
        Self {
            ascent: None,
            orbit: None,
            last_frame: 0,
        }
    }

    pub fn ascent(&self) -> Option<&LineDrawable<H>> {
        self.ascent.as_ref()
    }

    pub fn orbit(&self) -> Option<&LineDrawable<H>> {
        self.orbit.as_ref()
    }

    /// Dispose every line; returns how many there were
    fn release<B>(&mut self, backend: &mut B) -> usize
    where
        B: RenderBackend<Handle = H>,
    {
        let mut count = 0;
        for line in [self.ascent.take(), self.orbit.take()].into_iter().flatten() {
            line.release(backend);
            count += 1;
        }
        count
    }
}

/// Frame-to-frame owner of every satellite drawable
pub struct RenderSync<B: RenderBackend> {
    config: RenderConfig,
    lines: HashMap<String, SatelliteDrawables<B::Handle>>,
    frame: u64,
    /// Fallback scratch. Overwritten by every kernel call below.
    scratch: OrbitScratch,
    /// Fallback position buffer, copied out by `create_line` before reuse
    buffer: Vec<f32>,
}

impl<B: RenderBackend> Default for RenderSync<B> {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl<B: RenderBackend> RenderSync<B> {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            lines: HashMap::new(),
            frame: 0,
            scratch: OrbitScratch::new(),
            buffer: Vec::new(),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Satellites currently holding drawables
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn drawables(&self, id: &str) -> Option<&SatelliteDrawables<B::Handle>> {
        self.lines.get(id)
    }

    /// Show or hide every orbit ellipse. Lines stay uploaded either way.
    pub fn set_orbits_visible(&mut self, visible: bool, backend: &mut B) {
        if self.config.show_orbits == visible {
            return;
        }
        self.config.show_orbits = visible;
        for line in self.lines.values().filter_map(|d| d.orbit.as_ref()) {
            backend.set_visible(line.handle, visible);
        }
        debug!("orbit layer {}", if visible { "shown" } else { "hidden" });
    }

    /// Bring the scene in line with `snapshot`.
    ///
    /// `records` must be the slice the snapshot was classified from.
    pub fn sync_frame(
        &mut self,
        snapshot: &LifecycleSnapshot,
        records: &[SatelliteRecord],
        cache: &GeometryCache,
        backend: &mut B,
    ) -> Result<FrameStats> {
        self.frame += 1;
        let frame = self.frame;
        let segments = cache.segments();
        let mut stats = FrameStats {
            visible: snapshot.active.len(),
            ..FrameStats::default()
        };

        for visible in &snapshot.active {
            let record = records.get(visible.index).ok_or(RenderError::CatalogMismatch {
                index: visible.index,
                len: records.len(),
            })?;
            let state = &visible.state;
            let want_ascent = state.shows_ascent();
            let want_orbit = state.is_orbiting();
            let color = record.owner_color.lerp(&self.config.decom_color, state.decom_progress);

            let existing = self
                .lines
                .get(&record.id)
                .map(|d| (d.ascent.is_some(), d.orbit.is_some()));
            let (has_ascent, has_orbit) = existing.unwrap_or((false, false));
            let needs_ascent = want_ascent && !has_ascent;
            let needs_orbit = want_orbit && !has_orbit;

            let mut new_ascent = None;
            let mut new_orbit = None;
            if needs_ascent || needs_orbit {
                if let Some(geometry) = cache.get(&record.id) {
                    if needs_ascent {
                        new_ascent = Some(LineDrawable::upload(
                            backend,
                            &geometry.ascent_positions,
                            geometry.total_ascent_points,
                            color,
                        ));
                    }
                    if needs_orbit {
                        new_orbit = Some(LineDrawable::upload(
                            backend,
                            &geometry.orbit_positions,
                            geometry.total_orbit_points,
                            color,
                        ));
                    }
                } else if stats.fallbacks < self.config.max_fallbacks_per_frame {
                    stats.fallbacks += 1;
                    let input = record.orbit_input();
                    // scratch + buffer are overwritten by each call; upload copies them out
                    if needs_ascent {
                        let n = generate_ascent_into(&input, segments, 1.0, &mut self.scratch, &mut self.buffer);
                        new_ascent = Some(LineDrawable::upload(backend, &self.buffer, n, color));
                    }
                    if needs_orbit {
                        let n = generate_orbit_into(&input, segments, &mut self.scratch, &mut self.buffer);
                        new_orbit = Some(LineDrawable::upload(backend, &self.buffer, n, color));
                    }
                } else {
                    stats.deferred += 1;
                    if existing.is_none() {
                        continue;
                    }
                }
            }
            stats.created += new_ascent.is_some() as usize + new_orbit.is_some() as usize;
            if let (Some(line), false) = (&new_orbit, self.config.show_orbits) {
                backend.set_visible(line.handle, false);
            }

            if !self.lines.contains_key(&record.id) {
                self.lines.insert(record.id.clone(), SatelliteDrawables::new());
            }
            let Some(drawables) = self.lines.get_mut(&record.id) else {
                continue;
            };
            drawables.last_frame = frame;
            if new_ascent.is_some() {
                drawables.ascent = new_ascent;
            }
            if new_orbit.is_some() {
                drawables.orbit = new_orbit;
            }

            if want_ascent {
                if let Some(line) = drawables.ascent.as_mut() {
                    stats.draw_range_changes += line.reveal(backend, state.launch_progress) as usize;
                    backend.set_material(line.handle, color, state.launch_opacity);
                }
            } else if let Some(line) = drawables.ascent.take() {
                line.release(backend);
                stats.disposed += 1;
            }

            if want_orbit {
                if let Some(line) = drawables.orbit.as_mut() {
                    stats.draw_range_changes += line.reveal(backend, state.orbit_progress) as usize;
                    backend.set_material(line.handle, color, 1.0);
                }
            } else if let Some(line) = drawables.orbit.take() {
                line.release(backend);
                stats.disposed += 1;
            }
        }

        self.lines.retain(|_, drawables| {
            if drawables.last_frame == frame {
                return true;
            }
            stats.disposed += drawables.release(backend);
            false
        });

        if stats.created > 0 || stats.disposed > 0 || stats.deferred > 0 {
            debug!(
                "frame {}: visible={} created={} disposed={} fallbacks={} deferred={}",
                frame, stats.visible, stats.created, stats.disposed, stats.fallbacks, stats.deferred
            );
        }
        Ok(stats)
    }

    /// Dispose every drawable (catalog reload)
    pub fn clear(&mut self, backend: &mut B) -> usize {
        let mut disposed = 0;
        for (_, mut drawables) in self.lines.drain() {
            disposed += drawables.release(backend);
        }
        disposed
    }
}
