//! Rendering backend interface
//!
//! The core never talks to a scene graph directly. It creates persistent
//! line drawables once and afterwards only changes draw counts and
//! materials.

use std::collections::HashMap;

use satellite_catalog::Rgb;

/// Scene-side operations the render sync needs
pub trait RenderBackend {
    type Handle: Copy + Eq + std::fmt::Debug;

    /// Upload a line buffer of `point_count` xyz triples. The only buffer write.
    fn create_line(&mut self, positions: &[f32], point_count: usize, color: Rgb) -> Self::Handle;

    /// Number of leading points drawn
    fn set_draw_range(&mut self, handle: Self::Handle, count: usize);

    fn set_material(&mut self, handle: Self::Handle, color: Rgb, opacity: f64);

    fn set_visible(&mut self, handle: Self::Handle, visible: bool);

    /// Attach to the backend's parent node
    fn attach(&mut self, handle: Self::Handle);

    fn detach(&mut self, handle: Self::Handle);

    /// Release geometry and material
    fn dispose(&mut self, handle: Self::Handle);
}

/// State of one line as seen by [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedLine {
    pub point_count: usize,
    pub draw_count: usize,
    pub color: Rgb,
    pub opacity: f64,
    pub visible: bool,
    pub attached: bool,
}

/// Headless backend that records every call
#[derive(Debug, Default)]
pub struct RecordingBackend {
    lines: HashMap<u64, RecordedLine>,
    next_handle: u64,
    pub uploads: usize,
    pub uploaded_floats: usize,
    pub draw_range_changes: usize,
    pub material_changes: usize,
    pub disposals: usize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&self, handle: u64) -> Option<&RecordedLine> {
        self.lines.get(&handle)
    }

    /// Lines created and not yet disposed
    pub fn live_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn attached_lines(&self) -> usize {
        self.lines.values().filter(|l| l.attached).count()
    }
}

impl RenderBackend for RecordingBackend {
    type Handle = u64;

    fn create_line(&mut self, positions: &[f32], point_count: usize, color: Rgb) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.uploads += 1;
        self.uploaded_floats += positions.len();
        self.lines.insert(
            handle,
            RecordedLine {
                point_count,
                draw_count: point_count,
                color,
                opacity: 1.0,
                visible: true,
                attached: false,
            },
        );
        handle
    }

    fn set_draw_range(&mut self, handle: u64, count: usize) {
        if let Some(line) = self.lines.get_mut(&handle) {
            line.draw_count = count;
            self.draw_range_changes += 1;
        }
    }

    fn set_material(&mut self, handle: u64, color: Rgb, opacity: f64) {
        if let Some(line) = self.lines.get_mut(&handle) {
            line.color = color;
            line.opacity = opacity;
            self.material_changes += 1;
        }
    }

    fn set_visible(&mut self, handle: u64, visible: bool) {
        if let Some(line) = self.lines.get_mut(&handle) {
            line.visible = visible;
        }
    }

    fn attach(&mut self, handle: u64) {
        if let Some(line) = self.lines.get_mut(&handle) {
            line.attached = true;
        }
    }

    fn detach(&mut self, handle: u64) {
        if let Some(line) = self.lines.get_mut(&handle) {
            line.attached = false;
        }
    }

    fn dispose(&mut self, handle: u64) {
        if self.lines.remove(&handle).is_some() {
            self.disposals += 1;
        }
    }
}
