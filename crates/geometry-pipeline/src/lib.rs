//! Geometry Worker Pipeline
//!
//! Runs the orbital kernel for a whole catalog on a blocking background
//! task and hands the buffers back to the render thread by move.
//!
//! ```text
//!            request()                 Complete
//!   Idle ──────────────> Computing ─────────────> Ready
//!    ^                      │  Error / closed        │
//!    │                      v                        │
//!    └──────────────── Failed (fallback) <───────────┘ clear_cache()
//! ```
//!
//! - One computation in flight at most; concurrent requests join it.
//! - The cache is filled in one swap when the completion message lands,
//!   never from progress messages.
//! - No mid-computation cancellation. `clear_cache()` + a new request is
//!   the only way to drop a stale run; its result is discarded on arrival.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod cache;
pub mod protocol;
pub mod worker;

pub use cache::{GeometryCache, PendingGeometry};
pub use protocol::{PipelineStatus, WorkerMessage, WorkerRequest};
pub use worker::GeometryWorker;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Geometry worker unavailable")]
    WorkerUnavailable,
    #[error("Geometry worker failed: {0}")]
    WorkerFailed(String),
    #[error("Worker channel closed before completion")]
    ChannelClosed,
    #[error("Computation discarded by cache clear")]
    Discarded,
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// When false every request fails with `WorkerUnavailable`
    pub worker_enabled: bool,
    /// Segments per orbit/ascent track
    pub segments: usize,
    /// Progress message cadence, percent of the catalog
    pub progress_step_percent: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_enabled: true,
            segments: orbital_mechanics::DEFAULT_SEGMENTS,
            progress_step_percent: 5,
        }
    }
}

impl PipelineConfig {
    /// Satellites between progress messages (at least 1)
    pub fn progress_step(&self, total: usize) -> usize {
        let percent = self.progress_step_percent.clamp(1, 100);
        ((total * percent + 99) / 100).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_step() {
        let config = PipelineConfig::default();
        assert_eq!(config.progress_step(0), 1);
        assert_eq!(config.progress_step(10), 1);
        assert_eq!(config.progress_step(100), 5);
        assert_eq!(config.progress_step(1000), 50);
        assert_eq!(config.progress_step(1001), 51);
    }
}
