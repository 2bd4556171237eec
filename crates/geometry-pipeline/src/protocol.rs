//! Worker protocol
//!
//! One round trip per catalog load:
//!
//! ```text
//! main ── Compute{satellites} ──> worker
//! main <── Progress{completed,total} ── worker   (every ~5%, increasing)
//! main <── Complete{results} ─────────── worker   (exactly once)
//!      or  Error{message}
//! ```

use orbital_mechanics::{GeometryResult, SatelliteInput};
use serde::{Deserialize, Serialize};

/// Main thread -> worker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerRequest {
    Compute { satellites: Vec<SatelliteInput> },
}

/// Worker -> main thread
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerMessage {
    Progress { completed: usize, total: usize },
    /// Buffers move with the message; the worker keeps nothing
    Complete { results: Vec<GeometryResult> },
    Error { message: String },
}

/// Observable pipeline state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PipelineStatus {
    Idle,
    Computing { completed: usize, total: usize },
    Ready { count: usize },
    Failed { reason: String },
}

impl PipelineStatus {
    /// Determinate progress in [0, 1] while computing or ready
    pub fn fraction(&self) -> Option<f64> {
        match self {
            Self::Computing { total: 0, .. } => Some(0.0),
            Self::Computing { completed, total } => Some(*completed as f64 / *total as f64),
            Self::Ready { .. } => Some(1.0),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_tags() {
        let json = serde_json::to_value(WorkerMessage::Progress { completed: 5, total: 100 }).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["completed"], 5);

        let request = WorkerRequest::Compute {
            satellites: vec![SatelliteInput::new("A", 400.0, 400.0, 53.0, 28.5, -80.6)],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "compute");
        assert_eq!(json["satellites"][0]["orbit_type"], "LEO");
    }

    #[test]
    fn test_status_fraction() {
        assert_eq!(PipelineStatus::Idle.fraction(), None);
        assert_eq!(PipelineStatus::Computing { completed: 25, total: 100 }.fraction(), Some(0.25));
        assert_eq!(PipelineStatus::Computing { completed: 0, total: 0 }.fraction(), Some(0.0));
        assert_eq!(PipelineStatus::Ready { count: 3 }.fraction(), Some(1.0));
        assert!(PipelineStatus::Ready { count: 3 }.is_ready());
    }
}
