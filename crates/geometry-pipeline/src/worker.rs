//! Background geometry worker
//!
//! The worker body is plain blocking code on tokio's blocking pool. It only
//! touches the orbital kernel, never render types.

use std::panic::{self, AssertUnwindSafe};

use orbital_mechanics::{compute_geometry, SatelliteInput};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::protocol::{WorkerMessage, WorkerRequest};
use crate::{PipelineConfig, PipelineError, Result};

/// Blocking worker body: compute every satellite, report progress, then
/// move all buffers out in a single completion message.
pub fn run_compute(
    satellites: &[SatelliteInput],
    config: &PipelineConfig,
    tx: &mpsc::UnboundedSender<WorkerMessage>,
) -> Result<()> {
    let total = satellites.len();
    let step = config.progress_step(total);
    let mut results = Vec::with_capacity(total);

    for (i, input) in satellites.iter().enumerate() {
        results.push(compute_geometry(input, config.segments));

        let completed = i + 1;
        if completed % step == 0 || completed == total {
            tx.send(WorkerMessage::Progress { completed, total })
                .map_err(|_| PipelineError::ChannelClosed)?;
        }
    }

    debug!("Worker computed {} geometries", total);
    tx.send(WorkerMessage::Complete { results })
        .map_err(|_| PipelineError::ChannelClosed)
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Spawns worker runs on the current tokio runtime
#[derive(Debug, Clone, Default)]
pub struct GeometryWorker {
    config: PipelineConfig,
}

impl GeometryWorker {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Start a worker run and return its message stream.
    ///
    /// Fails with `WorkerUnavailable` when disabled or outside a runtime.
    pub fn spawn(&self, request: WorkerRequest) -> Result<mpsc::UnboundedReceiver<WorkerMessage>> {
        if !self.config.worker_enabled {
            return Err(PipelineError::WorkerUnavailable);
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| PipelineError::WorkerUnavailable)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let config = self.config.clone();

        match request {
            WorkerRequest::Compute { satellites } => {
                debug!("Spawning geometry worker for {} satellites", satellites.len());
                runtime.spawn_blocking(move || {
                    let outcome =
                        panic::catch_unwind(AssertUnwindSafe(|| run_compute(&satellites, &config, &tx)));
                    match outcome {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => debug!("Worker stopped early: {}", e),
                        Err(payload) => {
                            let message = panic_message(payload);
                            error!("Geometry worker panicked: {}", message);
                            let _ = tx.send(WorkerMessage::Error { message });
                        }
                    }
                });
            }
        }

        Ok(rx)
    }
}
