//! Geometry cache and request coalescing
//!
//! The cache owns the worker lifecycle. Entries are keyed by satellite id and
//! populated in a single swap from the completion message.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use orbital_mechanics::{GeometryResult, SatelliteInput};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::protocol::{PipelineStatus, WorkerMessage, WorkerRequest};
use crate::worker::GeometryWorker;
use crate::{PipelineConfig, PipelineError, Result};

/// Completion of an in-flight computation; resolves to the entry count.
/// Every clone resolves to the same value.
pub type PendingGeometry = Shared<BoxFuture<'static, Result<usize>>>;

enum Slot {
    Idle,
    Computing(PendingGeometry),
    Ready,
}

struct Inner {
    config: PipelineConfig,
    worker: GeometryWorker,
    entries: RwLock<HashMap<String, Arc<GeometryResult>>>,
    ready: AtomicBool,
    /// Bumped by `clear_cache`; runs started under an older value are stale
    generation: AtomicU64,
    worker_runs: AtomicUsize,
    slot: Mutex<Slot>,
    status: watch::Sender<PipelineStatus>,
}

/// Shared handle to the geometry cache
#[derive(Clone)]
pub struct GeometryCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for GeometryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryCache")
            .field("entries", &self.len())
            .field("ready", &self.is_ready())
            .field("status", &self.status())
            .finish()
    }
}

impl Default for GeometryCache {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl GeometryCache {
    pub fn new(config: PipelineConfig) -> Self {
        let (status, _) = watch::channel(PipelineStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                worker: GeometryWorker::new(config.clone()),
                config,
                entries: RwLock::new(HashMap::new()),
                ready: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                worker_runs: AtomicUsize::new(0),
                slot: Mutex::new(Slot::Idle),
                status,
            }),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// Segment count every cached track was generated with
    pub fn segments(&self) -> usize {
        self.inner.config.segments
    }

    /// Start a computation, or join the one already in flight.
    ///
    /// A joining request gets the in-flight result even if its catalog
    /// differs. Once ready, requests resolve immediately without a worker
    /// run until `clear_cache` is called.
    pub fn request(&self, satellites: Vec<SatelliteInput>) -> Result<PendingGeometry> {
        let mut slot = self.inner.slot.lock();

        match &*slot {
            Slot::Computing(future) => {
                debug!("Joining in-flight geometry computation");
                return Ok(future.clone());
            }
            Slot::Ready => {
                let count = self.len();
                return Ok(futures::future::ready(Ok(count)).boxed().shared());
            }
            Slot::Idle => {}
        }

        let total = satellites.len();
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let rx = match self.inner.worker.spawn(WorkerRequest::Compute { satellites }) {
            Ok(rx) => rx,
            Err(e) => {
                warn!("Geometry worker unavailable, render path will compute synchronously");
                self.inner.status.send_replace(PipelineStatus::Failed {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        self.inner.worker_runs.fetch_add(1, Ordering::SeqCst);
        self.inner
            .status
            .send_replace(PipelineStatus::Computing { completed: 0, total });
        info!("Computing geometry for {} satellites", total);

        let inner = Arc::clone(&self.inner);
        let driver = tokio::spawn(drive(inner, generation, rx));
        let future = async move {
            driver
                .await
                .map_err(|e| PipelineError::WorkerFailed(e.to_string()))?
        }
        .boxed()
        .shared();

        *slot = Slot::Computing(future.clone());
        Ok(future)
    }

    /// Request and wait for completion
    pub async fn compute(&self, satellites: Vec<SatelliteInput>) -> Result<usize> {
        self.request(satellites)?.await
    }

    pub fn get(&self, id: &str) -> Option<Arc<GeometryResult>> {
        self.inner.entries.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.entries.read().contains_key(id)
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn status(&self) -> PipelineStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineStatus> {
        self.inner.status.subscribe()
    }

    /// Worker runs started since creation
    pub fn worker_runs(&self) -> usize {
        self.inner.worker_runs.load(Ordering::SeqCst)
    }

    /// Drop every entry and return to Idle.
    ///
    /// A computation still in flight keeps running; its result is discarded
    /// when it lands.
    pub fn clear_cache(&self) {
        let mut slot = self.inner.slot.lock();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.entries.write().clear();
        self.inner.ready.store(false, Ordering::SeqCst);
        *slot = Slot::Idle;
        self.inner.status.send_replace(PipelineStatus::Idle);
        info!("Geometry cache cleared");
    }
}

async fn drive(
    inner: Arc<Inner>,
    generation: u64,
    mut rx: mpsc::UnboundedReceiver<WorkerMessage>,
) -> Result<usize> {
    while let Some(message) = rx.recv().await {
        match message {
            WorkerMessage::Progress { completed, total } => {
                if inner.generation.load(Ordering::SeqCst) == generation {
                    inner
                        .status
                        .send_replace(PipelineStatus::Computing { completed, total });
                }
            }
            WorkerMessage::Complete { results } => return finish(&inner, generation, Ok(results)),
            WorkerMessage::Error { message } => {
                return finish(&inner, generation, Err(PipelineError::WorkerFailed(message)))
            }
        }
    }
    finish(&inner, generation, Err(PipelineError::ChannelClosed))
}

fn finish(
    inner: &Inner,
    generation: u64,
    outcome: Result<Vec<GeometryResult>>,
) -> Result<usize> {
    let mut slot = inner.slot.lock();
    if inner.generation.load(Ordering::SeqCst) != generation {
        debug!("Discarding stale geometry run (generation {})", generation);
        return Err(PipelineError::Discarded);
    }

    match outcome {
        Ok(results) => {
            let map: HashMap<String, Arc<GeometryResult>> = results
                .into_iter()
                .map(|r| (r.id.clone(), Arc::new(r)))
                .collect();
            let count = map.len();
            let bytes: usize = map.values().map(|r| r.byte_len()).sum();
            *inner.entries.write() = map;
            inner.ready.store(true, Ordering::SeqCst);
            *slot = Slot::Ready;
            inner.status.send_replace(PipelineStatus::Ready { count });
            info!(
                "Geometry cache ready with {} entries ({:.1} KiB)",
                count,
                bytes as f64 / 1024.0
            );
            Ok(count)
        }
        Err(e) => {
            *slot = Slot::Idle;
            inner.status.send_replace(PipelineStatus::Failed {
                reason: e.to_string(),
            });
            warn!("Geometry worker failed ({}), falling back to synchronous compute", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbital_mechanics::compute_geometry;

    fn catalog(n: usize) -> Vec<SatelliteInput> {
        (0..n)
            .map(|i| {
                let alt = [400.0, 20_200.0, 35_786.0, 42_000.0][i % 4];
                SatelliteInput::new(format!("SAT-{:03}", i), alt, alt, (i * 7 % 98) as f64, 28.5, -80.6)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_compute_populates_cache() {
        let cache = GeometryCache::default();
        let sats = catalog(40);
        assert_eq!(cache.compute(sats.clone()).await, Ok(40));

        assert!(cache.is_ready());
        assert_eq!(cache.len(), 40);
        assert_eq!(cache.status(), PipelineStatus::Ready { count: 40 });
        for input in &sats {
            let cached = cache.get(&input.id).unwrap();
            assert_eq!(*cached, compute_geometry(input, cache.segments()));
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_coalesce() {
        let cache = GeometryCache::default();
        let a = cache.request(catalog(50)).unwrap();
        let b = cache.request(catalog(50)).unwrap();
        let (ra, rb) = futures::join!(a, b);

        assert_eq!(ra, Ok(50));
        assert_eq!(rb, Ok(50));
        assert_eq!(cache.worker_runs(), 1);

        // Ready cache answers without another run
        assert_eq!(cache.compute(catalog(50)).await, Ok(50));
        assert_eq!(cache.worker_runs(), 1);
    }

    #[tokio::test]
    async fn test_clear_then_recompute_matches() {
        let cache = GeometryCache::default();
        cache.compute(catalog(12)).await.unwrap();
        let before = cache.get("SAT-005").unwrap();

        cache.clear_cache();
        assert!(!cache.is_ready());
        assert!(cache.is_empty());
        assert_eq!(cache.status(), PipelineStatus::Idle);

        cache.compute(catalog(12)).await.unwrap();
        assert_eq!(cache.worker_runs(), 2);
        assert_eq!(*cache.get("SAT-005").unwrap(), *before);
    }

    #[tokio::test]
    async fn test_clear_in_flight_discards_result() {
        let cache = GeometryCache::default();
        let pending = cache.request(catalog(30)).unwrap();
        cache.clear_cache();

        assert_eq!(pending.await, Err(PipelineError::Discarded));
        assert!(cache.is_empty());
        assert!(!cache.is_ready());
        assert_eq!(cache.status(), PipelineStatus::Idle);
    }

    #[tokio::test]
    async fn test_request_after_clear_starts_fresh_run() {
        let cache = GeometryCache::default();
        let stale = cache.request(catalog(30)).unwrap();
        cache.clear_cache();
        let fresh = cache.request(catalog(6)).unwrap();

        assert_eq!(stale.await, Err(PipelineError::Discarded));
        assert_eq!(fresh.await, Ok(6));
        assert_eq!(cache.worker_runs(), 2);
        assert_eq!(cache.len(), 6);
        assert!(cache.contains("SAT-005"));
        assert!(!cache.contains("SAT-029"));
    }

    #[tokio::test]
    async fn test_disabled_worker_reports_failure() {
        let cache = GeometryCache::new(PipelineConfig {
            worker_enabled: false,
            ..PipelineConfig::default()
        });
        assert_eq!(
            cache.request(catalog(3)).unwrap_err(),
            PipelineError::WorkerUnavailable
        );
        assert!(matches!(cache.status(), PipelineStatus::Failed { .. }));
        assert!(cache.get("SAT-000").is_none());
    }

    #[tokio::test]
    async fn test_status_subscription_sees_ready() {
        let cache = GeometryCache::default();
        let mut status = cache.subscribe();
        let pending = cache.request(catalog(8)).unwrap();
        pending.await.unwrap();

        status.changed().await.unwrap();
        assert_eq!(*status.borrow(), PipelineStatus::Ready { count: 8 });
    }

    #[tokio::test]
    async fn test_empty_catalog_is_ready() {
        let cache = GeometryCache::default();
        assert_eq!(cache.compute(Vec::new()).await, Ok(0));
        assert!(cache.is_ready());
        assert!(cache.is_empty());
    }
}
