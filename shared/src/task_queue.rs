/// Bounded queue for per-asset fetch pipelines.
///
/// Uses a tokio Semaphore to cap how many pipelines run at once and tracks
/// the state of every asset that passed through it.
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Status of a tracked asset in the queue.
#[derive(Debug, Clone)]
pub struct TrackedAsset {
    pub asset_id: String,
    pub status: AssetState,
    pub enqueued_at: chrono::DateTime<Utc>,
    pub started_at: Option<chrono::DateTime<Utc>>,
    pub finished_at: Option<chrono::DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    Queued,
    Running,
    Done,
    Failed,
    Cancelled,
}

/// Slot held while one pipeline runs. Dropping it frees the slot.
pub struct FetchSlot {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for FetchSlot {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fetch queue with concurrency control.
pub struct FetchQueue {
    /// Semaphore to limit concurrent pipelines.
    semaphore: Arc<Semaphore>,
    /// Tracked asset metadata.
    tasks: Arc<Mutex<HashMap<String, TrackedAsset>>>,
    /// Pipelines currently holding a slot.
    in_flight: Arc<AtomicUsize>,
    /// Highest value `in_flight` ever reached.
    peak: Arc<AtomicUsize>,
    /// Max concurrent pipelines.
    max_concurrent: usize,
}

impl FetchQueue {
    /// Create a new queue with the given concurrency limit.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            max_concurrent,
        }
    }

    /// Track an asset. Returns false if the id is already tracked.
    pub async fn enqueue(&self, asset_id: &str) -> bool {
        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(asset_id) {
            warn!("Asset {} listed twice, last write wins", asset_id);
            return false;
        }

        tasks.insert(asset_id.to_string(), TrackedAsset {
            asset_id: asset_id.to_string(),
            status: AssetState::Queued,
            enqueued_at: Utc::now(),
            started_at: None,
            finished_at: None,
        });
        true
    }

    /// Wait for a free slot. Returns `None` once the queue has been cancelled.
    pub async fn acquire(&self, asset_id: &str) -> Option<FetchSlot> {
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => {
                debug!("Queue closed before {} got a slot", asset_id);
                return None;
            }
        };

        let now_running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_running, Ordering::SeqCst);

        if let Some(task) = self.tasks.lock().await.get_mut(asset_id) {
            task.status = AssetState::Running;
            task.started_at = Some(Utc::now());
        }

        debug!("Asset {} acquired slot ({}/{})", asset_id, now_running, self.max_concurrent);
        Some(FetchSlot {
            _permit: permit,
            in_flight: self.in_flight.clone(),
        })
    }

    /// Mark an asset as written.
    pub async fn complete(&self, asset_id: &str) {
        self.finish(asset_id, AssetState::Done).await;
    }

    /// Mark an asset as failed.
    pub async fn fail(&self, asset_id: &str) {
        self.finish(asset_id, AssetState::Failed).await;
    }

    /// Mark an asset as cancelled.
    pub async fn mark_cancelled(&self, asset_id: &str) {
        self.finish(asset_id, AssetState::Cancelled).await;
    }

    async fn finish(&self, asset_id: &str, state: AssetState) {
        if let Some(task) = self.tasks.lock().await.get_mut(asset_id) {
            task.status = state;
            task.finished_at = Some(Utc::now());
        }
    }

    /// Stop handing out slots. Units still waiting get `None` from
    /// [`FetchQueue::acquire`]; running pipelines keep theirs until they finish.
    pub fn close(&self) {
        if !self.is_closed() {
            self.semaphore.close();
            debug!("Fetch queue closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Get count of pipelines currently holding a slot.
    pub fn running_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously running pipelines so far.
    pub fn peak_running(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Get queue statistics.
    pub async fn stats(&self) -> QueueStats {
        let tasks = self.tasks.lock().await;
        let count = |state: AssetState| tasks.values().filter(|t| t.status == state).count();
        QueueStats {
            max_concurrent: self.max_concurrent,
            running: self.running_count(),
            peak_running: self.peak_running(),
            queued: count(AssetState::Queued),
            completed: count(AssetState::Done),
            failed: count(AssetState::Failed),
            cancelled: count(AssetState::Cancelled),
            total_tracked: tasks.len(),
        }
    }
}

/// Queue statistics snapshot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueStats {
    pub max_concurrent: usize,
    pub running: usize,
    pub peak_running: usize,
    pub queued: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total_tracked: usize,
}
