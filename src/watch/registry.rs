//! Single-slot registry of the active watch

use super::poller::Poller;
use super::{WatchSubscription, WatchTarget};
use crate::config::WatchConfig;
use crate::core::types::{MemoryResult, ValidationError, ValueSize, WatchId};
use crate::process::TargetHandle;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// Ids are never reused, even across registries.
static NEXT_WATCH_ID: AtomicU64 = AtomicU64::new(1);

struct ActiveWatch {
    id: WatchId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the one active watch
pub struct WatchRegistry {
    period: Duration,
    capacity: usize,
    active: Option<ActiveWatch>,
}

impl WatchRegistry {
    pub fn new(config: &WatchConfig) -> Self {
        WatchRegistry {
            period: config.poll_interval(),
            capacity: config.channel_capacity.max(1),
            active: None,
        }
    }

    /// Id of the active watch
    pub fn active(&self) -> Option<WatchId> {
        self.active.as_ref().map(|watch| watch.id)
    }

    /// Replaces the active watch with one over `watched`
    ///
    /// Every address is read once before the poller starts, so an
    /// unreadable address fails here rather than producing a silent stream.
    /// Must be called from within a tokio runtime.
    pub async fn watch(
        &mut self,
        target: Arc<TargetHandle>,
        watched: WatchTarget,
        size: ValueSize,
    ) -> MemoryResult<WatchSubscription> {
        if watched.addresses().is_empty() {
            return Err(ValidationError::EmptyWatch.into());
        }

        self.unlisten().await;

        for address in watched.addresses() {
            target.read_value(*address, size)?;
        }

        let id = NEXT_WATCH_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, events) = mpsc::channel(self.capacity);
        let cancel = CancellationToken::new();
        let addresses = watched.addresses().len();

        let poller = Poller {
            id,
            target,
            watched,
            size,
            period: self.period,
            cancel: cancel.clone(),
            events: sender,
        };
        let task = tokio::spawn(poller.run());

        info!(watch = id, addresses, size = size.bytes(), "watch started");
        self.active = Some(ActiveWatch { id, cancel, task });
        Ok(WatchSubscription { id, events })
    }

    /// Cancels the active watch and waits for its poller to stop
    ///
    /// Returns the cancelled id; a no-op when nothing is active.
    pub async fn unlisten(&mut self) -> Option<WatchId> {
        let watch = self.active.take()?;
        watch.cancel.cancel();
        if let Err(e) = watch.task.await {
            warn!(watch = watch.id, error = %e, "watch poller ended abnormally");
        }
        debug!(watch = watch.id, "watch cancelled");
        Some(watch.id)
    }
}

impl Drop for WatchRegistry {
    fn drop(&mut self) {
        if let Some(watch) = self.active.take() {
            watch.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("period", &self.period)
            .field("capacity", &self.capacity)
            .field("active", &self.active())
            .finish()
    }
}
