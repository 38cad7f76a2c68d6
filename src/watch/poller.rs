//! Background task behind an active watch

use super::{WatchEvent, WatchTarget};
use crate::core::types::{MemoryResult, ValueSize, WatchId};
use crate::process::TargetHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub(super) struct Poller {
    pub id: WatchId,
    pub target: Arc<TargetHandle>,
    pub watched: WatchTarget,
    pub size: ValueSize,
    pub period: Duration,
    pub cancel: CancellationToken,
    pub events: mpsc::Sender<WatchEvent>,
}

impl Poller {
    fn sample(&self) -> MemoryResult<Vec<u32>> {
        self.watched
            .addresses()
            .iter()
            .map(|address| self.target.read_value(*address, self.size))
            .collect()
    }

    fn event(&self, values: &[u32]) -> WatchEvent {
        match self.watched {
            WatchTarget::Single(_) => WatchEvent::ValueUpdate {
                subscription: self.id,
                value: values[0],
            },
            WatchTarget::Batch(_) => WatchEvent::ValuesUpdate {
                subscription: self.id,
                values: values.to_vec(),
            },
        }
    }

    /// Samples every period until cancelled, the target closes or a read fails
    pub async fn run(self) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<Vec<u32>> = None;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if !self.target.is_open() {
                debug!(watch = self.id, "target closed; stopping watch");
                break;
            }

            let current = match self.sample() {
                Ok(values) => values,
                Err(e) => {
                    debug!(watch = self.id, error = %e, "watched read failed; stopping watch");
                    break;
                }
            };
            if last.as_ref() == Some(&current) {
                continue;
            }

            let event = self.event(&current);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                sent = self.events.send(event) => {
                    if sent.is_err() {
                        debug!(watch = self.id, "subscriber gone; stopping watch");
                        break;
                    }
                }
            }
            last = Some(current);
        }

        debug!(watch = self.id, "watch poller stopped");
    }
}
