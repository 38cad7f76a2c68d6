//! Push-based value watching
//!
//! At most one watch is active at a time. Starting a watch cancels the
//! previous one and waits for its poller to stop, so events from an old
//! subscription never follow the new subscription's id.

mod poller;
mod registry;

pub use registry::WatchRegistry;

use crate::core::types::{Address, WatchId};
use serde::Serialize;
use tokio::sync::mpsc;

/// What a watch observes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchTarget {
    /// One address; events are [`WatchEvent::ValueUpdate`]
    Single(Address),
    /// Several addresses; events are [`WatchEvent::ValuesUpdate`] in input order
    Batch(Vec<Address>),
}

impl WatchTarget {
    pub fn addresses(&self) -> &[Address] {
        match self {
            WatchTarget::Single(address) => std::slice::from_ref(address),
            WatchTarget::Batch(addresses) => addresses,
        }
    }
}

/// Pushed whenever a watched value differs from the last one delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WatchEvent {
    ValueUpdate { subscription: WatchId, value: u32 },
    ValuesUpdate { subscription: WatchId, values: Vec<u32> },
}

impl WatchEvent {
    pub fn subscription(&self) -> WatchId {
        match self {
            WatchEvent::ValueUpdate { subscription, .. }
            | WatchEvent::ValuesUpdate { subscription, .. } => *subscription,
        }
    }
}

/// A live watch; the stream ends when the watch is cancelled or its target goes away
#[derive(Debug)]
pub struct WatchSubscription {
    pub id: WatchId,
    pub events: mpsc::Receiver<WatchEvent>,
}
