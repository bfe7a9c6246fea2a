use std::collections::HashMap;
use std::fmt;

use common::PodTask;
use tokio::sync::{RwLock, mpsc};

/// Capacity of the updates channel. A consumer that stops draining stalls
/// writers once this many undelivered updates accumulate; that backpressure
/// is intentional, there is exactly one consumer.
pub const UPDATES_CHANNEL_CAPACITY: usize = 20;

/// Identity of one container as known to the local runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerId(pub String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        ContainerId(id.into())
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of an asynchronous check against a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    Unknown,
    Success,
    Failure,
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeResult::Success => f.write_str("Success"),
            ProbeResult::Failure => f.write_str("Failure"),
            ProbeResult::Unknown => f.write_str("UNKNOWN"),
        }
    }
}

/// Sent on the updates channel whenever a cached result actually changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub container_id: ContainerId,
    pub result: ProbeResult,
    pub pod_uid: String,
}

/// Cache of the last observed probe result per container, plus a single
/// bounded stream of changes.
///
/// Reads proceed concurrently; writes are exclusive. `set` publishes an
/// [`Update`] only when the stored value changed, so redundant probe
/// reports never wake the consumer.
pub struct ResultsManager {
    cache: RwLock<HashMap<ContainerId, ProbeResult>>,
    updates: mpsc::Sender<Update>,
}

impl ResultsManager {
    /// Returns the manager together with the receiving half of the updates
    /// channel. Only one consumer is supported.
    pub fn new() -> (Self, mpsc::Receiver<Update>) {
        let (tx, rx) = mpsc::channel(UPDATES_CHANNEL_CAPACITY);
        (
            ResultsManager {
                cache: RwLock::new(HashMap::new()),
                updates: tx,
            },
            rx,
        )
    }

    pub async fn get(&self, id: &ContainerId) -> Option<ProbeResult> {
        self.cache.read().await.get(id).copied()
    }

    /// Cache `result` for `id`. The pod is only included to be sent with
    /// the update. Blocks when the updates channel is full.
    pub async fn set(&self, id: ContainerId, result: ProbeResult, pod: &PodTask) {
        if self.set_internal(id.clone(), result).await {
            let update = Update {
                container_id: id,
                result,
                pod_uid: pod.metadata.uid.clone(),
            };
            // The consumer owns the other half for the manager's lifetime;
            // a send can only fail if it was dropped, and then there is
            // nobody left to notify.
            let _ = self.updates.send(update).await;
        }
    }

    // Locked portion of set. Returns whether an update should be sent; the
    // lock is released before the channel send.
    async fn set_internal(&self, id: ContainerId, result: ProbeResult) -> bool {
        let mut cache = self.cache.write().await;
        match cache.get(&id) {
            Some(prev) if *prev == result => false,
            _ => {
                cache.insert(id, result);
                true
            }
        }
    }

    /// Evict the entry for `id`. No update is emitted.
    pub async fn remove(&self, id: &ContainerId) {
        self.cache.write().await.remove(id);
    }
}
