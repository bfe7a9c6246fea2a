use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::PodTask;
use tokio::sync::mpsc;

/// What kind of sync a work item asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPodType {
    Create,
    Update,
    Kill,
}

/// One unit of work handed to the external worker pool.
#[derive(Clone)]
pub struct UpdatePodOptions {
    pub update_type: SyncPodType,
    pub pod: Arc<PodTask>,
    pub start_time: DateTime<Utc>,
}

/// Seam to the external work queue / worker pool. Dispatch is
/// fire-and-forget: implementations must never block the dispatch loop.
pub trait PodWorkers: Send + Sync {
    fn update_pod(&self, options: UpdatePodOptions);
}

/// Forwards work items onto an unbounded channel; the host drains the
/// receiver into whatever retry machinery it runs.
pub struct ChannelPodWorkers {
    tx: mpsc::UnboundedSender<UpdatePodOptions>,
}

impl ChannelPodWorkers {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UpdatePodOptions>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelPodWorkers { tx }, rx)
    }
}

impl PodWorkers for ChannelPodWorkers {
    fn update_pod(&self, options: UpdatePodOptions) {
        // A dropped receiver means the host stopped consuming work; there
        // is nothing useful to do with the item.
        let _ = self.tx.send(options);
    }
}
