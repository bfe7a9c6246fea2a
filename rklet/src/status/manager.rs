use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::PodTask;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use super::cache::StatusCache;
use super::{PodStatus, patch, state};
use crate::error::RkletError;

/// Upstream acceptor of status patches. The patch carries a
/// `{"metadata":{"uid":…}}` precondition; implementations return
/// `RkletError::Conflict` when the stored object no longer matches it.
#[async_trait]
pub trait StatusPublisher: Send + Sync {
    async fn patch_pod_status(
        &self,
        namespace: &str,
        name: &str,
        patch: Value,
    ) -> Result<PodTask, RkletError>;
}

/// Owns the canonical status snapshots and publishes them upstream.
///
/// Hook contexts mutate snapshots through the `mark_*` operations; each
/// mutation queues the pod for a publish pass. The publish loop diffs the
/// current snapshot against what was last accepted upstream and skips the
/// network round-trip entirely when nothing changed.
pub struct StatusManager {
    cache: StatusCache,
    last_published: Mutex<HashMap<String, PodStatus>>,
    publisher: Arc<dyn StatusPublisher>,
    sync_tx: mpsc::UnboundedSender<String>,
}

impl StatusManager {
    pub fn new(
        publisher: Arc<dyn StatusPublisher>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (sync_tx, sync_rx) = mpsc::unbounded_channel();
        (
            Arc::new(StatusManager {
                cache: StatusCache::new(),
                last_published: Mutex::new(HashMap::new()),
                publisher,
                sync_tx,
            }),
            sync_rx,
        )
    }

    /// Clone of the current cached snapshot for `uid`, if any.
    pub async fn pod_status(&self, uid: &str) -> Option<PodStatus> {
        self.cache.get(uid).await
    }

    /// Cache the Ready snapshot for `pod`, replacing any prior one.
    pub async fn mark_pod_ready(&self, pod: &PodTask, now: DateTime<Utc>) {
        self.cache.set(pod.uid(), state::pod_ready(pod, now)).await;
        self.request_sync(pod.uid());
    }

    /// Cache the Completed snapshot for `pod`, replacing any prior one.
    pub async fn mark_pod_completed(&self, pod: &PodTask, now: DateTime<Utc>) {
        self.cache
            .set(pod.uid(), state::pod_completed(pod, now))
            .await;
        self.request_sync(pod.uid());
    }

    /// Apply the container-exit transition to the cached snapshot. Fails
    /// with `StatusNotFound` when the pod was never marked ready or
    /// completed.
    pub async fn mark_container_exited(
        &self,
        pod: &PodTask,
        container_name: &str,
        exit_code: i32,
        now: DateTime<Utc>,
    ) -> Result<(), RkletError> {
        self.cache
            .update(pod.uid(), |prior| {
                *prior = state::container_exit(prior, pod, container_name, exit_code, now);
            })
            .await?;
        self.request_sync(pod.uid());
        Ok(())
    }

    /// Discard all local status state for `uid`.
    pub async fn remove_pod(&self, uid: &str) {
        self.cache.remove(uid).await;
        self.last_published.lock().await.remove(uid);
    }

    fn request_sync(&self, uid: &str) {
        // The receiver lives as long as the publish loop; a failed send
        // only means the loop is gone and there is nothing to publish to.
        let _ = self.sync_tx.send(uid.to_string());
    }

    /// Publish loop. Drains sync requests until the manager is dropped.
    pub async fn run(self: Arc<Self>, mut sync_rx: mpsc::UnboundedReceiver<String>) {
        info!("status manager started");
        while let Some(uid) = sync_rx.recv().await {
            self.sync_pod(&uid).await;
        }
    }

    /// One publish pass for `uid`.
    pub async fn sync_pod(&self, uid: &str) {
        let Some(current) = self.cache.get(uid).await else {
            // Removed between the sync request and now.
            return;
        };
        let old = {
            let last = self.last_published.lock().await;
            last.get(uid).cloned()
        }
        .unwrap_or_else(|| PodStatus::empty(&current.uid, &current.name, &current.namespace));

        let (patch_value, unchanged) = match patch::prepare_patch(uid, &old, &current) {
            Ok(prepared) => prepared,
            Err(e) => {
                error!(pod = uid, "failed to compute status patch: {e}");
                return;
            }
        };
        if unchanged {
            debug!(pod = uid, "status unchanged, skipping patch");
            return;
        }

        match self
            .publisher
            .patch_pod_status(&current.namespace, &current.name, patch_value)
            .await
        {
            Ok(_) => {
                debug!(pod = uid, "status patched");
                self.last_published
                    .lock()
                    .await
                    .insert(uid.to_string(), current);
            }
            Err(RkletError::Conflict { .. }) => {
                // The pod was replaced or deleted concurrently. Retrying
                // with a fresh object is upstream's concern.
                warn!(pod = uid, "status patch conflict, dropping update");
            }
            Err(e) => {
                error!(pod = uid, "failed to patch status: {e}");
            }
        }
    }
}
