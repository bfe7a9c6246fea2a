use std::collections::HashMap;
use std::sync::Arc;

use common::PodTask;
use tokio::sync::RwLock;

/// Local registry of observed pods, keyed by UID.
///
/// The dispatch loop is the only writer; registry mutation is idempotent,
/// so replaying a batch leaves the registry content-identical.
#[derive(Default)]
pub struct PodManager {
    pods: RwLock<HashMap<String, Arc<PodTask>>>,
}

impl PodManager {
    pub fn new() -> Self {
        PodManager::default()
    }

    pub async fn add_pod(&self, pod: Arc<PodTask>) {
        self.pods
            .write()
            .await
            .insert(pod.metadata.uid.clone(), pod);
    }

    /// Replace the stored pod with the freshly observed one.
    pub async fn update_pod(&self, pod: Arc<PodTask>) {
        self.pods
            .write()
            .await
            .insert(pod.metadata.uid.clone(), pod);
    }

    /// Evict the pod. Unknown UIDs are a no-op.
    pub async fn delete_pod(&self, uid: &str) {
        self.pods.write().await.remove(uid);
    }

    pub async fn get_pod_by_uid(&self, uid: &str) -> Option<Arc<PodTask>> {
        self.pods.read().await.get(uid).cloned()
    }

    pub async fn pods(&self) -> Vec<Arc<PodTask>> {
        self.pods.read().await.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.pods.read().await.len()
    }
}
