use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::PodStatus;
use crate::error::RkletError;

/// Keyed store of the current status snapshot per pod UID.
///
/// Each entry sits behind its own lock: two read-modify-writes of the same
/// pod's snapshot can never interleave, while unrelated pods proceed
/// concurrently.
#[derive(Default)]
pub struct StatusCache {
    entries: RwLock<HashMap<String, Arc<Mutex<PodStatus>>>>,
}

impl StatusCache {
    pub fn new() -> Self {
        StatusCache::default()
    }

    /// Clone of the current snapshot, if one has been cached.
    pub async fn get(&self, uid: &str) -> Option<PodStatus> {
        let entry = self.entries.read().await.get(uid).cloned()?;
        let status = entry.lock().await;
        Some(status.clone())
    }

    /// Replace (or create) the snapshot for `uid`.
    pub async fn set(&self, uid: &str, status: PodStatus) {
        let mut entries = self.entries.write().await;
        match entries.get(uid) {
            Some(entry) => {
                *entry.lock().await = status;
            }
            None => {
                entries.insert(uid.to_string(), Arc::new(Mutex::new(status)));
            }
        }
    }

    /// Read-modify-write of an existing snapshot under its entry lock.
    /// Fails with `StatusNotFound` when no snapshot has been cached yet.
    pub async fn update<F>(&self, uid: &str, apply: F) -> Result<(), RkletError>
    where
        F: FnOnce(&mut PodStatus),
    {
        let entry = self
            .entries
            .read()
            .await
            .get(uid)
            .cloned()
            .ok_or_else(|| RkletError::StatusNotFound {
                uid: uid.to_string(),
            })?;
        let mut status = entry.lock().await;
        apply(&mut status);
        Ok(())
    }

    /// Discard the snapshot for `uid`. Unknown UIDs are a no-op.
    pub async fn remove(&self, uid: &str) {
        self.entries.write().await.remove(uid);
    }
}
