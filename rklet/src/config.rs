//! The pod change stream and a file-based source producing it.
//!
//! The dispatcher consumes batched [`PodUpdate`]s in order from a single
//! channel; who produces them is the host's business. [`StaticPodSource`]
//! is the built-in producer: it scans a manifest directory on an interval
//! and emits Add/Update/Remove batches by diffing against what it saw last.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, anyhow};
use common::PodTask;
use tokio::fs::{File, read_dir};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{error, warn};

/// Operation kind of one batch on the change stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodOperation {
    Add,
    Update,
    Delete,
    Remove,
}

/// One batch of pod changes. `pods` is processed in list order.
#[derive(Debug, Clone)]
pub struct PodUpdate {
    pub op: PodOperation,
    pub pods: Vec<PodTask>,
}

/// Watches a directory of pod manifests and feeds the change stream.
pub struct StaticPodSource {
    manifest_dir: PathBuf,
    interval: Duration,
    updates: mpsc::Sender<PodUpdate>,
    // uid -> (manifest hash, last observed pod)
    seen: HashMap<String, (u64, PodTask)>,
}

impl StaticPodSource {
    pub fn new(
        manifest_dir: impl Into<PathBuf>,
        interval: Duration,
        updates: mpsc::Sender<PodUpdate>,
    ) -> Self {
        StaticPodSource {
            manifest_dir: manifest_dir.into(),
            interval,
            updates,
            seen: HashMap::new(),
        }
    }

    /// Scan forever. Errors are logged; the next interval retries.
    pub async fn run(mut self) {
        loop {
            if let Err(e) = self.scan_once().await {
                error!("failed to scan static pod manifests: {e}");
            }
            sleep(self.interval).await;
        }
    }

    /// One scan pass: read the directory, diff against the previously
    /// observed set, push the resulting batches.
    pub async fn scan_once(&mut self) -> Result<()> {
        let pods = read_pods_from_dir(&self.manifest_dir).await?;

        let mut added = Vec::new();
        let mut updated = Vec::new();
        let mut observed: HashMap<String, (u64, PodTask)> = HashMap::new();

        for mut pod in pods {
            if pod.metadata.uid.is_empty() {
                pod.metadata.uid = manifest_uid(&pod);
            }
            let hash = manifest_hash(&pod);
            match self.seen.get(&pod.metadata.uid) {
                None => added.push(pod.clone()),
                Some((prev_hash, _)) if *prev_hash != hash => updated.push(pod.clone()),
                Some(_) => {}
            }
            observed.insert(pod.metadata.uid.clone(), (hash, pod));
        }

        let removed: Vec<PodTask> = self
            .seen
            .iter()
            .filter(|(uid, _)| !observed.contains_key(uid.as_str()))
            .map(|(_, (_, pod))| pod.clone())
            .collect();

        self.seen = observed;

        if !added.is_empty() {
            self.send(PodOperation::Add, added).await?;
        }
        if !updated.is_empty() {
            self.send(PodOperation::Update, updated).await?;
        }
        if !removed.is_empty() {
            self.send(PodOperation::Remove, removed).await?;
        }
        Ok(())
    }

    async fn send(&self, op: PodOperation, pods: Vec<PodTask>) -> Result<()> {
        self.updates
            .send(PodUpdate { op, pods })
            .await
            .map_err(|_| anyhow!("pod update channel closed"))
    }
}

/// Deterministic uid for a manifest that does not declare one. Stable
/// across rescans so the same file keeps the same identity.
fn manifest_uid(pod: &PodTask) -> String {
    let mut s = DefaultHasher::new();
    pod.metadata.namespace.hash(&mut s);
    pod.metadata.name.hash(&mut s);
    format!("static-{:x}", s.finish())
}

/// Hash of the manifest content, for change detection. Lines are sorted
/// first since serialization order is not guaranteed to be stable.
fn manifest_hash(pod: &PodTask) -> u64 {
    let yaml = serde_yaml::to_string(pod).unwrap_or_default();
    let mut lines: Vec<_> = yaml.split('\n').collect();
    lines.sort_unstable();
    let mut s = DefaultHasher::new();
    lines.hash(&mut s);
    s.finish()
}

/// Parse every manifest in `path`. Unreadable or invalid files are logged
/// and skipped; they never fail the scan.
async fn read_pods_from_dir<P: AsRef<Path>>(path: P) -> Result<Vec<PodTask>> {
    let mut entries = read_dir(path)
        .await
        .map_err(|e| anyhow!("failed to read static pods dir: {e}"))?;
    let mut res: Vec<PodTask> = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| anyhow!("failed to read static pods dir entries: {e}"))?
    {
        let file_path = entry.path();
        let mut content = String::new();
        let mut file = match File::open(&file_path).await {
            Ok(f) => f,
            Err(e) => {
                warn!("failed to open pod manifest {file_path:#?}: {e}, skipped");
                continue;
            }
        };
        match file.read_to_string(&mut content).await {
            Ok(_) => match serde_yaml::from_str(&content) {
                Ok(pod) => res.push(pod),
                Err(e) => warn!("failed to parse pod manifest {file_path:#?}: {e}, skipped"),
            },
            Err(e) => warn!("pod manifest {file_path:#?} is not valid utf8: {e}, skipped"),
        }
    }
    // Directory iteration order is arbitrary; keep batches deterministic.
    res.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
    Ok(res)
}
