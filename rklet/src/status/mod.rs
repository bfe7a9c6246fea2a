pub mod cache;
pub mod manager;
pub mod patch;
pub mod state;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerState {
    Running,
    Exited,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SandboxState {
    Ready,
    NotReady,
}

/// Pod-level execution context. The simplified model keeps exactly one
/// sandbox record per pod, but the status carries a list so a pod can
/// accumulate records over restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxStatus {
    pub id: String,
    pub state: SandboxState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    /// Only meaningful when `state` is `Exited`.
    #[serde(rename = "exitCode", default)]
    pub exit_code: i32,
    /// Free-form classification, `"Completed"` or `"Error"`.
    #[serde(default)]
    pub reason: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "startedAt", default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt", default)]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Canonical locally-derived status of one pod. Created on the first
/// Ready/Completed snapshot, mutated in place by the exit transition,
/// discarded when the pod is removed.
///
/// The container status names are always a subset of the pod's declared
/// container names: snapshots are only ever derived from the pod spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodStatus {
    pub uid: String,
    pub name: String,
    pub namespace: String,
    #[serde(rename = "sandboxStatuses", default)]
    pub sandbox_statuses: Vec<SandboxStatus>,
    #[serde(rename = "containerStatuses", default)]
    pub container_statuses: Vec<ContainerStatus>,
}

impl PodStatus {
    /// An empty snapshot carrying only identity. Used as the baseline the
    /// first time a pod's status is published.
    pub fn empty(uid: &str, name: &str, namespace: &str) -> Self {
        PodStatus {
            uid: uid.to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            sandbox_statuses: Vec::new(),
            container_statuses: Vec::new(),
        }
    }
}
