use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TypeMeta {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    #[serde(rename = "kind")]
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Unique id of the object. Assigned by the control plane; static pod
    /// sources fill it in deterministically when the manifest omits it.
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    /// Set when the object has been asked to go away. The pod itself stays
    /// in the registry until the matching Remove arrives.
    #[serde(rename = "deletionTimestamp", default)]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

pub fn default_namespace() -> String {
    "default".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PodSpec {
    #[serde(default)]
    pub containers: Vec<ContainerSpec>,
    #[serde(default)]
    pub init_containers: Vec<ContainerSpec>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// Entrypoint override. A container without a command relies on its
    /// image entrypoint and cannot be run as a plain local process.
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PodTask {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    #[serde(rename = "kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
}

impl PodTask {
    pub fn uid(&self) -> &str {
        &self.metadata.uid
    }

    /// `name_namespace(uid)`, the canonical way a pod shows up in log lines.
    pub fn full_name(&self) -> String {
        format!(
            "{}_{}({})",
            self.metadata.name, self.metadata.namespace, self.metadata.uid
        )
    }
}
