use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;
use tracing::info;

use crate::error::RkletError;

/// Policy for garbage collecting dead containers. Immutable after
/// construction.
#[derive(Debug, Clone, Copy)]
pub struct GcPolicy {
    /// Minimum age at which a container may be collected, zero for no limit.
    pub min_age: Duration,
    /// Max dead containers any single (pod, container name) pair may keep,
    /// less than zero for no limit.
    pub max_per_pod_container: i32,
    /// Max total dead containers, less than zero for no limit.
    pub max_containers: i32,
}

/// Runtime-side collection of stale container state.
#[async_trait]
pub trait RuntimeGc: Send + Sync {
    async fn garbage_collect(
        &self,
        policy: &GcPolicy,
        sources_ready: bool,
        evict_all: bool,
    ) -> Result<()>;
}

/// Gate indicating all configuration sources have reported at least once.
/// Collection before that would evict containers whose pods simply have not
/// been observed yet.
pub trait SourcesReady: Send + Sync {
    fn all_ready(&self) -> bool;
}

/// Drives container garbage collection against the runtime collaborator.
pub struct ContainerGc {
    runtime: Arc<dyn RuntimeGc>,
    policy: GcPolicy,
    sources_ready: Arc<dyn SourcesReady>,
}

impl ContainerGc {
    pub fn new(
        runtime: Arc<dyn RuntimeGc>,
        policy: GcPolicy,
        sources_ready: Arc<dyn SourcesReady>,
    ) -> Result<Self, RkletError> {
        if policy.min_age < Duration::zero() {
            return Err(RkletError::InvalidPolicy(format!(
                "invalid minimum garbage collection age: {}",
                policy.min_age
            )));
        }
        Ok(ContainerGc {
            runtime,
            policy,
            sources_ready,
        })
    }

    /// Age- and count-bounded collection.
    pub async fn garbage_collect(&self) -> Result<()> {
        self.runtime
            .garbage_collect(&self.policy, self.sources_ready.all_ready(), false)
            .await
    }

    /// Deletes all unused containers, ignoring the age and count bounds.
    pub async fn delete_all_unused_containers(&self) -> Result<()> {
        info!("attempting to delete unused containers");
        self.runtime
            .garbage_collect(&self.policy, self.sources_ready.all_ready(), true)
            .await
    }
}
