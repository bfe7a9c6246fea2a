use std::sync::Arc;

use chrono::Utc;
use common::PodTask;

use crate::error::RkletError;
use crate::events::{EVENT_TYPE_NORMAL, EventRecorder};
use crate::runner::ContainerCmd;
use crate::status::manager::StatusManager;

/// Capabilities handed to a lifecycle hook, scoped to one pod.
///
/// A fresh context is built for every hook invocation and dropped when the
/// hook returns; nothing here is meant to be stashed away.
pub struct SyncContext {
    pod: Arc<PodTask>,
    status: Arc<StatusManager>,
    recorder: Arc<dyn EventRecorder>,
}

impl SyncContext {
    pub(crate) fn new(
        pod: Arc<PodTask>,
        status: Arc<StatusManager>,
        recorder: Arc<dyn EventRecorder>,
    ) -> Self {
        SyncContext {
            pod,
            status,
            recorder,
        }
    }

    /// The pod under reconciliation.
    pub fn pod(&self) -> &PodTask {
        &self.pod
    }

    /// Best-effort event tied to the bound pod.
    pub fn record_event(&self, reason: &str, message: &str) {
        self.recorder
            .event(&self.pod, EVENT_TYPE_NORMAL, reason, message);
    }

    /// Runnable command per container with a non-empty command, in
    /// declaration order. Containers relying on their image entrypoint are
    /// skipped: this core cannot run them locally.
    pub fn build_container_commands(&self) -> Vec<ContainerCmd> {
        self.pod
            .spec
            .containers
            .iter()
            .filter(|c| !c.command.is_empty())
            .map(|c| {
                let mut args: Vec<String> = c.command[1..].to_vec();
                args.extend(c.args.iter().cloned());
                ContainerCmd::new(c.name.clone(), c.command[0].clone(), args)
            })
            .collect()
    }

    /// Cache the Ready snapshot for the bound pod, stamped now.
    pub async fn mark_pod_ready(&self) {
        self.status.mark_pod_ready(&self.pod, Utc::now()).await;
    }

    /// Cache the Completed snapshot for the bound pod, stamped now,
    /// unconditionally replacing any prior snapshot.
    pub async fn mark_pod_completed(&self) {
        self.status.mark_pod_completed(&self.pod, Utc::now()).await;
    }

    /// Record one container's exit in the cached snapshot, stamped now.
    /// Fails with `StatusNotFound` when the pod was never marked ready.
    pub async fn mark_container_exited(
        &self,
        container_name: &str,
        exit_code: i32,
    ) -> Result<(), RkletError> {
        self.status
            .mark_container_exited(&self.pod, container_name, exit_code, Utc::now())
            .await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::{ContainerSpec, ObjectMeta, PodSpec};

    fn command_pod() -> Arc<PodTask> {
        Arc::new(PodTask {
            api_version: "v1".to_string(),
            kind: "Pod".to_string(),
            metadata: ObjectMeta {
                name: "web".to_string(),
                namespace: "default".to_string(),
                uid: "u1".to_string(),
                ..Default::default()
            },
            spec: PodSpec {
                containers: vec![
                    ContainerSpec {
                        name: "c1".to_string(),
                        image: "busybox".to_string(),
                        command: vec!["/bin/sh".to_string(), "-c".to_string()],
                        args: vec!["exit 3".to_string()],
                    },
                    ContainerSpec {
                        name: "entrypoint-only".to_string(),
                        image: "nginx".to_string(),
                        command: vec![],
                        args: vec!["-g".to_string()],
                    },
                ],
                init_containers: vec![],
            },
        })
    }

    #[test]
    fn test_build_container_commands_skips_entrypoint_containers() {
        use crate::events::LogEventRecorder;
        use crate::status::manager::{StatusManager, StatusPublisher};
        use async_trait::async_trait;
        use serde_json::Value;

        struct NoopPublisher;
        #[async_trait]
        impl StatusPublisher for NoopPublisher {
            async fn patch_pod_status(
                &self,
                _namespace: &str,
                _name: &str,
                _patch: Value,
            ) -> Result<PodTask, RkletError> {
                unreachable!("not published in this test")
            }
        }

        let (status, _rx) = StatusManager::new(Arc::new(NoopPublisher));
        let ctx = SyncContext::new(command_pod(), status, Arc::new(LogEventRecorder));

        let cmds = ctx.build_container_commands();
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].container_name, "c1");
        assert_eq!(cmds[0].program, "/bin/sh");
        assert_eq!(cmds[0].args, vec!["-c".to_string(), "exit 3".to_string()]);
    }
}
