use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{ContainerSpec, ObjectMeta, PodSpec, PodTask};
use rklet::RkletError;
use rklet::events::EventRecorder;
use rklet::status::manager::StatusPublisher;
use serde_json::Value;

#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("rklet=debug")
        .try_init();
}

#[allow(dead_code)]
pub fn get_pod_config<T, S>(uid: T, name: T, containers: Vec<(S, Vec<S>)>) -> PodTask
where
    T: Into<String>,
    S: Into<String>,
{
    PodTask {
        api_version: "v1".to_string(),
        kind: "Pod".to_string(),
        metadata: ObjectMeta {
            name: name.into(),
            namespace: "default".to_string(),
            uid: uid.into(),
            ..Default::default()
        },
        spec: PodSpec {
            containers: containers
                .into_iter()
                .map(|(name, command)| ContainerSpec {
                    name: name.into(),
                    image: "busybox".to_string(),
                    command: command.into_iter().map(Into::into).collect(),
                    args: vec![],
                })
                .collect(),
            init_containers: vec![],
        },
    }
}

/// Publisher that accepts every patch and remembers it.
#[derive(Default)]
pub struct RecordingPublisher {
    pub patches: Mutex<Vec<(String, String, Value)>>,
}

#[async_trait]
impl StatusPublisher for RecordingPublisher {
    async fn patch_pod_status(
        &self,
        namespace: &str,
        name: &str,
        patch: Value,
    ) -> Result<PodTask, RkletError> {
        self.patches
            .lock()
            .unwrap()
            .push((namespace.to_string(), name.to_string(), patch));
        Ok(get_pod_config("published", name, Vec::<(&str, Vec<&str>)>::new()))
    }
}

/// Event recorder that collects (pod, reason, message) triples.
#[derive(Default)]
pub struct RecordingRecorder {
    pub events: Mutex<Vec<(String, String, String)>>,
}

impl EventRecorder for RecordingRecorder {
    fn event(&self, pod: &PodTask, _event_type: &str, reason: &str, message: &str) {
        self.events.lock().unwrap().push((
            pod.full_name(),
            reason.to_string(),
            message.to_string(),
        ));
    }
}

#[allow(dead_code)]
pub fn recording_rklet() -> (
    rklet::Rklet,
    Arc<RecordingPublisher>,
    tokio::sync::mpsc::UnboundedReceiver<rklet::workers::UpdatePodOptions>,
) {
    let publisher = Arc::new(RecordingPublisher::default());
    let (workers, work_rx) = rklet::workers::ChannelPodWorkers::new();
    let rklet = rklet::Rklet::new(
        publisher.clone(),
        Arc::new(workers),
        Arc::new(RecordingRecorder::default()),
    );
    (rklet, publisher, work_rx)
}
