use common::PodTask;
use tracing::info;

// Container event reasons.
pub const CREATED_CONTAINER: &str = "Created";
pub const STARTED_CONTAINER: &str = "Started";
pub const FAILED_CONTAINER: &str = "Failed";
pub const KILLING_CONTAINER: &str = "Killing";
pub const BACK_OFF_START_CONTAINER: &str = "BackOff";

// Agent event reasons.
pub const CONTAINER_GC_FAILED: &str = "ContainerGCFailed";
pub const SANDBOX_CHANGED: &str = "SandboxChanged";

pub const EVENT_TYPE_NORMAL: &str = "Normal";
pub const EVENT_TYPE_WARNING: &str = "Warning";

/// Sink for pod-scoped events. Recording is best-effort: implementations
/// must not block the dispatch loop and must not fail observably.
pub trait EventRecorder: Send + Sync {
    fn event(&self, pod: &PodTask, event_type: &str, reason: &str, message: &str);
}

/// Records events as structured log lines. Hosts that talk to a real event
/// API swap in their own recorder.
#[derive(Default)]
pub struct LogEventRecorder;

impl EventRecorder for LogEventRecorder {
    fn event(&self, pod: &PodTask, event_type: &str, reason: &str, message: &str) {
        info!(
            pod = %pod.full_name(),
            event_type,
            reason,
            "{message}"
        );
    }
}
