//! Pure transitions from a pod spec (and, for the exit transition, a prior
//! snapshot) to a new [`PodStatus`]. Nothing here touches the cache or the
//! clock; callers pass `now` and store the result.

use chrono::{DateTime, Duration, Utc};
use common::PodTask;

use super::{ContainerState, ContainerStatus, PodStatus, SandboxState, SandboxStatus};

/// Models the latency between sandbox creation and the containers actually
/// starting.
fn sandbox_start_offset() -> Duration {
    Duration::seconds(3)
}

fn exit_reason(exit_code: i32) -> &'static str {
    if exit_code == 0 { "Completed" } else { "Error" }
}

/// Snapshot for a pod that has just been admitted: sandbox ready, every
/// declared container running.
pub fn pod_ready(pod: &PodTask, now: DateTime<Utc>) -> PodStatus {
    let container_statuses = pod
        .spec
        .containers
        .iter()
        .map(|c| ContainerStatus {
            name: c.name.clone(),
            image: c.image.clone(),
            state: ContainerState::Running,
            exit_code: 0,
            reason: String::new(),
            created_at: Some(now),
            started_at: Some(now + sandbox_start_offset()),
            finished_at: None,
        })
        .collect();

    PodStatus {
        uid: pod.metadata.uid.clone(),
        name: pod.metadata.name.clone(),
        namespace: pod.metadata.namespace.clone(),
        sandbox_statuses: vec![SandboxStatus {
            id: pod.metadata.uid.clone(),
            state: SandboxState::Ready,
        }],
        container_statuses,
    }
}

/// Snapshot for a pod declared done as a whole: sandbox not ready, every
/// declared container exited successfully.
pub fn pod_completed(pod: &PodTask, now: DateTime<Utc>) -> PodStatus {
    let container_statuses = pod
        .spec
        .containers
        .iter()
        .map(|c| ContainerStatus {
            name: c.name.clone(),
            image: c.image.clone(),
            state: ContainerState::Exited,
            exit_code: 0,
            reason: exit_reason(0).to_string(),
            created_at: None,
            started_at: None,
            finished_at: Some(now),
        })
        .collect();

    PodStatus {
        uid: pod.metadata.uid.clone(),
        name: pod.metadata.name.clone(),
        namespace: pod.metadata.namespace.clone(),
        sandbox_statuses: vec![SandboxStatus {
            id: pod.metadata.uid.clone(),
            state: SandboxState::NotReady,
        }],
        container_statuses,
    }
}

/// Patches a single container's exit into `prior`.
///
/// Only the entry matching `container_name` is touched (an unmatched name
/// is a no-op, not an error); everything else is carried over unchanged.
/// The sandbox goes not-ready only when the pod declares exactly one
/// container: a multi-container pod stays schedulable after one exit.
pub fn container_exit(
    prior: &PodStatus,
    pod: &PodTask,
    container_name: &str,
    exit_code: i32,
    now: DateTime<Utc>,
) -> PodStatus {
    let sandbox_state = if pod.spec.containers.len() == 1 {
        SandboxState::NotReady
    } else {
        SandboxState::Ready
    };

    let mut status = prior.clone();
    for sandbox in &mut status.sandbox_statuses {
        sandbox.state = sandbox_state;
    }
    for c in &mut status.container_statuses {
        if c.name == container_name {
            c.state = ContainerState::Exited;
            c.exit_code = exit_code;
            c.reason = exit_reason(exit_code).to_string();
            c.finished_at = Some(now);
        }
    }
    status
}

#[cfg(test)]
mod test {
    use super::*;
    use common::{ContainerSpec, ObjectMeta, PodSpec};

    fn make_pod(containers: &[&str]) -> PodTask {
        PodTask {
            api_version: "v1".to_string(),
            kind: "Pod".to_string(),
            metadata: ObjectMeta {
                name: "web".to_string(),
                namespace: "default".to_string(),
                uid: "u1".to_string(),
                ..Default::default()
            },
            spec: PodSpec {
                containers: containers
                    .iter()
                    .map(|name| ContainerSpec {
                        name: name.to_string(),
                        image: "busybox".to_string(),
                        command: vec![],
                        args: vec![],
                    })
                    .collect(),
                init_containers: vec![],
            },
        }
    }

    #[test]
    fn test_ready_snapshot() {
        let pod = make_pod(&["c1", "c2"]);
        let now = Utc::now();
        let status = pod_ready(&pod, now);

        assert_eq!(status.uid, "u1");
        assert_eq!(status.sandbox_statuses.len(), 1);
        assert_eq!(status.sandbox_statuses[0].state, SandboxState::Ready);
        assert_eq!(status.container_statuses.len(), 2);
        for c in &status.container_statuses {
            assert_eq!(c.state, ContainerState::Running);
            assert_eq!(c.created_at, Some(now));
            assert_eq!(c.started_at, Some(now + Duration::seconds(3)));
            assert!(c.finished_at.is_none());
        }
    }

    #[test]
    fn test_completed_snapshot() {
        let pod = make_pod(&["c1", "c2"]);
        let status = pod_completed(&pod, Utc::now());

        assert_eq!(status.sandbox_statuses[0].state, SandboxState::NotReady);
        for c in &status.container_statuses {
            assert_eq!(c.state, ContainerState::Exited);
            assert_eq!(c.exit_code, 0);
            assert_eq!(c.reason, "Completed");
            assert!(c.finished_at.is_some());
        }
    }

    #[test]
    fn test_container_exit_zero_touches_only_named_entry() {
        let pod = make_pod(&["c1", "c2"]);
        let prior = pod_ready(&pod, Utc::now());
        let status = container_exit(&prior, &pod, "c1", 0, Utc::now());

        let c1 = &status.container_statuses[0];
        assert_eq!(c1.state, ContainerState::Exited);
        assert_eq!(c1.exit_code, 0);
        assert_eq!(c1.reason, "Completed");
        assert_eq!(status.container_statuses[1], prior.container_statuses[1]);
    }

    #[test]
    fn test_container_exit_nonzero_single_container() {
        let pod = make_pod(&["c1"]);
        let prior = pod_ready(&pod, Utc::now());
        let status = container_exit(&prior, &pod, "c1", 137, Utc::now());

        assert_eq!(status.sandbox_statuses[0].state, SandboxState::NotReady);
        assert_eq!(status.container_statuses[0].exit_code, 137);
        assert_eq!(status.container_statuses[0].reason, "Error");
    }

    #[test]
    fn test_container_exit_nonzero_multi_container_keeps_sandbox_ready() {
        let pod = make_pod(&["c1", "c2"]);
        let prior = pod_ready(&pod, Utc::now());
        let status = container_exit(&prior, &pod, "c2", 137, Utc::now());

        assert_eq!(status.sandbox_statuses[0].state, SandboxState::Ready);
        assert_eq!(status.container_statuses[1].reason, "Error");
    }

    #[test]
    fn test_container_exit_unmatched_name_is_noop_on_containers() {
        let pod = make_pod(&["c1"]);
        let prior = pod_ready(&pod, Utc::now());
        let status = container_exit(&prior, &pod, "nope", 1, Utc::now());

        assert_eq!(status.container_statuses, prior.container_statuses);
        // The sandbox recomputation still applies.
        assert_eq!(status.sandbox_statuses[0].state, SandboxState::NotReady);
    }

    #[test]
    fn test_runner_sentinel_classifies_as_error() {
        let pod = make_pod(&["c1"]);
        let prior = pod_ready(&pod, Utc::now());
        let status = container_exit(
            &prior,
            &pod,
            "c1",
            crate::runner::RUNNER_FAILURE_EXIT_CODE,
            Utc::now(),
        );
        assert_eq!(status.container_statuses[0].reason, "Error");
    }
}
