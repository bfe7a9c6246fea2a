//! Merge-patch computation between two status snapshots.
//!
//! The patch carries only changed leaf fields plus the
//! `{"metadata":{"uid":…}}` identity precondition; list fields with a merge
//! key (container statuses by `name`, sandbox statuses by `id`) contribute
//! one entry per changed element, containing the key and the changed fields
//! only. A patch with nothing besides the precondition means the caller
//! must skip the network update entirely.

use serde_json::{Map, Value, json};

use super::PodStatus;
use crate::error::RkletError;

/// Prepares the status patch for one pod. Returns the patch and whether it
/// is semantically unchanged (precondition only).
pub fn prepare_patch(
    uid: &str,
    old: &PodStatus,
    new: &PodStatus,
) -> Result<(Value, bool), RkletError> {
    let old_value = serde_json::to_value(old)?;
    let new_value = serde_json::to_value(new)?;

    let diff = match (&old_value, &new_value) {
        (Value::Object(o), Value::Object(n)) => diff_objects(o, n),
        _ => Map::new(),
    };

    let unchanged = diff.is_empty();
    let mut patch = Map::new();
    patch.insert("metadata".to_string(), json!({ "uid": uid }));
    if !unchanged {
        patch.insert("status".to_string(), Value::Object(diff));
    }
    Ok((Value::Object(patch), unchanged))
}

// Merge key for list fields that are diffed element-wise instead of being
// replaced wholesale.
fn merge_key_for(field: &str) -> Option<&'static str> {
    match field {
        "containerStatuses" => Some("name"),
        "sandboxStatuses" => Some("id"),
        _ => None,
    }
}

fn diff_objects(old: &Map<String, Value>, new: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (field, new_value) in new {
        match old.get(field) {
            Some(old_value) if old_value == new_value => {}
            Some(old_value) => {
                let changed = match (old_value, new_value) {
                    (Value::Object(o), Value::Object(n)) => Value::Object(diff_objects(o, n)),
                    (Value::Array(o), Value::Array(n)) => match merge_key_for(field) {
                        Some(key) => Value::Array(diff_keyed_list(o, n, key)),
                        None => new_value.clone(),
                    },
                    _ => new_value.clone(),
                };
                out.insert(field.clone(), changed);
            }
            None => {
                out.insert(field.clone(), new_value.clone());
            }
        }
    }
    // A field dropped from the new snapshot patches to null.
    for field in old.keys() {
        if !new.contains_key(field) {
            out.insert(field.clone(), Value::Null);
        }
    }
    out
}

fn diff_keyed_list(old: &[Value], new: &[Value], key: &str) -> Vec<Value> {
    new.iter()
        .filter_map(|new_entry| {
            let entry_key = new_entry.get(key)?;
            match old.iter().find(|o| o.get(key) == Some(entry_key)) {
                Some(old_entry) if old_entry == new_entry => None,
                Some(old_entry) => match (old_entry, new_entry) {
                    (Value::Object(o), Value::Object(n)) => {
                        let mut changed = diff_objects(o, n);
                        changed.insert(key.to_string(), entry_key.clone());
                        Some(Value::Object(changed))
                    }
                    _ => Some(new_entry.clone()),
                },
                None => Some(new_entry.clone()),
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::status::state;
    use chrono::Utc;
    use common::{ContainerSpec, ObjectMeta, PodSpec, PodTask};

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
    fn test_identical_snapshots_are_unchanged() {
        let pod = make_pod(&["c1"]);
        let status = state::pod_ready(&pod, Utc::now());

        let (patch, unchanged) = prepare_patch("u1", &status, &status).unwrap();
        assert!(unchanged);
        assert_eq!(patch, json!({ "metadata": { "uid": "u1" } }));
    }

    #[test]
    fn test_single_field_change_patches_only_that_field() {
        let pod = make_pod(&["c1", "c2"]);
        let old = state::pod_ready(&pod, Utc::now());
        let mut new = old.clone();
        new.container_statuses[0].exit_code = 3;

        let (patch, unchanged) = prepare_patch("u1", &old, &new).unwrap();
        assert!(!unchanged);
        assert_eq!(
            patch,
            json!({
                "metadata": { "uid": "u1" },
                "status": {
                    "containerStatuses": [
                        { "name": "c1", "exitCode": 3 }
                    ]
                }
            })
        );
    }

    #[test]
    fn test_first_publish_includes_full_status() {
        let pod = make_pod(&["c1"]);
        let baseline = PodStatus::empty("u1", "web", "default");
        let new = state::pod_completed(&pod, Utc::now());

        let (patch, unchanged) = prepare_patch("u1", &baseline, &new).unwrap();
        assert!(!unchanged);
        let status = patch.get("status").unwrap();
        assert_eq!(
            status.get("containerStatuses").unwrap().as_array().unwrap().len(),
            1
        );
        assert_eq!(
            status.get("sandboxStatuses").unwrap().as_array().unwrap().len(),
            1
        );
        // Identity fields did not change and stay out of the patch.
        assert!(status.get("uid").is_none());
        assert!(status.get("name").is_none());
    }

    #[test]
    fn test_sandbox_flip_patches_state_only() {
        let pod = make_pod(&["c1"]);
        let old = state::pod_ready(&pod, Utc::now());
        let now = Utc::now();
        let new = state::container_exit(&old, &pod, "c1", 0, now);

        let (patch, _) = prepare_patch("u1", &old, &new).unwrap();
        let status = patch.get("status").unwrap();
        assert_eq!(
            status.get("sandboxStatuses").unwrap(),
            &json!([{ "id": "u1", "state": "NotReady" }])
        );
        let containers = status.get("containerStatuses").unwrap().as_array().unwrap();
        assert_eq!(containers.len(), 1);
        let entry = containers[0].as_object().unwrap();
        assert_eq!(entry.get("name").unwrap(), "c1");
        assert_eq!(entry.get("state").unwrap(), "Exited");
        assert_eq!(entry.get("reason").unwrap(), "Completed");
        assert!(entry.get("image").is_none());
        assert!(entry.get("createdAt").is_none());
    }
}
