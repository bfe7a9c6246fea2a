use thiserror::Error;

#[derive(Debug, Error)]
pub enum RkletError {
    #[error("invalid garbage collection policy: {0}")]
    InvalidPolicy(String),

    #[error("no cached status for pod {uid}")]
    StatusNotFound { uid: String },

    #[error("status patch for pod {namespace}/{name} rejected: uid precondition {uid} no longer matches")]
    Conflict {
        namespace: String,
        name: String,
        uid: String,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
