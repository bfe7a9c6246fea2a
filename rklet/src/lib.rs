pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod gc;
pub mod pod_manager;
pub mod probe;
pub mod runner;
pub mod status;
pub mod workers;

// re-export selected public API
pub use agent::Rklet;
pub use config::{PodOperation, PodUpdate, StaticPodSource};
pub use context::SyncContext;
pub use error::RkletError;
pub use runner::{ContainerCmd, RUNNER_FAILURE_EXIT_CODE};
pub use status::manager::{StatusManager, StatusPublisher};
