use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use common::PodTask;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::{PodOperation, PodUpdate};
use crate::context::SyncContext;
use crate::events::EventRecorder;
use crate::pod_manager::PodManager;
use crate::status::manager::{StatusManager, StatusPublisher};
use crate::workers::{PodWorkers, SyncPodType, UpdatePodOptions};

type Hook = Arc<dyn Fn(SyncContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// One optional hook per operation kind. Owned by the dispatcher,
/// populated before `run`, never mutated concurrently with dispatch.
/// Registering twice for a kind replaces the previous hook.
#[derive(Default)]
struct HookTable {
    pre_add: Option<Hook>,
    add: Option<Hook>,
    update: Option<Hook>,
    delete: Option<Hook>,
    remove: Option<Hook>,
}

fn wrap_hook<F, Fut>(hook: F) -> Hook
where
    F: Fn(SyncContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |ctx| hook(ctx).boxed())
}

/// The node agent: consumes the ordered pod change stream, keeps the local
/// registry current, dispatches work items, and drives host-registered
/// lifecycle hooks.
///
/// Batches are processed one at a time and hooks are awaited inline, so
/// per-pod event ordering is preserved and a slow hook delays everything
/// behind it. That trade is deliberate; hosts wanting cross-pod
/// parallelism run it inside their own worker pool.
pub struct Rklet {
    pod_manager: Arc<PodManager>,
    pod_workers: Arc<dyn PodWorkers>,
    status_manager: Arc<StatusManager>,
    recorder: Arc<dyn EventRecorder>,
    hooks: HookTable,
    sync_rx: Option<mpsc::UnboundedReceiver<String>>,
}

impl Rklet {
    pub fn new(
        publisher: Arc<dyn StatusPublisher>,
        pod_workers: Arc<dyn PodWorkers>,
        recorder: Arc<dyn EventRecorder>,
    ) -> Self {
        let (status_manager, sync_rx) = StatusManager::new(publisher);
        Rklet {
            pod_manager: Arc::new(PodManager::new()),
            pod_workers,
            status_manager,
            recorder,
            hooks: HookTable::default(),
            sync_rx: Some(sync_rx),
        }
    }

    pub fn pod_manager(&self) -> Arc<PodManager> {
        self.pod_manager.clone()
    }

    pub fn status_manager(&self) -> Arc<StatusManager> {
        self.status_manager.clone()
    }

    /// Invoked on Add, before the pod enters the registry.
    pub fn on_pre_add<F, Fut>(&mut self, hook: F)
    where
        F: Fn(SyncContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.hooks.pre_add = Some(wrap_hook(hook));
    }

    pub fn on_add<F, Fut>(&mut self, hook: F)
    where
        F: Fn(SyncContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.hooks.add = Some(wrap_hook(hook));
    }

    pub fn on_update<F, Fut>(&mut self, hook: F)
    where
        F: Fn(SyncContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.hooks.update = Some(wrap_hook(hook));
    }

    pub fn on_delete<F, Fut>(&mut self, hook: F)
    where
        F: Fn(SyncContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.hooks.delete = Some(wrap_hook(hook));
    }

    pub fn on_remove<F, Fut>(&mut self, hook: F)
    where
        F: Fn(SyncContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.hooks.remove = Some(wrap_hook(hook));
    }

    /// Start status publishing, then consume the change stream until it
    /// closes.
    pub async fn run(mut self, mut updates: mpsc::Receiver<PodUpdate>) {
        if let Some(sync_rx) = self.sync_rx.take() {
            tokio::spawn(self.status_manager.clone().run(sync_rx));
        }
        info!("rklet started");

        while let Some(batch) = updates.recv().await {
            self.handle_batch(batch).await;
        }
        info!("pod change stream closed, rklet stopping");
    }

    /// Process one batch. Split out of `run` so tests can drive the
    /// dispatcher without a channel.
    pub async fn handle_batch(&self, batch: PodUpdate) {
        if batch.pods.is_empty() {
            return;
        }
        match batch.op {
            PodOperation::Add => self.handle_pod_additions(batch.pods).await,
            // Update and Delete share the status-resync path; each still
            // routes to its own hook.
            PodOperation::Update | PodOperation::Delete => {
                self.handle_pod_updates(batch.op, batch.pods).await
            }
            PodOperation::Remove => self.handle_pod_removes(batch.pods).await,
        }
    }

    async fn handle_pod_additions(&self, pods: Vec<PodTask>) {
        for pod in pods {
            let pod = Arc::new(pod);
            self.run_hook(&self.hooks.pre_add, &pod, "pre-add").await;
            self.pod_manager.add_pod(pod.clone()).await;
            self.dispatch_work(SyncPodType::Create, pod.clone());
            self.run_hook(&self.hooks.add, &pod, "add").await;
        }
    }

    async fn handle_pod_updates(&self, op: PodOperation, pods: Vec<PodTask>) {
        for pod in pods {
            let pod = Arc::new(pod);
            self.pod_manager.update_pod(pod.clone()).await;
            self.dispatch_work(SyncPodType::Update, pod.clone());
            let (hook, kind) = if op == PodOperation::Delete {
                (&self.hooks.delete, "delete")
            } else {
                (&self.hooks.update, "update")
            };
            self.run_hook(hook, &pod, kind).await;
        }
    }

    async fn handle_pod_removes(&self, pods: Vec<PodTask>) {
        for pod in pods {
            let pod = Arc::new(pod);
            self.pod_manager.delete_pod(pod.uid()).await;
            self.dispatch_work(SyncPodType::Kill, pod.clone());
            self.run_hook(&self.hooks.remove, &pod, "remove").await;
            // The snapshot dies with the pod, after the hook had its last
            // look at it.
            self.status_manager.remove_pod(pod.uid()).await;
        }
    }

    fn dispatch_work(&self, update_type: SyncPodType, pod: Arc<PodTask>) {
        self.pod_workers.update_pod(UpdatePodOptions {
            update_type,
            pod,
            start_time: Utc::now(),
        });
    }

    // Hook failures are logged and isolated: one pod's hook can never
    // stall the rest of the batch or the stream.
    async fn run_hook(&self, hook: &Option<Hook>, pod: &Arc<PodTask>, kind: &str) {
        let Some(hook) = hook else {
            return;
        };
        let ctx = SyncContext::new(
            pod.clone(),
            self.status_manager.clone(),
            self.recorder.clone(),
        );
        if let Err(e) = hook(ctx).await {
            error!(pod = %pod.full_name(), "{kind} hook failed: {e:#}");
        }
    }
}
