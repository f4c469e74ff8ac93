//! TaskRunner - 委譲された操作を呼び出し元とは別のタスクで実行
//!
//! # フロー
//! 1. spawn 前に `on_started` を同期的に呼ぶ
//! 2. 操作は専用の Tokio task で実行
//! 3. 成功したら artifact を record store に追記
//! 4. `on_succeeded` / `on_failed` のどちらか一方だけを呼ぶ
//!
//! キューも single-flight もありません。`run` はそれぞれ独立で、追記の直列化は
//! record store が担当します。

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

use crate::domain::{Artifact, TaskId, TaskKind, TaskPhase, TaskSnapshot};
use crate::error::TaskError;
use crate::ports::{IdGenerator, SystemClock, TaskListener, UlidGenerator};
use crate::store::RecordStore;

/// Per-run knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Give up (and report `TaskError::TimedOut`) after this long.
    pub timeout: Option<Duration>,
}

pub struct TaskRunner {
    runtime: Handle,
    store: Arc<RecordStore>,
    ids: Arc<dyn IdGenerator>,
    default_options: RunOptions,
}

impl TaskRunner {
    /// Tasks are spawned on `runtime`, so `run` can be called from any thread.
    pub fn new(runtime: Handle, store: Arc<RecordStore>) -> Self {
        Self {
            runtime,
            store,
            ids: Arc::new(UlidGenerator::new(SystemClock)),
            default_options: RunOptions::default(),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_default_options(mut self, options: RunOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Run `operation` with the default options.
    pub fn run<F>(&self, kind: TaskKind, operation: F, listener: Arc<dyn TaskListener>) -> TaskHandle
    where
        F: Future<Output = Result<Artifact, TaskError>> + Send + 'static,
    {
        self.run_with(kind, operation, listener, self.default_options)
    }

    pub fn run_with<F>(
        &self,
        kind: TaskKind,
        operation: F,
        listener: Arc<dyn TaskListener>,
        options: RunOptions,
    ) -> TaskHandle
    where
        F: Future<Output = Result<Artifact, TaskError>> + Send + 'static,
    {
        let id = self.ids.generate_task_id();
        let snapshot = TaskSnapshot::new(id, kind).running();

        tracing::info!(task_id = %id, %kind, "task started");
        listener.on_started(&snapshot);

        let (phase_tx, phase_rx) = watch::channel(TaskPhase::Running);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let store = Arc::clone(&self.store);

        let join = self.runtime.spawn(async move {
            let outcome = supervise(operation, options.timeout, cancel_rx).await;
            finish(snapshot, outcome, store, listener.as_ref(), &phase_tx).await
        });

        TaskHandle {
            id,
            kind,
            phase_rx,
            cancel_tx,
            join,
        }
    }

    /// Report a task that never got to start (bad input, user backed out).
    ///
    /// `on_started` is not called; `on_failed` is, synchronously.
    pub fn reject(
        &self,
        kind: TaskKind,
        error: TaskError,
        listener: &dyn TaskListener,
    ) -> TaskSnapshot {
        let id = self.ids.generate_task_id();
        tracing::info!(task_id = %id, %kind, error = %error, "task rejected before start");
        let snapshot = TaskSnapshot::new(id, kind).failed(error.clone());
        listener.on_failed(&snapshot, &error);
        snapshot
    }
}

/// Handle to one running task.
///
/// Dropping the handle detaches the task; it keeps running and still
/// notifies its listener.
pub struct TaskHandle {
    id: TaskId,
    kind: TaskKind,
    phase_rx: watch::Receiver<TaskPhase>,
    cancel_tx: watch::Sender<bool>,
    join: JoinHandle<TaskSnapshot>,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Current phase. Turns terminal only after the listener has been notified.
    pub fn phase(&self) -> TaskPhase {
        *self.phase_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskPhase> {
        self.phase_rx.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the operation. The listener gets `on_failed(Cancelled)` unless the
    /// task already finished.
    pub fn cancel(&self) {
        // ignore send error: the task may already be gone
        let _ = self.cancel_tx.send(true);
    }

    /// Wait for the task and return its final snapshot.
    pub async fn wait(self) -> TaskSnapshot {
        match self.join.await {
            Ok(snapshot) => snapshot,
            Err(e) => TaskSnapshot::new(self.id, self.kind)
                .failed(TaskError::operation(format!("task aborted: {e}"))),
        }
    }
}

async fn supervise<F>(
    operation: F,
    timeout: Option<Duration>,
    mut cancel_rx: watch::Receiver<bool>,
) -> Result<Artifact, TaskError>
where
    F: Future<Output = Result<Artifact, TaskError>> + Send + 'static,
{
    // Own task so a panic in the operation surfaces as a JoinError.
    let mut op = tokio::spawn(operation);

    let deadline = async move {
        match timeout {
            Some(limit) => {
                tokio::time::sleep(limit).await;
                limit
            }
            None => std::future::pending().await,
        }
    };

    // A finished operation wins over a cancel or deadline that raced it.
    tokio::select! {
        biased;
        joined = &mut op => joined.unwrap_or_else(|e| Err(join_error(e))),
        _ = cancelled(&mut cancel_rx) => {
            op.abort();
            Err(TaskError::Cancelled)
        }
        limit = deadline => {
            op.abort();
            Err(TaskError::TimedOut(limit))
        }
    }
}

async fn finish(
    snapshot: TaskSnapshot,
    outcome: Result<Artifact, TaskError>,
    store: Arc<RecordStore>,
    listener: &dyn TaskListener,
    phase_tx: &watch::Sender<TaskPhase>,
) -> TaskSnapshot {
    let (id, kind) = (snapshot.id, snapshot.kind);

    match outcome {
        Ok(artifact) => {
            persist(&store, id, kind, &artifact).await;
            tracing::info!(task_id = %id, %kind, path = %artifact.location.display(), "task succeeded");

            let snapshot = snapshot.succeeded();
            listener.on_succeeded(&snapshot, &artifact);
            phase_tx.send_replace(TaskPhase::Succeeded);
            snapshot
        }
        Err(error) => {
            tracing::warn!(task_id = %id, %kind, error = %error, "task failed");

            let snapshot = snapshot.failed(error.clone());
            listener.on_failed(&snapshot, &error);
            phase_tx.send_replace(TaskPhase::Failed);
            snapshot
        }
    }
}

// Store failures are logged only; the artifact is already on disk.
async fn persist(store: &Arc<RecordStore>, id: TaskId, kind: TaskKind, artifact: &Artifact) {
    let store = Arc::clone(store);
    let label = artifact.label.clone();
    let location = artifact.location.clone();

    match tokio::task::spawn_blocking(move || store.append(kind, label, location)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::error!(task_id = %id, error = %e, "failed to record history"),
        Err(e) => tracing::error!(task_id = %id, error = %e, "history writer panicked"),
    }
}

async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Handle dropped without cancelling: run to completion.
            std::future::pending::<()>().await;
        }
    }
}

fn join_error(err: JoinError) -> TaskError {
    if err.is_panic() {
        TaskError::operation(panic_message(err.into_panic()))
    } else {
        TaskError::Cancelled
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "operation panicked".to_string()
    }
}
