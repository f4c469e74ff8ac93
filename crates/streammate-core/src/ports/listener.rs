//! Listener ports - コアからプレゼンテーション層への通知
//!
//! listener はランタイムのワーカースレッドから呼ばれます。GUI フロントエンドは
//! ウィジェットに触る前に自分のスレッドへ移す必要があります。

use crate::domain::{Artifact, TaskSnapshot};
use crate::error::TaskError;

/// 1 つのタスクのライフサイクルを受け取る
///
/// `TaskRunner::run` ごとに、まず `on_started`、その後 `on_succeeded` /
/// `on_failed` のどちらか一方だけが呼ばれます。
pub trait TaskListener: Send + Sync {
    fn on_started(&self, _task: &TaskSnapshot) {}

    fn on_succeeded(&self, task: &TaskSnapshot, artifact: &Artifact);

    fn on_failed(&self, task: &TaskSnapshot, error: &TaskError);
}

/// Listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTaskListener;

impl TaskListener for NoopTaskListener {
    fn on_succeeded(&self, _task: &TaskSnapshot, _artifact: &Artifact) {}

    fn on_failed(&self, _task: &TaskSnapshot, _error: &TaskError) {}
}

/// Receives each reachability result.
pub trait ConnectivityListener: Send + Sync {
    fn on_update(&self, online: bool);
}

impl<F> ConnectivityListener for F
where
    F: Fn(bool) + Send + Sync,
{
    fn on_update(&self, online: bool) {
        self(online)
    }
}
