//! ConnectivityMonitor - 定期的な到達性チェック
//!
//! # フロー
//! 1. probe
//! 2. 結果を保存して listener に渡す
//! 3. `interval` だけ sleep して繰り返す
//!
//! 停止シグナルは各サイクルの前と sleep 中に確認するので、
//! `MonitorHandle::shutdown` はすぐに返ります。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::ports::{Clock, ConnectivityListener, ReachabilityProbe, SystemClock};

/// Result of the latest probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivitySnapshot {
    pub online: bool,
    pub checked_at: DateTime<Utc>,
}

pub struct ConnectivityMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    interval: Duration,
    clock: Arc<dyn Clock>,
}

impl ConnectivityMonitor {
    pub fn new(probe: Arc<dyn ReachabilityProbe>, interval: Duration) -> Self {
        Self {
            probe,
            interval,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Spawn the loop on `runtime`.
    ///
    /// Dropping the returned handle stops the loop as well.
    #[must_use = "dropping the handle stops the monitor"]
    pub fn start(self, runtime: &Handle, listener: Arc<dyn ConnectivityListener>) -> MonitorHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(None);

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "connectivity monitor started");
        let join = runtime.spawn(monitor_loop(self, listener, state_tx, stop_rx));

        MonitorHandle {
            stop_tx,
            state_rx,
            join,
        }
    }
}

pub struct MonitorHandle {
    stop_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<Option<ConnectivitySnapshot>>,
    join: JoinHandle<()>,
}

impl MonitorHandle {
    /// Latest result, `None` until the first probe finishes.
    pub fn snapshot(&self) -> Option<ConnectivitySnapshot> {
        *self.state_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ConnectivitySnapshot>> {
        self.state_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    /// Ask the loop to stop. It exits at its next check.
    pub fn stop(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.stop_tx.send(true);
    }

    /// Stop and wait for the loop to exit. No update is delivered afterwards.
    pub async fn shutdown(self) {
        self.stop();
        let _ = self.join.await;
    }
}

async fn monitor_loop(
    monitor: ConnectivityMonitor,
    listener: Arc<dyn ConnectivityListener>,
    state_tx: watch::Sender<Option<ConnectivitySnapshot>>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        if *stop_rx.borrow() {
            break;
        }

        let online = tokio::select! {
            _ = stopped(&mut stop_rx) => break,
            online = monitor.probe.probe() => online,
        };

        let previous = state_tx.send_replace(Some(ConnectivitySnapshot {
            online,
            checked_at: monitor.clock.now(),
        }));
        if previous.is_none_or(|p| p.online != online) {
            tracing::info!(online, "connectivity changed");
        }
        listener.on_update(online);

        tokio::select! {
            _ = stopped(&mut stop_rx) => break,
            _ = tokio::time::sleep(monitor.interval) => {}
        }
    }
    tracing::debug!("connectivity monitor stopped");
}

async fn stopped(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // handle dropped
            return;
        }
    }
}
