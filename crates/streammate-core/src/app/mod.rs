//! App - アプリケーション層
//!
//! ports と store を組み合わせて、ダウンロード・変換・接続監視を提供します。
//!
//! # 主要コンポーネント
//! - **TaskRunner**: download/conversion を別タスクで実行し、ライフサイクルを通知
//! - **ConnectivityMonitor**: 停止シグナル付きの定期到達性チェック
//! - **AppBuilder / App**: store, runner, media tools, probe のワイヤリング

pub mod builder;
pub mod monitor;
pub mod runner;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::monitor::{ConnectivityMonitor, ConnectivitySnapshot, MonitorHandle};
pub use self::runner::{RunOptions, TaskHandle, TaskRunner};
