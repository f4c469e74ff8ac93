//! streammate-core
//!
//! Job tracking and history for the StreamMate media helper.
//!
//! # Modules
//! - **domain**: tasks, records, media formats
//! - **ports**: seams to the outside (clock, probe, media tools, listeners)
//! - **store**: the persisted, append-only history
//! - **app**: task runner, connectivity monitor, wiring
//! - **impls**: `yt-dlp`, `ffmpeg` and TCP probe implementations
//! - **config**: TOML configuration and default paths

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod store;

pub use app::{App, AppBuilder, MonitorHandle, TaskHandle, TaskRunner};
pub use config::AppConfig;
pub use domain::{Artifact, Record, TargetFormat, TaskKind, TaskPhase, TaskSnapshot};
pub use error::{ConfigError, StoreError, TaskError};
pub use store::RecordStore;
