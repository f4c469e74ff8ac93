//! Media ports - the delegated download and conversion primitives.
//!
//! Both are opaque: they get their inputs, block (asynchronously) for as long
//! as the external tool runs, and report either the produced file or the
//! tool's own error message.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::ConversionPlan;
use crate::error::TaskError;

/// Fetches the best available stream of `url` into `destination_dir`.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Returns the final path of the downloaded file.
    async fn download(&self, url: &str, destination_dir: &Path) -> Result<PathBuf, TaskError>;
}

/// Transcodes according to a validated plan.
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(&self, plan: &ConversionPlan) -> Result<(), TaskError>;
}
