//! YtDlpDownloader - download primitive backed by the `yt-dlp` executable.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::process::run_tool;
use crate::error::TaskError;
use crate::ports::Downloader;

#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    program: PathBuf,
}

impl YtDlpDownloader {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Best single file with both audio and video, named after the title.
    fn args(url: &str, destination_dir: &Path) -> Vec<OsString> {
        vec![
            "-f".into(),
            "best".into(),
            "--no-playlist".into(),
            "--no-progress".into(),
            "--no-simulate".into(),
            "--print".into(),
            "after_move:filepath".into(),
            "-o".into(),
            destination_dir.join("%(title)s.%(ext)s").into_os_string(),
            url.into(),
        ]
    }
}

impl Default for YtDlpDownloader {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn download(&self, url: &str, destination_dir: &Path) -> Result<PathBuf, TaskError> {
        tracing::debug!(url, dir = %destination_dir.display(), "running yt-dlp");
        let stdout = run_tool(&self.program, Self::args(url, destination_dir)).await?;
        final_path(&stdout)
            .ok_or_else(|| TaskError::operation("yt-dlp did not report the downloaded file"))
    }
}

// `--print after_move:filepath` prints the final path as the last line.
fn final_path(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .map(PathBuf::from)
}
