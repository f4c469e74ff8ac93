//! Media formats and the conversion matrix.
//!
//! Video sources (`mp4`, `avi`, `mov`, `mkv`) can become `mp3`/`wav` (audio
//! track only) or `mp4`. Audio sources (`mp3`, `wav`) can only become audio.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::TaskError;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Mp3,
    Wav,
    Mp4,
}

impl TargetFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Mp3 => "mp3",
            TargetFormat::Wav => "wav",
            TargetFormat::Mp4 => "mp4",
        }
    }

    pub fn is_audio(self) -> bool {
        matches!(self, TargetFormat::Mp3 | TargetFormat::Wav)
    }

    /// Format implied by a path's extension, if it is one we can produce.
    pub fn from_path(path: &Path) -> Option<Self> {
        extension_of(path).and_then(|ext| ext.parse().ok())
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TargetFormat {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "mp3" => Ok(TargetFormat::Mp3),
            "wav" => Ok(TargetFormat::Wav),
            "mp4" => Ok(TargetFormat::Mp4),
            other => Err(ConversionError::UnknownFormat(other.to_string())),
        }
    }
}

/// Broad class of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceClass {
    Video,
    Audio,
}

impl SourceClass {
    pub fn of(path: &Path) -> Option<Self> {
        let ext = extension_of(path)?;
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(SourceClass::Video)
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Some(SourceClass::Audio)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("unsupported file format for conversion: {0}")]
    UnsupportedSource(PathBuf),

    #[error("{target} is not supported for {class} sources")]
    UnsupportedTarget { class: &'static str, target: TargetFormat },

    #[error("unknown output format: {0}")]
    UnknownFormat(String),
}

impl From<ConversionError> for TaskError {
    fn from(err: ConversionError) -> Self {
        TaskError::InvalidInput(err.to_string())
    }
}

/// A validated conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPlan {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub source_class: SourceClass,
    pub target: TargetFormat,
}

impl ConversionPlan {
    /// Check that `source` can be turned into `target`.
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        target: TargetFormat,
    ) -> Result<Self, ConversionError> {
        let source = source.into();
        let source_class =
            SourceClass::of(&source).ok_or_else(|| ConversionError::UnsupportedSource(source.clone()))?;

        if source_class == SourceClass::Audio && !target.is_audio() {
            return Err(ConversionError::UnsupportedTarget {
                class: "audio",
                target,
            });
        }

        Ok(Self {
            source,
            destination: destination.into(),
            source_class,
            target,
        })
    }

    /// Only the audio track is kept.
    pub fn drops_video(&self) -> bool {
        self.target.is_audio()
    }
}

/// Append `format`'s extension unless `path` already ends with it,
/// the way a save-as dialog applies its default extension.
pub fn with_default_extension(path: impl Into<PathBuf>, format: TargetFormat) -> PathBuf {
    let path = path.into();
    match extension_of(&path) {
        Some(ext) if ext == format.extension() => path,
        _ => {
            let mut raw = path.into_os_string();
            raw.push(".");
            raw.push(format.extension());
            PathBuf::from(raw)
        }
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}
