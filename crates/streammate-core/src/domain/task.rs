//! Task lifecycle types.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ids::TaskId;
use crate::error::TaskError;

/// What a task does. Also the `type` of the record it leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Download,
    Conversion,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Download => "download",
            TaskKind::Conversion => "conversion",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "download" => Ok(TaskKind::Download),
            "conversion" => Ok(TaskKind::Conversion),
            other => Err(format!("unknown task kind: {other}")),
        }
    }
}

/// Task phase.
///
/// State transitions:
/// - Idle -> Running -> Succeeded
/// - Idle -> Running -> Failed
/// - Idle -> Failed (rejected before start)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl TaskPhase {
    /// Is this a terminal phase (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskPhase::Succeeded | TaskPhase::Failed)
    }
}

/// The file a successful task produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Display name, usually the file name.
    pub label: String,
    pub location: PathBuf,
}

impl Artifact {
    pub fn new(label: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            location: location.into(),
        }
    }

    /// Build an artifact labelled with the file name of `location`.
    pub fn from_path(location: impl AsRef<Path>) -> Self {
        let location = location.as_ref();
        let label = location
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| location.display().to_string());
        Self::new(label, location)
    }
}

/// Point-in-time view of a task, handed to listeners and returned by
/// `TaskHandle::wait`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub kind: TaskKind,
    pub phase: TaskPhase,
    /// Present only when `phase == Failed`.
    pub error: Option<TaskError>,
}

impl TaskSnapshot {
    pub fn new(id: TaskId, kind: TaskKind) -> Self {
        Self {
            id,
            kind,
            phase: TaskPhase::Idle,
            error: None,
        }
    }

    pub(crate) fn running(mut self) -> Self {
        self.phase = TaskPhase::Running;
        self
    }

    pub(crate) fn succeeded(mut self) -> Self {
        self.phase = TaskPhase::Succeeded;
        self.error = None;
        self
    }

    pub(crate) fn failed(mut self, error: TaskError) -> Self {
        self.phase = TaskPhase::Failed;
        self.error = Some(error);
        self
    }
}
