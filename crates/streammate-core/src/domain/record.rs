//! History record: one entry per completed task.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::task::TaskKind;

/// Record state.
///
/// Only completions are recorded; failures are reported to the listener and
/// never written to history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordState {
    Completed,
}

/// One logged outcome.
///
/// Field names on disk are `type`, `filename`, `path` and `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "type")]
    pub kind: TaskKind,

    #[serde(rename = "filename")]
    pub label: String,

    #[serde(rename = "path")]
    pub location: PathBuf,

    #[serde(rename = "status")]
    pub state: RecordState,
}

impl Record {
    pub fn completed(kind: TaskKind, label: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            label: label.into(),
            location: location.into(),
            state: RecordState::Completed,
        }
    }
}
