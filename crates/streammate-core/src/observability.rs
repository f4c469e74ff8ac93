use serde::{Deserialize, Serialize};

use crate::domain::{Record, TaskKind};

/// Per-kind totals of the history, for status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryCounts {
    pub downloads: usize,
    pub conversions: usize,
}

impl HistoryCounts {
    pub fn from_records(records: &[Record]) -> Self {
        let mut counts = HistoryCounts::default();
        for record in records {
            match record.kind {
                TaskKind::Download => counts.downloads += 1,
                TaskKind::Conversion => counts.conversions += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.downloads + self.conversions
    }
}
