//! Domain model (ids, tasks, records, media formats).

pub mod format;
pub mod ids;
pub mod record;
pub mod task;

pub use format::{ConversionError, ConversionPlan, SourceClass, TargetFormat};
pub use ids::TaskId;
pub use record::{Record, RecordState};
pub use task::{Artifact, TaskKind, TaskPhase, TaskSnapshot};
