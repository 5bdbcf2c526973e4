//! Postponed structural formatting.
//!
//! Tree edits made inside a postpone scope are not formatted one by one.
//! The observer classifies each change batch, the builder turns what was
//! recorded into span-backed tasks, the normalizer folds those into disjoint
//! reformat and reindent ranges, and the executor applies them once the
//! outermost scope closes.

/// Tasks from queued nodes and reformat markers.
pub mod builder;
/// KDL configuration.
pub mod config;
pub mod error;
/// Action execution and the per-document run.
pub mod executor;
pub mod file;
/// Formatter seams.
pub mod formatter;
pub mod lock;
/// Folding tasks into disjoint ranges.
pub mod normalize;
/// Change batch classification.
pub mod observer;
/// Per-document recorded state.
pub mod registry;
pub mod scheduler;
/// Span-backed task set.
pub mod task;
#[doc(hidden)]
pub mod test_helpers;

pub use builder::build_tasks;
pub use config::{ConfigError, FormatConfig};
pub use error::{FormatError, Originator, Result};
pub use executor::{PipelineEnv, run_pipeline};
pub use file::{FileView, Files};
pub use formatter::{DisabledIndentRanges, ExternalFormatter, FormatContext, FormatRange, FormatRanges, Formatter};
pub use lock::{ReentrantWriteLock, WriteAccess};
pub use normalize::{Actions, Normalized, normalize};
pub use registry::{DocumentContext, NodeMarks};
pub use scheduler::{Scheduler, TreeEdit};
pub use task::{PostponedTask, ResolvedTask, TaskKind, TaskSet};
